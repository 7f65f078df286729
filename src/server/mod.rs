mod account;
mod admin;
mod analytics;
mod catalog;
pub mod dto;
pub mod response;
mod router;
mod validation;

pub use router::{AppState, create_router};
