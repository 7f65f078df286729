//! # Notehall
//!
//! A marketplace server for handwritten study notes, usable both as a
//! standalone binary and as a library.
//!
//! Students browse teachers and their notes, preview metadata for free,
//! and purchase paid notes to unlock their content. Admins manage the
//! teacher roster and the note catalog.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! notehall = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::path::Path;
//! use std::sync::Arc;
//! use notehall::server::{AppState, create_router};
//! use notehall::store::SqliteStore;
//!
//! let store = SqliteStore::new("./data/notehall.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), Path::new("./data")));
//! let router = create_router(state, &[]);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the CLI binary. Disable with
//!   `default-features = false`.

pub mod auth;
pub mod config;
pub mod content;
pub mod entitlement;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
