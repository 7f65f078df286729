//! Decides whether a viewer may see a note's full content, and records
//! purchases as irreversible grants.
//!
//! Access is evaluated fresh against the store on every content-serving
//! request; anything the client caches is a UI hint, never the enforcement
//! point.

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Note, Receipt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied,
}

impl AccessDecision {
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// May this viewer see the note's full content?
///
/// Free notes are granted to everyone, including anonymous viewers. Paid
/// notes require a purchase grant for the viewer.
pub fn check_access(
    store: &dyn Store,
    viewer_id: Option<&str>,
    note: &Note,
) -> Result<AccessDecision> {
    if !note.is_paid {
        return Ok(AccessDecision::Granted);
    }

    let Some(viewer_id) = viewer_id else {
        return Ok(AccessDecision::Denied);
    };

    if store.has_purchase(viewer_id, &note.id)? {
        Ok(AccessDecision::Granted)
    } else {
        Ok(AccessDecision::Denied)
    }
}

/// Records a purchase grant for the viewer.
///
/// The grant is monotonic and irreversible: nothing in this system removes
/// it. A duplicate purchase is an explicit `AlreadyOwned` rejection, not an
/// idempotent success. No payment capture happens here; a real deployment
/// would call this only after its payment collaborator reports success.
pub fn purchase(store: &dyn Store, viewer_id: &str, note_id: &str) -> Result<Receipt> {
    let note = store.get_note(note_id)?.ok_or(Error::NotFound)?;

    // Single atomic append-if-absent: of two concurrent duplicate attempts,
    // at most one succeeds.
    if !store.record_purchase(viewer_id, &note.id, note.price)? {
        return Err(Error::AlreadyOwned);
    }

    Ok(Receipt {
        note_id: note.id,
        title: note.title,
        price: note.price,
    })
}
