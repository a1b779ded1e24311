//! Owner -> attachments.

use crate::owner::{OwnerReference, OwnerRegistry};
use crate::storage::models::Attachment;
use crate::storage::{Database, DatabaseError};

/// All attachments of a live owner, newest first.
///
/// An empty identifier, an unregistered type tag or an owner the registry cannot
/// find all yield an empty list. Only storage failures are errors.
pub fn resolve_attachments(
    db: &Database,
    registry: &OwnerRegistry,
    owner: &OwnerReference,
) -> Result<Vec<Attachment>, DatabaseError> {
    if registry.lookup(owner)?.is_none() {
        return Ok(Vec::new());
    }
    db.attachments_for_owner(owner)
}
