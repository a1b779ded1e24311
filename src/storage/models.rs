use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::owner::OwnerReference;

/// Handle to the stored bytes of an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    /// Object store key, e.g. `attachments/blog_post/<token>/report.pdf`
    pub path: String,
    pub original_name: String,
    pub mime_type: String,
    pub byte_size: u64,
}

impl FileReference {
    /// Build a unique storage path from the owner's type tag, a random token and
    /// the uploaded filename.
    pub fn storage_path(owner: &OwnerReference, filename: &str) -> String {
        format!(
            "attachments/{}_{}/{}/{}",
            owner.type_tag.app,
            owner.type_tag.model,
            uuid::Uuid::new_v4().simple(),
            sanitize_filename(filename)
        )
    }

    /// Last path segment, as shown to users.
    pub fn filename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Strip directory components and anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// An uploaded file bound to one owner and one creator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: u64,
    pub owner: OwnerReference,
    pub file: FileReference,
    pub creator: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Attachment {
    pub fn filename(&self) -> &str {
        self.file.filename()
    }
}

/// Fields supplied by the caller when creating an attachment; the store assigns
/// the id and timestamps.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub owner: OwnerReference,
    pub file: FileReference,
    pub creator: String,
}

/// Newest first; ties go to the later id.
pub fn sort_newest_first(attachments: &mut [Attachment]) {
    attachments.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
