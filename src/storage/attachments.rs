use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::{sort_newest_first, Attachment, NewAttachment};
use super::tables::*;
use crate::owner::OwnerReference;

impl Database {
    // ========================================================================
    // Attachment operations
    // ========================================================================

    /// Store a new attachment, assigning its id and timestamps.
    pub fn create_attachment(&self, new: NewAttachment) -> Result<Attachment, DatabaseError> {
        self.insert_attachment(new, Utc::now())
    }

    /// Store a new attachment with an explicit creation time.
    pub fn insert_attachment(
        &self,
        new: NewAttachment,
        created_at: DateTime<Utc>,
    ) -> Result<Attachment, DatabaseError> {
        debug_assert!(new.owner.has_identifier(), "owner identifier must not be empty");
        debug_assert!(!new.file.path.is_empty(), "file path must not be empty");

        let write_txn = self.begin_write()?;
        let attachment = {
            let mut sequences = write_txn.open_table(SEQUENCES)?;
            let id = sequences
                .get(ATTACHMENT_SEQUENCE)?
                .map(|v| v.value())
                .unwrap_or(0)
                + 1;
            sequences.insert(ATTACHMENT_SEQUENCE, id)?;

            let attachment = Attachment {
                id,
                owner: new.owner,
                file: new.file,
                creator: new.creator,
                created_at,
                modified_at: created_at,
            };

            let mut table = write_txn.open_table(ATTACHMENTS)?;
            let data = rmp_serde::to_vec_named(&attachment)?;
            table.insert(id, data.as_slice())?;

            // Maintain owner index
            let key = attachment.owner.storage_key();
            let mut owner_table = write_txn.open_table(OWNER_ATTACHMENTS)?;
            let mut ids: Vec<u64> = match owner_table.get(key.as_str())? {
                Some(data) => rmp_serde::from_slice(data.value())?,
                None => Vec::new(),
            };
            ids.push(id);
            let index_data = rmp_serde::to_vec_named(&ids)?;
            owner_table.insert(key.as_str(), index_data.as_slice())?;

            attachment
        };
        write_txn.commit()?;
        Ok(attachment)
    }

    /// Get an attachment by id
    pub fn get_attachment(&self, id: u64) -> Result<Option<Attachment>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ATTACHMENTS)?;

        match table.get(id)? {
            Some(data) => {
                let attachment: Attachment = rmp_serde::from_slice(data.value())?;
                Ok(Some(attachment))
            }
            None => Ok(None),
        }
    }

    /// All attachments of one owner, newest first
    pub fn attachments_for_owner(
        &self,
        owner: &OwnerReference,
    ) -> Result<Vec<Attachment>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let owner_table = read_txn.open_table(OWNER_ATTACHMENTS)?;
        let table = read_txn.open_table(ATTACHMENTS)?;

        let ids: Vec<u64> = match owner_table.get(owner.storage_key().as_str())? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut attachments = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(data) = table.get(id)? {
                let attachment: Attachment = rmp_serde::from_slice(data.value())?;
                attachments.push(attachment);
            }
        }

        sort_newest_first(&mut attachments);
        Ok(attachments)
    }

    /// Delete an attachment and clean up the owner index. Returns the removed
    /// record so the caller can drop its blob.
    pub fn delete_attachment(&self, id: u64) -> Result<Option<Attachment>, DatabaseError> {
        let write_txn = self.begin_write()?;
        let removed = remove_attachment(&write_txn, id)?;
        write_txn.commit()?;
        Ok(removed)
    }

    /// Delete every attachment of an owner. Used when the owning record goes away.
    pub fn delete_attachments_for_owner(
        &self,
        owner: &OwnerReference,
    ) -> Result<Vec<Attachment>, DatabaseError> {
        let key = owner.storage_key();
        let write_txn = self.begin_write()?;

        let removed = remove_owner_attachments(&write_txn, &key)?;

        write_txn.commit()?;
        Ok(removed)
    }

    /// Forget an owning record and delete its attachments in one transaction.
    /// Returns whether the record existed and the removed attachments.
    pub fn delete_owner_with_attachments(
        &self,
        owner: &OwnerReference,
    ) -> Result<(bool, Vec<Attachment>), DatabaseError> {
        let key = owner.storage_key();
        let write_txn = self.begin_write()?;

        let existed = {
            let mut records = write_txn.open_table(OWNER_RECORDS)?;
            let removed = records.remove(key.as_str())?.is_some();
            removed
        };

        let removed = remove_owner_attachments(&write_txn, &key)?;

        write_txn.commit()?;
        Ok((existed, removed))
    }

    /// Get all attachments, newest first
    pub fn get_all_attachments(&self) -> Result<Vec<Attachment>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ATTACHMENTS)?;

        let mut attachments = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let attachment: Attachment = rmp_serde::from_slice(value.value())?;
            attachments.push(attachment);
        }

        sort_newest_first(&mut attachments);
        Ok(attachments)
    }
}

fn remove_attachment(
    write_txn: &WriteTransaction,
    id: u64,
) -> Result<Option<Attachment>, DatabaseError> {
    let attachment: Option<Attachment> = {
        let mut table = write_txn.open_table(ATTACHMENTS)?;
        let removed = match table.remove(id)? {
            Some(data) => Some(rmp_serde::from_slice(data.value())?),
            None => None,
        };
        removed
    };

    let Some(attachment) = attachment else {
        return Ok(None);
    };

    // Remove from owner index
    let key = attachment.owner.storage_key();
    let mut owner_table = write_txn.open_table(OWNER_ATTACHMENTS)?;
    let ids: Option<Vec<u64>> = match owner_table.get(key.as_str())? {
        Some(data) => Some(rmp_serde::from_slice(data.value())?),
        None => None,
    };
    if let Some(mut ids) = ids {
        ids.retain(|other| *other != id);
        if ids.is_empty() {
            owner_table.remove(key.as_str())?;
        } else {
            let data = rmp_serde::to_vec_named(&ids)?;
            owner_table.insert(key.as_str(), data.as_slice())?;
        }
    }

    Ok(Some(attachment))
}

fn remove_owner_attachments(
    write_txn: &WriteTransaction,
    key: &str,
) -> Result<Vec<Attachment>, DatabaseError> {
    let ids: Vec<u64> = {
        let owner_table = write_txn.open_table(OWNER_ATTACHMENTS)?;
        let ids = match owner_table.get(key)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => Vec::new(),
        };
        ids
    };

    let mut removed = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(attachment) = remove_attachment(write_txn, id)? {
            removed.push(attachment);
        }
    }
    Ok(removed)
}
