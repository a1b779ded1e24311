use super::db::{Database, DatabaseError};
use super::tables::*;
use crate::owner::OwnerReference;

impl Database {
    // ========================================================================
    // Owner records
    // ========================================================================

    /// Register a live owning record with its optional canonical URL
    pub fn put_owner_record(
        &self,
        owner: &OwnerReference,
        canonical_url: Option<&str>,
    ) -> Result<(), DatabaseError> {
        debug_assert!(owner.has_identifier(), "owner identifier must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(OWNER_RECORDS)?;
            let data = rmp_serde::to_vec_named(&canonical_url)?;
            table.insert(owner.storage_key().as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a live owning record. The outer `Option` is presence, the inner one
    /// the canonical URL.
    pub fn get_owner_record(
        &self,
        owner: &OwnerReference,
    ) -> Result<Option<Option<String>>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(OWNER_RECORDS)?;

        match table.get(owner.storage_key().as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Forget an owning record. Its attachments are left to the caller.
    pub fn delete_owner_record(&self, owner: &OwnerReference) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(OWNER_RECORDS)?;
            let removed = table.remove(owner.storage_key().as_str())?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }
}
