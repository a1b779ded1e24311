use super::db::{Database, DatabaseError};
use super::tables::*;

impl Database {
    // ========================================================================
    // Permission grants
    // ========================================================================

    /// Replace the permission names granted to a user. An empty list revokes all.
    pub fn set_user_permissions(
        &self,
        user_id: &str,
        permissions: &[String],
    ) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(PERMISSION_GRANTS)?;
            if permissions.is_empty() {
                table.remove(user_id)?;
            } else {
                let mut names = permissions.to_vec();
                names.sort();
                names.dedup();
                let data = rmp_serde::to_vec_named(&names)?;
                table.insert(user_id, data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Permission names granted to a user, sorted
    pub fn get_user_permissions(&self, user_id: &str) -> Result<Vec<String>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PERMISSION_GRANTS)?;

        match table.get(user_id)? {
            Some(data) => Ok(rmp_serde::from_slice(data.value())?),
            None => Ok(Vec::new()),
        }
    }
}
