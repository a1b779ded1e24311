use redb::TableDefinition;

/// Attachment records: id -> Attachment (msgpack)
pub const ATTACHMENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("attachments");

/// Owner index: "app.model:identifier" -> msgpack Vec of attachment ids
pub const OWNER_ATTACHMENTS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("owner_attachments");

/// Live owners registered by the host: "app.model:identifier" -> msgpack Option<canonical url>
pub const OWNER_RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("owner_records");

/// Permission grants: user id -> msgpack Vec of permission names
pub const PERMISSION_GRANTS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("permission_grants");

/// Named counters for system-assigned ids
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

pub const ATTACHMENT_SEQUENCE: &str = "attachment_id";
