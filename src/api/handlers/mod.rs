mod admin;
mod attachments;
mod static_files;

pub use admin::{admin_purge, delete_owner, get_permissions, health, put_owner, set_permissions};
pub use attachments::{add_attachment, delete_attachment, list_attachments};
pub use static_files::serve_file;
