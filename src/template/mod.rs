//! Attachment directives for page templates.
//!
//! Directive contents (the text between the tag delimiters) are parsed once by a
//! [`Library`] into an immutable [`Node`]. Nodes are rendered many times, each
//! time against a fresh [`Context`], and bind their result into it.
//!
//! ```text
//! get_attachment_form for post as form
//! get_attachment_form for blog.post post_id as form
//! get_attachment_list for blog.post 42 as files
//! get_attachments_for post as "post_files"
//! ```

mod context;
mod tags;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub use context::{Context, Expr, Resolvable, Value};
pub use tags::{
    attachment_delete_link, attachment_form, AttachmentNode, AttachmentNodeKind,
    AttachmentsForObjectNode, Target,
};

use crate::owner::OwnerRegistry;
use crate::permissions::PermissionChecker;
use crate::storage::{Database, DatabaseError};
use crate::views::UrlScheme;

pub const GET_ATTACHMENT_FORM: &str = "get_attachment_form";
pub const GET_ATTACHMENT_LIST: &str = "get_attachment_list";
pub const GET_ATTACHMENT_COUNT: &str = "get_attachment_count";
pub const GET_ATTACHMENTS_FOR: &str = "get_attachments_for";

/// A malformed directive. Fatal to the template being compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TemplateSyntaxError(pub String);

/// Collaborators a node needs while rendering.
#[derive(Clone, Copy)]
pub struct RenderEnv<'a> {
    pub db: &'a Database,
    pub registry: &'a OwnerRegistry,
    pub permissions: &'a dyn PermissionChecker,
    pub urls: &'a UrlScheme,
}

/// A compiled directive.
pub trait Node: fmt::Debug + Send + Sync {
    /// Bind this node's result into `ctx`. Returns the text to emit in place of the
    /// directive, which is empty for every attachment directive.
    fn render(&self, ctx: &mut Context, env: &RenderEnv<'_>) -> Result<String, DatabaseError>;
}

/// The set of attachment directives, bound to the owner registry that type tags
/// are checked against.
#[derive(Clone)]
pub struct Library {
    registry: Arc<OwnerRegistry>,
}

impl Library {
    pub fn new(registry: Arc<OwnerRegistry>) -> Self {
        Self { registry }
    }

    /// Compile the contents of one directive.
    pub fn parse(&self, contents: &str) -> Result<Box<dyn Node>, TemplateSyntaxError> {
        let tokens: Vec<&str> = contents.split_whitespace().collect();
        let Some(&name) = tokens.first() else {
            return Err(TemplateSyntaxError("Empty directive".to_string()));
        };

        let node: Box<dyn Node> = match name {
            GET_ATTACHMENT_FORM => Box::new(AttachmentNode::handle_token(
                AttachmentNodeKind::Form,
                &tokens,
                &self.registry,
            )?),
            GET_ATTACHMENT_LIST => Box::new(AttachmentNode::handle_token(
                AttachmentNodeKind::List,
                &tokens,
                &self.registry,
            )?),
            GET_ATTACHMENT_COUNT => Box::new(AttachmentNode::handle_token(
                AttachmentNodeKind::Count,
                &tokens,
                &self.registry,
            )?),
            GET_ATTACHMENTS_FOR => Box::new(AttachmentsForObjectNode::handle_token(&tokens)?),
            other => {
                return Err(TemplateSyntaxError(format!(
                    "Invalid directive '{other}'"
                )))
            }
        };

        Ok(node)
    }
}
