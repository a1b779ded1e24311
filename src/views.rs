//! Permission-gated view models for the upload form and the delete link.
//!
//! Both builders are pure: they decide visibility and compute URLs, and leave
//! the actual mutation to [`crate::operations`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::owner::OwnerReference;
use crate::permissions::{can_add, can_delete, PermissionChecker, User};
use crate::storage::models::Attachment;

pub const ADD_FORM_TEMPLATE: &str = "attachments/add_form.html";
pub const DELETE_LINK_TEMPLATE: &str = "attachments/delete_link.html";

/// Multipart field carrying the uploaded file.
pub const FILE_FIELD: &str = "attachment_file";

/// Field-level validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Builds the URLs of the attachment routes under a mount prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlScheme {
    prefix: String,
}

impl UrlScheme {
    /// `prefix` is empty (mounted at the root) or starts with `/`; a trailing `/` is dropped.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn add_url(&self, owner: &OwnerReference) -> String {
        format!(
            "{}/add-for/{}/{}/{}/",
            self.prefix, owner.type_tag.app, owner.type_tag.model, owner.identifier
        )
    }

    pub fn delete_url(&self, attachment_id: u64) -> String {
        format!("{}/delete/{}/", self.prefix, attachment_id)
    }

    pub fn file_url(&self, attachment: &Attachment) -> String {
        format!(
            "{}/files/{}/{}",
            self.prefix,
            attachment.id,
            attachment.filename()
        )
    }
}

/// An (unbound) upload form pointing at the add route of one owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadForm {
    pub form_url: String,
    pub file_field: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: FieldErrors,
}

impl UploadForm {
    pub fn new(form_url: String) -> Self {
        Self {
            form_url,
            file_field: FILE_FIELD,
            errors: FieldErrors::new(),
        }
    }

    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = errors;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadFormView {
    pub template: &'static str,
    pub form: Option<UploadForm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteLinkView {
    pub template: &'static str,
    pub delete_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Upload form for `owner`, present only when the user may add attachments.
pub fn build_upload_form_view(
    checker: &dyn PermissionChecker,
    user: Option<&User>,
    owner: &OwnerReference,
    urls: &UrlScheme,
    next: Option<&str>,
) -> UploadFormView {
    match user {
        Some(user) if can_add(checker, user) => UploadFormView {
            template: ADD_FORM_TEMPLATE,
            form: Some(UploadForm::new(urls.add_url(owner))),
            next: next.map(str::to_string),
        },
        _ => UploadFormView {
            template: ADD_FORM_TEMPLATE,
            form: None,
            next: None,
        },
    }
}

/// Delete link for `attachment`, present only when the user may delete it.
pub fn build_delete_link_view(
    checker: &dyn PermissionChecker,
    user: Option<&User>,
    attachment: &Attachment,
    urls: &UrlScheme,
    next: Option<&str>,
) -> DeleteLinkView {
    match user {
        Some(user) if can_delete(checker, user, attachment) => DeleteLinkView {
            template: DELETE_LINK_TEMPLATE,
            delete_url: Some(urls.delete_url(attachment.id)),
            next: next.map(str::to_string),
        },
        _ => DeleteLinkView {
            template: DELETE_LINK_TEMPLATE,
            delete_url: None,
            next: None,
        },
    }
}
