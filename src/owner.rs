//! Polymorphic owner references and the registry that resolves them.
//!
//! An attachment can belong to any record of the host application. The record is
//! addressed by a [`TypeTag`] (`app.model`) plus an opaque identifier, and the
//! [`OwnerRegistry`] maps each known tag to an [`OwnerResolver`] that answers
//! whether a given identifier is live.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeTagError {
    #[error("type tag '{0}' must be in the format 'app.model'")]
    Malformed(String),
}

/// Stable identifier of an owning record's kind, e.g. `blog.post`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeTag {
    pub app: String,
    pub model: String,
}

impl TypeTag {
    pub fn new(app: impl Into<String>, model: impl Into<String>) -> Result<Self, TypeTagError> {
        let app = app.into();
        let model = model.into();
        if !is_tag_part(&app) || !is_tag_part(&model) {
            return Err(TypeTagError::Malformed(format!("{app}.{model}")));
        }
        Ok(Self { app, model })
    }
}

/// Parts end up in route segments, so they follow the `[\w-]+` shape of the routes.
fn is_tag_part(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

impl FromStr for TypeTag {
    type Err = TypeTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(app), Some(model), None) => {
                TypeTag::new(app, model).map_err(|_| TypeTagError::Malformed(s.to_string()))
            }
            _ => Err(TypeTagError::Malformed(s.to_string())),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app, self.model)
    }
}

/// Points at one record of the host application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerReference {
    pub type_tag: TypeTag,
    pub identifier: String,
}

impl OwnerReference {
    pub fn new(type_tag: TypeTag, identifier: impl Into<String>) -> Self {
        Self {
            type_tag,
            identifier: identifier.into(),
        }
    }

    /// Key used by the owner-indexed tables: `app.model:identifier`.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.type_tag, self.identifier)
    }

    pub fn has_identifier(&self) -> bool {
        !self.identifier.is_empty()
    }
}

/// Parses the `app.model:identifier` literal form.
impl FromStr for OwnerReference {
    type Err = TypeTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, identifier) = s
            .split_once(':')
            .ok_or_else(|| TypeTagError::Malformed(s.to_string()))?;
        Ok(OwnerReference::new(tag.parse()?, identifier))
    }
}

impl fmt::Display for OwnerReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_tag, self.identifier)
    }
}

/// A live owning record as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRecord {
    pub reference: OwnerReference,
    /// Canonical page of the record, used as the default redirect after an upload.
    pub canonical_url: Option<String>,
}

/// Answers whether an identifier of one record kind refers to a live record.
pub trait OwnerResolver: Send + Sync {
    fn lookup(&self, identifier: &str) -> Result<Option<OwnerRecord>, DatabaseError>;
}

/// Resolver backed by the `owner_records` table, populated by the host application.
pub struct RecordTable {
    db: Database,
    type_tag: TypeTag,
}

impl RecordTable {
    pub fn new(db: Database, type_tag: TypeTag) -> Self {
        Self { db, type_tag }
    }
}

impl OwnerResolver for RecordTable {
    fn lookup(&self, identifier: &str) -> Result<Option<OwnerRecord>, DatabaseError> {
        let reference = OwnerReference::new(self.type_tag.clone(), identifier);
        Ok(self
            .db
            .get_owner_record(&reference)?
            .map(|canonical_url| OwnerRecord {
                reference,
                canonical_url,
            }))
    }
}

/// `TypeTag -> OwnerResolver` mapping. Built once at startup and shared read-only.
#[derive(Clone, Default)]
pub struct OwnerRegistry {
    resolvers: HashMap<TypeTag, Arc<dyn OwnerResolver>>,
}

impl OwnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_tag: TypeTag, resolver: Arc<dyn OwnerResolver>) {
        self.resolvers.insert(type_tag, resolver);
    }

    /// Register a [`RecordTable`] resolver for each tag.
    pub fn with_record_tables<'a>(
        db: &Database,
        type_tags: impl IntoIterator<Item = &'a TypeTag>,
    ) -> Self {
        let mut registry = Self::new();
        for tag in type_tags {
            registry.register(tag.clone(), Arc::new(RecordTable::new(db.clone(), tag.clone())));
        }
        registry
    }

    pub fn contains(&self, type_tag: &TypeTag) -> bool {
        self.resolvers.contains_key(type_tag)
    }

    pub fn type_tags(&self) -> impl Iterator<Item = &TypeTag> {
        self.resolvers.keys()
    }

    /// Resolve an owner reference to a live record. Unknown tags and empty
    /// identifiers resolve to `None`.
    pub fn lookup(&self, owner: &OwnerReference) -> Result<Option<OwnerRecord>, DatabaseError> {
        if !owner.has_identifier() {
            return Ok(None);
        }
        match self.resolvers.get(&owner.type_tag) {
            Some(resolver) => resolver.lookup(&owner.identifier),
            None => Ok(None),
        }
    }
}
