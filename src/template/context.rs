use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::owner::OwnerReference;
use crate::permissions::User;
use crate::storage::models::Attachment;
use crate::views::UploadForm;

/// A value bound in a rendering context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Str(String),
    /// A live record of the host application.
    Record(OwnerReference),
    Attachment(Box<Attachment>),
    Form(UploadForm),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Owner a value points at: a record, or an `app.model:identifier` string.
    pub fn as_owner(&self) -> Option<OwnerReference> {
        match self {
            Value::Record(owner) => Some(owner.clone()),
            Value::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Primary-key form of a value. Empty strings and non-scalars have none.
    pub fn as_identifier(&self) -> Option<String> {
        match self {
            Value::Int(i) => Some(i.to_string()),
            Value::Str(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Attribute lookup used by dotted variable paths.
    pub fn attr(&self, name: &str) -> Option<Value> {
        match self {
            Value::Map(map) => map.get(name).cloned(),
            Value::List(items) => name.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
            Value::Record(owner) => match name {
                "pk" | "identifier" => Some(Value::Str(owner.identifier.clone())),
                "type_tag" => Some(Value::Str(owner.type_tag.to_string())),
                _ => None,
            },
            Value::Attachment(attachment) => match name {
                "pk" | "id" => i64::try_from(attachment.id).ok().map(Value::Int),
                "creator" => Some(Value::Str(attachment.creator.clone())),
                "filename" => Some(Value::Str(attachment.filename().to_string())),
                "owner" => Some(Value::Record(attachment.owner.clone())),
                _ => None,
            },
            Value::Form(form) => match name {
                "form_url" => Some(Value::Str(form.form_url.clone())),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<Attachment> for Value {
    fn from(attachment: Attachment) -> Self {
        Value::Attachment(Box::new(attachment))
    }
}

impl From<OwnerReference> for Value {
    fn from(owner: OwnerReference) -> Self {
        Value::Record(owner)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

/// Variables of one render, plus the request's user and URI.
#[derive(Debug, Clone, Default)]
pub struct Context {
    vars: HashMap<String, Value>,
    user: Option<User>,
    request_uri: Option<String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_request_uri(mut self, uri: impl Into<String>) -> Self {
        self.request_uri = Some(uri.into());
        self
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.vars.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn request_uri(&self) -> Option<&str> {
        self.request_uri.as_deref()
    }
}

/// Something a directive can look up in a context at render time.
pub trait Resolvable {
    /// `None` when the reference cannot be resolved; never an error.
    fn resolve(&self, ctx: &Context) -> Option<Value>;
}

/// One directive argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Int(i64),
    Quoted(String),
    Variable(Vec<String>),
}

impl Expr {
    pub fn parse(token: &str) -> Self {
        if let Some(inner) = unquote(token) {
            return Expr::Quoted(inner.to_string());
        }
        if let Ok(i) = token.parse::<i64>() {
            return Expr::Int(i);
        }
        Expr::Variable(token.split('.').map(str::to_string).collect())
    }
}

fn unquote(token: &str) -> Option<&str> {
    let first = token.chars().next()?;
    if token.len() >= 2 && matches!(first, '"' | '\'') && token.ends_with(first) {
        Some(&token[1..token.len() - 1])
    } else {
        None
    }
}

impl Resolvable for Expr {
    fn resolve(&self, ctx: &Context) -> Option<Value> {
        match self {
            Expr::Int(i) => Some(Value::Int(*i)),
            Expr::Quoted(s) => Some(Value::Str(s.clone())),
            Expr::Variable(path) => {
                let (head, rest) = path.split_first()?;
                let mut value = ctx.get(head)?.clone();
                for segment in rest {
                    value = value.attr(segment)?;
                }
                Some(value)
            }
        }
    }
}
