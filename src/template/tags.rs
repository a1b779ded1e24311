use super::context::{Context, Expr, Resolvable, Value};
use super::{Node, RenderEnv, TemplateSyntaxError};
use crate::owner::{OwnerReference, OwnerRegistry, TypeTag};
use crate::resolution::resolve_attachments;
use crate::storage::models::Attachment;
use crate::storage::DatabaseError;
use crate::views::{
    build_delete_link_view, build_upload_form_view, DeleteLinkView, UploadForm, UploadFormView,
};

/// What an [`AttachmentNode`] binds into the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentNodeKind {
    /// An upload form for the owner, or `Null` when there is no owner.
    Form,
    /// The owner's attachments, newest first.
    List,
    /// Number of attachments of the owner.
    Count,
}

/// How a node finds its owner at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `for <object_expr>`
    Object(Expr),
    /// `for <app.model> <identifier_expr>`; the tag is checked at parse time.
    Typed { type_tag: TypeTag, identifier: Expr },
}

/// Node for the `DIRECTIVE for ... as <varname>` grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentNode {
    pub kind: AttachmentNodeKind,
    pub target: Target,
    pub as_varname: String,
}

impl AttachmentNode {
    /// Parse either of
    ///
    /// ```text
    /// DIRECTIVE for <object> as <varname>
    /// DIRECTIVE for <app>.<model> <identifier> as <varname>
    /// ```
    pub fn handle_token(
        kind: AttachmentNodeKind,
        tokens: &[&str],
        registry: &OwnerRegistry,
    ) -> Result<Self, TemplateSyntaxError> {
        let tag = tokens.first().copied().unwrap_or_default();

        match tokens.get(1) {
            Some(&"for") => {}
            Some(found) => {
                return Err(TemplateSyntaxError(format!(
                    "Second argument in '{tag}' tag must be 'for', found '{found}'"
                )))
            }
            None => {
                return Err(TemplateSyntaxError(format!(
                    "Second argument in '{tag}' tag must be 'for'"
                )))
            }
        }

        match tokens.len() {
            // DIRECTIVE for obj as varname
            5 => {
                if tokens[3] != "as" {
                    return Err(TemplateSyntaxError(format!(
                        "Third argument in '{tag}' must be 'as', found '{}'",
                        tokens[3]
                    )));
                }
                Ok(Self {
                    kind,
                    target: Target::Object(Expr::parse(tokens[2])),
                    as_varname: tokens[4].to_string(),
                })
            }
            // DIRECTIVE for app.model pk as varname
            6 => {
                if tokens[4] != "as" {
                    return Err(TemplateSyntaxError(format!(
                        "Fourth argument in '{tag}' must be 'as', found '{}'",
                        tokens[4]
                    )));
                }
                Ok(Self {
                    kind,
                    target: Target::Typed {
                        type_tag: lookup_type_tag(tokens[2], tag, registry)?,
                        identifier: Expr::parse(tokens[3]),
                    },
                    as_varname: tokens[5].to_string(),
                })
            }
            n => Err(TemplateSyntaxError(format!(
                "'{tag}' tag requires 4 or 5 arguments, found {}",
                n - 1
            ))),
        }
    }

    /// The owner this render refers to, if the context supplies one.
    pub fn target_owner(&self, ctx: &Context) -> Option<OwnerReference> {
        match &self.target {
            Target::Object(expr) => expr.resolve(ctx)?.as_owner(),
            Target::Typed {
                type_tag,
                identifier,
            } => {
                let identifier = identifier.resolve(ctx)?.as_identifier()?;
                Some(OwnerReference::new(type_tag.clone(), identifier))
            }
        }
    }

    fn attachments(
        &self,
        ctx: &Context,
        env: &RenderEnv<'_>,
    ) -> Result<Vec<Attachment>, DatabaseError> {
        match self.target_owner(ctx) {
            Some(owner) => resolve_attachments(env.db, env.registry, &owner),
            None => Ok(Vec::new()),
        }
    }
}

fn lookup_type_tag(
    token: &str,
    tag: &str,
    registry: &OwnerRegistry,
) -> Result<TypeTag, TemplateSyntaxError> {
    let type_tag: TypeTag = token.parse().map_err(|_| {
        TemplateSyntaxError(format!(
            "Third argument in '{tag}' must be in the format 'app.model', found '{token}'"
        ))
    })?;
    if !registry.contains(&type_tag) {
        return Err(TemplateSyntaxError(format!(
            "'{tag}' tag has non-existent type tag: '{token}'"
        )));
    }
    Ok(type_tag)
}

impl Node for AttachmentNode {
    fn render(&self, ctx: &mut Context, env: &RenderEnv<'_>) -> Result<String, DatabaseError> {
        let value = match self.kind {
            AttachmentNodeKind::Form => match self.target_owner(ctx) {
                Some(owner) if env.registry.lookup(&owner)?.is_some() => {
                    Value::Form(UploadForm::new(env.urls.add_url(&owner)))
                }
                _ => Value::Null,
            },
            AttachmentNodeKind::List => Value::List(
                self.attachments(ctx, env)?
                    .into_iter()
                    .map(Value::from)
                    .collect(),
            ),
            AttachmentNodeKind::Count => {
                Value::Int(self.attachments(ctx, env)?.len() as i64)
            }
        };
        ctx.insert(&self.as_varname, value);
        Ok(String::new())
    }
}

/// Node for `get_attachments_for <object> [as <varname>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentsForObjectNode {
    pub object: Expr,
    pub var_name: Expr,
    var_token: String,
}

impl AttachmentsForObjectNode {
    pub const DEFAULT_VAR_NAME: &'static str = "attachments";

    /// The first token after the directive name is the object; an optional
    /// `as <name>` anywhere after it names the variable.
    pub fn handle_token(tokens: &[&str]) -> Result<Self, TemplateSyntaxError> {
        let tag = tokens.first().copied().unwrap_or_default();

        let object = match tokens.get(1) {
            Some(&"as") | None => {
                return Err(TemplateSyntaxError(format!(
                    "'{tag}' tag requires an object as its first argument"
                )))
            }
            Some(token) => Expr::parse(token),
        };

        let (var_name, var_token) = match tokens.iter().skip(2).position(|t| *t == "as") {
            Some(i) => {
                let token = tokens.get(i + 3).copied().ok_or_else(|| {
                    TemplateSyntaxError(format!("'as' in '{tag}' tag must be followed by a name"))
                })?;
                (Expr::parse(token), token)
            }
            None => (
                Expr::Quoted(Self::DEFAULT_VAR_NAME.to_string()),
                Self::DEFAULT_VAR_NAME,
            ),
        };

        Ok(Self {
            object,
            var_name,
            var_token: var_token.to_string(),
        })
    }

    /// A quoted name is used as is; a variable must resolve to a string,
    /// otherwise the bare token is the name.
    fn resolve_var_name(&self, ctx: &Context) -> String {
        match &self.var_name {
            Expr::Quoted(name) => name.clone(),
            expr => expr
                .resolve(ctx)
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| self.var_token.clone()),
        }
    }
}

impl Node for AttachmentsForObjectNode {
    fn render(&self, ctx: &mut Context, env: &RenderEnv<'_>) -> Result<String, DatabaseError> {
        let attachments = match self.object.resolve(ctx).and_then(|v| v.as_owner()) {
            Some(owner) => resolve_attachments(env.db, env.registry, &owner)?,
            None => Vec::new(),
        };
        let var_name = self.resolve_var_name(ctx);
        ctx.insert(
            &var_name,
            Value::List(attachments.into_iter().map(Value::from).collect()),
        );
        Ok(String::new())
    }
}

/// View model for the upload form block (`attachments/add_form.html`).
pub fn attachment_form(
    ctx: &Context,
    env: &RenderEnv<'_>,
    owner: &OwnerReference,
) -> UploadFormView {
    build_upload_form_view(
        env.permissions,
        ctx.user(),
        owner,
        env.urls,
        ctx.request_uri(),
    )
}

/// View model for the delete link block (`attachments/delete_link.html`).
pub fn attachment_delete_link(
    ctx: &Context,
    env: &RenderEnv<'_>,
    attachment: &Attachment,
) -> DeleteLinkView {
    build_delete_link_view(
        env.permissions,
        ctx.user(),
        attachment,
        env.urls,
        ctx.request_uri(),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::owner::OwnerResolver;

    struct NoRecords;

    impl OwnerResolver for NoRecords {
        fn lookup(
            &self,
            _identifier: &str,
        ) -> Result<Option<crate::owner::OwnerRecord>, DatabaseError> {
            Ok(None)
        }
    }

    fn registry() -> OwnerRegistry {
        let mut registry = OwnerRegistry::new();
        registry.register("blog.post".parse().unwrap(), Arc::new(NoRecords));
        registry
    }

    fn tokens(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    #[test]
    fn test_object_shape() {
        let node = AttachmentNode::handle_token(
            AttachmentNodeKind::Form,
            &tokens("get_attachment_form for post as form"),
            &registry(),
        )
        .unwrap();
        assert_eq!(node.target, Target::Object(Expr::parse("post")));
        assert_eq!(node.as_varname, "form");
    }

    #[test]
    fn test_typed_shape() {
        let node = AttachmentNode::handle_token(
            AttachmentNodeKind::List,
            &tokens("get_attachment_list for blog.post 42 as files"),
            &registry(),
        )
        .unwrap();
        assert_eq!(
            node.target,
            Target::Typed {
                type_tag: "blog.post".parse().unwrap(),
                identifier: Expr::Int(42),
            }
        );
        assert_eq!(node.as_varname, "files");
    }

    #[test]
    fn test_grammar_errors_name_directive_and_token() {
        let registry = registry();
        let cases = [
            ("get_attachment_form with post as form", "'with'"),
            ("get_attachment_form for post into form", "'into'"),
            ("get_attachment_form for blog.post 42 into form", "'into'"),
            ("get_attachment_form for blog.post 42 result", "'42'"),
            ("get_attachment_form for post", "4 or 5 arguments"),
            ("get_attachment_form", "must be 'for'"),
            ("get_attachment_form for blogpost 42 as form", "'blogpost'"),
            ("get_attachment_form for shop.product 42 as form", "'shop.product'"),
        ];
        for (source, fragment) in cases {
            let err = AttachmentNode::handle_token(
                AttachmentNodeKind::Form,
                &tokens(source),
                &registry,
            )
            .unwrap_err();
            assert!(err.0.contains("get_attachment_form"), "{source}: {err}");
            assert!(err.0.contains(fragment), "{source}: {err}");
        }
    }

    #[test]
    fn test_attachments_for_defaults() {
        let node = AttachmentsForObjectNode::handle_token(&tokens("get_attachments_for post")).unwrap();
        assert_eq!(node.object, Expr::parse("post"));
        assert_eq!(node.var_name, Expr::Quoted("attachments".to_string()));
        assert_eq!(node.resolve_var_name(&Context::new()), "attachments");
    }

    #[test]
    fn test_attachments_for_var_name() {
        let node = AttachmentsForObjectNode::handle_token(&tokens(
            "get_attachments_for post as \"my_attachments\"",
        ))
        .unwrap();
        assert_eq!(node.resolve_var_name(&Context::new()), "my_attachments");

        let node =
            AttachmentsForObjectNode::handle_token(&tokens("get_attachments_for post as name"))
                .unwrap();
        assert_eq!(node.resolve_var_name(&Context::new()), "name");
        let ctx = Context::new().with("name", "bound");
        assert_eq!(node.resolve_var_name(&ctx), "bound");
    }

    #[test]
    fn test_attachments_for_errors() {
        assert!(AttachmentsForObjectNode::handle_token(&tokens("get_attachments_for")).is_err());
        assert!(
            AttachmentsForObjectNode::handle_token(&tokens("get_attachments_for as x")).is_err()
        );
        assert!(
            AttachmentsForObjectNode::handle_token(&tokens("get_attachments_for post as")).is_err()
        );
    }
}
