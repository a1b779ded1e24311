mod common;

use attachments::permissions::{Permission, User};
use attachments::storage::models::{FileReference, NewAttachment};
use attachments::template::{attachment_delete_link, attachment_form, Context, Value};
use attachments::AppState;
use chrono::{Duration, TimeZone, Utc};
use common::{grant, live_post, post, test_state};

fn attach(state: &AppState, pk: u64, name: &str, creator: &str, minutes: i64) -> u64 {
    let owner = post(pk);
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes);
    state
        .db
        .insert_attachment(
            NewAttachment {
                file: FileReference {
                    path: FileReference::storage_path(&owner, name),
                    original_name: name.to_string(),
                    mime_type: "text/plain".to_string(),
                    byte_size: 4,
                },
                owner,
                creator: creator.to_string(),
            },
            at,
        )
        .unwrap()
        .id
}

fn listed_ids(value: Option<&Value>) -> Vec<u64> {
    match value {
        Some(Value::List(items)) => items
            .iter()
            .map(|item| match item {
                Value::Attachment(attachment) => attachment.id,
                other => panic!("expected attachment, got {other:?}"),
            })
            .collect(),
        other => panic!("expected list, got {other:?}"),
    }
}

#[test]
fn test_list_for_object_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let owner = live_post(&state, 1);
    let old = attach(&state, 1, "old.txt", "alice", 0);
    let new = attach(&state, 1, "new.txt", "alice", 5);
    attach(&state, 2, "other.txt", "alice", 10);

    let node = state
        .template_library()
        .parse("get_attachment_list for post as files")
        .unwrap();
    let mut ctx = Context::new().with("post", owner);
    let output = node.render(&mut ctx, &state.render_env()).unwrap();

    assert_eq!(output, "");
    assert_eq!(listed_ids(ctx.get("files")), vec![new, old]);
}

#[test]
fn test_typed_shape_with_variable_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    live_post(&state, 3);
    attach(&state, 3, "a.txt", "alice", 0);
    attach(&state, 3, "b.txt", "bob", 1);

    let library = state.template_library();
    let count = library
        .parse("get_attachment_count for blog.post post_id as n")
        .unwrap();
    let list = library
        .parse("get_attachment_list for blog.post 3 as files")
        .unwrap();

    let mut ctx = Context::new().with("post_id", 3i64);
    count.render(&mut ctx, &state.render_env()).unwrap();
    list.render(&mut ctx, &state.render_env()).unwrap();

    assert_eq!(ctx.get("n"), Some(&Value::Int(2)));
    assert_eq!(listed_ids(ctx.get("files")).len(), 2);
}

#[test]
fn test_unresolvable_references_bind_empty_results() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    live_post(&state, 1);
    attach(&state, 1, "a.txt", "alice", 0);
    // Attachments exist but the owning record is not live
    attach(&state, 9, "orphan.txt", "alice", 0);

    let library = state.template_library();
    let env = state.render_env();

    let form = library.parse("get_attachment_form for missing as form").unwrap();
    let list = library.parse("get_attachment_list for missing as files").unwrap();
    let count = library
        .parse("get_attachment_count for blog.post missing_id as n")
        .unwrap();
    let orphan = library
        .parse("get_attachment_list for blog.post 9 as orphaned")
        .unwrap();
    let for_missing = library.parse("get_attachments_for missing as \"found\"").unwrap();

    let mut ctx = Context::new();
    form.render(&mut ctx, &env).unwrap();
    list.render(&mut ctx, &env).unwrap();
    count.render(&mut ctx, &env).unwrap();
    orphan.render(&mut ctx, &env).unwrap();
    for_missing.render(&mut ctx, &env).unwrap();

    assert_eq!(ctx.get("form"), Some(&Value::Null));
    assert_eq!(ctx.get("files"), Some(&Value::List(Vec::new())));
    assert_eq!(ctx.get("n"), Some(&Value::Int(0)));
    assert_eq!(ctx.get("orphaned"), Some(&Value::List(Vec::new())));
    assert_eq!(ctx.get("found"), Some(&Value::List(Vec::new())));
}

#[test]
fn test_form_binds_upload_form_for_live_owner() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let owner = live_post(&state, 5);

    let node = state
        .template_library()
        .parse("get_attachment_form for post as upload")
        .unwrap();

    let mut ctx = Context::new().with("post", owner);
    node.render(&mut ctx, &state.render_env()).unwrap();
    match ctx.get("upload") {
        Some(Value::Form(form)) => {
            assert_eq!(form.form_url, "/attachments/add-for/blog/post/5/");
            assert_eq!(form.file_field, "attachment_file");
        }
        other => panic!("expected form, got {other:?}"),
    }
}

#[test]
fn test_parsed_node_renders_independently_per_context() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let first = live_post(&state, 1);
    let second = live_post(&state, 2);
    let a = attach(&state, 1, "a.txt", "alice", 0);
    let b = attach(&state, 2, "b.txt", "alice", 0);

    let node = state
        .template_library()
        .parse("get_attachments_for post as \"files\"")
        .unwrap();
    let env = state.render_env();

    let mut one = Context::new().with("post", first);
    let mut two = Context::new().with("post", second);
    node.render(&mut one, &env).unwrap();
    node.render(&mut two, &env).unwrap();

    assert_eq!(listed_ids(one.get("files")), vec![a]);
    assert_eq!(listed_ids(two.get("files")), vec![b]);
}

#[test]
fn test_attachments_for_object_forms() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    live_post(&state, 4);
    let id = attach(&state, 4, "a.txt", "alice", 0);

    let library = state.template_library();
    let env = state.render_env();

    // Default variable name, quoted owner literal
    let node = library.parse("get_attachments_for \"blog.post:4\"").unwrap();
    let mut ctx = Context::new();
    node.render(&mut ctx, &env).unwrap();
    assert_eq!(listed_ids(ctx.get("attachments")), vec![id]);

    // Variable name taken from the context
    let node = library
        .parse("get_attachments_for \"blog.post:4\" as target")
        .unwrap();
    let mut ctx = Context::new().with("target", "bound_name");
    node.render(&mut ctx, &env).unwrap();
    assert_eq!(listed_ids(ctx.get("bound_name")), vec![id]);
}

#[test]
fn test_syntax_errors() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let library = state.template_library();

    let err = library.parse("get_attachment_form for shop.item 1 as f").unwrap_err();
    assert!(err.to_string().contains("non-existent type tag"), "{err}");

    let err = library.parse("get_attachment_list on post as files").unwrap_err();
    assert!(err.to_string().contains("'on'"), "{err}");

    let err = library.parse("get_attachment_thumbnail for post as t").unwrap_err();
    assert!(err.to_string().contains("get_attachment_thumbnail"), "{err}");

    assert!(library.parse("   ").is_err());
}

#[test]
fn test_helpers_follow_permissions() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let owner = live_post(&state, 1);
    let id = attach(&state, 1, "a.txt", "alice", 0);
    let attachment = state.db.get_attachment(id).unwrap().unwrap();

    grant(
        &state,
        "alice",
        &[Permission::AddAttachment, Permission::DeleteAttachment],
    );
    grant(&state, "bob", &[Permission::DeleteAttachment]);

    let env = state.render_env();
    let alice = Context::new()
        .with_user(User::new("alice"))
        .with_request_uri("/posts/1/");
    let bob = Context::new().with_user(User::new("bob"));
    let anonymous = Context::new();

    let form = attachment_form(&alice, &env, &owner);
    assert_eq!(form.template, "attachments/add_form.html");
    assert!(form.form.is_some());
    assert_eq!(form.next.as_deref(), Some("/posts/1/"));
    assert!(attachment_form(&bob, &env, &owner).form.is_none());
    assert!(attachment_form(&anonymous, &env, &owner).form.is_none());

    let link = attachment_delete_link(&alice, &env, &attachment);
    assert_eq!(link.template, "attachments/delete_link.html");
    assert_eq!(
        link.delete_url.as_deref(),
        Some(format!("/attachments/delete/{id}/").as_str())
    );
    assert!(attachment_delete_link(&bob, &env, &attachment)
        .delete_url
        .is_none());
    assert!(attachment_delete_link(&anonymous, &env, &attachment)
        .delete_url
        .is_none());
}
