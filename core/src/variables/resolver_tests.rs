//! Tests for VariableResolver
//!
//! Covers nesting, aliases, the depth bound and preview mode.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use super::{ResolveMode, VariableDefinition, VariableError, VariableRegistry, VariableResolver};
use crate::clock::ManualClock;
use crate::custom_variables::CustomVariableStore;
use crate::trigger::{TriggerContext, TriggerKind};

fn resolver() -> VariableResolver {
    let clock = Arc::new(ManualClock::starting_now());
    let store = Arc::new(CustomVariableStore::new(clock));
    VariableResolver::new(Arc::new(VariableRegistry::with_builtins()), store)
}

fn chat_context(user: &str, args: &[&str]) -> TriggerContext {
    TriggerContext::new(TriggerKind::Command, user)
        .with_command("shoutout", "!so")
        .with_args(args.iter().copied())
}

#[test]
fn plain_text_is_returned_unchanged() {
    let r = resolver();
    let ctx = chat_context("alice", &[]);
    assert_eq!(r.resolve("no handles here", &ctx).unwrap(), "no handles here");
}

#[test]
fn user_and_args_are_substituted() {
    let r = resolver();
    let ctx = chat_context("alice", &["@bob", "extra"]);

    assert_eq!(
        r.resolve("Go follow $target, says $user!", &ctx).unwrap(),
        "Go follow bob, says alice!"
    );
    assert_eq!(r.resolve("$arg[2] / $argCount", &ctx).unwrap(), "extra / 2");
    assert_eq!(r.resolve("[$arg[all]]", &ctx).unwrap(), "[@bob extra]");
    assert_eq!(r.resolve("$arg[9]", &ctx).unwrap(), "");
}

#[test]
fn resolution_is_idempotent_on_resolved_text() {
    let r = resolver();
    let ctx = chat_context("alice", &["bob"]);
    let once = r.resolve("hi $user and $arg[1]", &ctx).unwrap();
    assert_eq!(r.resolve(&once, &ctx).unwrap(), once);
}

#[test]
fn viewer_input_is_not_re_expanded() {
    let r = resolver();
    let ctx = chat_context("alice", &["$user"]);
    assert_eq!(r.resolve("echo $arg[1]", &ctx).unwrap(), "echo $user");
}

#[test]
fn unknown_handles_resolve_to_empty() {
    let r = resolver();
    let ctx = chat_context("alice", &[]);
    assert_eq!(r.resolve("a$notAThing[1, 2]b", &ctx).unwrap(), "ab");
}

#[test]
fn nested_arguments_resolve_first() {
    let r = resolver();
    let ctx = chat_context("alice", &["3"]);
    assert_eq!(
        r.resolve("$if[$arg[1], >, 2, big, small]", &ctx).unwrap(),
        "big"
    );
    assert_eq!(
        r.resolve("$if[$user, ==, bob, yes, no]", &ctx).unwrap(),
        "no"
    );
}

#[test]
fn effect_output_alias_walks_path() {
    let r = resolver();
    let ctx = chat_context("alice", &[])
        .with_output("winner", json!({ "user": { "name": "carol" }, "score": 7 }));

    assert_eq!(r.resolve("&winner[user, name]", &ctx).unwrap(), "carol");
    assert_eq!(
        r.resolve("$effectOutput[winner, score]", &ctx).unwrap(),
        "7"
    );
    assert_eq!(r.resolve("&missing[name]", &ctx).unwrap(), "");
}

#[test]
fn bare_ampersand_without_output_stays_text() {
    let r = resolver();
    let ctx = chat_context("alice", &[]).with_output("winner", json!("carol"));

    assert_eq!(r.resolve("Q&A at noon", &ctx).unwrap(), "Q&A at noon");
    assert_eq!(
        r.resolve("Tom&Jerry are R&D fans", &ctx).unwrap(),
        "Tom&Jerry are R&D fans"
    );
    assert_eq!(r.resolve("gg &winner", &ctx).unwrap(), "gg carol");
}

#[test]
fn stored_templates_expand_once_more() {
    let r = resolver();
    let ctx = chat_context("alice", &[]).with_output("greeting", json!("hello $user"));
    assert_eq!(r.resolve("&greeting", &ctx).unwrap(), "hello alice");
}

#[test]
fn self_referencing_output_hits_depth_limit() {
    let r = resolver();
    let ctx = chat_context("alice", &[]).with_output("self", json!("&self"));

    let err = r.resolve("&self", &ctx).unwrap_err();
    assert_eq!(err, VariableError::DepthExceeded { depth: r.max_depth() });
}

#[test]
fn custom_variable_reads_path_and_default() {
    let r = resolver();
    r.store().set("stats", json!({ "wins": 4 }), None);
    let ctx = chat_context("alice", &[]);

    assert_eq!(r.resolve("$customVariable[stats, wins]", &ctx).unwrap(), "4");
    assert_eq!(
        r.resolve("$customVariable[stats, losses, 0]", &ctx).unwrap(),
        "0"
    );
    assert_eq!(r.resolve("$customVariable[nope, , none]", &ctx).unwrap(), "none");
}

#[test]
fn set_custom_variable_writes_in_execute_mode() {
    let r = resolver();
    let ctx = chat_context("alice", &[]);

    assert_eq!(r.resolve("$setCustomVariable[last, $user]", &ctx).unwrap(), "");
    assert_eq!(r.store().get("last"), Some(json!("alice")));
}

#[test]
fn preview_rejects_side_effects() {
    let r = resolver();
    let ctx = chat_context("alice", &[]);

    let err = r
        .resolve_with_mode("$setCustomVariable[last, x]", &ctx, ResolveMode::Preview)
        .unwrap_err();
    assert!(matches!(err, VariableError::SideEffectInPreview { .. }));
    assert_eq!(r.store().get("last"), None);

    // Read-only variables are fine in preview
    assert_eq!(
        r.resolve_with_mode("$user", &ctx, ResolveMode::Preview).unwrap(),
        "alice"
    );
}

#[test]
fn unbalanced_brackets_are_reported() {
    let r = resolver();
    let ctx = chat_context("alice", &[]);
    let err = r.resolve("hi $arg[1", &ctx).unwrap_err();
    assert_eq!(err, VariableError::UnbalancedBrackets { position: 3 });
}

#[test]
fn random_number_stays_in_range() {
    let r = resolver();
    let ctx = chat_context("alice", &[]);
    for _ in 0..50 {
        let n: i64 = r.resolve("$randomNumber[1, 6]", &ctx).unwrap().parse().unwrap();
        assert!((1..=6).contains(&n));
    }
    assert!(r.resolve("$randomNumber[6, 1]", &ctx).is_err());
}

#[test]
fn spoofed_alias_is_in_catalog_only() {
    let r = resolver();
    let catalog = r.registry().catalog();
    let alias = catalog.iter().find(|e| e.handle == "&name").unwrap();
    assert!(alias.definition.spoof);
}

#[test]
fn spoofed_handle_is_rejected_before_evaluation() {
    let clock = Arc::new(ManualClock::starting_now());
    let store = Arc::new(CustomVariableStore::new(clock));
    let mut registry = VariableRegistry::with_builtins();
    registry.register_spoof(VariableDefinition::new(
        "$overlayInstance",
        "$overlayInstance",
        "Overlay instance picked in the effect editor",
    ));
    let r = VariableResolver::new(Arc::new(registry), store);
    let ctx = chat_context("alice", &[]);

    for mode in [ResolveMode::Execute, ResolveMode::Preview] {
        let err = r
            .resolve_with_mode("show on $overlayInstance for $user", &ctx, mode)
            .unwrap_err();
        assert_eq!(
            err,
            VariableError::SpoofedVariable {
                handle: "$overlayInstance".to_string()
            }
        );
    }
}

#[test]
fn resolve_args_only_touches_strings() {
    let r = resolver();
    let ctx = chat_context("alice", &[]);
    let mut args = Map::new();
    args.insert("message".into(), json!("hi $user"));
    args.insert("count".into(), json!(3));
    args.insert("nested".into(), json!({ "list": ["$user", true] }));

    let resolved = r.resolve_args(&args, &ctx).unwrap();
    assert_eq!(resolved["message"], json!("hi alice"));
    assert_eq!(resolved["count"], json!(3));
    assert_eq!(resolved["nested"], json!({ "list": ["alice", true] }));
    assert_ne!(resolved["message"], Value::Null);
}
