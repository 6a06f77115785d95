//! Selection Engine.
//!
//! Computes which message types emit a schema. Selecting a type forces
//! selection of everything it can `$ref` (message fields, map values) and
//! everything nested inside it, so references never dangle.

use crate::descriptor::{map_entry_fields, referenced_message};
use crate::options::message_options;
use crate::{DescriptorPool, MessageDescriptor, SynthResult};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Select the types to generate from `candidates`.
///
/// `default_generate` applies to any type without a message-level override.
/// `visited` accumulates selected names across calls; a type already in it is
/// never returned again. The result is in traversal order: each type, then
/// its field dependencies, then its nested types, depth-first.
pub fn select<'a>(
    pool: &'a dyn DescriptorPool,
    candidates: &[&'a MessageDescriptor],
    default_generate: bool,
    visited: &mut HashSet<String>,
) -> SynthResult<Vec<&'a MessageDescriptor>> {
    let mut selected = Vec::new();
    select_into(pool, candidates, default_generate, false, visited, &mut selected)?;
    Ok(selected)
}

/// Decide whether `message` generates.
///
/// Under `force`, an explicit `generate = false` is ignored and the inherited
/// default stands. An explicit `true` always wins.
fn should_generate(
    message: &MessageDescriptor,
    default_generate: bool,
    force: bool,
) -> SynthResult<bool> {
    let decision = match message_options(message)? {
        Some(opts) if force && !opts.generate => {
            trace!(message = %message.full_name, "ignoring generate=false on forced type");
            default_generate
        }
        Some(opts) => opts.generate,
        None => default_generate,
    };
    Ok(decision)
}

fn select_into<'a>(
    pool: &'a dyn DescriptorPool,
    candidates: &[&'a MessageDescriptor],
    default_generate: bool,
    force: bool,
    visited: &mut HashSet<String>,
    out: &mut Vec<&'a MessageDescriptor>,
) -> SynthResult<()> {
    for &message in candidates {
        // Map entries are rendered inline by the owning map field.
        if message.map_entry {
            continue;
        }
        if !should_generate(message, default_generate, force)? {
            continue;
        }
        if !visited.insert(message.full_name.clone()) {
            continue;
        }

        debug!(message = %message.full_name, forced = force, "selected");
        out.push(message);

        for dependency in dependencies(pool, message)? {
            select_into(pool, &[dependency], true, true, visited, out)?;
        }

        let nested: Vec<&'a MessageDescriptor> = message.nested.iter().collect();
        select_into(pool, &nested, true, true, visited, out)?;
    }
    Ok(())
}

/// Message types a selected type can `$ref` through its fields.
///
/// For a map field this is the value type, never the synthetic entry.
fn dependencies<'a>(
    pool: &'a dyn DescriptorPool,
    message: &MessageDescriptor,
) -> SynthResult<Vec<&'a MessageDescriptor>> {
    let mut deps = Vec::new();
    for field in &message.fields {
        if !field.kind.is_message() {
            continue;
        }
        if field.is_map() {
            let (_, value) = map_entry_fields(pool, message, field)?;
            if value.kind.is_message() {
                let entry = referenced_message(pool, message, field)?;
                deps.push(referenced_message(pool, entry, value)?);
            }
        } else {
            deps.push(referenced_message(pool, message, field)?);
        }
    }
    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::fixtures::*;
    use crate::{DescriptorSet, FieldKind, SynthesisError};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn opt_out(mut m: MessageDescriptor) -> MessageDescriptor {
        m.options = Some(json!({"generate": false}));
        m
    }

    fn opt_in(mut m: MessageDescriptor) -> MessageDescriptor {
        m.options = Some(json!({"generate": true}));
        m
    }

    fn run(pool: &DescriptorSet, default_generate: bool) -> Vec<String> {
        let file = &pool.files()[0];
        let roots: Vec<&MessageDescriptor> = file.messages.iter().collect();
        select(pool, &roots, default_generate, &mut HashSet::new())
            .unwrap()
            .into_iter()
            .map(|m| m.full_name.clone())
            .collect()
    }

    #[test]
    fn test_default_policy_applies_without_overrides() {
        let pool = set(vec![file(vec![
            message("test.v1.A", vec![]),
            message("test.v1.B", vec![]),
        ])]);
        assert_eq!(run(&pool, true), vec!["test.v1.A", "test.v1.B"]);
        assert!(run(&pool, false).is_empty());
    }

    #[test]
    fn test_explicit_overrides_at_top_level() {
        let pool = set(vec![file(vec![
            opt_out(message("test.v1.Hidden", vec![])),
            opt_in(message("test.v1.Shown", vec![])),
        ])]);
        assert_eq!(run(&pool, true), vec!["test.v1.Shown"]);
        assert_eq!(run(&pool, false), vec!["test.v1.Shown"]);
    }

    #[test]
    fn test_forced_inclusion_overrides_nested_opt_out() {
        let mut parent = opt_in(message("test.v1.P", vec![]));
        parent.nested.push(opt_out(message("test.v1.P.N", vec![])));
        let pool = set(vec![file(vec![parent])]);
        assert_eq!(run(&pool, false), vec!["test.v1.P", "test.v1.P.N"]);
    }

    #[test]
    fn test_field_dependencies_are_forced() {
        let pool = set(vec![file(vec![
            opt_in(message(
                "test.v1.User",
                vec![message_field("home", 1, "test.v1.Address")],
            )),
            opt_out(message("test.v1.Address", vec![])),
        ])]);
        assert_eq!(run(&pool, false), vec!["test.v1.User", "test.v1.Address"]);
    }

    #[test]
    fn test_unselected_parent_does_not_force_children() {
        let mut parent = message("test.v1.P", vec![message_field("d", 1, "test.v1.D")]);
        parent.nested.push(message("test.v1.P.N", vec![]));
        let pool = set(vec![file(vec![parent, message("test.v1.D", vec![])])]);
        assert!(run(&pool, false).is_empty());
    }

    #[test]
    fn test_map_value_is_the_dependency_not_the_entry() {
        let (owners, entry) = map_field(
            "test.v1.Index",
            "owners",
            1,
            FieldKind::String,
            message_field("value", 2, "test.v1.Owner"),
        );
        let mut index = opt_in(message("test.v1.Index", vec![owners]));
        index.nested.push(entry);
        let pool = set(vec![file(vec![index, message("test.v1.Owner", vec![])])]);
        assert_eq!(run(&pool, false), vec!["test.v1.Index", "test.v1.Owner"]);
    }

    #[test]
    fn test_cycles_terminate_and_each_type_appears_once() {
        let pool = set(vec![file(vec![
            message(
                "test.v1.A",
                vec![
                    message_field("b", 1, "test.v1.B"),
                    message_field("me", 2, "test.v1.A"),
                ],
            ),
            message("test.v1.B", vec![message_field("a", 1, "test.v1.A")]),
        ])]);
        assert_eq!(run(&pool, true), vec!["test.v1.A", "test.v1.B"]);
    }

    #[test]
    fn test_visited_persists_across_calls() {
        let pool = set(vec![file(vec![message("test.v1.A", vec![])])]);
        let roots: Vec<&MessageDescriptor> = pool.files()[0].messages.iter().collect();
        let mut visited = HashSet::new();
        assert_eq!(select(&pool, &roots, true, &mut visited).unwrap().len(), 1);
        assert!(select(&pool, &roots, true, &mut visited).unwrap().is_empty());
    }

    #[test]
    fn test_closure_is_complete() {
        let mut user = message(
            "test.v1.User",
            vec![
                message_field("home", 1, "test.v1.User.Address"),
                repeated(message_field("friends", 2, "test.v1.User")),
                message_field("meta", 3, "test.v1.Meta"),
            ],
        );
        user.nested.push(message(
            "test.v1.User.Address",
            vec![message_field("geo", 1, "test.v1.Geo")],
        ));
        let pool = set(vec![file(vec![
            user,
            opt_out(message("test.v1.Meta", vec![])),
            opt_out(message("test.v1.Geo", vec![])),
        ])]);

        let selected = run(&pool, true);
        let names: HashSet<&str> = selected.iter().map(String::as_str).collect();
        for name in &selected {
            let m = pool.message(name).unwrap();
            for dep in dependencies(&pool, m).unwrap() {
                assert!(names.contains(dep.full_name.as_str()), "{name} -> {}", dep.full_name);
            }
            for nested in &m.nested {
                assert!(names.contains(nested.full_name.as_str()));
            }
        }
        assert_eq!(selected.len(), 4);
    }

    #[test]
    fn test_unknown_dependency_is_unresolved() {
        let pool = set(vec![file(vec![message(
            "test.v1.User",
            vec![message_field("ghost", 1, "test.v1.Ghost")],
        )])]);
        let roots: Vec<&MessageDescriptor> = pool.files()[0].messages.iter().collect();
        let err = select(&pool, &roots, true, &mut HashSet::new()).unwrap_err();
        assert!(matches!(err, SynthesisError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_malformed_message_option_fails() {
        let mut m = message("test.v1.User", vec![]);
        m.options = Some(json!({"generate": "yes"}));
        let pool = set(vec![file(vec![m])]);
        let roots: Vec<&MessageDescriptor> = pool.files()[0].messages.iter().collect();
        assert!(matches!(
            select(&pool, &roots, true, &mut HashSet::new()),
            Err(SynthesisError::MalformedOption { .. })
        ));
    }
}
