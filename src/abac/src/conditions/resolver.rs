//! Recursive placeholder substitution over a conditions template

use super::placeholder;
use crate::error::{AbacError, Result};
use crate::types::{json_kind, Conditions, UserContext};
use serde_json::{Map, Value};

/// Maximum nesting of arrays and objects accepted in a template
pub const MAX_TEMPLATE_DEPTH: usize = 32;

/// Resolve a conditions template against a user.
///
/// A `null` template resolves to no conditions (unconditional). Any other
/// non-object template, or one nested deeper than [`MAX_TEMPLATE_DEPTH`], is an
/// [`AbacError::UnresolvableCondition`]; the caller must drop the record rather
/// than treat it as unconditional.
pub fn resolve(template: &Value, user: &UserContext) -> Result<Conditions> {
    match template {
        Value::Null => Ok(Map::new()),
        Value::Object(fields) => resolve_object(fields, user, 1),
        other => Err(AbacError::UnresolvableCondition(format!(
            "conditions template must be an object, got {}",
            json_kind(other)
        ))),
    }
}

fn resolve_object(fields: &Map<String, Value>, user: &UserContext, depth: usize) -> Result<Conditions> {
    fields
        .iter()
        .map(|(key, value)| Ok((key.clone(), resolve_value(value, user, depth)?)))
        .collect()
}

fn resolve_value(value: &Value, user: &UserContext, depth: usize) -> Result<Value> {
    match value {
        Value::String(s) => Ok(match placeholder::lookup(s) {
            Some(extract) => extract(user),
            None => value.clone(),
        }),
        Value::Array(items) => {
            check_depth(depth)?;
            items
                .iter()
                .map(|item| resolve_value(item, user, depth + 1))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        Value::Object(fields) => {
            check_depth(depth)?;
            resolve_object(fields, user, depth + 1).map(Value::Object)
        }
        _ => Ok(value.clone()),
    }
}

fn check_depth(depth: usize) -> Result<()> {
    if depth >= MAX_TEMPLATE_DEPTH {
        return Err(AbacError::UnresolvableCondition(format!(
            "conditions template nested deeper than {} levels",
            MAX_TEMPLATE_DEPTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn user() -> UserContext {
        UserContext::new(7, "alice@example.com")
    }

    #[test]
    fn test_resolve_user_id() {
        let resolved = resolve(&json!({"authorId": "$user.id"}), &user()).unwrap();
        assert_eq!(Value::Object(resolved), json!({"authorId": 7}));
    }

    #[test]
    fn test_resolve_nested_and_arrays() {
        let template = json!({
            "owner": {"id": "$user.id", "contact": "$user.email"},
            "reviewers": ["$user.id", 42, "$user.email", null],
            "published": true
        });

        let resolved = resolve(&template, &user()).unwrap();
        assert_eq!(
            Value::Object(resolved),
            json!({
                "owner": {"id": 7, "contact": "alice@example.com"},
                "reviewers": [7, 42, "alice@example.com", null],
                "published": true
            })
        );
    }

    #[test]
    fn test_partial_tokens_are_literals() {
        let template = json!({"path": "users/$user.id", "name": "$user.name"});
        let resolved = resolve(&template, &user()).unwrap();
        assert_eq!(Value::Object(resolved), template);
    }

    #[test]
    fn test_null_and_empty_templates_are_unconditional() {
        assert!(resolve(&Value::Null, &user()).unwrap().is_empty());
        assert!(resolve(&json!({}), &user()).unwrap().is_empty());
    }

    #[test]
    fn test_non_object_template_is_rejected() {
        for template in [json!("$user.id"), json!([1, 2]), json!(3), json!(true)] {
            let err = resolve(&template, &user()).unwrap_err();
            assert!(matches!(err, AbacError::UnresolvableCondition(_)), "{}", template);
        }
    }

    #[test]
    fn test_too_deep_template_is_rejected() {
        let mut template = json!("$user.id");
        for _ in 0..MAX_TEMPLATE_DEPTH + 1 {
            template = json!({ "nested": template });
        }

        let err = resolve(&template, &user()).unwrap_err();
        assert!(matches!(err, AbacError::UnresolvableCondition(_)));
    }

    #[test]
    fn test_depth_within_limit_resolves() {
        let mut template = json!("$user.id");
        for _ in 0..MAX_TEMPLATE_DEPTH - 1 {
            template = json!({ "nested": template });
        }

        assert!(resolve(&template, &user()).is_ok());
    }

    fn concrete_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 ._-]{0,12}".prop_map(Value::from),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-zA-Z]{1,8}", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn test_resolving_concrete_conditions_is_identity(
            fields in prop::collection::btree_map("[a-zA-Z]{1,8}", concrete_json(), 0..6)
        ) {
            let template = Value::Object(fields.into_iter().collect());
            let resolved = resolve(&template, &user()).unwrap();
            prop_assert_eq!(Value::Object(resolved.clone()), template);

            // Resolving the output again changes nothing either
            let again = resolve(&Value::Object(resolved.clone()), &user()).unwrap();
            prop_assert_eq!(again, resolved);
        }
    }
}
