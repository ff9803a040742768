//! Placeholder token table

use crate::types::UserContext;
use serde_json::Value;

/// Extracts the substituted value from the user context
pub type Extractor = fn(&UserContext) -> Value;

/// Recognized placeholder tokens
const PLACEHOLDERS: &[(&str, Extractor)] = &[
    ("$user.id", user_id),
    ("$user.email", user_email),
];

fn user_id(user: &UserContext) -> Value {
    Value::from(user.id)
}

fn user_email(user: &UserContext) -> Value {
    Value::from(user.email.as_str())
}

/// Find the extractor for a token. Only exact matches are recognized.
pub fn lookup(token: &str) -> Option<Extractor> {
    PLACEHOLDERS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, extractor)| *extractor)
}

/// All recognized tokens
pub fn tokens() -> impl Iterator<Item = &'static str> {
    PLACEHOLDERS.iter().map(|(name, _)| *name)
}
