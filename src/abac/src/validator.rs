//! Whitelisting of stored action and subject tokens

use crate::error::Result;
use crate::types::{Action, SubjectType};

/// Whether `token` is one of the known actions (exact, case-sensitive)
pub fn is_valid_action(token: &str) -> bool {
    Action::ALL.iter().any(|action| action.as_str() == token)
}

/// Whether `token` is one of the known subject types (exact, case-sensitive)
pub fn is_valid_subject(token: &str) -> bool {
    SubjectType::ALL.iter().any(|subject| subject.as_str() == token)
}

/// Narrow an action token, failing with `MalformedPermission`
pub fn parse_action(token: &str) -> Result<Action> {
    token.parse()
}

/// Narrow a subject token, failing with `MalformedPermission`
pub fn parse_subject(token: &str) -> Result<SubjectType> {
    token.parse()
}
