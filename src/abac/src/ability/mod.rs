//! Compiled abilities
//!
//! An [`Ability`] is the immutable result of compiling one user's permission
//! records. Rules are kept in source order and indexed by `(subject, action)`
//! so a query only touches the rules that can apply to it:
//!
//! ```text
//! query (read, Article) ─┬─ (Article, read)
//!                        ├─ (Article, manage)
//!                        ├─ (all, read)
//!                        └─ (all, manage)
//! ```
//!
//! Abilities are shared as `Arc<Ability>` between the cache and every caller
//! holding a snapshot.

pub mod compiler;
pub mod evaluator;

pub use compiler::{AbilityCompiler, CompileReport, SkippedRecord};
pub use evaluator::{AccessFilter, Target};

use crate::types::{Action, Conditions, SubjectObject, SubjectType, UserId};
use serde::Serialize;
use std::collections::HashMap;

/// A validated rule with concrete conditions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledRule {
    /// Granted action
    pub action: Action,

    /// Subject the rule applies to
    pub subject: SubjectType,

    /// Field values an object must carry; empty means unconditional
    pub conditions: Conditions,

    /// Position of the source record in the user's permission list
    pub source_index: usize,
}

impl CompiledRule {
    /// Create a new compiled rule
    pub fn new(action: Action, subject: SubjectType, conditions: Conditions, source_index: usize) -> Self {
        Self {
            action,
            subject,
            conditions,
            source_index,
        }
    }

    /// Whether the rule applies regardless of object fields
    pub fn is_unconditional(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether the rule grants `action` on `subject`, ignoring conditions
    pub fn applies_to(&self, action: Action, subject: SubjectType) -> bool {
        self.action.covers(action) && self.subject.covers(subject)
    }

    /// Whether every condition equals the object's field of the same name
    pub fn matches_object(&self, object: &SubjectObject) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| object.field(field) == Some(expected))
    }
}

/// Immutable set of compiled rules for one user
#[derive(Debug, Clone)]
pub struct Ability {
    user_id: UserId,
    rules: Vec<CompiledRule>,
    index: HashMap<(SubjectType, Action), Vec<usize>>,
}

impl Ability {
    /// Build an ability from compiled rules
    pub fn new(user_id: UserId, rules: Vec<CompiledRule>) -> Self {
        let mut index: HashMap<(SubjectType, Action), Vec<usize>> = HashMap::new();
        for (position, rule) in rules.iter().enumerate() {
            index.entry((rule.subject, rule.action)).or_default().push(position);
        }

        Self {
            user_id,
            rules,
            index,
        }
    }

    /// An ability that denies everything
    pub fn empty(user_id: UserId) -> Self {
        Self::new(user_id, Vec::new())
    }

    /// User this ability was compiled for
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// All rules, in source order
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Number of compiled rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the ability has no rules (denies everything)
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules that may grant `action` on `subject`, in source order.
    ///
    /// Includes rules on the `all` wildcard and `manage` rules.
    pub fn relevant_rules(&self, action: Action, subject: SubjectType) -> Vec<&CompiledRule> {
        let mut subjects = vec![subject];
        if subject != SubjectType::All {
            subjects.push(SubjectType::All);
        }
        let mut actions = vec![action];
        if action != Action::Manage {
            actions.push(Action::Manage);
        }

        let mut positions: Vec<usize> = subjects
            .iter()
            .flat_map(|s| actions.iter().map(move |a| (*s, *a)))
            .filter_map(|key| self.index.get(&key))
            .flatten()
            .copied()
            .collect();
        positions.sort_unstable();

        positions.into_iter().map(|position| &self.rules[position]).collect()
    }
}
