//! Permission queries over a compiled [`Ability`]
//!
//! Decisions are the union of every candidate rule: there are no deny rules,
//! so adding a rule can only grant more and rule order never matters.
//!
//! - A coarse query against a bare subject type succeeds if any candidate rule
//!   exists, conditional or not. It answers "could this user ever do this",
//!   e.g. before creating an object that does not exist yet.
//! - A fine query against a concrete object succeeds if some candidate rule's
//!   conditions all equal the object's fields.

use super::Ability;
use crate::error::{AbacError, Result};
use crate::types::{Action, Conditions, SubjectObject, SubjectType};

/// What a permission query is about
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// Any object of the subject type
    Type(SubjectType),
    /// One concrete object
    Object(&'a SubjectObject),
}

impl Target<'_> {
    /// Subject type of the target
    pub fn subject_type(&self) -> SubjectType {
        match self {
            Target::Type(subject) => *subject,
            Target::Object(object) => object.subject_type,
        }
    }
}

impl From<SubjectType> for Target<'_> {
    fn from(subject: SubjectType) -> Self {
        Target::Type(subject)
    }
}

impl<'a> From<&'a SubjectObject> for Target<'a> {
    fn from(object: &'a SubjectObject) -> Self {
        Target::Object(object)
    }
}

/// Which objects of a subject type an ability grants an action on
#[derive(Debug, Clone, PartialEq)]
pub enum AccessFilter {
    /// Every object
    Unrestricted,
    /// Objects matching at least one of the condition sets
    AnyOf(Vec<Conditions>),
    /// No object
    Denied,
}

impl AccessFilter {
    /// Whether the filter admits the object's fields
    pub fn matches(&self, object: &SubjectObject) -> bool {
        match self {
            AccessFilter::Unrestricted => true,
            AccessFilter::AnyOf(sets) => sets.iter().any(|conditions| {
                conditions
                    .iter()
                    .all(|(field, expected)| object.field(field) == Some(expected))
            }),
            AccessFilter::Denied => false,
        }
    }

    /// Whether the filter admits nothing
    pub fn is_denied(&self) -> bool {
        matches!(self, AccessFilter::Denied)
    }
}

impl Ability {
    /// Whether the ability grants `action` on the target
    pub fn can<'a>(&self, action: Action, target: impl Into<Target<'a>>) -> bool {
        match target.into() {
            Target::Type(subject) => !self.relevant_rules(action, subject).is_empty(),
            Target::Object(object) => self
                .relevant_rules(action, object.subject_type)
                .into_iter()
                .any(|rule| rule.matches_object(object)),
        }
    }

    /// Negation of [`Ability::can`]
    pub fn cannot<'a>(&self, action: Action, target: impl Into<Target<'a>>) -> bool {
        !self.can(action, target)
    }

    /// Like [`Ability::can`], but a refusal is an [`AbacError::Forbidden`]
    pub fn authorize<'a>(&self, action: Action, target: impl Into<Target<'a>>) -> Result<()> {
        let target = target.into();
        if self.can(action, target) {
            Ok(())
        } else {
            Err(AbacError::Forbidden {
                action,
                subject: target.subject_type(),
            })
        }
    }

    /// Condition sets under which `action` is granted on `subject`.
    ///
    /// Suitable for narrowing a list query to the objects the user may see.
    pub fn access_filter(&self, action: Action, subject: SubjectType) -> AccessFilter {
        let rules = self.relevant_rules(action, subject);
        if rules.is_empty() {
            return AccessFilter::Denied;
        }
        if rules.iter().any(|rule| rule.is_unconditional()) {
            return AccessFilter::Unrestricted;
        }

        let mut sets: Vec<Conditions> = Vec::with_capacity(rules.len());
        for rule in rules {
            if !sets.contains(&rule.conditions) {
                sets.push(rule.conditions.clone());
            }
        }
        AccessFilter::AnyOf(sets)
    }

    /// Keep only the objects the ability grants `action` on
    pub fn filter_accessible<'o, I>(&self, action: Action, objects: I) -> Vec<&'o SubjectObject>
    where
        I: IntoIterator<Item = &'o SubjectObject>,
    {
        objects
            .into_iter()
            .filter(|object| self.can(action, *object))
            .collect()
    }
}
