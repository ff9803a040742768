//! Compiles a user's permission records into an [`Ability`]
//!
//! Each record goes through three steps: action validation, subject
//! validation, then conditions resolution. A record failing any step is
//! skipped and reported; the remaining records still compile. A malformed
//! record therefore grants nothing instead of aborting the build or widening
//! into an unconditional rule.

use super::{Ability, CompiledRule};
use crate::conditions;
use crate::error::{AbacError, Result};
use crate::types::{PermissionRecord, UserContext};
use crate::validator;
use tracing::{debug, warn};

/// A permission record left out of an ability
#[derive(Debug)]
pub struct SkippedRecord {
    /// Position of the record in the user's permission list
    pub index: usize,

    /// The record as stored
    pub record: PermissionRecord,

    /// Why the record was skipped
    pub reason: AbacError,
}

/// Outcome details of one compilation
#[derive(Debug, Default)]
pub struct CompileReport {
    /// Number of records turned into rules
    pub compiled: usize,

    /// Records that were dropped
    pub skipped: Vec<SkippedRecord>,
}

impl CompileReport {
    /// Whether every record compiled
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Stateless permission compiler
#[derive(Debug, Clone, Copy, Default)]
pub struct AbilityCompiler;

impl AbilityCompiler {
    /// Create a new compiler
    pub fn new() -> Self {
        Self
    }

    /// Compile the user's permissions, dropping invalid records
    pub fn compile(&self, user: &UserContext) -> Ability {
        self.compile_with_report(user).0
    }

    /// Compile the user's permissions and report skipped records
    pub fn compile_with_report(&self, user: &UserContext) -> (Ability, CompileReport) {
        let mut rules = Vec::with_capacity(user.permissions.len());
        let mut report = CompileReport::default();

        for (index, record) in user.permissions.iter().enumerate() {
            match Self::compile_record(index, record, user) {
                Ok(rule) => rules.push(rule),
                Err(reason) => {
                    warn!(
                        user_id = user.id,
                        index,
                        action = %record.action,
                        subject = %record.subject,
                        "Skipping invalid permission: {}",
                        reason
                    );
                    report.skipped.push(SkippedRecord {
                        index,
                        record: record.clone(),
                        reason,
                    });
                }
            }
        }

        report.compiled = rules.len();
        debug!(
            user_id = user.id,
            role = ?user.role,
            compiled = report.compiled,
            skipped = report.skipped.len(),
            "Compiled ability"
        );

        (Ability::new(user.id, rules), report)
    }

    fn compile_record(index: usize, record: &PermissionRecord, user: &UserContext) -> Result<CompiledRule> {
        let action = validator::parse_action(&record.action)?;
        let subject = validator::parse_subject(&record.subject)?;
        let conditions = conditions::resolve(&record.conditions, user)?;

        Ok(CompiledRule::new(action, subject, conditions, index))
    }
}
