//! # Scribe ABAC
//!
//! Attribute-based ability engine. Permission records are stored per role as
//! data (`action`, `subject`, conditions template) and compiled, per user, into
//! an immutable [`Ability`] that answers "may this user do X to Y?".
//!
//! ## Features
//!
//! - **Placeholder resolution** of `"$user.id"` / `"$user.email"` in stored conditions
//! - **Whitelisted rules**: unknown actions or subjects are dropped, never widened
//! - **Coarse and fine checks** against a subject type or a concrete object
//! - **Union semantics**: no deny rules, `manage` and `all` as wildcards
//! - **Per-user cache** with TTL, capacity bound and invalidation fences
//!
//! ## Example
//!
//! ```rust
//! use scribe_abac::{
//!     AbilityEngine, Action, InMemoryPermissionStore, PermissionRecord, SubjectObject, SubjectType,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryPermissionStore::new());
//!     store
//!         .put_role(
//!             "author",
//!             vec![PermissionRecord::new("update", "Article", json!({ "authorId": "$user.id" }))],
//!         )
//!         .await;
//!     store.put_user(7, "alice@example.com", Some("author")).await;
//!
//!     let engine = AbilityEngine::with_defaults(store)?;
//!     let ability = engine.get_ability(7).await?;
//!
//!     let own = SubjectObject::new(SubjectType::Article).with_field("authorId", 7);
//!     assert!(ability.can(Action::Update, &own));
//!     assert!(ability.cannot(Action::Delete, SubjectType::Article));
//!
//!     Ok(())
//! }
//! ```

pub mod ability;
pub mod conditions;
pub mod config;
pub mod engine;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use ability::{
    Ability, AbilityCompiler, AccessFilter, CompileReport, CompiledRule, SkippedRecord, Target,
};
pub use config::AbacConfig;
pub use engine::{AbilityCache, AbilityEngine, CacheConfig, CacheStats, EngineConfig, EngineMetrics};
pub use error::{AbacError, Result};
pub use store::{InMemoryPermissionStore, PermissionStore};
pub use types::{
    Action, Conditions, PermissionRecord, Subject, SubjectObject, SubjectType, UserContext, UserId,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
