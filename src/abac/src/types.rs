//! Core ability types

use crate::error::{AbacError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Numeric user identifier
pub type UserId = u64;

/// Concrete conditions of a compiled rule (field name -> required value).
///
/// An empty map is an unconditional rule.
pub type Conditions = Map<String, Value>;

/// Action a rule grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    /// Full access to the rule's subject
    Manage,
}

impl Action {
    /// Every action, in declaration order
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Manage,
    ];

    /// Stored token for this action
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Manage => "manage",
        }
    }

    /// Whether a rule granting `self` covers a request for `requested`
    pub fn covers(self, requested: Action) -> bool {
        self == Action::Manage || self == requested
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AbacError;

    fn from_str(s: &str) -> Result<Self> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| AbacError::MalformedPermission(format!("unknown action '{}'", s)))
    }
}

/// Subject type a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubjectType {
    User,
    Article,
    /// Wildcard matching every subject type
    #[serde(rename = "all")]
    All,
}

impl SubjectType {
    /// Every subject type, in declaration order
    pub const ALL: [SubjectType; 3] = [SubjectType::User, SubjectType::Article, SubjectType::All];

    /// Stored token for this subject type
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::User => "User",
            SubjectType::Article => "Article",
            SubjectType::All => "all",
        }
    }

    /// Whether a rule on `self` covers a request about `requested`
    pub fn covers(self, requested: SubjectType) -> bool {
        self == SubjectType::All || self == requested
    }
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectType {
    type Err = AbacError;

    fn from_str(s: &str) -> Result<Self> {
        SubjectType::ALL
            .into_iter()
            .find(|subject| subject.as_str() == s)
            .ok_or_else(|| AbacError::MalformedPermission(format!("unknown subject '{}'", s)))
    }
}

/// Permission record as read from the store.
///
/// Action and subject are kept as raw tokens: stored data is untrusted until
/// the compiler has validated it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// Action token (e.g. "read")
    pub action: String,

    /// Subject token (e.g. "Article")
    pub subject: String,

    /// Conditions template, may contain placeholder tokens such as "$user.id"
    #[serde(default)]
    pub conditions: Value,
}

impl PermissionRecord {
    /// Create a new permission record
    pub fn new(action: impl Into<String>, subject: impl Into<String>, conditions: Value) -> Self {
        Self {
            action: action.into(),
            subject: subject.into(),
            conditions,
        }
    }

    /// Create a record without conditions
    pub fn unconditional(action: impl Into<String>, subject: impl Into<String>) -> Self {
        Self::new(action, subject, Value::Object(Map::new()))
    }
}

/// Point-in-time view of a user and the permissions of their role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    /// User identifier
    pub id: UserId,

    /// User email
    pub email: String,

    /// Name of the assigned role, if any
    #[serde(default)]
    pub role: Option<String>,

    /// Permission records of the role, in stored order
    #[serde(default)]
    pub permissions: Vec<PermissionRecord>,
}

impl UserContext {
    /// Create a user context without a role
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            role: None,
            permissions: Vec::new(),
        }
    }

    /// Attach a role and its permission records
    pub fn with_role(mut self, role: impl Into<String>, permissions: Vec<PermissionRecord>) -> Self {
        self.role = Some(role.into());
        self.permissions = permissions;
        self
    }
}

/// Domain types that are checked against abilities
pub trait Subject: Serialize {
    /// Subject type tag of every value of this type
    const SUBJECT_TYPE: SubjectType;
}

/// A concrete object tagged with its subject type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectObject {
    /// Subject type tag
    pub subject_type: SubjectType,

    /// Field values compared against rule conditions
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl SubjectObject {
    /// Create an object with no fields
    pub fn new(subject_type: SubjectType) -> Self {
        Self {
            subject_type,
            fields: Map::new(),
        }
    }

    /// Add a field value
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Tag an already serialized value. The value must be a JSON object.
    pub fn from_value(subject_type: SubjectType, value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self {
                subject_type,
                fields,
            }),
            other => Err(AbacError::InvalidSubject(format!(
                "{} must serialize to an object, got {}",
                subject_type,
                json_kind(&other)
            ))),
        }
    }

    /// Build an object from a domain value
    pub fn of<T: Subject>(value: &T) -> Result<Self> {
        Self::from_value(T::SUBJECT_TYPE, serde_json::to_value(value)?)
    }

    /// Get a field value
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Human readable kind of a JSON value, for error messages
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
