use thiserror::Error;

use crate::taxonomy::{Level, Role};

/// Defects in the engine's static tables: the role→levels table, the field
/// catalog, or the injected constants. Never folded into a zero value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Level {level} is not defined for role {role}")]
    UnknownRoleLevel { role: Role, level: Level },

    #[error("Role {0} has no levels in the role table")]
    RoleWithoutLevels(Role),

    #[error("Flat role {role} must have exactly one level, found {count}")]
    FlatRoleLevels { role: Role, count: usize },

    #[error("Unknown field '{0}' is not in the field catalog")]
    UnknownField(String),

    #[error("Field '{0}' is a display-only row and carries no numeric value")]
    NonNumericField(String),

    #[error("Field '{0}' is registered more than once in the field catalog")]
    DuplicateField(String),

    #[error("Field '{name}' is inconsistent: {reason}")]
    InvalidField { name: String, reason: String },

    #[error("Invalid constant {name}: {reason}")]
    InvalidConstant { name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum WorkforcePlanError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Malformed input at {record}: {reason}")]
    MalformedInput { record: String, reason: String },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for WorkforcePlanError {
    fn from(e: serde_json::Error) -> Self {
        WorkforcePlanError::SerializationError(e.to_string())
    }
}

impl WorkforcePlanError {
    pub(crate) fn malformed(record: impl Into<String>, reason: impl Into<String>) -> Self {
        WorkforcePlanError::MalformedInput {
            record: record.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        WorkforcePlanError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
