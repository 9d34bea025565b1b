//! Common error infrastructure for rotation-core.
//!
//! Two very different kinds of failure live here:
//!
//! - **Per-tick faults** ([`ConditionFault`]): a guard could not be evaluated
//!   against the current snapshot. These never escape a tick; the engine
//!   records them and treats the rule as not eligible.
//! - **Load-time errors** ([`CascadeError`], [`CatalogError`]): content is
//!   malformed. These reject the whole document; nothing is partially loaded.
//!
//! Usability denials are not errors at all and live in [`crate::usability`].

use crate::catalog::Slot;
use crate::ids::{ActionId, ResourceId};

/// Severity level of an error, used for categorization and logging priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Transient condition; the next tick may succeed.
    ///
    /// Examples: a guard referencing a gauge the host did not report this tick
    Recoverable,

    /// Invalid input that must be fixed before it can be used.
    ///
    /// Examples: cascade referencing an unknown action
    Validation,

    /// Unexpected failure inside user-supplied code.
    ///
    /// Examples: a custom guard panicked
    Internal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }
}

/// Common trait for all rotation-core errors.
///
/// # Implementation Guidelines
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait RotationError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str;
}

/// A guard could not be evaluated (the rule-level evaluation fault).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ConditionFault {
    #[error("resource {0} is not present in the snapshot")]
    MissingResource(ResourceId),

    #[error("action {0} is not present in the snapshot")]
    MissingAction(ActionId),

    #[error("non-finite value for {0}")]
    NonFinite(&'static str),

    #[error("custom guard `{name}` failed: {message}")]
    Guard { name: String, message: String },

    #[error("custom guard `{name}` panicked: {message}")]
    GuardPanicked { name: String, message: String },
}

impl RotationError for ConditionFault {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::MissingResource(_) | Self::MissingAction(_) | Self::NonFinite(_) => {
                ErrorSeverity::Recoverable
            }
            Self::Guard { .. } => ErrorSeverity::Recoverable,
            Self::GuardPanicked { .. } => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingResource(_) => "MISSING_RESOURCE",
            Self::MissingAction(_) => "MISSING_ACTION",
            Self::NonFinite(_) => "NON_FINITE",
            Self::Guard { .. } => "GUARD_FAILED",
            Self::GuardPanicked { .. } => "GUARD_PANICKED",
        }
    }
}

/// A rule cascade was rejected at load time.
///
/// The cascade is never partially loaded: one invalid rule rejects the whole
/// document, since silently dropping a rule could drop a defensive one.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CascadeError {
    #[error("cascade `{0}` has no urgency classes")]
    Empty(String),

    #[error("cascade must have exactly one main class, found {0}")]
    MainClassCount(usize),

    #[error("urgency class `{0}` has no rules")]
    EmptyClass(String),

    #[error("urgency class `{0}` is declared twice")]
    DuplicateClass(String),

    #[error("rule `{rule}` references unknown action `{action}`")]
    UnknownAction { rule: String, action: String },

    #[error("rule `{rule}` references unknown resource `{name}`")]
    UnknownResource { rule: String, name: String },

    #[error("rule `{rule}` references unknown status `{name}`")]
    UnknownStatus { rule: String, name: String },

    #[error("rule `{rule}` references unknown custom guard `{name}`")]
    UnknownGuard { rule: String, name: String },

    #[error("rule `{rule}` binds `{action}` which is not a {expected:?} action")]
    SlotMismatch {
        rule: String,
        action: String,
        expected: Slot,
    },

    #[error("filler `{action}` must be an instant level-1 main action with no cost, charges, status requirement, override or guard")]
    FillerNotUnconditional { action: String },

    #[error("rule `{rule}` has invalid value: {detail}")]
    InvalidNumber { rule: String, detail: String },

    #[error("archetype `{archetype}` has invalid base cycle length {value}")]
    InvalidCycleLength { archetype: String, value: f32 },
}

impl RotationError for CascadeError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty(_) => "CASCADE_EMPTY",
            Self::MainClassCount(_) => "MAIN_CLASS_COUNT",
            Self::EmptyClass(_) => "EMPTY_CLASS",
            Self::DuplicateClass(_) => "DUPLICATE_CLASS",
            Self::UnknownAction { .. } => "UNKNOWN_ACTION",
            Self::UnknownResource { .. } => "UNKNOWN_RESOURCE",
            Self::UnknownStatus { .. } => "UNKNOWN_STATUS",
            Self::UnknownGuard { .. } => "UNKNOWN_GUARD",
            Self::SlotMismatch { .. } => "SLOT_MISMATCH",
            Self::FillerNotUnconditional { .. } => "FILLER_NOT_UNCONDITIONAL",
            Self::InvalidNumber { .. } => "INVALID_NUMBER",
            Self::InvalidCycleLength { .. } => "INVALID_CYCLE_LENGTH",
        }
    }
}

/// An action catalog was rejected at load time.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("action id {0} is declared twice")]
    DuplicateActionId(ActionId),

    #[error("name `{0}` is declared twice")]
    DuplicateName(String),

    #[error("action `{action}` references unknown resource `{name}`")]
    UnknownResource { action: String, name: String },

    #[error("action `{action}` references unknown status `{name}`")]
    UnknownStatus { action: String, name: String },

    #[error("action `{action}` has invalid {field}")]
    InvalidValue { action: String, field: &'static str },
}

impl RotationError for CatalogError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateActionId(_) => "DUPLICATE_ACTION_ID",
            Self::DuplicateName(_) => "DUPLICATE_NAME",
            Self::UnknownResource { .. } => "UNKNOWN_RESOURCE",
            Self::UnknownStatus { .. } => "UNKNOWN_STATUS",
            Self::InvalidValue { .. } => "INVALID_VALUE",
        }
    }
}
