//! Error types for upgradewatch.
//!
//! Three families live here:
//! - [`StoreError`] is what an object store reports for a single request.
//! - [`WatchError`] is what a stage reports to the sequencer. Every variant is
//!   terminal for the stage that raised it.
//! - [`WorkflowValidationError`] is raised while assembling a workflow,
//!   before anything touches the store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::core::ObjectRef;

/// Errors reported by an [`ObjectStore`](crate::store::ObjectStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested object does not exist.
    #[error("{0} not found")]
    NotFound(ObjectRef),

    /// An object with the same identity already exists.
    #[error("{0} already exists")]
    AlreadyExists(ObjectRef),

    /// The request was rejected before reaching the backend.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// The backend failed (transport, auth, decoding, ...).
    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Returns true if this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Coarse classification of a [`WatchError`], carried in run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An object or collection could not be read.
    Fetch,
    /// A failure condition was observed.
    PredicateFailure,
    /// The wait deadline elapsed.
    Timeout,
    /// A create request failed.
    Mutation,
    /// A stage read a binding that was never written.
    ContractViolation,
    /// A stage wrote a binding that was already written.
    BindingConflict,
    /// The run was cancelled.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::PredicateFailure => write!(f, "predicate_failure"),
            Self::Timeout => write!(f, "timeout"),
            Self::Mutation => write!(f, "mutation"),
            Self::ContractViolation => write!(f, "contract_violation"),
            Self::BindingConflict => write!(f, "binding_conflict"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The error a stage hands back to the sequencer.
#[derive(Debug, Error)]
pub enum WatchError {
    /// An object or collection could not be retrieved.
    #[error("failed to fetch {target}: {source}")]
    Fetch {
        /// What was being read.
        target: String,
        /// The store's error.
        #[source]
        source: StoreError,
    },

    /// A failure condition held before the success condition did.
    #[error("{target} reported {condition}: {detail}")]
    PredicateFailure {
        /// The object being watched.
        target: String,
        /// The failure predicate that matched (e.g. `Completed=false`).
        condition: String,
        /// Reason and message carried on the condition.
        detail: String,
    },

    /// Neither predicate held before the deadline.
    #[error(
        "timed out after {}s waiting for {target} to satisfy {predicate} ({attempts} attempts)",
        waited.as_secs_f64()
    )]
    Timeout {
        /// The object or collection being watched.
        target: String,
        /// The success predicate.
        predicate: String,
        /// Time spent waiting.
        waited: Duration,
        /// Number of evaluations performed.
        attempts: u32,
    },

    /// A create request failed.
    #[error("failed to create {target}: {source}")]
    Mutation {
        /// Description of the object being created.
        target: String,
        /// The store's error.
        #[source]
        source: StoreError,
    },

    /// A binding was read before any stage wrote it.
    #[error("{0}")]
    ContractViolation(#[from] ContractViolationError),

    /// A binding was written twice.
    #[error("{0}")]
    BindingConflict(#[from] BindingConflictError),

    /// The run's cancellation token fired.
    #[error("cancelled: {reason}")]
    Cancelled {
        /// The reason given to the token.
        reason: String,
    },
}

impl WatchError {
    /// Creates a fetch error.
    #[must_use]
    pub fn fetch(target: impl fmt::Display, source: StoreError) -> Self {
        Self::Fetch {
            target: target.to_string(),
            source,
        }
    }

    /// Creates a mutation error.
    #[must_use]
    pub fn mutation(target: impl fmt::Display, source: StoreError) -> Self {
        Self::Mutation {
            target: target.to_string(),
            source,
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// Returns the coarse classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Fetch { .. } => ErrorKind::Fetch,
            Self::PredicateFailure { .. } => ErrorKind::PredicateFailure,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Mutation { .. } => ErrorKind::Mutation,
            Self::ContractViolation(_) => ErrorKind::ContractViolation,
            Self::BindingConflict(_) => ErrorKind::BindingConflict,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Returns true if this error is a programming error in the workflow
    /// definition rather than an observation about the cluster.
    #[must_use]
    pub const fn is_contract_error(&self) -> bool {
        matches!(self, Self::ContractViolation(_) | Self::BindingConflict(_))
    }
}

/// Raised when a stage reads a binding no earlier stage wrote.
#[derive(Debug, Clone, Error)]
#[error("contract violation: stage '{stage}' read binding '{binding}' which no earlier stage wrote")]
pub struct ContractViolationError {
    /// The stage attempting the read.
    pub stage: String,
    /// The unset binding.
    pub binding: String,
}

impl ContractViolationError {
    /// Creates a new contract violation error.
    #[must_use]
    pub fn new(stage: impl Into<String>, binding: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            binding: binding.into(),
        }
    }
}

/// Raised when a binding is written a second time.
#[derive(Debug, Clone, Error)]
#[error("binding conflict: '{binding}' is already bound to {existing}")]
pub struct BindingConflictError {
    /// The binding name.
    pub binding: String,
    /// The value already bound.
    pub existing: ObjectRef,
}

impl BindingConflictError {
    /// Creates a new binding conflict error.
    #[must_use]
    pub fn new(binding: impl Into<String>, existing: ObjectRef) -> Self {
        Self {
            binding: binding.into(),
            existing,
        }
    }
}

/// Diagnostic metadata attached to validation errors.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorInfo {
    /// Error code (e.g., "WORKFLOW-MISSING_BINDING").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a workflow or its configuration is malformed.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct WorkflowValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional diagnostic info.
    pub error_info: Option<ErrorInfo>,
}

impl WorkflowValidationError {
    /// Creates a new workflow validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the diagnostic info.
    #[must_use]
    pub fn with_error_info(mut self, info: ErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_ref() -> ObjectRef {
        ObjectRef::new("VirtualMachineImage", "harvester-system", "upgrade-image-abcde")
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::NotFound(image_ref());
        assert_eq!(
            err.to_string(),
            "VirtualMachineImage harvester-system/upgrade-image-abcde not found"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_fetch_error_keeps_source() {
        let err = WatchError::fetch(image_ref(), StoreError::NotFound(image_ref()));
        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("failed to fetch VirtualMachineImage"));
    }

    #[test]
    fn test_predicate_failure_carries_detail() {
        let err = WatchError::PredicateFailure {
            target: "Upgrade harvester-system/hvst-upgrade-x1".to_string(),
            condition: "Completed=false".to_string(),
            detail: "Failed: job has reached the specified backoff limit".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::PredicateFailure);
        assert!(err.to_string().contains("backoff limit"));
    }

    #[test]
    fn test_timeout_display() {
        let err = WatchError::Timeout {
            target: "ManagedChart in fleet-local".to_string(),
            predicate: "Ready=true".to_string(),
            waited: Duration::from_secs(300),
            attempts: 31,
        };
        assert_eq!(
            err.to_string(),
            "timed out after 300s waiting for ManagedChart in fleet-local to satisfy Ready=true (31 attempts)"
        );
    }

    #[test]
    fn test_contract_errors() {
        let err: WatchError =
            ContractViolationError::new("create an upgrade", "upgrade-image").into();
        assert_eq!(err.kind(), ErrorKind::ContractViolation);
        assert!(err.is_contract_error());
        assert!(err.to_string().contains("'upgrade-image'"));

        let err: WatchError = BindingConflictError::new("upgrade", image_ref()).into();
        assert_eq!(err.kind(), ErrorKind::BindingConflict);
        assert!(err.is_contract_error());
        assert!(!WatchError::cancelled("abort").is_contract_error());
    }

    #[test]
    fn test_error_kind_serialize() {
        let json = serde_json::to_string(&ErrorKind::PredicateFailure).unwrap();
        assert_eq!(json, r#""predicate_failure""#);
        assert_eq!(ErrorKind::Timeout.to_string(), "timeout");
    }

    #[test]
    fn test_validation_error_code() {
        let err = WorkflowValidationError::new("Workflow has no stages")
            .with_error_info(ErrorInfo::new("WORKFLOW-EMPTY", "Cannot build an empty workflow"));
        assert_eq!(err.code(), Some("WORKFLOW-EMPTY"));
        assert_eq!(err.to_string(), "Workflow has no stages");
    }
}
