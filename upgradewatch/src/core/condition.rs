//! Status conditions and the capability to inspect them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tri-state status of a condition, as reported by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConditionStatus {
    /// The condition holds.
    True,
    /// The condition explicitly does not hold.
    False,
    /// The controller has not decided yet.
    #[default]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A named status flag on a tracked object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type, e.g. `Imported` or `NodesUpgraded`.
    pub r#type: String,
    /// Current status.
    pub status: ConditionStatus,
    /// Machine-readable reason for the last transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Condition {
    /// Creates a condition with no reason or message.
    #[must_use]
    pub fn new(r#type: impl Into<String>, status: ConditionStatus) -> Self {
        Self {
            r#type: r#type.into(),
            status,
            reason: None,
            message: None,
        }
    }

    /// Shorthand for a `True` condition.
    #[must_use]
    pub fn truthy(r#type: impl Into<String>) -> Self {
        Self::new(r#type, ConditionStatus::True)
    }

    /// Shorthand for a `False` condition.
    #[must_use]
    pub fn falsy(r#type: impl Into<String>) -> Self {
        Self::new(r#type, ConditionStatus::False)
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns true if the status is `True`.
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    /// Returns true if the status is `False`.
    #[must_use]
    pub fn is_false(&self) -> bool {
        self.status == ConditionStatus::False
    }

    /// Renders reason and message as one line of diagnostic text.
    #[must_use]
    pub fn detail(&self) -> String {
        match (self.reason.as_deref(), self.message.as_deref()) {
            (Some(reason), Some(message)) => format!("{reason}: {message}"),
            (Some(reason), None) => reason.to_string(),
            (None, Some(message)) => message.to_string(),
            (None, None) => format!("{} is {}", self.r#type, self.status),
        }
    }
}

/// Anything that exposes a list of status conditions.
///
/// Pollers only see objects through this trait, so they work for every kind
/// the store returns.
pub trait HasConditions {
    /// All conditions currently reported.
    fn conditions(&self) -> &[Condition];

    /// Looks up a condition by type. Absent conditions yield `None`.
    fn condition(&self, r#type: &str) -> Option<&Condition> {
        self.conditions().iter().find(|c| c.r#type == r#type)
    }
}

impl HasConditions for [Condition] {
    fn conditions(&self) -> &[Condition] {
        self
    }
}

impl HasConditions for Vec<Condition> {
    fn conditions(&self) -> &[Condition] {
        self
    }
}
