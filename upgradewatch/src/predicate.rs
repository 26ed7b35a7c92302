//! Condition predicates.
//!
//! A predicate is a named boolean observation over an object's conditions,
//! such as `Imported=true` or `Completed=false`. Evaluation is pure: it only
//! looks at the snapshot it is given.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::{Condition, HasConditions};

/// The status a predicate expects a condition to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// The condition must be `True`.
    True,
    /// The condition must be `False`.
    False,
}

/// Checks one named condition against an expected status.
///
/// A condition that is absent from the object never matches, whichever
/// status is expected. Pollers therefore keep waiting on it instead of
/// failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionPredicate {
    /// Condition type to inspect.
    pub condition: String,
    /// Expected status.
    pub expected: Expectation,
}

impl ConditionPredicate {
    /// Matches when `condition` is `True`.
    #[must_use]
    pub fn is_true(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            expected: Expectation::True,
        }
    }

    /// Matches when `condition` is `False`.
    #[must_use]
    pub fn is_false(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            expected: Expectation::False,
        }
    }

    /// Returns the inspected condition, if the object reports it.
    pub fn observe<'a, T: HasConditions + ?Sized>(&self, object: &'a T) -> Option<&'a Condition> {
        object.condition(&self.condition)
    }

    /// Evaluates the predicate against a snapshot.
    pub fn matches<T: HasConditions + ?Sized>(&self, object: &T) -> bool {
        self.observe(object).is_some_and(|c| match self.expected {
            Expectation::True => c.is_true(),
            Expectation::False => c.is_false(),
        })
    }

    /// Diagnostic text for the inspected condition.
    pub fn detail<T: HasConditions + ?Sized>(&self, object: &T) -> String {
        self.observe(object).map_or_else(
            || format!("condition {} not reported", self.condition),
            Condition::detail,
        )
    }
}

impl fmt::Display for ConditionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expected {
            Expectation::True => write!(f, "{}=true", self.condition),
            Expectation::False => write!(f, "{}=false", self.condition),
        }
    }
}
