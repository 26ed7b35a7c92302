//! Write-once named references carried through a run.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::ObjectRef;
use crate::errors::{BindingConflictError, ContractViolationError};

/// Named object references written by earlier stages for later ones.
///
/// Each name is written at most once. Writing an existing name returns a
/// `BindingConflictError`; reading an unset name through
/// [`require`](Self::require) returns a `ContractViolationError`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Bindings {
    values: BTreeMap<String, ObjectRef>,
}

impl Bindings {
    /// Creates an empty set of bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a binding, if written.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ObjectRef> {
        self.values.get(name)
    }

    /// Gets a binding that a stage depends on.
    ///
    /// # Errors
    ///
    /// Returns `ContractViolationError` naming `stage` if the binding is unset.
    pub fn require(&self, stage: &str, name: &str) -> Result<&ObjectRef, ContractViolationError> {
        self.values
            .get(name)
            .ok_or_else(|| ContractViolationError::new(stage, name))
    }

    /// Writes a binding.
    ///
    /// # Errors
    ///
    /// Returns `BindingConflictError` if the name is already bound.
    pub fn bind(
        &mut self,
        name: impl Into<String>,
        value: ObjectRef,
    ) -> Result<(), BindingConflictError> {
        let name = name.into();
        if let Some(existing) = self.values.get(&name) {
            return Err(BindingConflictError::new(name, existing.clone()));
        }
        self.values.insert(name, value);
        Ok(())
    }

    /// Checks if a name is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ObjectRef)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
