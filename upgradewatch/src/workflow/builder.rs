//! Workflow builder with validation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::errors::{ErrorInfo, WorkflowValidationError};
use crate::stages::Stage;

/// An ordered, validated list of stages.
///
/// Only [`WorkflowBuilder`] constructs one, so every binding a stage requires
/// is provided by an earlier stage.
#[derive(Debug, Clone)]
pub struct Workflow {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
}

impl Workflow {
    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }

    /// Returns the stage labels in execution order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.label()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the workflow has no stages. Never true for a built one.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Builder for creating validated workflows.
#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    /// The workflow name.
    name: String,
    /// Stages in insertion order.
    stages: Vec<Arc<dyn Stage>>,
    /// Labels seen so far.
    labels: HashSet<String>,
    /// Binding name to the label of the stage providing it.
    provided: HashMap<String, String>,
}

impl WorkflowBuilder {
    /// Creates a new workflow builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            labels: HashSet::new(),
            provided: HashMap::new(),
        }
    }

    /// Appends a stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the label is empty or already used, if the stage
    /// requires a binding no earlier stage provides, or if it provides a
    /// binding an earlier stage already provides.
    pub fn stage(mut self, stage: impl Stage + 'static) -> Result<Self, WorkflowValidationError> {
        self.add_stage(Arc::new(stage))?;
        Ok(self)
    }

    /// Appends a shared stage.
    ///
    /// # Errors
    ///
    /// Same as [`stage`](Self::stage).
    pub fn add_stage(&mut self, stage: Arc<dyn Stage>) -> Result<(), WorkflowValidationError> {
        let label = stage.label().to_string();

        if label.trim().is_empty() {
            return Err(WorkflowValidationError::new(format!(
                "Stage {} of workflow '{}' has an empty label",
                self.stages.len(),
                self.name
            ))
            .with_error_info(
                ErrorInfo::new("WORKFLOW-EMPTY_LABEL", "Stage label is empty")
                    .with_fix_hint("Give every stage a short descriptive label."),
            ));
        }

        if self.labels.contains(&label) {
            return Err(WorkflowValidationError::new(format!("Duplicate stage label '{label}'"))
                .with_stages(vec![label.clone()])
                .with_error_info(
                    ErrorInfo::new(
                        "WORKFLOW-DUPLICATE_LABEL",
                        format!("Label '{label}' is used twice"),
                    )
                    .with_fix_hint("Stage labels identify stages in reports and must be unique."),
                ));
        }

        for binding in stage.requires() {
            if !self.provided.contains_key(binding) {
                return Err(WorkflowValidationError::new(format!(
                    "Stage '{label}' requires binding '{binding}' which no earlier stage provides"
                ))
                .with_stages(vec![label.clone()])
                .with_error_info(
                    ErrorInfo::new(
                        "WORKFLOW-MISSING_BINDING",
                        format!("Binding '{binding}' not provided"),
                    )
                    .with_fix_hint(
                        "Add the stage that creates the object before the stage that uses it.",
                    )
                    .with_context_entry("binding", binding),
                ));
            }
        }

        if let Some(binding) = stage.provides() {
            if let Some(owner) = self.provided.get(binding) {
                return Err(WorkflowValidationError::new(format!(
                    "Stage '{label}' provides binding '{binding}' already provided by '{owner}'"
                ))
                .with_stages(vec![owner.clone(), label.clone()])
                .with_error_info(
                    ErrorInfo::new(
                        "WORKFLOW-BINDING_REBOUND",
                        format!("Binding '{binding}' provided twice"),
                    )
                    .with_fix_hint(
                        "Bindings are write-once; use a distinct name for each created object.",
                    )
                    .with_context_entry("binding", binding),
                ));
            }
            self.provided.insert(binding.to_string(), label.clone());
        }

        self.labels.insert(label);
        self.stages.push(stage);
        Ok(())
    }

    /// Builds the workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder has no stages.
    pub fn build(self) -> Result<Workflow, WorkflowValidationError> {
        if self.stages.is_empty() {
            return Err(WorkflowValidationError::new("Workflow has no stages").with_error_info(
                ErrorInfo::new("WORKFLOW-EMPTY", "Cannot build an empty workflow")
                    .with_fix_hint("Add at least one stage to the workflow before building."),
            ));
        }

        Ok(Workflow {
            name: self.name,
            stages: self.stages,
        })
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}
