//! Stages that create one object.

use async_trait::async_trait;
use std::fmt;
use tracing::info;

use super::{Stage, StageOutcome};
use crate::context::RunContext;
use crate::core::{StageAction, TrackedObject};
use crate::errors::WatchError;

/// Builds the object to create from the bindings written so far.
pub type ObjectBuilder = dyn Fn(&RunContext) -> Result<TrackedObject, WatchError> + Send + Sync;

/// Issues exactly one `create` and optionally binds the result.
pub struct MutateStage {
    label: String,
    reads: Vec<String>,
    binds: Option<String>,
    build: Box<ObjectBuilder>,
}

impl MutateStage {
    /// Creates a stage that builds its object with `build`.
    ///
    /// Bindings read inside `build` should also be declared with
    /// [`reads`](Self::reads) so the workflow builder can check them.
    pub fn new<F>(label: impl Into<String>, build: F) -> Self
    where
        F: Fn(&RunContext) -> Result<TrackedObject, WatchError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            reads: Vec::new(),
            binds: None,
            build: Box::new(build),
        }
    }

    /// Creates a stage that submits a copy of `template`.
    #[must_use]
    pub fn from_template(label: impl Into<String>, template: TrackedObject) -> Self {
        Self::new(label, move |_| Ok(template.clone()))
    }

    /// Binds the created object under `name`.
    #[must_use]
    pub fn binds(mut self, name: impl Into<String>) -> Self {
        self.binds = Some(name.into());
        self
    }

    /// Declares a binding the builder reads.
    #[must_use]
    pub fn reads(mut self, name: impl Into<String>) -> Self {
        self.reads.push(name.into());
        self
    }
}

impl fmt::Debug for MutateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutateStage")
            .field("label", &self.label)
            .field("reads", &self.reads)
            .field("binds", &self.binds)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for MutateStage {
    fn label(&self) -> &str {
        &self.label
    }

    fn action(&self) -> StageAction {
        StageAction::Mutate
    }

    fn requires(&self) -> Vec<&str> {
        self.reads.iter().map(String::as_str).collect()
    }

    fn provides(&self) -> Option<&str> {
        self.binds.as_deref()
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<StageOutcome, WatchError> {
        let object = (self.build)(&*ctx)?;
        let description = object.describe();

        let created = ctx
            .store()
            .create(object)
            .await
            .map_err(|e| WatchError::mutation(&description, e))?;
        let object = created.object_ref();
        info!(object = %object, "Created object");

        if let Some(name) = &self.binds {
            ctx.bind(name, object.clone())?;
        }
        Ok(StageOutcome::Mutated { object })
    }
}
