//! Core domain model types.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Tracked objects and the references that address them
//! - Status conditions and the `HasConditions` capability
//! - Stage action, stage status and run status enums

mod condition;
mod object;
mod status;

pub use condition::{Condition, ConditionStatus, HasConditions};
pub use object::{CollectionRef, ObjectRef, TrackedObject};
pub use status::{RunStatus, StageAction, StageStatus};
