//! Run-scoped context.
//!
//! This module provides:
//! - Write-once bindings passed from earlier stages to later ones
//! - The run context threaded through each stage call

mod bindings;
mod run;

pub use bindings::Bindings;
pub use run::RunContext;
