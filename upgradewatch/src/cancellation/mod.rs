//! Run-level cancellation.
//!
//! A single [`CancellationToken`] is shared by everything that executes as
//! part of one workflow run.

mod token;

pub use token::CancellationToken;
