//! Cooperative abort handling for orchestration runs.
//!
//! An abort stops the scheduler from issuing new construction calls, but
//! already-Ready resources are never retracted; they are left in place for
//! manual teardown.

mod token;

pub use token::AbortToken;
