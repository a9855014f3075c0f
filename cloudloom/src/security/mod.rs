//! Security binding resolution.
//!
//! Models the access-control relationship between a "needs access" group
//! and a "provides access" group, including the one documented cycle class
//! that is routed through a deferred edge instead of failing declaration.

mod resolver;

pub use resolver::{SecurityBinding, SecurityBindingResolver, GROUP_ID_OUTPUT};
