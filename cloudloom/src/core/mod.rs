//! Core domain model types for cloudloom.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Resource kind and node status enums
//! - Input value model (literals and cross-node references)
//! - The resource node with its construction lifecycle

mod node;
mod status;
mod value;

pub use node::ResourceNode;
pub use status::{NodeStatus, ResourceKind};
pub use value::{InputValue, OutputValue};
