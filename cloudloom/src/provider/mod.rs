//! The provisioning collaborator boundary.
//!
//! The engine treats the cloud provider as an opaque async resource-creation
//! service. Retries, quotas, and provider-specific semantics live behind the
//! [`Provisioner`] trait.

mod fake;
mod provisioner;

pub use fake::ScriptedProvisioner;
pub use provisioner::{IngressAuthorization, Provisioner, ResourceRequest};

#[cfg(test)]
pub use provisioner::MockProvisioner;
