//! A scripted in-process provisioner for tests and dry runs.

use crate::core::OutputValue;
use crate::errors::ProvisioningError;
use crate::provider::{IngressAuthorization, Provisioner, ResourceRequest};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Script {
    Succeed(BTreeMap<String, OutputValue>),
    Fail(String),
}

/// A provisioner that replays scripted responses.
///
/// Unscripted nodes succeed with synthesized outputs (`"<id>-<key>"` per
/// declared key), so most graph shapes run without any setup. Individual
/// nodes can be given concrete outputs or made to fail.
#[derive(Debug, Default)]
pub struct ScriptedProvisioner {
    scripts: DashMap<String, Script>,
    latency: Option<Duration>,
    calls: RwLock<Vec<String>>,
    authorizations: RwLock<Vec<IngressAuthorization>>,
}

impl ScriptedProvisioner {
    /// Creates a provisioner where every node succeeds with synthesized
    /// outputs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts concrete outputs for a node.
    #[must_use]
    pub fn with_outputs(self, id: impl Into<String>, outputs: BTreeMap<String, OutputValue>) -> Self {
        self.scripts.insert(id.into(), Script::Succeed(outputs));
        self
    }

    /// Scripts a failure for a node.
    #[must_use]
    pub fn fail_on(self, id: impl Into<String>, cause: impl Into<String>) -> Self {
        self.scripts.insert(id.into(), Script::Fail(cause.into()));
        self
    }

    /// Adds an artificial per-call latency.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns the node ids in the order create was called.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().clone()
    }

    /// Returns the number of create calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.read().len()
    }

    /// Returns the ingress authorizations issued so far.
    #[must_use]
    pub fn authorizations(&self) -> Vec<IngressAuthorization> {
        self.authorizations.read().clone()
    }

    fn synthesize(request: &ResourceRequest) -> BTreeMap<String, OutputValue> {
        request
            .declared_outputs
            .iter()
            .map(|key| {
                (
                    key.clone(),
                    serde_json::json!(format!("{}-{key}", request.id)),
                )
            })
            .collect()
    }
}

#[async_trait]
impl Provisioner for ScriptedProvisioner {
    async fn create(
        &self,
        request: &ResourceRequest,
    ) -> Result<BTreeMap<String, OutputValue>, ProvisioningError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.calls.write().push(request.id.clone());
        match self.scripts.get(&request.id).map(|s| s.value().clone()) {
            Some(Script::Succeed(outputs)) => Ok(outputs),
            Some(Script::Fail(cause)) => Err(ProvisioningError::new(&request.id, cause)),
            None => Ok(Self::synthesize(request)),
        }
    }

    async fn authorize_ingress(
        &self,
        authorization: &IngressAuthorization,
    ) -> Result<(), ProvisioningError> {
        self.authorizations.write().push(authorization.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResourceKind;
    use std::collections::BTreeSet;

    fn request(id: &str, outputs: &[&str]) -> ResourceRequest {
        ResourceRequest {
            id: id.to_string(),
            kind: ResourceKind::Network,
            inputs: BTreeMap::new(),
            declared_outputs: outputs.iter().map(|s| (*s).to_string()).collect::<BTreeSet<_>>(),
            tags: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_synthesized_outputs() {
        let provisioner = ScriptedProvisioner::new();
        let outputs = provisioner.create(&request("network", &["vpc_id"])).await.unwrap();
        assert_eq!(outputs["vpc_id"], serde_json::json!("network-vpc_id"));
        assert_eq!(provisioner.calls(), vec!["network"]);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let provisioner = ScriptedProvisioner::new().fail_on("database", "quota exceeded");
        let err = provisioner.create(&request("database", &[])).await.unwrap_err();
        assert_eq!(err.node, "database");
        assert_eq!(err.cause, "quota exceeded");
    }

    #[tokio::test]
    async fn test_authorizations_recorded() {
        let provisioner = ScriptedProvisioner::new();
        let auth = IngressAuthorization {
            source_group_id: "sg-compute".to_string(),
            target_group_id: "sg-database".to_string(),
            port: 5432,
        };
        provisioner.authorize_ingress(&auth).await.unwrap();
        assert_eq!(provisioner.authorizations(), vec![auth]);
    }
}
