//! The orchestration entry point.
//!
//! Ties the phases together: declaration, ordered construction with output
//! propagation, deferred security bindings, config publication, and release
//! pipeline wiring.

mod production;

pub use production::{
    production_graph, release_stages, COMPUTE, DATABASE, DATABASE_ACCESS_SG, DATABASE_SG, DNS,
    LOAD_BALANCER, NETWORK, OUT_DNS_NAME, OUT_GROUP_ID, OUT_HOSTNAME, OUT_SECURITY_GROUP_ID,
    OUT_SERVICE_ARN, OUT_SOCKET_ADDRESS, OUT_VPC_ID,
};

use crate::cancellation::AbortToken;
use crate::config::{DatabaseConfig, DatabaseEndpoint, DeploymentConfig, DEFAULT_DATABASE_PORT};
use crate::errors::CloudloomError;
use crate::events::{EventSink, NoOpEventSink, OrchestrationEvent};
use crate::executor::{ExecutionReport, OutputPropagator};
use crate::graph::DependencyGraph;
use crate::provider::{IngressAuthorization, Provisioner};
use crate::publish::{ConfigPublisher, ConfigStore};
use crate::release::{
    MigrationEnv, PipelineStage, PipelineWiring, StageKind, WiredPipeline, REVISION, SERVICE_REF,
};
use crate::security::SecurityBindingResolver;
use std::sync::Arc;
use tracing::info;

/// The result of one orchestration run.
#[derive(Debug)]
pub struct DeploymentOutcome {
    /// The execution report over the resource graph.
    pub report: ExecutionReport,
    /// The graph with final node states and outputs.
    pub graph: DependencyGraph,
    /// The resolved database config, if the database reached Ready.
    pub database: Option<DatabaseConfig>,
    /// The wired release pipeline, if the graph completed.
    pub pipeline: Option<WiredPipeline>,
    /// Ingress authorizations issued for deferred bindings.
    pub ingress: Vec<IngressAuthorization>,
}

impl DeploymentOutcome {
    /// Returns true if every resource reached Ready and the pipeline wired.
    #[must_use]
    pub fn success(&self) -> bool {
        self.report.success() && self.pipeline.is_some()
    }
}

/// Drives a declared deployment end to end.
pub struct Orchestrator {
    config: DeploymentConfig,
    graph: DependencyGraph,
    resolver: SecurityBindingResolver,
    stages: Vec<PipelineStage>,
    provisioner: Arc<dyn Provisioner>,
    store: Arc<dyn ConfigStore>,
    sink: Arc<dyn EventSink>,
    abort: Arc<AbortToken>,
}

impl Orchestrator {
    /// Creates an orchestrator over a declared graph and its bindings.
    ///
    /// The release stages default to [`release_stages`] for the given
    /// config.
    #[must_use]
    pub fn new(
        config: DeploymentConfig,
        graph: DependencyGraph,
        resolver: SecurityBindingResolver,
        provisioner: Arc<dyn Provisioner>,
        store: Arc<dyn ConfigStore>,
    ) -> Self {
        let stages = release_stages(&config);
        Self {
            config,
            graph,
            resolver,
            stages,
            provisioner,
            store,
            sink: Arc::new(NoOpEventSink),
            abort: Arc::new(AbortToken::new()),
        }
    }

    /// Replaces the release stages.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<PipelineStage>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the abort token.
    #[must_use]
    pub fn with_abort_token(mut self, abort: Arc<AbortToken>) -> Self {
        self.abort = abort;
        self
    }

    /// Runs the deployment: constructs the graph, applies deferred
    /// bindings, publishes the database namespace, and wires the release
    /// pipeline.
    ///
    /// A provider failure does not fail the call; the outcome carries the
    /// report with the blocked subtree, publication and wiring are skipped.
    ///
    /// # Errors
    ///
    /// Returns declaration-time errors before any side effect, and
    /// publication or wiring errors after a fully constructed graph.
    pub async fn run(mut self) -> Result<DeploymentOutcome, CloudloomError> {
        let propagator = OutputPropagator::new(Arc::clone(&self.provisioner))
            .with_sink(Arc::clone(&self.sink))
            .with_abort_token(Arc::clone(&self.abort));
        let report = propagator.execute(&mut self.graph).await?;

        let ingress = self
            .resolver
            .apply_deferred(&self.graph, self.provisioner.as_ref(), self.sink.as_ref())
            .await?;

        if !report.success() {
            info!(
                failed = report.failures.len(),
                blocked = report.blocked.len(),
                aborted = report.aborted,
                "deployment incomplete; skipping publication and pipeline wiring"
            );
            return Ok(DeploymentOutcome {
                report,
                graph: self.graph,
                database: None,
                pipeline: None,
                ingress,
            });
        }

        let database = self.resolve_database()?;
        let namespace = self.config.database_namespace();
        ConfigPublisher::new(Arc::clone(&self.store))
            .with_sink(Arc::clone(&self.sink))
            .publish_database(&namespace, &database)
            .await?;

        let pipeline = self.wire_pipeline(&namespace).await?;
        Ok(DeploymentOutcome {
            report,
            graph: self.graph,
            database: Some(database),
            pipeline: Some(pipeline),
            ingress,
        })
    }

    /// Builds the authoritative database config from the Ready database
    /// node's outputs.
    fn resolve_database(&self) -> Result<DatabaseConfig, CloudloomError> {
        let node = self.graph.node(DATABASE).ok_or_else(|| {
            CloudloomError::Internal(format!("graph declares no '{DATABASE}' node"))
        })?;
        let hostname = Self::string_output(node.output(OUT_HOSTNAME)?, OUT_HOSTNAME)?;
        let socket_address =
            Self::string_output(node.output(OUT_SOCKET_ADDRESS)?, OUT_SOCKET_ADDRESS)?;
        let mut database = self.config.database_config();
        database.resolve_endpoint(DatabaseEndpoint {
            hostname,
            // The provider-reported port is a sentinel; the engine pins the
            // real one.
            port: DEFAULT_DATABASE_PORT,
            socket_address,
        })?;
        Ok(database)
    }

    /// Validates and parameterizes the release stages.
    async fn wire_pipeline(&self, namespace: &str) -> Result<WiredPipeline, CloudloomError> {
        let env = MigrationEnv::from_store(self.store.as_ref(), namespace).await?;
        let service_arn = {
            let node = self.graph.node(COMPUTE).ok_or_else(|| {
                CloudloomError::Internal(format!("graph declares no '{COMPUTE}' node"))
            })?;
            Self::string_output(node.output(OUT_SERVICE_ARN)?, OUT_SERVICE_ARN)?
        };

        let mut stages = self.stages.clone();
        for stage in &mut stages {
            match stage.kind {
                StageKind::Migrate => {
                    stage.env.extend(env.to_env_vars());
                }
                StageKind::Deploy => {
                    stage.env.insert("SERVICE_ARN".to_string(), service_arn.clone());
                    stage.env.insert(
                        "IMAGE_REPOSITORY".to_string(),
                        self.config.image_repository.clone(),
                    );
                }
                StageKind::Source | StageKind::Build => {}
            }
        }

        let wired = PipelineWiring::new()
            .with_initial_input(REVISION)
            .with_initial_input(SERVICE_REF)
            .with_database_namespace(namespace)
            .wire(stages)?;
        for stage in wired.stages() {
            self.sink.try_emit(&OrchestrationEvent::StageWired {
                stage: stage.name.clone(),
            });
        }
        Ok(wired)
    }

    fn string_output(
        value: &serde_json::Value,
        key: &str,
    ) -> Result<String, CloudloomError> {
        value.as_str().map(String::from).ok_or_else(|| {
            CloudloomError::Internal(format!("output '{key}' is not a string"))
        })
    }
}
