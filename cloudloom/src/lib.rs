//! # Cloudloom
//!
//! A typed infrastructure orchestration engine.
//!
//! Cloudloom separates deployments into a declaration phase and an
//! execution phase:
//!
//! - **Typed resource graph**: Declare named resource nodes with inputs,
//!   output keys, and tags, linked by producer/consumer edges
//! - **Deterministic ordering**: Construction order is a stable topological
//!   sort with declaration order as the tie-break
//! - **Output propagation**: Produced outputs flow into consumer inputs as
//!   nodes reach Ready; failures block the dependent subtree
//! - **Deferred edges**: Relationships that would close a cycle are applied
//!   post-hoc once both endpoints exist
//! - **Config publication**: The database output bundle is published to an
//!   external key-value store under a namespaced path
//! - **Release wiring**: A four-stage pipeline validated against what
//!   earlier stages produce, before anything executes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cloudloom::prelude::*;
//!
//! let (graph, resolver) = production_graph(&config)?;
//! let outcome = Orchestrator::new(config, graph, resolver, provisioner, store)
//!     .with_sink(sink)
//!     .run()
//!     .await?;
//! assert!(outcome.success());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod executor;
pub mod graph;
pub mod orchestrator;
pub mod provider;
pub mod publish;
pub mod release;
pub mod security;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::AbortToken;
    pub use crate::config::{
        DatabaseConfig, DatabaseEndpoint, DeploymentConfig, DEFAULT_DATABASE_PORT,
    };
    pub use crate::core::{
        InputValue, NodeStatus, OutputValue, ResourceKind, ResourceNode,
    };
    pub use crate::errors::{
        CloudloomError, CycleError, GraphValidationError, MissingStageInputError,
        PrematureOutputAccessError, ProvisioningError, UnresolvedDependencyError,
    };
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, OrchestrationEvent,
    };
    pub use crate::executor::{ExecutionReport, OutputPropagator};
    pub use crate::graph::{DependencyGraph, Edge};
    pub use crate::orchestrator::{
        production_graph, release_stages, DeploymentOutcome, Orchestrator,
    };
    pub use crate::provider::{
        IngressAuthorization, Provisioner, ResourceRequest, ScriptedProvisioner,
    };
    pub use crate::publish::{ConfigPublisher, ConfigStore, InMemoryConfigStore, PublishedEntry};
    pub use crate::release::{
        MigrationEnv, MigrationRunner, PipelineStage, PipelineWiring, StageKind, WiredPipeline,
    };
    pub use crate::security::{SecurityBinding, SecurityBindingResolver};
}
