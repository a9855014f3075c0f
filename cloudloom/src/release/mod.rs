//! Release pipeline wiring.
//!
//! Assembles the multi-stage release pipeline (source, build, migrate,
//! deploy), validating that every stage's required inputs are produced by
//! earlier stages before anything executes.

mod migration;
mod stage;
mod wiring;

pub use migration::{
    MigrationEnv, MigrationRunner, ProcessMigrationRunner, RecordingMigrationRunner,
    ENV_DB_HOST, ENV_DB_NAME, ENV_DB_PASSWORD, ENV_DB_PORT, ENV_DB_USER,
};
pub use stage::{PipelineStage, StageKind, IMAGE_REF, REVISION, SERVICE_REF, SOURCE_ARTIFACT};
pub use wiring::{PipelineWiring, WiredPipeline};
