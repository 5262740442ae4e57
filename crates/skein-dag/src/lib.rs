//! Lineage reporting for DAG workflow runs.
//!
//! Wrap a [`DagDefinition`] in a [`LineageDag`] and call its
//! [`DagLifecycle`] hooks from the scheduler. Each task is registered as a job
//! (`<dag_id>.<task_id>`) with a lineage server before it runs, its run is
//! marked completed or failed afterwards, and the datasets its
//! [`Extractor`] reports are attached to the run that read or wrote them.
//!
//! ```no_run
//! use chrono::Utc;
//! use skein_dag::{DagDefinition, DagLifecycle, DagRun, LineageDag, Schedule, Task};
//!
//! # async fn example() -> skein_dag::Result<()> {
//! let dag = DagDefinition::new("orders_daily")
//!     .with_schedule(Schedule::Daily)
//!     .with_task(Task::new("load_orders", "declared"));
//! let lineage = LineageDag::new(dag)?;
//!
//! let run = DagRun::new("scheduled__2016-01-01", Utc::now());
//! lineage.on_run_created(&run).await;
//! # Ok(())
//! # }
//! ```

pub mod dag;
pub mod declared;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod lineage;
pub mod location;
pub mod run;
pub mod schedule;
pub mod task;

pub use dag::{DagDefinition, DagFile, DagSpec, DefaultArgs, TaskSpec};
pub use declared::DeclaredLineageExtractor;
pub use error::{LineageError, Result};
pub use extractor::{
    ExtractionTarget, Extractor, ExtractorFactory, ExtractorRegistry, NullExtractor,
};
pub use identity::{Minted, RunIdGenerator, RunIdentity, RunIdentityStore, uuid_run_id};
pub use lineage::{
    CONTEXT_DAG_ID, CONTEXT_TASK_ID, CONTEXT_TASK_KIND, ClientFactory, DagLifecycle, LineageDag,
};
pub use location::resolve_location;
pub use run::{DagRun, TaskInstance, TaskInstanceMap, TaskInstances, TaskState};
pub use schedule::{NominalWindow, Schedule};
pub use task::{SourceLocation, Task, TaskKind};
