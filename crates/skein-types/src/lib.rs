//! Shared lineage types for Skein.
//!
//! Value objects describing where data lives (`Source`), what a task reads or
//! writes (`Dataset`), and what an extractor reports for one task
//! (`StepMetadata`). They are immutable once built and shared between the
//! client facade and the DAG synchronization engine.

pub mod dataset;
pub mod error;
pub mod job;
pub mod metadata;

pub use dataset::{Dataset, DatasetRef, DatasetType, Source};
pub use error::{MetadataError, Result};
pub use job::{JobType, job_name};
pub use metadata::{StepContext, StepMetadata};
