//! Per-task-kind lineage extractors and the registry that resolves them.
//!
//! An [`Extractor`] describes the datasets a task reads and writes. Extractors
//! are created per task by an [`ExtractorFactory`], registered in an
//! [`ExtractorRegistry`] under the task's [`TaskKind`]. Lookup is by exact key;
//! a task whose kind has no factory is reported as a job with no datasets.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use skein_types::{StepMetadata, job_name};

use crate::declared::DeclaredLineageExtractor;
use crate::error::Result;
use crate::run::TaskInstance;
use crate::task::{Task, TaskKind};

/// Derives lineage metadata for one task.
///
/// Returning an empty vector means "nothing known"; errors are reserved for
/// genuine failures and never abort the task being described.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Metadata known before the task body runs.
    async fn extract(&self) -> Result<Vec<StepMetadata>>;

    /// Metadata known once the task has finished, e.g. a generated table name.
    async fn extract_on_complete(
        &self,
        _task_instance: &TaskInstance,
    ) -> Result<Vec<StepMetadata>> {
        Ok(Vec::new())
    }
}

/// The task an extractor is being created for.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionTarget<'a> {
    pub dag_id: &'a str,
    pub task: &'a Task,
}

impl<'a> ExtractionTarget<'a> {
    pub fn new(dag_id: &'a str, task: &'a Task) -> Self {
        Self { dag_id, task }
    }

    /// `<dag_id>.<task_id>`
    pub fn job_name(&self) -> String {
        job_name(self.dag_id, self.task.task_id())
    }
}

/// Creates an [`Extractor`] for a task.
///
/// Implemented for any `Fn(&ExtractionTarget) -> Box<dyn Extractor>`.
pub trait ExtractorFactory: Send + Sync {
    fn create(&self, target: &ExtractionTarget<'_>) -> Box<dyn Extractor>;
}

impl<F> ExtractorFactory for F
where
    F: Fn(&ExtractionTarget<'_>) -> Box<dyn Extractor> + Send + Sync,
{
    fn create(&self, target: &ExtractionTarget<'_>) -> Box<dyn Extractor> {
        self(target)
    }
}

/// Extractor that knows nothing. Used when no factory matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullExtractor;

#[async_trait]
impl Extractor for NullExtractor {
    async fn extract(&self) -> Result<Vec<StepMetadata>> {
        Ok(Vec::new())
    }
}

/// Map from task kind to extractor factory.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    factories: HashMap<TaskKind, Arc<dyn ExtractorFactory>>,
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl ExtractorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the built-in extractors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DeclaredLineageExtractor::KIND, DeclaredLineageExtractor::factory);
        registry
    }

    /// Register `factory` for `kind`, replacing any previous one.
    pub fn register(
        &mut self,
        kind: impl Into<TaskKind>,
        factory: impl ExtractorFactory + 'static,
    ) {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    /// Remove the factory for `kind`, returning it.
    pub fn remove(&mut self, kind: &TaskKind) -> Option<Arc<dyn ExtractorFactory>> {
        self.factories.remove(kind)
    }

    pub fn contains(&self, kind: &TaskKind) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&TaskKind> {
        let mut kinds: Vec<_> = self.factories.keys().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Factory registered for the task's kind, if any.
    pub fn resolve(&self, task: &Task) -> Option<Arc<dyn ExtractorFactory>> {
        self.factories.get(task.kind()).cloned()
    }

    /// An extractor for `target`, or [`NullExtractor`] when none is registered.
    pub fn extractor_for(&self, target: &ExtractionTarget<'_>) -> Box<dyn Extractor> {
        match self.resolve(target.task) {
            Some(factory) => factory.create(target),
            None => Box::new(NullExtractor),
        }
    }
}
