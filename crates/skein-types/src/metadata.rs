//! Extractor output for a single task.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, DatasetRef};
use crate::error::{MetadataError, Result};

/// Free-form string context attached to a job.
pub type StepContext = BTreeMap<String, String>;

/// What one extractor knows about one task: the job name, the datasets it
/// reads and writes (in order), and free-form context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMetadata {
    name: String,
    #[serde(default)]
    inputs: Vec<Dataset>,
    #[serde(default)]
    outputs: Vec<Dataset>,
    #[serde(default)]
    context: StepContext,
}

impl StepMetadata {
    /// Create metadata for `name` with no datasets and empty context.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            context: StepContext::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = Dataset>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = Dataset>) -> Self {
        self.outputs.extend(outputs);
        self
    }

    /// Add a context entry, replacing any previous value for `key`.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[Dataset] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Dataset] {
        &self.outputs
    }

    pub fn context(&self) -> &StepContext {
        &self.context
    }

    /// True when the step names no datasets at all.
    pub fn has_no_datasets(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }

    /// Inputs then outputs, in declaration order.
    pub fn datasets(&self) -> impl Iterator<Item = &Dataset> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    pub fn input_refs(&self, namespace: &str) -> Vec<DatasetRef> {
        self.inputs.iter().map(|d| d.to_ref(namespace)).collect()
    }

    pub fn output_refs(&self, namespace: &str) -> Vec<DatasetRef> {
        self.outputs.iter().map(|d| d.to_ref(namespace)).collect()
    }

    /// Layer this step's context over `base`. Keys from `self` win.
    pub fn merge_context(&self, base: &StepContext) -> StepContext {
        let mut merged = base.clone();
        merged.extend(
            self.context
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }

    /// Reject metadata the lineage service would refuse.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MetadataError::EmptyJobName);
        }
        for dataset in self.datasets() {
            if dataset.name().trim().is_empty() {
                return Err(MetadataError::EmptyDatasetName {
                    step: self.name.clone(),
                });
            }
            if dataset.source().name().trim().is_empty() {
                return Err(MetadataError::EmptySourceName {
                    step: self.name.clone(),
                    dataset: dataset.name().to_string(),
                });
            }
        }
        Ok(())
    }
}
