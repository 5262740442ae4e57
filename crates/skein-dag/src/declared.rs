//! Built-in extractor for tasks that declare their own lineage.
//!
//! A task of kind `declared` lists its datasets under `params.lineage`:
//!
//! ```toml
//! [dag.tasks.params.lineage]
//! source = { type = "POSTGRESQL", name = "warehouse", connection_url = "postgres://db/wh" }
//! inputs = ["raw.orders", { name = "raw.customers", physical_name = "public.customers" }]
//! outputs = [{ name = "orders_topic", type = "STREAM" }]
//! context = { owner_team = "billing" }
//! ```
//!
//! A finished task may restate its lineage in its output under the same
//! `lineage` key; that takes precedence after the run.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use skein_types::{Dataset, DatasetType, Source, StepContext, StepMetadata};

use crate::error::{LineageError, Result};
use crate::extractor::{ExtractionTarget, Extractor};
use crate::run::TaskInstance;

const LINEAGE_KEY: &str = "lineage";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Declaration {
    source: Source,
    #[serde(default)]
    inputs: Vec<DeclaredDataset>,
    #[serde(default)]
    outputs: Vec<DeclaredDataset>,
    #[serde(default)]
    context: StepContext,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DeclaredDataset {
    Table(String),
    Detailed {
        name: String,
        #[serde(default)]
        physical_name: Option<String>,
        #[serde(rename = "type", default)]
        dataset_type: Option<DatasetType>,
    },
}

impl DeclaredDataset {
    fn into_dataset(self, source: &Source) -> Dataset {
        match self {
            DeclaredDataset::Table(name) => Dataset::from_table(source.clone(), name),
            DeclaredDataset::Detailed {
                name,
                physical_name,
                dataset_type,
            } => {
                let physical_name = physical_name.unwrap_or_else(|| name.clone());
                Dataset::new(
                    source.clone(),
                    name,
                    physical_name,
                    dataset_type.unwrap_or(DatasetType::DbTable),
                )
            }
        }
    }
}

/// Reads lineage a task declares in its params.
#[derive(Debug, Clone)]
pub struct DeclaredLineageExtractor {
    job_name: String,
    declared: Option<Value>,
}

impl DeclaredLineageExtractor {
    /// Task kind this extractor is registered under by default.
    pub const KIND: &'static str = "declared";

    pub fn new(target: &ExtractionTarget<'_>) -> Self {
        Self {
            job_name: target.job_name(),
            declared: target.task.params().get(LINEAGE_KEY).cloned(),
        }
    }

    /// [`ExtractorFactory`](crate::ExtractorFactory) entry point.
    pub fn factory(target: &ExtractionTarget<'_>) -> Box<dyn Extractor> {
        Box::new(Self::new(target))
    }

    fn parse(&self, declared: &Value) -> Result<Vec<StepMetadata>> {
        let declaration = Declaration::deserialize(declared).map_err(|e| {
            LineageError::Extraction(format!(
                "invalid lineage declaration for {}: {e}",
                self.job_name
            ))
        })?;

        let source = declaration.source;
        let inputs = declaration
            .inputs
            .into_iter()
            .map(|d| d.into_dataset(&source))
            .collect::<Vec<_>>();
        let outputs = declaration
            .outputs
            .into_iter()
            .map(|d| d.into_dataset(&source))
            .collect::<Vec<_>>();

        let mut step = StepMetadata::new(&self.job_name)
            .with_inputs(inputs)
            .with_outputs(outputs);
        for (key, value) in declaration.context {
            step = step.with_context(key, value);
        }
        Ok(vec![step])
    }
}

#[async_trait]
impl Extractor for DeclaredLineageExtractor {
    async fn extract(&self) -> Result<Vec<StepMetadata>> {
        match &self.declared {
            Some(declared) => self.parse(declared),
            None => Ok(Vec::new()),
        }
    }

    async fn extract_on_complete(&self, task_instance: &TaskInstance) -> Result<Vec<StepMetadata>> {
        let reported = task_instance
            .output
            .as_ref()
            .and_then(|output| output.get(LINEAGE_KEY));
        match reported {
            Some(reported) => self.parse(reported),
            None => self.extract().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::TaskState;
    use crate::task::Task;
    use serde_json::json;

    fn declared_task(params: Value) -> Task {
        Task::new("load", DeclaredLineageExtractor::KIND).with_params(params)
    }

    fn extractor(task: &Task) -> DeclaredLineageExtractor {
        DeclaredLineageExtractor::new(&ExtractionTarget::new("orders", task))
    }

    fn source() -> Value {
        json!({"type": "POSTGRESQL", "name": "warehouse", "connection_url": "postgres://db/wh"})
    }

    #[tokio::test]
    async fn test_no_declaration_is_no_metadata() {
        let task = declared_task(json!({"sql": "select 1"}));
        assert!(extractor(&task).extract().await.unwrap().is_empty());

        let bare = Task::new("load", DeclaredLineageExtractor::KIND);
        assert!(extractor(&bare).extract().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_declared_datasets() {
        let task = declared_task(json!({
            "lineage": {
                "source": source(),
                "inputs": ["raw.orders", {"name": "customers", "physical_name": "public.customers"}],
                "outputs": [{"name": "orders_topic", "type": "STREAM"}],
                "context": {"owner_team": "billing"}
            }
        }));

        let steps = extractor(&task).extract().await.unwrap();
        assert_eq!(steps.len(), 1);
        let step = &steps[0];
        assert_eq!(step.name(), "orders.load");
        assert_eq!(step.inputs()[0].name(), "raw.orders");
        assert_eq!(step.inputs()[1].physical_name(), "public.customers");
        assert_eq!(step.inputs()[1].dataset_type(), DatasetType::DbTable);
        assert_eq!(step.outputs()[0].dataset_type(), DatasetType::Stream);
        assert_eq!(step.outputs()[0].source().name(), "warehouse");
        assert_eq!(step.context()["owner_team"], "billing");
    }

    #[tokio::test]
    async fn test_malformed_declaration_is_an_error() {
        let task = declared_task(json!({"lineage": {"inputs": ["no_source"]}}));
        let err = extractor(&task).extract().await.unwrap_err();
        assert!(matches!(err, LineageError::Extraction(_)));
        assert!(err.to_string().contains("orders.load"));
    }

    #[tokio::test]
    async fn test_on_complete_prefers_reported_lineage() {
        let task = declared_task(json!({
            "lineage": {"source": source(), "outputs": ["staging.orders"]}
        }));
        let extractor = extractor(&task);

        let plain = TaskInstance::new("load", TaskState::Success);
        let steps = extractor.extract_on_complete(&plain).await.unwrap();
        assert_eq!(steps[0].outputs()[0].name(), "staging.orders");

        let reported = TaskInstance::new("load", TaskState::Success).with_output(json!({
            "lineage": {"source": source(), "outputs": ["staging.orders_20160101"]}
        }));
        let steps = extractor.extract_on_complete(&reported).await.unwrap();
        assert_eq!(steps[0].outputs()[0].name(), "staging.orders_20160101");
    }
}
