//! The lineage-reporting DAG.
//!
//! [`LineageDag`] wraps a [`DagDefinition`] and implements the two lifecycle
//! hooks the host scheduler calls:
//!
//! ```text
//! on_run_created ──▶ namespace ─▶ per task: extract ─▶ sources/datasets ─▶ job
//!                                           ─▶ mint run id ─▶ job run ─▶ start
//!
//! on_run_finished ─▶ per started task: extract_on_complete ─▶ job (run-linked)
//!                                      ─▶ datasets (run-linked) ─▶ complete | fail
//! ```
//!
//! Reporting is strictly best-effort. Every extractor call and every lineage
//! server call is isolated; failures are logged and never reach the host.

use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use skein_client::{
    CreateDatasetRequest, CreateJobRequest, CreateJobRunRequest, CreateSourceRequest,
    LineageClient, SharedLineageClient, SkeinClient,
};
use skein_config::LineageConfig;
use skein_types::{Dataset, DatasetRef, StepContext, StepMetadata};
use tracing::{debug, error, info, warn};

use crate::dag::DagDefinition;
use crate::error::{LineageError, Result};
use crate::extractor::{ExtractionTarget, ExtractorRegistry};
use crate::identity::{RunIdGenerator, RunIdentityStore, uuid_run_id};
use crate::location::resolve_location;
use crate::run::{DagRun, TaskInstance, TaskInstances};
use crate::schedule::NominalWindow;
use crate::task::Task;

/// Context key holding the DAG id.
pub const CONTEXT_DAG_ID: &str = "dag.id";
/// Context key holding the task id.
pub const CONTEXT_TASK_ID: &str = "task.id";
/// Context key holding the task kind.
pub const CONTEXT_TASK_KIND: &str = "task.kind";

/// Builds the lineage client from configuration.
pub type ClientFactory =
    Arc<dyn Fn(&LineageConfig) -> skein_client::Result<SharedLineageClient> + Send + Sync>;

/// Hooks the host scheduler invokes around a DAG run.
#[async_trait]
pub trait DagLifecycle: Send + Sync {
    /// A new run of the DAG was created.
    async fn on_run_created(&self, run: &DagRun);

    /// The run reached a terminal state.
    async fn on_run_finished(
        &self,
        run: &DagRun,
        success: bool,
        task_instances: &dyn TaskInstances,
    );
}

/// A DAG that reports its runs to a lineage server.
pub struct LineageDag {
    dag: DagDefinition,
    config: LineageConfig,
    extractors: ExtractorRegistry,
    run_id_generator: RunIdGenerator,
    identities: RunIdentityStore,
    client: Mutex<Option<SharedLineageClient>>,
    client_factory: ClientFactory,
    known_sources: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for LineageDag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineageDag")
            .field("dag_id", &self.dag.dag_id())
            .field("namespace", &self.namespace())
            .field("extractors", &self.extractors)
            .field("active_runs", &self.identities.active_runs())
            .finish()
    }
}

impl LineageDag {
    /// Wrap `dag`, loading configuration from the user and project config
    /// files and the environment.
    pub fn new(dag: DagDefinition) -> Result<Self> {
        let loaded = skein_config::load_config(None);
        Self::with_config(dag, loaded.config)
    }

    /// Wrap `dag` with explicit configuration.
    pub fn with_config(dag: DagDefinition, config: LineageConfig) -> Result<Self> {
        dag.validate()?;
        Ok(Self {
            dag,
            config,
            extractors: ExtractorRegistry::with_defaults(),
            run_id_generator: Arc::new(uuid_run_id),
            identities: RunIdentityStore::new(),
            client: Mutex::new(None),
            client_factory: Arc::new(http_client),
            known_sources: Mutex::new(HashSet::new()),
        })
    }

    /// Use `client` instead of building one from configuration.
    pub fn with_client(self, client: SharedLineageClient) -> Self {
        *self.client.lock() = Some(client);
        self
    }

    /// Replace how the client is built on first use.
    pub fn with_client_factory(
        mut self,
        factory: impl Fn(&LineageConfig) -> skein_client::Result<SharedLineageClient>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.client_factory = Arc::new(factory);
        self
    }

    /// Replace how lineage run ids are generated.
    pub fn set_run_id_generator(&mut self, generator: impl Fn() -> String + Send + Sync + 'static) {
        self.run_id_generator = Arc::new(generator);
    }

    pub fn new_run_id(&self) -> String {
        (self.run_id_generator)()
    }

    pub fn extractors(&self) -> &ExtractorRegistry {
        &self.extractors
    }

    /// Registry to add or replace extractors in before the first run.
    pub fn extractors_mut(&mut self) -> &mut ExtractorRegistry {
        &mut self.extractors
    }

    pub fn dag(&self) -> &DagDefinition {
        &self.dag
    }

    pub fn config(&self) -> &LineageConfig {
        &self.config
    }

    pub fn identities(&self) -> &RunIdentityStore {
        &self.identities
    }

    /// Namespace jobs and datasets are registered under.
    pub fn namespace(&self) -> &str {
        self.dag
            .namespace()
            .unwrap_or_else(|| self.config.namespace())
    }

    /// The cached client, building it on first use. `None` if it cannot be
    /// built; the next hook invocation tries again.
    pub fn get_or_create_client(&self) -> Option<SharedLineageClient> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            return Some(Arc::clone(client));
        }
        match (self.client_factory)(&self.config) {
            Ok(client) => {
                *slot = Some(Arc::clone(&client));
                Some(client)
            }
            Err(e) => {
                error!(dag_id = %self.dag.dag_id(), error = %e, "Failed to create lineage client; lineage reporting disabled for this call");
                None
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pre-run
    // ─────────────────────────────────────────────────────────────────────────

    async fn register_run(&self, client: &dyn LineageClient, run: &DagRun) {
        let namespace = self.namespace();
        info!(
            dag_id = %self.dag.dag_id(),
            run_id = %run.run_id,
            namespace,
            tasks = self.dag.tasks().len(),
            "Reporting DAG run to lineage server"
        );

        report(
            "create_namespace",
            client.create_namespace(namespace, self.dag.owner()),
        )
        .await;

        let window = NominalWindow::for_run(run.execution_date, self.dag.schedule());
        for task in self.dag.tasks() {
            self.register_task(client, run, task, window).await;
        }
    }

    async fn register_task(
        &self,
        client: &dyn LineageClient,
        run: &DagRun,
        task: &Task,
        window: NominalWindow,
    ) {
        let target = ExtractionTarget::new(self.dag.dag_id(), task);
        let job_name = target.job_name();
        let steps = self.guarded_extract(&target, None).await;

        for dataset in steps.iter().flat_map(StepMetadata::datasets) {
            self.register_dataset(client, dataset, None).await;
        }

        let lineage = JobLineage::fold(&steps, self.namespace(), &self.base_context(task));
        let job = self.job_request(&target, lineage, None);
        report("create_job", client.create_job(&job)).await;

        let Some(minted) = self.identities.get_or_mint(
            &run.run_id,
            task.task_id(),
            window,
            steps,
            || self.new_run_id(),
        ) else {
            debug!(job_name = %job_name, dag_run_id = %run.run_id, "DAG run already reported; not starting a new job run");
            return;
        };
        if minted.identity.finalized {
            debug!(job_name = %job_name, run_id = %minted.identity.lineage_run_id, "Job run already terminal; not restarting it");
            return;
        }
        let run_id = minted.identity.lineage_run_id;
        if minted.fresh {
            debug!(job_name = %job_name, run_id = %run_id, "Minted lineage run id");
        } else {
            debug!(job_name = %job_name, run_id = %run_id, "Reusing lineage run id");
        }

        let request = CreateJobRunRequest {
            job_name,
            run_id: run_id.clone(),
            run_args: run.run_args(),
            nominal_start_time: window.start,
            nominal_end_time: window.end,
            namespace_name: self.namespace().to_string(),
        };
        report("create_job_run", client.create_job_run(&request)).await;
        report(
            "mark_job_run_as_started",
            client.mark_job_run_as_started(&run_id),
        )
        .await;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Post-run
    // ─────────────────────────────────────────────────────────────────────────

    async fn finish_task(
        &self,
        client: &dyn LineageClient,
        run: &DagRun,
        success: bool,
        task: &Task,
        task_instances: &dyn TaskInstances,
    ) {
        let task_id = task.task_id();
        let Some(task_instance) = task_instances.task_instance(&run.run_id, task_id) else {
            debug!(task_id, run_id = %run.run_id, "No task instance; skipping");
            return;
        };
        if !task_instance.state.is_started() {
            if self.identities.retire(&run.run_id, task_id) {
                debug!(task_id, state = ?task_instance.state, "Task never started; retiring its job run");
            }
            return;
        }
        let Some(identity) = self.identities.finalize(&run.run_id, task_id) else {
            if self.identities.is_closed(&run.run_id)
                || self.identities.get(&run.run_id, task_id).is_some()
            {
                debug!(task_id, run_id = %run.run_id, "Task already reported");
            } else {
                // Restart between hooks, or a run created before this DAG was wrapped.
                warn!(task_id, run_id = %run.run_id, "No lineage run id for task; skipping post-run updates");
            }
            return;
        };

        let target = ExtractionTarget::new(self.dag.dag_id(), task);
        let run_id = identity.lineage_run_id.as_str();
        let steps = self.guarded_extract(&target, Some(&task_instance)).await;

        if !steps.is_empty() {
            let namespace = self.namespace();
            let pre_run = JobLineage::fold(&identity.pre_run, namespace, &self.base_context(task));
            let post_run = JobLineage::fold(&steps, namespace, &pre_run.context);

            let job = self.job_request(&target, post_run, Some(run_id.to_string()));
            report("create_job", client.create_job(&job)).await;

            if !identity.pre_run.is_empty() {
                let job = self.job_request(&target, pre_run, None);
                report("create_job", client.create_job(&job)).await;
            }

            for dataset in steps.iter().flat_map(StepMetadata::datasets) {
                self.register_dataset(client, dataset, Some(run_id)).await;
            }
        }

        if success {
            report(
                "mark_job_run_as_completed",
                client.mark_job_run_as_completed(run_id),
            )
            .await;
        } else {
            report(
                "mark_job_run_as_failed",
                client.mark_job_run_as_failed(run_id),
            )
            .await;
        }
        debug!(job_name = %target.job_name(), run_id, success, "Reported task outcome");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shared helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Run the task's extractor, turning errors, panics, and malformed output
    /// into "no metadata".
    async fn guarded_extract(
        &self,
        target: &ExtractionTarget<'_>,
        task_instance: Option<&TaskInstance>,
    ) -> Vec<StepMetadata> {
        let phase = if task_instance.is_some() { "post-run" } else { "pre-run" };
        let job_name = target.job_name();

        let extractor =
            match std::panic::catch_unwind(AssertUnwindSafe(|| self.extractors.extractor_for(target))) {
                Ok(extractor) => extractor,
                Err(panic) => {
                    error!(%job_name, phase, panic = panic_message(&*panic), "Extractor factory panicked");
                    return Vec::new();
                }
            };

        let outcome = match task_instance {
            None => AssertUnwindSafe(extractor.extract()).catch_unwind().await,
            Some(ti) => AssertUnwindSafe(extractor.extract_on_complete(ti))
                .catch_unwind()
                .await,
        };

        let steps = match outcome {
            Ok(Ok(steps)) => steps,
            Ok(Err(e)) => {
                warn!(%job_name, phase, error = %e, "Extractor failed; reporting without metadata");
                return Vec::new();
            }
            Err(panic) => {
                error!(%job_name, phase, panic = panic_message(&*panic), "Extractor panicked; reporting without metadata");
                return Vec::new();
            }
        };

        if let Err(e) = steps.iter().try_for_each(StepMetadata::validate) {
            let e = LineageError::from(e);
            warn!(%job_name, phase, error = %e, "Discarding extracted metadata");
            return Vec::new();
        }
        steps
    }

    /// Register the dataset, and its source the first time it is seen.
    async fn register_dataset(
        &self,
        client: &dyn LineageClient,
        dataset: &Dataset,
        run_id: Option<&str>,
    ) {
        let source = dataset.source();
        let known = self.known_sources.lock().contains(source.name());
        if !known {
            let request = CreateSourceRequest {
                source_type: source.source_type().to_string(),
                source_name: source.name().to_string(),
                connection_url: source.connection_url().to_string(),
                description: None,
            };
            if report("create_datasource", client.create_datasource(&request)).await {
                self.known_sources.lock().insert(source.name().to_string());
            }
        }

        let request = CreateDatasetRequest {
            dataset_name: dataset.name().to_string(),
            dataset_type: dataset.dataset_type(),
            physical_name: dataset.physical_name().to_string(),
            source_name: source.name().to_string(),
            namespace_name: self.namespace().to_string(),
            run_id: run_id.map(str::to_string),
            description: None,
        };
        report("create_dataset", client.create_dataset(&request)).await;
    }

    fn base_context(&self, task: &Task) -> StepContext {
        StepContext::from([
            (CONTEXT_DAG_ID.to_string(), self.dag.dag_id().to_string()),
            (CONTEXT_TASK_ID.to_string(), task.task_id().to_string()),
            (CONTEXT_TASK_KIND.to_string(), task.kind().to_string()),
        ])
    }

    fn job_request(
        &self,
        target: &ExtractionTarget<'_>,
        lineage: JobLineage,
        run_id: Option<String>,
    ) -> CreateJobRequest {
        let task = target.task;
        CreateJobRequest {
            job_name: target.job_name(),
            job_type: task.job_type(),
            location: self
                .dag
                .location_of(task)
                .map(|location| resolve_location(&location, self.config.location.as_ref())),
            input_dataset: lineage.inputs,
            output_dataset: lineage.outputs,
            context: lineage.context,
            description: task
                .description()
                .or_else(|| self.dag.description())
                .map(str::to_string),
            namespace_name: self.namespace().to_string(),
            run_id,
        }
    }
}

#[async_trait]
impl DagLifecycle for LineageDag {
    async fn on_run_created(&self, run: &DagRun) {
        let Some(client) = self.get_or_create_client() else {
            return;
        };
        self.register_run(client.as_ref(), run).await;
    }

    async fn on_run_finished(
        &self,
        run: &DagRun,
        success: bool,
        task_instances: &dyn TaskInstances,
    ) {
        let Some(client) = self.get_or_create_client() else {
            return;
        };
        info!(
            dag_id = %self.dag.dag_id(),
            run_id = %run.run_id,
            success,
            "Reporting DAG run outcome to lineage server"
        );
        for task in self.dag.tasks() {
            self.finish_task(client.as_ref(), run, success, task, task_instances)
                .await;
        }
    }
}

/// All steps of one task folded into the dataset lists and context of its job.
struct JobLineage {
    inputs: Vec<DatasetRef>,
    outputs: Vec<DatasetRef>,
    context: StepContext,
}

impl JobLineage {
    /// Later steps' context wins over earlier steps', which wins over `base`.
    fn fold(steps: &[StepMetadata], namespace: &str, base: &StepContext) -> Self {
        let mut lineage = JobLineage {
            inputs: Vec::new(),
            outputs: Vec::new(),
            context: base.clone(),
        };
        for step in steps {
            lineage.inputs.extend(step.input_refs(namespace));
            lineage.outputs.extend(step.output_refs(namespace));
            lineage.context = step.merge_context(&lineage.context);
        }
        lineage
    }
}

/// Await one lineage server call, logging instead of propagating failure.
/// Returns whether the call succeeded.
async fn report<F>(call: &'static str, fut: F) -> bool
where
    F: Future<Output = skein_client::Result<()>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(
                call,
                status = e.status(),
                transient = e.is_transient(),
                error = %e,
                "Lineage call failed"
            );
            false
        }
        Err(panic) => {
            error!(call, panic = panic_message(&*panic), "Lineage client panicked");
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn http_client(config: &LineageConfig) -> skein_client::Result<SharedLineageClient> {
    let settings = config.client();
    let mut builder = SkeinClient::builder()
        .base_url(settings.url.as_str())
        .timeout(settings.timeout());
    if let Some(key) = settings.api_key.as_deref() {
        builder = builder.api_key(key);
    }
    Ok(Arc::new(builder.build()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskKind;
    use skein_types::{Dataset, Source};

    fn dag() -> DagDefinition {
        DagDefinition::new("orders")
            .with_description("Orders pipeline")
            .with_fileloc("/srv/dags/orders.py")
            .with_task(Task::new("load", "bash"))
            .with_task(Task::new("notify", "bash").with_description("Send the report"))
    }

    #[test]
    fn test_with_config_validates() {
        let err = LineageDag::with_config(DagDefinition::new("empty"), LineageConfig::new())
            .unwrap_err();
        assert!(matches!(err, LineageError::InvalidDag(_)));
    }

    #[test]
    fn test_namespace_resolution() {
        let config = LineageConfig::from_toml(r#"namespace = "from_config""#).unwrap();
        let lineage = LineageDag::with_config(dag(), config.clone()).unwrap();
        assert_eq!(lineage.namespace(), "from_config");

        let lineage = LineageDag::with_config(dag().with_namespace("from_dag"), config).unwrap();
        assert_eq!(lineage.namespace(), "from_dag");

        let lineage = LineageDag::with_config(dag(), LineageConfig::new()).unwrap();
        assert_eq!(lineage.namespace(), "default");
    }

    #[test]
    fn test_job_request_fields() {
        let lineage = LineageDag::with_config(dag(), LineageConfig::new()).unwrap();
        let load = lineage.dag().task("load").unwrap();
        let target = ExtractionTarget::new("orders", load);
        let folded = JobLineage::fold(&[], "default", &lineage.base_context(load));

        let job = lineage.job_request(&target, folded, None);
        assert_eq!(job.job_name, "orders.load");
        assert_eq!(job.location.as_deref(), Some("file:///srv/dags/orders.py"));
        assert_eq!(job.description.as_deref(), Some("Orders pipeline"));
        assert!(job.input_dataset.is_empty() && job.output_dataset.is_empty());
        assert_eq!(job.context[CONTEXT_DAG_ID], "orders");
        assert_eq!(job.context[CONTEXT_TASK_ID], "load");
        assert_eq!(job.context[CONTEXT_TASK_KIND], "bash");

        let notify = lineage.dag().task("notify").unwrap();
        let target = ExtractionTarget::new("orders", notify);
        let job = lineage.job_request(
            &target,
            JobLineage::fold(&[], "default", &StepContext::new()),
            Some("r".into()),
        );
        assert_eq!(job.description.as_deref(), Some("Send the report"));
        assert_eq!(job.run_id.as_deref(), Some("r"));
    }

    #[test]
    fn test_fold_merges_steps_in_order() {
        let source = Source::new("DummySource", "dummy", "http://dummy");
        let steps = vec![
            StepMetadata::new("a")
                .with_inputs([Dataset::from_table(source.clone(), "in1")])
                .with_context("k", "first"),
            StepMetadata::new("b")
                .with_outputs([Dataset::from_table(source, "out1")])
                .with_context("k", "second"),
        ];
        let base = StepContext::from([("k".to_string(), "base".to_string())]);

        let folded = JobLineage::fold(&steps, "ns", &base);
        assert_eq!(folded.inputs[0].name, "in1");
        assert_eq!(folded.outputs[0].namespace, "ns");
        assert_eq!(folded.context["k"], "second");
    }

    #[test]
    fn test_run_id_generator_is_replaceable() {
        let mut lineage = LineageDag::with_config(dag(), LineageConfig::new()).unwrap();
        assert_eq!(uuid::Uuid::parse_str(&lineage.new_run_id()).unwrap().get_version_num(), 4);

        lineage.set_run_id_generator(|| "fixed".to_string());
        assert_eq!(lineage.new_run_id(), "fixed");
    }

    #[test]
    fn test_extractors_mut_extends_defaults() {
        let mut lineage = LineageDag::with_config(dag(), LineageConfig::new()).unwrap();
        lineage
            .extractors_mut()
            .register("bash", crate::declared::DeclaredLineageExtractor::factory);
        assert!(lineage.extractors().contains(&TaskKind::new("bash")));
        assert!(lineage.extractors().contains(&TaskKind::new("declared")));
    }

    #[test]
    fn test_client_factory_error_disables_reporting() {
        let lineage = LineageDag::with_config(dag(), LineageConfig::new())
            .unwrap()
            .with_client_factory(|_| Err(skein_client::Error::Config("no server".into())));
        assert!(lineage.get_or_create_client().is_none());
    }

    #[test]
    fn test_default_http_client_is_cached() {
        let lineage = LineageDag::with_config(dag(), LineageConfig::new()).unwrap();
        let first = lineage.get_or_create_client().unwrap();
        let second = lineage.get_or_create_client().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*payload), "non-string panic payload");
    }
}
