//! Request and response types for the lineage server API.
//!
//! Request structs carry every argument of the corresponding facade call.
//! Fields that travel in the URL path are skipped during serialization, so
//! the serialized form of a request is exactly its HTTP body.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use skein_types::{DatasetRef, DatasetType, JobType, StepContext};

/// Arguments a run was triggered with.
pub type RunArgs = BTreeMap<String, serde_json::Value>;

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateNamespaceBody<'a> {
    pub owner_name: &'a str,
}

/// Create-or-update a data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSourceRequest {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(skip)]
    pub source_name: String,
    pub connection_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Create-or-update a dataset, optionally versioned by a job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatasetRequest {
    #[serde(skip)]
    pub dataset_name: String,
    #[serde(rename = "type")]
    pub dataset_type: DatasetType,
    pub physical_name: String,
    pub source_name: String,
    #[serde(skip)]
    pub namespace_name: String,
    /// Run that produced or consumed this dataset version, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Create-or-update a job, optionally linking its version to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    #[serde(skip)]
    pub job_name: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "inputs")]
    pub input_dataset: Vec<DatasetRef>,
    #[serde(rename = "outputs")]
    pub output_dataset: Vec<DatasetRef>,
    pub context: StepContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip)]
    pub namespace_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

/// Create a job run with a pre-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRunRequest {
    #[serde(skip)]
    pub job_name: String,
    pub run_id: String,
    pub run_args: RunArgs,
    #[serde(serialize_with = "iso_8601")]
    pub nominal_start_time: Option<DateTime<Utc>>,
    #[serde(serialize_with = "iso_8601")]
    pub nominal_end_time: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub namespace_name: String,
}

/// Timestamps go over the wire as `2016-01-01T00:00:00.000Z`.
fn iso_8601<S: Serializer>(value: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(ts) => s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => s.serialize_none(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

/// A namespace as returned by the server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Namespace {
    pub name: String,
    pub owner_name: Option<String>,
    pub description: Option<String>,
}

/// A data source as returned by the server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceRecord {
    #[serde(rename = "type")]
    pub source_type: String,
    pub name: String,
    pub connection_url: String,
}

/// A dataset as returned by the server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatasetRecord {
    pub name: String,
    pub physical_name: String,
    pub source_name: String,
    pub namespace: Option<String>,
}

/// A job as returned by the server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobRecord {
    pub name: String,
    pub location: Option<String>,
    pub inputs: Vec<DatasetRef>,
    pub outputs: Vec<DatasetRef>,
    pub context: StepContext,
}

/// A job run as returned by the server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunRecord {
    #[serde(alias = "runId")]
    pub id: String,
    pub state: Option<String>,
    pub nominal_start_time: Option<String>,
    pub nominal_end_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_dataset_body_omits_path_fields() {
        let request = CreateDatasetRequest {
            dataset_name: "extract_input1".into(),
            dataset_type: DatasetType::DbTable,
            physical_name: "extract_input1".into(),
            source_name: "dummy_source_name".into(),
            namespace_name: "default".into(),
            run_id: None,
            description: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "type": "DB_TABLE",
                "physicalName": "extract_input1",
                "sourceName": "dummy_source_name"
            })
        );
    }

    #[test]
    fn test_job_body_includes_run_id_when_set() {
        let request = CreateJobRequest {
            job_name: "dag.task".into(),
            job_type: JobType::Batch,
            location: Some("file:///dags/dag.py".into()),
            input_dataset: vec![DatasetRef {
                namespace: "default".into(),
                name: "in".into(),
            }],
            output_dataset: vec![],
            context: StepContext::from([("sql".to_string(), "select 1".to_string())]),
            description: None,
            namespace_name: "default".into(),
            run_id: Some("run-1".into()),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["type"], "BATCH");
        assert_eq!(body["runId"], "run-1");
        assert_eq!(body["inputs"][0]["name"], "in");
        assert_eq!(body["outputs"], json!([]));
        assert_eq!(body["context"]["sql"], "select 1");
        assert!(body.get("jobName").is_none());
        assert!(body.get("description").is_none());
    }

    #[test]
    fn test_job_run_body_formats_times() {
        let start = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
        let request = CreateJobRunRequest {
            job_name: "dag.task".into(),
            run_id: "run-1".into(),
            run_args: RunArgs::from([("external_trigger".to_string(), json!(false))]),
            nominal_start_time: Some(start),
            nominal_end_time: None,
            namespace_name: "default".into(),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["nominalStartTime"], "2016-01-01T00:00:00.000Z");
        assert!(body["nominalEndTime"].is_null());
        assert_eq!(body["runArgs"]["external_trigger"], false);
    }

    #[test]
    fn test_run_record_accepts_run_id_alias() {
        let run: RunRecord =
            serde_json::from_str(r#"{"runId": "abc", "runState": "RUNNING"}"#).unwrap();
        assert_eq!(run.id, "abc");
    }
}
