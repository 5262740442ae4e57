//! API endpoint implementations.

mod datasets;
mod jobs;
mod namespaces;
mod runs;
mod sources;

pub use datasets::DatasetsApi;
pub use jobs::JobsApi;
pub use namespaces::NamespacesApi;
pub use runs::RunsApi;
pub use sources::SourcesApi;
