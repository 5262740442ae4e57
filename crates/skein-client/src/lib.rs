//! Lineage server client for Skein.
//!
//! Two layers:
//!
//! - [`LineageClient`]: the facade the DAG synchronization engine talks to.
//!   The engine holds it as an `Arc<dyn LineageClient>`.
//! - [`SkeinClient`]: a typed HTTP client for the lineage server REST API,
//!   which implements the facade.
//!
//! # Example
//!
//! ```no_run
//! use skein_client::{LineageClient, SkeinClient};
//!
//! # async fn example() -> skein_client::Result<()> {
//! let client = SkeinClient::builder()
//!     .base_url("http://localhost:5000")
//!     .build()?;
//!
//! client.create_namespace("default", "anonymous").await?;
//! client.mark_job_run_as_started("6f2d6c4e-9d0a-4d7e-8f7e-0c4b1f1e6a11").await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod facade;
pub mod types;

pub use client::{ClientBuilder, SkeinClient};
pub use error::{Error, Result};
pub use facade::{LineageClient, SharedLineageClient};
pub use types::*;
