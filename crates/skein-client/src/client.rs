//! HTTP client for the lineage server's REST API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::trace;
use url::Url;

use crate::api::{DatasetsApi, JobsApi, NamespacesApi, RunsApi, SourcesApi};
use crate::error::{Error, ErrorResponse, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Path prefix of the lineage server REST API.
const API_PREFIX: [&str; 2] = ["api", "v1"];

/// Lineage server API client.
///
/// Cheap to clone; clones share the underlying connection pool.
///
/// # Example
///
/// ```no_run
/// use skein_client::SkeinClient;
///
/// # async fn example() -> skein_client::Result<()> {
/// let client = SkeinClient::builder()
///     .base_url("http://localhost:5000")
///     .api_key("secret")
///     .build()?;
///
/// let ns = client.namespaces().put("default", "anonymous").await?;
/// println!("{}", ns.name);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SkeinClient {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) timeout: Duration,
}

impl std::fmt::Debug for SkeinClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkeinClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

impl SkeinClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn namespaces(&self) -> NamespacesApi {
        NamespacesApi::new(self.clone())
    }

    pub fn sources(&self) -> SourcesApi {
        SourcesApi::new(self.clone())
    }

    pub fn datasets(&self) -> DatasetsApi {
        DatasetsApi::new(self.clone())
    }

    /// Jobs and the runs created under them.
    pub fn jobs(&self) -> JobsApi {
        JobsApi::new(self.clone())
    }

    /// Run state transitions.
    pub fn runs(&self) -> RunsApi {
        RunsApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL under `/api/v1/` from path segments.
    ///
    /// Each segment is percent-encoded, so names containing `/` stay a single
    /// segment.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config("base_url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    pub(crate) async fn put<T, B>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        self.send(Method::PUT, segments, Some(body)).await
    }

    pub(crate) async fn post<T, B>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        self.send(Method::POST, segments, Some(body)).await
    }

    /// POST with no body, used for run state transitions.
    pub(crate) async fn post_empty<T>(&self, segments: &[&str]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.send::<T, ()>(Method::POST, segments, None).await
    }

    async fn send<T, B>(&self, method: Method, segments: &[&str], body: Option<&B>) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = self.url(segments)?;
        trace!(%method, %url, "lineage request");

        let mut request = self
            .inner
            .http
            .request(method, url)
            .timeout(self.inner.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Map a failed response to an [`Error`], using the server's message when
    /// the body carries one.
    async fn extract_error(&self, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();

        match response.json::<ErrorResponse>().await {
            Ok(err) => match status {
                404 => Error::NotFound(err.message),
                401 => Error::Unauthorized(err.message),
                _ => Error::Api {
                    status,
                    message: err.message,
                },
            },
            Err(_) => Error::Api {
                status,
                message: format!("no error body (HTTP {status})"),
            },
        }
    }
}

/// Builder for creating a [`SkeinClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the base URL for the lineage server.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the bearer API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<SkeinClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        let base_url = Url::parse(&base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("base_url is not a base URL: {base_url}")));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|_| Error::Config("Invalid API key".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("skein-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(SkeinClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
