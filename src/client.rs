//! HTTP transport seam
//!
//! The project model only needs three capabilities from the transport: text reads, text
//! writes, and a binary download for export archives. They are expressed by the [`Client`]
//! trait so tests can script responses; [`HttpClient`] is the `reqwest` implementation.

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use tracing::debug;

/// Headers and query parameters attached to a request
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Request headers
    pub headers: Vec<(String, String)>,
    /// Query string parameters
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Options carrying the JSON content headers the export endpoints expect
    pub fn json() -> Self {
        Self::new()
            .header("content-type", "application/json")
            .header("accept", "*")
    }
}

/// Body of a write request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestBody {
    /// No payload
    Empty,
    /// `multipart/form-data` with one file part plus text fields
    Multipart {
        /// Name reported for the `file` part
        file_name: String,
        /// Raw file bytes
        content: Vec<u8>,
        /// Additional text fields
        fields: Vec<(String, String)>,
    },
}

/// Transport capability used by [`RemoteProject`](crate::RemoteProject)
#[async_trait]
pub trait Client: Send + Sync {
    /// Read `url` and return the response body as text
    async fn get(&self, url: &str, options: &RequestOptions) -> Result<String>;

    /// Write `body` to `url` and return the response body as text
    async fn post(&self, url: &str, body: RequestBody, options: &RequestOptions)
    -> Result<String>;

    /// Download the binary export archive at `url`
    async fn get_export_file(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`Client`] implementation over `reqwest`
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Build a client honouring the timeout and user agent in `config`
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    fn prepare_request(
        &self,
        mut request: reqwest::RequestBuilder,
        options: &RequestOptions,
    ) -> reqwest::RequestBuilder {
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        request
    }

    async fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        Err(Error::Http {
            status: response.status().as_u16(),
            url: url.to_string(),
            body: response.text().await.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl Client for HttpClient {
    async fn get(&self, url: &str, options: &RequestOptions) -> Result<String> {
        debug!(url, "GET");
        let response = self
            .prepare_request(self.client.get(url), options)
            .send()
            .await?;
        let response = Self::check_status(url, response).await?;
        Ok(response.text().await?)
    }

    async fn post(
        &self,
        url: &str,
        body: RequestBody,
        options: &RequestOptions,
    ) -> Result<String> {
        debug!(url, "POST");
        let request = self.prepare_request(self.client.post(url), options);
        let request = match body {
            RequestBody::Empty => request.body(""),
            RequestBody::Multipart {
                file_name,
                content,
                fields,
            } => {
                let mut form = reqwest::multipart::Form::new().part(
                    "file",
                    reqwest::multipart::Part::bytes(content).file_name(file_name),
                );
                for (name, value) in fields {
                    form = form.text(name, value);
                }
                request.multipart(form)
            }
        };
        let response = Self::check_status(url, request.send().await?).await?;
        Ok(response.text().await?)
    }

    async fn get_export_file(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "downloading export archive");
        let response = Self::check_status(url, self.client.get(url).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
