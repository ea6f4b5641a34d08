//! HTTP implementation of the `HostTransport` port.
//!
//! Each call POSTs the JSON `RpcCall` envelope to `http://<host>:<port>/` and
//! decodes the reply as `uuid -> response`.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use flow_common::{HostReply, RpcCall};
use reqwest::Client;

use crate::application::ports::HostTransport;

/// JSON-over-HTTP transport to worker hosts.
#[derive(Debug, Clone)]
pub struct HttpHostTransport {
    client: Client,
    port: u16,
}

impl HttpHostTransport {
    /// Create a transport that reaches hosts on `port` by default.
    ///
    /// `timeout` bounds each request at the HTTP layer; the dispatcher applies
    /// its own bound on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(port: u16, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, port })
    }

    /// Endpoint for `host`; addresses carrying an explicit port keep it.
    #[must_use]
    pub fn endpoint(&self, host: &str) -> String {
        if host.starts_with('[') || host.matches(':').count() == 1 {
            format!("http://{host}/")
        } else if host.contains(':') {
            format!("http://[{host}]:{}/", self.port)
        } else {
            format!("http://{host}:{}/", self.port)
        }
    }
}

impl HostTransport for HttpHostTransport {
    async fn call(&self, host: &str, call: &RpcCall) -> Result<HostReply> {
        let url = self.endpoint(host);
        let response = self
            .client
            .post(&url)
            .json(call)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        if !response.status().is_success() {
            bail!("{url} answered {}", response.status());
        }

        response
            .json::<HostReply>()
            .await
            .with_context(|| format!("malformed reply from {url}"))
    }
}
