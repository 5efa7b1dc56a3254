//! The ChartMuseum client

use std::sync::Arc;

use reqwest::Method;
use url::Url;

use crate::auth::AuthConfig;
use crate::charts::ChartService;
use crate::config::{ClientConfig, parse_base_url};
use crate::error::Result;
use crate::info::InfoService;
use crate::request::{self, ApiRequest, Body, RequestOption};
use crate::response::{self, Destination, Response};
use crate::retry::RetryStrategy;
use crate::transport::Transport;

#[derive(Debug)]
struct Inner {
    base_url: Url,
    config: ClientConfig,
    transport: Transport,
}

/// Client for one ChartMuseum server
///
/// Cheap to clone; clones share the connection pool. Configuration is fixed
/// at construction. [`Client::with_base_url`] and [`Client::with_auth`]
/// return a reconfigured copy instead of mutating shared state.
///
/// ```rust,no_run
/// use chartmuseum_client::{Client, ClientConfig};
///
/// # async fn example() -> chartmuseum_client::Result<()> {
/// let client = Client::new(
///     ClientConfig::new("https://charts.example.com").with_basic_auth("admin", "password"),
/// )?;
///
/// let charts = client.charts().list_charts("stable", &[]).await?;
/// for (name, versions) in &charts {
///     println!("{name}: {} versions", versions.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.parsed_base_url()?;
        let transport = Transport::new(&config)?;
        Ok(Self::from_parts(base_url, config, transport))
    }

    /// Anonymous client with default settings
    pub fn anonymous(base_url: &str) -> Result<Self> {
        Self::new(ClientConfig::new(base_url))
    }

    /// Client authenticating with HTTP basic auth
    pub fn basic_auth(base_url: &str, username: &str, password: &str) -> Result<Self> {
        Self::new(ClientConfig::new(base_url).with_basic_auth(username, password))
    }

    /// Build a client from the configuration file at the default location
    pub fn from_default_config() -> Result<Self> {
        Self::new(ClientConfig::load()?)
    }

    fn from_parts(base_url: Url, config: ClientConfig, transport: Transport) -> Self {
        Self {
            inner: Arc::new(Inner {
                base_url,
                config,
                transport,
            }),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Same client, pointed at another server
    pub fn with_base_url(&self, base_url: &str) -> Result<Self> {
        let url = parse_base_url(base_url)?;
        let mut config = self.inner.config.clone();
        config.base_url = url.to_string();
        Ok(Self::from_parts(url, config, self.inner.transport.clone()))
    }

    /// Same client, different credentials
    pub fn with_auth(&self, auth: AuthConfig) -> Result<Self> {
        let resolved = auth.resolve()?;
        let config = self.inner.config.clone().with_auth(auth);
        Ok(Self::from_parts(
            self.inner.base_url.clone(),
            config,
            self.inner.transport.with_auth(resolved),
        ))
    }

    /// Same client, custom retry behaviour
    pub fn with_retry_strategy(&self, strategy: Arc<dyn RetryStrategy>) -> Self {
        Self::from_parts(
            self.inner.base_url.clone(),
            self.inner.config.clone(),
            self.inner.transport.with_strategy(strategy),
        )
    }

    pub fn charts(&self) -> ChartService<'_> {
        ChartService::new(self)
    }

    pub fn info(&self) -> InfoService<'_> {
        InfoService::new(self)
    }

    /// Build a request for `path`, relative to the base URL
    pub fn new_request(
        &self,
        method: Method,
        path: &str,
        body: Body,
        options: &[RequestOption],
    ) -> Result<ApiRequest> {
        request::build(
            &self.inner.base_url,
            &self.inner.config.user_agent,
            method,
            path,
            body,
            options,
        )
    }

    /// Send a request and decode the response into `destination`
    ///
    /// The request's timeout and cancellation token cover the body as well
    /// as the headers.
    pub async fn execute(&self, request: &ApiRequest, destination: Destination<'_>) -> Result<Response> {
        let transport = &self.inner.transport;
        transport
            .bounded(request, async {
                let response = transport.send(request).await?;
                response::decode(&request.method, response, destination).await
            })
            .await
    }
}
