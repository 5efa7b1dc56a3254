//! Server information endpoints

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::Result;
use crate::request::{Body, RequestOption};
use crate::response::Destination;

/// `GET /health`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    #[serde(default, alias = "Healthy")]
    pub healthy: bool,
}

/// `GET /info`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default, alias = "Version")]
    pub version: String,
}

/// Server information, obtained from [`Client::info`]
#[derive(Debug, Clone, Copy)]
pub struct InfoService<'a> {
    client: &'a Client,
}

impl<'a> InfoService<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Landing page served at the root, as text
    pub async fn index(&self, options: &[RequestOption]) -> Result<String> {
        let request = self.client.new_request(Method::GET, "/", Body::None, options)?;
        let mut body = Vec::new();
        self.client
            .execute(&request, Destination::Raw(&mut body))
            .await?
            .ready()?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    pub async fn health(&self, options: &[RequestOption]) -> Result<Health> {
        let request = self.client.new_request(Method::GET, "/health", Body::None, options)?;
        let mut health = Health::default();
        self.client
            .execute(&request, Destination::Json(&mut health))
            .await?
            .ready()?;
        Ok(health)
    }

    pub async fn info(&self, options: &[RequestOption]) -> Result<ServerInfo> {
        let request = self.client.new_request(Method::GET, "/info", Body::None, options)?;
        let mut info = ServerInfo::default();
        self.client
            .execute(&request, Destination::Json(&mut info))
            .await?
            .ready()?;
        Ok(info)
    }
}
