//! Resolution of the chat endpoint URL.
//!
//! The endpoint is read once, before the conversation starts, from a small
//! JSON document (`{"API_URL": "..."}`). Whatever goes wrong, the result is
//! always usable: failures fall back to [`DEFAULT_ENDPOINT`].

use std::fmt;

use anyhow::{anyhow, Result};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{info, warn};

use crate::source::Source;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/api/chat";

#[derive(Deserialize)]
struct EnvDocument {
    #[serde(rename = "API_URL", alias = "endpoint_url")]
    api_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    pub fn parse(s: &str) -> Result<Self> {
        let url = Url::parse(s.trim())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("unsupported endpoint scheme: {}", url.scheme()));
        }
        Ok(Self { url })
    }

    /// Load the endpoint document, substituting the default on any failure.
    pub async fn resolve(client: &Client, source: &Source) -> Self {
        match Self::load(client, source).await {
            Ok(endpoint) => {
                info!(source = %source, endpoint = %endpoint, "Resolved chat endpoint");
                endpoint
            }
            Err(e) => {
                warn!(source = %source, error = %e, "Endpoint document unavailable, using default");
                Self::default()
            }
        }
    }

    async fn load(client: &Client, source: &Source) -> Result<Self> {
        let document: EnvDocument = source.fetch_json(client).await?;
        Self::parse(&document.api_url)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Sibling `health` route of the chat route (`/api/chat` -> `/api/health`).
    ///
    /// A trailing slash on the chat route is ignored.
    pub fn health_url(&self) -> Result<Url> {
        let mut base = self.url.clone();
        let trimmed = base.path().trim_end_matches('/').to_string();
        if !trimmed.is_empty() {
            base.set_path(&trimmed);
        }
        Ok(base.join("health")?)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}
