//! Service endpoint abstraction.
//!
//! # Responsibilities
//! - Represent one logical service's network address
//! - Precompute the base URL used for proxying and probing
//! - Build API, health and WebSocket URLs for the service

use url::Url;

use crate::registry::RegistryError;

/// Scheme used for every upstream HTTP call.
pub const UPSTREAM_SCHEME: &str = "http";

/// Address of a single backend service. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    name: String,
    host: String,
    port: u16,
    health_path: String,
    /// Pre-calculated base URL (`http://host:port/`).
    base_url: Url,
}

impl ServiceEndpoint {
    /// Create a new endpoint.
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        health_path: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let name = name.into();
        let host = host.into();
        let base_url = Url::parse(&format!("{}://{}:{}/", UPSTREAM_SCHEME, host, port))
            .map_err(|e| RegistryError::InvalidHost {
                service: name.clone(),
                host: host.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            name,
            host,
            port,
            health_path: health_path.into(),
            base_url,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn health_path(&self) -> &str {
        &self.health_path
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `<base>/api/v1/<rest>?<query>`. An empty `rest` targets the API root.
    pub fn api_url(&self, rest: &str, query: Option<&str>) -> Url {
        self.url_for(&format!("/api/v1/{}", rest.trim_start_matches('/')), query)
    }

    /// `<base><path>?<query>` for fixed single-purpose routes.
    pub fn url_for(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url.set_query(query.filter(|q| !q.is_empty()));
        url
    }

    /// URL probed by the health aggregator.
    pub fn health_url(&self) -> Url {
        self.url_for(&self.health_path, None)
    }

    /// WebSocket URL for `path`, with the HTTP scheme swapped for its
    /// WebSocket equivalent.
    pub fn ws_url(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.url_for(path, query);
        let scheme = to_ws_scheme(url.scheme());
        // http → ws and https → wss are both special-to-special, which `url` allows.
        let _ = url.set_scheme(scheme);
        url
    }
}

/// Translate an HTTP scheme to its WebSocket counterpart.
pub fn to_ws_scheme(scheme: &str) -> &'static str {
    match scheme {
        "https" | "wss" => "wss",
        _ => "ws",
    }
}
