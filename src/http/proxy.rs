//! HTTP proxy router.
//!
//! # Responsibilities
//! - Match the request to a logical service (prefix table or fixed path)
//! - Resolve the service through the registry and build the upstream URL
//! - Forward once under the route's deadline
//! - Normalize every upstream failure into the error envelope
//!
//! # Data Flow
//! ```text
//! Request ─▶ RouteTable ─▶ Registry ─▶ ForwardingPolicy ─▶ with_deadline(client.request)
//!                 │                                              │
//!                 └─ no match: 404, no upstream call             ├─ Ok:  UpstreamResponse + gateway headers
//!                                                                └─ Err: ProxyFailure (502 envelope)
//! ```

use std::error::Error as StdError;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::error::GatewayError;
use crate::http::request::{forward_body, ForwardingPolicy, X_REQUEST_ID};
use crate::http::response::{ProxyFailure, UpstreamResponse};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::with_deadline;
use crate::routing::{BodyPolicy, Deadline};

/// Where and how one request is forwarded.
#[derive(Debug, Clone)]
pub struct ForwardTarget {
    pub service: String,
    pub url: Url,
    pub deadline: Deadline,
    pub body: BodyPolicy,
}

/// Sends requests upstream. One attempt per call, no retries.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    policy: ForwardingPolicy,
    max_response_size: usize,
}

impl Forwarder {
    pub fn new(policy: ForwardingPolicy, max_response_size: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            policy,
            max_response_size,
        }
    }

    /// Forward the request and buffer the upstream response, all within the
    /// target's deadline. Responses over `max_response_size` fail.
    pub async fn forward(
        &self,
        target: &ForwardTarget,
        method: Method,
        inbound_headers: &HeaderMap,
        inbound_body: &[u8],
    ) -> Result<UpstreamResponse, GatewayError> {
        let service = target.service.as_str();
        let body = forward_body(target.body, &method, inbound_body, service)?;

        let mut builder = Request::builder().method(method).uri(target.url.as_str());
        if let Some(headers) = builder.headers_mut() {
            *headers = self.policy.forward_headers(inbound_headers);
        }
        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .map_err(|e| GatewayError::InvalidUpstreamRequest {
                service: service.to_string(),
                message: e.to_string(),
            })?;

        let call = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| classify(service, &e))?;
            let (parts, body) = response.into_parts();
            let bytes = Limited::new(body, self.max_response_size)
                .collect()
                .await
                .map_err(|e| {
                    if e.is::<LengthLimitError>() {
                        GatewayError::UpstreamTooLarge {
                            service: service.to_string(),
                            limit: self.max_response_size,
                        }
                    } else {
                        classify(service, &*e)
                    }
                })?
                .to_bytes();
            Ok::<_, GatewayError>(UpstreamResponse {
                status: parts.status,
                content_type: parts.headers.get(header::CONTENT_TYPE).cloned(),
                body: bytes,
            })
        };

        with_deadline(target.deadline.duration, call)
            .await
            .map_err(|exceeded| GatewayError::UpstreamTimeout {
                service: service.to_string(),
                deadline: exceeded.0,
            })?
    }
}

/// Sort a transport error into connection or protocol failure.
fn classify(service: &str, err: &(dyn StdError + 'static)) -> GatewayError {
    let mut cause: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = cause {
        if let Some(hyper_err) = e.downcast_ref::<hyper::Error>() {
            if hyper_err.is_parse() {
                return GatewayError::UpstreamProtocol {
                    service: service.to_string(),
                    message: describe(err),
                };
            }
        }
        cause = e.source();
    }
    GatewayError::UpstreamConnection {
        service: service.to_string(),
        message: describe(err),
    }
}

/// Display an error with its source chain, `outer: inner: root`.
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(e) = cause {
        let text = e.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        cause = e.source();
    }
    message
}

/// Catch-all handler: `/<prefix>/<rest>` → `<service>/api/v1/<rest>`.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();

    let Some(matched) = state.routes.match_path(&path) else {
        tracing::debug!(path = %path, "No route matched");
        metrics::record_request("none", StatusCode::NOT_FOUND.as_u16(), None);
        return StatusCode::NOT_FOUND.into_response();
    };

    let service = matched.route.service.clone();
    let endpoint = match state.registry.resolve(&service) {
        Ok(endpoint) => endpoint,
        Err(e) => return fail(&request, &path, service, e.into()),
    };

    let target = ForwardTarget {
        url: endpoint.api_url(matched.rest, request.uri().query()),
        service,
        deadline: matched.deadline,
        body: matched.route.body,
    };
    forward_request(&state, target, &path, request).await
}

/// Handler for fixed single-purpose paths.
pub async fn fixed_route_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();

    let Some(route) = state.routes.fixed(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let endpoint = match state.registry.resolve(&route.service) {
        Ok(endpoint) => endpoint,
        Err(e) => return fail(&request, &path, route.service.clone(), e.into()),
    };

    let target = ForwardTarget {
        url: endpoint.url_for(&route.upstream_path, request.uri().query()),
        service: route.service.clone(),
        deadline: route.deadline,
        body: route.body,
    };
    forward_request(&state, target, &path, request).await
}

async fn forward_request(
    state: &AppState,
    target: ForwardTarget,
    path: &str,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers);

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "Failed to read request body");
            let error = GatewayError::PayloadTooLarge {
                service: target.service.clone(),
                limit: state.max_body_size,
            };
            metrics::record_request(&target.service, error.status().as_u16(), None);
            return ProxyFailure {
                service: target.service,
                error,
            }
            .into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        path = %path,
        service = %target.service,
        upstream = %target.url,
        tier = target.deadline.tier.as_str(),
        "Proxying request"
    );

    let start = Instant::now();
    let outcome = state
        .forwarder
        .forward(&target, parts.method.clone(), &parts.headers, &body)
        .await;
    let latency = start.elapsed();

    match outcome {
        Ok(upstream) => {
            tracing::info!(
                request_id = %request_id,
                method = %parts.method,
                path = %path,
                service = %target.service,
                status = upstream.status.as_u16(),
                latency_ms = latency.as_millis() as u64,
                "Proxied request"
            );
            metrics::record_request(&target.service, upstream.status.as_u16(), Some(latency));
            upstream.into_client_response(&target.service, latency)
        }
        Err(error) => {
            tracing::warn!(
                request_id = %request_id,
                method = %parts.method,
                path = %path,
                service = %target.service,
                kind = error.kind(),
                error = %error,
                latency_ms = latency.as_millis() as u64,
                "Upstream request failed"
            );
            metrics::record_request(&target.service, error.status().as_u16(), Some(latency));
            ProxyFailure {
                service: target.service,
                error,
            }
            .into_response()
        }
    }
}

fn fail(
    request: &Request<Body>,
    path: &str,
    service: String,
    error: GatewayError,
) -> Response {
    tracing::warn!(
        request_id = %request_id(request.headers()),
        method = %request.method(),
        path = %path,
        service = %service,
        kind = error.kind(),
        error = %error,
        "Request failed before forwarding"
    );
    metrics::record_request(&service, error.status().as_u16(), None);
    ProxyFailure { service, error }.into_response()
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "client error (Connect)")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_io_errors_are_connection_failures() {
        let err = Outer(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        match classify("llm-router", &err) {
            GatewayError::UpstreamConnection { service, message } => {
                assert_eq!(service, "llm-router");
                assert_eq!(message, "client error (Connect): connection refused");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_reported() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let forwarder = Forwarder::new(ForwardingPolicy::gateway(), 1024);
        let target = ForwardTarget {
            service: "rag-service".into(),
            url: Url::parse(&format!("http://127.0.0.1:{}/api/v1/retrieve", port)).unwrap(),
            deadline: Deadline::resolve(
                crate::resilience::TimeoutTier::Default,
                &crate::config::TimeoutConfig::default(),
            ),
            body: BodyPolicy::Json,
        };

        let err = forwarder
            .forward(&target, Method::POST, &HeaderMap::new(), b"{}")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UpstreamConnection { .. }), "{err:?}");
    }
}
