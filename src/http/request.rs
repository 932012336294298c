//! Request handling and transformation.
//!
//! # Responsibilities
//! - Decide which inbound headers reach the upstream (explicit allow-list)
//! - Turn the inbound body into the outbound body per route policy
//! - Prepare request for forwarding to backend
//!
//! # Design Decisions
//! - The header policy is data: an ordered list of (name, rule)
//! - Anything not on the list is dropped, including hop-by-hop headers
//! - Request ID is assigned by middleware before the proxy sees the request

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};

use crate::error::GatewayError;
use crate::routing::BodyPolicy;

/// Correlation identifier header.
pub const X_REQUEST_ID: &str = "x-request-id";
/// Tenant identifier header.
pub const X_TENANT_ID: &str = "x-tenant-id";

/// What happens to one allow-listed header.
#[derive(Debug, Clone)]
pub enum HeaderRule {
    /// Copy the inbound value, or send `default` when absent.
    CopyOrDefault(HeaderValue),
    /// Copy the inbound value when present.
    CopyIfPresent,
}

/// Ordered header allow-list applied to every proxied request.
#[derive(Debug, Clone)]
pub struct ForwardingPolicy {
    rules: Vec<(HeaderName, HeaderRule)>,
}

impl ForwardingPolicy {
    pub fn new(rules: Vec<(HeaderName, HeaderRule)>) -> Self {
        Self { rules }
    }

    /// The gateway's policy: content type (JSON by default), correlation id,
    /// authorization and tenant id.
    pub fn gateway() -> Self {
        Self::new(vec![
            (
                header::CONTENT_TYPE,
                HeaderRule::CopyOrDefault(HeaderValue::from_static("application/json")),
            ),
            (HeaderName::from_static(X_REQUEST_ID), HeaderRule::CopyIfPresent),
            (header::AUTHORIZATION, HeaderRule::CopyIfPresent),
            (HeaderName::from_static(X_TENANT_ID), HeaderRule::CopyIfPresent),
        ])
    }

    /// Build the outbound header map from `inbound`.
    pub fn forward_headers(&self, inbound: &HeaderMap) -> HeaderMap {
        let mut out = HeaderMap::with_capacity(self.rules.len());
        for (name, rule) in &self.rules {
            match (inbound.get(name), rule) {
                (Some(value), _) => {
                    out.insert(name.clone(), value.clone());
                }
                (None, HeaderRule::CopyOrDefault(default)) => {
                    out.insert(name.clone(), default.clone());
                }
                (None, HeaderRule::CopyIfPresent) => {}
            }
        }
        out
    }
}

impl Default for ForwardingPolicy {
    fn default() -> Self {
        Self::gateway()
    }
}

/// Outbound body for a request, or `None` when it carries no body.
pub fn forward_body(
    policy: BodyPolicy,
    method: &Method,
    inbound: &[u8],
    service: &str,
) -> Result<Option<Bytes>, GatewayError> {
    if !policy.carries_body(method) {
        return Ok(None);
    }

    if inbound.iter().all(u8::is_ascii_whitespace) {
        return Ok(Some(Bytes::from_static(b"{}")));
    }

    let value: serde_json::Value =
        serde_json::from_slice(inbound).map_err(|e| GatewayError::InvalidBody {
            service: service.to_string(),
            message: e.to_string(),
        })?;
    let encoded = serde_json::to_vec(&value).map_err(|e| GatewayError::InvalidBody {
        service: service.to_string(),
        message: e.to_string(),
    })?;
    Ok(Some(Bytes::from(encoded)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (k, v) in pairs {
            headers.insert(*k, HeaderValue::from_static(v));
        }
        headers
    }

    #[test]
    fn test_allow_list_drops_everything_else() {
        let headers = inbound(&[
            ("content-type", "application/json; charset=utf-8"),
            ("x-request-id", "req-1"),
            ("authorization", "Bearer t"),
            ("x-tenant-id", "tenant-9"),
            ("cookie", "session=1"),
            ("connection", "keep-alive"),
            ("x-forwarded-for", "10.0.0.1"),
        ]);

        let out = ForwardingPolicy::gateway().forward_headers(&headers);
        assert_eq!(out.len(), 4);
        assert_eq!(out["content-type"], "application/json; charset=utf-8");
        assert_eq!(out["x-request-id"], "req-1");
        assert_eq!(out["authorization"], "Bearer t");
        assert_eq!(out["x-tenant-id"], "tenant-9");
        assert!(out.get("cookie").is_none());
    }

    #[test]
    fn test_content_type_defaults_to_json() {
        let out = ForwardingPolicy::gateway().forward_headers(&HeaderMap::new());
        assert_eq!(out.len(), 1);
        assert_eq!(out["content-type"], "application/json");
    }

    #[test]
    fn test_get_and_head_carry_no_body() {
        for method in [Method::GET, Method::HEAD] {
            let body = forward_body(BodyPolicy::Json, &method, br#"{"a":1}"#, "rag-service").unwrap();
            assert!(body.is_none());
        }
    }

    #[test]
    fn test_empty_body_becomes_empty_object() {
        let body = forward_body(BodyPolicy::Json, &Method::POST, b"", "rag-service").unwrap();
        assert_eq!(body.as_deref(), Some(&b"{}"[..]));

        let body = forward_body(BodyPolicy::Json, &Method::DELETE, b"  \n", "rag-service").unwrap();
        assert_eq!(body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn test_json_body_is_reserialized() {
        let body = forward_body(
            BodyPolicy::Json,
            &Method::POST,
            b"{ \"q\" : \"hi\" }",
            "llm-router",
        )
        .unwrap()
        .unwrap();
        assert_eq!(&body[..], br#"{"q":"hi"}"#);
    }

    #[test]
    fn test_json_body_keeps_key_order() {
        let inbound = br#"{"zeta":1,"alpha":2,"mid":{"b":1,"a":2}}"#;
        let body = forward_body(BodyPolicy::Json, &Method::POST, inbound, "agent-runtime")
            .unwrap()
            .unwrap();
        assert_eq!(&body[..], &inbound[..]);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let err = forward_body(BodyPolicy::Json, &Method::PUT, b"q=hi", "llm-router").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidBody { ref service, .. } if service == "llm-router"));
    }

    #[test]
    fn test_empty_policy_never_forwards() {
        let body = forward_body(BodyPolicy::Empty, &Method::POST, br#"{"a":1}"#, "x").unwrap();
        assert!(body.is_none());
    }
}
