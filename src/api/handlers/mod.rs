//! API handlers for the verification service.

use axum::http::{header::USER_AGENT, HeaderMap};
use chrono::Utc;

use crate::biometric::RequestContext;

pub mod health;
pub mod login;
pub mod register;
pub mod types;
pub mod verify;

/// Extract a client IP from common proxy headers.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Ambient facts for one request: client IP, user agent, current time.
pub(crate) fn request_context(headers: &HeaderMap) -> RequestContext {
    let mut context = RequestContext::new(Utc::now());
    if let Some(ip) = extract_client_ip(headers) {
        context = context.with_client_ip(ip);
    }
    if let Some(user_agent) = headers.get(USER_AGENT).and_then(|value| value.to_str().ok()) {
        context = context.with_user_agent(user_agent);
    }
    context
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.7"));

        assert_eq!(extract_client_ip(&headers), Some("203.0.113.9".to_string()));
    }

    #[test]
    fn test_real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.7"));

        assert_eq!(extract_client_ip(&headers), Some("198.51.100.7".to_string()));
    }

    #[test]
    fn test_no_proxy_headers_yields_none() {
        assert_eq!(extract_client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn test_request_context_carries_user_agent() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0 (iPhone)"));

        let context = request_context(&headers);
        assert_eq!(context.user_agent.as_deref(), Some("Mozilla/5.0 (iPhone)"));
        assert_eq!(context.client_ip, None);
    }
}
