// ABOUTME: CORS middleware configuration for the HTTP API
// ABOUTME: Builds the tower-http CorsLayer from the configured origin list for the web frontend
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use http::{header::HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::ServerConfig;
use crate::middleware::request_id::REQUEST_ID_HEADER;

/// Configure CORS for the web frontend
///
/// `CORS_ALLOWED_ORIGINS` is either `*` (any origin) or a comma-separated list of
/// origins. An empty or unparseable list falls back to any origin.
///
/// ```bash
/// export CORS_ALLOWED_ORIGINS="https://app.couponhub.com,https://admin.couponhub.com"
/// ```
pub fn setup_cors(config: &ServerConfig) -> CorsLayer {
    let allow_origin = parse_origins(&config.cors.allowed_origins)
        .map_or_else(AllowOrigin::any, AllowOrigin::list);

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("authorization"),
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("accept"),
            HeaderName::from_static("origin"),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
}

/// Parse an explicit origin list; `None` means any origin
fn parse_origins(allowed: &str) -> Option<Vec<HeaderValue>> {
    if allowed.trim().is_empty() || allowed.trim() == "*" {
        return None;
    }
    let origins: Vec<HeaderValue> = allowed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| HeaderValue::from_str(s).ok())
        .collect();

    (!origins.is_empty()).then_some(origins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert!(parse_origins("*").is_none());
        assert!(parse_origins("  ").is_none());
        let origins = parse_origins("https://a.example, https://b.example,").unwrap();
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[1], "https://b.example");
    }
}
