// ABOUTME: Request ID middleware and HTTP request spans for correlation in structured logs
// ABOUTME: Reuses an incoming x-request-id or generates one, echoes it back and stamps it into error bodies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header::CONTENT_LENGTH, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{warn, Span};
use uuid::Uuid;

use crate::errors::{ErrorResponse, ErrorResponseDetails};

/// Header carrying the request id in both directions
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest client-supplied request id we accept
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request id stored in the request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a fresh id
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("req_{}", Uuid::new_v4().simple()))
    }

    /// The id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Attach a request id to every request and response
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(RequestId::generate, |s| RequestId(s.to_owned()));

    Span::current().record("request_id", request_id.as_str());
    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;
    attach_to_error_body(&mut response, &request_id);
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// Rewrite an application error body so it names the request id
fn attach_to_error_body(response: &mut Response, request_id: &RequestId) {
    let Some(details) = response.extensions_mut().remove::<ErrorResponseDetails>() else {
        return;
    };
    if details.request_id.is_some() {
        return;
    }

    let body = ErrorResponse {
        error: ErrorResponseDetails {
            request_id: Some(request_id.as_str().to_owned()),
            ..details
        },
    };
    match serde_json::to_vec(&body) {
        Ok(bytes) => {
            response.headers_mut().remove(CONTENT_LENGTH);
            *response.body_mut() = Body::from(bytes);
        }
        Err(e) => warn!(error = %e, "Failed to attach request id to error body"),
    }
}

/// Create a tracing span for an HTTP request
pub fn create_request_span(method: &str, path: &str) -> Span {
    tracing::info_span!(
        "http_request",
        method = %method,
        path = %path,
        request_id = tracing::field::Empty,
    )
}
