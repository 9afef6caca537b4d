// ABOUTME: HTTP middleware for request correlation and cross-origin access
// ABOUTME: Provides request ID generation, request spans and the CORS layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

/// CORS configuration
pub mod cors;
/// Request id propagation and request spans
pub mod request_id;

pub use cors::setup_cors;
pub use request_id::{create_request_span, request_id_middleware, RequestId, REQUEST_ID_HEADER};
