// ABOUTME: Domain service layer for business logic kept out of route handlers
// ABOUTME: Dashboard aggregation, transactional email, password setup flows and staff user rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! Domain service layer
//!
//! Protocol-agnostic business logic. Route handlers translate HTTP into calls to
//! these functions and the database managers, and map results back to responses.

/// Dashboard statistics and chart widgets
pub mod dashboard;

/// Email composition and delivery
pub mod email;

/// Password setup, reset and token validation
pub mod password_setup;

/// Staff user creation and update rules
pub mod users;
