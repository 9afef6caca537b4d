// ABOUTME: Main library entry point for the CouponHub API
// ABOUTME: Prepaid service coupons, redemptions, invoices and dashboards for multi-location service centers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

#![deny(unsafe_code)]

//! # CouponHub API
//!
//! Back-office API for service businesses that sell prepaid coupons. A coupon
//! bundles a fixed number of services for a customer; staff redeem those services at
//! a service center, issue invoices and watch sales and usage on a dashboard.
//!
//! ## Roles
//!
//! - **`SuperAdmin`** manages staff and service centers and sees every center.
//! - **Admin** works at one service center; dashboards and redemptions are pinned to it.
//!
//! ## Architecture
//!
//! - **Database**: `SQLite` through `sqlx`, one manager per table
//! - **Services**: email, password setup, staff users and dashboard aggregation
//! - **Routes**: one `axum` router per domain, merged in [`server::build_router`]
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use couponhub::config::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("CouponHub configured with port: HTTP={}", config.http_port);
//!     Ok(())
//! }
//! ```

/// JWT authentication and password hashing
pub mod auth;

/// Environment-driven configuration
pub mod config;

/// Application constants
pub mod constants;

/// `SQLite` persistence and entity managers
pub mod database;

/// Unified error handling
pub mod errors;

/// Logging configuration and structured audit events
pub mod logging;

/// HTTP middleware
pub mod middleware;

/// Core data models
pub mod models;

/// Roles and service center scoping
pub mod permissions;

/// Shared server resources
pub mod resources;

/// HTTP route handlers
pub mod routes;

/// Router assembly and server lifecycle
pub mod server;

/// Business services
pub mod services;
