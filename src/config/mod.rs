// ABOUTME: Configuration module for centralized server settings
// ABOUTME: Re-exports the environment-driven server configuration types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! Configuration module for the CouponHub API

/// Environment and server configuration
pub mod environment;

pub use environment::{
    AuthConfig, CorsConfig, DatabaseUrl, EmailConfig, Environment, LogLevel, ServerConfig,
};
