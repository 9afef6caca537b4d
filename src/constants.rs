// ABOUTME: System-wide constants and environment-driven defaults for CouponHub
// ABOUTME: Groups service identity, business limits, auth settings and env var lookups by domain
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! # Constants Module
//!
//! Application constants and environment-based configuration values.

/// Service identity used in logs and health responses
pub mod service_names {
    /// Service name reported by logging and health endpoints
    pub const COUPONHUB_API: &str = "couponhub-api";

    /// Server version from Cargo.toml
    pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Coupon and invoice business defaults
pub mod business {
    /// Services included in a coupon when the request does not say otherwise
    pub const DEFAULT_TOTAL_SERVICES: i64 = 5;

    /// Prefix of generated coupon codes
    pub const COUPON_CODE_PREFIX: &str = "CPN";

    /// Number of random characters after the coupon code prefix
    pub const COUPON_CODE_LENGTH: usize = 8;

    /// Prefix of generated invoice numbers
    pub const INVOICE_NUMBER_PREFIX: &str = "INV";

    /// Currency used when an invoice does not specify one
    pub const DEFAULT_CURRENCY: &str = "INR";

    /// Attempts at generating a unique coupon code before giving up
    pub const MAX_CODE_GENERATION_ATTEMPTS: usize = 5;
}

/// Dashboard reporting windows
pub mod dashboard {
    /// Months covered by trend widgets when the caller does not say
    pub const DEFAULT_MONTHS: u32 = 12;

    /// Months covered by the coupon usage report by default
    pub const DEFAULT_USAGE_MONTHS: u32 = 6;

    /// Largest reporting window accepted
    pub const MAX_MONTHS: u32 = 36;
}

/// Authentication and password settings
pub mod auth {
    /// Minimum accepted password length
    pub const MIN_PASSWORD_LENGTH: usize = 6;

    /// Lifetime of password setup / reset tokens in days
    pub const PASSWORD_TOKEN_EXPIRY_DAYS: i64 = 7;

    /// Random bytes in a password setup / reset token
    pub const PASSWORD_TOKEN_BYTES: usize = 32;

    /// Value of the `auth_provider` claim for tokens issued by this service
    pub const AUTH_PROVIDER_INTERNAL: &str = "internal";

    /// Development-only JWT secret; rejected in production
    pub const DEV_JWT_SECRET: &str = "couponhub-development-secret-change-me";
}

/// Default values for environment configuration
pub mod defaults {
    /// HTTP listen port
    pub const HTTP_PORT: u16 = 8080;
    /// HTTP bind address
    pub const HOST: &str = "0.0.0.0";
    /// Database location
    pub const DATABASE_URL: &str = "sqlite:./data/couponhub.db";
    /// JWT issuer claim
    pub const JWT_ISSUER: &str = "couponhub";
    /// JWT audience claim
    pub const JWT_AUDIENCE: &str = "couponhub_clients";
    /// JWT lifetime in minutes
    pub const JWT_EXPIRY_MINUTES: i64 = 60;
    /// SMTP relay host
    pub const SMTP_HOST: &str = "smtp.gmail.com";
    /// SMTP relay port (STARTTLS)
    pub const SMTP_PORT: u16 = 587;
    /// Sender address for outgoing mail
    pub const SMTP_FROM_EMAIL: &str = "noreply@couponhub.com";
    /// Sender display name for outgoing mail
    pub const SMTP_FROM_NAME: &str = "CouponHub Team";
    /// Frontend used to build links in emails
    pub const FRONTEND_BASE_URL: &str = "http://localhost:3000";
    /// Allowed CORS origins
    pub const CORS_ALLOWED_ORIGINS: &str = "*";
    /// Per-request timeout in seconds
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    /// Largest accepted request body
    pub const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;
    /// SMTP connection timeout in seconds
    pub const SMTP_TIMEOUT_SECS: u64 = 10;
    /// How long a connection waits for a competing writer to release the database
    pub const DATABASE_BUSY_TIMEOUT_SECS: u64 = 10;
}
