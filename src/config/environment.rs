// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses ports, database url, JWT, SMTP and CORS settings from environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! Environment-based configuration management for production deployment

use crate::constants::{auth, defaults};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Strongly typed log level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    #[default]
    Info,
    /// Debug output
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// `SQLite` database with file path
    SQLite {
        /// Path of the database file
        path: PathBuf,
    },
    /// In-memory `SQLite` (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from a `sqlite:` url or a bare file path
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        let path_str = s.strip_prefix("sqlite://").or_else(|| s.strip_prefix("sqlite:")).unwrap_or(s);
        if path_str == ":memory:" {
            Self::Memory
        } else {
            Self::SQLite {
                path: PathBuf::from(path_str),
            }
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::parse_url(defaults::DATABASE_URL)
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

/// JWT issuance settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: String,
    /// `iss` claim
    pub jwt_issuer: String,
    /// `aud` claim
    pub jwt_audience: String,
    /// Token lifetime in minutes
    pub jwt_expiry_minutes: i64,
}

/// Outgoing email settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host
    pub smtp_host: String,
    /// SMTP relay port
    pub smtp_port: u16,
    /// SMTP username; email is disabled when unset
    pub smtp_username: Option<String>,
    /// SMTP password; email is disabled when unset
    #[serde(skip_serializing)]
    pub smtp_password: Option<String>,
    /// Sender address
    pub from_email: String,
    /// Sender display name
    pub from_name: String,
    /// Base url of the web frontend used in email links
    pub frontend_base_url: String,
}

impl EmailConfig {
    /// Whether SMTP credentials are present
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.smtp_username.as_deref().is_some_and(|u| !u.is_empty())
            && self.smtp_password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// CORS settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated origins or `*`
    pub allowed_origins: String,
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// HTTP API port
    pub http_port: u16,
    /// Log level
    pub log_level: LogLevel,
    /// Deployment environment
    pub environment: Environment,
    /// Database location
    pub database_url: DatabaseUrl,
    /// JWT settings
    pub auth: AuthConfig,
    /// SMTP and email link settings
    pub email: EmailConfig,
    /// CORS settings
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::HOST.to_owned(),
            http_port: defaults::HTTP_PORT,
            log_level: LogLevel::Info,
            environment: Environment::Development,
            database_url: DatabaseUrl::default(),
            auth: AuthConfig {
                jwt_secret: auth::DEV_JWT_SECRET.to_owned(),
                jwt_issuer: defaults::JWT_ISSUER.to_owned(),
                jwt_audience: defaults::JWT_AUDIENCE.to_owned(),
                jwt_expiry_minutes: defaults::JWT_EXPIRY_MINUTES,
            },
            email: EmailConfig {
                smtp_host: defaults::SMTP_HOST.to_owned(),
                smtp_port: defaults::SMTP_PORT,
                smtp_username: None,
                smtp_password: None,
                from_email: defaults::SMTP_FROM_EMAIL.to_owned(),
                from_name: defaults::SMTP_FROM_NAME.to_owned(),
                frontend_base_url: defaults::FRONTEND_BASE_URL.to_owned(),
            },
            cors: CorsConfig {
                allowed_origins: defaults::CORS_ALLOWED_ORIGINS.to_owned(),
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed or the configuration
    /// fails validation
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let environment = Environment::from_str_or_default(&env_var_or("ENVIRONMENT", "development"));

        let jwt_secret = if let Ok(secret) = env::var("JWT_SECRET") {
            secret
        } else {
            warn!("JWT_SECRET not set, using the development secret");
            auth::DEV_JWT_SECRET.to_owned()
        };

        let config = Self {
            host: env_var_or("HOST", defaults::HOST),
            http_port: env_var_or("HTTP_PORT", &defaults::HTTP_PORT.to_string())
                .parse()
                .context("Invalid HTTP_PORT value")?,
            log_level: LogLevel::from_str_or_default(&env_var_or("RUST_LOG", "info")),
            environment,
            database_url: DatabaseUrl::parse_url(&env_var_or(
                "DATABASE_URL",
                defaults::DATABASE_URL,
            )),
            auth: AuthConfig {
                jwt_secret,
                jwt_issuer: env_var_or("JWT_ISSUER", defaults::JWT_ISSUER),
                jwt_audience: env_var_or("JWT_AUDIENCE", defaults::JWT_AUDIENCE),
                jwt_expiry_minutes: env_var_or(
                    "JWT_EXPIRY_MINUTES",
                    &defaults::JWT_EXPIRY_MINUTES.to_string(),
                )
                .parse()
                .context("Invalid JWT_EXPIRY_MINUTES value")?,
            },
            email: EmailConfig {
                smtp_host: env_var_or("SMTP_HOST", defaults::SMTP_HOST),
                smtp_port: env_var_or("SMTP_PORT", &defaults::SMTP_PORT.to_string())
                    .parse()
                    .context("Invalid SMTP_PORT value")?,
                smtp_username: env::var("SMTP_USERNAME").ok(),
                smtp_password: env::var("SMTP_PASSWORD").ok(),
                from_email: env_var_or("SMTP_FROM_EMAIL", defaults::SMTP_FROM_EMAIL),
                from_name: env_var_or("SMTP_FROM_NAME", defaults::SMTP_FROM_NAME),
                frontend_base_url: env_var_or("FRONTEND_BASE_URL", defaults::FRONTEND_BASE_URL)
                    .trim_end_matches('/')
                    .to_owned(),
            },
            cors: CorsConfig {
                allowed_origins: env_var_or("CORS_ALLOWED_ORIGINS", defaults::CORS_ALLOWED_ORIGINS),
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error when production runs with the development JWT secret or the
    /// token lifetime is not positive
    pub fn validate(&self) -> Result<()> {
        if self.environment.is_production() && self.auth.jwt_secret == auth::DEV_JWT_SECRET {
            return Err(anyhow!("JWT_SECRET must be set in production"));
        }

        if self.auth.jwt_expiry_minutes <= 0 {
            return Err(anyhow!("JWT_EXPIRY_MINUTES must be positive"));
        }

        if !self.email.has_credentials() {
            warn!("SMTP credentials not configured, outgoing email is disabled");
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "CouponHub API Configuration:\n\
             - Bind: {}:{}\n\
             - Environment: {}\n\
             - Log Level: {}\n\
             - Database: {}\n\
             - JWT Issuer: {} (expiry {} min)\n\
             - Email: {}\n\
             - Frontend: {}\n\
             - CORS Origins: {}",
            self.host,
            self.http_port,
            self.environment,
            self.log_level,
            self.database_url,
            self.auth.jwt_issuer,
            self.auth.jwt_expiry_minutes,
            if self.email.has_credentials() {
                format!("Enabled via {}:{}", self.email.smtp_host, self.email.smtp_port)
            } else {
                "Disabled".to_owned()
            },
            self.email.frontend_base_url,
            self.cors.allowed_origins,
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str_or_default("error"), LogLevel::Error);
        assert_eq!(LogLevel::from_str_or_default("WARN"), LogLevel::Warn);
        assert_eq!(LogLevel::from_str_or_default("Debug"), LogLevel::Debug);
        assert_eq!(LogLevel::from_str_or_default("invalid"), LogLevel::Info);
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from_str_or_default("PROD"),
            Environment::Production
        );
        assert_eq!(Environment::from_str_or_default("test"), Environment::Testing);
        assert_eq!(
            Environment::from_str_or_default("staging"),
            Environment::Development
        );
    }

    #[test]
    fn test_database_url_parsing() {
        assert!(DatabaseUrl::parse_url("sqlite::memory:").is_memory());
        assert_eq!(
            DatabaseUrl::parse_url("sqlite:./data/hub.db").to_connection_string(),
            "sqlite:./data/hub.db"
        );
        assert_eq!(
            DatabaseUrl::parse_url("/var/lib/hub.db"),
            DatabaseUrl::SQLite {
                path: PathBuf::from("/var/lib/hub.db")
            }
        );
    }

    #[test]
    fn test_production_rejects_development_secret() {
        let config = ServerConfig {
            environment: Environment::Production,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            environment: Environment::Production,
            auth: AuthConfig {
                jwt_secret: "a-real-secret".to_owned(),
                ..ServerConfig::default().auth
            },
            ..ServerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_summary_hides_secrets() {
        let mut config = ServerConfig::default();
        config.email.smtp_username = Some("mailer".to_owned());
        config.email.smtp_password = Some("hunter2".to_owned());

        let summary = config.summary();
        assert!(summary.contains("Enabled via smtp.gmail.com:587"));
        assert!(!summary.contains("hunter2"));
        assert!(!summary.contains(&config.auth.jwt_secret));
    }
}
