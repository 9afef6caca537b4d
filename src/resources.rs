// ABOUTME: Shared server resources handed to every route handler
// ABOUTME: Bundles the database, JWT manager, email service and configuration behind one Arc
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use std::sync::Arc;

use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::database::Database;
use crate::services::email::EmailService;

/// Centralized resource container shared across handlers
#[derive(Clone)]
pub struct ServerResources {
    /// Database with all entity managers
    pub database: Arc<Database>,
    /// JWT issuance and validation
    pub auth_manager: Arc<AuthManager>,
    /// Transactional email
    pub email: EmailService,
    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl ServerResources {
    /// Build resources with the email sender chosen from configuration
    #[must_use]
    pub fn new(database: Database, config: ServerConfig) -> Self {
        let email = EmailService::from_config(&config.email);
        Self::with_email(database, config, email)
    }

    /// Build resources with an explicit email service
    #[must_use]
    pub fn with_email(database: Database, config: ServerConfig, email: EmailService) -> Self {
        Self {
            database: Arc::new(database),
            auth_manager: Arc::new(AuthManager::new(&config.auth)),
            email,
            config: Arc::new(config),
        }
    }
}
