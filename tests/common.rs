// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides in-memory databases, a recording email sender, seeded entities and an HTTP test harness
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors
#![allow(
    dead_code,
    missing_docs,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `couponhub`

use std::sync::{Arc, Mutex, Once};

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use couponhub::{
    config::{DatabaseUrl, ServerConfig},
    database::{
        CreateCouponRequest, CreateCustomerRequest, CreateUserRequest, Database,
        ServiceCenterRequest,
    },
    errors::{AppError, AppResult},
    models::{Coupon, Customer, ServiceCenter, User},
    permissions::UserRole,
    resources::ServerResources,
    server::build_router,
    services::email::{EmailMessage, EmailSender, EmailService},
};
use serde_json::Value;
use tower::ServiceExt;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Standard test database setup
pub async fn create_test_database() -> Result<Database> {
    init_test_logging();
    Database::new(&DatabaseUrl::Memory).await
}

/// Email sender that keeps every message in memory
#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingEmailSender {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Token from the link in the most recent message to `to_email`
    pub fn last_token_for(&self, to_email: &str) -> Option<String> {
        let sent = self.sent();
        let message = sent.iter().rev().find(|m| m.to_email == to_email)?;
        let start = message.html_body.find("token=")? + "token=".len();
        Some(
            message.html_body[start..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect(),
        )
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        if self.fail {
            return Err(AppError::external_service("smtp", "connection refused"));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    fn is_configured(&self) -> bool {
        !self.fail
    }
}

/// Router plus the resources and mailbox behind it
pub struct TestApp {
    pub router: Router,
    pub resources: Arc<ServerResources>,
    pub emails: Arc<RecordingEmailSender>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_sender(Arc::new(RecordingEmailSender::default())).await
    }

    pub async fn with_sender(emails: Arc<RecordingEmailSender>) -> Result<Self> {
        let database = create_test_database().await?;
        let config = ServerConfig::default();
        let email = EmailService::new(emails.clone(), config.email.frontend_base_url.clone());
        let resources = Arc::new(ServerResources::with_email(database, config, email));
        Ok(Self {
            router: build_router(resources.clone()),
            resources,
            emails,
        })
    }

    pub fn database(&self) -> &Database {
        &self.resources.database
    }

    pub fn token_for(&self, user: &User) -> String {
        self.resources.auth_manager.generate_token(user).unwrap()
    }

    /// Send a request and decode the JSON body (`Value::Null` when empty)
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }
}

pub async fn create_service_center(database: &Database, name: &str) -> ServiceCenter {
    database
        .service_centers()
        .create(&ServiceCenterRequest {
            id: None,
            name: name.to_owned(),
            address: format!("{name} Road"),
            contact_number: "080-5550100".to_owned(),
        })
        .await
        .unwrap()
}

pub async fn create_customer(database: &Database, first_name: &str) -> Customer {
    database
        .customers()
        .create(&CreateCustomerRequest {
            first_name: first_name.to_owned(),
            last_name: "Rao".to_owned(),
            email: format!("{}@example.com", first_name.to_lowercase()),
            mobile_number: "9876543210".to_owned(),
        })
        .await
        .unwrap()
}

pub async fn create_staff(
    database: &Database,
    email: &str,
    role: UserRole,
    service_center_id: Option<i64>,
) -> User {
    database
        .users()
        .create(&CreateUserRequest {
            first_name: "Staff".to_owned(),
            last_name: "Member".to_owned(),
            email: email.to_owned(),
            mobile_number: "9000000000".to_owned(),
            role,
            service_center_id,
        })
        .await
        .unwrap()
}

pub async fn create_super_admin(database: &Database) -> User {
    create_staff(database, "root@couponhub.com", UserRole::SuperAdmin, None).await
}

pub async fn create_coupon(
    database: &Database,
    customer_id: i64,
    service_center_id: Option<i64>,
    total_services: i64,
) -> Coupon {
    database
        .coupons()
        .create(&CreateCouponRequest {
            customer_id,
            service_center_id,
            total_services: Some(total_services),
            expiry_date: Utc::now() + Duration::days(90),
            status: None,
        })
        .await
        .unwrap()
}

/// A user that exists only inside a token
pub fn customer_role_user() -> User {
    User {
        id: 999,
        first_name: "Walk".to_owned(),
        last_name: "In".to_owned(),
        email: "walkin@example.com".to_owned(),
        mobile_number: String::new(),
        role: UserRole::Customer,
        password_hash: None,
        service_center_id: None,
        service_center_name: None,
        created_at: Utc::now(),
        is_active: true,
    }
}
