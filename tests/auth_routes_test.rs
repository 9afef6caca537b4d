// ABOUTME: HTTP tests for login, staff invitation and the password setup and reset flows
// ABOUTME: Drives the full router with a recording email sender to capture emailed tokens
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use common::{create_service_center, create_super_admin, RecordingEmailSender, TestApp};
use couponhub::services::users::bootstrap_super_admin;
use serde_json::json;

#[tokio::test]
async fn test_health_endpoints_are_public() {
    let app = TestApp::new().await.unwrap();

    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.request(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");

    let (status, body) = app.request(Method::GET, "/api/health/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong");
}

#[tokio::test]
async fn test_login_with_bootstrapped_admin() {
    let app = TestApp::new().await.unwrap();
    let admin = bootstrap_super_admin(app.database(), "root@couponhub.com", "s3cret-pass")
        .await
        .unwrap()
        .unwrap();

    // A second bootstrap is a no-op once users exist
    assert!(bootstrap_super_admin(app.database(), "other@couponhub.com", "s3cret-pass")
        .await
        .unwrap()
        .is_none());

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "root@couponhub.com", "password": "s3cret-pass"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], admin.id);
    assert_eq!(body["user"]["role"], "SuperAdmin");
    assert!(body["user"].get("passwordHash").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, _) = app.get("/api/users", token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let app = TestApp::new().await.unwrap();
    bootstrap_super_admin(app.database(), "root@couponhub.com", "s3cret-pass")
        .await
        .unwrap();
    // Invited but never set a password
    create_super_admin_without_password(&app).await;

    for (email, password) in [
        ("root@couponhub.com", "wrong-pass"),
        ("nobody@couponhub.com", "s3cret-pass"),
        ("pending@couponhub.com", "anything"),
    ] {
        let (status, body) = app
            .post(
                "/api/auth/login",
                None,
                json!({"email": email, "password": password}),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{email}");
        assert_eq!(body["error"]["message"], "Invalid email or password");
    }
}

async fn create_super_admin_without_password(app: &TestApp) {
    common::create_staff(
        app.database(),
        "pending@couponhub.com",
        couponhub::permissions::UserRole::SuperAdmin,
        None,
    )
    .await;
}

#[tokio::test]
async fn test_invitation_flow_sets_password_once() {
    let app = TestApp::new().await.unwrap();
    let root = create_super_admin(app.database()).await;
    let center = create_service_center(app.database(), "Indiranagar").await;
    let token = app.token_for(&root);

    let (status, body) = app
        .post(
            "/api/users",
            Some(&token),
            json!({
                "firstName": "Meera",
                "lastName": "Iyer",
                "email": "meera@couponhub.com",
                "mobileNumber": "9000011111",
                "role": "Admin",
                "serviceCenterId": center.id
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["setupEmailSent"], true);
    assert_eq!(body["serviceCenterName"], "Indiranagar");

    let setup_token = app.emails.last_token_for("meera@couponhub.com").unwrap();

    let (status, body) = app
        .post(
            "/api/auth/validate-setup-token",
            None,
            json!({"token": setup_token}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isValid"], true);
    assert_eq!(body["user"]["email"], "meera@couponhub.com");

    let (status, _) = app
        .post(
            "/api/auth/set-password",
            None,
            json!({"token": setup_token, "password": "short"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/auth/set-password",
            None,
            json!({"token": setup_token, "password": "meera-pass"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password set successfully");
    assert!(app
        .emails
        .sent()
        .iter()
        .any(|m| m.to_email == "meera@couponhub.com" && m.subject == "Welcome to CouponHub!"));

    let (status, body) = app
        .post(
            "/api/auth/set-password",
            None,
            json!({"token": setup_token, "password": "another-pass"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid or expired token");

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "meera@couponhub.com", "password": "meera-pass"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["serviceCenterId"], center.id);
}

#[tokio::test]
async fn test_invalid_role_assignment_is_rejected() {
    let app = TestApp::new().await.unwrap();
    let root = create_super_admin(app.database()).await;
    let token = app.token_for(&root);

    let (status, _) = app
        .post(
            "/api/users",
            Some(&token),
            json!({
                "firstName": "Meera",
                "lastName": "Iyer",
                "email": "meera@couponhub.com",
                "mobileNumber": "9000011111",
                "role": "Admin"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_cannot_create_users() {
    let app = TestApp::new().await.unwrap();
    let center = create_service_center(app.database(), "Indiranagar").await;
    let admin = common::create_staff(
        app.database(),
        "desk@couponhub.com",
        couponhub::permissions::UserRole::Admin,
        Some(center.id),
    )
    .await;
    let token = app.token_for(&admin);

    let (status, _) = app
        .post(
            "/api/users",
            Some(&token),
            json!({
                "firstName": "X",
                "lastName": "Y",
                "email": "x@couponhub.com",
                "mobileNumber": "",
                "role": "SuperAdmin"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_forgot_password_does_not_reveal_unknown_email() {
    let app = TestApp::new().await.unwrap();
    create_super_admin(app.database()).await;

    let (status, body) = app
        .post(
            "/api/auth/forgot-password",
            None,
            json!({"email": "ghost@couponhub.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "If the email exists, a password reset link has been sent."
    );
    assert!(app.emails.sent().is_empty());

    let (status, body) = app
        .post(
            "/api/auth/forgot-password",
            None,
            json!({"email": "root@couponhub.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Password reset link has been sent to your email."
    );
    assert!(app.emails.last_token_for("root@couponhub.com").is_some());
}

#[tokio::test]
async fn test_forgot_password_reports_delivery_failure() {
    let app = TestApp::with_sender(Arc::new(RecordingEmailSender::failing()))
        .await
        .unwrap();
    create_super_admin(app.database()).await;

    let (status, body) = app
        .post(
            "/api/auth/forgot-password",
            None,
            json!({"email": "root@couponhub.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "EXTERNAL_SERVICE_ERROR");
}

#[tokio::test]
async fn test_user_created_even_when_invitation_fails() {
    let app = TestApp::with_sender(Arc::new(RecordingEmailSender::failing()))
        .await
        .unwrap();
    let root = create_super_admin(app.database()).await;
    let token = app.token_for(&root);

    let (status, body) = app
        .post(
            "/api/users",
            Some(&token),
            json!({
                "firstName": "Dev",
                "lastName": "Ops",
                "email": "dev@couponhub.com",
                "mobileNumber": "",
                "role": "SuperAdmin"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["setupEmailSent"], false);
}
