// ABOUTME: HTTP tests for customers, coupons, redemptions and invoices
// ABOUTME: Checks authentication, response shapes, not-found messages and service center scoping on redeem
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]

mod common;

use axum::http::{Method, StatusCode};
use common::{
    create_coupon, create_customer, create_service_center, create_staff, create_super_admin,
    customer_role_user, TestApp,
};
use couponhub::permissions::UserRole;
use serde_json::json;

#[tokio::test]
async fn test_management_routes_require_a_token() {
    let app = TestApp::new().await.unwrap();

    let (status, body) = app.request(Method::GET, "/api/customers", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_REQUIRED");

    let (status, _) = app.get("/api/coupons", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.token_for(&customer_role_user());
    let (status, _) = app.get("/api/coupons", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_customer_crud_over_http() {
    let app = TestApp::new().await.unwrap();
    let root = create_super_admin(app.database()).await;
    let token = app.token_for(&root);

    let (status, created) = app
        .post(
            "/api/customers",
            Some(&token),
            json!({
                "firstName": "Asha",
                "lastName": "Rao",
                "email": "asha@example.com",
                "mobileNumber": "9876543210"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["isActive"], true);

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/customers/{id}"),
            Some(&token),
            Some(json!({"id": id + 1, "firstName": "Asha"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "ID mismatch");

    let (status, body) = app.get("/api/customers/mobile/9876543210", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/customers/{id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, listed) = app.get("/api/customers", &token).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);

    let (status, body) = app.get("/api/customers/4242", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Customer with ID 4242 not found");
}

#[tokio::test]
async fn test_coupon_response_carries_derived_fields() {
    let app = TestApp::new().await.unwrap();
    let root = create_super_admin(app.database()).await;
    let customer = create_customer(app.database(), "Asha").await;
    let token = app.token_for(&root);

    let (status, coupon) = app
        .post(
            "/api/coupons",
            Some(&token),
            json!({
                "customerId": customer.id,
                "totalServices": 4,
                "expiryDate": "2099-01-01T00:00:00Z"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let code = coupon["couponCode"].as_str().unwrap();
    assert!(code.starts_with("CPN-"));
    assert_eq!(code.len(), 12);
    assert_eq!(coupon["status"], "Active");
    assert_eq!(coupon["remainingServices"], 4);
    assert_eq!(coupon["isValid"], true);
    assert_eq!(coupon["customerName"], "Asha Rao");

    let (status, by_code) = app.get(&format!("/api/coupons/code/{code}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_code["id"], coupon["id"]);

    let (status, body) = app.get("/api/coupons/code/CPN-NOPE0000", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["error"]["message"],
        "Coupon with code CPN-NOPE0000 not found"
    );

    let (_, active) = app.get("/api/coupons/active", &token).await;
    assert_eq!(active.as_array().unwrap().len(), 1);
    let (_, unassigned) = app.get("/api/coupons/unassigned", &token).await;
    assert!(unassigned.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_redeems_at_own_center() {
    let app = TestApp::new().await.unwrap();
    let home = create_service_center(app.database(), "Indiranagar").await;
    let other = create_service_center(app.database(), "Koramangala").await;
    let admin = create_staff(
        app.database(),
        "desk@couponhub.com",
        UserRole::Admin,
        Some(home.id),
    )
    .await;
    let customer = create_customer(app.database(), "Asha").await;
    let coupon = create_coupon(app.database(), customer.id, Some(home.id), 1).await;
    let token = app.token_for(&admin);

    // The requested center is ignored for Admins
    let (status, body) = app
        .post(
            "/api/coupons/redeem",
            Some(&token),
            json!({"couponId": coupon.id, "serviceCenterId": other.id, "notes": "Wash"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Coupon redeemed successfully");
    assert_eq!(body["remainingServices"], 0);
    assert_eq!(body["status"], "Completed");

    let (_, redemptions) = app
        .get(
            &format!("/api/serviceredemptions/coupon/{}", coupon.id),
            &token,
        )
        .await;
    let redemptions = redemptions.as_array().unwrap();
    assert_eq!(redemptions.len(), 1);
    assert_eq!(redemptions[0]["serviceCenterId"], home.id);
    assert_eq!(redemptions[0]["notes"], "Wash");

    let (status, body) = app
        .get(&format!("/api/coupons/{}/validate", coupon.id), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isValid"], false);

    let (status, _) = app
        .post(
            "/api/coupons/redeem",
            Some(&token),
            json!({"couponId": coupon.id}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_super_admin_must_name_a_center_to_redeem() {
    let app = TestApp::new().await.unwrap();
    let root = create_super_admin(app.database()).await;
    let center = create_service_center(app.database(), "Indiranagar").await;
    let asha = create_customer(app.database(), "Asha").await;
    let ravi = create_customer(app.database(), "Ravi").await;
    let coupon = create_coupon(app.database(), asha.id, Some(center.id), 3).await;
    let token = app.token_for(&root);

    let (status, body) = app
        .post(
            "/api/coupons/redeem",
            Some(&token),
            json!({"couponId": coupon.id}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "serviceCenterId is required");

    let (status, _) = app
        .post(
            "/api/coupons/redeem",
            Some(&token),
            json!({"couponId": coupon.id, "serviceCenterId": center.id, "customerId": ravi.id}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/coupons/redeem",
            Some(&token),
            json!({"couponId": coupon.id, "serviceCenterId": center.id}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["usedServices"], 1);
}

#[tokio::test]
async fn test_invoice_money_is_serialized_as_strings() {
    let app = TestApp::new().await.unwrap();
    let root = create_super_admin(app.database()).await;
    let center = create_service_center(app.database(), "Indiranagar").await;
    let customer = create_customer(app.database(), "Asha").await;
    let token = app.token_for(&root);

    let (status, invoice) = app
        .post(
            "/api/invoices",
            Some(&token),
            json!({
                "customerId": customer.id,
                "serviceCenterId": center.id,
                "subTotal": 1000,
                "taxAmount": "180.5",
                "totalAmount": "1180.50",
                "paymentMethod": "card",
                "paymentStatus": "Paid"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(invoice["totalAmount"], "1180.50");
    assert_eq!(invoice["taxAmount"], "180.50");
    assert_eq!(invoice["currency"], "INR");
    assert!(invoice["paidAt"].is_string());

    let number = invoice["invoiceNumber"].as_str().unwrap();
    let (status, by_number) = app
        .get(&format!("/api/invoices/number/{number}"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_number["id"], invoice["id"]);

    let id = invoice["id"].as_i64().unwrap();
    let (status, _) = app
        .request(Method::DELETE, &format!("/api/invoices/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get(&format!("/api/invoices/{id}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], format!("Invoice with ID {id} not found"));
}

#[tokio::test]
async fn test_service_center_mutations_need_super_admin() {
    let app = TestApp::new().await.unwrap();
    let center = create_service_center(app.database(), "Indiranagar").await;
    let admin = create_staff(
        app.database(),
        "desk@couponhub.com",
        UserRole::Admin,
        Some(center.id),
    )
    .await;
    let token = app.token_for(&admin);

    let (status, listed) = app.get("/api/servicecenters", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = app
        .post(
            "/api/servicecenters",
            Some(&token),
            json!({"name": "Whitefield", "address": "", "contactNumber": ""}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_responses_echo_request_id() {
    let app = TestApp::new().await.unwrap();
    let request = axum::http::Request::builder()
        .uri("/health")
        .header("x-request-id", "req_from_client")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req_from_client"
    );
}

#[tokio::test]
async fn test_updates_reject_a_body_id_for_another_record() {
    let app = TestApp::new().await.unwrap();
    let root = create_super_admin(app.database()).await;
    let center = create_service_center(app.database(), "Indiranagar").await;
    let customer = create_customer(app.database(), "Asha").await;
    let coupon = create_coupon(app.database(), customer.id, Some(center.id), 4).await;
    let token = app.token_for(&root);

    let coupon_body = |id: i64| {
        json!({
            "id": id,
            "customerId": customer.id,
            "serviceCenterId": center.id,
            "totalServices": 6,
            "expiryDate": "2099-01-01T00:00:00Z",
            "status": "Active"
        })
    };
    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/coupons/{}", coupon.id),
            Some(&token),
            Some(coupon_body(coupon.id + 1)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "ID mismatch");

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/coupons/{}", coupon.id),
            Some(&token),
            Some(coupon_body(coupon.id)),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalServices"], 6);

    let center_uri = format!("/api/servicecenters/{}", center.id);
    let mismatched = [
        (
            "/api/invoices/1",
            json!({
                "id": 2,
                "customerId": customer.id,
                "serviceCenterId": center.id,
                "paymentStatus": "Unpaid"
            }),
        ),
        (
            center_uri.as_str(),
            json!({"id": center.id + 1, "name": "Indiranagar"}),
        ),
        (
            "/api/serviceredemptions/1",
            json!({
                "id": 2,
                "couponId": coupon.id,
                "serviceCenterId": center.id,
                "customerId": customer.id
            }),
        ),
    ];
    for (uri, payload) in mismatched {
        let (status, body) = app
            .request(Method::PUT, uri, Some(&token), Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"]["message"], "ID mismatch", "{uri}");
    }
}

#[tokio::test]
async fn test_error_bodies_carry_request_id() {
    let app = TestApp::new().await.unwrap();
    let root = create_super_admin(app.database()).await;
    let token = app.token_for(&root);
    let request = axum::http::Request::builder()
        .uri("/api/coupons/4242")
        .header("x-request-id", "req_from_client")
        .header("authorization", format!("Bearer {token}"))
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["request_id"], "req_from_client");
    assert_eq!(body["error"]["message"], "Coupon with ID 4242 not found");

    // Generated ids are used when the client sends none
    let (status, body) = app.get("/api/coupons/4242", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]["request_id"]
        .as_str()
        .unwrap()
        .starts_with("req_"));
}
