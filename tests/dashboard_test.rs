// ABOUTME: HTTP tests for dashboard statistics and widgets
// ABOUTME: Verifies service center scoping per role, revenue rules and widget shapes on seeded data
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]

mod common;

use axum::http::StatusCode;
use common::{
    create_coupon, create_customer, create_service_center, create_staff, create_super_admin,
    customer_role_user, TestApp,
};
use couponhub::{
    database::CreateInvoiceRequest,
    models::{PaymentStatus, ServiceCenter},
    permissions::UserRole,
};
use rust_decimal::Decimal;

struct Seeded {
    north: ServiceCenter,
    south: ServiceCenter,
}

/// North: one paid and one unpaid invoice, two redemptions.
/// South: one paid invoice, one redemption.
async fn seed(app: &TestApp) -> Seeded {
    let db = app.database();
    let north = create_service_center(db, "North").await;
    let south = create_service_center(db, "South").await;
    let customer = create_customer(db, "Asha").await;

    let north_coupon = create_coupon(db, customer.id, Some(north.id), 5).await;
    let south_coupon = create_coupon(db, customer.id, Some(south.id), 5).await;

    for (center, amount, status) in [
        (north.id, 1000, PaymentStatus::Paid),
        (north.id, 700, PaymentStatus::Unpaid),
        (south.id, 400, PaymentStatus::Paid),
    ] {
        db.invoices()
            .create(&CreateInvoiceRequest {
                customer_id: customer.id,
                service_center_id: center,
                coupon_id: None,
                sub_total: Decimal::from(amount),
                tax_amount: Decimal::ZERO,
                discount_amount: Decimal::ZERO,
                total_amount: Decimal::from(amount),
                currency: "INR".to_owned(),
                payment_method: "cash".to_owned(),
                payment_status: status,
                notes: String::new(),
            })
            .await
            .unwrap();
    }

    db.coupons()
        .redeem(north_coupon.id, north.id, customer.id, "")
        .await
        .unwrap();
    db.coupons()
        .redeem(north_coupon.id, north.id, customer.id, "")
        .await
        .unwrap();
    db.coupons()
        .redeem(south_coupon.id, south.id, customer.id, "")
        .await
        .unwrap();

    Seeded { north, south }
}

#[tokio::test]
async fn test_super_admin_sees_all_centers() {
    let app = TestApp::new().await.unwrap();
    let seeded = seed(&app).await;
    let root = create_super_admin(app.database()).await;
    let token = app.token_for(&root);

    let (status, stats) = app.get("/api/dashboard/stats", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalCouponsSold"], 2);
    assert_eq!(stats["couponsSoldThisMonth"], 3);
    assert_eq!(stats["servicesCompleted"], 3);
    assert_eq!(stats["servicesCompletedThisMonth"], 3);
    assert_eq!(stats["totalRevenue"], "1400.00");
    assert_eq!(stats["revenueThisMonth"], "1400.00");

    let (_, stats) = app
        .get(
            &format!("/api/dashboard/stats?serviceCenterId={}", seeded.south.id),
            &token,
        )
        .await;
    assert_eq!(stats["servicesCompleted"], 1);
    assert_eq!(stats["totalRevenue"], "400.00");
}

#[tokio::test]
async fn test_admin_is_pinned_to_own_center() {
    let app = TestApp::new().await.unwrap();
    let seeded = seed(&app).await;
    let admin = create_staff(
        app.database(),
        "north@couponhub.com",
        UserRole::Admin,
        Some(seeded.north.id),
    )
    .await;
    let token = app.token_for(&admin);

    // Asking for another center still returns the Admin's own figures
    let (status, stats) = app
        .get(
            &format!("/api/dashboard/stats?serviceCenterId={}", seeded.south.id),
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["servicesCompleted"], 2);
    assert_eq!(stats["couponsSoldThisMonth"], 2);
    assert_eq!(stats["totalRevenue"], "1000.00");
}

#[tokio::test]
async fn test_roles_without_scope_are_forbidden() {
    let app = TestApp::new().await.unwrap();

    let customer_token = app.token_for(&customer_role_user());
    let (status, _) = app.get("/api/dashboard/stats", &customer_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut orphan = customer_role_user();
    orphan.role = UserRole::Admin;
    let orphan_token = app.token_for(&orphan);
    let (status, body) = app.get("/api/dashboard/widgets", &orphan_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"]["message"],
        "Admin user must have a service center assigned"
    );
}

#[tokio::test]
async fn test_widgets_shape_and_month_clamping() {
    let app = TestApp::new().await.unwrap();
    let seeded = seed(&app).await;
    let root = create_super_admin(app.database()).await;
    let token = app.token_for(&root);

    let (status, widgets) = app.get("/api/dashboard/widgets?months=3", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(widgets["salesTrends"]["title"], "Sales Trends");
    assert_eq!(widgets["salesTrends"]["footer"], "Last 3 months");
    let trends = widgets["salesTrends"]["data"].as_array().unwrap();
    assert_eq!(trends.len(), 3);
    // Chronological: the current month comes last
    assert_eq!(trends[2]["couponsSold"], 3);
    assert_eq!(trends[2]["revenue"], "1400.00");

    let distribution = widgets["serviceCenterDistribution"]["data"]
        .as_array()
        .unwrap();
    assert_eq!(distribution.len(), 3);
    assert!(distribution.iter().all(|d| d["serviceCenterId"] == 0));
    assert_eq!(distribution[2]["servicesCompleted"], 3);

    let usage = widgets["couponUsage"]["data"].as_array().unwrap();
    assert_eq!(usage[2]["totalCoupons"], 2);
    assert_eq!(usage[2]["redeemedCoupons"], 3);
    assert_eq!(usage[2]["redemptionRate"], "150.00");

    let (_, widgets) = app
        .get(
            &format!(
                "/api/dashboard/widgets?months=500&serviceCenterId={}",
                seeded.north.id
            ),
            &token,
        )
        .await;
    let trends = widgets["salesTrends"]["data"].as_array().unwrap();
    assert_eq!(trends.len(), 36);
    let distribution = widgets["serviceCenterDistribution"]["data"]
        .as_array()
        .unwrap();
    assert!(distribution
        .iter()
        .all(|d| d["serviceCenterId"] == seeded.north.id));
}

#[tokio::test]
async fn test_service_center_ranking_and_usage_endpoints() {
    let app = TestApp::new().await.unwrap();
    let seeded = seed(&app).await;
    let root = create_super_admin(app.database()).await;
    let token = app.token_for(&root);

    let (status, ranking) = app.get("/api/dashboard/service-centers", &token).await;
    assert_eq!(status, StatusCode::OK);
    let ranking = ranking.as_array().unwrap();
    assert_eq!(ranking[0]["serviceCenterId"], seeded.north.id);
    assert_eq!(ranking[0]["servicesCompleted"], 2);
    assert_eq!(ranking[1]["revenue"], "400.00");

    let (status, usage) = app.get("/api/dashboard/coupon-usage", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(usage.as_array().unwrap().len(), 6);

    let (status, trends) = app
        .get("/api/dashboard/sales-trends?months=0", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trends.as_array().unwrap().len(), 1);
}
