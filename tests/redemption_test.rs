// ABOUTME: Integration tests for atomic coupon redemption
// ABOUTME: Verifies usage accounting, completion, rejection rules and behavior under concurrent redeems
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{create_coupon, create_customer, create_service_center, create_test_database};
use couponhub::{
    config::DatabaseUrl,
    database::{CreateCouponRequest, Database, UpdateCouponRequest},
    errors::ErrorCode,
    models::CouponStatus,
};

#[tokio::test]
async fn test_redeem_until_completed() {
    let db = create_test_database().await.unwrap();
    let center = create_service_center(&db, "Indiranagar").await;
    let customer = create_customer(&db, "Asha").await;
    let coupon = create_coupon(&db, customer.id, Some(center.id), 2).await;

    let first = db
        .coupons()
        .redeem(coupon.id, center.id, customer.id, "Oil change")
        .await
        .unwrap();
    assert_eq!(first.used_services, 1);
    assert_eq!(first.remaining_services, 1);
    assert_eq!(first.status, CouponStatus::Active);

    let second = db
        .coupons()
        .redeem(coupon.id, center.id, customer.id, "")
        .await
        .unwrap();
    assert_eq!(second.remaining_services, 0);
    assert_eq!(second.status, CouponStatus::Completed);

    let err = db
        .coupons()
        .redeem(coupon.id, center.id, customer.id, "")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);

    let stored = db.coupons().get_by_id(coupon.id).await.unwrap().unwrap();
    assert_eq!(stored.used_services, 2);
    assert_eq!(stored.status, CouponStatus::Completed);
    assert_eq!(stored.redemption_count, 2);

    let log = db.redemptions().list_by_coupon(coupon.id).await.unwrap();
    assert_eq!(log.len(), 2);
    assert!(log.iter().any(|r| r.notes == "Oil change"));
    assert!(log.iter().all(|r| r.service_center_name == "Indiranagar"));
}

#[tokio::test]
async fn test_redeem_rejects_expired_and_unassigned() {
    let db = create_test_database().await.unwrap();
    let center = create_service_center(&db, "Indiranagar").await;
    let customer = create_customer(&db, "Asha").await;

    let expired = db
        .coupons()
        .create(&CreateCouponRequest {
            customer_id: customer.id,
            service_center_id: Some(center.id),
            total_services: Some(3),
            expiry_date: Utc::now() - Duration::days(1),
            status: None,
        })
        .await
        .unwrap();
    let err = db
        .coupons()
        .redeem(expired.id, center.id, customer.id, "")
        .await
        .unwrap_err();
    assert_eq!(err.message, "Coupon has expired");

    let unassigned = db
        .coupons()
        .create(&CreateCouponRequest {
            customer_id: customer.id,
            service_center_id: None,
            total_services: None,
            expiry_date: Utc::now() + Duration::days(30),
            status: Some(CouponStatus::Unassigned),
        })
        .await
        .unwrap();
    assert_eq!(unassigned.total_services, 5);
    let err = db
        .coupons()
        .redeem(unassigned.id, center.id, customer.id, "")
        .await
        .unwrap_err();
    assert!(err.message.contains("not active"));

    let err = db
        .coupons()
        .redeem(9999, center.id, customer.id, "")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn test_failed_redemption_insert_rolls_back_usage() {
    let db = create_test_database().await.unwrap();
    let center = create_service_center(&db, "Indiranagar").await;
    let customer = create_customer(&db, "Asha").await;
    let coupon = create_coupon(&db, customer.id, Some(center.id), 3).await;

    // Unknown service center violates the redemption foreign key
    let err = db
        .coupons()
        .redeem(coupon.id, 4242, customer.id, "")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);

    let stored = db.coupons().get_by_id(coupon.id).await.unwrap().unwrap();
    assert_eq!(stored.used_services, 0);
    assert_eq!(stored.redemption_count, 0);
}

#[tokio::test]
async fn test_update_cannot_shrink_below_usage() {
    let db = create_test_database().await.unwrap();
    let center = create_service_center(&db, "Indiranagar").await;
    let customer = create_customer(&db, "Asha").await;
    let coupon = create_coupon(&db, customer.id, Some(center.id), 3).await;
    db.coupons()
        .redeem(coupon.id, center.id, customer.id, "")
        .await
        .unwrap();
    db.coupons()
        .redeem(coupon.id, center.id, customer.id, "")
        .await
        .unwrap();

    let request = UpdateCouponRequest {
        id: None,
        customer_id: customer.id,
        service_center_id: Some(center.id),
        total_services: 1,
        expiry_date: coupon.expiry_date,
        status: CouponStatus::Active,
    };
    let err = db.coupons().update(coupon.id, &request).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);

    let request = UpdateCouponRequest {
        total_services: 10,
        ..request
    };
    let updated = db.coupons().update(coupon.id, &request).await.unwrap().unwrap();
    assert_eq!(updated.remaining_services(), 8);
    assert_eq!(updated.coupon_code, coupon.coupon_code);
}

async fn file_database(dir: &tempfile::TempDir) -> Arc<Database> {
    let url = DatabaseUrl::SQLite {
        path: dir.path().join("concurrent.db"),
    };
    Arc::new(Database::new(&url).await.unwrap())
}

/// Fire `attempts` redeems at once and collect each result
async fn redeem_concurrently(
    db: &Arc<Database>,
    coupon_id: i64,
    center_id: i64,
    customer_id: i64,
    attempts: usize,
) -> Vec<Result<i64, ErrorCode>> {
    let handles: Vec<_> = (0..attempts)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move {
                db.coupons()
                    .redeem(coupon_id, center_id, customer_id, "")
                    .await
                    .map(|outcome| outcome.used_services)
                    .map_err(|e| e.code)
            })
        })
        .collect();

    let mut results = Vec::with_capacity(attempts);
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_redeems_all_succeed_with_services_left() {
    common::init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let db = file_database(&dir).await;
    let center = create_service_center(&db, "Indiranagar").await;
    let customer = create_customer(&db, "Asha").await;
    let coupon = create_coupon(&db, customer.id, Some(center.id), 100).await;

    let results = redeem_concurrently(&db, coupon.id, center.id, customer.id, 20).await;
    let failures: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    assert!(failures.is_empty(), "redeems failed: {failures:?}");

    // Each redeem observed a distinct usage count
    let mut used: Vec<i64> = results.into_iter().map(Result::unwrap).collect();
    used.sort_unstable();
    assert_eq!(used, (1..=20).collect::<Vec<i64>>());

    let stored = db.coupons().get_by_id(coupon.id).await.unwrap().unwrap();
    assert_eq!(stored.used_services, 20);
    assert_eq!(stored.redemption_count, 20);
    assert_eq!(stored.status, CouponStatus::Active);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_redeems_never_exceed_allowance() {
    common::init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let db = file_database(&dir).await;
    let center = create_service_center(&db, "Indiranagar").await;
    let customer = create_customer(&db, "Asha").await;
    let coupon = create_coupon(&db, customer.id, Some(center.id), 3).await;

    let results = redeem_concurrently(&db, coupon.id, center.id, customer.id, 10).await;
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 3);
    // Losers are rejected as used up, never as storage errors
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|code| *code == ErrorCode::InvalidInput));

    let stored = db.coupons().get_by_id(coupon.id).await.unwrap().unwrap();
    assert_eq!(stored.used_services, 3);
    assert_eq!(stored.redemption_count, 3);
    assert_eq!(stored.status, CouponStatus::Completed);
}
