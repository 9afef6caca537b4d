// ABOUTME: Core data models for the CouponHub API
// ABOUTME: Defines users, customers, service centers, coupons, redemptions, invoices and their status enums
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! # Data Models
//!
//! Entities as they are read back from the database, including the display names
//! joined in from related tables. JSON field names are camelCase, matching what the
//! web frontend sends and expects.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::permissions::UserRole;

/// Lifecycle state of a coupon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CouponStatus {
    /// Created but not yet sold to a customer
    Unassigned,
    /// Sold and redeemable
    #[default]
    Active,
    /// Every included service has been used
    Completed,
    /// Past its expiry date
    Expired,
}

impl CouponStatus {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unassigned => "Unassigned",
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Expired => "Expired",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "Unassigned" => Self::Unassigned,
            "Completed" => Self::Completed,
            "Expired" => Self::Expired,
            _ => Self::Active,
        }
    }
}

/// Payment state of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    /// Not paid yet
    #[default]
    Unpaid,
    /// Paid in full; counts towards revenue
    Paid,
    /// Payment initiated but not confirmed
    Pending,
    /// Payment returned to the customer
    Refunded,
}

impl PaymentStatus {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "Unpaid",
            Self::Paid => "Paid",
            Self::Pending => "Pending",
            Self::Refunded => "Refunded",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "Paid" => Self::Paid,
            "Pending" => Self::Pending,
            "Refunded" => Self::Refunded,
            _ => Self::Unpaid,
        }
    }
}

/// Staff member (`SuperAdmin` or `Admin`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Login email, unique
    pub email: String,
    /// Contact number
    pub mobile_number: String,
    /// Role driving authorization
    pub role: UserRole,
    /// bcrypt hash, absent until the invitation is completed
    #[serde(skip)]
    pub password_hash: Option<String>,
    /// Service center an Admin belongs to
    pub service_center_id: Option<i64>,
    /// Name of the service center, joined in on read
    pub service_center_name: Option<String>,
    /// When the user was created
    pub created_at: DateTime<Utc>,
    /// Soft-delete flag
    pub is_active: bool,
}

impl User {
    /// First and last name joined
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

/// End customer who buys coupons
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Unique identifier
    pub id: i64,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact email
    pub email: String,
    /// Contact number
    pub mobile_number: String,
    /// Google account id when the customer signed up through Google
    pub google_id: Option<String>,
    /// When the customer was created
    pub created_at: DateTime<Utc>,
    /// Soft-delete flag
    pub is_active: bool,
    /// Coupons owned by the customer
    pub coupon_count: i64,
    /// Invoices billed to the customer (excluding deleted ones)
    pub invoice_count: i64,
}

impl Customer {
    /// First and last name joined
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

/// Physical location that fulfills redemptions and issues invoices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCenter {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Street address
    pub address: String,
    /// Phone number
    pub contact_number: String,
}

/// Prepaid voucher for a fixed number of services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Unique identifier
    pub id: i64,
    /// Unique human-readable code
    pub coupon_code: String,
    /// Owning customer
    pub customer_id: i64,
    /// Owning customer's full name, joined in on read
    pub customer_name: String,
    /// Service center that sold the coupon
    pub service_center_id: Option<i64>,
    /// Services included
    pub total_services: i64,
    /// Services already redeemed
    pub used_services: i64,
    /// When the coupon was sold
    pub purchase_date: DateTime<Utc>,
    /// Last instant the coupon can be redeemed (exclusive)
    pub expiry_date: DateTime<Utc>,
    /// Lifecycle state
    pub status: CouponStatus,
    /// Redemption records attached to the coupon
    pub redemption_count: i64,
}

impl Coupon {
    /// Services still available
    #[must_use]
    pub const fn remaining_services(&self) -> i64 {
        self.total_services - self.used_services
    }

    /// Whether the coupon can be redeemed at `now`
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CouponStatus::Active
            && self.expiry_date > now
            && self.used_services < self.total_services
    }
}

/// One recorded use of a coupon at a service center
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRedemption {
    /// Unique identifier
    pub id: i64,
    /// Redeemed coupon
    pub coupon_id: i64,
    /// Code of the redeemed coupon
    pub coupon_code: String,
    /// Service center where the service happened
    pub service_center_id: i64,
    /// Name of the service center
    pub service_center_name: String,
    /// Customer who used the service
    pub customer_id: i64,
    /// Customer's full name
    pub customer_name: String,
    /// When the service was redeemed
    pub redemption_date: DateTime<Utc>,
    /// Free-form notes from staff
    pub notes: String,
    /// Invoice covering this redemption
    pub invoice_id: Option<i64>,
    /// Number of the linked invoice
    pub invoice_number: Option<String>,
}

/// Billing record for a customer at a service center
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Unique identifier
    pub id: i64,
    /// Unique number, `INV-{year}-{sequence}`
    pub invoice_number: String,
    /// Billed customer
    pub customer_id: i64,
    /// Billed customer's full name
    pub customer_name: String,
    /// Issuing service center
    pub service_center_id: i64,
    /// Issuing service center's name
    pub service_center_name: String,
    /// Coupon sold with this invoice
    pub coupon_id: Option<i64>,
    /// Code of the linked coupon
    pub coupon_code: Option<String>,
    /// Amount before tax and discount
    pub sub_total: Decimal,
    /// Tax charged
    pub tax_amount: Decimal,
    /// Discount granted
    pub discount_amount: Decimal,
    /// Amount charged
    pub total_amount: Decimal,
    /// ISO currency code
    pub currency: String,
    /// How the customer paid (cash, card, upi ...)
    pub payment_method: String,
    /// Payment state
    pub payment_status: PaymentStatus,
    /// When the invoice was marked paid
    pub paid_at: Option<DateTime<Utc>>,
    /// When the invoice was issued
    pub created_at: DateTime<Utc>,
    /// Free-form notes
    pub notes: String,
}

/// Single-use credential for setting or resetting a password
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetToken {
    /// Unique identifier
    pub id: i64,
    /// User the token belongs to
    pub user_id: i64,
    /// Opaque url-safe token
    pub token: String,
    /// Token is rejected at or after this instant
    pub expiry_date: DateTime<Utc>,
    /// Set once the token has been consumed or invalidated
    pub is_used: bool,
    /// When the token was issued
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    /// Whether the token can still be used at `now`
    #[must_use]
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && self.expiry_date > now
    }
}
