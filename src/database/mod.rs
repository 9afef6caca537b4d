// ABOUTME: Database connection management and schema migrations for CouponHub
// ABOUTME: Opens the SQLite pool, creates all tables and exposes shared row decoding helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! # Database Management
//!
//! [`Database`] owns the `SQLite` pool and runs the schema migrations. Each entity has
//! its own manager (`CouponsManager`, `InvoicesManager`, ...) constructed from a clone
//! of the pool.
//!
//! Timestamps are stored as fixed-width RFC3339 text in UTC so that string comparison
//! in SQL matches chronological order. Money is stored as decimal text.

/// Coupon storage and redemption
pub mod coupons;
/// Customer storage
pub mod customers;
/// Invoice storage
pub mod invoices;
/// Password setup / reset token storage
pub mod password_reset_tokens;
/// Service redemption storage
pub mod redemptions;
/// Service center storage
pub mod service_centers;
/// Staff user storage
pub mod users;

pub use coupons::{CouponsManager, CreateCouponRequest, RedemptionOutcome, UpdateCouponRequest};
pub use customers::{CreateCustomerRequest, CustomersManager, UpdateCustomerRequest};
pub use invoices::{CreateInvoiceRequest, InvoicesManager, UpdateInvoiceRequest};
pub use password_reset_tokens::PasswordResetTokensManager;
pub use redemptions::{CreateRedemptionRequest, RedemptionsManager, UpdateRedemptionRequest};
pub use service_centers::{ServiceCenterRequest, ServiceCentersManager};
pub use users::{CreateUserRequest, UpdateUserRequest, UsersManager};

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqlitePool};
use tracing::info;

use crate::config::DatabaseUrl;
use crate::constants::defaults::DATABASE_BUSY_TIMEOUT_SECS;
use crate::errors::{AppError, AppResult};

/// Database manager owning the connection pool
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection and run migrations
    ///
    /// File databases are created when missing. In-memory databases are kept on a
    /// single connection so every query sees the same data.
    ///
    /// # Errors
    ///
    /// Returns an error if the url is invalid, the connection fails or a migration fails
    pub async fn new(database_url: &DatabaseUrl) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&database_url.to_connection_string())
            .context("Invalid database url")?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(DATABASE_BUSY_TIMEOUT_SECS));

        let options = if database_url.is_memory() {
            options
        } else {
            options.journal_mode(SqliteJournalMode::Wal)
        };

        let pool_options = if database_url.is_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to {database_url}"))?;

        let db = Self { pool };
        db.migrate().await?;
        info!(database = %database_url, "Database ready");
        Ok(db)
    }

    /// Wrap an existing pool and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Staff user operations
    #[must_use]
    pub fn users(&self) -> UsersManager {
        UsersManager::new(self.pool.clone())
    }

    /// Customer operations
    #[must_use]
    pub fn customers(&self) -> CustomersManager {
        CustomersManager::new(self.pool.clone())
    }

    /// Service center operations
    #[must_use]
    pub fn service_centers(&self) -> ServiceCentersManager {
        ServiceCentersManager::new(self.pool.clone())
    }

    /// Coupon operations
    #[must_use]
    pub fn coupons(&self) -> CouponsManager {
        CouponsManager::new(self.pool.clone())
    }

    /// Redemption operations
    #[must_use]
    pub fn redemptions(&self) -> RedemptionsManager {
        RedemptionsManager::new(self.pool.clone())
    }

    /// Invoice operations
    #[must_use]
    pub fn invoices(&self) -> InvoicesManager {
        InvoicesManager::new(self.pool.clone())
    }

    /// Password token operations
    #[must_use]
    pub fn password_reset_tokens(&self) -> PasswordResetTokensManager {
        PasswordResetTokensManager::new(self.pool.clone())
    }

    /// Check the database answers queries
    ///
    /// # Errors
    ///
    /// Returns an error if the ping query fails
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database ping failed: {e}")))?;
        Ok(())
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any table or index creation fails
    pub async fn migrate(&self) -> Result<()> {
        self.migrate_service_centers().await?;
        self.migrate_users().await?;
        self.migrate_customers().await?;
        self.migrate_coupons().await?;
        self.migrate_invoices().await?;
        self.migrate_redemptions().await?;
        self.migrate_password_reset_tokens().await?;
        Ok(())
    }

    async fn migrate_service_centers(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS service_centers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                address TEXT NOT NULL DEFAULT '',
                contact_number TEXT NOT NULL DEFAULT ''
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn migrate_users(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL UNIQUE,
                mobile_number TEXT NOT NULL DEFAULT '',
                role TEXT NOT NULL CHECK (role IN ('SuperAdmin', 'Admin')),
                password_hash TEXT,
                service_center_id INTEGER REFERENCES service_centers(id) ON DELETE RESTRICT,
                created_at TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_mobile ON users(mobile_number)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn migrate_customers(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS customers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                mobile_number TEXT NOT NULL DEFAULT '',
                otp_code TEXT,
                otp_expiry TEXT,
                google_id TEXT,
                created_at TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_customers_mobile ON customers(mobile_number)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_customers_email ON customers(email)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn migrate_coupons(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS coupons (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                coupon_code TEXT NOT NULL UNIQUE,
                customer_id INTEGER NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
                service_center_id INTEGER REFERENCES service_centers(id) ON DELETE SET NULL,
                total_services INTEGER NOT NULL DEFAULT 5,
                used_services INTEGER NOT NULL DEFAULT 0,
                purchase_date TEXT NOT NULL,
                expiry_date TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'Active'
                    CHECK (status IN ('Unassigned', 'Active', 'Completed', 'Expired'))
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_coupons_customer ON coupons(customer_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_coupons_status ON coupons(status)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn migrate_invoices(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS invoices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                invoice_number TEXT NOT NULL UNIQUE,
                customer_id INTEGER NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
                coupon_id INTEGER REFERENCES coupons(id) ON DELETE SET NULL,
                service_center_id INTEGER NOT NULL REFERENCES service_centers(id) ON DELETE RESTRICT,
                sub_total TEXT NOT NULL DEFAULT '0',
                tax_amount TEXT NOT NULL DEFAULT '0',
                discount_amount TEXT NOT NULL DEFAULT '0',
                total_amount TEXT NOT NULL DEFAULT '0',
                currency TEXT NOT NULL DEFAULT 'INR',
                payment_method TEXT NOT NULL DEFAULT '',
                payment_status TEXT NOT NULL DEFAULT 'Unpaid'
                    CHECK (payment_status IN ('Unpaid', 'Paid', 'Pending', 'Refunded')),
                paid_at TEXT,
                created_at TEXT NOT NULL,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                notes TEXT NOT NULL DEFAULT ''
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_invoices_customer ON invoices(customer_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_invoices_service_center ON invoices(service_center_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn migrate_redemptions(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS service_redemptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                coupon_id INTEGER NOT NULL REFERENCES coupons(id) ON DELETE CASCADE,
                service_center_id INTEGER NOT NULL REFERENCES service_centers(id) ON DELETE RESTRICT,
                customer_id INTEGER NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
                redemption_date TEXT NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                invoice_id INTEGER REFERENCES invoices(id) ON DELETE SET NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_redemptions_coupon ON service_redemptions(coupon_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_redemptions_service_center ON service_redemptions(service_center_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn migrate_password_reset_tokens(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS password_reset_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                token TEXT NOT NULL UNIQUE,
                expiry_date TEXT NOT NULL,
                is_used INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_password_reset_tokens_user ON password_reset_tokens(user_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Format a timestamp for storage: fixed-width RFC3339 in UTC
#[must_use]
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
///
/// # Errors
///
/// Returns an internal error if the column does not hold RFC3339 text
pub fn parse_timestamp(s: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::internal(format!("Invalid datetime '{s}': {e}")))
}

/// Parse an optional stored timestamp
///
/// # Errors
///
/// Returns an internal error if the column holds text that is not RFC3339
pub fn parse_optional_timestamp(s: Option<String>) -> AppResult<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_timestamp).transpose()
}

/// Join first and last name columns from a LEFT JOIN into a display name
pub(crate) fn join_name(first: Option<String>, last: Option<String>) -> String {
    format!(
        "{} {}",
        first.unwrap_or_default(),
        last.unwrap_or_default()
    )
    .trim()
    .to_owned()
}

/// Format a money amount for storage with exactly two decimal places
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    rounded.to_string()
}

/// Parse a stored money amount
///
/// # Errors
///
/// Returns an internal error if the column does not hold a decimal number
pub fn parse_money(s: &str) -> AppResult<Decimal> {
    Decimal::from_str(s).map_err(|e| AppError::internal(format!("Invalid amount '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    #[test]
    fn test_timestamps_sort_lexicographically() {
        let earlier = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1500);
        let a = format_timestamp(earlier);
        let b = format_timestamp(later);
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(parse_timestamp(&a).unwrap(), earlier);
    }

    #[test]
    fn test_money_round_trip() {
        let amount = Decimal::new(123_456, 3); // 123.456
        let stored = format_money(amount);
        assert_eq!(stored, "123.46");
        assert_eq!(parse_money(&stored).unwrap(), Decimal::new(12346, 2));
        assert!(parse_money("abc").is_err());
        assert_eq!(format_money(Decimal::new(1805, 1)), "180.50");
        assert_eq!(format_money(Decimal::from(1000)), "1000.00");
    }
}
