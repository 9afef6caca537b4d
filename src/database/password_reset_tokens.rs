// ABOUTME: Storage for single-use password setup and reset tokens
// ABOUTME: Generates url-safe random tokens, validates expiry and consumes them atomically with the password change
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use rand::RngCore;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

use super::users::row_to_user;
use super::{format_timestamp, parse_timestamp};
use crate::constants::auth::{PASSWORD_TOKEN_BYTES, PASSWORD_TOKEN_EXPIRY_DAYS};
use crate::errors::{AppError, AppResult};
use crate::models::{PasswordResetToken, User};

/// Password token database operations manager
pub struct PasswordResetTokensManager {
    pool: SqlitePool,
}

impl PasswordResetTokensManager {
    /// Create a new password token manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Issue a fresh token for a user, invalidating their outstanding ones
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or a query fails
    pub async fn generate(&self, user_id: i64) -> AppResult<PasswordResetToken> {
        let now = Utc::now();
        let expiry_date = now + Duration::days(PASSWORD_TOKEN_EXPIRY_DAYS);
        let token = generate_token_value();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        sqlx::query("UPDATE password_reset_tokens SET is_used = 1 WHERE user_id = $1 AND is_used = 0")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to invalidate tokens: {e}")))?;

        let result = sqlx::query(
            r"
            INSERT INTO password_reset_tokens (user_id, token, expiry_date, is_used, created_at)
            VALUES ($1, $2, $3, 0, $4)
            ",
        )
        .bind(user_id)
        .bind(&token)
        .bind(format_timestamp(expiry_date))
        .bind(format_timestamp(now))
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit token: {e}")))?;

        debug!(user_id, "Password token issued");

        Ok(PasswordResetToken {
            id: result.last_insert_rowid(),
            user_id,
            token,
            expiry_date,
            is_used: false,
            created_at: now,
        })
    }

    /// Look up a token record
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get(&self, token: &str) -> AppResult<Option<PasswordResetToken>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, token, expiry_date, is_used, created_at
            FROM password_reset_tokens WHERE token = $1
            ",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get token: {e}")))?;

        row.map(|r| row_to_token(&r)).transpose()
    }

    /// Whether a token can still be used; expired tokens are marked used on the way
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails
    pub async fn validate(&self, token: &str) -> AppResult<bool> {
        let Some(record) = self.get(token).await? else {
            return Ok(false);
        };
        if record.is_used {
            return Ok(false);
        }
        if !record.is_usable_at(Utc::now()) {
            self.mark_used(record.id).await?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Set the user's password hash and consume the token in one transaction
    ///
    /// Returns `false` when the token is unknown, used or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails
    pub async fn use_token(&self, token: &str, password_hash: &str) -> AppResult<bool> {
        if !self.validate(token).await? {
            return Ok(false);
        }

        let now = format_timestamp(Utc::now());
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let consumed = sqlx::query(
            r"
            UPDATE password_reset_tokens SET is_used = 1
            WHERE token = $1 AND is_used = 0 AND expiry_date > $2
            RETURNING user_id
            ",
        )
        .bind(token)
        .bind(&now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to consume token: {e}")))?;

        let Some(row) = consumed else {
            return Ok(false);
        };
        let user_id: i64 = row.get("user_id");

        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to set password: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit password change: {e}")))?;

        debug!(user_id, "Password token consumed");
        Ok(true)
    }

    /// Resolve the user a token was issued for while the token is still unused and unexpired
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_user_by_token(&self, token: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT u.id, u.first_name, u.last_name, u.email, u.mobile_number, u.role,
                   u.password_hash, u.service_center_id, u.created_at, u.is_active,
                   sc.name AS service_center_name
            FROM password_reset_tokens t
            JOIN users u ON u.id = t.user_id
            LEFT JOIN service_centers sc ON sc.id = u.service_center_id
            WHERE t.token = $1 AND t.is_used = 0 AND t.expiry_date > $2
            ",
        )
        .bind(token)
        .bind(format_timestamp(Utc::now()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get user by token: {e}")))?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn mark_used(&self, id: i64) -> AppResult<()> {
        sqlx::query("UPDATE password_reset_tokens SET is_used = 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to mark token used: {e}")))?;
        Ok(())
    }
}

/// Random token value: 32 bytes, base64url without padding
#[must_use]
pub fn generate_token_value() -> String {
    let mut bytes = [0u8; PASSWORD_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn row_to_token(row: &SqliteRow) -> AppResult<PasswordResetToken> {
    let expiry_date: String = row.get("expiry_date");
    let created_at: String = row.get("created_at");
    let is_used: i64 = row.get("is_used");

    Ok(PasswordResetToken {
        id: row.get("id"),
        user_id: row.get("user_id"),
        token: row.get("token"),
        expiry_date: parse_timestamp(&expiry_date)?,
        is_used: is_used == 1,
        created_at: parse_timestamp(&created_at)?,
    })
}
