// ABOUTME: Database operations for staff users (SuperAdmin and Admin accounts)
// ABOUTME: Handles CRUD, search, activation and password hash storage with service center names joined in
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use chrono::Utc;
use serde::Deserialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::{format_timestamp, parse_timestamp};
use crate::errors::{AppError, AppResult};
use crate::models::User;
use crate::permissions::UserRole;

const USER_SELECT: &str = r"
    SELECT u.id, u.first_name, u.last_name, u.email, u.mobile_number, u.role,
           u.password_hash, u.service_center_id, u.created_at, u.is_active,
           sc.name AS service_center_name
    FROM users u
    LEFT JOIN service_centers sc ON sc.id = u.service_center_id
";

/// Request to create a staff user
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    /// Given name
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Login email
    pub email: String,
    /// Contact number
    #[serde(default)]
    pub mobile_number: String,
    /// Role to grant
    pub role: UserRole,
    /// Service center, required for Admins
    #[serde(default)]
    pub service_center_id: Option<i64>,
}

/// Request to update a staff user's profile, role and service center
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    /// Given name
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Login email
    pub email: String,
    /// Contact number
    #[serde(default)]
    pub mobile_number: String,
    /// Role to grant
    pub role: UserRole,
    /// Service center, required for Admins
    #[serde(default)]
    pub service_center_id: Option<i64>,
}

/// Staff user database operations manager
pub struct UsersManager {
    pool: SqlitePool,
}

impl UsersManager {
    /// Create a new users manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user without a password; the password is set through a setup token
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` if the email is taken, or a database error
    pub async fn create(&self, request: &CreateUserRequest) -> AppResult<User> {
        if self.get_by_email(&request.email).await?.is_some() {
            return Err(AppError::already_exists(format!(
                "A user with email {} already exists",
                request.email
            )));
        }

        let now = format_timestamp(Utc::now());
        let result = sqlx::query(
            r"
            INSERT INTO users (
                first_name, last_name, email, mobile_number, role,
                password_hash, service_center_id, created_at, is_active
            ) VALUES ($1, $2, $3, $4, $5, NULL, $6, $7, 1)
            ",
        )
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(&request.mobile_number)
        .bind(request.role.as_str())
        .bind(request.service_center_id)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::internal(format!("User {id} vanished after insert")))
    }

    /// Get a user by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE u.id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get user: {e}")))?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// Get a user by email, ignoring case
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE lower(u.email) = lower($1)");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get user by email: {e}")))?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// Get a user by mobile number
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_by_mobile(&self, mobile_number: &str) -> AppResult<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE u.mobile_number = $1");
        let row = sqlx::query(&sql)
            .bind(mobile_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get user by mobile: {e}")))?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// List users ordered by creation time; inactive users only when `all_users` is set
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list(&self, all_users: bool) -> AppResult<Vec<User>> {
        let sql = format!("{USER_SELECT} WHERE ($1 = 1 OR u.is_active = 1) ORDER BY u.created_at, u.id");
        let rows = sqlx::query(&sql)
            .bind(all_users)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list users: {e}")))?;

        rows.iter().map(row_to_user).collect()
    }

    /// Search users by name, email or mobile number (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn search(&self, term: &str, all_users: bool) -> AppResult<Vec<User>> {
        let pattern = format!("%{}%", term.trim().to_lowercase());
        let sql = format!(
            r"{USER_SELECT}
            WHERE ($1 = 1 OR u.is_active = 1)
              AND (lower(u.first_name) LIKE $2
                   OR lower(u.last_name) LIKE $2
                   OR lower(u.email) LIKE $2
                   OR u.mobile_number LIKE $2)
            ORDER BY u.created_at, u.id"
        );
        let rows = sqlx::query(&sql)
            .bind(all_users)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to search users: {e}")))?;

        rows.iter().map(row_to_user).collect()
    }

    /// Update a user's profile, role and service center
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` if the new email belongs to another user
    pub async fn update(&self, id: i64, request: &UpdateUserRequest) -> AppResult<Option<User>> {
        if let Some(other) = self.get_by_email(&request.email).await? {
            if other.id != id {
                return Err(AppError::already_exists(format!(
                    "A user with email {} already exists",
                    request.email
                )));
            }
        }

        let result = sqlx::query(
            r"
            UPDATE users
            SET first_name = $1, last_name = $2, email = $3, mobile_number = $4,
                role = $5, service_center_id = $6
            WHERE id = $7
            ",
        )
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(&request.mobile_number)
        .bind(request.role.as_str())
        .bind(request.service_center_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Activate or deactivate a user
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn set_status(&self, id: i64, is_active: bool) -> AppResult<bool> {
        let result = sqlx::query("UPDATE users SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update user status: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete a user
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        self.set_status(id, false).await
    }

    /// Store a new bcrypt hash for a user
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn set_password_hash(&self, id: i64, password_hash: &str) -> AppResult<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to set password: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all users, active or not
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count users: {e}")))?;

        Ok(count)
    }
}

/// Convert a database row to a `User`
pub(crate) fn row_to_user(row: &SqliteRow) -> AppResult<User> {
    let role_str: String = row.get("role");
    let created_at_str: String = row.get("created_at");
    let is_active: i64 = row.get("is_active");

    Ok(User {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        mobile_number: row.get("mobile_number"),
        role: UserRole::parse(&role_str)
            .ok_or_else(|| AppError::internal(format!("Invalid stored role: {role_str}")))?,
        password_hash: row.get("password_hash"),
        service_center_id: row.get("service_center_id"),
        service_center_name: row.get("service_center_name"),
        created_at: parse_timestamp(&created_at_str)?,
        is_active: is_active == 1,
    })
}
