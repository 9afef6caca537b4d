// ABOUTME: Role model and service-center scoping rules for authorization decisions
// ABOUTME: Resolves which service center a SuperAdmin or Admin may query or act on
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! Role-based permission checks
//!
//! `SuperAdmin` users see every service center and may narrow a query to one.
//! `Admin` users are pinned to the service center recorded in their token, whatever
//! they ask for. Any other role is refused.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{AppError, AppResult};

/// Message returned when an Admin token carries no service center
pub const ADMIN_WITHOUT_CENTER: &str = "Admin user must have a service center assigned";

/// Message returned for roles without dashboard or staff access
pub const INSUFFICIENT_PERMISSIONS: &str = "Access denied. Insufficient permissions.";

/// Role carried by a user and by their JWT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    /// Operates every service center
    SuperAdmin,
    /// Operates a single service center
    Admin,
    /// End customer
    Customer,
}

impl UserRole {
    /// Convert to database / claim string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SuperAdmin",
            Self::Admin => "Admin",
            Self::Customer => "Customer",
        }
    }

    /// Parse from database / claim string representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SuperAdmin" => Some(Self::SuperAdmin),
            "Admin" => Some(Self::Admin),
            "Customer" => Some(Self::Customer),
            _ => None,
        }
    }

    /// Staff roles manage customers, coupons and invoices
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the service center a caller is allowed to work with
///
/// Returns `None` when a `SuperAdmin` asked for no particular center, meaning "all".
///
/// # Errors
///
/// Returns `PermissionDenied` for an Admin without a service center and for any
/// non-staff role
pub fn effective_service_center_id(
    role: Option<UserRole>,
    claimed_service_center_id: Option<i64>,
    requested_service_center_id: Option<i64>,
) -> AppResult<Option<i64>> {
    match role {
        Some(UserRole::SuperAdmin) => Ok(requested_service_center_id),
        Some(UserRole::Admin) => claimed_service_center_id
            .map(Some)
            .ok_or_else(|| AppError::permission_denied(ADMIN_WITHOUT_CENTER)),
        Some(UserRole::Customer) | None => {
            Err(AppError::permission_denied(INSUFFICIENT_PERMISSIONS))
        }
    }
}

/// Check that a role and service center assignment are consistent
///
/// # Errors
///
/// Returns `InvalidInput` when an Admin has no service center, a `SuperAdmin` has one,
/// or the role is not a staff role
pub fn validate_role_assignment(role: UserRole, service_center_id: Option<i64>) -> AppResult<()> {
    match (role, service_center_id) {
        (UserRole::Admin, None) => Err(AppError::invalid_input(
            "Admin users must be assigned to a service center",
        )),
        (UserRole::SuperAdmin, Some(_)) => Err(AppError::invalid_input(
            "SuperAdmin users cannot be assigned to a service center",
        )),
        (UserRole::Customer, _) => Err(AppError::invalid_input(
            "Customers are managed through the customers API",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn test_super_admin_uses_requested_center() {
        assert_eq!(
            effective_service_center_id(Some(UserRole::SuperAdmin), None, Some(4)).unwrap(),
            Some(4)
        );
        assert_eq!(
            effective_service_center_id(Some(UserRole::SuperAdmin), None, None).unwrap(),
            None
        );
    }

    #[test]
    fn test_admin_is_pinned_to_claimed_center() {
        assert_eq!(
            effective_service_center_id(Some(UserRole::Admin), Some(2), Some(9)).unwrap(),
            Some(2)
        );
        assert_eq!(
            effective_service_center_id(Some(UserRole::Admin), Some(2), None).unwrap(),
            Some(2)
        );
    }

    #[test]
    fn test_admin_without_center_is_denied() {
        let err = effective_service_center_id(Some(UserRole::Admin), None, Some(1)).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert_eq!(err.message, ADMIN_WITHOUT_CENTER);
    }

    #[test]
    fn test_other_roles_are_denied() {
        for role in [Some(UserRole::Customer), None] {
            let err = effective_service_center_id(role, Some(1), Some(1)).unwrap_err();
            assert_eq!(err.code, ErrorCode::PermissionDenied);
            assert_eq!(err.message, INSUFFICIENT_PERMISSIONS);
        }
    }

    #[test]
    fn test_role_assignment_rules() {
        assert!(validate_role_assignment(UserRole::Admin, Some(1)).is_ok());
        assert!(validate_role_assignment(UserRole::SuperAdmin, None).is_ok());
        assert!(validate_role_assignment(UserRole::Admin, None).is_err());
        assert!(validate_role_assignment(UserRole::SuperAdmin, Some(1)).is_err());
        assert!(validate_role_assignment(UserRole::Customer, None).is_err());
    }

    #[test]
    fn test_role_strings() {
        assert_eq!(UserRole::parse("SuperAdmin"), Some(UserRole::SuperAdmin));
        assert_eq!(UserRole::parse("admin"), None);
        assert_eq!(UserRole::Admin.to_string(), "Admin");
    }
}
