//! Role-based authorization extractors
//!
//! Usage in handlers:
//! ```ignore
//! use crate::middleware::{Authorized, AdminOnly};
//!
//! async fn create_department(
//!     Authorized(user, _): Authorized<AdminOnly>,
//!     State(state): State<AppState>,
//! ) -> Result<...> {
//!     // Role already verified - just use user
//! }
//! ```

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::models::enums::Role;
use crate::models::user;
use crate::services::security::Claims;

/// Trait for role requirement marker types
pub trait RoleRequirement: Send + Sync + 'static {
    /// Roles allowed through
    const ROLES: &'static [Role];

    fn allows(role: Role) -> bool {
        Self::ROLES.contains(&role)
    }
}

/// Macro to define role requirement types
///
/// Creates zero-sized marker types that implement `RoleRequirement`
macro_rules! define_role_requirements {
    ($($(#[$meta:meta])* $name:ident => [$($role:ident),+ $(,)?]),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy)]
            pub struct $name;

            impl RoleRequirement for $name {
                const ROLES: &'static [Role] = &[$(Role::$role),+];
            }
        )*
    };
}

define_role_requirements! {
    /// System administration, user creation and deletion
    AdminOnly => [Admin],
    /// User listing and reports
    AdminOrDepartmentHead => [Admin, DepartmentHead],
    /// Anyone who handles concerns or writes announcements
    StaffOnly => [Faculty, Staff, DepartmentHead, Admin],
}

/// Extractor that requires one of the roles of `R`
///
/// Returns 403 Forbidden before the handler runs when the role does not match.
#[derive(Debug, Clone)]
pub struct Authorized<R: RoleRequirement>(pub user::Model, PhantomData<R>);

impl<R: RoleRequirement> Authorized<R> {
    /// Get the authenticated user
    pub fn user(&self) -> &user::Model {
        &self.0
    }

    /// Get the user ID
    pub fn user_id(&self) -> i64 {
        self.0.id
    }
}

impl<S, R> FromRequestParts<S> for Authorized<R>
where
    S: Send + Sync,
    R: RoleRequirement,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Unauthorized("Unauthenticated.".to_string()))?;

        if !R::allows(auth_user.0.role) {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }

        Ok(Authorized(auth_user.0.clone(), PhantomData))
    }
}

/// Extractor for any authenticated user, with the claims of their token
#[derive(Debug, Clone)]
pub struct Authenticated(pub user::Model, pub Claims);

impl Authenticated {
    /// Get the authenticated user
    pub fn user(&self) -> &user::Model {
        &self.0
    }

    /// Get the user ID
    pub fn user_id(&self) -> i64 {
        self.0.id
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Unauthorized("Unauthenticated.".to_string()))?;

        Ok(Authenticated(auth_user.0.clone(), auth_user.1.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_requirements() {
        assert!(AdminOnly::allows(Role::Admin));
        assert!(!AdminOnly::allows(Role::DepartmentHead));

        assert!(AdminOrDepartmentHead::allows(Role::DepartmentHead));
        assert!(!AdminOrDepartmentHead::allows(Role::Staff));

        assert!(StaffOnly::allows(Role::Faculty));
        assert!(!StaffOnly::allows(Role::Student));
    }
}
