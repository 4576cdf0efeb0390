//! First-run provisioning of the administrator account.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::config::auth::AuthConfig;
use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::models::enums::Role;
use crate::models::user;
use crate::services::security::hash_password;

/// Check if any user with the admin role exists
pub async fn admin_user_exists(db: &DbConn) -> Result<bool> {
    let admin = user::Entity::find()
        .filter(user::Column::Role.eq(Role::Admin))
        .one(db)
        .await?;
    Ok(admin.is_some())
}

/// Create the configured administrator when no admin exists yet.
///
/// Returns the created user, or `None` when nothing had to be done.
pub async fn ensure_admin(db: &DbConn, config: &AuthConfig) -> Result<Option<user::Model>> {
    let (Some(email), Some(password)) = (
        config.bootstrap_admin_email.as_deref(),
        config.bootstrap_admin_password.as_deref(),
    ) else {
        return Ok(None);
    };

    if admin_user_exists(db).await? {
        return Ok(None);
    }

    if password.len() < 8 {
        return Err(AppError::BadRequest(
            "Bootstrap admin password must be at least 8 characters".to_string(),
        ));
    }

    let email = email.trim().to_lowercase();
    let taken = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict(format!(
            "Cannot create admin: email {} is already used",
            email
        )));
    }

    let now = Utc::now();
    let admin = user::ActiveModel {
        student_id: Set(None),
        employee_id: Set(Some("ADMIN-001".to_string())),
        name: Set(config.bootstrap_admin_name.clone()),
        email: Set(email),
        password: Set(hash_password(password)?),
        role: Set(Role::Admin),
        department_id: Set(None),
        phone: Set(None),
        avatar: Set(None),
        preferences: Set(None),
        is_active: Set(true),
        last_login_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Created bootstrap administrator {}", admin.email);
    Ok(Some(admin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_db;

    fn config(email: Option<&str>, password: Option<&str>) -> AuthConfig {
        AuthConfig {
            jwt_secret: None,
            jwt_ttl_seconds: 3600,
            bcrypt_cost: 4,
            reset_token_ttl_minutes: 60,
            bootstrap_admin_email: email.map(String::from),
            bootstrap_admin_password: password.map(String::from),
            bootstrap_admin_name: "System Administrator".to_string(),
        }
    }

    #[tokio::test]
    async fn test_nothing_configured() {
        let db = create_test_db().await;
        assert!(ensure_admin(&db, &config(None, None)).await.unwrap().is_none());
        assert!(!admin_user_exists(&db).await.unwrap());
    }

    #[tokio::test]
    async fn test_admin_created_once() {
        let db = create_test_db().await;
        let cfg = config(Some("Admin@Bestlink.edu.ph"), Some("change-me-now"));

        let created = ensure_admin(&db, &cfg).await.unwrap().unwrap();
        assert_eq!(created.email, "admin@bestlink.edu.ph");
        assert_eq!(created.role, Role::Admin);
        assert!(admin_user_exists(&db).await.unwrap());

        assert!(ensure_admin(&db, &cfg).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_short_password_rejected() {
        let db = create_test_db().await;
        let result = ensure_admin(&db, &config(Some("a@b.c"), Some("short"))).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
