//! Test helpers for unit tests inside the crate.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;

use crate::migrations::Migrator;
use crate::models::enums::Role;
use crate::models::user;

/// Create an in-memory SQLite database with all migrations applied
pub async fn create_test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).sqlx_logging(false);

    let db = Database::connect(opts)
        .await
        .expect("Failed to create test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run test migrations");

    db
}

/// Insert an active user with the password "password123"
pub async fn insert_user(
    db: &DatabaseConnection,
    email: &str,
    role: Role,
    department_id: Option<i64>,
) -> user::Model {
    let now = Utc::now();
    let local = email.split('@').next().unwrap_or(email);

    user::ActiveModel {
        student_id: Set(role.is_student().then(|| format!("S-{}", local))),
        employee_id: Set((!role.is_student()).then(|| format!("E-{}", local))),
        name: Set(format!("Test {}", local)),
        email: Set(email.to_string()),
        password: Set(bcrypt::hash("password123", 4).expect("hash")),
        role: Set(role),
        department_id: Set(department_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert test user")
}
