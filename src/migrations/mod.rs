pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_departments;
mod m20250601_000002_create_users;
mod m20250601_000003_create_facilities;
mod m20250601_000004_create_concerns;
mod m20250601_000005_create_concern_messages;
mod m20250601_000006_create_announcements;
mod m20250601_000007_create_announcement_bookmarks;
mod m20250601_000008_create_emergency_tables;
mod m20250601_000009_create_notifications;
mod m20250601_000010_create_audit_logs;
mod m20250601_000011_create_ai_chat_sessions;
mod m20250601_000012_create_system_settings;
mod m20250601_000013_create_sequence_counters;
mod m20250601_000014_create_auth_tokens;
mod m20250601_000015_seed_defaults;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_departments::Migration),
            Box::new(m20250601_000002_create_users::Migration),
            Box::new(m20250601_000003_create_facilities::Migration),
            Box::new(m20250601_000004_create_concerns::Migration),
            Box::new(m20250601_000005_create_concern_messages::Migration),
            Box::new(m20250601_000006_create_announcements::Migration),
            Box::new(m20250601_000007_create_announcement_bookmarks::Migration),
            Box::new(m20250601_000008_create_emergency_tables::Migration),
            Box::new(m20250601_000009_create_notifications::Migration),
            Box::new(m20250601_000010_create_audit_logs::Migration),
            Box::new(m20250601_000011_create_ai_chat_sessions::Migration),
            Box::new(m20250601_000012_create_system_settings::Migration),
            Box::new(m20250601_000013_create_sequence_counters::Migration),
            Box::new(m20250601_000014_create_auth_tokens::Migration),
            Box::new(m20250601_000015_seed_defaults::Migration),
        ]
    }
}
