use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        seed_departments(db).await?;
        seed_system_settings(db).await?;

        Ok(())
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        // Seeding is not reversible - data may have been modified
        Ok(())
    }
}

async fn seed_departments(db: &SchemaManagerConnection<'_>) -> Result<(), DbErr> {
    use crate::models::department;
    use crate::models::enums::DepartmentType::{Academic, Administrative};

    if department::Entity::find().count(db).await? > 0 {
        return Ok(());
    }

    let now = chrono::Utc::now();

    // (name, code, description, type, email, phone, office)
    let departments = [
        (
            "Administration",
            "ADMIN",
            "College Administration and Management",
            Administrative,
            "admin@bestlink.edu.ph",
            "+63-2-8123-4567",
            "Main Building, 2nd Floor",
        ),
        (
            "BS Information Technology",
            "BSIT",
            "Bachelor of Science in Information Technology",
            Academic,
            "bsit@bestlink.edu.ph",
            "+63-2-8123-4568",
            "IT Building, 1st Floor",
        ),
        (
            "BS Computer Engineering",
            "BSCE",
            "Bachelor of Science in Computer Engineering",
            Academic,
            "bsce@bestlink.edu.ph",
            "+63-2-8123-4569",
            "Engineering Building, 2nd Floor",
        ),
        (
            "BS Business Administration",
            "BSBA",
            "Bachelor of Science in Business Administration",
            Academic,
            "bsba@bestlink.edu.ph",
            "+63-2-8123-4570",
            "Business Building, 1st Floor",
        ),
        (
            "BS Criminology",
            "BSCRIM",
            "Bachelor of Science in Criminology",
            Academic,
            "bscrim@bestlink.edu.ph",
            "+63-2-8123-4571",
            "Criminology Building, 1st Floor",
        ),
        (
            "Bachelor of Elementary Education",
            "BEED",
            "Bachelor of Elementary Education",
            Academic,
            "beed@bestlink.edu.ph",
            "+63-2-8123-4572",
            "Education Building, 2nd Floor",
        ),
        (
            "BS Hospitality Management",
            "BSHM",
            "Bachelor of Science in Hospitality Management",
            Academic,
            "bshm@bestlink.edu.ph",
            "+63-2-8123-4573",
            "Hospitality Building, 1st Floor",
        ),
        (
            "Registrar Office",
            "REG",
            "Student Records and Registration",
            Administrative,
            "registrar@bestlink.edu.ph",
            "+63-2-8123-4574",
            "Main Building, 1st Floor",
        ),
        (
            "MIS Department",
            "MIS",
            "Management Information Systems",
            Administrative,
            "mis@bestlink.edu.ph",
            "+63-2-8123-4575",
            "IT Building, 2nd Floor",
        ),
        (
            "Prefect of Discipline",
            "POD",
            "Student Discipline and Conduct",
            Administrative,
            "pod@bestlink.edu.ph",
            "+63-2-8123-4576",
            "Main Building, 1st Floor",
        ),
        (
            "Library",
            "LIB",
            "College Library and Learning Resources",
            Administrative,
            "library@bestlink.edu.ph",
            "+63-2-8123-4577",
            "Library Building, 1st Floor",
        ),
        (
            "Security",
            "SEC",
            "Campus Security and Safety",
            Administrative,
            "security@bestlink.edu.ph",
            "+63-2-8123-4578",
            "Main Gate, Security Office",
        ),
    ];

    for (name, code, description, department_type, email, phone, office) in departments {
        department::ActiveModel {
            name: Set(name.to_string()),
            code: Set(code.to_string()),
            description: Set(Some(description.to_string())),
            department_type: Set(department_type),
            is_active: Set(true),
            contact_info: Set(Some(serde_json::json!({
                "email": email,
                "phone": phone,
                "office": office,
            }))),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

async fn seed_system_settings(db: &SchemaManagerConnection<'_>) -> Result<(), DbErr> {
    use crate::models::enums::SettingType;
    use crate::models::system_setting;

    if system_setting::Entity::find().count(db).await? > 0 {
        return Ok(());
    }

    let now = chrono::Utc::now();

    let defaults = [
        (
            "maintenance_mode",
            "false",
            "Shown to clients while scheduled maintenance is running",
            true,
        ),
        ("ai_enabled", "true", "Enable the AI assistant endpoints", true),
        ("notifications_enabled", "true", "Send push notifications through Firebase", false),
        ("announcements_enabled", "true", "Allow publishing announcements", true),
    ];

    for (key, value, description, is_public) in defaults {
        system_setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(Some(value.to_string())),
            setting_type: Set(SettingType::Boolean),
            group: Set("general".to_string()),
            description: Set(Some(description.to_string())),
            is_public: Set(is_public),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}
