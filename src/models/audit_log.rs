use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    /// Subject of the action (e.g. "concern", "user")
    pub model_type: Option<String>,
    pub model_id: Option<i64>,
    pub old_values: Option<Json>,
    pub new_values: Option<Json>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Option<Json>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

// Audit action types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    // Authentication
    Login,
    LoginFailed,
    Logout,
    TokenRefresh,
    PasswordResetRequested,
    PasswordReset,

    // Generic CRUD
    Create,
    Update,
    Delete,

    // Concern lifecycle
    StatusChange,
    Assign,
    ConcernMessage,

    // Announcements
    Bookmark,
    RemoveBookmark,

    // Profile
    ProfileUpdate,
    AvatarUpload,

    // AI
    AiChat,
    AiSuggestions,
    AiTranscribe,

    // System
    SettingsUpdated,
    ReportExported,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::Login => write!(f, "login"),
            AuditAction::LoginFailed => write!(f, "login_failed"),
            AuditAction::Logout => write!(f, "logout"),
            AuditAction::TokenRefresh => write!(f, "token_refresh"),
            AuditAction::PasswordResetRequested => write!(f, "password_reset_requested"),
            AuditAction::PasswordReset => write!(f, "password_reset"),
            AuditAction::Create => write!(f, "create"),
            AuditAction::Update => write!(f, "update"),
            AuditAction::Delete => write!(f, "delete"),
            AuditAction::StatusChange => write!(f, "status_change"),
            AuditAction::Assign => write!(f, "assign"),
            AuditAction::ConcernMessage => write!(f, "concern_message"),
            AuditAction::Bookmark => write!(f, "bookmark"),
            AuditAction::RemoveBookmark => write!(f, "remove_bookmark"),
            AuditAction::ProfileUpdate => write!(f, "profile_update"),
            AuditAction::AvatarUpload => write!(f, "avatar_upload"),
            AuditAction::AiChat => write!(f, "ai_chat"),
            AuditAction::AiSuggestions => write!(f, "ai_suggestions"),
            AuditAction::AiTranscribe => write!(f, "ai_transcribe"),
            AuditAction::SettingsUpdated => write!(f, "settings_updated"),
            AuditAction::ReportExported => write!(f, "report_exported"),
        }
    }
}

// Subject types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    User,
    Department,
    Concern,
    Announcement,
    EmergencyContact,
    EmergencyProtocol,
    Notification,
    AiChatSession,
    SystemSetting,
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelType::User => write!(f, "user"),
            ModelType::Department => write!(f, "department"),
            ModelType::Concern => write!(f, "concern"),
            ModelType::Announcement => write!(f, "announcement"),
            ModelType::EmergencyContact => write!(f, "emergency_contact"),
            ModelType::EmergencyProtocol => write!(f, "emergency_protocol"),
            ModelType::Notification => write!(f, "notification"),
            ModelType::AiChatSession => write!(f, "ai_chat_session"),
            ModelType::SystemSetting => write!(f, "system_setting"),
        }
    }
}
