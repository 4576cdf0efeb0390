pub mod analytics;
pub mod audit;
pub mod bootstrap;
pub mod firebase;
pub mod notification;
pub mod openai;
pub mod security;
pub mod sequence;
pub mod settings;

pub use audit::{AuditEntry, AuditService, RequestOrigin};
pub use firebase::FirebaseService;
pub use notification::{NewNotification, NotificationService, PushProvider};
pub use openai::OpenAiService;
pub use security::*;
