pub mod ai_chat_session;
pub mod announcement;
pub mod announcement_bookmark;
pub mod announcement_department;
pub mod audit_log;
pub mod concern;
pub mod concern_message;
pub mod department;
pub mod emergency_contact;
pub mod emergency_protocol;
pub mod enums;
pub mod facility;
pub mod fcm_token;
pub mod notification;
pub mod password_reset_token;
pub mod revoked_token;
pub mod sequence_counter;
pub mod system_setting;
pub mod user;

#[allow(unused_imports)]
pub mod prelude {
    pub use super::ai_chat_session::{self, Entity as AiChatSession};
    pub use super::announcement::{self, Entity as Announcement};
    pub use super::announcement_bookmark::{self, Entity as AnnouncementBookmark};
    pub use super::announcement_department::{self, Entity as AnnouncementDepartment};
    pub use super::audit_log::{self, Entity as AuditLog};
    pub use super::concern::{self, Entity as Concern};
    pub use super::concern_message::{self, Entity as ConcernMessage};
    pub use super::department::{self, Entity as Department};
    pub use super::emergency_contact::{self, Entity as EmergencyContact};
    pub use super::emergency_protocol::{self, Entity as EmergencyProtocol};
    pub use super::facility::{self, Entity as Facility};
    pub use super::fcm_token::{self, Entity as FcmToken};
    pub use super::notification::{self, Entity as Notification};
    pub use super::password_reset_token::{self, Entity as PasswordResetToken};
    pub use super::revoked_token::{self, Entity as RevokedToken};
    pub use super::sequence_counter::{self, Entity as SequenceCounter};
    pub use super::system_setting::{self, Entity as SystemSetting};
    pub use super::user::{self, Entity as User};
}
