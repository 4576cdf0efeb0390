use std::sync::Arc;

use crate::config::openai::OpenAiConfig;
use crate::config::CONFIG;
use crate::db::DbConn;
use crate::services::{
    AuditService, FirebaseService, NotificationService, OpenAiService, PushProvider,
};

/// Application state containing all shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DbConn,
    pub audit: AuditService,
    pub notification: NotificationService,
    pub openai: OpenAiService,
}

impl AppState {
    /// Build the state from the global configuration
    pub fn new(db: DbConn) -> Self {
        let push = FirebaseService::from_config(&CONFIG.firebase)
            .map(|service| Arc::new(service) as Arc<dyn PushProvider>);

        if push.is_some() {
            tracing::info!("Firebase push notifications enabled");
        } else {
            tracing::info!("Firebase not configured, push notifications disabled");
        }

        Self::with_services(db, push, CONFIG.openai.clone())
    }

    /// Build the state with explicit push and OpenAI settings
    pub fn with_services(
        db: DbConn,
        push: Option<Arc<dyn PushProvider>>,
        openai: OpenAiConfig,
    ) -> Self {
        Self {
            audit: AuditService::new(db.clone()),
            notification: NotificationService::new(db.clone(), push),
            openai: OpenAiService::new(openai),
            db,
        }
    }
}
