use std::env;

#[derive(Debug, Clone, Default)]
pub struct FirebaseConfig {
    pub project_id: Option<String>,
    pub client_email: Option<String>,
    /// PEM encoded service account key. Escaped `\n` sequences are unescaped.
    pub private_key: Option<String>,
}

impl FirebaseConfig {
    pub fn from_env() -> Self {
        Self {
            project_id: env::var("FIREBASE_PROJECT_ID").ok().filter(|v| !v.is_empty()),
            client_email: env::var("FIREBASE_CLIENT_EMAIL").ok().filter(|v| !v.is_empty()),
            private_key: env::var("FIREBASE_PRIVATE_KEY")
                .ok()
                .filter(|v| !v.is_empty())
                .map(|v| v.replace("\\n", "\n")),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.project_id.is_some() && self.client_email.is_some() && self.private_key.is_some()
    }
}
