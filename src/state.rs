use crate::config::AppConfig;
use crate::diet::sessions::SessionStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let sessions = SessionStore::new(config.max_sessions, config.session_ttl());
        Self { config, sessions }
    }

    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            max_sessions: 16,
            max_body_bytes: 64 * 1024,
            session_ttl_secs: 60,
        });
        Self::from_config(config)
    }
}
