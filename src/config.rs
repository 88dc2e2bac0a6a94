use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub webhook_secret: String,
    pub search_url: String,
    pub search_api_key: String,
    pub agent_handoff_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "frontdesk.db".to_string()),
            webhook_secret: env::var("WEBHOOK_SECRET").unwrap_or_default(),
            search_url: env::var("SEARCH_URL").unwrap_or_default(),
            search_api_key: env::var("SEARCH_API_KEY").unwrap_or_default(),
            agent_handoff_url: env::var("AGENT_HANDOFF_URL").unwrap_or_default(),
        }
    }
}
