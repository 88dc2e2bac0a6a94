use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::memory::SlotPolicies;
use crate::services::search::SearchProvider;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub search: Box<dyn SearchProvider>,
    pub policies: SlotPolicies,
}
