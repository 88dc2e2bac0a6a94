use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use frontdesk::config::AppConfig;
use frontdesk::db;
use frontdesk::handlers;
use frontdesk::services::memory::SlotPolicies;
use frontdesk::services::search::http::HttpSearchProvider;
use frontdesk::services::search::{NoSearch, SearchProvider};
use frontdesk::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let search: Box<dyn SearchProvider> = if config.search_url.is_empty() {
        tracing::warn!("SEARCH_URL not configured, FAQ questions will go unanswered");
        Box::new(NoSearch)
    } else {
        tracing::info!("using HTTP search backend (url: {})", config.search_url);
        Box::new(HttpSearchProvider::new(
            config.search_url.clone(),
            config.search_api_key.clone(),
        ))
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        search,
        policies: SlotPolicies::default(),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/webhook/turn", post(handlers::webhook::turn_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
