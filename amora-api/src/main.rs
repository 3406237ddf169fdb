use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    routing::{get, post, put},
    Router,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

mod config;
mod models;
mod routes;
mod schema;
mod services;

use amora_shared::clients::chat::ChatClient;
use amora_shared::clients::db::{create_pool, DbPool};
use amora_shared::clients::storage::UploadStore;
use config::AppConfig;
use services::matching::MatchScorer;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

const MAX_UPLOAD_BODY_BYTES: usize = 50 * 1024 * 1024;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub storage: UploadStore,
    pub scorer: MatchScorer,
}

fn build_cors(origins: &str) -> CorsLayer {
    if origins.trim() == "*" {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    amora_shared::middleware::init_tracing("amora-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url);
    {
        let mut conn = db.get()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;
    }

    let storage = UploadStore::new(&config.upload_dir);
    storage.init().await.map_err(|e| anyhow::anyhow!(e))?;

    let chat = ChatClient::new(
        &config.openai_base_url,
        &config.openai_api_key,
        &config.chat_model,
        config.scoring.request_timeout_secs,
    );
    let scorer = MatchScorer::new(chat, storage.clone(), config.scoring.clone());

    let cors = build_cors(&config.cors_origins);
    let upload_root = config.upload_dir.clone();

    let state = Arc::new(AppState { db, config, storage, scorer });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        // auth
        .route("/api/auth/register", post(routes::auth::register::register))
        .route("/api/auth/login", post(routes::auth::login::login))
        .route("/api/auth/refresh", post(routes::auth::refresh::refresh_token))
        .route("/api/auth/logout", post(routes::auth::logout::logout))
        .route("/api/auth/me", get(routes::auth::me::me))
        // profiles
        .route(
            "/api/profiles",
            post(routes::profiles::create_profile)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route(
            "/api/profiles/me",
            get(routes::profiles::get_my_profile).put(routes::profiles::update_my_profile),
        )
        .route(
            "/api/profiles/me/photos",
            put(routes::profiles::replace_photos)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route("/api/profiles/:user_id", get(routes::profiles::get_user_profile))
        // expectations
        .route(
            "/api/expectations",
            post(routes::expectations::create_expectation)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route(
            "/api/expectations/me",
            get(routes::expectations::get_my_expectation)
                .put(routes::expectations::update_my_expectation),
        )
        .route(
            "/api/expectations/me/ideal-photos",
            put(routes::expectations::replace_ideal_photos)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        // matches
        .route("/api/matches/generate", post(routes::matches::generate_matches))
        .route("/api/matches", get(routes::matches::list_matches))
        .route("/api/matches/stats", get(routes::matches::match_stats))
        .route("/api/matches/:match_id/analysis", get(routes::matches::get_match_analysis))
        .route("/api/matches/:match_id/view", put(routes::matches::mark_viewed))
        // admin
        .route("/api/admin/stats", get(routes::admin::get_stats))
        .route("/api/admin/users", get(routes::admin::list_users))
        .route("/api/admin/users/:user_id/active", put(routes::admin::set_user_active))
        .route("/api/admin/backup", post(routes::admin::create_backup))
        // uploaded files are served read-only
        .nest_service("/static", ServeDir::new(upload_root))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "amora-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
