//! Bookmarks - image bookmarking with a social graph, activity feed and
//! view ranking
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Accounts, users and follow endpoints                     │
//! │  - Dashboard (activity feed)                                │
//! │  - Image bookmarks, likes and ranking                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Social graph, feed builder, action recorder              │
//! │  - Pagination                                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────────────────────┬──────────────────────────────┐
//! │         Data Layer           │        Ranking Store          │
//! │  - SQLite (sqlx)             │  - Redis sorted set/counters  │
//! │                              │  - in-process fallback        │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `data`: Database layer
//! - `ranking`: View counters and popularity ranking
//! - `auth`: Password and session authentication
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod ranking;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool and the ranking store.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// View counters and popularity ranking
    pub ranking: Arc<dyn ranking::RankingStore>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Validate configuration
    /// 2. Connect to SQLite database (runs migrations)
    /// 3. Connect to the ranking store
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        config.validate()?;

        // 1. Connect to SQLite database
        let db = data::Database::connect_with_pool_size(
            &config.database.path,
            config.database.max_connections,
        )
        .await?;
        tracing::info!(path = %config.database.path.display(), "Database connected");

        // 2. Connect to the ranking store
        let ranking = ranking::connect(&config.ranking).await?;

        let active_users = db.count_active_users().await?;
        metrics::USERS_TOTAL.set(active_users);

        tracing::info!(active_users, "Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            ranking,
        })
    }

    pub fn actions(&self) -> Arc<service::ActionRecorder> {
        Arc::new(service::ActionRecorder::new(
            self.db.clone(),
            self.config.feed.action_dedupe_seconds,
        ))
    }

    pub fn accounts(&self) -> service::AccountService {
        service::AccountService::new(self.db.clone(), self.actions())
    }

    pub fn graph(&self) -> service::SocialGraphService {
        service::SocialGraphService::new(self.db.clone())
    }

    pub fn feed(&self) -> service::FeedService {
        service::FeedService::new(self.db.clone())
    }

    pub fn images(&self) -> service::ImageService {
        service::ImageService::new(
            self.db.clone(),
            self.ranking.clone(),
            self.actions(),
            self.config.ranking.clone(),
            self.config.images.page_size,
        )
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::api_router(state.clone()))
        .merge(api::metrics_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_state() -> (TempDir, AppState) {
        let temp_dir = TempDir::new().unwrap();
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig {
                path: temp_dir.path().join("test.db"),
                max_connections: 4,
            },
            ranking: config::RankingConfig {
                backend: config::RankingBackend::Memory,
                redis_url: None,
                key_prefix: "image".to_string(),
                ranking_key: "image_ranking".to_string(),
                top_n: 10,
                view_weight: 1.0,
                like_weight: 0.0,
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-that-is-32-bytes!".to_string(),
                session_max_age: 3600,
            },
            feed: config::FeedConfig {
                page_size: 10,
                action_dedupe_seconds: 60,
            },
            images: config::ImagesConfig { page_size: 8 },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let state = AppState::new(config).await.unwrap();
        (temp_dir, state)
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (_dir, state) = test_state().await;
        let app = build_router(state);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_session() {
        let (_dir, state) = test_state().await;
        let app = build_router(state);

        let response = app
            .oneshot(Request::get("/api/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
