//! Common test utilities for E2E tests

use bookmarks::{AppState, config};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// A registered and logged-in user
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub token: String,
}

pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub fn test_config(temp_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "test.example.com".to_string(),
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
            session_max_age: 604800,
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
    }
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server after adjusting the default test configuration
    pub async fn with_config(adjust: impl FnOnce(&mut config::AppConfig)) -> Self {
        bookmarks::metrics::init_metrics();

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        adjust(&mut config);

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = bookmarks::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Register `username` through the API and log in
    pub async fn create_user(&self, username: &str) -> TestUser {
        let response = self
            .client
            .post(self.url("/api/accounts/register"))
            .json(&json!({
                "username": username,
                "first_name": username,
                "email": format!("{username}@example.com"),
                "password": TEST_PASSWORD,
                "password2": TEST_PASSWORD,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "registration of {username} failed");
        let account: Value = response.json().await.unwrap();

        let response = self
            .client
            .post(self.url("/api/accounts/login"))
            .json(&json!({ "username": username, "password": TEST_PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "login of {username} failed");
        let login: Value = response.json().await.unwrap();

        TestUser {
            id: account["id"].as_str().unwrap().to_string(),
            username: username.to_string(),
            token: login["token"].as_str().unwrap().to_string(),
        }
    }

    /// Authenticated GET returning the status and JSON body
    pub async fn get_json(&self, user: &TestUser, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&user.token)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Submit a follow/like style form
    pub async fn post_toggle(&self, user: &TestUser, path: &str, id: &str, action: &str) -> (u16, Value) {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&user.token)
            .form(&[("id", id), ("action", action)])
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Bookmark an image and return its JSON representation
    pub async fn create_image(&self, user: &TestUser, title: &str) -> Value {
        let response = self
            .client
            .post(self.url("/api/images"))
            .bearer_auth(&user.token)
            .json(&json!({
                "title": title,
                "url": "https://example.com/images/picture.jpg",
                "description": "",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "image creation failed");
        response.json().await.unwrap()
    }
}
