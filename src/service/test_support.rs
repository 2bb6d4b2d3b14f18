//! Fixtures shared by service tests

use std::sync::Arc;

use tempfile::TempDir;

use crate::data::{Database, Profile, User};

pub(crate) async fn test_db() -> (TempDir, Arc<Database>) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::connect(&temp_dir.path().join("test.db"))
        .await
        .unwrap();
    (temp_dir, Arc::new(db))
}

/// Insert an active user whose id equals its username
pub(crate) async fn insert_user(db: &Database, username: &str) -> User {
    let user = User {
        id: username.to_string(),
        username: username.to_string(),
        first_name: String::new(),
        last_name: String::new(),
        email: format!("{username}@example.com"),
        password_hash: String::new(),
        is_active: true,
        date_joined: chrono::Utc::now(),
    };
    let profile = Profile {
        user_id: user.id.clone(),
        date_of_birth: None,
        photo: None,
    };
    db.insert_user(&user, &profile).await.unwrap();
    user
}
