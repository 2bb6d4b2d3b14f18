//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Users
// =============================================================================

/// A registered user
///
/// Users are never hard-deleted; deactivation clears `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

/// Per-user profile, created alongside the user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub user_id: String,
    pub date_of_birth: Option<NaiveDate>,
    /// Stored photo reference (path or URL)
    pub photo: Option<String>,
}

// =============================================================================
// Follow relationships
// =============================================================================

/// Directed follow edge: `user_from` receives `user_to`'s activity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: String,
    pub user_from: String,
    pub user_to: String,
    pub created: DateTime<Utc>,
}

// =============================================================================
// Activity
// =============================================================================

/// Immutable activity log entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Action {
    pub id: String,
    /// Actor
    pub user_id: String,
    pub verb: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub created: DateTime<Utc>,
}

impl Action {
    pub fn target(&self) -> Option<TargetRef> {
        TargetRef::from_parts(self.target_type.as_deref(), self.target_id.as_deref())
    }
}

/// Reference to the object an action was performed on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetRef {
    User(String),
    Image(String),
}

impl TargetRef {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Image(_) => "image",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::User(id) | Self::Image(id) => id,
        }
    }

    pub fn from_parts(kind: Option<&str>, id: Option<&str>) -> Option<Self> {
        match (kind?, id?) {
            ("user", id) => Some(Self::User(id.to_string())),
            ("image", id) => Some(Self::Image(id.to_string())),
            _ => None,
        }
    }
}

/// Verbs written to the activity log
pub mod verbs {
    pub const CREATED_ACCOUNT: &str = "has created an account";
    pub const FOLLOWING: &str = "is following";
    pub const BOOKMARKED_IMAGE: &str = "bookmarked image";
    pub const LIKES: &str = "likes";
}

// =============================================================================
// Images
// =============================================================================

/// A bookmarked image
///
/// View counts and ranking scores are kept in the ranking store,
/// keyed by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Image {
    pub id: String,
    /// Owner
    pub user_id: String,
    pub title: String,
    pub slug: String,
    /// Source URL the image was bookmarked from
    pub url: String,
    pub description: String,
    pub created: DateTime<Utc>,
}
