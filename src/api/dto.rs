//! API request and response DTOs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Image, Profile, User};
use crate::service::{
    ActorSummary, FeedEntry, FeedTarget, ImageDetail, ImageListItem, PageInfo, UserDetail,
};

// =============================================================================
// Requests
// =============================================================================

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Follow/unfollow and like/unlike form
///
/// `action` is `follow`/`like` to add the relation; anything else removes it.
#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub id: String,
    pub action: String,
}

/// Image list query
#[derive(Debug, Deserialize)]
pub struct ImageListQuery {
    /// Raw page value; non-numeric values fall back to the first page
    pub page: Option<String>,
    /// Any non-empty value asks for a partial (incremental) page
    pub images_only: Option<String>,
}

impl ImageListQuery {
    pub fn is_partial(&self) -> bool {
        self.images_only
            .as_deref()
            .is_some_and(|value| !value.is_empty())
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Outcome of a follow or like request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    pub fn error() -> Self {
        Self {
            status: "error".to_string(),
        }
    }
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub photo: Option<String>,
    pub date_joined: DateTime<Utc>,
}

impl UserResponse {
    pub fn new(user: &User, profile: Option<&Profile>) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            photo: profile.and_then(|p| p.photo.clone()),
            date_joined: user.date_joined,
        }
    }
}

/// The signed-in user's own account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    pub photo: Option<String>,
    pub date_joined: DateTime<Utc>,
}

impl AccountResponse {
    pub fn new(user: &User, profile: Option<&Profile>) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            date_of_birth: profile.and_then(|p| p.date_of_birth),
            photo: profile.and_then(|p| p.photo.clone()),
            date_joined: user.date_joined,
        }
    }
}

/// Login result; the token is also set as the `session` cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub account: AccountResponse,
}

/// User detail with follow counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetailResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub followers: i64,
    pub following: i64,
    /// Whether the requesting user follows this user
    pub is_following: bool,
}

impl From<UserDetail> for UserDetailResponse {
    fn from(detail: UserDetail) -> Self {
        Self {
            user: UserResponse::new(&detail.user, detail.profile.as_ref()),
            followers: detail.followers,
            following: detail.following,
            is_following: detail.followed_by_viewer,
        }
    }
}

/// Bookmarked image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub slug: String,
    pub url: String,
    pub description: String,
    pub created: DateTime<Utc>,
    /// Whether the requesting user likes the image (list views only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
}

impl From<Image> for ImageResponse {
    fn from(image: Image) -> Self {
        Self {
            id: image.id,
            user_id: image.user_id,
            title: image.title,
            slug: image.slug,
            url: image.url,
            description: image.description,
            created: image.created,
            liked: None,
        }
    }
}

impl From<ImageListItem> for ImageResponse {
    fn from(item: ImageListItem) -> Self {
        Self {
            liked: Some(item.liked_by_viewer),
            ..Self::from(item.image)
        }
    }
}

/// Image detail with counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDetailResponse {
    #[serde(flatten)]
    pub image: ImageResponse,
    pub total_views: u64,
    pub total_likes: usize,
    /// IDs of the users who like the image
    pub likes: Vec<String>,
}

impl From<ImageDetail> for ImageDetailResponse {
    fn from(detail: ImageDetail) -> Self {
        Self {
            image: ImageResponse::from(detail.image),
            total_views: detail.total_views,
            total_likes: detail.likes.len(),
            likes: detail.likes,
        }
    }
}

/// One page of images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePageResponse {
    pub images: Vec<ImageResponse>,
    /// Absent when a partial request ran past the last page
    pub page: Option<PageInfoResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfoResponse {
    pub page: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl From<PageInfo> for PageInfoResponse {
    fn from(info: PageInfo) -> Self {
        Self {
            page: info.page,
            num_pages: info.num_pages,
            count: info.count,
            has_next: info.has_next,
            has_previous: info.has_previous,
        }
    }
}

/// Actor shown next to a feed entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorResponse {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub photo: Option<String>,
}

impl From<ActorSummary> for ActorResponse {
    fn from(actor: ActorSummary) -> Self {
        Self {
            id: actor.id,
            username: actor.username,
            first_name: actor.first_name,
            last_name: actor.last_name,
            photo: actor.photo,
        }
    }
}

/// Resolved target of a feed entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TargetResponse {
    User(ActorResponse),
    Image(ImageResponse),
}

/// Activity feed entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntryResponse {
    pub id: String,
    pub verb: String,
    pub created: DateTime<Utc>,
    pub actor: Option<ActorResponse>,
    pub target: Option<TargetResponse>,
}

impl From<FeedEntry> for FeedEntryResponse {
    fn from(entry: FeedEntry) -> Self {
        Self {
            id: entry.action.id,
            verb: entry.action.verb,
            created: entry.action.created,
            actor: entry.actor.map(ActorResponse::from),
            target: entry.target.map(|target| match target {
                FeedTarget::User(user) => TargetResponse::User(user.into()),
                FeedTarget::Image(image) => TargetResponse::Image(image.into()),
            }),
        }
    }
}

/// Dashboard response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub actions: Vec<FeedEntryResponse>,
}
