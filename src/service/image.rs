//! Image service
//!
//! Bookmarked images, likes, view counting and the popularity ranking.
//! Counters and scores live in the ranking store; there is no transaction
//! spanning it and the database, so ranking updates are best-effort
//! relative to the rows they describe.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use validator::Validate;

use crate::config::RankingConfig;
use crate::data::{Database, EntityId, Image, TargetRef, verbs};
use crate::error::AppError;
use crate::metrics::{
    DB_QUERIES_TOTAL, DB_QUERY_DURATION_SECONDS, IMAGE_VIEWS_TOTAL, LIKE_EVENTS_TOTAL,
};
use crate::ranking::RankingStore;
use crate::service::ActionRecorder;
use crate::service::pagination::{PageInfo, PageRequest, Paginator};

/// Accepted image file extensions
const VALID_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Bookmark form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewImage {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// Image detail with its interaction counters
#[derive(Debug, Clone)]
pub struct ImageDetail {
    pub image: Image,
    pub total_views: u64,
    /// IDs of the users who like the image
    pub likes: Vec<String>,
}

/// Image in a list, with the viewer's like state
#[derive(Debug, Clone)]
pub struct ImageListItem {
    pub image: Image,
    pub liked_by_viewer: bool,
}

/// One page of the image list
#[derive(Debug, Clone)]
pub struct ImagePage {
    pub images: Vec<ImageListItem>,
    /// `None` when a partial request ran past the last page
    pub page: Option<PageInfo>,
}

/// Lowercase, ASCII-hyphenated form of a title for use in URLs
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() || c == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_separator = true;
        }
    }

    slug
}

/// Check that `raw` is an absolute http(s) URL pointing at a jpg/jpeg/png
fn validate_image_url(raw: &str) -> Result<url::Url, AppError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| AppError::Validation(format!("invalid url: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::Validation(
            "url must use http or https".to_string(),
        ));
    }

    let extension = parsed
        .path()
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !VALID_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::Validation(
            "The given URL does not match valid image extensions.".to_string(),
        ));
    }

    Ok(parsed)
}

/// Image service
pub struct ImageService {
    db: Arc<Database>,
    ranking: Arc<dyn RankingStore>,
    actions: Arc<ActionRecorder>,
    ranking_config: RankingConfig,
    page_size: usize,
}

impl ImageService {
    /// Create new image service
    pub fn new(
        db: Arc<Database>,
        ranking: Arc<dyn RankingStore>,
        actions: Arc<ActionRecorder>,
        ranking_config: RankingConfig,
        page_size: usize,
    ) -> Self {
        Self {
            db,
            ranking,
            actions,
            ranking_config,
            page_size,
        }
    }

    /// Bookmark an image for `owner_id`
    ///
    /// # Errors
    /// Returns a validation error for an empty title or a URL that is not
    /// an http(s) jpg/jpeg/png
    pub async fn create(&self, owner_id: &str, form: NewImage) -> Result<Image, AppError> {
        form.validate()?;
        let url = validate_image_url(&form.url)?;

        let title = form.title.trim().to_string();
        let slug = slugify(&title);
        if slug.is_empty() {
            return Err(AppError::Validation(
                "title must contain letters or digits".to_string(),
            ));
        }

        let image = Image {
            id: EntityId::new().0,
            user_id: owner_id.to_string(),
            title,
            slug,
            url: url.to_string(),
            description: form.description.trim().to_string(),
            created: chrono::Utc::now(),
        };

        let timer = DB_QUERY_DURATION_SECONDS
            .with_label_values(&["INSERT", "images"])
            .start_timer();
        self.db.insert_image(&image).await?;
        timer.observe_duration();
        DB_QUERIES_TOTAL.with_label_values(&["INSERT", "images"]).inc();

        self.actions
            .record(
                owner_id,
                verbs::BOOKMARKED_IMAGE,
                Some(&TargetRef::Image(image.id.clone())),
            )
            .await?;

        tracing::info!(image_id = %image.id, owner_id, "Image bookmarked");
        Ok(image)
    }

    /// Image detail; counts the view and bumps the image's ranking score
    ///
    /// # Errors
    /// `NotFound` if no image has this id and slug
    pub async fn detail(&self, image_id: &str, slug: &str) -> Result<ImageDetail, AppError> {
        let image = self
            .db
            .get_image(image_id)
            .await?
            .filter(|image| image.slug == slug)
            .ok_or(AppError::NotFound)?;

        let total_views = self.ranking.record_view(&image.id).await?;
        self.ranking
            .bump_rank(&image.id, self.ranking_config.view_weight)
            .await?;
        IMAGE_VIEWS_TOTAL.inc();

        let likes = self.db.get_like_user_ids(&image.id).await?;

        tracing::debug!(image_id = %image.id, total_views, "Image viewed");
        Ok(ImageDetail {
            image,
            total_views,
            likes,
        })
    }

    /// Like (`like == true`) or unlike an image
    ///
    /// Repeated likes and unlikes are absorbed. When the ranking store
    /// rejects the score change, the like row is put back as it was so a
    /// retry applies the whole change again.
    ///
    /// # Returns
    /// `true` if the like state changed
    pub async fn set_like(&self, user_id: &str, image_id: &str, like: bool) -> Result<bool, AppError> {
        let image = self.db.get_image(image_id).await?.ok_or(AppError::NotFound)?;
        let weight = self.ranking_config.like_weight;

        let changed = if like {
            let added = self.db.insert_like(&image.id, user_id).await?;
            if added {
                if weight != 0.0 {
                    if let Err(error) = self.ranking.bump_rank(&image.id, weight).await {
                        self.db.delete_like(&image.id, user_id).await?;
                        return Err(error);
                    }
                }
                LIKE_EVENTS_TOTAL.with_label_values(&["like"]).inc();
                self.actions
                    .record(user_id, verbs::LIKES, Some(&TargetRef::Image(image.id.clone())))
                    .await?;
            }
            added
        } else {
            let removed = self.db.delete_like(&image.id, user_id).await?;
            if removed {
                if weight != 0.0 {
                    if let Err(error) = self.ranking.bump_rank(&image.id, -weight).await {
                        self.db.insert_like(&image.id, user_id).await?;
                        return Err(error);
                    }
                }
                LIKE_EVENTS_TOTAL.with_label_values(&["unlike"]).inc();
            }
            removed
        };

        tracing::info!(user_id, image_id = %image.id, like, changed, "Like updated");
        Ok(changed)
    }

    /// One page of images, newest first
    ///
    /// `raw_page` is the unparsed `page` query value. With `partial`, a page
    /// past the end yields an empty result instead of the last page.
    pub async fn list(
        &self,
        viewer_id: &str,
        raw_page: Option<&str>,
        partial: bool,
    ) -> Result<ImagePage, AppError> {
        let count = self.db.count_images().await?;
        let paginator = Paginator::new(count.max(0) as u64, self.page_size as u64);

        let page = match paginator.resolve(raw_page, partial) {
            PageRequest::Page(page) => page,
            PageRequest::Empty => {
                return Ok(ImagePage {
                    images: Vec::new(),
                    page: None,
                });
            }
        };

        let timer = DB_QUERY_DURATION_SECONDS
            .with_label_values(&["SELECT", "images"])
            .start_timer();
        let images = self
            .db
            .get_images_page(paginator.offset(page), paginator.per_page())
            .await?;
        timer.observe_duration();
        DB_QUERIES_TOTAL.with_label_values(&["SELECT", "images"]).inc();

        let ids: Vec<String> = images.iter().map(|image| image.id.clone()).collect();
        let liked = self.db.get_liked_image_ids_batch(viewer_id, &ids).await?;

        Ok(ImagePage {
            images: images
                .into_iter()
                .map(|image| ImageListItem {
                    liked_by_viewer: liked.contains(&image.id),
                    image,
                })
                .collect(),
            page: Some(paginator.page_info(page)),
        })
    }

    /// Most viewed images in rank order
    ///
    /// Ranked ids with no backing image are skipped.
    pub async fn ranking(&self) -> Result<Vec<Image>, AppError> {
        let ranked_ids = self.ranking.top_n(self.ranking_config.top_n).await?;

        let mut images: HashMap<String, Image> = self
            .db
            .get_images_by_ids(&ranked_ids)
            .await?
            .into_iter()
            .map(|image| (image.id.clone(), image))
            .collect();

        Ok(ranked_ids
            .iter()
            .filter_map(|id| images.remove(id))
            .collect())
    }

    /// Delete an image owned by `user_id` and purge its ranking entries
    ///
    /// # Errors
    /// `NotFound` for an unknown image, `Forbidden` for someone else's
    pub async fn delete(&self, user_id: &str, image_id: &str) -> Result<(), AppError> {
        let image = self.db.get_image(image_id).await?.ok_or(AppError::NotFound)?;
        if image.user_id != user_id {
            return Err(AppError::Forbidden(
                "only the owner can delete an image".to_string(),
            ));
        }

        if !self.db.delete_image(&image.id).await? {
            return Err(AppError::NotFound);
        }

        if let Err(error) = self.ranking.forget(&image.id).await {
            tracing::warn!(image_id = %image.id, %error, "Failed to purge ranking entries");
        }

        tracing::info!(image_id = %image.id, user_id, "Image deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::{MemoryRankingStore, MockRankingStore};
    use crate::service::test_support::{insert_user, test_db};
    use tempfile::TempDir;

    fn ranking_config(like_weight: f64) -> RankingConfig {
        RankingConfig {
            backend: crate::config::RankingBackend::Memory,
            redis_url: None,
            key_prefix: "image".to_string(),
            ranking_key: "image_ranking".to_string(),
            top_n: 10,
            view_weight: 1.0,
            like_weight,
        }
    }

    fn service_with(
        db: Arc<Database>,
        ranking: Arc<dyn RankingStore>,
        like_weight: f64,
    ) -> ImageService {
        let actions = Arc::new(ActionRecorder::new(db.clone(), 60));
        ImageService::new(db, ranking, actions, ranking_config(like_weight), 8)
    }

    async fn setup() -> (TempDir, Arc<Database>, Arc<MemoryRankingStore>) {
        let (dir, db) = test_db().await;
        insert_user(&db, "alice").await;
        insert_user(&db, "bob").await;
        (dir, db, Arc::new(MemoryRankingStore::default()))
    }

    fn form(title: &str) -> NewImage {
        NewImage {
            title: title.to_string(),
            url: "https://example.com/photos/cat.JPG".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  multiple   spaces -- here "), "multiple-spaces-here");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn image_url_extension_is_checked() {
        assert!(validate_image_url("https://example.com/a.png").is_ok());
        assert!(validate_image_url("https://example.com/a.jpeg?size=l").is_ok());
        assert!(validate_image_url("https://example.com/a.gif").is_err());
        assert!(validate_image_url("https://example.com/noext").is_err());
        assert!(validate_image_url("ftp://example.com/a.png").is_err());
        assert!(validate_image_url("not a url").is_err());
    }

    #[tokio::test]
    async fn create_records_bookmark_action() {
        let (_dir, db, ranking) = setup().await;
        let images = service_with(db.clone(), ranking, 0.0);

        let image = images.create("alice", form("My Cat")).await.unwrap();
        assert_eq!(image.slug, "my-cat");

        let actions = db.get_feed_actions("bob", 10).await.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].verb, verbs::BOOKMARKED_IMAGE);
        assert_eq!(actions[0].target(), Some(TargetRef::Image(image.id.clone())));
    }

    #[tokio::test]
    async fn detail_counts_views_and_ranks() {
        let (_dir, db, ranking) = setup().await;
        let images = service_with(db, ranking.clone(), 0.0);
        let image = images.create("alice", form("Cat")).await.unwrap();

        for expected in 1..=3 {
            let detail = images.detail(&image.id, "cat").await.unwrap();
            assert_eq!(detail.total_views, expected);
        }

        assert_eq!(ranking.view_count(&image.id).await.unwrap(), 3);
        assert!(matches!(
            images.detail(&image.id, "wrong-slug").await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn ranking_follows_scores_and_skips_deleted_images() {
        let (_dir, db, ranking) = setup().await;
        let images = service_with(db, ranking.clone(), 0.0);
        let x = images.create("alice", form("X")).await.unwrap();
        let y = images.create("alice", form("Y")).await.unwrap();
        let z = images.create("alice", form("Z")).await.unwrap();

        ranking.bump_rank(&x.id, 5.0).await.unwrap();
        ranking.bump_rank(&y.id, 3.0).await.unwrap();
        ranking.bump_rank(&z.id, 9.0).await.unwrap();
        ranking.bump_rank("ghost", 7.0).await.unwrap();

        let ranked: Vec<String> = images
            .ranking()
            .await
            .unwrap()
            .into_iter()
            .map(|image| image.id)
            .collect();
        assert_eq!(ranked, vec![z.id, x.id, y.id]);
    }

    #[tokio::test]
    async fn likes_are_idempotent_and_weighted() {
        let (_dir, db, ranking) = setup().await;
        let images = service_with(db.clone(), ranking.clone(), 2.0);
        let image = images.create("alice", form("Cat")).await.unwrap();

        assert!(images.set_like("bob", &image.id, true).await.unwrap());
        assert!(!images.set_like("bob", &image.id, true).await.unwrap());
        assert_eq!(db.get_like_user_ids(&image.id).await.unwrap(), vec!["bob"]);
        assert_eq!(ranking.bump_rank(&image.id, 0.0).await.unwrap(), 2.0);

        assert!(images.set_like("bob", &image.id, false).await.unwrap());
        assert!(!images.set_like("bob", &image.id, false).await.unwrap());
        assert_eq!(ranking.bump_rank(&image.id, 0.0).await.unwrap(), 0.0);

        assert!(matches!(
            images.set_like("bob", "missing", true).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_paginates_and_marks_likes() {
        let (_dir, db, ranking) = setup().await;
        let images = service_with(db, ranking, 0.0);
        let mut created = Vec::new();
        for i in 0..20 {
            created.push(images.create("alice", form(&format!("Image {i}"))).await.unwrap());
        }
        images.set_like("bob", &created[19].id, true).await.unwrap();

        let first = images.list("bob", Some("abc"), false).await.unwrap();
        assert_eq!(first.page.unwrap().page, 1);
        assert_eq!(first.images.len(), 8);
        assert!(first.images[0].liked_by_viewer);
        assert!(!first.images[1].liked_by_viewer);

        let last = images.list("bob", Some("99"), false).await.unwrap();
        assert_eq!(last.page.unwrap().page, 3);
        assert_eq!(last.images.len(), 4);

        let partial = images.list("bob", Some("99"), true).await.unwrap();
        assert!(partial.images.is_empty());
        assert!(partial.page.is_none());
    }

    #[tokio::test]
    async fn delete_requires_owner_and_purges_ranking() {
        let (_dir, db, ranking) = setup().await;
        let images = service_with(db.clone(), ranking.clone(), 0.0);
        let image = images.create("alice", form("Cat")).await.unwrap();
        images.detail(&image.id, "cat").await.unwrap();

        assert!(matches!(
            images.delete("bob", &image.id).await,
            Err(AppError::Forbidden(_))
        ));

        images.delete("alice", &image.id).await.unwrap();
        assert!(db.get_image(&image.id).await.unwrap().is_none());
        assert_eq!(ranking.view_count(&image.id).await.unwrap(), 0);
        assert!(ranking.top_n(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_ranking_store_fails_detail() {
        let (_dir, db) = test_db().await;
        insert_user(&db, "alice").await;

        let mut mock = MockRankingStore::new();
        mock.expect_record_view()
            .returning(|_| Err(AppError::RankingUnavailable("connection refused".to_string())));
        mock.expect_bump_rank().never();

        let images = service_with(db, Arc::new(mock), 0.0);
        let image = images.create("alice", form("Cat")).await.unwrap();

        assert!(matches!(
            images.detail(&image.id, "cat").await,
            Err(AppError::RankingUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn delete_survives_ranking_purge_failure() {
        let (_dir, db) = test_db().await;
        insert_user(&db, "alice").await;

        let mut mock = MockRankingStore::new();
        mock.expect_forget()
            .times(1)
            .returning(|_| Err(AppError::RankingUnavailable("timed out".to_string())));

        let images = service_with(db.clone(), Arc::new(mock), 0.0);
        let image = images.create("alice", form("Cat")).await.unwrap();

        images.delete("alice", &image.id).await.unwrap();
        assert!(db.get_image(&image.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_rank_bump_leaves_like_retryable() {
        let (_dir, db) = test_db().await;
        insert_user(&db, "alice").await;
        insert_user(&db, "bob").await;

        let mut calls = 0;
        let mut mock = MockRankingStore::new();
        mock.expect_bump_rank().times(2).returning(move |_, delta| {
            calls += 1;
            if calls == 1 {
                Err(AppError::RankingUnavailable("down".to_string()))
            } else {
                Ok(delta)
            }
        });

        let images = service_with(db.clone(), Arc::new(mock), 2.0);
        let image = images.create("alice", form("Cat")).await.unwrap();

        assert!(matches!(
            images.set_like("bob", &image.id, true).await,
            Err(AppError::RankingUnavailable(_))
        ));
        assert!(db.get_like_user_ids(&image.id).await.unwrap().is_empty());

        assert!(images.set_like("bob", &image.id, true).await.unwrap());
        assert_eq!(db.get_like_user_ids(&image.id).await.unwrap(), vec!["bob"]);

        let likes: Vec<_> = db
            .get_feed_actions("alice", 10)
            .await
            .unwrap()
            .into_iter()
            .filter(|action| action.verb == verbs::LIKES)
            .collect();
        assert_eq!(likes.len(), 1);
    }

    #[tokio::test]
    async fn failed_rank_bump_restores_unliked_row() {
        let (_dir, db) = test_db().await;
        insert_user(&db, "alice").await;
        insert_user(&db, "bob").await;

        let mut mock = MockRankingStore::new();
        mock.expect_bump_rank().returning(|_, delta| {
            if delta < 0.0 {
                Err(AppError::RankingUnavailable("down".to_string()))
            } else {
                Ok(delta)
            }
        });

        let images = service_with(db.clone(), Arc::new(mock), 2.0);
        let image = images.create("alice", form("Cat")).await.unwrap();
        images.set_like("bob", &image.id, true).await.unwrap();

        assert!(images.set_like("bob", &image.id, false).await.is_err());
        assert_eq!(db.get_like_user_ids(&image.id).await.unwrap(), vec!["bob"]);
    }
}
