//! Database tests

use super::*;
use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

async fn create_user(db: &Database, username: &str) -> User {
    let user = User {
        id: EntityId::new().0,
        username: username.to_string(),
        first_name: String::new(),
        last_name: String::new(),
        email: format!("{username}@example.com"),
        password_hash: "not-a-real-hash".to_string(),
        is_active: true,
        date_joined: Utc::now(),
    };
    let profile = Profile {
        user_id: user.id.clone(),
        date_of_birth: None,
        photo: None,
    };
    db.insert_user(&user, &profile).await.unwrap();
    user
}

fn contact(from: &User, to: &User) -> Contact {
    Contact {
        id: EntityId::new().0,
        user_from: from.id.clone(),
        user_to: to.id.clone(),
        created: Utc::now(),
    }
}

fn action_at(user: &User, verb: &str, minute: u32) -> Action {
    Action {
        id: EntityId::new().0,
        user_id: user.id.clone(),
        verb: verb.to_string(),
        target_type: None,
        target_id: None,
        created: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
    }
}

#[tokio::test]
async fn test_database_connection() {
    let (db, _temp_dir) = create_test_db().await;
    db.ping().await.unwrap();
}

#[tokio::test]
async fn test_user_insert_and_lookup() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "alice").await;

    let by_id = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(by_id.username, "alice");

    let by_name = db.get_user_by_username("alice").await.unwrap().unwrap();
    assert_eq!(by_name.id, user.id);

    let profile = db.get_profile(&user.id).await.unwrap();
    assert!(profile.is_some());

    assert!(db.username_in_use("alice").await.unwrap());
    assert!(db.email_in_use("ALICE@example.com", None).await.unwrap());
    assert!(!db.email_in_use("alice@example.com", Some(&user.id)).await.unwrap());
}

#[tokio::test]
async fn test_duplicate_username_rejected() {
    let (db, _temp_dir) = create_test_db().await;
    create_user(&db, "alice").await;

    let duplicate = User {
        id: EntityId::new().0,
        username: "alice".to_string(),
        first_name: String::new(),
        last_name: String::new(),
        email: "other@example.com".to_string(),
        password_hash: "x".to_string(),
        is_active: true,
        date_joined: Utc::now(),
    };
    let profile = Profile {
        user_id: duplicate.id.clone(),
        date_of_birth: None,
        photo: None,
    };
    assert!(db.insert_user(&duplicate, &profile).await.is_err());
    // The transaction must not leave an orphan profile behind
    assert!(db.get_profile(&duplicate.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_user_and_profile() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "alice").await;

    let update = UserUpdate {
        first_name: Some("Alice".to_string()),
        date_of_birth: chrono::NaiveDate::from_ymd_opt(1990, 4, 2),
        ..Default::default()
    };
    assert!(db.update_user(&user.id, &update).await.unwrap());

    let reloaded = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.first_name, "Alice");
    assert_eq!(reloaded.email, "alice@example.com");

    let profile = db.get_profile(&user.id).await.unwrap().unwrap();
    assert_eq!(profile.date_of_birth, chrono::NaiveDate::from_ymd_opt(1990, 4, 2));

    assert!(!db.update_user("missing", &update).await.unwrap());
}

#[tokio::test]
async fn test_deactivated_users_are_not_listed() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    create_user(&db, "bob").await;

    db.set_user_active(&alice.id, false).await.unwrap();

    let active = db.list_active_users().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].username, "bob");
    assert_eq!(db.count_active_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_follow_operations() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;

    assert!(db.insert_contact_if_absent(&contact(&alice, &bob)).await.unwrap());
    assert!(!db.insert_contact_if_absent(&contact(&alice, &bob)).await.unwrap());

    assert_eq!(db.get_followee_ids(&alice.id).await.unwrap(), vec![bob.id.clone()]);
    assert_eq!(db.get_follower_ids(&bob.id).await.unwrap(), vec![alice.id.clone()]);
    assert!(db.is_following(&alice.id, &bob.id).await.unwrap());
    assert!(!db.is_following(&bob.id, &alice.id).await.unwrap());
    assert_eq!(db.count_followers(&bob.id).await.unwrap(), 1);
    assert_eq!(db.count_following(&alice.id).await.unwrap(), 1);

    assert!(db.delete_contact(&alice.id, &bob.id).await.unwrap());
    assert!(!db.delete_contact(&alice.id, &bob.id).await.unwrap());
    assert!(db.get_followee_ids(&alice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_duplicate_follows_leave_one_edge() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;

    let attempts = (0..16).map(|_| {
        let edge = contact(&alice, &bob);
        let db = &db;
        async move { db.insert_contact_if_absent(&edge).await.unwrap() }
    });
    let results = futures::future::join_all(attempts).await;

    assert_eq!(results.iter().filter(|inserted| **inserted).count(), 1);
    assert_eq!(db.count_following(&alice.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_feed_actions_order_and_filters() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let carol = create_user(&db, "carol").await;

    db.insert_action(&action_at(&bob, "b1", 1)).await.unwrap();
    db.insert_action(&action_at(&carol, "c1", 2)).await.unwrap();
    db.insert_action(&action_at(&alice, "a1", 3)).await.unwrap();
    db.insert_action(&action_at(&bob, "b2", 4)).await.unwrap();

    // no followees: everyone but the viewer
    let global = db.get_feed_actions(&alice.id, 10).await.unwrap();
    let verbs: Vec<_> = global.iter().map(|a| a.verb.as_str()).collect();
    assert_eq!(verbs, vec!["b2", "c1", "b1"]);

    let limited = db.get_feed_actions(&alice.id, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].verb, "b2");
    assert!(db.get_feed_actions(&alice.id, 0).await.unwrap().is_empty());

    db.insert_contact_if_absent(&contact(&alice, &bob)).await.unwrap();
    let only_bob = db.get_feed_actions(&alice.id, 10).await.unwrap();
    let verbs: Vec<_> = only_bob.iter().map(|a| a.verb.as_str()).collect();
    assert_eq!(verbs, vec!["b2", "b1"]);
}

#[tokio::test]
async fn test_feed_actions_skip_inactive_users() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let carol = create_user(&db, "carol").await;

    db.insert_action(&action_at(&bob, "b1", 1)).await.unwrap();
    db.insert_action(&action_at(&carol, "c1", 2)).await.unwrap();
    db.insert_contact_if_absent(&contact(&alice, &bob)).await.unwrap();

    db.set_user_active(&bob.id, false).await.unwrap();

    // the only followee is inactive, so the feed falls back to everyone active
    let feed = db.get_feed_actions(&alice.id, 10).await.unwrap();
    let verbs: Vec<_> = feed.iter().map(|a| a.verb.as_str()).collect();
    assert_eq!(verbs, vec!["c1"]);
}

#[tokio::test]
async fn test_similar_action_lookup_respects_target_and_window() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;

    let now = Utc::now();
    let target = TargetRef::User(bob.id.clone());
    db.insert_action(&Action {
        id: EntityId::new().0,
        user_id: alice.id.clone(),
        verb: verbs::FOLLOWING.to_string(),
        target_type: Some(target.kind().to_string()),
        target_id: Some(target.id().to_string()),
        created: now,
    })
    .await
    .unwrap();

    let window_start = now - Duration::seconds(60);
    assert!(
        db.has_similar_action_since(&alice.id, verbs::FOLLOWING, Some(&target), window_start)
            .await
            .unwrap()
    );
    assert!(
        !db.has_similar_action_since(&alice.id, verbs::FOLLOWING, None, window_start)
            .await
            .unwrap()
    );
    assert!(
        !db.has_similar_action_since(
            &alice.id,
            verbs::FOLLOWING,
            Some(&target),
            now + Duration::seconds(1)
        )
        .await
        .unwrap()
    );
}

#[tokio::test]
async fn test_image_crud_and_likes() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;

    let image = Image {
        id: EntityId::new().0,
        user_id: alice.id.clone(),
        title: "Sunset".to_string(),
        slug: "sunset".to_string(),
        url: "https://example.com/sunset.jpg".to_string(),
        description: String::new(),
        created: Utc::now(),
    };
    db.insert_image(&image).await.unwrap();
    assert_eq!(db.count_images().await.unwrap(), 1);

    assert!(db.insert_like(&image.id, &bob.id).await.unwrap());
    assert!(!db.insert_like(&image.id, &bob.id).await.unwrap());
    assert_eq!(db.get_like_user_ids(&image.id).await.unwrap(), vec![bob.id.clone()]);

    let liked = db
        .get_liked_image_ids_batch(&bob.id, &[image.id.clone(), "other".to_string()])
        .await
        .unwrap();
    assert!(liked.contains(&image.id));
    assert_eq!(liked.len(), 1);

    assert!(db.delete_like(&image.id, &bob.id).await.unwrap());
    assert!(db.get_like_user_ids(&image.id).await.unwrap().is_empty());

    db.insert_like(&image.id, &bob.id).await.unwrap();
    assert!(db.delete_image(&image.id).await.unwrap());
    assert!(db.get_image(&image.id).await.unwrap().is_none());
    assert!(db.get_like_user_ids(&image.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_images_page_is_newest_first() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;

    for minute in 0..5 {
        db.insert_image(&Image {
            id: EntityId::new().0,
            user_id: alice.id.clone(),
            title: format!("Image {minute}"),
            slug: format!("image-{minute}"),
            url: format!("https://example.com/{minute}.jpg"),
            description: String::new(),
            created: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
        })
        .await
        .unwrap();
    }

    let first = db.get_images_page(0, 2).await.unwrap();
    let titles: Vec<_> = first.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Image 4", "Image 3"]);

    let last = db.get_images_page(4, 2).await.unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].title, "Image 0");
}
