mod common;

use chrono::Duration;
use shelfwise_common::recommend::{Reason, Recommendation};
use shelfwise_common::{Database, NewShelf, ReadingStatus, RecommendationRequest, User};

struct Library {
    db: Database,
    ana: User,
    hyperion: i64,
    children_of_dune: i64,
    emma: i64,
}

/// Ana has read Dune; Ben loved Emma.
async fn library() -> Library {
    let db = common::database().await;
    let ana = common::reader(&db, "ana").await;
    let ben = common::reader(&db, "ben").await;

    let dune = common::book(&db, "Dune", "Frank Herbert", "Science Fiction").await;
    let hyperion = common::book(&db, "Hyperion", "Dan Simmons", "Science Fiction").await;
    let children = common::book(&db, "Children of Dune", "Frank Herbert", "Science Fiction").await;
    let emma = common::book(&db, "Emma", "Jane Austen", "Classics").await;

    db.update_progress(&ana, dune.book.id, &common::finished(4)).await.unwrap();
    db.update_progress(&ben, emma.book.id, &common::finished(5)).await.unwrap();

    Library {
        db,
        ana,
        hyperion: hyperion.book.id,
        children_of_dune: children.book.id,
        emma: emma.book.id,
    }
}

fn request(user: &User) -> RecommendationRequest {
    RecommendationRequest {
        user_id: user.id,
        ..Default::default()
    }
}

fn ids(list: &[Recommendation]) -> Vec<i64> {
    list.iter().map(|r| r.book_id).collect()
}

#[tokio::test]
async fn affinity_picks_come_before_fallbacks() {
    let lib = library().await;

    let list = lib.db.recommendations(&request(&lib.ana), Duration::hours(24)).await;

    assert_eq!(ids(&list), vec![lib.hyperion, lib.children_of_dune, lib.emma]);
    assert_eq!(
        list[0].reason,
        Reason::Genre {
            genre: "Science Fiction".into()
        }
    );
    assert_eq!(list[0].score, 0.8);
    assert_eq!(list[1].score, 0.79);
    assert_eq!(list[2].reason, Reason::HighlyRated);
    assert_eq!(list[2].score, 0.6);
    assert_eq!(list.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[tokio::test]
async fn known_and_excluded_books_are_skipped() {
    let lib = library().await;
    lib.db
        .update_progress(&lib.ana, lib.emma, &common::status(ReadingStatus::WantToRead))
        .await
        .unwrap();

    let req = RecommendationRequest {
        exclude: vec![lib.hyperion],
        refresh: true,
        ..request(&lib.ana)
    };
    let list = lib.db.recommendations(&req, Duration::hours(24)).await;

    assert_eq!(ids(&list), vec![lib.children_of_dune]);
    assert_eq!(list[0].rank, 1);
}

#[tokio::test]
async fn cached_lists_are_reused_until_refreshed() {
    let lib = library().await;
    let ttl = Duration::hours(24);
    let first = lib.db.recommendations(&request(&lib.ana), ttl).await;
    assert_eq!(first.len(), 3);

    let foundation = common::book(&lib.db, "Foundation", "Isaac Asimov", "Science Fiction").await;

    // smaller request with an exclusion is served from the cached list
    let narrowed = RecommendationRequest {
        limit: Some(2),
        exclude: vec![lib.hyperion],
        ..request(&lib.ana)
    };
    let cached = lib.db.recommendations(&narrowed, ttl).await;
    assert_eq!(ids(&cached), vec![lib.children_of_dune, lib.emma]);
    assert_eq!(cached[1].rank, 2);

    let refreshed = RecommendationRequest {
        refresh: true,
        ..request(&lib.ana)
    };
    let fresh = lib.db.recommendations(&refreshed, ttl).await;
    assert!(ids(&fresh).contains(&foundation.book.id));
}

#[tokio::test]
async fn expired_or_too_small_caches_are_regenerated() {
    let lib = library().await;

    let small = RecommendationRequest {
        limit: Some(1),
        ..request(&lib.ana)
    };
    assert_eq!(lib.db.recommendations(&small, Duration::hours(24)).await.len(), 1);

    // a larger limit cannot be served from a one-item cache
    let full = lib.db.recommendations(&request(&lib.ana), Duration::hours(24)).await;
    assert_eq!(full.len(), 3);

    // a zero ttl expires immediately
    let regenerate = RecommendationRequest {
        refresh: true,
        ..request(&lib.ana)
    };
    lib.db.recommendations(&regenerate, Duration::zero()).await;
    let foundation = common::book(&lib.db, "Foundation", "Isaac Asimov", "Science Fiction").await;
    let again = lib.db.recommendations(&request(&lib.ana), Duration::hours(24)).await;
    assert!(ids(&again).contains(&foundation.book.id));
}

#[tokio::test]
async fn cached_lists_drop_books_shelved_or_started_since() {
    let lib = library().await;
    let ttl = Duration::hours(24);
    let first = lib.db.recommendations(&request(&lib.ana), ttl).await;
    assert_eq!(ids(&first), vec![lib.hyperion, lib.children_of_dune, lib.emma]);

    let to_read = NewShelf {
        name: "To read".into(),
        description: None,
        is_public: false,
    };
    let shelf = lib.db.create_shelf(&lib.ana, &to_read).await.unwrap();
    lib.db.add_book_to_shelf(&lib.ana, shelf.id, lib.emma).await.unwrap();
    lib.db
        .update_progress(&lib.ana, lib.hyperion, &common::status(ReadingStatus::Reading))
        .await
        .unwrap();

    let cached = lib.db.recommendations(&request(&lib.ana), ttl).await;
    assert_eq!(ids(&cached), vec![lib.children_of_dune]);
    assert_eq!(cached[0].rank, 1);
}

#[tokio::test]
async fn failing_source_contributes_nothing() {
    let lib = library().await;
    sqlx::query("DROP TABLE book_genres")
        .execute(lib.db.pool())
        .await
        .unwrap();

    let req = RecommendationRequest {
        refresh: true,
        ..request(&lib.ana)
    };
    let list = lib.db.recommendations(&req, Duration::hours(24)).await;

    assert_eq!(ids(&list), vec![lib.children_of_dune, lib.emma]);
    assert_eq!(list[0].score, 0.75);
    assert_eq!(list[1].reason, Reason::HighlyRated);
}

#[tokio::test]
async fn unreadable_cache_is_regenerated() {
    let lib = library().await;
    let ttl = Duration::hours(24);
    assert_eq!(lib.db.recommendations(&request(&lib.ana), ttl).await.len(), 3);

    let foundation = common::book(&lib.db, "Foundation", "Isaac Asimov", "Science Fiction").await;
    sqlx::query("UPDATE recommendation_cache SET payload = 'not json' WHERE user_id = ?")
        .bind(lib.ana.id)
        .execute(lib.db.pool())
        .await
        .unwrap();

    let list = lib.db.recommendations(&request(&lib.ana), ttl).await;
    assert!(ids(&list).contains(&foundation.book.id));
}
