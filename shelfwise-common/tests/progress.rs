mod common;

use shelfwise_common::{ActivityKind, Error, Page, PrivacyUpdate, ProgressUpdate, ReadingStatus, Visibility};

#[tokio::test]
async fn reading_lifecycle_records_activities() {
    let db = common::database().await;
    let ana = common::reader(&db, "ana").await;
    let dune = common::book(&db, "Dune", "Frank Herbert", "Science Fiction").await;
    let id = dune.book.id;

    let started = db
        .update_progress(&ana, id, &common::status(ReadingStatus::Reading))
        .await
        .unwrap();
    assert!(started.started_at.is_some());
    assert_eq!(started.percentage, 0.0);

    let halfway = ProgressUpdate {
        current_page: Some(150),
        ..common::status(ReadingStatus::Reading)
    };
    let halfway = db.update_progress(&ana, id, &halfway).await.unwrap();
    assert_eq!(halfway.percentage, 50.0);
    assert_eq!(halfway.started_at, started.started_at);

    let done = db.update_progress(&ana, id, &common::finished(5)).await.unwrap();
    assert_eq!(done.percentage, 100.0);
    assert!(done.finished_at.is_some());
    assert_eq!(done.rating, Some(5));

    let kinds: Vec<ActivityKind> = db
        .user_activities(&ana, ana.id, None, Page::default())
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.activity.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            ActivityKind::Rated,
            ActivityKind::FinishedReading,
            ActivityKind::Progress,
            ActivityKind::StartedReading,
        ]
    );
}

#[tokio::test]
async fn invalid_updates_are_rejected() {
    let db = common::database().await;
    let ana = common::reader(&db, "ana").await;
    let dune = common::book(&db, "Dune", "Frank Herbert", "Science Fiction").await;
    let id = dune.book.id;

    let rated_while_reading = ProgressUpdate {
        rating: Some(4),
        ..common::status(ReadingStatus::Reading)
    };
    let past_the_end = ProgressUpdate {
        current_page: Some(301),
        ..common::status(ReadingStatus::Reading)
    };
    let over_hundred = ProgressUpdate {
        percentage: Some(120.0),
        ..common::status(ReadingStatus::Reading)
    };

    for update in [rated_while_reading, past_the_end, over_hundred, common::finished(6)] {
        let result = db.update_progress(&ana, id, &update).await;
        assert!(matches!(result, Err(Error::Invalid(_))), "{update:?} should be rejected");
    }

    let missing_book = db
        .update_progress(&ana, 9999, &common::status(ReadingStatus::Reading))
        .await;
    assert!(matches!(missing_book, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn progress_listing_respects_privacy() {
    let db = common::database().await;
    let ana = common::reader(&db, "ana").await;
    let ben = common::reader(&db, "ben").await;
    let dune = common::book(&db, "Dune", "Frank Herbert", "Science Fiction").await;
    db.update_progress(&ana, dune.book.id, &common::status(ReadingStatus::WantToRead))
        .await
        .unwrap();

    assert_eq!(db.user_progress(&ben, ana.id).await.unwrap().len(), 1);

    let update = PrivacyUpdate {
        progress_visibility: Some(Visibility::Private),
        ..Default::default()
    };
    db.update_privacy_settings(ana.id, &update).await.unwrap();
    db.follow(&ben, ana.id).await.unwrap();

    assert!(matches!(db.user_progress(&ben, ana.id).await, Err(Error::Forbidden(_))));
    assert_eq!(db.user_progress(&ana, ana.id).await.unwrap().len(), 1);
}
