mod common;

use shelfwise_common::{ActivityKind, Error, NewShelf, Page, PrivacyUpdate, ShelfChanges, Visibility};

fn shelf(name: &str, is_public: bool) -> NewShelf {
    NewShelf {
        name: name.to_string(),
        description: None,
        is_public,
    }
}

#[tokio::test]
async fn shelf_names_are_unique_per_user() {
    let db = common::database().await;
    let ana = common::reader(&db, "ana").await;
    let ben = common::reader(&db, "ben").await;

    db.create_shelf(&ana, &shelf("Favourites", true)).await.unwrap();
    let duplicate = db.create_shelf(&ana, &shelf("  Favourites ", true)).await;
    assert!(matches!(duplicate, Err(Error::Conflict(_))));

    // another user can reuse the name
    db.create_shelf(&ben, &shelf("Favourites", true)).await.unwrap();

    let blank = db.create_shelf(&ana, &shelf("   ", true)).await;
    assert!(matches!(blank, Err(Error::Invalid(_))));
}

#[tokio::test]
async fn adding_a_book_records_activity_once() {
    let db = common::database().await;
    let ana = common::reader(&db, "ana").await;
    let dune = common::book(&db, "Dune", "Frank Herbert", "Science Fiction").await;
    let favourites = db.create_shelf(&ana, &shelf("Favourites", true)).await.unwrap();

    db.add_book_to_shelf(&ana, favourites.id, dune.book.id).await.unwrap();
    let again = db.add_book_to_shelf(&ana, favourites.id, dune.book.id).await;
    assert!(matches!(again, Err(Error::Conflict(_))));

    let books = db.shelf_books(&ana, favourites.id).await.unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "Dune");

    let activity = db.user_activities(&ana, ana.id, None, Page::default()).await.unwrap();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].activity.kind, ActivityKind::ShelfAdd);
    assert_eq!(activity[0].activity.shelf_id, Some(favourites.id));
    assert_eq!(activity[0].book_title.as_deref(), Some("Dune"));

    db.remove_book_from_shelf(&ana, favourites.id, dune.book.id).await.unwrap();
    assert!(db.shelf_books(&ana, favourites.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn only_the_owner_changes_a_shelf() {
    let db = common::database().await;
    let ana = common::reader(&db, "ana").await;
    let ben = common::reader(&db, "ben").await;
    let dune = common::book(&db, "Dune", "Frank Herbert", "Science Fiction").await;
    let favourites = db.create_shelf(&ana, &shelf("Favourites", true)).await.unwrap();

    let add = db.add_book_to_shelf(&ben, favourites.id, dune.book.id).await;
    assert!(matches!(add, Err(Error::Forbidden(_))));

    let changes = ShelfChanges {
        name: Some("Best".into()),
        ..Default::default()
    };
    assert!(matches!(
        db.update_shelf(&ben, favourites.id, &changes).await,
        Err(Error::Forbidden(_))
    ));

    let renamed = db.update_shelf(&ana, favourites.id, &changes).await.unwrap();
    assert_eq!(renamed.name, "Best");
    assert!(renamed.is_public);

    db.delete_shelf(&ana, favourites.id).await.unwrap();
    assert!(matches!(db.shelf(favourites.id).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn private_shelves_and_settings_hide_shelves() {
    let db = common::database().await;
    let ana = common::reader(&db, "ana").await;
    let ben = common::reader(&db, "ben").await;
    db.create_shelf(&ana, &shelf("Public", true)).await.unwrap();
    let secret = db.create_shelf(&ana, &shelf("Secret", false)).await.unwrap();

    let seen_by_ben = db.user_shelves(&ben, ana.id).await.unwrap();
    assert_eq!(seen_by_ben.len(), 1);
    assert_eq!(seen_by_ben[0].shelf.name, "Public");
    assert!(matches!(db.shelf_books(&ben, secret.id).await, Err(Error::Forbidden(_))));

    let own = db.user_shelves(&ana, ana.id).await.unwrap();
    assert_eq!(own.len(), 2);

    let update = PrivacyUpdate {
        shelves_visibility: Some(Visibility::Followers),
        ..Default::default()
    };
    db.update_privacy_settings(ana.id, &update).await.unwrap();
    assert!(matches!(db.user_shelves(&ben, ana.id).await, Err(Error::Forbidden(_))));

    db.follow(&ben, ana.id).await.unwrap();
    assert_eq!(db.user_shelves(&ben, ana.id).await.unwrap().len(), 1);
}
