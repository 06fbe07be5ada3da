mod common;

use shelfwise_common::{Error, NewBook, Page};

#[tokio::test]
async fn books_share_authors_and_genres_by_name() {
    let db = common::database().await;

    let good_omens = db
        .create_book(&NewBook {
            title: " Good Omens ".into(),
            authors: vec!["Terry Pratchett".into(), "Neil Gaiman".into(), "Neil Gaiman".into()],
            genres: vec!["Fantasy".into(), "".into()],
            publisher: Some("Gollancz".into()),
            isbn: Some("9780575048003".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(good_omens.book.title, "Good Omens");
    let authors: Vec<&str> = good_omens.authors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(authors, vec!["Terry Pratchett", "Neil Gaiman"]);
    assert_eq!(good_omens.genres, vec!["Fantasy"]);
    assert_eq!(good_omens.publisher.unwrap().name, "Gollancz");
    assert_eq!(good_omens.rating_count, 0);

    let mort = common::book(&db, "Mort", "Terry Pratchett", "Fantasy").await;
    assert_eq!(mort.authors[0].id, good_omens.authors[0].id);

    let duplicate_isbn = db
        .create_book(&NewBook {
            title: "Good Omens (reissue)".into(),
            isbn: Some("9780575048003".into()),
            ..Default::default()
        })
        .await;
    assert!(matches!(duplicate_isbn, Err(Error::Conflict(_))));

    let untitled = db.create_book(&NewBook::default()).await;
    assert!(matches!(untitled, Err(Error::Invalid(_))));
}

#[tokio::test]
async fn search_matches_titles_authors_and_genres() {
    let db = common::database().await;
    common::book(&db, "Mort", "Terry Pratchett", "Fantasy").await;
    common::book(&db, "Dune", "Frank Herbert", "Science Fiction").await;
    common::book(&db, "Guards! Guards!", "Terry Pratchett", "Fantasy").await;

    let titles = |books: Vec<shelfwise_common::BookSummary>| {
        books.into_iter().map(|b| b.title).collect::<Vec<_>>()
    };

    let by_author = db.search_books(Some("pratchett"), None, Page::default()).await.unwrap();
    assert_eq!(titles(by_author), vec!["Guards! Guards!", "Mort"]);

    let by_genre = db
        .search_books(None, Some("science fiction"), Page::default())
        .await
        .unwrap();
    assert_eq!(titles(by_genre), vec!["Dune"]);

    let everything = db.search_books(Some("  "), None, Page::default()).await.unwrap();
    assert_eq!(everything.len(), 3);
    assert_eq!(everything[0].authors.as_deref(), Some("Frank Herbert"));

    let paged = db
        .search_books(None, None, Page { limit: Some(1), offset: Some(1) })
        .await
        .unwrap();
    assert_eq!(titles(paged), vec!["Guards! Guards!"]);

    assert!(matches!(db.book_detail(42).await, Err(Error::NotFound(_))));
}
