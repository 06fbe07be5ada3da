//! Shared fixtures: an in-memory database with a small catalog.

#![allow(dead_code)]

use shelfwise_common::{BookDetail, Database, NewBook, ReadingStatus, Role, User};
use shelfwise_common::ProgressUpdate;

pub async fn database() -> Database {
    Database::in_memory().await.unwrap()
}

pub async fn reader(db: &Database, username: &str) -> User {
    db.create_user(username, None, Role::Reader).await.unwrap()
}

pub async fn admin(db: &Database, username: &str) -> User {
    db.create_user(username, None, Role::Admin).await.unwrap()
}

pub async fn book(db: &Database, title: &str, author: &str, genre: &str) -> BookDetail {
    db.create_book(&NewBook {
        title: title.to_string(),
        authors: vec![author.to_string()],
        genres: vec![genre.to_string()],
        page_count: Some(300),
        ..Default::default()
    })
    .await
    .unwrap()
}

pub fn status(status: ReadingStatus) -> ProgressUpdate {
    ProgressUpdate {
        status,
        percentage: None,
        current_page: None,
        rating: None,
    }
}

pub fn finished(rating: i64) -> ProgressUpdate {
    ProgressUpdate {
        rating: Some(rating),
        ..status(ReadingStatus::Read)
    }
}
