use chrono::Utc;
use serde::Deserialize;

use super::social::{record_activity, NewActivity};
use super::Database;
use crate::privacy::PrivacyScope;
use crate::{ActivityKind, Error, Result, Shelf, ShelfBook, ShelfSummary, User};

const MAX_SHELF_NAME_CHARS: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct NewShelf {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShelfChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

fn default_public() -> bool {
    true
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    let chars = name.chars().count();
    if chars == 0 || chars > MAX_SHELF_NAME_CHARS {
        return Err(Error::invalid(format!(
            "shelf name must be between 1 and {MAX_SHELF_NAME_CHARS} characters"
        )));
    }
    Ok(name)
}

fn map_duplicate(error: Error, name: &str) -> Error {
    match error {
        Error::Conflict(_) => Error::conflict(format!("you already have a shelf named {name}")),
        other => other,
    }
}

impl Database {
    pub async fn create_shelf(&self, owner: &User, shelf: &NewShelf) -> Result<Shelf> {
        let name = validate_name(&shelf.name)?;
        let now = Utc::now();

        let id = sqlx::query(
            r#"
            INSERT INTO shelves (user_id, name, description, is_public, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(owner.id)
        .bind(name)
        .bind(&shelf.description)
        .bind(shelf.is_public)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_duplicate(e.into(), name))?
        .last_insert_rowid();

        self.shelf(id).await
    }

    pub async fn shelf(&self, shelf_id: i64) -> Result<Shelf> {
        sqlx::query_as::<_, Shelf>("SELECT * FROM shelves WHERE id = ?")
            .bind(shelf_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("Shelf"))
    }

    async fn owned_shelf(&self, owner: &User, shelf_id: i64) -> Result<Shelf> {
        let shelf = self.shelf(shelf_id).await?;
        if shelf.user_id != owner.id {
            return Err(Error::forbidden("shelf belongs to another user"));
        }
        Ok(shelf)
    }

    /// A shelf the viewer may read. Non-public shelves are owner-only.
    pub async fn visible_shelf(&self, viewer: &User, shelf_id: i64) -> Result<Shelf> {
        let shelf = self.shelf(shelf_id).await?;
        if shelf.user_id == viewer.id || viewer.is_admin() {
            return Ok(shelf);
        }
        if !shelf.is_public {
            return Err(Error::forbidden("shelf is private"));
        }
        self.ensure_can_view(viewer, shelf.user_id, PrivacyScope::Shelves)
            .await?;
        Ok(shelf)
    }

    pub async fn update_shelf(&self, owner: &User, shelf_id: i64, changes: &ShelfChanges) -> Result<Shelf> {
        let shelf = self.owned_shelf(owner, shelf_id).await?;

        let name = match &changes.name {
            Some(name) => validate_name(name)?.to_string(),
            None => shelf.name,
        };
        let description = changes.description.clone().or(shelf.description);
        let is_public = changes.is_public.unwrap_or(shelf.is_public);

        sqlx::query(
            "UPDATE shelves SET name = ?, description = ?, is_public = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&name)
        .bind(description)
        .bind(is_public)
        .bind(Utc::now())
        .bind(shelf_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_duplicate(e.into(), &name))?;

        self.shelf(shelf_id).await
    }

    pub async fn delete_shelf(&self, owner: &User, shelf_id: i64) -> Result<()> {
        self.owned_shelf(owner, shelf_id).await?;

        sqlx::query("DELETE FROM shelves WHERE id = ?")
            .bind(shelf_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Adds a book and records a `shelf_add` activity in the same transaction.
    pub async fn add_book_to_shelf(&self, owner: &User, shelf_id: i64, book_id: i64) -> Result<()> {
        let shelf = self.owned_shelf(owner, shelf_id).await?;
        let book = self.book(book_id).await?;

        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO shelf_books (shelf_id, book_id, added_at)
            VALUES (?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(shelf.id)
        .bind(book.id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(Error::conflict(format!(
                "{} is already on {}",
                book.title, shelf.name
            )));
        }

        sqlx::query("UPDATE shelves SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(shelf.id)
            .execute(&mut *tx)
            .await?;

        let activity = NewActivity {
            book_id: Some(book.id),
            shelf_id: Some(shelf.id),
            detail: Some(shelf.name.as_str()),
            ..NewActivity::new(owner.id, ActivityKind::ShelfAdd)
        };
        record_activity(&mut tx, activity).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn remove_book_from_shelf(&self, owner: &User, shelf_id: i64, book_id: i64) -> Result<()> {
        self.owned_shelf(owner, shelf_id).await?;

        let removed = sqlx::query("DELETE FROM shelf_books WHERE shelf_id = ? AND book_id = ?")
            .bind(shelf_id)
            .bind(book_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if removed == 0 {
            return Err(Error::NotFound("Shelf book"));
        }
        Ok(())
    }

    /// A user's shelves with book counts, filtered by what the viewer may see.
    pub async fn user_shelves(&self, viewer: &User, user_id: i64) -> Result<Vec<ShelfSummary>> {
        self.user_by_id(user_id).await?;
        self.ensure_can_view(viewer, user_id, PrivacyScope::Shelves)
            .await?;
        let include_private = viewer.id == user_id || viewer.is_admin();

        let shelves = sqlx::query_as::<_, ShelfSummary>(
            r#"
            SELECT s.*, (SELECT COUNT(*) FROM shelf_books sb WHERE sb.shelf_id = s.id) AS book_count
            FROM shelves s
            WHERE s.user_id = ? AND (? OR s.is_public = 1)
            ORDER BY s.name COLLATE NOCASE, s.id
            "#,
        )
        .bind(user_id)
        .bind(include_private)
        .fetch_all(&self.pool)
        .await?;

        Ok(shelves)
    }

    pub async fn shelf_books(&self, viewer: &User, shelf_id: i64) -> Result<Vec<ShelfBook>> {
        self.visible_shelf(viewer, shelf_id).await?;

        let books = sqlx::query_as::<_, ShelfBook>(
            r#"
            SELECT b.id AS book_id, b.title, b.cover_url, sb.added_at
            FROM shelf_books sb
            JOIN books b ON b.id = sb.book_id
            WHERE sb.shelf_id = ?
            ORDER BY sb.added_at DESC, b.id DESC
            "#,
        )
        .bind(shelf_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }
}
