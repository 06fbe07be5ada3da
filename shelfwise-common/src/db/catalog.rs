use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;

use super::Database;
use crate::{Author, Book, BookDetail, BookSummary, Error, NewBook, Page, Publisher, Result};

async fn upsert_named(conn: &mut SqliteConnection, table: &str, name: &str) -> Result<i64> {
    // table names come from this module only
    let sql = format!(
        "INSERT INTO {table} (name) VALUES (?) ON CONFLICT(name) DO UPDATE SET name = excluded.name RETURNING id"
    );
    let id = sqlx::query_scalar::<_, i64>(&sql)
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

fn clean_names(names: &[String]) -> Vec<&str> {
    let mut cleaned: Vec<&str> = Vec::with_capacity(names.len());
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        if !cleaned.contains(&name) {
            cleaned.push(name);
        }
    }
    cleaned
}

impl Database {
    /// Inserts a book, creating its authors, publisher and genres by name as needed.
    pub async fn create_book(&self, book: &NewBook) -> Result<BookDetail> {
        let title = book.title.trim();
        if title.is_empty() {
            return Err(Error::invalid("title is required"));
        }
        if book.page_count.is_some_and(|pages| pages <= 0) {
            return Err(Error::invalid("page_count must be positive"));
        }

        let mut tx = self.pool.begin().await?;

        let publisher_id = match book.publisher.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Some(upsert_named(&mut tx, "publishers", name).await?),
            _ => None,
        };

        let book_id = sqlx::query(
            r#"
            INSERT INTO books (
                title, isbn, description, cover_url, page_count,
                published_year, publisher_id, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(title)
        .bind(book.isbn.as_deref().map(str::trim).filter(|isbn| !isbn.is_empty()))
        .bind(&book.description)
        .bind(&book.cover_url)
        .bind(book.page_count)
        .bind(book.published_year)
        .bind(publisher_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (position, name) in clean_names(&book.authors).into_iter().enumerate() {
            let author_id = upsert_named(&mut tx, "authors", name).await?;
            sqlx::query("INSERT INTO book_authors (book_id, author_id, position) VALUES (?, ?, ?)")
                .bind(book_id)
                .bind(author_id)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
        }

        for name in clean_names(&book.genres) {
            let genre_id = upsert_named(&mut tx, "genres", name).await?;
            sqlx::query("INSERT INTO book_genres (book_id, genre_id) VALUES (?, ?)")
                .bind(book_id)
                .bind(genre_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!("Added book {title} ({book_id})");

        self.book_detail(book_id).await
    }

    pub async fn book(&self, book_id: i64) -> Result<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = ?")
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("Book"))
    }

    pub async fn book_detail(&self, book_id: i64) -> Result<BookDetail> {
        let book = self.book(book_id).await?;

        let authors = sqlx::query_as::<_, Author>(
            r#"
            SELECT a.id, a.name, a.bio FROM authors a
            JOIN book_authors ba ON ba.author_id = a.id
            WHERE ba.book_id = ?
            ORDER BY ba.position
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        let publisher = match book.publisher_id {
            Some(id) => {
                sqlx::query_as::<_, Publisher>("SELECT * FROM publishers WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        let genres = sqlx::query_scalar::<_, String>(
            r#"
            SELECT g.name FROM genres g
            JOIN book_genres bg ON bg.genre_id = g.id
            WHERE bg.book_id = ?
            ORDER BY g.name
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        let (average_rating, rating_count, reader_count): (Option<f64>, i64, i64) = sqlx::query_as(
            r#"
            SELECT AVG(rating), COUNT(rating), COUNT(*)
            FROM reading_progress
            WHERE book_id = ?
            "#,
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(BookDetail {
            book,
            authors,
            publisher,
            genres,
            average_rating,
            rating_count,
            reader_count,
        })
    }

    /// Title/author substring search with an optional exact genre filter.
    pub async fn search_books(
        &self,
        query: Option<&str>,
        genre: Option<&str>,
        page: Page,
    ) -> Result<Vec<BookSummary>> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let genre = genre.map(str::trim).filter(|g| !g.is_empty());

        let books = sqlx::query_as::<_, BookSummary>(
            r#"
            SELECT b.id, b.title, b.cover_url,
                   (SELECT group_concat(a.name, ', ') FROM book_authors ba
                    JOIN authors a ON a.id = ba.author_id
                    WHERE ba.book_id = b.id) AS authors,
                   (SELECT AVG(rp.rating) FROM reading_progress rp
                    WHERE rp.book_id = b.id) AS average_rating
            FROM books b
            WHERE (?1 IS NULL
                   OR b.title LIKE '%' || ?1 || '%'
                   OR EXISTS (
                       SELECT 1 FROM book_authors ba
                       JOIN authors a ON a.id = ba.author_id
                       WHERE ba.book_id = b.id AND a.name LIKE '%' || ?1 || '%'
                   ))
              AND (?2 IS NULL OR EXISTS (
                       SELECT 1 FROM book_genres bg
                       JOIN genres g ON g.id = bg.genre_id
                       WHERE bg.book_id = b.id AND g.name = ?2 COLLATE NOCASE
                   ))
            ORDER BY b.title COLLATE NOCASE, b.id
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(query)
        .bind(genre)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }
}
