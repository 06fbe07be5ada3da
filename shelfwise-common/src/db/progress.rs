use chrono::Utc;

use super::social::{record_activity, NewActivity};
use super::Database;
use crate::privacy::PrivacyScope;
use crate::{
    ActivityKind, Error, ProgressUpdate, ReadingProgress, ReadingStatus, Result, User,
};

fn validate(update: &ProgressUpdate, page_count: Option<i64>) -> Result<()> {
    if let Some(percentage) = update.percentage {
        if !(0.0..=100.0).contains(&percentage) {
            return Err(Error::invalid("percentage must be between 0 and 100"));
        }
    }

    if let Some(page) = update.current_page {
        if page < 0 {
            return Err(Error::invalid("current_page cannot be negative"));
        }
        if let Some(pages) = page_count {
            if page > pages {
                return Err(Error::invalid(format!(
                    "current_page {page} is past the last page ({pages})"
                )));
            }
        }
    }

    if let Some(rating) = update.rating {
        if !(1..=5).contains(&rating) {
            return Err(Error::invalid("rating must be between 1 and 5"));
        }
        if !update.status.allows_rating() {
            return Err(Error::invalid(
                "a rating can only be given once a book is read or abandoned",
            ));
        }
    }

    Ok(())
}

impl Database {
    pub async fn progress_for(&self, user_id: i64, book_id: i64) -> Result<Option<ReadingProgress>> {
        let progress = sqlx::query_as::<_, ReadingProgress>(
            "SELECT * FROM reading_progress WHERE user_id = ? AND book_id = ?",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(progress)
    }

    /// Upserts the reader's progress on a book and records the resulting activities.
    pub async fn update_progress(
        &self,
        reader: &User,
        book_id: i64,
        update: &ProgressUpdate,
    ) -> Result<ReadingProgress> {
        let book = self.book(book_id).await?;
        validate(update, book.page_count)?;

        let previous = self.progress_for(reader.id, book_id).await?;
        let previous_status = previous.as_ref().map(|p| p.status);
        let now = Utc::now();
        let status = update.status;

        let derived_from_page = match (update.current_page, book.page_count) {
            (Some(page), Some(pages)) if pages > 0 => Some(page as f64 * 100.0 / pages as f64),
            _ => None,
        };
        let percentage = match status {
            ReadingStatus::Read => 100.0,
            ReadingStatus::WantToRead => update.percentage.unwrap_or(0.0),
            _ => update
                .percentage
                .or(derived_from_page)
                .or_else(|| previous.as_ref().map(|p| p.percentage))
                .unwrap_or(0.0),
        };

        let started_at = previous
            .as_ref()
            .and_then(|p| p.started_at)
            .or_else(|| matches!(status, ReadingStatus::Reading | ReadingStatus::Read).then_some(now));
        let finished_at = match (status, previous.as_ref()) {
            (ReadingStatus::Read, Some(p)) if p.status == ReadingStatus::Read => p.finished_at.or(Some(now)),
            (ReadingStatus::Read, _) => Some(now),
            _ => None,
        };
        let rating = match update.rating {
            Some(rating) => Some(rating),
            None if status.allows_rating() => previous.as_ref().and_then(|p| p.rating),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let progress = sqlx::query_as::<_, ReadingProgress>(
            r#"
            INSERT INTO reading_progress (
                user_id, book_id, status, percentage, current_page,
                rating, started_at, finished_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, book_id) DO UPDATE SET
                status = excluded.status,
                percentage = excluded.percentage,
                current_page = excluded.current_page,
                rating = excluded.rating,
                started_at = excluded.started_at,
                finished_at = excluded.finished_at,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(reader.id)
        .bind(book_id)
        .bind(status)
        .bind(percentage)
        .bind(update.current_page)
        .bind(rating)
        .bind(started_at)
        .bind(finished_at)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let base = NewActivity {
            book_id: Some(book_id),
            ..NewActivity::new(reader.id, ActivityKind::Progress)
        };

        if previous_status != Some(status) {
            let kind = match status {
                ReadingStatus::Reading => Some(ActivityKind::StartedReading),
                ReadingStatus::Read => Some(ActivityKind::FinishedReading),
                _ => None,
            };
            if let Some(kind) = kind {
                record_activity(&mut tx, NewActivity { kind, ..base }).await?;
            }
        } else if status == ReadingStatus::Reading
            && previous.as_ref().map(|p| p.percentage) != Some(percentage)
        {
            let detail = format!("{percentage:.0}%");
            let activity = NewActivity {
                detail: Some(detail.as_str()),
                ..base
            };
            record_activity(&mut tx, activity).await?;
        }

        if let Some(value) = rating {
            if Some(value) != previous.as_ref().and_then(|p| p.rating) {
                let detail = format!("{value}/5");
                let activity = NewActivity {
                    kind: ActivityKind::Rated,
                    detail: Some(detail.as_str()),
                    ..base
                };
                record_activity(&mut tx, activity).await?;
            }
        }

        tx.commit().await?;
        Ok(progress)
    }

    pub async fn user_progress(&self, viewer: &User, user_id: i64) -> Result<Vec<ReadingProgress>> {
        self.user_by_id(user_id).await?;
        self.ensure_can_view(viewer, user_id, PrivacyScope::Progress)
            .await?;

        let progress = sqlx::query_as::<_, ReadingProgress>(
            "SELECT * FROM reading_progress WHERE user_id = ? ORDER BY updated_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(progress)
    }
}
