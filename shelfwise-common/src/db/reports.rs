use chrono::{DateTime, Utc};

use super::Database;
use crate::reports::{
    build_report, ActivityRow, AdminReport, CatalogTotals, ProgressRow, ReportInput, ReportWindow,
};
use crate::Result;

impl Database {
    pub async fn load_report_input(&self, window: &ReportWindow) -> Result<ReportInput> {
        let (users, books, shelves, groups): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM books),
                (SELECT COUNT(*) FROM shelves),
                (SELECT COUNT(*) FROM reading_groups)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let signups = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT created_at FROM users WHERE created_at >= ? AND created_at <= ?",
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        let activities = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT a.user_id, u.username, a.kind, a.created_at
            FROM activities a
            JOIN users u ON u.id = a.user_id
            WHERE a.created_at >= ? AND a.created_at <= ?
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        let progress = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT rp.book_id, b.title, rp.status, rp.rating
            FROM reading_progress rp
            JOIN books b ON b.id = rp.book_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ReportInput {
            totals: CatalogTotals {
                users,
                books,
                shelves,
                groups,
            },
            signups,
            activities,
            progress,
        })
    }

    pub async fn admin_report(&self, days: i64) -> Result<AdminReport> {
        let window = ReportWindow::last_days(days, Utc::now());
        let input = self.load_report_input(&window).await?;
        Ok(build_report(&input, window))
    }
}
