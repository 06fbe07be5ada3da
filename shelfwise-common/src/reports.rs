//! Admin analytics: groups and sums rows loaded by `Database::load_report_input`.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use itertools::Itertools;
use serde::Serialize;

use crate::{ActivityKind, ReadingStatus};

pub const DEFAULT_DAYS: i64 = 30;
pub const MAX_DAYS: i64 = 365;
const TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    /// `days` calendar days (UTC) ending with the day containing `now`.
    pub fn last_days(days: i64, now: DateTime<Utc>) -> Self {
        let days = days.clamp(1, MAX_DAYS);
        let first_day = now.date_naive() - Duration::days(days - 1);
        Self {
            start: first_day.and_time(NaiveTime::MIN).and_utc(),
            end: now,
        }
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.end.date_naive();
        self.start
            .date_naive()
            .iter_days()
            .take_while(move |day| *day <= last)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CatalogTotals {
    pub users: i64,
    pub books: i64,
    pub shelves: i64,
    pub groups: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    pub user_id: i64,
    pub username: String,
    pub kind: ActivityKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProgressRow {
    pub book_id: i64,
    pub title: String,
    pub status: ReadingStatus,
    pub rating: Option<i64>,
}

/// Raw rows the report is computed from.
#[derive(Debug, Clone, Default)]
pub struct ReportInput {
    pub totals: CatalogTotals,
    pub signups: Vec<DateTime<Utc>>,
    pub activities: Vec<ActivityRow>,
    pub progress: Vec<ProgressRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReportTotals {
    pub users: i64,
    pub books: i64,
    pub shelves: i64,
    pub groups: i64,
    pub activities: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct KindCount {
    pub kind: ActivityKind,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusCount {
    pub status: ReadingStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopBook {
    pub book_id: i64,
    pub title: String,
    pub readers: usize,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ActiveUser {
    pub user_id: i64,
    pub username: String,
    pub activities: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdminReport {
    pub window: ReportWindow,
    pub totals: ReportTotals,
    pub new_users_by_day: Vec<DailyCount>,
    pub activity_by_day: Vec<DailyCount>,
    pub activity_by_kind: Vec<KindCount>,
    pub reading_status: Vec<StatusCount>,
    pub top_books: Vec<TopBook>,
    pub most_active_users: Vec<ActiveUser>,
}

fn by_day(window: &ReportWindow, timestamps: impl Iterator<Item = DateTime<Utc>>) -> Vec<DailyCount> {
    let counts = timestamps
        .filter(|at| window.contains(*at))
        .map(|at| at.date_naive())
        .counts();

    window
        .days()
        .map(|date| DailyCount {
            date,
            count: counts.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

fn top_books(progress: &[ProgressRow]) -> Vec<TopBook> {
    let mut books = progress
        .iter()
        .into_group_map_by(|row| row.book_id)
        .into_iter()
        .map(|(book_id, rows)| {
            let ratings = rows.iter().filter_map(|r| r.rating).collect_vec();
            let average_rating = (!ratings.is_empty())
                .then(|| ratings.iter().sum::<i64>() as f64 / ratings.len() as f64);
            TopBook {
                book_id,
                title: rows[0].title.clone(),
                readers: rows.len(),
                average_rating,
            }
        })
        .collect_vec();

    books.sort_by(|a, b| {
        b.readers
            .cmp(&a.readers)
            .then_with(|| {
                let a_rating = a.average_rating.unwrap_or(f64::MIN);
                b.average_rating.unwrap_or(f64::MIN).total_cmp(&a_rating)
            })
            .then_with(|| a.book_id.cmp(&b.book_id))
    });
    books.truncate(TOP_N);
    books
}

pub fn build_report(input: &ReportInput, window: ReportWindow) -> AdminReport {
    let in_window = input
        .activities
        .iter()
        .filter(|a| window.contains(a.created_at))
        .collect_vec();

    let activity_by_kind = in_window
        .iter()
        .map(|a| a.kind)
        .counts()
        .into_iter()
        .map(|(kind, count)| KindCount { kind, count })
        .sorted_by(|a, b| b.count.cmp(&a.count).then_with(|| a.kind.as_str().cmp(b.kind.as_str())))
        .collect_vec();

    let status_counts: HashMap<ReadingStatus, usize> =
        input.progress.iter().map(|p| p.status).counts();
    let reading_status = ReadingStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: status_counts.get(status).copied().unwrap_or(0),
        })
        .collect_vec();

    let most_active_users = in_window
        .iter()
        .into_group_map_by(|a| a.user_id)
        .into_iter()
        .map(|(user_id, rows)| ActiveUser {
            user_id,
            username: rows[0].username.clone(),
            activities: rows.len(),
        })
        .sorted_by(|a, b| b.activities.cmp(&a.activities).then_with(|| a.user_id.cmp(&b.user_id)))
        .take(TOP_N)
        .collect_vec();

    AdminReport {
        window,
        totals: ReportTotals {
            users: input.totals.users,
            books: input.totals.books,
            shelves: input.totals.shelves,
            groups: input.totals.groups,
            activities: in_window.len(),
        },
        new_users_by_day: by_day(&window, input.signups.iter().copied()),
        activity_by_day: by_day(&window, in_window.iter().map(|a| a.created_at)),
        activity_by_kind,
        reading_status,
        top_books: top_books(&input.progress),
        most_active_users,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn activity(user_id: i64, kind: ActivityKind, created_at: DateTime<Utc>) -> ActivityRow {
        ActivityRow {
            user_id,
            username: format!("user{user_id}"),
            kind,
            created_at,
        }
    }

    fn progress(book_id: i64, status: ReadingStatus, rating: Option<i64>) -> ProgressRow {
        ProgressRow {
            book_id,
            title: format!("Book {book_id}"),
            status,
            rating,
        }
    }

    #[test]
    fn window_covers_whole_days() {
        let window = ReportWindow::last_days(3, at(10, 15));

        assert_eq!(window.start, at(8, 0));
        assert_eq!(window.days().count(), 3);
        assert!(!window.contains(at(7, 23)));
    }

    #[test]
    fn daily_series_includes_empty_days() {
        let window = ReportWindow::last_days(3, at(10, 15));
        let input = ReportInput {
            signups: vec![at(8, 1), at(8, 9), at(10, 2), at(1, 0)],
            ..Default::default()
        };

        let report = build_report(&input, window);
        let counts = report.new_users_by_day.iter().map(|d| d.count).collect_vec();

        assert_eq!(counts, vec![2, 0, 1]);
    }

    #[test]
    fn activity_grouping_ignores_rows_outside_window() {
        let window = ReportWindow::last_days(7, at(10, 12));
        let input = ReportInput {
            activities: vec![
                activity(1, ActivityKind::ShelfAdd, at(9, 1)),
                activity(1, ActivityKind::ShelfAdd, at(9, 2)),
                activity(2, ActivityKind::Rated, at(10, 3)),
                activity(2, ActivityKind::Progress, at(10, 4)),
                activity(3, ActivityKind::Progress, at(1, 0)),
            ],
            ..Default::default()
        };

        let report = build_report(&input, window);

        assert_eq!(report.totals.activities, 4);
        assert_eq!(report.activity_by_kind[0], KindCount { kind: ActivityKind::ShelfAdd, count: 2 });
        assert_eq!(report.activity_by_kind[1].kind, ActivityKind::Progress);
        assert_eq!(report.activity_by_kind[2].kind, ActivityKind::Rated);
        assert_eq!(report.most_active_users.len(), 2);
        assert_eq!(report.most_active_users[0].user_id, 1);
    }

    #[test]
    fn top_books_rank_by_readers_then_rating() {
        let input = ReportInput {
            progress: vec![
                progress(1, ReadingStatus::Read, Some(3)),
                progress(1, ReadingStatus::Reading, None),
                progress(2, ReadingStatus::Read, Some(5)),
                progress(2, ReadingStatus::Read, Some(4)),
                progress(3, ReadingStatus::WantToRead, None),
            ],
            ..Default::default()
        };

        let report = build_report(&input, ReportWindow::last_days(1, at(10, 0)));

        assert_eq!(report.top_books.iter().map(|b| b.book_id).collect_vec(), vec![2, 1, 3]);
        assert_eq!(report.top_books[0].average_rating, Some(4.5));
        assert_eq!(report.top_books[2].average_rating, None);

        let statuses = report.reading_status.iter().map(|s| s.count).collect_vec();
        assert_eq!(statuses, vec![1, 1, 3, 0]);
    }
}
