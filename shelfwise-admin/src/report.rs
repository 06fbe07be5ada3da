use anyhow::Context as _;
use chrono::NaiveDate;
use serde::Serialize;
use shelfwise_common::reports::AdminReport;
use tera::{Context, Tera};

const TEMPLATE_NAME: &str = "report.txt";
const TEMPLATE: &str = include_str!("../templates/report.txt.tera");

#[derive(Debug, Serialize)]
struct DailyRow {
    date: NaiveDate,
    new_users: usize,
    activities: usize,
}

fn daily_rows(report: &AdminReport) -> Vec<DailyRow> {
    report
        .new_users_by_day
        .iter()
        .zip(&report.activity_by_day)
        .map(|(users, activity)| DailyRow {
            date: users.date,
            new_users: users.count,
            activities: activity.count,
        })
        .collect()
}

/// Renders the report as plain text for terminals and cron mail.
pub fn render_text(report: &AdminReport) -> anyhow::Result<String> {
    let mut templates = Tera::default();
    templates
        .add_raw_template(TEMPLATE_NAME, TEMPLATE)
        .context("Invalid report template")?;

    let mut context = Context::from_serialize(report).context("Failed to build report context")?;
    context.insert("daily", &daily_rows(report));

    templates
        .render(TEMPLATE_NAME, &context)
        .context("Failed to render report")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shelfwise_common::reports::{build_report, ActivityRow, CatalogTotals, ProgressRow, ReportInput, ReportWindow};
    use shelfwise_common::{ActivityKind, ReadingStatus};

    #[test]
    fn renders_totals_days_and_rankings() {
        let now = Utc.with_ymd_and_hms(2024, 5, 3, 18, 30, 0).unwrap();
        let input = ReportInput {
            totals: CatalogTotals {
                users: 12,
                books: 40,
                shelves: 7,
                groups: 2,
            },
            signups: vec![now],
            activities: vec![ActivityRow {
                user_id: 4,
                username: "ana".into(),
                kind: ActivityKind::FinishedReading,
                created_at: now,
            }],
            progress: vec![ProgressRow {
                book_id: 9,
                title: "Dune".into(),
                status: ReadingStatus::Read,
                rating: Some(5),
            }],
        };

        let report = build_report(&input, ReportWindow::last_days(2, now));
        let text = render_text(&report).unwrap();

        assert!(text.contains("2024-05-02 to 2024-05-03 18:30 UTC"));
        assert!(text.contains("Users:      12"));
        assert!(text.contains("Activities: 1"));
        assert!(text.contains("finished_reading: 1"));
        assert!(text.contains("1. Dune (1 readers, avg 5"));
        assert!(text.contains("1. ana: 1"));
        assert_eq!(text.matches("2024-05-0").count(), 4);
    }

    #[test]
    fn empty_sections_say_none() {
        let now = Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap();
        let report = build_report(&ReportInput::default(), ReportWindow::last_days(1, now));

        let text = render_text(&report).unwrap();

        assert!(text.contains("(none)"));
        assert!(text.contains("want_to_read: 0"));
    }
}
