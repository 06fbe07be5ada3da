use axum::extract::State;
use serde::Deserialize;
use shelfwise_common::reports::{AdminReport, DEFAULT_DAYS, MAX_DAYS};
use tracing::info;

use crate::auth::AdminUser;
use crate::error::{ApiResult, AppError};
use crate::extract::{Json, Query};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub days: Option<i64>,
}

pub async fn report(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(query): Query<ReportQuery>,
) -> ApiResult<AdminReport> {
    let days = query.days.unwrap_or(DEFAULT_DAYS);
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(AppError::BadRequest(format!(
            "days must be between 1 and {MAX_DAYS}"
        )));
    }

    info!("Admin {} requested a {days} day report", admin.username);
    Ok(Json(state.db.admin_report(days).await?))
}
