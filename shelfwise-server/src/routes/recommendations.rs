use axum::extract::State;
use serde::Deserialize;
use shelfwise_common::recommend::Recommendation;
use shelfwise_common::RecommendationRequest;

use crate::auth::CurrentUser;
use crate::error::{ApiResult, AppError};
use crate::extract::{Json, Query};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub limit: Option<usize>,
    /// Comma separated book ids, e.g. `exclude=1,2`.
    pub exclude: Option<String>,
    #[serde(default)]
    pub refresh: bool,
}

fn parse_ids(raw: &str) -> Result<Vec<i64>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse()
                .map_err(|_| AppError::BadRequest(format!("exclude contains an invalid book id: {id}")))
        })
        .collect()
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RecommendationQuery>,
) -> ApiResult<Vec<Recommendation>> {
    let exclude = match query.exclude.as_deref() {
        Some(raw) => parse_ids(raw)?,
        None => vec![],
    };

    let request = RecommendationRequest {
        user_id: user.id,
        limit: query.limit,
        exclude,
        refresh: query.refresh,
    };
    let list = state
        .db
        .recommendations(&request, state.config.recommendation_ttl())
        .await;

    Ok(Json(list))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_lists_tolerate_spaces_and_trailing_commas() {
        assert_eq!(parse_ids("1, 2,,3,").unwrap(), vec![1, 2, 3]);
        assert!(parse_ids("").unwrap().is_empty());
        assert!(matches!(parse_ids("1,two"), Err(AppError::BadRequest(_))));
    }
}
