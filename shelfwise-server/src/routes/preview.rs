use axum::extract::State;
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::{Json, Query};
use crate::link_preview::LinkPreview;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub url: String,
}

pub async fn preview(
    State(state): State<AppState>,
    _: CurrentUser,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<LinkPreview> {
    Ok(Json(state.previewer.preview(&query.url).await?))
}
