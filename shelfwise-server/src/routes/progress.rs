use axum::extract::State;
use shelfwise_common::{ProgressUpdate, ReadingProgress};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::state::AppState;

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(reader): CurrentUser,
    Path(book_id): Path<i64>,
    Json(update): Json<ProgressUpdate>,
) -> ApiResult<ReadingProgress> {
    Ok(Json(state.db.update_progress(&reader, book_id, &update).await?))
}

pub async fn for_user(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Vec<ReadingProgress>> {
    Ok(Json(state.db.user_progress(&viewer, user_id).await?))
}
