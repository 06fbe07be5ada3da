use axum::extract::State;
use serde::Serialize;
use shelfwise_common::{PrivacySettings, PrivacyUpdate, Profile};
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FollowState {
    pub following: bool,
    pub changed: bool,
}

pub async fn me(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<Profile> {
    Ok(Json(state.db.profile(&user, user.id).await?))
}

pub async fn privacy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<PrivacySettings> {
    Ok(Json(state.db.privacy_settings(user.id).await?))
}

pub async fn update_privacy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<PrivacyUpdate>,
) -> ApiResult<PrivacySettings> {
    let settings = state.db.update_privacy_settings(user.id, &update).await?;
    info!("User {} updated privacy settings", user.id);
    Ok(Json(settings))
}

pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Profile> {
    Ok(Json(state.db.profile(&viewer, id).await?))
}

pub async fn follow(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<FollowState> {
    let changed = state.db.follow(&viewer, id).await?;
    Ok(Json(FollowState {
        following: true,
        changed,
    }))
}

pub async fn unfollow(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<FollowState> {
    state.db.user_by_id(id).await?;
    let changed = state.db.unfollow(viewer.id, id).await?;
    Ok(Json(FollowState {
        following: false,
        changed,
    }))
}
