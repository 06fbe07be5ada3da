use axum::{
    extract::State,
    http::StatusCode,
};
use serde::Serialize;
use shelfwise_common::{FeedItem, GroupDetail, GroupMember, NewGroup, Page};

use super::social::FeedQuery;
use crate::auth::CurrentUser;
use crate::error::{ApiResult, AppError};
use crate::extract::{Json, Path, Query};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Membership {
    pub member: bool,
    pub changed: bool,
}

pub async fn list(
    State(state): State<AppState>,
    _: CurrentUser,
    Query(page): Query<Page>,
) -> ApiResult<Vec<GroupDetail>> {
    Ok(Json(state.db.groups(page).await?))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Json(group): Json<NewGroup>,
) -> Result<(StatusCode, Json<GroupDetail>), AppError> {
    let group = state.db.create_group(&owner, &group).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn detail(
    State(state): State<AppState>,
    _: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<GroupDetail> {
    Ok(Json(state.db.group(id).await?))
}

pub async fn members(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Vec<GroupMember>> {
    Ok(Json(state.db.group_members(&viewer, id).await?))
}

pub async fn join(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Membership> {
    let changed = state.db.join_group(&user, id).await?;
    Ok(Json(Membership {
        member: true,
        changed,
    }))
}

pub async fn add_member(
    State(state): State<AppState>,
    CurrentUser(manager): CurrentUser,
    Path((id, user_id)): Path<(i64, i64)>,
) -> ApiResult<Membership> {
    let changed = state.db.add_group_member(&manager, id, user_id).await?;
    Ok(Json(Membership {
        member: true,
        changed,
    }))
}

pub async fn leave(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.db.leave_group(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn activities(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<i64>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Vec<FeedItem>> {
    let items = state
        .db
        .group_activities(&viewer, id, query.before, query.page())
        .await?;
    Ok(Json(items))
}
