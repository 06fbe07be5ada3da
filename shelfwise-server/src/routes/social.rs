use axum::{
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use shelfwise_common::{Comment, FeedItem, Notification, Page};

use crate::auth::CurrentUser;
use crate::error::{ApiResult, AppError};
use crate::extract::{Json, Path, Query};
use crate::state::AppState;

/// Keyset pagination: `before` is the id of the oldest activity already seen.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub before: Option<i64>,
    pub limit: Option<i64>,
}

impl FeedQuery {
    pub fn page(&self) -> Page {
        Page {
            limit: self.limit,
            offset: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NewComment {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

pub async fn feed(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Vec<FeedItem>> {
    Ok(Json(state.db.feed(&viewer, query.before, query.page()).await?))
}

pub async fn for_user(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(user_id): Path<i64>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Vec<FeedItem>> {
    let items = state
        .db
        .user_activities(&viewer, user_id, query.before, query.page())
        .await?;
    Ok(Json(items))
}

pub async fn like(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<LikeState> {
    let changed = state.db.like_activity(&viewer, id).await?;
    Ok(Json(LikeState { liked: true, changed }))
}

pub async fn unlike(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<LikeState> {
    let changed = state.db.unlike_activity(&viewer, id).await?;
    Ok(Json(LikeState {
        liked: false,
        changed,
    }))
}

pub async fn comments(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Comment>> {
    Ok(Json(state.db.comments(&viewer, id).await?))
}

pub async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<i64>,
    Json(comment): Json<NewComment>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let comment = state.db.add_comment(&viewer, id, &comment.body).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.db.delete_comment(&viewer, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Vec<Notification>> {
    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };
    Ok(Json(state.db.notifications(user.id, query.unread_only, page).await?))
}

pub async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<UnreadCount> {
    let unread = state.db.unread_notification_count(user.id).await?;
    Ok(Json(UnreadCount { unread }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.db.mark_notification_read(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<MarkedRead> {
    let updated = state.db.mark_all_notifications_read(user.id).await?;
    Ok(Json(MarkedRead { updated }))
}
