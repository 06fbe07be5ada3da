use axum::{
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;
use shelfwise_common::{BookDetail, BookSummary, NewBook, Page};

use crate::auth::{AdminUser, CurrentUser};
use crate::error::{ApiResult, AppError};
use crate::extract::{Json, Path, Query};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub genre: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn search(
    State(state): State<AppState>,
    _: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<BookSummary>> {
    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };
    let books = state
        .db
        .search_books(query.q.as_deref(), query.genre.as_deref(), page)
        .await?;
    Ok(Json(books))
}

pub async fn create(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(book): Json<NewBook>,
) -> Result<(StatusCode, Json<BookDetail>), AppError> {
    let book = state.db.create_book(&book).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn detail(
    State(state): State<AppState>,
    _: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<BookDetail> {
    Ok(Json(state.db.book_detail(id).await?))
}
