use axum::{
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use shelfwise_common::{NewShelf, Shelf, ShelfBook, ShelfChanges, ShelfSummary};

use crate::auth::CurrentUser;
use crate::error::{ApiResult, AppError};
use crate::extract::{Json, Path};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ShelfView {
    #[serde(flatten)]
    pub shelf: Shelf,
    pub books: Vec<ShelfBook>,
}

#[derive(Debug, Deserialize)]
pub struct AddBook {
    pub book_id: i64,
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Json(shelf): Json<NewShelf>,
) -> Result<(StatusCode, Json<Shelf>), AppError> {
    let shelf = state.db.create_shelf(&owner, &shelf).await?;
    Ok((StatusCode::CREATED, Json(shelf)))
}

pub async fn detail(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<ShelfView> {
    let shelf = state.db.visible_shelf(&viewer, id).await?;
    let books = state.db.shelf_books(&viewer, id).await?;
    Ok(Json(ShelfView { shelf, books }))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<i64>,
    Json(changes): Json<ShelfChanges>,
) -> ApiResult<Shelf> {
    Ok(Json(state.db.update_shelf(&owner, id, &changes).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.db.delete_shelf(&owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_book(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<i64>,
    Json(AddBook { book_id }): Json<AddBook>,
) -> Result<(StatusCode, Json<Vec<ShelfBook>>), AppError> {
    state.db.add_book_to_shelf(&owner, id, book_id).await?;
    let books = state.db.shelf_books(&owner, id).await?;
    Ok((StatusCode::CREATED, Json(books)))
}

pub async fn remove_book(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path((id, book_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    state.db.remove_book_from_shelf(&owner, id, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn for_user(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Vec<ShelfSummary>> {
    Ok(Json(state.db.user_shelves(&viewer, user_id).await?))
}
