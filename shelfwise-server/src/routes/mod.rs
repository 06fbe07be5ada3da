use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::state::AppState;

mod admin;
mod books;
mod groups;
mod preview;
mod progress;
mod recommendations;
mod shelves;
mod social;
mod users;

pub fn api() -> Router<AppState> {
    Router::new()
        .route("/me", get(users::me))
        .route("/me/privacy", get(users::privacy).put(users::update_privacy))
        .route("/books", get(books::search).post(books::create))
        .route("/books/{id}", get(books::detail))
        .route("/users/{id}", get(users::profile))
        .route("/users/{id}/follow", post(users::follow).delete(users::unfollow))
        .route("/users/{id}/shelves", get(shelves::for_user))
        .route("/users/{id}/progress", get(progress::for_user))
        .route("/users/{id}/activities", get(social::for_user))
        .route("/shelves", post(shelves::create))
        .route(
            "/shelves/{id}",
            get(shelves::detail).patch(shelves::update).delete(shelves::remove),
        )
        .route("/shelves/{id}/books", post(shelves::add_book))
        .route("/shelves/{id}/books/{book_id}", delete(shelves::remove_book))
        .route("/progress/{book_id}", put(progress::update))
        .route("/feed", get(social::feed))
        .route("/activities/{id}/likes", post(social::like).delete(social::unlike))
        .route(
            "/activities/{id}/comments",
            get(social::comments).post(social::add_comment),
        )
        .route("/comments/{id}", delete(social::delete_comment))
        .route("/notifications", get(social::notifications))
        .route("/notifications/unread-count", get(social::unread_count))
        .route("/notifications/read-all", post(social::mark_all_read))
        .route("/notifications/{id}/read", post(social::mark_read))
        .route("/groups", get(groups::list).post(groups::create))
        .route("/groups/{id}", get(groups::detail))
        .route(
            "/groups/{id}/members",
            get(groups::members).post(groups::join).delete(groups::leave),
        )
        .route("/groups/{id}/members/{user_id}", post(groups::add_member))
        .route("/groups/{id}/activities", get(groups::activities))
        .route("/recommendations", get(recommendations::list))
        .route("/admin/reports", get(admin::report))
        .route("/link-preview", get(preview::preview))
}
