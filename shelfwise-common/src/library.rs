use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ActivityKind, GroupRole, NotificationKind, ReadingStatus, Role, Visibility,
};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    pub follower_count: i64,
    pub following_count: i64,
    pub followed_by_viewer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Publisher {
    pub id: i64,
    pub name: String,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub page_count: Option<i64>,
    pub published_year: Option<i64>,
    pub publisher_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub cover_url: Option<String>,
    pub authors: Option<String>,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub authors: Vec<Author>,
    pub publisher: Option<Publisher>,
    pub genres: Vec<String>,
    pub average_rating: Option<f64>,
    pub rating_count: i64,
    pub reader_count: i64,
}

/// Catalog entry as submitted by admins or read from an import file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub page_count: Option<i64>,
    pub published_year: Option<i64>,
    pub publisher: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Shelf {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ShelfSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub shelf: Shelf,
    pub book_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ShelfBook {
    pub book_id: i64,
    pub title: String,
    pub cover_url: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReadingProgress {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub status: ReadingStatus,
    pub percentage: f64,
    pub current_page: Option<i64>,
    pub rating: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressUpdate {
    pub status: ReadingStatus,
    pub percentage: Option<f64>,
    pub current_page: Option<i64>,
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Activity {
    pub id: i64,
    pub user_id: i64,
    pub kind: ActivityKind,
    pub book_id: Option<i64>,
    pub shelf_id: Option<i64>,
    pub group_id: Option<i64>,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FeedItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub activity: Activity,
    pub username: String,
    pub book_title: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_viewer: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub activity_id: i64,
    pub user_id: i64,
    pub username: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub actor_id: Option<i64>,
    pub kind: NotificationKind,
    pub activity_id: Option<i64>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct PrivacySettings {
    pub user_id: i64,
    pub profile_visibility: Visibility,
    pub shelves_visibility: Visibility,
    pub activity_visibility: Visibility,
    pub progress_visibility: Visibility,
}

impl PrivacySettings {
    /// Settings assumed for users who never saved any.
    pub fn public(user_id: i64) -> Self {
        Self {
            user_id,
            profile_visibility: Visibility::Public,
            shelves_visibility: Visibility::Public,
            activity_visibility: Visibility::Public,
            progress_visibility: Visibility::Public,
        }
    }

    pub fn apply(&mut self, update: &PrivacyUpdate) {
        if let Some(v) = update.profile_visibility {
            self.profile_visibility = v;
        }
        if let Some(v) = update.shelves_visibility {
            self.shelves_visibility = v;
        }
        if let Some(v) = update.activity_visibility {
            self.activity_visibility = v;
        }
        if let Some(v) = update.progress_visibility {
            self.progress_visibility = v;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrivacyUpdate {
    pub profile_visibility: Option<Visibility>,
    pub shelves_visibility: Option<Visibility>,
    pub activity_visibility: Option<Visibility>,
    pub progress_visibility: Option<Visibility>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GroupDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub group: Group,
    pub member_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GroupMember {
    pub user_id: i64,
    pub username: String,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
}
