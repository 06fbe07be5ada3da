pub mod db;
pub mod error;
pub mod library;
pub mod privacy;
pub mod recommend;
pub mod reports;

// Re-export commonly used types
pub use db::{Database, NewGroup, NewShelf, RecommendationRequest, ShelfChanges};
pub use error::{Error, Result};
pub use library::{
    Activity, Author, Book, BookDetail, BookSummary, Comment, FeedItem, Group, GroupDetail,
    GroupMember, NewBook, Notification, PrivacySettings, PrivacyUpdate, Profile, ProgressUpdate,
    Publisher, ReadingProgress, Session, Shelf, ShelfBook, ShelfSummary, User,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    Reader,
    Admin,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ReadingStatus {
    WantToRead,
    Reading,
    Read,
    Dnf,
}

impl ReadingStatus {
    pub const ALL: [ReadingStatus; 4] = [
        ReadingStatus::WantToRead,
        ReadingStatus::Reading,
        ReadingStatus::Read,
        ReadingStatus::Dnf,
    ];

    /// Whether a rating may be attached while in this status.
    pub fn allows_rating(self) -> bool {
        matches!(self, ReadingStatus::Read | ReadingStatus::Dnf)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Followers,
    Private,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ActivityKind {
    ShelfAdd,
    StartedReading,
    Progress,
    FinishedReading,
    Rated,
    GroupJoined,
    GroupCreated,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::ShelfAdd => "shelf_add",
            ActivityKind::StartedReading => "started_reading",
            ActivityKind::Progress => "progress",
            ActivityKind::FinishedReading => "finished_reading",
            ActivityKind::Rated => "rated",
            ActivityKind::GroupJoined => "group_joined",
            ActivityKind::GroupCreated => "group_created",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum GroupRole {
    Owner,
    Moderator,
    Member,
}

impl GroupRole {
    pub fn can_manage(self) -> bool {
        matches!(self, GroupRole::Owner | GroupRole::Moderator)
    }
}

/// Limit/offset window shared by list queries.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
