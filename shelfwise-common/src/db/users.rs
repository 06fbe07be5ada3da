use std::sync::OnceLock;

use chrono::{Duration, Utc};
use regex::Regex;
use tracing::info;
use uuid::Uuid;

use super::social::notify;
use super::Database;
use crate::privacy::PrivacyScope;
use crate::{Error, NotificationKind, Profile, Result, Role, Session, User};

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9_]{3,32}$").expect("username pattern is valid"))
}

impl Database {
    pub async fn create_user(
        &self,
        username: &str,
        display_name: Option<&str>,
        role: Role,
    ) -> Result<User> {
        if !username_pattern().is_match(username) {
            return Err(Error::invalid(
                "username must be 3-32 characters of a-z, 0-9 or _",
            ));
        }

        let id = sqlx::query(
            "INSERT INTO users (username, display_name, role, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(display_name)
        .bind(role)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        info!("Created user {username} ({id})");
        self.user_by_id(id).await
    }

    pub async fn user_by_id(&self, id: i64) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("User"))
    }

    pub async fn user_by_username(&self, username: &str) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("User"))
    }

    pub async fn create_session(&self, user_id: i64, ttl: Duration) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
        };

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(session)
    }

    /// The user owning an unexpired session token.
    pub async fn session_user(&self, token: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.* FROM users u
            JOIN sessions s ON s.user_id = u.id
            WHERE s.token = ? AND s.expires_at > ?
            "#,
        )
        .bind(token)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn revoke_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn is_following(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ? AND followee_id = ?)",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Returns whether a new follow was stored; following twice is a no-op.
    pub async fn follow(&self, follower: &User, followee_id: i64) -> Result<bool> {
        if follower.id == followee_id {
            return Err(Error::invalid("cannot follow yourself"));
        }
        self.user_by_id(followee_id).await?;

        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, followee_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(follower.id)
        .bind(followee_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if inserted {
            let message = format!("{} started following you", follower.username);
            notify(&mut tx, followee_id, follower, NotificationKind::Follow, None, &message).await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn unfollow(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let removed = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
            .bind(follower_id)
            .bind(followee_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(removed > 0)
    }

    pub async fn profile(&self, viewer: &User, user_id: i64) -> Result<Profile> {
        let user = self.user_by_id(user_id).await?;
        self.ensure_can_view(viewer, user_id, PrivacyScope::Profile)
            .await?;

        let (follower_count, following_count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM follows WHERE followee_id = ?1),
                (SELECT COUNT(*) FROM follows WHERE follower_id = ?1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let followed_by_viewer = self.is_following(viewer.id, user_id).await?;

        Ok(Profile {
            user,
            follower_count,
            following_count,
            followed_by_viewer,
        })
    }
}
