use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use super::Database;
use crate::privacy::PrivacyScope;
use crate::{
    Activity, ActivityKind, Comment, Error, FeedItem, Notification, NotificationKind, Page,
    Result, User,
};

const MAX_COMMENT_CHARS: usize = 2000;

const FEED_SELECT: &str = r#"
    SELECT a.id, a.user_id, a.kind, a.book_id, a.shelf_id, a.group_id, a.detail, a.created_at,
           u.username AS username,
           b.title AS book_title,
           (SELECT COUNT(*) FROM activity_likes l WHERE l.activity_id = a.id) AS like_count,
           (SELECT COUNT(*) FROM comments c WHERE c.activity_id = a.id) AS comment_count,
           EXISTS(
               SELECT 1 FROM activity_likes l WHERE l.activity_id = a.id AND l.user_id = ?1
           ) AS liked_by_viewer
    FROM activities a
    JOIN users u ON u.id = a.user_id
    LEFT JOIN books b ON b.id = a.book_id
    LEFT JOIN privacy_settings p ON p.user_id = a.user_id
    LEFT JOIN reading_groups g ON g.id = a.group_id
    LEFT JOIN shelves s ON s.id = a.shelf_id
    WHERE (g.id IS NULL OR g.is_private = 0 OR EXISTS(
               SELECT 1 FROM group_members gm WHERE gm.group_id = g.id AND gm.user_id = ?1
           ))
      AND (s.id IS NULL OR s.is_public = 1 OR a.user_id = ?1)
      AND (?2 IS NULL OR a.id < ?2)
"#;

/// Activity about to be recorded alongside the write that caused it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NewActivity<'a> {
    pub user_id: i64,
    pub kind: ActivityKind,
    pub book_id: Option<i64>,
    pub shelf_id: Option<i64>,
    pub group_id: Option<i64>,
    pub detail: Option<&'a str>,
}

impl<'a> NewActivity<'a> {
    pub fn new(user_id: i64, kind: ActivityKind) -> Self {
        Self {
            user_id,
            kind,
            book_id: None,
            shelf_id: None,
            group_id: None,
            detail: None,
        }
    }
}

pub(crate) async fn record_activity(
    conn: &mut SqliteConnection,
    activity: NewActivity<'_>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO activities (user_id, kind, book_id, shelf_id, group_id, detail, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(activity.user_id)
    .bind(activity.kind)
    .bind(activity.book_id)
    .bind(activity.shelf_id)
    .bind(activity.group_id)
    .bind(activity.detail)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    debug!(
        "Recorded {} activity for user {}",
        activity.kind.as_str(),
        activity.user_id
    );
    Ok(result.last_insert_rowid())
}

pub(crate) async fn notify(
    conn: &mut SqliteConnection,
    recipient: i64,
    actor: &User,
    kind: NotificationKind,
    activity_id: Option<i64>,
    message: &str,
) -> Result<()> {
    if recipient == actor.id {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO notifications (user_id, actor_id, kind, activity_id, message, is_read, created_at)
        VALUES (?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(recipient)
    .bind(actor.id)
    .bind(kind)
    .bind(activity_id)
    .bind(message)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl Database {
    /// Activities from the viewer and everyone they follow, newest first.
    pub async fn feed(&self, viewer: &User, before: Option<i64>, page: Page) -> Result<Vec<FeedItem>> {
        let sql = format!(
            r#"{FEED_SELECT}
              AND (a.user_id = ?1 OR (
                  a.user_id IN (SELECT followee_id FROM follows WHERE follower_id = ?1)
                  AND COALESCE(p.activity_visibility, 'public') != 'private'
              ))
            ORDER BY a.id DESC
            LIMIT ?3
            "#
        );

        let items = sqlx::query_as::<_, FeedItem>(&sql)
            .bind(viewer.id)
            .bind(before)
            .bind(page.limit())
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    pub async fn user_activities(
        &self,
        viewer: &User,
        user_id: i64,
        before: Option<i64>,
        page: Page,
    ) -> Result<Vec<FeedItem>> {
        self.user_by_id(user_id).await?;
        self.ensure_can_view(viewer, user_id, PrivacyScope::Activity)
            .await?;

        let sql = format!("{FEED_SELECT} AND a.user_id = ?4 ORDER BY a.id DESC LIMIT ?3");
        let items = sqlx::query_as::<_, FeedItem>(&sql)
            .bind(viewer.id)
            .bind(before)
            .bind(page.limit())
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    pub async fn group_activities(
        &self,
        viewer: &User,
        group_id: i64,
        before: Option<i64>,
        page: Page,
    ) -> Result<Vec<FeedItem>> {
        self.ensure_group_visible(viewer, group_id).await?;

        let sql = format!(
            r#"{FEED_SELECT}
              AND a.group_id = ?4
              AND (a.user_id = ?1 OR COALESCE(p.activity_visibility, 'public') != 'private')
            ORDER BY a.id DESC
            LIMIT ?3
            "#
        );
        let items = sqlx::query_as::<_, FeedItem>(&sql)
            .bind(viewer.id)
            .bind(before)
            .bind(page.limit())
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    pub async fn activity(&self, activity_id: i64) -> Result<Activity> {
        sqlx::query_as::<_, Activity>("SELECT * FROM activities WHERE id = ?")
            .bind(activity_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("Activity"))
    }

    /// Loads an activity the viewer is allowed to see.
    pub async fn visible_activity(&self, viewer: &User, activity_id: i64) -> Result<Activity> {
        let activity = self.activity(activity_id).await?;

        self.ensure_can_view(viewer, activity.user_id, PrivacyScope::Activity)
            .await?;
        if let Some(group_id) = activity.group_id {
            self.ensure_group_visible(viewer, group_id).await?;
        }
        if let Some(shelf_id) = activity.shelf_id {
            let shelf = self.shelf(shelf_id).await?;
            if !shelf.is_public && shelf.user_id != viewer.id && !viewer.is_admin() {
                return Err(Error::forbidden("shelf is private"));
            }
        }

        Ok(activity)
    }

    /// Returns whether a new like was stored.
    pub async fn like_activity(&self, viewer: &User, activity_id: i64) -> Result<bool> {
        let activity = self.visible_activity(viewer, activity_id).await?;
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO activity_likes (activity_id, user_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(activity.id)
        .bind(viewer.id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if inserted {
            let message = format!("{} liked your activity", viewer.username);
            notify(
                &mut tx,
                activity.user_id,
                viewer,
                NotificationKind::Like,
                Some(activity.id),
                &message,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn unlike_activity(&self, viewer: &User, activity_id: i64) -> Result<bool> {
        self.activity(activity_id).await?;

        let removed = sqlx::query("DELETE FROM activity_likes WHERE activity_id = ? AND user_id = ?")
            .bind(activity_id)
            .bind(viewer.id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(removed > 0)
    }

    pub async fn comments(&self, viewer: &User, activity_id: i64) -> Result<Vec<Comment>> {
        self.visible_activity(viewer, activity_id).await?;

        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.activity_id, c.user_id, u.username, c.body, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.activity_id = ?
            ORDER BY c.id ASC
            "#,
        )
        .bind(activity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    pub async fn add_comment(&self, viewer: &User, activity_id: i64, body: &str) -> Result<Comment> {
        let body = body.trim();
        if body.is_empty() || body.chars().count() > MAX_COMMENT_CHARS {
            return Err(Error::invalid(format!(
                "comment must be between 1 and {MAX_COMMENT_CHARS} characters"
            )));
        }

        let activity = self.visible_activity(viewer, activity_id).await?;
        let mut tx = self.pool.begin().await?;

        let comment_id = sqlx::query(
            "INSERT INTO comments (activity_id, user_id, body, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(activity.id)
        .bind(viewer.id)
        .bind(body)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let message = format!("{} commented on your activity", viewer.username);
        notify(
            &mut tx,
            activity.user_id,
            viewer,
            NotificationKind::Comment,
            Some(activity.id),
            &message,
        )
        .await?;

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.activity_id, c.user_id, u.username, c.body, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.id = ?
            "#,
        )
        .bind(comment_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(comment)
    }

    /// Comment authors, the activity owner and admins may delete a comment.
    pub async fn delete_comment(&self, viewer: &User, comment_id: i64) -> Result<()> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT c.user_id, a.user_id
            FROM comments c
            JOIN activities a ON a.id = c.activity_id
            WHERE c.id = ?
            "#,
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        let (author_id, owner_id) = row.ok_or(Error::NotFound("Comment"))?;
        if viewer.id != author_id && viewer.id != owner_id && !viewer.is_admin() {
            return Err(Error::forbidden("cannot delete another user's comment"));
        }

        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn notifications(
        &self,
        user_id: i64,
        unread_only: bool,
        page: Page,
    ) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = ? AND (? = 0 OR is_read = 0)
            ORDER BY id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    pub async fn unread_notification_count(&self, user_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn mark_notification_read(&self, user_id: i64, notification_id: i64) -> Result<()> {
        let recipient = sqlx::query_scalar::<_, i64>("SELECT user_id FROM notifications WHERE id = ?")
            .bind(notification_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("Notification"))?;

        if recipient != user_id {
            return Err(Error::forbidden("notification belongs to another user"));
        }

        sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(notification_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Returns how many notifications flipped to read.
    pub async fn mark_all_notifications_read(&self, user_id: i64) -> Result<u64> {
        let updated = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(updated)
    }
}
