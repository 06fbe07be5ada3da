use chrono::Utc;
use serde::Deserialize;

use super::social::{record_activity, NewActivity};
use super::Database;
use crate::{ActivityKind, Error, GroupDetail, GroupMember, GroupRole, Page, Result, User};

#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

const GROUP_DETAIL_SELECT: &str = r#"
    SELECT g.*, (SELECT COUNT(*) FROM group_members m WHERE m.group_id = g.id) AS member_count
    FROM reading_groups g
"#;

impl Database {
    pub async fn create_group(&self, owner: &User, group: &NewGroup) -> Result<GroupDetail> {
        let name = group.name.trim();
        if name.is_empty() || name.chars().count() > 100 {
            return Err(Error::invalid("group name must be between 1 and 100 characters"));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let group_id = sqlx::query(
            r#"
            INSERT INTO reading_groups (name, description, is_private, owner_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(&group.description)
        .bind(group.is_private)
        .bind(owner.id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match Error::from(e) {
            Error::Conflict(_) => Error::conflict(format!("a group named {name} already exists")),
            other => other,
        })?
        .last_insert_rowid();

        sqlx::query("INSERT INTO group_members (group_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)")
            .bind(group_id)
            .bind(owner.id)
            .bind(GroupRole::Owner)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let activity = NewActivity {
            group_id: Some(group_id),
            detail: Some(name),
            ..NewActivity::new(owner.id, ActivityKind::GroupCreated)
        };
        record_activity(&mut tx, activity).await?;

        tx.commit().await?;
        self.group(group_id).await
    }

    pub async fn group(&self, group_id: i64) -> Result<GroupDetail> {
        let sql = format!("{GROUP_DETAIL_SELECT} WHERE g.id = ?");
        sqlx::query_as::<_, GroupDetail>(&sql)
            .bind(group_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("Group"))
    }

    pub async fn groups(&self, page: Page) -> Result<Vec<GroupDetail>> {
        let sql = format!("{GROUP_DETAIL_SELECT} ORDER BY g.name COLLATE NOCASE, g.id LIMIT ? OFFSET ?");
        let groups = sqlx::query_as::<_, GroupDetail>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(groups)
    }

    pub async fn group_role(&self, group_id: i64, user_id: i64) -> Result<Option<GroupRole>> {
        let role = sqlx::query_scalar::<_, GroupRole>(
            "SELECT role FROM group_members WHERE group_id = ? AND user_id = ?",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    /// Private groups expose members and activity to members only.
    pub async fn ensure_group_visible(&self, viewer: &User, group_id: i64) -> Result<GroupDetail> {
        let group = self.group(group_id).await?;
        if group.group.is_private
            && !viewer.is_admin()
            && self.group_role(group_id, viewer.id).await?.is_none()
        {
            return Err(Error::forbidden("group is private"));
        }
        Ok(group)
    }

    async fn insert_member(&self, group: &GroupDetail, user: &User) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id, role, joined_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(group.group.id)
        .bind(user.id)
        .bind(GroupRole::Member)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if inserted {
            let activity = NewActivity {
                group_id: Some(group.group.id),
                detail: Some(group.group.name.as_str()),
                ..NewActivity::new(user.id, ActivityKind::GroupJoined)
            };
            record_activity(&mut tx, activity).await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Joins a public group. Returns whether the membership is new.
    pub async fn join_group(&self, user: &User, group_id: i64) -> Result<bool> {
        let group = self.group(group_id).await?;
        if group.group.is_private && self.group_role(group_id, user.id).await?.is_none() {
            return Err(Error::forbidden(
                "private groups can only be joined when a moderator adds you",
            ));
        }
        self.insert_member(&group, user).await
    }

    /// Adds another user; only owners and moderators may do this.
    pub async fn add_group_member(&self, manager: &User, group_id: i64, user_id: i64) -> Result<bool> {
        let group = self.group(group_id).await?;
        let role = self.group_role(group_id, manager.id).await?;
        if !role.is_some_and(GroupRole::can_manage) && !manager.is_admin() {
            return Err(Error::forbidden("only group owners and moderators can add members"));
        }

        let user = self.user_by_id(user_id).await?;
        self.insert_member(&group, &user).await
    }

    pub async fn leave_group(&self, user: &User, group_id: i64) -> Result<()> {
        match self.group_role(group_id, user.id).await? {
            None => {
                self.group(group_id).await?;
                Err(Error::NotFound("Group membership"))
            }
            Some(GroupRole::Owner) => Err(Error::conflict("the owner cannot leave their group")),
            Some(_) => {
                sqlx::query("DELETE FROM group_members WHERE group_id = ? AND user_id = ?")
                    .bind(group_id)
                    .bind(user.id)
                    .execute(&self.pool)
                    .await?;
                Ok(())
            }
        }
    }

    pub async fn group_members(&self, viewer: &User, group_id: i64) -> Result<Vec<GroupMember>> {
        self.ensure_group_visible(viewer, group_id).await?;

        let members = sqlx::query_as::<_, GroupMember>(
            r#"
            SELECT m.user_id, u.username, m.role, m.joined_at
            FROM group_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.group_id = ?
            ORDER BY m.joined_at, m.user_id
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }
}
