use chrono::Utc;

use super::Database;
use crate::privacy::{self, PrivacyScope, Relation};
use crate::{Error, PrivacySettings, PrivacyUpdate, Result, User};

impl Database {
    /// Stored settings, or all-public when the user never saved any.
    pub async fn privacy_settings(&self, user_id: i64) -> Result<PrivacySettings> {
        let settings = sqlx::query_as::<_, PrivacySettings>(
            r#"
            SELECT user_id, profile_visibility, shelves_visibility,
                   activity_visibility, progress_visibility
            FROM privacy_settings
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings.unwrap_or_else(|| PrivacySettings::public(user_id)))
    }

    pub async fn update_privacy_settings(
        &self,
        user_id: i64,
        update: &PrivacyUpdate,
    ) -> Result<PrivacySettings> {
        let mut settings = self.privacy_settings(user_id).await?;
        settings.apply(update);

        sqlx::query(
            r#"
            INSERT INTO privacy_settings (
                user_id, profile_visibility, shelves_visibility,
                activity_visibility, progress_visibility, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                profile_visibility = excluded.profile_visibility,
                shelves_visibility = excluded.shelves_visibility,
                activity_visibility = excluded.activity_visibility,
                progress_visibility = excluded.progress_visibility,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(settings.user_id)
        .bind(settings.profile_visibility)
        .bind(settings.shelves_visibility)
        .bind(settings.activity_visibility)
        .bind(settings.progress_visibility)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(settings)
    }

    /// Admins are treated as owners of everything.
    pub async fn relation(&self, viewer: &User, owner_id: i64) -> Result<Relation> {
        if viewer.id == owner_id || viewer.is_admin() {
            return Ok(Relation::Owner);
        }

        if self.is_following(viewer.id, owner_id).await? {
            Ok(Relation::Follower)
        } else {
            Ok(Relation::Stranger)
        }
    }

    pub async fn can_view(&self, viewer: &User, owner_id: i64, scope: PrivacyScope) -> Result<bool> {
        let relation = self.relation(viewer, owner_id).await?;
        if relation == Relation::Owner {
            return Ok(true);
        }

        let settings = self.privacy_settings(owner_id).await?;
        Ok(privacy::can_view(&settings, scope, relation))
    }

    pub async fn ensure_can_view(&self, viewer: &User, owner_id: i64, scope: PrivacyScope) -> Result<()> {
        if self.can_view(viewer, owner_id, scope).await? {
            Ok(())
        } else {
            Err(Error::forbidden(format!(
                "{scope:?} of user {owner_id} is not visible to you"
            )))
        }
    }
}
