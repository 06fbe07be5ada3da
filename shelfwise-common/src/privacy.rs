//! Visibility decisions for profile, shelf, activity and progress data.
//!
//! The database layer resolves who is asking and what the owner configured;
//! the decision itself lives here so it can be reasoned about without a pool.

use crate::{PrivacySettings, Visibility};

/// How the viewer relates to the owner of the data being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Owner,
    Follower,
    Stranger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivacyScope {
    Profile,
    Shelves,
    Activity,
    Progress,
}

impl PrivacyScope {
    pub fn visibility(self, settings: &PrivacySettings) -> Visibility {
        match self {
            PrivacyScope::Profile => settings.profile_visibility,
            PrivacyScope::Shelves => settings.shelves_visibility,
            PrivacyScope::Activity => settings.activity_visibility,
            PrivacyScope::Progress => settings.progress_visibility,
        }
    }
}

pub fn is_visible(visibility: Visibility, relation: Relation) -> bool {
    match (visibility, relation) {
        (_, Relation::Owner) => true,
        (Visibility::Public, _) => true,
        (Visibility::Followers, Relation::Follower) => true,
        _ => false,
    }
}

pub fn can_view(settings: &PrivacySettings, scope: PrivacyScope, relation: Relation) -> bool {
    is_visible(scope.visibility(settings), relation)
}
