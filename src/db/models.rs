use serde::{Deserialize, Serialize};

/// A single post within a topic.
///
/// The oldest post of a topic (lowest id) is its original post: the body the
/// topic was opened with. Every later post is a response. Deletion is soft;
/// the row stays behind with `is_deleted` set.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub topic_id: i64,
    pub body: String,
    pub creator_id: i64,
    pub updater_id: i64,
    pub is_deleted: bool,
    pub is_locked: bool,
    pub is_sticky: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A discussion topic.
///
/// `response_count`, `updated_at` and `updater_id` are denormalized from the
/// topic's live replies so listings never need to aggregate the posts table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    pub response_count: i64,
    pub updater_id: Option<i64>,
    pub is_locked: bool,
    pub is_deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A post joined with its topic's title, as returned by search.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostWithTopic {
    pub id: i64,
    pub topic_id: i64,
    pub topic_title: String,
    pub body: String,
    pub creator_id: i64,
    pub updater_id: i64,
    pub is_deleted: bool,
    pub is_sticky: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Role tier of an acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Moderator,
}

impl Role {
    /// Whether this role bypasses lock checks and may moderate.
    #[must_use]
    pub fn is_elevated(self) -> bool {
        matches!(self, Self::Moderator)
    }
}

/// The identity performing a store operation.
///
/// Mutations stamp `creator_id`/`updater_id` from this and apply lock and
/// permission checks against the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub const fn member(id: i64) -> Self {
        Self {
            id,
            role: Role::Member,
        }
    }

    #[must_use]
    pub const fn moderator(id: i64) -> Self {
        Self {
            id,
            role: Role::Moderator,
        }
    }

    #[must_use]
    pub fn is_elevated(&self) -> bool {
        self.role.is_elevated()
    }
}
