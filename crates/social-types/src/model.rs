//! Stored rows and pagination shapes.

use crate::{CanonicalPair, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Directed follow edge. `follower != following` always holds for stored edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowEdge {
    pub follower_id: UserId,
    pub following_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Symmetric friendship row, stored once per canonical pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friendship {
    pub user_low: UserId,
    pub user_high: UserId,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    pub fn new(pair: CanonicalPair, created_at: DateTime<Utc>) -> Self {
        Self {
            user_low: pair.low(),
            user_high: pair.high(),
            created_at,
        }
    }

    pub fn pair(&self) -> Option<CanonicalPair> {
        CanonicalPair::new(self.user_low, self.user_high)
    }
}

/// Which side of the follow relation a listing filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowDirection {
    /// Edges pointing at the user; lists the followers.
    Followers,
    /// Edges leaving the user; lists the followed identities.
    Following,
}

/// Keyset position `(created_at, id)` in a descending listing.
///
/// `id` is the identity being listed, which is unique within one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageKey {
    pub created_at: DateTime<Utc>,
    pub id: UserId,
}

impl PageKey {
    pub fn new(created_at: DateTime<Utc>, id: UserId) -> Self {
        Self { created_at, id }
    }

    /// True when `self` comes strictly after `boundary` in descending order:
    /// `created_at < b.created_at OR (created_at = b.created_at AND id < b.id)`.
    pub fn is_after(&self, boundary: &PageKey) -> bool {
        self.created_at < boundary.created_at
            || (self.created_at == boundary.created_at && self.id < boundary.id)
    }
}

/// One entry of a listing: the listed identity and when the relation was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListedUser {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl ListedUser {
    pub fn key(&self) -> PageKey {
        PageKey::new(self.created_at, self.user_id)
    }
}

/// A page of results. `next_cursor` is present exactly when `has_more` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Follow/friend flags between a caller and a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub following: bool,
    pub followed_by: bool,
    pub friends: bool,
}

/// Relation counts for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationCounts {
    pub followers: u64,
    pub following: u64,
    pub friends: u64,
}
