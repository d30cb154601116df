//! The procedural surface exposed to transports.

use crate::{
    FollowEdge, ListRequest, Page, RelationCounts, Relationship, SocialGraphError,
    UnfollowResponse, UserId,
};
use async_trait::async_trait;

/// Social graph operations. `caller` is an already-authenticated identity.
#[async_trait]
pub trait SocialGraph: Send + Sync {
    /// Follow `target`; derives a friendship when the follow completes a mutual pair.
    async fn follow(&self, caller: UserId, target: UserId) -> Result<FollowEdge, SocialGraphError>;

    /// Unfollow `target`; retracts the friendship when one existed.
    async fn unfollow(
        &self,
        caller: UserId,
        target: UserId,
    ) -> Result<UnfollowResponse, SocialGraphError>;

    async fn get_followers(
        &self,
        caller: UserId,
        req: &ListRequest,
    ) -> Result<Page<UserId>, SocialGraphError>;

    async fn get_following(
        &self,
        caller: UserId,
        req: &ListRequest,
    ) -> Result<Page<UserId>, SocialGraphError>;

    async fn get_friends(
        &self,
        caller: UserId,
        req: &ListRequest,
    ) -> Result<Page<UserId>, SocialGraphError>;

    /// Follow/friend flags between `caller` and `target`.
    async fn relationship(
        &self,
        caller: UserId,
        target: UserId,
    ) -> Result<Relationship, SocialGraphError>;

    /// Relation counts for `user` (defaults to the caller).
    async fn counts(
        &self,
        caller: UserId,
        user: Option<UserId>,
    ) -> Result<RelationCounts, SocialGraphError>;
}
