//! Traits for graph storage backends and external collaborators.

use crate::{
    CanonicalPair, DirectoryError, FollowDirection, FollowEdge, Friendship, GraphStoreError,
    ListedUser, PageKey, SocialGraphError, UserId,
};
use async_trait::async_trait;

/// Mutations and point reads available inside one unit of work.
///
/// Everything done through a `GraphTx` is committed together when the closure passed to
/// [`GraphStore::write`] returns `Ok`, and discarded when it returns `Err`.
pub trait GraphTx {
    /// Insert a follow edge. Returns `GraphStoreError::Conflict` when the ordered pair is
    /// already present; the check is made by the store's uniqueness constraint.
    fn insert_follow(&mut self, edge: &FollowEdge) -> Result<(), GraphStoreError>;

    /// Delete a follow edge. Returns whether a row was removed.
    fn delete_follow(&mut self, follower: UserId, following: UserId)
        -> Result<bool, GraphStoreError>;

    fn follow_exists(&self, follower: UserId, following: UserId) -> Result<bool, GraphStoreError>;

    /// Insert a friendship row, silently ignoring a row that already exists for the pair.
    /// Returns whether a new row was written.
    fn insert_friendship_or_ignore(&mut self, row: &Friendship) -> Result<bool, GraphStoreError>;

    /// Delete the friendship row for `pair` if present. Returns whether a row was removed.
    fn delete_friendship(&mut self, pair: CanonicalPair) -> Result<bool, GraphStoreError>;
}

/// Shared relational store holding follow edges and friendships.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run `f` as one atomic unit of work. Backends may run `f` off the async runtime.
    async fn write<T, F>(&self, f: F) -> Result<T, SocialGraphError>
    where
        F: FnOnce(&mut dyn GraphTx) -> Result<T, SocialGraphError> + Send + 'static,
        T: Send + 'static;

    /// Get one follow edge by its ordered pair.
    async fn get_follow(
        &self,
        follower: UserId,
        following: UserId,
    ) -> Result<Option<FollowEdge>, GraphStoreError>;

    /// Get the friendship row for a canonical pair.
    async fn get_friendship(
        &self,
        pair: CanonicalPair,
    ) -> Result<Option<Friendship>, GraphStoreError>;

    /// Follow relations of `user` in descending `(created_at, id)` order, strictly after
    /// `after` when given, at most `fetch` rows.
    async fn list_follows(
        &self,
        user: UserId,
        direction: FollowDirection,
        after: Option<PageKey>,
        fetch: usize,
    ) -> Result<Vec<ListedUser>, GraphStoreError>;

    /// Friends of `user`, same ordering and boundary rules as [`GraphStore::list_follows`].
    async fn list_friends(
        &self,
        user: UserId,
        after: Option<PageKey>,
        fetch: usize,
    ) -> Result<Vec<ListedUser>, GraphStoreError>;

    async fn count_follows(
        &self,
        user: UserId,
        direction: FollowDirection,
    ) -> Result<u64, GraphStoreError>;

    async fn count_friends(&self, user: UserId) -> Result<u64, GraphStoreError>;
}

/// Identity-existence check provided by the identity subsystem.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn exists(&self, user: UserId) -> Result<bool, DirectoryError>;
}
