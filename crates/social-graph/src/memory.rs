//! In-memory graph store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use social_types::{
    CanonicalPair, FollowDirection, FollowEdge, Friendship, GraphStore, GraphStoreError, GraphTx,
    ListedUser, PageKey, SocialGraphError, UserId,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// user -> keys of related identities, ascending by `(created_at, id)`.
type KeyIndex = HashMap<UserId, BTreeSet<PageKey>>;

#[derive(Debug, Default)]
struct GraphState {
    /// (follower, following) -> created_at. The map key is the uniqueness constraint.
    follows: BTreeMap<(UserId, UserId), DateTime<Utc>>,
    /// canonical pair -> row.
    friendships: BTreeMap<CanonicalPair, Friendship>,
    /// follower -> (created_at, following).
    out_index: KeyIndex,
    /// following -> (created_at, follower).
    in_index: KeyIndex,
    /// member -> (created_at, other member).
    friend_index: KeyIndex,
}

impl GraphState {
    fn index_insert(index: &mut KeyIndex, user: UserId, key: PageKey) {
        index.entry(user).or_default().insert(key);
    }

    fn index_remove(index: &mut KeyIndex, user: UserId, key: &PageKey) {
        if let Some(keys) = index.get_mut(&user) {
            keys.remove(key);
            if keys.is_empty() {
                index.remove(&user);
            }
        }
    }

    fn put_follow(&mut self, edge: &FollowEdge) -> bool {
        let key = (edge.follower_id, edge.following_id);
        if self.follows.contains_key(&key) {
            return false;
        }
        self.follows.insert(key, edge.created_at);
        Self::index_insert(
            &mut self.out_index,
            edge.follower_id,
            PageKey::new(edge.created_at, edge.following_id),
        );
        Self::index_insert(
            &mut self.in_index,
            edge.following_id,
            PageKey::new(edge.created_at, edge.follower_id),
        );
        true
    }

    fn take_follow(&mut self, follower: UserId, following: UserId) -> Option<FollowEdge> {
        let created_at = self.follows.remove(&(follower, following))?;
        Self::index_remove(
            &mut self.out_index,
            follower,
            &PageKey::new(created_at, following),
        );
        Self::index_remove(
            &mut self.in_index,
            following,
            &PageKey::new(created_at, follower),
        );
        Some(FollowEdge {
            follower_id: follower,
            following_id: following,
            created_at,
        })
    }

    fn put_friendship(&mut self, pair: CanonicalPair, row: &Friendship) -> bool {
        if self.friendships.contains_key(&pair) {
            return false;
        }
        self.friendships.insert(pair, *row);
        Self::index_insert(
            &mut self.friend_index,
            pair.low(),
            PageKey::new(row.created_at, pair.high()),
        );
        Self::index_insert(
            &mut self.friend_index,
            pair.high(),
            PageKey::new(row.created_at, pair.low()),
        );
        true
    }

    fn take_friendship(&mut self, pair: CanonicalPair) -> Option<Friendship> {
        let row = self.friendships.remove(&pair)?;
        Self::index_remove(
            &mut self.friend_index,
            pair.low(),
            &PageKey::new(row.created_at, pair.high()),
        );
        Self::index_remove(
            &mut self.friend_index,
            pair.high(),
            &PageKey::new(row.created_at, pair.low()),
        );
        Some(row)
    }

    /// Keys strictly before `after` in ascending order, walked backwards (newest first).
    fn scan(
        index: &KeyIndex,
        user: UserId,
        after: Option<PageKey>,
        fetch: usize,
    ) -> Vec<ListedUser> {
        let Some(keys) = index.get(&user) else {
            return Vec::new();
        };
        let iter: Box<dyn Iterator<Item = &PageKey> + '_> = match after {
            Some(boundary) => Box::new(keys.range(..boundary).rev()),
            None => Box::new(keys.iter().rev()),
        };
        iter.take(fetch)
            .map(|key| ListedUser {
                user_id: key.id,
                created_at: key.created_at,
            })
            .collect()
    }
}

/// Inverse of one applied change.
enum Undo {
    Follow(UserId, UserId),
    Unfollow(FollowEdge),
    Friendship(CanonicalPair),
    Unfriend(CanonicalPair, Friendship),
}

/// Unit of work over the locked state. Changes apply immediately and are reverted from the
/// undo log if the unit fails.
struct MemoryTx<'a> {
    state: &'a mut GraphState,
    undo: Vec<Undo>,
}

impl MemoryTx<'_> {
    fn rollback(mut self) {
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::Follow(follower, following) => {
                    self.state.take_follow(follower, following);
                }
                Undo::Unfollow(edge) => {
                    self.state.put_follow(&edge);
                }
                Undo::Friendship(pair) => {
                    self.state.take_friendship(pair);
                }
                Undo::Unfriend(pair, row) => {
                    self.state.put_friendship(pair, &row);
                }
            }
        }
    }
}

impl GraphTx for MemoryTx<'_> {
    fn insert_follow(&mut self, edge: &FollowEdge) -> Result<(), GraphStoreError> {
        if edge.follower_id == edge.following_id {
            return Err(GraphStoreError::Other(format!(
                "self follow rejected: {}",
                edge.follower_id
            )));
        }
        if !self.state.put_follow(edge) {
            return Err(GraphStoreError::Conflict(format!(
                "follow {} -> {}",
                edge.follower_id, edge.following_id
            )));
        }
        self.undo
            .push(Undo::Follow(edge.follower_id, edge.following_id));
        Ok(())
    }

    fn delete_follow(
        &mut self,
        follower: UserId,
        following: UserId,
    ) -> Result<bool, GraphStoreError> {
        match self.state.take_follow(follower, following) {
            Some(edge) => {
                self.undo.push(Undo::Unfollow(edge));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn follow_exists(&self, follower: UserId, following: UserId) -> Result<bool, GraphStoreError> {
        Ok(self.state.follows.contains_key(&(follower, following)))
    }

    fn insert_friendship_or_ignore(&mut self, row: &Friendship) -> Result<bool, GraphStoreError> {
        let pair = row.pair().ok_or_else(|| {
            GraphStoreError::Other(format!("self friendship rejected: {}", row.user_low))
        })?;
        if pair.low() != row.user_low {
            return Err(GraphStoreError::Other(format!(
                "friendship not in canonical order: {} > {}",
                row.user_low, row.user_high
            )));
        }
        if self.state.put_friendship(pair, row) {
            self.undo.push(Undo::Friendship(pair));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn delete_friendship(&mut self, pair: CanonicalPair) -> Result<bool, GraphStoreError> {
        match self.state.take_friendship(pair) {
            Some(row) => {
                self.undo.push(Undo::Unfriend(pair, row));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-memory implementation of GraphStore.
///
/// Writers are serialized by the state lock; readers share it. Cloning yields a handle to the
/// same graph.
#[derive(Clone, Default)]
pub struct InMemoryGraphStore {
    state: Arc<RwLock<GraphState>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored follow edges.
    pub async fn follow_count(&self) -> usize {
        self.state.read().await.follows.len()
    }

    /// Number of stored friendship rows.
    pub async fn friendship_count(&self) -> usize {
        self.state.read().await.friendships.len()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn write<T, F>(&self, f: F) -> Result<T, SocialGraphError>
    where
        F: FnOnce(&mut dyn GraphTx) -> Result<T, SocialGraphError> + Send + 'static,
        T: Send + 'static,
    {
        let mut guard = self.state.write().await;
        let mut tx = MemoryTx {
            state: &mut *guard,
            undo: Vec::new(),
        };
        match f(&mut tx) {
            Ok(value) => Ok(value),
            Err(e) => {
                tx.rollback();
                Err(e)
            }
        }
    }

    async fn get_follow(
        &self,
        follower: UserId,
        following: UserId,
    ) -> Result<Option<FollowEdge>, GraphStoreError> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .get(&(follower, following))
            .map(|created_at| FollowEdge {
                follower_id: follower,
                following_id: following,
                created_at: *created_at,
            }))
    }

    async fn get_friendship(
        &self,
        pair: CanonicalPair,
    ) -> Result<Option<Friendship>, GraphStoreError> {
        Ok(self.state.read().await.friendships.get(&pair).copied())
    }

    async fn list_follows(
        &self,
        user: UserId,
        direction: FollowDirection,
        after: Option<PageKey>,
        fetch: usize,
    ) -> Result<Vec<ListedUser>, GraphStoreError> {
        let state = self.state.read().await;
        let index = match direction {
            FollowDirection::Followers => &state.in_index,
            FollowDirection::Following => &state.out_index,
        };
        Ok(GraphState::scan(index, user, after, fetch))
    }

    async fn list_friends(
        &self,
        user: UserId,
        after: Option<PageKey>,
        fetch: usize,
    ) -> Result<Vec<ListedUser>, GraphStoreError> {
        let state = self.state.read().await;
        Ok(GraphState::scan(&state.friend_index, user, after, fetch))
    }

    async fn count_follows(
        &self,
        user: UserId,
        direction: FollowDirection,
    ) -> Result<u64, GraphStoreError> {
        let state = self.state.read().await;
        let index = match direction {
            FollowDirection::Followers => &state.in_index,
            FollowDirection::Following => &state.out_index,
        };
        Ok(index.get(&user).map_or(0, |keys| keys.len() as u64))
    }

    async fn count_friends(&self, user: UserId) -> Result<u64, GraphStoreError> {
        let state = self.state.read().await;
        Ok(state
            .friend_index
            .get(&user)
            .map_or(0, |keys| keys.len() as u64))
    }
}
