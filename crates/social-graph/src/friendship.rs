//! Friendship deriver: the symmetric relation derived from mutual follows.
//!
//! This module is the only writer of friendship rows. Rows are created when a follow completes
//! a mutual pair and removed when an unfollow breaks one; both calls are made explicitly by the
//! service inside the same unit of work as the edge mutation.

use crate::cursor;
use crate::page::{clamp_limit, into_page};
use chrono::{DateTime, Utc};
use social_types::{
    CanonicalPair, Friendship, GraphStore, GraphTx, Page, SocialGraphError, UserId,
};

/// Canonical form of the unordered pair `{a, b}`.
pub fn canonicalize(a: UserId, b: UserId) -> Result<CanonicalPair, SocialGraphError> {
    CanonicalPair::new(a, b).ok_or(SocialGraphError::SelfAction)
}

/// Called after `follower -> following` was created. When the reverse edge exists, writes the
/// friendship row for the pair. A row that already exists (a racing mutual follow got there
/// first) is absorbed, and `None` is returned.
pub fn derive_if_mutual(
    tx: &mut dyn GraphTx,
    follower: UserId,
    following: UserId,
    created_at: DateTime<Utc>,
) -> Result<Option<Friendship>, SocialGraphError> {
    if !tx.follow_exists(following, follower)? {
        return Ok(None);
    }
    let row = Friendship::new(canonicalize(follower, following)?, created_at);
    if tx.insert_friendship_or_ignore(&row)? {
        tracing::debug!(low = %row.user_low, high = %row.user_high, "friendship derived");
        Ok(Some(row))
    } else {
        Ok(None)
    }
}

/// Called after `follower -> following` was deleted. Removes the pair's friendship row if any;
/// a missing row is not an error. Returns whether a row was removed.
pub fn retract_if_broken(
    tx: &mut dyn GraphTx,
    follower: UserId,
    following: UserId,
) -> Result<bool, SocialGraphError> {
    let pair = canonicalize(follower, following)?;
    let removed = tx.delete_friendship(pair)?;
    if removed {
        tracing::debug!(low = %pair.low(), high = %pair.high(), "friendship retracted");
    }
    Ok(removed)
}

/// Friends of `target` (the other member of each pair), newest first.
pub async fn list_friends<S: GraphStore>(
    store: &S,
    target: UserId,
    limit: usize,
    cursor: Option<&str>,
) -> Result<Page<UserId>, SocialGraphError> {
    let limit = clamp_limit(limit);
    let after = cursor::decode_boundary(cursor)?;
    let rows = store.list_friends(target, after, limit + 1).await?;
    tracing::debug!(user = %target, limit, fetched = rows.len(), "listed friends");
    Ok(into_page(rows, limit))
}

pub async fn are_friends<S: GraphStore>(
    store: &S,
    a: UserId,
    b: UserId,
) -> Result<bool, SocialGraphError> {
    match CanonicalPair::new(a, b) {
        Some(pair) => Ok(store.get_friendship(pair).await?.is_some()),
        None => Ok(false),
    }
}

pub async fn count_friends<S: GraphStore>(
    store: &S,
    user: UserId,
) -> Result<u64, SocialGraphError> {
    Ok(store.count_friends(user).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{follow_store, InMemoryGraphStore};
    use social_types::{Clock, ManualClock};

    async fn follow(store: &InMemoryGraphStore, clock: &ManualClock, a: i64, b: i64) {
        let now = clock.now();
        let (a, b) = (UserId::new(a), UserId::new(b));
        store
            .write(move |tx| {
                follow_store::create(tx, a, b, now)?;
                derive_if_mutual(tx, a, b, now)
            })
            .await
            .unwrap();
    }

    async fn unfollow(store: &InMemoryGraphStore, a: i64, b: i64) {
        let (a, b) = (UserId::new(a), UserId::new(b));
        store
            .write(move |tx| {
                follow_store::delete(tx, a, b)?;
                retract_if_broken(tx, a, b)
            })
            .await
            .unwrap();
    }

    #[test]
    fn canonicalize_orders_pair() {
        let p = canonicalize(UserId::new(20), UserId::new(10)).unwrap();
        assert_eq!((p.low(), p.high()), (UserId::new(10), UserId::new(20)));
        assert!(matches!(
            canonicalize(UserId::new(3), UserId::new(3)),
            Err(SocialGraphError::SelfAction)
        ));
    }

    #[tokio::test]
    async fn derivation_is_order_independent() {
        for (first, second) in [((10, 20), (20, 10)), ((20, 10), (10, 20))] {
            let store = InMemoryGraphStore::new();
            let clock = ManualClock::stepping();
            follow(&store, &clock, first.0, first.1).await;
            assert!(!are_friends(&store, UserId::new(10), UserId::new(20)).await.unwrap());
            follow(&store, &clock, second.0, second.1).await;

            let pair = canonicalize(UserId::new(10), UserId::new(20)).unwrap();
            let row = store.get_friendship(pair).await.unwrap().unwrap();
            assert_eq!(row.user_low, UserId::new(10));
            assert_eq!(row.user_high, UserId::new(20));
            assert_eq!(count_friends(&store, UserId::new(10)).await.unwrap(), 1);
            assert_eq!(count_friends(&store, UserId::new(20)).await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn existing_row_is_absorbed() {
        let store = InMemoryGraphStore::new();
        let clock = ManualClock::stepping();
        follow(&store, &clock, 1, 2).await;
        follow(&store, &clock, 2, 1).await;

        let now = clock.now();
        let again = store
            .write(move |tx| derive_if_mutual(tx, UserId::new(1), UserId::new(2), now))
            .await
            .unwrap();
        assert!(again.is_none());
        assert_eq!(count_friends(&store, UserId::new(1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn retract_is_idempotent_and_keeps_reverse_edge() {
        let store = InMemoryGraphStore::new();
        let clock = ManualClock::stepping();
        follow(&store, &clock, 10, 20).await;
        follow(&store, &clock, 20, 10).await;
        unfollow(&store, 10, 20).await;

        assert!(!are_friends(&store, UserId::new(10), UserId::new(20)).await.unwrap());
        assert!(follow_store::exists(&store, UserId::new(20), UserId::new(10))
            .await
            .unwrap());
        let removed = store
            .write(move |tx| retract_if_broken(tx, UserId::new(10), UserId::new(20)))
            .await
            .unwrap();
        assert!(!removed);
    }

    #[tokio::test]
    async fn list_friends_returns_other_member() {
        let store = InMemoryGraphStore::new();
        let clock = ManualClock::stepping();
        for other in [5, 15, 25] {
            follow(&store, &clock, 10, other).await;
            follow(&store, &clock, other, 10).await;
        }
        follow(&store, &clock, 10, 99).await;

        let page = list_friends(&store, UserId::new(10), 2, None).await.unwrap();
        assert_eq!(page.items, vec![UserId::new(25), UserId::new(15)]);
        assert!(page.has_more);
        let page = list_friends(&store, UserId::new(10), 2, page.next_cursor.as_deref())
            .await
            .unwrap();
        assert_eq!(page.items, vec![UserId::new(5)]);
        assert!(!page.has_more);

        let page = list_friends(&store, UserId::new(15), 10, None).await.unwrap();
        assert_eq!(page.items, vec![UserId::new(10)]);
    }
}
