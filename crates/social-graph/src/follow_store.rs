//! Follow store: the asymmetric follow relation.
//!
//! Mutations run inside a caller-provided unit of work ([`GraphTx`]) so they can be committed
//! together with friendship reconciliation. Friendship rows are never touched here.

use crate::cursor;
use crate::page::{clamp_limit, into_page};
use chrono::{DateTime, Utc};
use social_types::{
    FollowDirection, FollowEdge, GraphStore, GraphStoreError, GraphTx, Page, SocialGraphError,
    UserId,
};

/// Insert the edge `follower -> following`.
///
/// Fails with `SelfAction` for equal endpoints and `AlreadyFollowing` when the store's
/// uniqueness constraint rejects the insert.
pub fn create(
    tx: &mut dyn GraphTx,
    follower: UserId,
    following: UserId,
    created_at: DateTime<Utc>,
) -> Result<FollowEdge, SocialGraphError> {
    if follower == following {
        return Err(SocialGraphError::SelfAction);
    }
    let edge = FollowEdge {
        follower_id: follower,
        following_id: following,
        created_at,
    };
    match tx.insert_follow(&edge) {
        Ok(()) => Ok(edge),
        Err(GraphStoreError::Conflict(_)) => Err(SocialGraphError::AlreadyFollowing(following)),
        Err(e) => Err(e.into()),
    }
}

/// Remove the edge `follower -> following`. Fails with `NotFollowing` when it is absent.
pub fn delete(
    tx: &mut dyn GraphTx,
    follower: UserId,
    following: UserId,
) -> Result<(), SocialGraphError> {
    if follower == following {
        return Err(SocialGraphError::SelfAction);
    }
    if tx.delete_follow(follower, following)? {
        Ok(())
    } else {
        Err(SocialGraphError::NotFollowing(following))
    }
}

/// Whether `follower` currently follows `following`.
pub async fn exists<S: GraphStore>(
    store: &S,
    follower: UserId,
    following: UserId,
) -> Result<bool, SocialGraphError> {
    Ok(store.get_follow(follower, following).await?.is_some())
}

/// Followers of `target`, newest first.
pub async fn list_followers<S: GraphStore>(
    store: &S,
    target: UserId,
    limit: usize,
    cursor: Option<&str>,
) -> Result<Page<UserId>, SocialGraphError> {
    list(store, target, FollowDirection::Followers, limit, cursor).await
}

/// Identities `source` follows, newest first.
pub async fn list_following<S: GraphStore>(
    store: &S,
    source: UserId,
    limit: usize,
    cursor: Option<&str>,
) -> Result<Page<UserId>, SocialGraphError> {
    list(store, source, FollowDirection::Following, limit, cursor).await
}

async fn list<S: GraphStore>(
    store: &S,
    user: UserId,
    direction: FollowDirection,
    limit: usize,
    cursor: Option<&str>,
) -> Result<Page<UserId>, SocialGraphError> {
    let limit = clamp_limit(limit);
    let after = cursor::decode_boundary(cursor)?;
    let rows = store.list_follows(user, direction, after, limit + 1).await?;
    tracing::debug!(
        user = %user,
        ?direction,
        limit,
        fetched = rows.len(),
        "listed follows"
    );
    Ok(into_page(rows, limit))
}

pub async fn count_followers<S: GraphStore>(
    store: &S,
    user: UserId,
) -> Result<u64, SocialGraphError> {
    Ok(store.count_follows(user, FollowDirection::Followers).await?)
}

pub async fn count_following<S: GraphStore>(
    store: &S,
    user: UserId,
) -> Result<u64, SocialGraphError> {
    Ok(store.count_follows(user, FollowDirection::Following).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryGraphStore;
    use social_types::{Clock, ManualClock};

    async fn follow(store: &InMemoryGraphStore, clock: &ManualClock, a: i64, b: i64) {
        let now = clock.now();
        store
            .write(move |tx| create(tx, UserId::new(a), UserId::new(b), now))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_rejects_self_and_duplicates() {
        let store = InMemoryGraphStore::new();
        let clock = ManualClock::stepping();
        let now = clock.now();

        let err = store
            .write(move |tx| create(tx, UserId::new(1), UserId::new(1), now))
            .await
            .unwrap_err();
        assert!(matches!(err, SocialGraphError::SelfAction));

        follow(&store, &clock, 1, 2).await;
        let err = store
            .write(move |tx| create(tx, UserId::new(1), UserId::new(2), now))
            .await
            .unwrap_err();
        assert!(matches!(err, SocialGraphError::AlreadyFollowing(id) if id == UserId::new(2)));
        assert_eq!(count_following(&store, UserId::new(1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_requires_existing_edge() {
        let store = InMemoryGraphStore::new();
        let clock = ManualClock::stepping();

        let err = store
            .write(move |tx| delete(tx, UserId::new(1), UserId::new(2)))
            .await
            .unwrap_err();
        assert!(matches!(err, SocialGraphError::NotFollowing(_)));

        follow(&store, &clock, 1, 2).await;
        store
            .write(move |tx| delete(tx, UserId::new(1), UserId::new(2)))
            .await
            .unwrap();
        assert!(!exists(&store, UserId::new(1), UserId::new(2)).await.unwrap());
    }

    #[tokio::test]
    async fn twenty_five_followers_page_as_twenty_then_five() {
        let store = InMemoryGraphStore::new();
        let clock = ManualClock::stepping();
        let x = 1_000;
        for follower in 1..=25 {
            follow(&store, &clock, follower, x).await;
        }

        let first = list_followers(&store, UserId::new(x), 20, None).await.unwrap();
        assert_eq!(first.items.len(), 20);
        assert!(first.has_more);
        assert_eq!(first.items[0], UserId::new(25));

        let second = list_followers(&store, UserId::new(x), 20, first.next_cursor.as_deref())
            .await
            .unwrap();
        assert_eq!(
            second.items,
            (1..=5).rev().map(UserId::new).collect::<Vec<_>>()
        );
        assert!(!second.has_more);
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn pagination_is_complete_for_every_page_size() {
        let store = InMemoryGraphStore::new();
        // Every follow shares one timestamp so ordering falls back to the id tie-break.
        let clock = ManualClock::frozen(chrono::DateTime::from_timestamp(1_000, 0).unwrap());
        let target = 500;
        for follower in 1..=17 {
            follow(&store, &clock, follower, target).await;
        }

        for k in 1..=18 {
            let mut seen = Vec::new();
            let mut cursor: Option<String> = None;
            loop {
                let page = list_followers(&store, UserId::new(target), k, cursor.as_deref())
                    .await
                    .unwrap();
                seen.extend(page.items);
                if !page.has_more {
                    break;
                }
                cursor = page.next_cursor;
            }
            let mut dedup = seen.clone();
            dedup.sort();
            dedup.dedup();
            assert_eq!(seen.len(), 17, "page size {}", k);
            assert_eq!(dedup.len(), 17, "page size {}", k);
            assert_eq!(seen[0], UserId::new(17));
        }
    }

    #[tokio::test]
    async fn list_following_is_scoped_to_source() {
        let store = InMemoryGraphStore::new();
        let clock = ManualClock::stepping();
        follow(&store, &clock, 1, 2).await;
        follow(&store, &clock, 1, 3).await;
        follow(&store, &clock, 4, 2).await;

        let page = list_following(&store, UserId::new(1), 10, None).await.unwrap();
        assert_eq!(page.items, vec![UserId::new(3), UserId::new(2)]);
        let page = list_followers(&store, UserId::new(2), 10, None).await.unwrap();
        assert_eq!(page.items, vec![UserId::new(4), UserId::new(1)]);
    }

    #[tokio::test]
    async fn garbage_cursor_is_rejected() {
        let store = InMemoryGraphStore::new();
        let err = list_followers(&store, UserId::new(1), 10, Some("!!"))
            .await
            .unwrap_err();
        assert!(matches!(err, SocialGraphError::InvalidCursor));
    }
}
