//! SocialGraphService: follow/unfollow orchestration and paginated queries.

use crate::{GraphEvent, ServiceConfig};
use async_trait::async_trait;
use social_graph::{follow_store, friendship};
use social_types::{
    Clock, FollowEdge, GraphStore, IdentityDirectory, ListRequest, Page, RelationCounts,
    Relationship, SocialGraph, SocialGraphError, SystemClock, UnfollowResponse, UserId,
};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Social graph service composing a graph store and an identity directory.
///
/// Each mutation runs the edge change and the friendship reconciliation in one
/// [`GraphStore::write`] unit, so no caller can observe one without the other.
pub struct SocialGraphService<G, D> {
    pub graph: G,
    pub directory: D,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
    events: broadcast::Sender<GraphEvent>,
}

impl<G, D> SocialGraphService<G, D>
where
    G: GraphStore,
    D: IdentityDirectory,
{
    pub fn new(graph: G, directory: D) -> Self {
        let config = ServiceConfig::default();
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            graph,
            directory,
            clock: Arc::new(SystemClock),
            config,
            events,
        }
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        let config = config.normalized();
        if config.event_capacity != self.config.event_capacity {
            let (events, _) = broadcast::channel(config.event_capacity);
            self.events = events;
        }
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Receive graph events committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: GraphEvent) {
        // No subscribers is the common case.
        let _ = self.events.send(event);
    }

    /// Validate a requested page size and clamp it to the configured maximum.
    fn resolve_limit(&self, limit: Option<i64>) -> Result<usize, SocialGraphError> {
        match limit {
            None => Ok(self.config.default_page_size),
            Some(n) if n <= 0 => Err(SocialGraphError::InvalidLimit(n)),
            Some(n) => {
                let n = usize::try_from(n).unwrap_or(usize::MAX);
                Ok(n.min(self.config.max_page_size))
            }
        }
    }

    fn log_failure(op: &str, caller: UserId, target: UserId, e: &SocialGraphError) {
        if e.is_transient() {
            tracing::warn!(
                op,
                caller = %caller,
                target = %target,
                error = %e,
                "mutation failed"
            );
        } else {
            tracing::debug!(
                op,
                caller = %caller,
                target = %target,
                code = e.code(),
                "mutation rejected"
            );
        }
    }
}

#[async_trait]
impl<G, D> SocialGraph for SocialGraphService<G, D>
where
    G: GraphStore,
    D: IdentityDirectory,
{
    async fn follow(&self, caller: UserId, target: UserId) -> Result<FollowEdge, SocialGraphError> {
        if caller == target {
            return Err(SocialGraphError::SelfAction);
        }
        let exists = self.directory.exists(target).await.map_err(|e| {
            let e = SocialGraphError::from(e);
            Self::log_failure("follow", caller, target, &e);
            e
        })?;
        if !exists {
            return Err(SocialGraphError::TargetNotFound(target));
        }

        let now = self.clock.now();
        let (edge, formed) = self
            .graph
            .write(move |tx| {
                let edge = follow_store::create(tx, caller, target, now)?;
                let formed = friendship::derive_if_mutual(tx, caller, target, now)?;
                Ok((edge, formed))
            })
            .await
            .inspect_err(|e| Self::log_failure("follow", caller, target, e))?;

        tracing::info!(
            follower = %caller,
            following = %target,
            friendship_formed = formed.is_some(),
            "follow committed"
        );
        self.publish(GraphEvent::Followed(edge));
        if let Some(row) = formed {
            self.publish(GraphEvent::FriendshipFormed(row));
        }
        Ok(edge)
    }

    async fn unfollow(
        &self,
        caller: UserId,
        target: UserId,
    ) -> Result<UnfollowResponse, SocialGraphError> {
        if caller == target {
            return Err(SocialGraphError::SelfAction);
        }

        let pair = friendship::canonicalize(caller, target)?;
        let retracted = self
            .graph
            .write(move |tx| {
                follow_store::delete(tx, caller, target)?;
                friendship::retract_if_broken(tx, caller, target)
            })
            .await
            .inspect_err(|e| Self::log_failure("unfollow", caller, target, e))?;

        tracing::info!(
            follower = %caller,
            following = %target,
            friendship_retracted = retracted,
            "unfollow committed"
        );
        self.publish(GraphEvent::Unfollowed {
            follower_id: caller,
            following_id: target,
        });
        if retracted {
            self.publish(GraphEvent::FriendshipDissolved {
                user_low: pair.low(),
                user_high: pair.high(),
            });
        }
        Ok(UnfollowResponse { success: true })
    }

    async fn get_followers(
        &self,
        caller: UserId,
        req: &ListRequest,
    ) -> Result<Page<UserId>, SocialGraphError> {
        let limit = self.resolve_limit(req.limit)?;
        let target = req.target_or(caller);
        follow_store::list_followers(&self.graph, target, limit, req.cursor.as_deref()).await
    }

    async fn get_following(
        &self,
        caller: UserId,
        req: &ListRequest,
    ) -> Result<Page<UserId>, SocialGraphError> {
        let limit = self.resolve_limit(req.limit)?;
        let target = req.target_or(caller);
        follow_store::list_following(&self.graph, target, limit, req.cursor.as_deref()).await
    }

    async fn get_friends(
        &self,
        caller: UserId,
        req: &ListRequest,
    ) -> Result<Page<UserId>, SocialGraphError> {
        let limit = self.resolve_limit(req.limit)?;
        let target = req.target_or(caller);
        friendship::list_friends(&self.graph, target, limit, req.cursor.as_deref()).await
    }

    async fn relationship(
        &self,
        caller: UserId,
        target: UserId,
    ) -> Result<Relationship, SocialGraphError> {
        if caller == target {
            return Ok(Relationship::default());
        }
        Ok(Relationship {
            following: follow_store::exists(&self.graph, caller, target).await?,
            followed_by: follow_store::exists(&self.graph, target, caller).await?,
            friends: friendship::are_friends(&self.graph, caller, target).await?,
        })
    }

    async fn counts(
        &self,
        caller: UserId,
        user: Option<UserId>,
    ) -> Result<RelationCounts, SocialGraphError> {
        let user = user.unwrap_or(caller);
        Ok(RelationCounts {
            followers: follow_store::count_followers(&self.graph, user).await?,
            following: follow_store::count_following(&self.graph, user).await?,
            friends: friendship::count_friends(&self.graph, user).await?,
        })
    }
}
