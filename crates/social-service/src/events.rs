//! Graph change events, published after the owning unit of work commits.

use social_types::{FollowEdge, Friendship, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    Followed(FollowEdge),
    Unfollowed {
        follower_id: UserId,
        following_id: UserId,
    },
    FriendshipFormed(Friendship),
    FriendshipDissolved {
        user_low: UserId,
        user_high: UserId,
    },
}
