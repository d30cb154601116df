//! Follow store, friendship deriver, cursor codec, and graph storage backends.

pub mod cursor;
pub mod follow_store;
pub mod friendship;
mod memory;
mod page;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use cursor::CursorError;
pub use memory::InMemoryGraphStore;
pub use page::{clamp_limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use social_types::{
    CanonicalPair, FollowDirection, FollowEdge, Friendship, GraphStore, GraphStoreError, GraphTx,
    ListedUser, Page, PageKey, UserId,
};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteGraphStore;
