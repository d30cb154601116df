//! SQLite-backed graph store.
//!
//! Uniqueness and the no-self-relation rule are table constraints, so racing writers cannot
//! slip past an application-level check. Timestamps are stored as integer microseconds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OpenFlags, OptionalExtension, TransactionBehavior};
use social_types::{
    CanonicalPair, FollowDirection, FollowEdge, Friendship, GraphStore, GraphStoreError, GraphTx,
    ListedUser, PageKey, SocialGraphError, UserId,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS follows (
        follower_id INTEGER NOT NULL,
        following_id INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (follower_id, following_id),
        CHECK (follower_id <> following_id)
    );

    CREATE TABLE IF NOT EXISTS friendships (
        user_low INTEGER NOT NULL,
        user_high INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (user_low, user_high),
        CHECK (user_low < user_high)
    );

    CREATE INDEX IF NOT EXISTS idx_follows_following
        ON follows(following_id, created_at DESC, follower_id DESC);
    CREATE INDEX IF NOT EXISTS idx_follows_follower
        ON follows(follower_id, created_at DESC, following_id DESC);
    CREATE INDEX IF NOT EXISTS idx_friendships_high ON friendships(user_high);
"#;

const LIST_FOLLOWERS: &str = "SELECT follower_id, created_at FROM follows
     WHERE following_id = ?1
       AND (?2 IS NULL OR created_at < ?2 OR (created_at = ?2 AND follower_id < ?3))
     ORDER BY created_at DESC, follower_id DESC
     LIMIT ?4";

const LIST_FOLLOWING: &str = "SELECT following_id, created_at FROM follows
     WHERE follower_id = ?1
       AND (?2 IS NULL OR created_at < ?2 OR (created_at = ?2 AND following_id < ?3))
     ORDER BY created_at DESC, following_id DESC
     LIMIT ?4";

const LIST_FRIENDS: &str = "SELECT other, created_at FROM (
         SELECT CASE WHEN user_low = ?1 THEN user_high ELSE user_low END AS other, created_at
         FROM friendships
         WHERE user_low = ?1 OR user_high = ?1
     )
     WHERE ?2 IS NULL OR created_at < ?2 OR (created_at = ?2 AND other < ?3)
     ORDER BY created_at DESC, other DESC
     LIMIT ?4";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle read-only connections kept open per store.
const MAX_IDLE_READERS: usize = 8;

/// SQLite-backed graph store for persistence.
///
/// One writer connection runs every unit of work in an `IMMEDIATE` transaction. File databases
/// run in WAL mode and serve reads from a pool of read-only connections, so reads never wait on
/// an open write transaction or on each other. All rusqlite calls run on the blocking pool.
pub struct SqliteGraphStore {
    writer: Arc<Mutex<rusqlite::Connection>>,
    /// `None` for a private in-memory database, whose reads go through the writer.
    readers: Option<Arc<ReaderPool>>,
}

struct ReaderPool {
    path: PathBuf,
    idle: Mutex<Vec<rusqlite::Connection>>,
}

impl ReaderPool {
    fn checkout(&self) -> Result<rusqlite::Connection, GraphStoreError> {
        if let Some(conn) = self.idle.lock().map_err(lock_err)?.pop() {
            return Ok(conn);
        }
        let conn = rusqlite::Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(store_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(store_err)?;
        tracing::debug!(path = %self.path.display(), "opened sqlite reader");
        Ok(conn)
    }

    fn checkin(&self, conn: rusqlite::Connection) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < MAX_IDLE_READERS {
                idle.push(conn);
            }
        }
    }
}

impl SqliteGraphStore {
    /// Open (or create) a SQLite graph store at the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, GraphStoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&path).map_err(store_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(store_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(store_err)?;
        let readers = ReaderPool {
            path,
            idle: Mutex::new(Vec::new()),
        };
        Self::init(conn, Some(Arc::new(readers)))
    }

    /// Private in-memory database, mostly for tests. Reads share the writer connection.
    pub fn open_in_memory() -> Result<Self, GraphStoreError> {
        let conn = rusqlite::Connection::open_in_memory().map_err(store_err)?;
        Self::init(conn, None)
    }

    fn init(
        conn: rusqlite::Connection,
        readers: Option<Arc<ReaderPool>>,
    ) -> Result<Self, GraphStoreError> {
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        Ok(Self {
            writer: Arc::new(Mutex::new(conn)),
            readers,
        })
    }

    /// Run a read-only query on a pooled reader, off the async runtime.
    async fn read<T, F>(&self, f: F) -> Result<T, GraphStoreError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let readers = self.readers.clone();
        let writer = Arc::clone(&self.writer);
        tokio::task::spawn_blocking(move || -> Result<T, GraphStoreError> {
            match readers {
                Some(pool) => {
                    let conn = pool.checkout()?;
                    let result = f(&conn).map_err(store_err);
                    pool.checkin(conn);
                    result
                }
                None => {
                    let conn = writer.lock().map_err(lock_err)?;
                    f(&conn).map_err(store_err)
                }
            }
        })
        .await
        .map_err(join_err)?
    }

    async fn list(
        &self,
        sql: &'static str,
        user: UserId,
        after: Option<PageKey>,
        fetch: usize,
    ) -> Result<Vec<ListedUser>, GraphStoreError> {
        let after_ts = after.map(|k| k.created_at.timestamp_micros());
        let after_id = after.map(|k| k.id.get());
        let fetch = i64::try_from(fetch).unwrap_or(i64::MAX);
        self.read(move |conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let rows = stmt.query_map(params![user.get(), after_ts, after_id, fetch], |row| {
                Ok(ListedUser {
                    user_id: UserId::new(row.get(0)?),
                    created_at: micros_to_datetime(1, row.get(1)?)?,
                })
            })?;
            rows.collect()
        })
        .await
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> GraphStoreError {
    GraphStoreError::Other(format!("failed to acquire lock: {}", e))
}

fn join_err(e: tokio::task::JoinError) -> GraphStoreError {
    GraphStoreError::Other(format!("sqlite task failed: {}", e))
}

fn store_err(e: rusqlite::Error) -> GraphStoreError {
    GraphStoreError::Other(e.to_string())
}

fn micros_to_datetime(column: usize, micros: i64) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::from_timestamp_micros(micros)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, micros))
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => {
            err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

/// Unit of work bound to an open rusqlite transaction.
struct SqliteTx<'a> {
    tx: &'a rusqlite::Transaction<'a>,
}

impl GraphTx for SqliteTx<'_> {
    fn insert_follow(&mut self, edge: &FollowEdge) -> Result<(), GraphStoreError> {
        let result = self.tx.execute(
            "INSERT INTO follows (follower_id, following_id, created_at) VALUES (?1, ?2, ?3)",
            params![
                edge.follower_id.get(),
                edge.following_id.get(),
                edge.created_at.timestamp_micros()
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(GraphStoreError::Conflict(format!(
                "follow {} -> {}",
                edge.follower_id, edge.following_id
            ))),
            Err(e) => Err(store_err(e)),
        }
    }

    fn delete_follow(
        &mut self,
        follower: UserId,
        following: UserId,
    ) -> Result<bool, GraphStoreError> {
        let n = self
            .tx
            .execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                params![follower.get(), following.get()],
            )
            .map_err(store_err)?;
        Ok(n > 0)
    }

    fn follow_exists(&self, follower: UserId, following: UserId) -> Result<bool, GraphStoreError> {
        self.tx
            .query_row(
                "SELECT 1 FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                params![follower.get(), following.get()],
                |_| Ok(()),
            )
            .optional()
            .map(|row| row.is_some())
            .map_err(store_err)
    }

    fn insert_friendship_or_ignore(&mut self, row: &Friendship) -> Result<bool, GraphStoreError> {
        let n = self
            .tx
            .execute(
                "INSERT OR IGNORE INTO friendships (user_low, user_high, created_at)
                 VALUES (?1, ?2, ?3)",
                params![
                    row.user_low.get(),
                    row.user_high.get(),
                    row.created_at.timestamp_micros()
                ],
            )
            .map_err(store_err)?;
        Ok(n > 0)
    }

    fn delete_friendship(&mut self, pair: CanonicalPair) -> Result<bool, GraphStoreError> {
        let n = self
            .tx
            .execute(
                "DELETE FROM friendships WHERE user_low = ?1 AND user_high = ?2",
                params![pair.low().get(), pair.high().get()],
            )
            .map_err(store_err)?;
        Ok(n > 0)
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn write<T, F>(&self, f: F) -> Result<T, SocialGraphError>
    where
        F: FnOnce(&mut dyn GraphTx) -> Result<T, SocialGraphError> + Send + 'static,
        T: Send + 'static,
    {
        let writer = Arc::clone(&self.writer);
        tokio::task::spawn_blocking(move || -> Result<T, SocialGraphError> {
            let mut conn = writer.lock().map_err(lock_err)?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(store_err)?;
            // Dropping the transaction on error rolls it back.
            let value = f(&mut SqliteTx { tx: &tx })?;
            tx.commit().map_err(store_err)?;
            Ok(value)
        })
        .await
        .map_err(join_err)?
    }

    async fn get_follow(
        &self,
        follower: UserId,
        following: UserId,
    ) -> Result<Option<FollowEdge>, GraphStoreError> {
        self.read(move |conn| {
            conn.query_row(
                "SELECT created_at FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                params![follower.get(), following.get()],
                |row| {
                    Ok(FollowEdge {
                        follower_id: follower,
                        following_id: following,
                        created_at: micros_to_datetime(0, row.get(0)?)?,
                    })
                },
            )
            .optional()
        })
        .await
    }

    async fn get_friendship(
        &self,
        pair: CanonicalPair,
    ) -> Result<Option<Friendship>, GraphStoreError> {
        self.read(move |conn| {
            conn.query_row(
                "SELECT created_at FROM friendships WHERE user_low = ?1 AND user_high = ?2",
                params![pair.low().get(), pair.high().get()],
                |row| Ok(Friendship::new(pair, micros_to_datetime(0, row.get(0)?)?)),
            )
            .optional()
        })
        .await
    }

    async fn list_follows(
        &self,
        user: UserId,
        direction: FollowDirection,
        after: Option<PageKey>,
        fetch: usize,
    ) -> Result<Vec<ListedUser>, GraphStoreError> {
        let sql = match direction {
            FollowDirection::Followers => LIST_FOLLOWERS,
            FollowDirection::Following => LIST_FOLLOWING,
        };
        self.list(sql, user, after, fetch).await
    }

    async fn list_friends(
        &self,
        user: UserId,
        after: Option<PageKey>,
        fetch: usize,
    ) -> Result<Vec<ListedUser>, GraphStoreError> {
        self.list(LIST_FRIENDS, user, after, fetch).await
    }

    async fn count_follows(
        &self,
        user: UserId,
        direction: FollowDirection,
    ) -> Result<u64, GraphStoreError> {
        let sql = match direction {
            FollowDirection::Followers => "SELECT COUNT(*) FROM follows WHERE following_id = ?1",
            FollowDirection::Following => "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
        };
        let count: i64 = self
            .read(move |conn| conn.query_row(sql, [user.get()], |row| row.get(0)))
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn count_friends(&self, user: UserId) -> Result<u64, GraphStoreError> {
        let count: i64 = self
            .read(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM friendships WHERE user_low = ?1 OR user_high = ?1",
                    [user.get()],
                    |row| row.get(0),
                )
            })
            .await?;
        Ok(count.max(0) as u64)
    }
}
