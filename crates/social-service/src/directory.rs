//! Identity directories: the engine's view of which identities exist.

use async_trait::async_trait;
use social_types::{DirectoryError, IdentityDirectory, UserId};
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Directory backed by an in-process set of known identities.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashSet<UserId>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().collect()),
        }
    }

    pub async fn register(&self, user: UserId) {
        self.users.write().await.insert(user);
    }

    pub async fn remove(&self, user: UserId) -> bool {
        self.users.write().await.remove(&user)
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn exists(&self, user: UserId) -> Result<bool, DirectoryError> {
        Ok(self.users.read().await.contains(&user))
    }
}

/// Directory that reports every identity as existing, for deployments where the transport
/// only admits references minted by the identity subsystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveDirectory;

#[async_trait]
impl IdentityDirectory for PermissiveDirectory {
    async fn exists(&self, _user: UserId) -> Result<bool, DirectoryError> {
        Ok(true)
    }
}
