//! Social graph service: follow/unfollow orchestration over a [`social_types::GraphStore`]
//! and an [`social_types::IdentityDirectory`].

mod config;
mod directory;
mod events;
mod service;

pub use config::ServiceConfig;
pub use directory::{InMemoryDirectory, PermissiveDirectory};
pub use events::GraphEvent;
pub use service::SocialGraphService;
pub use social_types::{SocialGraph, SocialGraphError};
