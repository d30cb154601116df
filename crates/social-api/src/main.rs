//! Social graph REST API server: /social/follow, /social/followers, /social/friends.

use social_api::server::{self, AppState};
use social_graph::{InMemoryGraphStore, SqliteGraphStore};
use social_service::{PermissiveDirectory, ServiceConfig, SocialGraphService};
use social_types::SocialGraph;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();
    let graph: Arc<dyn SocialGraph> = match std::env::var("SOCIAL_GRAPH_DB") {
        Ok(path) if !path.trim().is_empty() => {
            tracing::info!(path = %path, "using SQLite graph store");
            Arc::new(
                SocialGraphService::new(SqliteGraphStore::new(path.trim())?, PermissiveDirectory)
                    .with_config(config),
            )
        }
        _ => {
            tracing::info!("SOCIAL_GRAPH_DB not set; using in-memory graph store");
            Arc::new(
                SocialGraphService::new(InMemoryGraphStore::new(), PermissiveDirectory)
                    .with_config(config),
            )
        }
    };

    let app = server::router(Arc::new(AppState { graph }));
    let addr: SocketAddr = std::env::var("SOCIAL_GRAPH_LISTEN")
        .unwrap_or_else(|_| "0.0.0.0:8002".to_string())
        .parse()?;
    tracing::info!("Social graph API listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}
