//! Service configuration.

use social_graph::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Tunables for [`crate::SocialGraphService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Page size used when a listing request omits `limit`.
    pub default_page_size: usize,
    /// Largest page a caller may request. Never above [`MAX_PAGE_SIZE`].
    pub max_page_size: usize,
    /// Buffered graph events per subscriber before the slowest one starts lagging.
    pub event_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            event_capacity: 256,
        }
    }
}

impl ServiceConfig {
    /// Read overrides from `SOCIAL_GRAPH_DEFAULT_PAGE_SIZE`, `SOCIAL_GRAPH_MAX_PAGE_SIZE`, and
    /// `SOCIAL_GRAPH_EVENT_CAPACITY`. Unset or unparsable values keep the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_page_size: env_usize("SOCIAL_GRAPH_DEFAULT_PAGE_SIZE")
                .unwrap_or(defaults.default_page_size),
            max_page_size: env_usize("SOCIAL_GRAPH_MAX_PAGE_SIZE")
                .unwrap_or(defaults.max_page_size),
            event_capacity: env_usize("SOCIAL_GRAPH_EVENT_CAPACITY")
                .unwrap_or(defaults.event_capacity),
        }
        .normalized()
    }

    /// Clamp values into their valid ranges.
    pub fn normalized(mut self) -> Self {
        self.max_page_size = self.max_page_size.clamp(1, MAX_PAGE_SIZE);
        self.default_page_size = self.default_page_size.clamp(1, self.max_page_size);
        self.event_capacity = self.event_capacity.max(1);
        self
    }
}

fn env_usize(key: &str) -> Option<usize> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring invalid numeric setting");
            None
        }
    }
}
