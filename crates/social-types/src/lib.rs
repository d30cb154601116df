//! Core types, DTOs, errors, and storage traits for the social graph engine.

mod clock;
mod dto;
mod error;
mod graph;
mod id;
mod model;
mod traits;

pub use clock::{truncate_to_micros, Clock, ManualClock, SystemClock};
pub use dto::*;
pub use error::{DirectoryError, ErrorKind, GraphStoreError, SocialGraphError};
pub use graph::SocialGraph;
pub use id::{CanonicalPair, UserId};
pub use model::*;
pub use traits::*;
