//! Opaque keyset cursors.
//!
//! A cursor is the URL-safe base64 (no padding) of `v1:<created_at micros>:<id>`. The inner
//! layout is private to this module; callers only pass cursors back unchanged.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use social_types::{PageKey, SocialGraphError, UserId};

const VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    #[error("cursor is not valid base64")]
    Encoding,
    #[error("cursor payload is malformed")]
    Structure,
    #[error("unsupported cursor version: {0}")]
    Version(String),
    #[error("cursor timestamp is invalid")]
    Timestamp,
    #[error("cursor id is invalid")]
    Id,
}

impl From<CursorError> for SocialGraphError {
    fn from(_: CursorError) -> Self {
        SocialGraphError::InvalidCursor
    }
}

/// Encode a keyset position.
pub fn encode(created_at: DateTime<Utc>, id: UserId) -> String {
    let raw = format!("{}:{}:{}", VERSION, created_at.timestamp_micros(), id.get());
    URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

pub fn encode_key(key: &PageKey) -> String {
    encode(key.created_at, key.id)
}

/// Decode a cursor produced by [`encode`].
pub fn decode(cursor: &str) -> Result<PageKey, CursorError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor.trim())
        .map_err(|_| CursorError::Encoding)?;
    let raw = String::from_utf8(bytes).map_err(|_| CursorError::Structure)?;

    let mut parts = raw.split(':');
    let (Some(version), Some(ts), Some(id), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CursorError::Structure);
    };
    if version != VERSION {
        return Err(CursorError::Version(version.to_string()));
    }
    let micros: i64 = ts.parse().map_err(|_| CursorError::Timestamp)?;
    let created_at = DateTime::from_timestamp_micros(micros).ok_or(CursorError::Timestamp)?;
    let id: UserId = id.parse().map_err(|_| CursorError::Id)?;

    Ok(PageKey::new(created_at, id))
}

/// Decode an optional cursor into a keyset boundary.
pub(crate) fn decode_boundary(cursor: Option<&str>) -> Result<Option<PageKey>, SocialGraphError> {
    match cursor {
        None => Ok(None),
        Some(c) => decode(c).map(Some).map_err(|e| {
            tracing::debug!(error = %e, "rejected pagination cursor");
            SocialGraphError::from(e)
        }),
    }
}
