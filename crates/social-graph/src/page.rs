//! Keyset page assembly shared by the follow and friendship listings.

use crate::cursor;
use social_types::{ListedUser, Page, UserId};

/// Hard upper bound on page size, applied whatever the caller asks for.
pub const MAX_PAGE_SIZE: usize = 100;

/// Page size used when the caller does not pass one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Clamp a requested page size to `1..=MAX_PAGE_SIZE`.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_PAGE_SIZE)
}

/// Build a page from up to `limit + 1` rows fetched in listing order.
///
/// When the extra row is present it is dropped, `has_more` is set, and the cursor points at
/// the last row kept.
pub(crate) fn into_page(mut rows: Vec<ListedUser>, limit: usize) -> Page<UserId> {
    let has_more = rows.len() > limit;
    rows.truncate(limit);
    let next_cursor = if has_more {
        rows.last().map(|row| cursor::encode_key(&row.key()))
    } else {
        None
    };
    Page {
        items: rows.into_iter().map(|row| row.user_id).collect(),
        next_cursor,
        has_more,
    }
}
