//! Picks the block an incoming post belongs to.

use chrono::{DateTime, Utc};
use tracing::info;

use super::BlockSchedule;
use crate::ingest::IngestError;
use crate::store::{BlockId, Store};

/// Title given to a block opened at `created_at`.
#[must_use]
pub fn block_title(created_at: DateTime<Utc>) -> String {
    created_at.format("%a %b %-d %Y").to_string()
}

/// Returns the block that receives posts at `now`, opening a new one when the
/// latest block has aged past the schedule's frequency.
///
/// Safe to call concurrently: callers racing on the same stale block resolve
/// to the same new boundary, and [`Store::create_block`] writes it once.
///
/// # Errors
///
/// Returns [`IngestError::NoBlocksConfigured`] if no block was ever seeded,
/// or [`IngestError::Database`] if the store fails.
pub async fn resolve_current_block(
    store: &dyn Store,
    schedule: &BlockSchedule,
    now: DateTime<Utc>,
) -> Result<BlockId, IngestError> {
    let last = store
        .find_latest_block()
        .await?
        .ok_or(IngestError::NoBlocksConfigured)?;

    let Some(boundary) = schedule.next_boundary(last.created_at, now) else {
        return Ok(last.id);
    };

    let id = store.create_block(&block_title(boundary), boundary).await?;
    info!(block_id = %id, previous = %last.id, created_at = %boundary, "Opened new block");
    Ok(id)
}
