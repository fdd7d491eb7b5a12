use common::{Canvas, ChunkCache, ChunkRect};
use futures::{StreamExt, TryStreamExt};

use crate::api::ApiClient;
use crate::error::Result;

/// Chunk downloads kept in flight while seeding.
const SEED_CONCURRENCY: usize = 4;

/// Download every chunk of `rect` into a fresh cache. Runs once, before the
/// live connection is opened.
pub async fn seed_cache(api: &ApiClient, canvas: &Canvas, rect: ChunkRect) -> Result<ChunkCache> {
    tracing::info!("Loading {} chunks around the destination", rect.len());
    let id = canvas.id();
    let chunks: Vec<(u8, u8, Vec<u8>)> = futures::stream::iter(rect.chunks())
        .map(|(cx, cy)| async move { api.chunk(id, cx, cy).await.map(|raw| (cx, cy, raw)) })
        .buffered(SEED_CONCURRENCY)
        .try_collect()
        .await?;
    Ok(fill(canvas, rect, chunks))
}

/// Build a cache from downloaded chunk bitmaps.
pub fn fill(canvas: &Canvas, rect: ChunkRect, chunks: impl IntoIterator<Item = (u8, u8, Vec<u8>)>) -> ChunkCache {
    let mut cache = ChunkCache::new(canvas, rect);
    for (cx, cy, raw) in chunks {
        if !cache.load_chunk(cx, cy, &raw) {
            tracing::warn!("Ignoring chunk ({}, {}) outside the seeded area", cx, cy);
        }
    }
    cache
}
