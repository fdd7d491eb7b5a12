use std::sync::Arc;

use common::{Canvas, ChunkCache};
use tokio::sync::RwLock;

use crate::gate::PlacementGate;

/// State shared by the receive loop and the placement driver. The receive
/// loop is the only writer of the cache and the only resolver of the gate.
#[derive(Clone)]
pub struct Session {
    pub canvas: Arc<Canvas>,
    pub cache: Arc<RwLock<ChunkCache>>,
    pub gate: Arc<PlacementGate>,
}

impl Session {
    pub fn new(canvas: Canvas, cache: ChunkCache) -> Self {
        Self {
            canvas: Arc::new(canvas),
            cache: Arc::new(RwLock::new(cache)),
            gate: Arc::new(PlacementGate::new()),
        }
    }
}
