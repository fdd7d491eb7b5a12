//! Test fixtures: a small canvas, a session over it and a scripted server
//! end for the placement driver.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::chunk::to_absolute;
use common::protocol::{decode_binary, PixelPlacement};
use common::{Canvas, ChunkCache, ChunkRect, Palette, PlaceResult, Rgb, ServerEvent, Target};
use tokio::sync::{mpsc, watch};

use crate::config::Pacing;
use crate::notify::{resume_channel, Notifier, Operator};
use crate::scheduler::Placer;
use crate::session::Session;

pub(crate) const OK: PlaceResult = PlaceResult {
    code: 0,
    wait_ms: 0,
    cooldown_s: 0,
};

/// Index 1 (reserved "land") and index 6 share a value.
pub(crate) fn canvas() -> Canvas {
    let palette = Palette::new(vec![
        Rgb::new(10, 10, 10),
        Rgb::new(255, 255, 255),
        Rgb::new(0, 0, 0),
        Rgb::new(255, 0, 0),
        Rgb::new(0, 255, 0),
        Rgb::new(0, 0, 255),
        Rgb::new(255, 255, 255),
        Rgb::new(1, 2, 3),
    ])
    .unwrap();
    Canvas::new(0, 4096, palette).unwrap()
}

#[derive(Default)]
pub(crate) struct CountingNotifier(AtomicUsize);

impl Notifier for CountingNotifier {
    fn notify(&self, _message: &str) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Sent {
    pub x: i64,
    pub y: i64,
    pub color: u8,
    pub placement: PixelPlacement,
}

pub(crate) struct Harness {
    pub session: Session,
    pub target: Arc<Target>,
    outbound_tx: mpsc::Sender<Vec<u8>>,
    outbound_rx: mpsc::Receiver<Vec<u8>>,
    resume_tx: watch::Sender<u64>,
    resume_rx: watch::Receiver<u64>,
    notifier: Arc<CountingNotifier>,
}

impl Harness {
    /// A target drawn at absolute (0, 0) over an all-zero cache.
    pub fn new(rows: Vec<Vec<u8>>) -> Self {
        let canvas = canvas();
        let (width, height) = (rows[0].len(), rows.len());
        let pixels = rows.into_iter().flatten().collect();
        let target = Target::new(width, height, pixels, canvas.palette()).unwrap();
        let rect = ChunkRect::covering(&canvas, 0, 0, width, height).unwrap();
        let cache = ChunkCache::new(&canvas, rect);
        let (outbound_tx, outbound_rx) = mpsc::channel(16);
        let (resume_tx, resume_rx) = resume_channel();
        Self {
            session: Session::new(canvas, cache),
            target: Arc::new(target),
            outbound_tx,
            outbound_rx,
            resume_tx,
            resume_rx,
            notifier: Arc::new(CountingNotifier::default()),
        }
    }

    pub fn placer(&self) -> Placer {
        self.placer_with(Pacing::none())
    }

    pub fn placer_with(&self, pacing: Pacing) -> Placer {
        Placer::new(
            self.session.clone(),
            self.outbound_tx.clone(),
            self.target.clone(),
            (0, 0),
            Operator::new(self.notifier.clone(), self.resume_rx.clone()),
            pacing,
        )
    }

    pub async fn seed(&self, x: i64, y: i64, color: u8) {
        self.session.cache.write().await.set(x, y, color).unwrap();
    }

    /// Next placement sent by the driver. The timeout outlasts every
    /// default pause so paused-clock tests auto-advance past them first.
    pub async fn expect_placement(&mut self) -> Sent {
        let frame = tokio::time::timeout(Duration::from_secs(60), self.outbound_rx.recv())
            .await
            .expect("timed out waiting for a placement")
            .expect("outbound channel closed");
        // Placements share their layout with pixel updates.
        let Ok(ServerEvent::PixelUpdate(placement)) = decode_binary(&frame) else {
            panic!("not a placement: {frame:?}");
        };
        let (x, y) = to_absolute(&self.session.canvas, placement.pos);
        Sent {
            x,
            y,
            color: placement.color,
            placement,
        }
    }

    /// Answer a placement like the server: on success the pixel changes
    /// before the result is delivered.
    pub async fn ack(&self, sent: Sent, result: PlaceResult) {
        if result.code == 0 {
            self.session
                .cache
                .write()
                .await
                .apply(sent.placement.pos, sent.placement.color);
        }
        assert!(self.session.gate.resolve(result), "no placement was waiting");
    }

    pub fn no_more_placements(&mut self) -> bool {
        self.outbound_rx.try_recv().is_err()
    }

    pub fn notifications(&self) -> usize {
        self.notifier.0.load(Ordering::SeqCst)
    }

    pub fn resume(&self) {
        self.resume_tx.send_modify(|n| *n += 1);
    }
}
