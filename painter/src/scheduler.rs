use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::chunk::to_protocol;
use common::protocol::PixelPlacement;
use common::{ClientFrame, PlaceOutcome, PlaceResult, Target};
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::{mpsc, watch};

use crate::config::Pacing;
use crate::error::{PainterError, Result};
use crate::notify::Operator;
use crate::session::Session;

/// Number of placements before a time-remaining estimate is logged.
const ETA_MIN_SAMPLES: u64 = 20;

/// Order in which the initial pass visits target pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Forward,
    Backward,
    Random,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" => Ok(Strategy::Forward),
            "backward" => Ok(Strategy::Backward),
            "random" => Ok(Strategy::Random),
            other => Err(format!("unknown strategy {other:?}, expected forward, backward or random")),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Forward => "forward",
            Strategy::Backward => "backward",
            Strategy::Random => "random",
        })
    }
}

impl Strategy {
    /// Image-relative coordinates in visiting order. The random order is
    /// shuffled once here and never again.
    pub fn order(&self, target: &Target) -> Vec<(usize, usize)> {
        let mut coords: Vec<_> = target.raster().collect();
        match self {
            Strategy::Forward => {}
            Strategy::Backward => coords.reverse(),
            Strategy::Random => coords.shuffle(&mut rand::rng()),
        }
        coords
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacerState {
    Idle,
    AwaitingAck,
    CoolingDown,
    CaptchaBlocked,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Placements the server accepted.
    pub placed: u64,
    /// Placements rejected with a generic error and retried.
    pub rejected: u64,
    /// CAPTCHA challenges handed to the operator.
    pub captchas: u64,
    /// Cooldown pauses taken after a long server wait.
    pub cooldowns: u64,
}

/// Drives placements one at a time: pick a pixel, compare against the
/// cache, send, wait for the result, react.
pub struct Placer {
    session: Session,
    outbound: mpsc::Sender<Vec<u8>>,
    target: Arc<Target>,
    /// Absolute coordinate of the target's top-left pixel.
    origin: (i64, i64),
    operator: Operator,
    pacing: Pacing,
    state: watch::Sender<PlacerState>,
    stats: Stats,
}

impl Placer {
    pub fn new(
        session: Session,
        outbound: mpsc::Sender<Vec<u8>>,
        target: Arc<Target>,
        origin: (i64, i64),
        operator: Operator,
        pacing: Pacing,
    ) -> Self {
        let (state, _) = watch::channel(PlacerState::Idle);
        Self {
            session,
            outbound,
            target,
            origin,
            operator,
            pacing,
            state,
            stats: Stats::default(),
        }
    }

    pub fn state(&self) -> PlacerState {
        *self.state.borrow()
    }

    /// Follow state transitions from another task.
    pub fn watch_state(&self) -> watch::Receiver<PlacerState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub(crate) fn target(&self) -> Arc<Target> {
        Arc::clone(&self.target)
    }

    pub(crate) fn pacing(&self) -> Pacing {
        self.pacing
    }

    pub(crate) fn absolute(&self, x: usize, y: usize) -> (i64, i64) {
        (self.origin.0 + x as i64, self.origin.1 + y as i64)
    }

    fn set_state(&self, state: PlacerState) {
        self.state.send_replace(state);
    }

    /// Paint every non-skip pixel once, in `strategy` order.
    pub async fn run_pass(&mut self, strategy: Strategy) -> Result<()> {
        let target = self.target();
        let order = strategy.order(&target);
        let total = target.paintable_count();
        let started = Instant::now();
        let placed_before = self.stats.placed;
        let mut visited = 0usize;

        tracing::info!("Drawing {} pixels ({} order)", total, strategy);

        for (ix, iy) in order {
            let Some(color) = target.desired(ix, iy) else {
                continue;
            };
            visited += 1;
            let (x, y) = self.absolute(ix, iy);
            if self.ensure(x, y, color).await? {
                let placed = self.stats.placed - placed_before;
                let remaining = total - visited;
                let eta = (placed >= ETA_MIN_SAMPLES).then(|| {
                    let per_pixel = started.elapsed().as_secs_f64() / placed as f64;
                    Duration::from_secs((per_pixel * remaining as f64) as u64)
                });
                tracing::info!(
                    "Placed ({}, {}), {} placed, {} remaining, eta {}",
                    x,
                    y,
                    placed,
                    remaining,
                    eta.map(|d| format!("{d:?}")).unwrap_or_else(|| "estimating".into())
                );
            }
        }

        tracing::info!(
            "Done drawing: {} placed in {:?}",
            self.stats.placed - placed_before,
            started.elapsed()
        );
        Ok(())
    }

    /// Make the canvas show `color` at (`x`, `y`), retrying the same pixel
    /// until the cache agrees or the server accepts a placement. Returns
    /// whether a placement was accepted.
    pub(crate) async fn ensure(&mut self, x: i64, y: i64, color: u8) -> Result<bool> {
        loop {
            if self.is_satisfied(x, y, color).await? {
                return Ok(false);
            }
            let result = self.place(x, y, color).await?;
            if self.settle(result).await? {
                return Ok(true);
            }
        }
    }

    /// Compare palette values, not indices: aliased indices render alike.
    async fn is_satisfied(&self, x: i64, y: i64, color: u8) -> Result<bool> {
        let current = self.session.cache.read().await.get(x, y)?;
        Ok(self.session.canvas.palette().same_color(current, color))
    }

    async fn place(&mut self, x: i64, y: i64, color: u8) -> Result<PlaceResult> {
        let pos = to_protocol(&self.session.canvas, x, y)?;
        let pending = self.session.gate.arm()?;
        self.set_state(PlacerState::AwaitingAck);
        tracing::debug!("Placing color {} at ({}, {})", color, x, y);

        let frame = ClientFrame::PlacePixel(PixelPlacement { pos, color }).encode();
        self.outbound
            .send(frame)
            .await
            .map_err(|_| PainterError::ConnectionClosed)?;

        pending.await.map_err(|_| PainterError::ConnectionClosed)
    }

    /// React to a placement result. Returns true when the pixel is done.
    async fn settle(&mut self, result: PlaceResult) -> Result<bool> {
        let done = match result.outcome() {
            PlaceOutcome::Placed {
                wait_ms,
                cooldown_s,
            } => {
                self.stats.placed += 1;
                if wait_ms >= self.pacing.cooldown_threshold_ms {
                    self.stats.cooldowns += 1;
                    self.set_state(PlacerState::CoolingDown);
                    let pause = Duration::from_secs(cooldown_s as u64) + self.pacing.cooldown_margin;
                    tracing::info!("Cooling down for {:?} (wait {} ms)", pause, wait_ms);
                    tokio::time::sleep(pause).await;
                }
                true
            }
            PlaceOutcome::Captcha => {
                self.stats.captchas += 1;
                self.set_state(PlacerState::CaptchaBlocked);
                self.operator.solve_captcha().await?;
                false
            }
            PlaceOutcome::Rejected(code) => {
                self.stats.rejected += 1;
                tracing::warn!("Placement rejected with code {}, retrying", code);
                tokio::time::sleep(self.pacing.retry_delay).await;
                false
            }
        };
        self.set_state(PlacerState::Idle);
        tokio::time::sleep(self.jittered_interval()).await;
        Ok(done)
    }

    /// `interval` plus uniform jitter in `[-jitter, +jitter]`.
    fn jittered_interval(&self) -> Duration {
        let jitter = self.pacing.jitter.as_millis() as u64;
        if jitter == 0 {
            return self.pacing.interval;
        }
        let offset = rand::rng().random_range(0..=2 * jitter);
        (self.pacing.interval + Duration::from_millis(offset)).saturating_sub(Duration::from_millis(jitter))
    }
}
