use std::sync::{Mutex, MutexGuard};

use common::PlaceResult;
use tokio::sync::oneshot;

use crate::error::{PainterError, Result};

enum Slot {
    Open,
    Armed(oneshot::Sender<PlaceResult>),
    Closed,
}

/// Single-slot rendezvous between the placement driver and the receive
/// loop. The driver arms it before sending a placement and awaits the
/// returned receiver; the receive loop resolves it when the result arrives.
/// Only one placement can be armed at a time.
pub struct PlacementGate {
    slot: Mutex<Slot>,
}

impl Default for PlacementGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementGate {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Open),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        match self.slot.lock() {
            Ok(s) => s,
            Err(p) => p.into_inner(),
        }
    }

    /// Reserve the slot for the next placement.
    pub fn arm(&self) -> Result<oneshot::Receiver<PlaceResult>> {
        let mut slot = self.lock();
        match &*slot {
            Slot::Closed => return Err(PainterError::ConnectionClosed),
            // A sender whose receiver is gone belongs to an abandoned wait.
            Slot::Armed(tx) if !tx.is_closed() => return Err(PainterError::AlreadyInFlight),
            _ => {}
        }
        let (tx, rx) = oneshot::channel();
        *slot = Slot::Armed(tx);
        Ok(rx)
    }

    /// Deliver a placement result. Returns false if nothing was waiting.
    pub fn resolve(&self, result: PlaceResult) -> bool {
        let mut slot = self.lock();
        match std::mem::replace(&mut *slot, Slot::Open) {
            Slot::Armed(tx) => tx.send(result).is_ok(),
            Slot::Closed => {
                *slot = Slot::Closed;
                false
            }
            Slot::Open => false,
        }
    }

    /// Fail the pending wait, if any, and every later `arm`.
    pub fn close(&self) {
        *self.lock() = Slot::Closed;
    }

    pub fn is_armed(&self) -> bool {
        matches!(&*self.lock(), Slot::Armed(tx) if !tx.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok() -> PlaceResult {
        PlaceResult {
            code: 0,
            wait_ms: 0,
            cooldown_s: 0,
        }
    }

    #[tokio::test]
    async fn delivers_result_to_armed_wait() {
        let gate = PlacementGate::new();
        let rx = gate.arm().unwrap();
        assert!(gate.is_armed());
        assert!(gate.resolve(ok()));
        assert_eq!(rx.await.unwrap(), ok());
        assert!(!gate.is_armed());
    }

    #[test]
    fn refuses_second_placement_in_flight() {
        let gate = PlacementGate::new();
        let _rx = gate.arm().unwrap();
        assert!(matches!(gate.arm(), Err(PainterError::AlreadyInFlight)));
    }

    #[test]
    fn abandoned_wait_frees_the_slot() {
        let gate = PlacementGate::new();
        drop(gate.arm().unwrap());
        assert!(!gate.is_armed());
        assert!(gate.arm().is_ok());
    }

    #[test]
    fn unsolicited_result_is_reported() {
        let gate = PlacementGate::new();
        assert!(!gate.resolve(ok()));
    }

    #[tokio::test]
    async fn close_fails_pending_and_future_waits() {
        let gate = PlacementGate::new();
        let rx = gate.arm().unwrap();
        gate.close();
        assert!(rx.await.is_err());
        assert!(matches!(gate.arm(), Err(PainterError::ConnectionClosed)));
        assert!(!gate.resolve(ok()));
    }
}
