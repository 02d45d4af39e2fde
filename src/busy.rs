//! Loading indicator shared by every operation type
//!
//! Display is last-writer-wins: each `acquire` takes a fresh generation and
//! shows its message at once. `release` only affects the display when it
//! removes the newest outstanding token, so a slow request that finishes late
//! cannot hide the indicator of a newer one still in flight.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::shared::{UiSink, UiUpdate};

/// Handle for one "show loading" request
///
/// Not `Clone`. Releasing it more than once is a no-op.
#[derive(Debug, PartialEq, Eq)]
pub struct BusyToken {
    generation: u64,
}

#[derive(Debug, Default)]
struct GateState {
    /// Last generation handed out
    generation: u64,
    /// Outstanding tokens in acquisition order
    outstanding: Vec<(u64, String)>,
    /// Generation whose message is on screen
    shown: Option<u64>,
}

impl GateState {
    fn top(&self) -> Option<&(u64, String)> {
        self.outstanding.last()
    }
}

/// Reentrancy-guarded busy indicator
#[derive(Debug)]
pub struct BusyGate {
    state: Mutex<GateState>,
    sink: UiSink,
}

impl BusyGate {
    /// Create a gate publishing visibility changes to `sink`
    pub fn new(sink: UiSink) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            sink,
        }
    }

    /// Show the indicator with `message`, superseding whatever is displayed
    pub fn acquire(&self, message: impl Into<String>) -> BusyToken {
        let message = message.into();
        let mut state = self.state.lock();
        state.generation += 1;
        let generation = state.generation;

        debug!("Busy #{}: {}", generation, message);
        state.outstanding.push((generation, message.clone()));
        state.shown = Some(generation);
        self.sink.send(UiUpdate::Busy(Some(message)));

        BusyToken { generation }
    }

    /// Release a token; stale or repeated releases never touch a newer indicator
    pub fn release(&self, token: &BusyToken) {
        let mut state = self.state.lock();
        let Some(pos) = state
            .outstanding
            .iter()
            .position(|(generation, _)| *generation == token.generation)
        else {
            trace!("Busy #{} already released", token.generation);
            return;
        };
        state.outstanding.remove(pos);

        let next = state.top().cloned();
        if next.as_ref().map(|(generation, _)| *generation) == state.shown {
            trace!("Busy #{} released behind a newer indicator", token.generation);
            return;
        }

        state.shown = next.as_ref().map(|(generation, _)| *generation);
        match next {
            Some((generation, message)) => {
                debug!("Busy #{} released, showing #{} again", token.generation, generation);
                self.sink.send(UiUpdate::Busy(Some(message)));
            }
            None => {
                debug!("Busy #{} released, indicator hidden", token.generation);
                self.sink.send(UiUpdate::Busy(None));
            }
        }
    }

    /// Acquire a token that is released when the guard drops
    pub fn scoped(self: &Arc<Self>, message: impl Into<String>) -> BusyGuard {
        BusyGuard {
            token: self.acquire(message),
            gate: Arc::clone(self),
        }
    }
}

#[cfg(test)]
impl BusyGate {
    /// Message currently displayed, if any
    pub fn visible(&self) -> Option<String> {
        self.state.lock().top().map(|(_, message)| message.clone())
    }

    /// Number of tokens not yet released
    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding.len()
    }
}

/// Releases its token on every exit path
#[derive(Debug)]
pub struct BusyGuard {
    gate: Arc<BusyGate>,
    token: BusyToken,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.gate.release(&self.token);
    }
}
