//! Position reconciliation for a single curtain device
//!
//! The device reports only its raw position; direction and motion state
//! are inferred from the relation between the derived target and each
//! fresh reading. A commanded move opens a "likely moving" window during
//! which the derived target is pinned and the device is polled at a
//! faster cadence. A timeout sized from the configured travel duration
//! guarantees the window closes even if the device never converges.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use slidebridge_rpc::{SlideClient, SlideError};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::position::{snap_to_extremes, to_raw, to_reported, PositionState, FULLY_OPEN};

/// Fixed cadence used while a commanded move is in flight.
pub const FAST_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Safety margin added to the configured travel duration when sizing the
/// moving-window timeout.
pub const MOVE_WINDOW_MARGIN: Duration = Duration::from_millis(1000);

/// Device transport consumed by the reconciler.
#[async_trait]
pub trait SlideTransport: Send + Sync {
    /// Fetch the device-native position (1.0 closed, 0.0 open).
    async fn position(&self) -> Result<f64, SlideError>;

    /// Command the device toward a device-native position.
    async fn set_position(&self, pos: f64) -> Result<(), SlideError>;
}

#[async_trait]
impl SlideTransport for SlideClient {
    async fn position(&self) -> Result<f64, SlideError> {
        Ok(self.get_info().await?.pos)
    }

    async fn set_position(&self, pos: f64) -> Result<(), SlideError> {
        self.set_pos(pos).await
    }
}

/// Mutable state for the single device instance.
#[derive(Debug, Clone)]
struct ReconcilerState {
    current: u8,
    target: u8,
    likely_moving: bool,
}

impl Default for ReconcilerState {
    fn default() -> Self {
        // Unknown until the first fetch; assume fully closed.
        Self {
            current: 0,
            target: 0,
            likely_moving: false,
        }
    }
}

/// What a reconciliation pass yields for the caller to surface upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSnapshot {
    pub current: u8,
    pub target: u8,
    pub state: PositionState,
}

/// Deferred tasks scoped to one in-flight move.
#[derive(Default)]
struct MoveTasks {
    timeout: Option<JoinHandle<()>>,
    fast_poll: Option<JoinHandle<()>>,
}

/// Owns the believed position, target and motion-state estimate for one
/// curtain, and the deferred tasks of the current move window.
///
/// Every operation completes its device I/O before taking the state lock,
/// then runs its full read-compute-write sequence under one guard, so a
/// background poll and a foreground query cannot interleave mid-update.
pub struct PositionReconciler {
    transport: Arc<dyn SlideTransport>,
    tolerance: u8,
    travel_duration: Duration,
    state: RwLock<ReconcilerState>,
    move_tasks: Mutex<MoveTasks>,
}

impl PositionReconciler {
    pub fn new(
        transport: Arc<dyn SlideTransport>,
        tolerance: u8,
        travel_duration: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            tolerance,
            travel_duration,
            state: RwLock::new(ReconcilerState::default()),
            move_tasks: Mutex::new(MoveTasks::default()),
        })
    }

    /// One-time startup seed: both positions start at the snapped
    /// observation. A failed fetch keeps the default state; the next
    /// successful poll corrects it.
    pub async fn seed(&self) {
        match self.transport.position().await {
            Ok(raw) => {
                let position = snap_to_extremes(to_reported(raw), self.tolerance);
                let mut state = self.state.write().await;
                state.current = position;
                state.target = position;
                state.likely_moving = false;
                debug!(position, "seeded position from device");
            }
            Err(e) => {
                warn!(error = %e, "initial position fetch failed, assuming closed");
            }
        }
    }

    /// Fetch a fresh reading and reconcile it into the state record.
    /// The background poll and foreground current-position queries share
    /// this path. A failed fetch reports the last-known state instead of
    /// propagating the error.
    pub async fn refresh(&self) -> PositionSnapshot {
        match self.transport.position().await {
            Ok(raw) => self.reconcile(to_reported(raw)).await,
            Err(e) => {
                warn!(error = %e, "position fetch failed, reporting cached state");
                self.snapshot().await
            }
        }
    }

    /// Apply one observed reported position.
    async fn reconcile(&self, observed: u8) -> PositionSnapshot {
        let mut state = self.state.write().await;

        // With no commanded move outstanding, the target tracks the
        // observation, so a curtain moved by its physical remote settles
        // instead of being fought.
        if !state.likely_moving {
            state.target = snap_to_extremes(observed, self.tolerance);
        }

        let difference = state.target.abs_diff(observed);
        state.current = if difference <= self.tolerance {
            state.target
        } else {
            observed
        };
        debug!(
            observed,
            target = state.target,
            difference,
            "reconciled poll reading"
        );

        let motion = PositionState::from_positions(state.target, state.current);
        if motion == PositionState::Stopped {
            state.likely_moving = false;
        }

        PositionSnapshot {
            current: state.current,
            target: state.target,
            state: motion,
        }
    }

    /// Last-known state without touching the device.
    pub async fn snapshot(&self) -> PositionSnapshot {
        let state = self.state.read().await;
        PositionSnapshot {
            current: state.current,
            target: state.target,
            state: PositionState::from_positions(state.target, state.current),
        }
    }

    /// Fetch and snap the target the device itself implies, without
    /// mutating any state. Falls back to the snapped cached position when
    /// the fetch fails.
    pub async fn read_target(&self) -> u8 {
        match self.transport.position().await {
            Ok(raw) => snap_to_extremes(to_reported(raw), self.tolerance),
            Err(e) => {
                warn!(error = %e, "target fetch failed, reporting cached position");
                let current = self.state.read().await.current;
                snap_to_extremes(current, self.tolerance)
            }
        }
    }

    pub async fn is_likely_moving(&self) -> bool {
        self.state.read().await.likely_moving
    }

    /// Issue a commanded move. The target is taken verbatim (explicit
    /// intent is never snapped). On a failed device request nothing is
    /// mutated and the error is returned; on acknowledgment the target is
    /// applied with an optimistic motion state and the move window is
    /// (re)armed.
    pub async fn command_target(
        self: &Arc<Self>,
        target: u8,
    ) -> Result<PositionSnapshot, SlideError> {
        let target = target.min(FULLY_OPEN);
        self.transport.set_position(to_raw(target)).await?;

        let snapshot = {
            let mut state = self.state.write().await;
            let motion = PositionState::from_positions(target, state.current);
            state.target = target;
            state.likely_moving = true;
            PositionSnapshot {
                current: state.current,
                target,
                state: motion,
            }
        };
        debug!(target, state = %snapshot.state, "move commanded");

        self.arm_move_window();
        Ok(snapshot)
    }

    /// (Re)arm the deferred actions of a move: the one-shot timeout that
    /// clears `likely_moving` even if the device never converges, and the
    /// fast poll cycle that runs until the move settles. A new command
    /// replaces both tasks of the previous one.
    fn arm_move_window(self: &Arc<Self>) {
        let window = self.travel_duration + MOVE_WINDOW_MARGIN;

        let weak = Arc::downgrade(self);
        let timeout = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(reconciler) = weak.upgrade() {
                let mut state = reconciler.state.write().await;
                if state.likely_moving {
                    debug!("move window expired, clearing likely-moving");
                    state.likely_moving = false;
                }
            }
        });

        let weak = Arc::downgrade(self);
        let fast_poll = tokio::spawn(async move {
            loop {
                tokio::time::sleep(FAST_POLL_INTERVAL).await;
                let reconciler = match weak.upgrade() {
                    Some(reconciler) => reconciler,
                    None => break,
                };
                reconciler.refresh().await;
                if !reconciler.is_likely_moving().await {
                    debug!("move settled, leaving fast poll cadence");
                    break;
                }
            }
        });

        let mut tasks = self.lock_move_tasks();
        if let Some(prior) = tasks.timeout.replace(timeout) {
            prior.abort();
        }
        if let Some(prior) = tasks.fast_poll.replace(fast_poll) {
            prior.abort();
        }
    }

    fn lock_move_tasks(&self) -> std::sync::MutexGuard<'_, MoveTasks> {
        match self.move_tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for PositionReconciler {
    fn drop(&mut self) {
        let mut tasks = self.lock_move_tasks();
        if let Some(task) = tasks.timeout.take() {
            task.abort();
        }
        if let Some(task) = tasks.fast_poll.take() {
            task.abort();
        }
    }
}
