//! Curtain accessory surface
//!
//! Owns the reconciler and the baseline poll task, and exposes the three
//! queries and one command an accessory host binds to its window-covering
//! characteristics.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use slidebridge_rpc::{SlideClient, SlideDevice};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::AccessoryConfig;
use crate::error::BridgeError;
use crate::position::PositionState;
use crate::reconciler::{PositionReconciler, SlideTransport};

pub const MANUFACTURER: &str = "Innovation in Motion";
pub const MODEL: &str = "Slide";

/// Host-facing capability surface: three queries and one command.
///
/// The queries never fail toward the host; a broken transport degrades
/// them to the last-known state. The command surfaces device errors
/// unchanged so the host can decide whether to retry.
#[async_trait]
pub trait CoverControl: Send + Sync {
    /// Current position on the reported scale. Performs the same
    /// fetch-and-reconcile as the background poll.
    async fn current_position(&self) -> u8;

    /// The target the device itself implies right now; no state mutation.
    async fn target_position(&self) -> u8;

    /// Motion state from the latest reconciliation.
    async fn position_state(&self) -> PositionState;

    /// Command a move to `position` (0 closed, 100 open).
    async fn set_target_position(&self, position: u8) -> Result<u8, BridgeError>;
}

/// One bridged curtain: reconciler plus its baseline poll task.
pub struct CurtainAccessory {
    name: String,
    reconciler: Arc<PositionReconciler>,
    poll: JoinHandle<()>,
}

impl CurtainAccessory {
    /// Build against the real device described by `config`.
    pub fn new(config: &AccessoryConfig) -> Result<Arc<Self>, BridgeError> {
        let device = SlideDevice::new(&config.host, &config.code);
        let client = SlideClient::new(&device)?;
        Ok(Self::with_transport(config, Arc::new(client)))
    }

    /// Assemble with an injected transport. Seeds the position state and
    /// starts the baseline poll in the background.
    pub fn with_transport(
        config: &AccessoryConfig,
        transport: Arc<dyn SlideTransport>,
    ) -> Arc<Self> {
        let reconciler =
            PositionReconciler::new(transport, config.tolerance, config.travel_duration());
        let poll = Self::spawn_poll(&reconciler, config.poll_cadence());
        info!(name = %config.name, host = %config.host, "curtain accessory initialized");
        Arc::new(Self {
            name: config.name.clone(),
            reconciler,
            poll,
        })
    }

    /// Seed once, then refresh on the configured baseline cadence until
    /// the accessory is dropped. The fast cadence during a move is run by
    /// the reconciler itself.
    fn spawn_poll(reconciler: &Arc<PositionReconciler>, cadence: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(reconciler);
        tokio::spawn(async move {
            if let Some(reconciler) = weak.upgrade() {
                reconciler.seed().await;
            }
            let mut ticks = tokio::time::interval(cadence);
            loop {
                ticks.tick().await;
                match weak.upgrade() {
                    Some(reconciler) => {
                        debug!("baseline poll tick");
                        reconciler.refresh().await;
                    }
                    None => break,
                }
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manufacturer(&self) -> &'static str {
        MANUFACTURER
    }

    pub fn model(&self) -> &'static str {
        MODEL
    }

    /// Host identify hook. The curtain has no indicator to flash.
    pub fn identify(&self) {
        info!(name = %self.name, "identify requested");
    }
}

#[async_trait]
impl CoverControl for CurtainAccessory {
    async fn current_position(&self) -> u8 {
        self.reconciler.refresh().await.current
    }

    async fn target_position(&self) -> u8 {
        self.reconciler.read_target().await
    }

    async fn position_state(&self) -> PositionState {
        self.reconciler.snapshot().await.state
    }

    async fn set_target_position(&self, position: u8) -> Result<u8, BridgeError> {
        let snapshot = self.reconciler.command_target(position).await?;
        debug!(target = snapshot.target, state = %snapshot.state, "target accepted");
        Ok(snapshot.target)
    }
}

impl Drop for CurtainAccessory {
    fn drop(&mut self) {
        self.poll.abort();
    }
}
