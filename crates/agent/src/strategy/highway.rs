//! Long-haul highway travel strategy.
//!
//! Composes the shipped action set around a single distant target and owns
//! the restart protocol: when an action requests it (hostile player sighted),
//! the supervisor stops every action, cycles the connection, and rebuilds the
//! set. Restarting is idempotent and never leaks subscriptions; every stop
//! fully unregisters before the next start re-registers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::actions::{
    ActionHandle, AlwaysShield, EfficientEat, EmergencyQuit, EmergencyQuitConfig, GotoLocation,
    LootFinder,
};
use crate::agent::Agent;
use crate::error::{AgentError, Result};
use crate::world::Position;

use super::{RestartRequest, Strategy};

/// Highways run at a fixed altitude; a target off this plane is a typo.
pub const HIGHWAY_Y: f64 = 120.0;

const RESTART_BUFFER: usize = 4;
const ACTIVATION_WAIT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct HighwayConfig {
    pub target: Position,
    /// Wait before reconnecting when a hostile player forces a restart.
    pub reconnect_wait: Duration,
    /// Distance between walk-progress logs, in units.
    pub goto_log_interval: f64,
    pub exit_on_arrival: bool,
    /// AlwaysShield is off by default; it costs a tick phase and the agent
    /// outruns most threats anyway.
    pub use_shield: bool,
}

impl HighwayConfig {
    pub fn new(target: Position) -> Self {
        Self {
            target,
            reconnect_wait: Duration::from_secs(60),
            // Roughly one progress log every forty minutes at sprint speed.
            goto_log_interval: 10_000.0,
            exit_on_arrival: true,
            use_shield: false,
        }
    }

    /// Short reconnect wait for local testing.
    pub fn debug(mut self) -> Self {
        self.reconnect_wait = Duration::from_secs(5);
        self
    }
}

/// Walks a long route while eating, logging loot, and bailing out of danger.
pub struct HighwayStrategy {
    agent: Arc<Agent>,
    config: HighwayConfig,
    actions: Mutex<Vec<ActionHandle>>,
    running: AtomicBool,
    restart_tx: mpsc::Sender<RestartRequest>,
    restart_rx: Mutex<Option<mpsc::Receiver<RestartRequest>>>,
}

impl HighwayStrategy {
    pub fn new(agent: Arc<Agent>, config: HighwayConfig) -> Result<Arc<Self>> {
        if config.target.y != HIGHWAY_Y {
            return Err(AgentError::InvalidCoordinate(format!(
                "highway targets must sit at y={HIGHWAY_Y}, got y={}",
                config.target.y
            )));
        }
        let (restart_tx, restart_rx) = mpsc::channel(RESTART_BUFFER);
        Ok(Arc::new(Self {
            agent,
            config,
            actions: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            restart_tx,
            restart_rx: Mutex::new(Some(restart_rx)),
        }))
    }

    /// Constructs the fixed action set, GotoLocation first so a goal exists
    /// before any stuck-recovery logic could reference it.
    fn build_actions(&self) -> Vec<ActionHandle> {
        let bus = self.agent.bus().clone();
        let quit_config = EmergencyQuitConfig {
            reconnect_wait: Some(self.config.reconnect_wait),
            ..EmergencyQuitConfig::default()
        };

        let mut handles = vec![
            ActionHandle::new(
                bus.clone(),
                Arc::new(GotoLocation::new(
                    Arc::clone(&self.agent),
                    self.config.target,
                    self.config.goto_log_interval,
                    self.config.exit_on_arrival,
                )),
            ),
            ActionHandle::new(
                bus.clone(),
                Arc::new(
                    EmergencyQuit::new(Arc::clone(&self.agent), quit_config)
                        .with_restart_channel(self.restart_tx.clone()),
                ),
            ),
            ActionHandle::new(
                bus.clone(),
                Arc::new(EfficientEat::new(Arc::clone(&self.agent))),
            ),
            ActionHandle::new(
                bus.clone(),
                Arc::new(LootFinder::new(Arc::clone(&self.agent))),
            ),
        ];
        if self.config.use_shield {
            handles.push(ActionHandle::new(
                bus,
                Arc::new(AlwaysShield::new(Arc::clone(&self.agent))),
            ));
        }
        handles
    }

    /// Runs the restart protocol loop until the channel closes or the agent
    /// shuts down. Must be spawned once, before `start`.
    pub fn spawn_supervisor(self: &Arc<Self>) -> JoinHandle<()> {
        let mut restart_rx = self
            .restart_rx
            .lock()
            .expect("restart receiver poisoned")
            .take()
            .expect("supervisor already spawned");
        let strategy = Arc::clone(self);
        tokio::spawn(async move {
            let mut shutdown = strategy.agent.shutdown_signal();
            loop {
                tokio::select! {
                    request = restart_rx.recv() => match request {
                        Some(request) => {
                            strategy.restart(request.wait).await;
                            // Collapse requests queued while restarting.
                            while restart_rx.try_recv().is_ok() {}
                        }
                        None => break,
                    },
                    _ = shutdown.changed() => break,
                }
            }
        })
    }

    /// Stop everything, cycle the connection, rebuild and restart the set.
    pub async fn restart(&self, wait: Duration) {
        warn!(wait_secs = wait.as_secs(), "restarting strategy");
        self.stop_actions().await;

        if let Err(err) = self.agent.reconnect(wait).await {
            error!(error = %err, "reconnect failed during restart, shutting down");
            self.agent.disconnect(true).await;
            return;
        }
        if self.agent.wait_until_active(ACTIVATION_WAIT).await.is_err() {
            return;
        }

        self.start_actions();
        info!("strategy restarted");
    }

    fn start_actions(&self) {
        let handles = self.build_actions();
        for handle in &handles {
            handle.start();
        }
        *self.actions.lock().expect("action set poisoned") = handles;
    }

    /// Snapshot-then-iterate: the set is taken out of the lock before any
    /// stop runs, so nothing mutates the list mid-iteration.
    async fn stop_actions(&self) {
        let handles = std::mem::take(&mut *self.actions.lock().expect("action set poisoned"));
        for handle in &handles {
            handle.stop().await;
        }
    }

    pub fn action_names(&self) -> Vec<&'static str> {
        self.actions
            .lock()
            .expect("action set poisoned")
            .iter()
            .map(ActionHandle::name)
            .collect()
    }
}

#[async_trait]
impl Strategy for HighwayStrategy {
    fn name(&self) -> &'static str {
        "Highway"
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::Relaxed) {
            warn!("highway strategy already running");
            return Ok(());
        }
        info!(target = %self.config.target, "starting highway strategy");
        self.start_actions();
        Ok(())
    }

    async fn stop(&self) {
        self.stop_actions().await;
        self.running.store(false, Ordering::Relaxed);
        info!("highway strategy stopped");
    }
}
