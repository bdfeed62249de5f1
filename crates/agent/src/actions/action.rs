//! The action capability contract.
//!
//! An action is a named, independently startable/stoppable behavior unit
//! bound to one event kind. Its reaction body is its [`EventHandler`] impl;
//! [`ActionHandle`] owns the bus registration so starting and stopping never
//! leak subscriptions.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::events::{EventBus, EventHandler, EventKind, HandlerId};

/// A stateful behavior unit driven by the event bus.
///
/// Per-invocation logic lives in [`EventHandler::handle`]; it may read world
/// snapshots and issue commands through the agent facade, but must not block
/// the dispatch task for unbounded time.
#[async_trait]
pub trait Action: EventHandler {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// The event this action reacts to, or `None` for actions driven some
    /// other way.
    fn bound_event(&self) -> Option<EventKind>;

    /// Cleanup hook invoked on stop, independent of bus unsubscription.
    async fn on_stop(&self) {}
}

/// Pairs an action with its bus registration.
///
/// `start` and `stop` are both idempotent: starting twice keeps the single
/// existing registration, stopping twice (or without ever starting) is a
/// no-op beyond the cleanup hook.
pub struct ActionHandle {
    action: Arc<dyn Action>,
    bus: EventBus,
    registration: Mutex<Option<HandlerId>>,
}

impl ActionHandle {
    pub fn new(bus: EventBus, action: Arc<dyn Action>) -> Self {
        Self {
            action,
            bus,
            registration: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.action.name()
    }

    pub fn is_running(&self) -> bool {
        self.registration
            .lock()
            .expect("registration poisoned")
            .is_some()
    }

    /// Subscribes the action's reaction under its bound event.
    pub fn start(&self) {
        let mut registration = self.registration.lock().expect("registration poisoned");
        if registration.is_some() {
            debug!(action = self.action.name(), "action already started");
            return;
        }
        if let Some(kind) = self.action.bound_event() {
            let action = Arc::clone(&self.action);
            let handler: Arc<dyn EventHandler> = action;
            *registration = Some(self.bus.register(kind, handler));
        }
        info!(action = self.action.name(), "action started");
    }

    /// Unsubscribes the reaction and runs the action's cleanup hook.
    pub async fn stop(&self) {
        let id = self
            .registration
            .lock()
            .expect("registration poisoned")
            .take();
        if let (Some(id), Some(kind)) = (id, self.action.bound_event()) {
            self.bus.unregister(kind, id);
            info!(action = self.action.name(), "action stopped");
        }
        self.action.on_stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::events::WorldEvent;

    struct NoopAction;

    #[async_trait]
    impl EventHandler for NoopAction {
        async fn handle(&self, _event: &WorldEvent) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl Action for NoopAction {
        fn name(&self) -> &'static str {
            "Noop"
        }
        fn description(&self) -> &'static str {
            "does nothing"
        }
        fn bound_event(&self) -> Option<EventKind> {
            Some(EventKind::Tick)
        }
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_safe_without_start() {
        let bus = EventBus::new();
        let handle = ActionHandle::new(bus.clone(), Arc::new(NoopAction));

        // Never started: stop is a no-op.
        handle.stop().await;
        assert_eq!(bus.handler_count(EventKind::Tick), 0);

        handle.start();
        assert!(handle.is_running());
        assert_eq!(bus.handler_count(EventKind::Tick), 1);

        handle.stop().await;
        handle.stop().await;
        assert!(!handle.is_running());
        assert_eq!(bus.handler_count(EventKind::Tick), 0);
    }

    #[tokio::test]
    async fn double_start_keeps_a_single_registration() {
        let bus = EventBus::new();
        let handle = ActionHandle::new(bus.clone(), Arc::new(NoopAction));
        handle.start();
        handle.start();
        assert_eq!(bus.handler_count(EventKind::Tick), 1);
    }

    #[tokio::test]
    async fn restart_after_stop_resubscribes() {
        let bus = EventBus::new();
        let handle = ActionHandle::new(bus.clone(), Arc::new(NoopAction));
        handle.start();
        handle.stop().await;
        handle.start();
        assert_eq!(bus.handler_count(EventKind::Tick), 1);
    }
}
