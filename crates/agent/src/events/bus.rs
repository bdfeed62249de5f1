//! Per-agent event bus.
//!
//! Maps event kinds to ordered handler lists. Dispatch invokes handlers in
//! registration order and isolates per-handler failures so one broken
//! reaction cannot starve the rest; a debug mode inverts this and propagates
//! the first failure for development visibility.
//!
//! Dispatch snapshots the handler list before iterating, so a handler may
//! unregister itself (or anything else) mid-dispatch without corrupting the
//! iteration. An unregistered handler may still see one in-flight invocation
//! complete; it will never see another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::Result;

use super::types::{EventKind, WorldEvent};

/// Identifies one registration so it can be removed later.
///
/// Ids are unique per bus; registering the same handler twice yields two ids
/// and two invocations per dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// A reaction invoked by the bus.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &WorldEvent) -> Result<()>;
}

/// Adapts a plain closure into an [`EventHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&WorldEvent) -> Result<()> + Send + Sync,
{
    async fn handle(&self, event: &WorldEvent) -> Result<()> {
        (self.0)(event)
    }
}

#[derive(Clone)]
struct Registration {
    id: HandlerId,
    handler: Arc<dyn EventHandler>,
}

struct BusInner {
    handlers: Mutex<HashMap<EventKind, Vec<Registration>>>,
    next_id: AtomicU64,
    debug: AtomicBool,
}

/// Ordered, per-agent handler registry.
///
/// Cloning yields another handle to the same registry; each agent owns its
/// own bus, there are no process-wide singletons.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                handlers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                debug: AtomicBool::new(false),
            }),
        }
    }

    /// In debug mode dispatch stops at the first handler failure and returns
    /// it instead of logging and continuing.
    pub fn set_debug(&self, debug: bool) {
        self.inner.debug.store(debug, Ordering::Relaxed);
    }

    pub fn is_debug(&self) -> bool {
        self.inner.debug.load(Ordering::Relaxed)
    }

    /// Appends a handler to the list for `kind`.
    pub fn register(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> HandlerId {
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self.inner.handlers.lock().expect("handler table poisoned");
        handlers
            .entry(kind)
            .or_default()
            .push(Registration { id, handler });
        id
    }

    /// Removes the registration with `id`, if present. Unknown kinds or ids
    /// are a no-op, not an error.
    pub fn unregister(&self, kind: EventKind, id: HandlerId) {
        let mut handlers = self.inner.handlers.lock().expect("handler table poisoned");
        if let Some(list) = handlers.get_mut(&kind)
            && let Some(index) = list.iter().position(|reg| reg.id == id)
        {
            list.remove(index);
        }
    }

    /// Number of live registrations for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        let handlers = self.inner.handlers.lock().expect("handler table poisoned");
        handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Invokes every handler currently registered for the event's kind, in
    /// registration order.
    pub async fn dispatch(&self, event: &WorldEvent) -> Result<()> {
        let kind = event.kind();
        let snapshot: Vec<Registration> = {
            let handlers = self.inner.handlers.lock().expect("handler table poisoned");
            handlers.get(&kind).cloned().unwrap_or_default()
        };

        for registration in snapshot {
            if let Err(error) = registration.handler.handle(event).await {
                if self.is_debug() {
                    return Err(error);
                }
                tracing::error!(event = %kind, %error, "event handler failed");
            }
        }
        Ok(())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
