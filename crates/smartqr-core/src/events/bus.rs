//! In-process pub/sub with bounded history.
//!
//! ## Delivery contract
//!
//! - `emit` records the event, then schedules delivery on the runtime and
//!   returns immediately. Handlers never run re-entrantly inside the
//!   emitter's stack frame.
//! - `emit_and_wait` records the event and awaits every handler.
//! - Within one delivery, handlers run in registration order; a panicking
//!   handler is isolated (logged, remaining handlers still run).
//! - History is capped at [`EventBus::MAX_HISTORY`] entries, oldest evicted.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock, Weak};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{EventTopic, SmartQrEvent};

type BoxedHandler =
    Arc<dyn Fn(SmartQrEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

struct HandlerEntry {
    id: Uuid,
    once: bool,
    handler: BoxedHandler,
}

/// A recorded emission. Kept even when no handler was subscribed.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub topic: EventTopic,
    pub event: SmartQrEvent,
    pub recorded_at: DateTime<Utc>,
}

struct BusInner {
    // std locks: critical sections only snapshot/mutate Vec entries, never
    // await while held.
    handlers: RwLock<HashMap<EventTopic, Vec<HandlerEntry>>>,
    global: RwLock<Vec<HandlerEntry>>,
    history: Mutex<VecDeque<HistoryEntry>>,
}

/// Handle returned by subscribe calls. Dropping it does NOT unsubscribe;
/// call [`Subscription::unsubscribe`] explicitly.
pub struct Subscription {
    bus: Weak<BusInner>,
    topic: Option<EventTopic>,
    id: Uuid,
}

impl Subscription {
    /// Detach the handler. No-op if the bus is gone or the handler already
    /// fired (for `once` subscriptions).
    pub fn unsubscribe(self) {
        let Some(inner) = self.bus.upgrade() else {
            return;
        };
        match self.topic {
            Some(topic) => {
                let mut map = inner.handlers.write().expect("handler registry poisoned");
                if let Some(entries) = map.get_mut(&topic) {
                    entries.retain(|e| e.id != self.id);
                }
            }
            None => {
                let mut global = inner.global.write().expect("handler registry poisoned");
                global.retain(|e| e.id != self.id);
            }
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Bounded history size; oldest entries are evicted past this.
    pub const MAX_HISTORY: usize = 1000;

    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                handlers: RwLock::new(HashMap::new()),
                global: RwLock::new(Vec::new()),
                history: Mutex::new(VecDeque::new()),
            }),
        }
    }

    // ── Subscription ──────────────────────────────────────────────────────

    /// Subscribe to one topic.
    pub fn on<F, Fut>(&self, topic: EventTopic, handler: F) -> Subscription
    where
        F: Fn(SmartQrEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe(topic, handler, false)
    }

    /// Subscribe to one topic for a single delivery, then auto-detach.
    pub fn once<F, Fut>(&self, topic: EventTopic, handler: F) -> Subscription
    where
        F: Fn(SmartQrEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe(topic, handler, true)
    }

    /// Subscribe to every topic. Global handlers run after topic handlers.
    pub fn on_all<F, Fut>(&self, handler: F) -> Subscription
    where
        F: Fn(SmartQrEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let entry = HandlerEntry {
            id: Uuid::new_v4(),
            once: false,
            handler: Self::boxed(handler),
        };
        let id = entry.id;
        self.inner
            .global
            .write()
            .expect("handler registry poisoned")
            .push(entry);
        Subscription {
            bus: Arc::downgrade(&self.inner),
            topic: None,
            id,
        }
    }

    fn subscribe<F, Fut>(&self, topic: EventTopic, handler: F, once: bool) -> Subscription
    where
        F: Fn(SmartQrEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let entry = HandlerEntry {
            id: Uuid::new_v4(),
            once,
            handler: Self::boxed(handler),
        };
        let id = entry.id;
        self.inner
            .handlers
            .write()
            .expect("handler registry poisoned")
            .entry(topic)
            .or_default()
            .push(entry);
        Subscription {
            bus: Arc::downgrade(&self.inner),
            topic: Some(topic),
            id,
        }
    }

    fn boxed<F, Fut>(handler: F) -> BoxedHandler
    where
        F: Fn(SmartQrEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Arc::new(move |event| Box::pin(handler(event)))
    }

    // ── Emission ──────────────────────────────────────────────────────────

    /// Record and schedule delivery; returns before any handler runs.
    ///
    /// Must be called from within a tokio runtime.
    pub fn emit(&self, event: SmartQrEvent) {
        self.record(&event);
        let handlers = self.collect_handlers(event.topic());
        tokio::spawn(async move {
            Self::deliver(handlers, event).await;
        });
    }

    /// Record and deliver, returning only after every handler has finished.
    pub async fn emit_and_wait(&self, event: SmartQrEvent) {
        self.record(&event);
        let handlers = self.collect_handlers(event.topic());
        Self::deliver(handlers, event).await;
    }

    /// Snapshot the handler list for a topic plus globals, removing `once`
    /// entries so a concurrent emit cannot fire them twice.
    fn collect_handlers(&self, topic: EventTopic) -> Vec<BoxedHandler> {
        let mut snapshot = Vec::new();
        {
            let mut map = self.inner.handlers.write().expect("handler registry poisoned");
            if let Some(entries) = map.get_mut(&topic) {
                for entry in entries.iter() {
                    snapshot.push(Arc::clone(&entry.handler));
                }
                entries.retain(|e| !e.once);
            }
        }
        {
            let global = self.inner.global.read().expect("handler registry poisoned");
            for entry in global.iter() {
                snapshot.push(Arc::clone(&entry.handler));
            }
        }
        snapshot
    }

    /// Run handlers in order, isolating panics so one bad subscriber cannot
    /// starve the rest.
    async fn deliver(handlers: Vec<BoxedHandler>, event: SmartQrEvent) {
        let topic = event.topic();
        for handler in handlers {
            let fut = handler(event.clone());
            if let Err(join_err) = tokio::spawn(fut).await {
                tracing::error!(topic = %topic, error = %join_err, "event handler panicked");
            }
        }
    }

    // ── Introspection ─────────────────────────────────────────────────────

    /// Remove handlers for one topic, or everything (topic handlers and
    /// globals) when `topic` is `None`.
    pub fn remove_all_handlers(&self, topic: Option<EventTopic>) {
        match topic {
            Some(t) => {
                self.inner
                    .handlers
                    .write()
                    .expect("handler registry poisoned")
                    .remove(&t);
            }
            None => {
                self.inner
                    .handlers
                    .write()
                    .expect("handler registry poisoned")
                    .clear();
                self.inner
                    .global
                    .write()
                    .expect("handler registry poisoned")
                    .clear();
            }
        }
    }

    /// Recorded emissions, optionally filtered by topic. Oldest first.
    pub fn history(&self, topic: Option<EventTopic>) -> Vec<HistoryEntry> {
        let history = self.inner.history.lock().expect("history poisoned");
        match topic {
            Some(t) => history.iter().filter(|h| h.topic == t).cloned().collect(),
            None => history.iter().cloned().collect(),
        }
    }

    pub fn clear_history(&self) {
        self.inner.history.lock().expect("history poisoned").clear();
    }

    /// Handler count for one topic, or the total including globals.
    pub fn handler_count(&self, topic: Option<EventTopic>) -> usize {
        let map = self.inner.handlers.read().expect("handler registry poisoned");
        match topic {
            Some(t) => map.get(&t).map_or(0, Vec::len),
            None => {
                let global = self.inner.global.read().expect("handler registry poisoned");
                map.values().map(Vec::len).sum::<usize>() + global.len()
            }
        }
    }

    fn record(&self, event: &SmartQrEvent) {
        let mut history = self.inner.history.lock().expect("history poisoned");
        history.push_back(HistoryEntry {
            topic: event.topic(),
            event: event.clone(),
            recorded_at: Utc::now(),
        });
        while history.len() > Self::MAX_HISTORY {
            history.pop_front();
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handler_count(None))
            .field("history", &self.history(None).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::events::LimitReachedPayload;

    fn limit_event(user: &str) -> SmartQrEvent {
        SmartQrEvent::LimitReached(LimitReachedPayload {
            user_id: user.into(),
            current_count: 3,
            limit: 3,
            timestamp: Utc::now(),
        })
    }

    fn requested_event(url: &str) -> SmartQrEvent {
        SmartQrEvent::Requested(crate::events::RequestedPayload {
            url: url.into(),
            user_id: None,
            template_found: true,
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn emit_and_wait_runs_subscribed_handlers() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        bus.on(EventTopic::LimitReached, move |_| {
            let h = Arc::clone(&h);
            async move {
                h.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.emit_and_wait(limit_event("u1")).await;
        bus.emit_and_wait(limit_event("u1")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn emit_is_deferred_not_reentrant() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        bus.on(EventTopic::Requested, move |_| {
            let h = Arc::clone(&h);
            async move {
                h.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.emit(requested_event("https://a.example"));
        // The emitter's own "frame": delivery has not happened yet.
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn once_fires_a_single_time() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        bus.once(EventTopic::LimitReached, move |_| {
            let h = Arc::clone(&h);
            async move {
                h.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.emit_and_wait(limit_event("u1")).await;
        bus.emit_and_wait(limit_event("u1")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_count(Some(EventTopic::LimitReached)), 0);
    }

    #[tokio::test]
    async fn global_handler_sees_every_topic() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        bus.on_all(move |_| {
            let h = Arc::clone(&h);
            async move {
                h.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.emit_and_wait(limit_event("u1")).await;
        bus.emit_and_wait(requested_event("https://a.example")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unsubscribe_detaches_handler() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        let sub = bus.on(EventTopic::LimitReached, move |_| {
            let h = Arc::clone(&h);
            async move {
                h.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.emit_and_wait(limit_event("u1")).await;
        sub.unsubscribe();
        bus.emit_and_wait(limit_event("u1")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_handler_does_not_starve_later_ones() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        bus.on(EventTopic::LimitReached, |_| async {
            panic!("subscriber bug");
        });
        let h = Arc::clone(&hits);
        bus.on(EventTopic::LimitReached, move |_| {
            let h = Arc::clone(&h);
            async move {
                h.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.emit_and_wait(limit_event("u1")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn history_is_recorded_even_without_handlers() {
        let bus = EventBus::new();
        bus.emit_and_wait(limit_event("u1")).await;
        bus.emit_and_wait(requested_event("https://a.example")).await;

        assert_eq!(bus.history(None).len(), 2);
        let limits = bus.history(Some(EventTopic::LimitReached));
        assert_eq!(limits.len(), 1);
        assert_eq!(limits[0].topic, EventTopic::LimitReached);

        bus.clear_history();
        assert!(bus.history(None).is_empty());
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let bus = EventBus::new();
        for _ in 0..(EventBus::MAX_HISTORY + 50) {
            bus.emit_and_wait(limit_event("u1")).await;
        }
        assert_eq!(bus.history(None).len(), EventBus::MAX_HISTORY);
    }

    #[tokio::test]
    async fn handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.on(EventTopic::Requested, move |_| {
                let order = Arc::clone(&order);
                async move {
                    order.lock().unwrap().push(tag);
                }
            });
        }

        bus.emit_and_wait(requested_event("https://a.example")).await;
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn remove_all_handlers_scoped_and_global() {
        let bus = EventBus::new();
        bus.on(EventTopic::Requested, |_| async {});
        bus.on(EventTopic::LimitReached, |_| async {});
        bus.on_all(|_| async {});
        assert_eq!(bus.handler_count(None), 3);

        bus.remove_all_handlers(Some(EventTopic::Requested));
        assert_eq!(bus.handler_count(Some(EventTopic::Requested)), 0);
        assert_eq!(bus.handler_count(None), 2);

        bus.remove_all_handlers(None);
        assert_eq!(bus.handler_count(None), 0);
    }
}
