// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-subscriber event fan-out (C1, §4.1).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use orc_core::event::{Event, EventEnvelope, EventFilter};
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tracing::trace;

orc_core::define_id! {
    /// Identifies one subscription to the event bus.
    pub struct SubscriptionId("sub-");
}

struct SubscriberState {
    filter: EventFilter,
    queue: Mutex<VecDeque<Event>>,
    dropped: AtomicU64,
    notify: Notify,
    capacity: usize,
}

impl SubscriberState {
    /// Push an event, dropping the oldest buffered one on overflow (§4.1).
    /// Never blocks.
    fn push(&self, event: Event) {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(event);
        drop(queue);
        self.notify.notify_one();
    }
}

/// A bounded-buffer, non-blocking-publish, per-executionId-ordered fan-out
/// of progress events (§4.1). Cloning an `EventBus` shares the same
/// subscriber table.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<SubscriptionId, Arc<SubscriberState>>>>,
    default_buffer: usize,
}

impl EventBus {
    pub fn new(default_buffer: usize) -> Self {
        Self { subscribers: Arc::new(RwLock::new(HashMap::new())), default_buffer }
    }

    /// Register a new subscription with the bus's default buffer size.
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.subscribe_with_buffer(filter, self.default_buffer)
    }

    pub fn subscribe_with_buffer(&self, filter: EventFilter, buffer: usize) -> Subscription {
        let id = SubscriptionId::new();
        let state = Arc::new(SubscriberState {
            filter,
            queue: Mutex::new(VecDeque::with_capacity(buffer.min(256))),
            dropped: AtomicU64::new(0),
            notify: Notify::new(),
            capacity: buffer.max(1),
        });
        self.subscribers.write().insert(id, state.clone());
        Subscription { id, bus: self.clone(), state }
    }

    /// Publish an event to every matching subscriber. Non-blocking: a full
    /// subscriber buffer just drops its oldest entry (§4.1).
    pub fn publish(&self, event: Event) {
        let subscribers = self.subscribers.read();
        trace!(kind = event.kind(), execution_id = %event.execution_id(), subscriber_count = subscribers.len(), "publish");
        for state in subscribers.values() {
            if state.filter.matches(&event) {
                state.push(event.clone());
            }
        }
    }

    fn unsubscribe(&self, id: &SubscriptionId) {
        self.subscribers.write().remove(id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

/// A live subscription. `recv` waits for the next matching event; dropping
/// the subscription removes it from the bus.
pub struct Subscription {
    id: SubscriptionId,
    bus: EventBus,
    state: Arc<SubscriberState>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Await the next event, wrapped with the number of events dropped for
    /// this subscription since the last delivery (§4.1).
    pub async fn recv(&mut self) -> EventEnvelope {
        loop {
            if let Some(event) = self.state.queue.lock().pop_front() {
                let dropped_since_last = self.state.dropped.swap(0, Ordering::Relaxed);
                return EventEnvelope { event, dropped_since_last };
            }
            self.state.notify.notified().await;
        }
    }

    /// Non-blocking poll; `None` if nothing is buffered right now.
    pub fn try_recv(&mut self) -> Option<EventEnvelope> {
        let event = self.state.queue.lock().pop_front()?;
        let dropped_since_last = self.state.dropped.swap(0, Ordering::Relaxed);
        Some(EventEnvelope { event, dropped_since_last })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.id);
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
