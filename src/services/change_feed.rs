// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process change notifications per collection.
//!
//! Writes through `FirestoreDb` publish an event here; consumers such as the
//! alert monitor subscribe to the collections they derive from and never
//! need to know how updates arrive.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A single document change in a named collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: String,
    pub document_id: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(collection: &str, document_id: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            collection: collection.to_string(),
            document_id: document_id.into(),
            kind,
        }
    }
}

type ChangeCallback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

struct Subscriber {
    collection: String,
    on_change: ChangeCallback,
}

#[derive(Default)]
struct FeedInner {
    next_id: AtomicU64,
    subscribers: DashMap<u64, Subscriber>,
}

/// Shared registry of change subscribers. Clones share the same registry.
#[derive(Clone, Default)]
pub struct ChangeFeed {
    inner: Arc<FeedInner>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `on_change` for every event published on `collection`.
    ///
    /// Delivery stops when the returned subscription is dropped or
    /// explicitly unsubscribed.
    pub fn subscribe<F>(&self, collection: &str, on_change: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.insert(
            id,
            Subscriber {
                collection: collection.to_string(),
                on_change: Arc::new(on_change),
            },
        );

        tracing::debug!(collection, subscription_id = id, "Change subscriber added");

        Subscription {
            id,
            feed: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to the subscribers of its collection.
    ///
    /// Returns the number of callbacks invoked.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        // Snapshot the callbacks first: a callback may unsubscribe, which
        // needs the map shard we would otherwise still be holding.
        let callbacks: Vec<ChangeCallback> = self
            .inner
            .subscribers
            .iter()
            .filter(|s| s.collection == event.collection)
            .map(|s| s.on_change.clone())
            .collect();

        for callback in &callbacks {
            callback(&event);
        }

        tracing::trace!(
            collection = %event.collection,
            document_id = %event.document_id,
            kind = ?event.kind,
            delivered = callbacks.len(),
            "Change published"
        );

        callbacks.len()
    }

    /// Number of live subscriptions across all collections.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

/// Handle returned by [`ChangeFeed::subscribe`].
pub struct Subscription {
    id: u64,
    feed: Weak<FeedInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Removal happens in Drop.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.upgrade() {
            feed.subscribers.remove(&self.id);
        }
    }
}
