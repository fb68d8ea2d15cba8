#![forbid(unsafe_code)]

//! Weakly-held subscriber list shared by the observer implementations.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. A subscriber is registered at most once (identity comparison).
//! 3. A subscriber removed while a notification pass is running is not
//!    called for the rest of that pass.
//! 4. Dead weak entries are pruned on every mutation and notification.
//!
//! # Failure Modes
//!
//! - Subscriber error: the pass stops and the error is returned to the
//!   writer; later subscribers are not called.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tether_core::{LifecycleFlags, Result, Value};

use super::Subscriber;

/// Ordered, deduplicated set of weak subscribers.
#[derive(Default)]
pub struct SubscriberCollection {
    subscribers: RefCell<Vec<Weak<dyn Subscriber>>>,
}

fn same_subscriber(weak: &Weak<dyn Subscriber>, strong: &Rc<dyn Subscriber>) -> bool {
    std::ptr::addr_eq(weak.as_ptr(), Rc::as_ptr(strong))
}

impl SubscriberCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber`. Returns `false` if it already was.
    pub fn add(&self, subscriber: Rc<dyn Subscriber>) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|w| w.strong_count() > 0);
        if subscribers.iter().any(|w| same_subscriber(w, &subscriber)) {
            return false;
        }
        subscribers.push(Rc::downgrade(&subscriber));
        true
    }

    /// Unregister `subscriber`. Returns `false` if it was not registered.
    pub fn remove(&self, subscriber: &Rc<dyn Subscriber>) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|w| w.strong_count() > 0);
        let before = subscribers.len();
        subscribers.retain(|w| !same_subscriber(w, subscriber));
        subscribers.len() < before
    }

    #[must_use]
    pub fn contains(&self, subscriber: &Rc<dyn Subscriber>) -> bool {
        self.subscribers
            .borrow()
            .iter()
            .any(|w| w.strong_count() > 0 && same_subscriber(w, subscriber))
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every live subscriber with the change.
    pub fn notify(&self, new_value: &Value, old_value: &Value, flags: LifecycleFlags) -> Result<()> {
        // Snapshot first: subscribers may (un)subscribe while being called.
        let snapshot: Vec<Rc<dyn Subscriber>> = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|w| w.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for subscriber in &snapshot {
            if !self.contains(subscriber) {
                continue;
            }
            subscriber.handle_change(new_value, old_value, flags)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for SubscriberCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberCollection")
            .field("len", &self.len())
            .finish()
    }
}
