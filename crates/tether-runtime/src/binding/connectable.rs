#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::observation::{PropertyObserver, Subscriber};

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

fn same_observer(a: &Rc<dyn PropertyObserver>, b: &Rc<dyn PropertyObserver>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

fn same_listener(a: &Weak<dyn Subscriber>, b: &Rc<dyn Subscriber>) -> bool {
    std::ptr::addr_eq(a.as_ptr(), Rc::as_ptr(b))
}

/// One recorded dependency.
///
/// The listener is held weakly, like the observer holds it: a recorded
/// dependency never keeps its binding alive.
pub struct ObserverSlot {
    observer: Rc<dyn PropertyObserver>,
    listener: Weak<dyn Subscriber>,
    version: u64,
}

impl ObserverSlot {
    #[must_use]
    pub fn observer(&self) -> &Rc<dyn PropertyObserver> {
        &self.observer
    }

    fn release(&self) {
        // A dead listener was already pruned by the observer.
        if let Some(listener) = self.listener.upgrade() {
            self.observer.unsubscribe(&listener);
        }
    }

    /// Version of the connect pass that last touched this dependency.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Dependency bookkeeping for the full-expression path.
///
/// Each connect pass records the observers it reads at the current version.
/// After a re-connect at `v + 1`, [`unobserve_stale`](Self::unobserve_stale)
/// with `v` drops every dependency the new pass no longer touched.
pub struct Connectable {
    id: u64,
    version: Cell<u64>,
    slots: RefCell<Vec<ObserverSlot>>,
}

impl Connectable {
    /// A fresh record with a process-unique id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed),
            version: Cell::new(0),
            slots: RefCell::new(Vec::new()),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    /// Start a new connect pass. Returns the new version.
    pub fn bump_version(&self) -> u64 {
        let next = self.version.get().wrapping_add(1);
        self.version.set(next);
        next
    }

    /// Subscribe `listener` to `observer` at the current version.
    ///
    /// An observer already recorded only has its version refreshed (and its
    /// listener swapped if a different one is now registering).
    pub fn record_dependency(
        &self,
        observer: Rc<dyn PropertyObserver>,
        listener: Rc<dyn Subscriber>,
    ) {
        let version = self.version.get();
        let replaced = {
            let mut slots = self.slots.borrow_mut();
            match slots
                .iter_mut()
                .find(|slot| same_observer(&slot.observer, &observer))
            {
                Some(slot) if same_listener(&slot.listener, &listener) => {
                    slot.version = version;
                    return;
                }
                Some(slot) => {
                    slot.version = version;
                    Some(std::mem::replace(&mut slot.listener, Rc::downgrade(&listener)))
                }
                None => {
                    slots.push(ObserverSlot {
                        observer: Rc::clone(&observer),
                        listener: Rc::downgrade(&listener),
                        version,
                    });
                    None
                }
            }
        };
        if let Some(previous) = replaced.as_ref().and_then(Weak::upgrade) {
            observer.unsubscribe(&previous);
        }
        observer.subscribe(listener);
    }

    /// Drop every dependency last recorded at or before `through_version`.
    pub fn unobserve_stale(&self, through_version: u64) {
        let stale: Vec<ObserverSlot> = {
            let mut slots = self.slots.borrow_mut();
            let (stale, live) = std::mem::take(&mut *slots)
                .into_iter()
                .partition(|slot| slot.version <= through_version);
            *slots = live;
            stale
        };
        for slot in &stale {
            slot.release();
        }
    }

    /// Drop every dependency.
    pub fn unobserve_all(&self) {
        let slots = std::mem::take(&mut *self.slots.borrow_mut());
        for slot in &slots {
            slot.release();
        }
    }

    /// Number of recorded dependencies.
    #[must_use]
    pub fn observer_slots(&self) -> usize {
        self.slots.borrow().len()
    }
}

impl Default for Connectable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Connectable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connectable")
            .field("id", &self.id)
            .field("version", &self.version.get())
            .field("observer_slots", &self.observer_slots())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::SetterObserver;
    use tether_core::{LifecycleFlags, ObjectRef, Result, Value};

    struct Noop;

    impl Subscriber for Noop {
        fn handle_change(&self, _: &Value, _: &Value, _: LifecycleFlags) -> Result<()> {
            Ok(())
        }
    }

    fn observer(vm: &ObjectRef, name: &str) -> Rc<dyn PropertyObserver> {
        SetterObserver::for_property(vm, name)
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = Connectable::new();
        let b = Connectable::new();
        assert!(b.id() > a.id());
    }

    #[test]
    fn duplicate_dependencies_share_one_slot() {
        let vm = ObjectRef::new();
        let listener: Rc<dyn Subscriber> = Rc::new(Noop);
        let c = Connectable::new();
        c.record_dependency(observer(&vm, "a"), Rc::clone(&listener));
        c.record_dependency(observer(&vm, "a"), Rc::clone(&listener));
        assert_eq!(c.observer_slots(), 1);
        assert_eq!(observer(&vm, "a").subscriber_count(), 1);
    }

    #[test]
    fn stale_dependencies_are_dropped() {
        let vm = ObjectRef::new();
        let listener: Rc<dyn Subscriber> = Rc::new(Noop);
        let c = Connectable::new();
        c.record_dependency(observer(&vm, "a"), Rc::clone(&listener));
        c.record_dependency(observer(&vm, "b"), Rc::clone(&listener));

        let previous = c.version();
        c.bump_version();
        c.record_dependency(observer(&vm, "b"), Rc::clone(&listener));
        c.unobserve_stale(previous);

        assert_eq!(c.observer_slots(), 1);
        assert_eq!(observer(&vm, "a").subscriber_count(), 0);
        assert_eq!(observer(&vm, "b").subscriber_count(), 1);
    }

    #[test]
    fn unobserve_all_releases_everything() {
        let vm = ObjectRef::new();
        let listener: Rc<dyn Subscriber> = Rc::new(Noop);
        let c = Connectable::new();
        c.record_dependency(observer(&vm, "a"), Rc::clone(&listener));
        c.record_dependency(observer(&vm, "b"), listener);
        c.unobserve_all();
        assert_eq!(c.observer_slots(), 0);
        assert_eq!(observer(&vm, "a").subscriber_count(), 0);
    }

    #[test]
    fn listener_swap_moves_the_subscription() {
        let vm = ObjectRef::new();
        let first: Rc<dyn Subscriber> = Rc::new(Noop);
        let second: Rc<dyn Subscriber> = Rc::new(Noop);
        let c = Connectable::new();
        c.record_dependency(observer(&vm, "a"), Rc::clone(&first));
        c.record_dependency(observer(&vm, "a"), Rc::clone(&second));
        let a = observer(&vm, "a");
        assert_eq!(a.subscriber_count(), 1);
        assert!(!a.unsubscribe(&first));
        assert!(a.unsubscribe(&second));
    }

    #[test]
    fn slots_do_not_keep_listeners_alive() {
        let vm = ObjectRef::new();
        let listener: Rc<dyn Subscriber> = Rc::new(Noop);
        let weak = Rc::downgrade(&listener);
        let c = Connectable::new();
        c.record_dependency(observer(&vm, "a"), listener);
        assert!(weak.upgrade().is_none());
        assert_eq!(observer(&vm, "a").subscriber_count(), 0);

        c.unobserve_all();
        assert_eq!(c.observer_slots(), 0);
    }
}
