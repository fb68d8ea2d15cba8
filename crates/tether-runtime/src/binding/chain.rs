#![forbid(unsafe_code)]

//! Observer-chain evaluation: one subscription per member segment.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use tether_core::{BindingState, LifecycleFlags, Result, Value};
use tracing::{debug, trace};

use super::observer_chain::{ChainLink, build_observer_chain};
use super::property::PropertyBinding;
use crate::observation::{PropertyObserver, Subscriber};

/// Subscription held by a binding on one position of its observer chain.
pub struct ChainSubscriber {
    owner: Weak<PropertyBinding>,
    observer: Rc<dyn PropertyObserver>,
    index: usize,
    leaf: bool,
    disposed: Cell<bool>,
}

impl ChainSubscriber {
    fn new(owner: Weak<PropertyBinding>, link: &ChainLink) -> Rc<Self> {
        Rc::new(Self {
            owner,
            observer: Rc::clone(&link.observer),
            index: link.index,
            leaf: link.leaf,
            disposed: Cell::new(false),
        })
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    #[must_use]
    pub fn observer(&self) -> &Rc<dyn PropertyObserver> {
        &self.observer
    }

    /// Whether this subscriber still stands for `link`.
    fn matches(&self, link: &ChainLink) -> bool {
        self.leaf == link.leaf
            && std::ptr::addr_eq(Rc::as_ptr(&self.observer), Rc::as_ptr(&link.observer))
    }

    fn attach(self: &Rc<Self>) {
        let listener: Rc<dyn Subscriber> = Rc::clone(self) as Rc<dyn Subscriber>;
        self.observer.subscribe(listener);
    }

    fn dispose(self: &Rc<Self>) {
        if self.disposed.replace(true) {
            return;
        }
        let listener: Rc<dyn Subscriber> = Rc::clone(self) as Rc<dyn Subscriber>;
        self.observer.unsubscribe(&listener);
    }
}

impl Subscriber for ChainSubscriber {
    fn handle_change(
        &self,
        new_value: &Value,
        _old_value: &Value,
        flags: LifecycleFlags,
    ) -> Result<()> {
        if self.disposed.get() {
            return Ok(());
        }
        match self.owner.upgrade() {
            Some(owner) => owner.on_chain_notification(self.index, self.leaf, new_value, flags),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ChainSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainSubscriber")
            .field("index", &self.index)
            .field("leaf", &self.leaf)
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

impl PropertyBinding {
    fn on_chain_notification(
        &self,
        index: usize,
        leaf: bool,
        new_value: &Value,
        flags: LifecycleFlags,
    ) -> Result<()> {
        if self.state.get() != BindingState::Bound {
            trace!(binding = self.id(), index, "chain notification ignored");
            return Ok(());
        }
        if leaf {
            let flags = flags | self.persistent_flags.get();
            self.interceptor()?.update_target(new_value.clone(), flags)
        } else {
            self.on_chain_change(Some(index), flags)
        }
    }

    /// Rebuild the chain below `index` (all of it for `None`) and push the
    /// resulting value into the target.
    ///
    /// Subscribers at or above `index` survive only while they still watch
    /// the same observer in the same role.
    pub(super) fn on_chain_change(&self, index: Option<usize>, flags: LifecycleFlags) -> Result<()> {
        let Some(scope) = self.scope() else {
            return Ok(());
        };
        let flags = flags | self.persistent_flags.get();
        let start = index.map_or(0, |i| i + 1);
        let source = self.source_expression();
        let chain = build_observer_chain(&source, flags, &scope, self.observer_locator.as_ref())?;
        let value = chain.leaf_value().clone();
        let links = chain.into_links();

        let (kept, stale) = {
            let mut subscribers = self.chain.borrow_mut();
            let kept = subscribers
                .iter()
                .take(start)
                .zip(links.iter())
                .take_while(|(subscriber, link)| subscriber.matches(link))
                .count();
            let stale: Vec<_> = subscribers.drain(kept..).collect();
            (kept, stale)
        };
        for subscriber in &stale {
            subscriber.dispose();
        }
        let fresh: Vec<Rc<ChainSubscriber>> = links[kept..]
            .iter()
            .map(|link| ChainSubscriber::new(self.this.clone(), link))
            .collect();
        for subscriber in &fresh {
            subscriber.attach();
        }
        self.chain.borrow_mut().extend(fresh);
        debug!(
            binding = self.id(),
            from = start,
            kept,
            disposed = stale.len(),
            len = links.len(),
            "observer chain rebuilt"
        );

        if value.strict_eq(&self.target_value()) {
            return Ok(());
        }
        self.interceptor()?.update_target(value, flags)
    }

    pub(super) fn dispose_chain(&self) {
        let subscribers = std::mem::take(&mut *self.chain.borrow_mut());
        for subscriber in &subscribers {
            subscriber.dispose();
        }
    }
}
