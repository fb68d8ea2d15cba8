#![forbid(unsafe_code)]

//! Decomposition of a member chain (`a.b.c`) into per-segment observers.

use std::rc::Rc;

use smallvec::SmallVec;
use tether_core::{BindingError, LifecycleFlags, Result, Scope, Value};

use crate::ast::Expression;
use crate::observation::{ObserverLocator, PropertyObserver};

/// One position of an [`ObserverChain`].
#[derive(Clone)]
pub struct ChainLink {
    pub observer: Rc<dyn PropertyObserver>,
    pub index: usize,
    /// Set only on the final segment of a complete chain.
    pub leaf: bool,
}

impl std::fmt::Debug for ChainLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainLink")
            .field("index", &self.index)
            .field("leaf", &self.leaf)
            .field("value", &self.observer.get_value())
            .finish()
    }
}

/// Observers for each reachable segment of a member chain, root first.
///
/// The chain stops early at the first segment whose value is not an
/// object; such a chain is incomplete and its value is `Undefined`.
#[derive(Debug)]
pub struct ObserverChain {
    links: SmallVec<[ChainLink; 4]>,
    segments: usize,
    leaf_value: Value,
}

impl ObserverChain {
    #[must_use]
    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Number of segments in the expression.
    #[must_use]
    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Whether every segment has an observer.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.links.len() == self.segments
    }

    /// Current value of the whole expression.
    #[must_use]
    pub fn leaf_value(&self) -> &Value {
        &self.leaf_value
    }

    pub fn into_links(self) -> SmallVec<[ChainLink; 4]> {
        self.links
    }
}

/// Segment names root first, plus the root's ancestor count.
fn member_path(expression: &Expression) -> Result<(u32, SmallVec<[&str; 4]>)> {
    let mut segments = SmallVec::<[&str; 4]>::new();
    let mut node = expression;
    loop {
        match node {
            Expression::AccessMember { object, name } => {
                segments.push(name);
                node = object;
            }
            Expression::AccessScope { name, ancestor } => {
                segments.push(name);
                segments.reverse();
                return Ok((*ancestor, segments));
            }
            other => {
                return Err(BindingError::UnsupportedChainNode { kind: other.kind() });
            }
        }
    }
}

/// Build the observer chain for `expression` as the object graph reachable
/// from `scope` currently stands.
///
/// # Errors
///
/// [`BindingError::UnsupportedChainNode`] if `expression` contains anything
/// but scope and member accesses.
pub fn build_observer_chain(
    expression: &Expression,
    flags: LifecycleFlags,
    scope: &Scope,
    locator: &dyn ObserverLocator,
) -> Result<ObserverChain> {
    let (ancestor, segments) = member_path(expression)?;
    let total = segments.len();
    let mut links = SmallVec::new();
    let mut leaf_value = Value::Undefined;

    let mut current = segments
        .first()
        .and_then(|root| scope.resolve_context(root, ancestor));
    for (index, segment) in segments.iter().enumerate() {
        let Some(object) = current.take() else {
            break;
        };
        let observer = locator.get_observer(flags, &object, segment);
        let value = observer.get_value();
        let leaf = index + 1 == total;
        links.push(ChainLink {
            observer,
            index,
            leaf,
        });
        if leaf {
            leaf_value = value;
        } else if let Value::Object(next) = value {
            current = Some(next);
        }
    }

    Ok(ObserverChain {
        links,
        segments: total,
        leaf_value,
    })
}
