#![forbid(unsafe_code)]

//! View-model context chain used to resolve identifiers.

use std::rc::Rc;

use crate::object::ObjectRef;

/// One level of the context chain.
///
/// The binding context is the view-model; the override context holds
/// contextual locals (loop variables, `$index`, ...) that shadow it.
#[derive(Debug)]
pub struct Scope {
    binding_context: ObjectRef,
    override_context: ObjectRef,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    /// A root scope over `binding_context`.
    #[must_use]
    pub fn create(binding_context: ObjectRef) -> Rc<Self> {
        Rc::new(Self {
            binding_context,
            override_context: ObjectRef::new(),
            parent: None,
        })
    }

    /// A child scope whose identifiers fall back to `parent`.
    #[must_use]
    pub fn from_parent(parent: &Rc<Scope>, binding_context: ObjectRef) -> Rc<Self> {
        Rc::new(Self {
            binding_context,
            override_context: ObjectRef::new(),
            parent: Some(Rc::clone(parent)),
        })
    }

    #[must_use]
    pub fn binding_context(&self) -> &ObjectRef {
        &self.binding_context
    }

    #[must_use]
    pub fn override_context(&self) -> &ObjectRef {
        &self.override_context
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }

    /// Walk `ancestor` levels up. `None` when the chain is shorter.
    #[must_use]
    pub fn ancestor(&self, ancestor: u32) -> Option<&Scope> {
        let mut scope = self;
        for _ in 0..ancestor {
            scope = scope.parent.as_deref()?;
        }
        Some(scope)
    }

    /// Find the object that owns identifier `name`.
    ///
    /// With `ancestor > 0` the lookup is pinned to that ancestor's binding
    /// context. Otherwise the nearest scope whose override context, then
    /// binding context, has the property wins; if none does, the starting
    /// scope's binding context is returned so assignments land there.
    #[must_use]
    pub fn resolve_context(&self, name: &str, ancestor: u32) -> Option<ObjectRef> {
        if ancestor > 0 {
            return self
                .ancestor(ancestor)
                .map(|scope| scope.binding_context.clone());
        }
        let mut current = Some(self);
        while let Some(scope) = current {
            if scope.override_context.has(name) {
                return Some(scope.override_context.clone());
            }
            if scope.binding_context.has(name) {
                return Some(scope.binding_context.clone());
            }
            current = scope.parent.as_deref();
        }
        Some(self.binding_context.clone())
    }
}
