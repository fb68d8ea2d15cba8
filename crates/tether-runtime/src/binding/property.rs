#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tether_core::{
    BindingError, BindingMode, BindingState, ExpressionKind, LifecycleFlags, ObjectRef, Result,
    Scope, Value,
};
use tracing::{debug, trace};

use super::chain::ChainSubscriber;
use super::connectable::Connectable;
use super::{BindingInterceptor, EvaluationStrategy};
use crate::ast::Expression;
use crate::observation::{ObserverLocator, Subscriber, TargetObserver};
use crate::resources::ServiceLocator;

/// Synchronizes `target.target_property` with a source expression.
///
/// Always handled through `Rc`. Observers and the binding's own dependency
/// records hold the registered listener weakly, so dropping the last `Rc`
/// releases a bound binding and its subscriptions die with it.
///
/// ```
/// use std::rc::Rc;
/// use tether_core::{BindingMode, LifecycleFlags, ObjectRef, Scope, Value};
/// use tether_runtime::ast::Expression;
/// use tether_runtime::binding::PropertyBinding;
/// use tether_runtime::observation::DefaultObserverLocator;
/// use tether_runtime::resources::ResourceRegistry;
///
/// let vm = ObjectRef::new().with("name", "Ann");
/// let label = ObjectRef::element("span");
/// let binding = PropertyBinding::new(
///     Expression::path("name"),
///     &label,
///     "textContent",
///     BindingMode::ToView,
///     Rc::new(DefaultObserverLocator::new()),
///     Rc::new(ResourceRegistry::new()),
/// );
///
/// binding.bind(LifecycleFlags::FROM_BIND, &Scope::create(vm.clone()), None).unwrap();
/// assert_eq!(label.get("textContent"), Value::from("Ann"));
///
/// vm.set("name", "Bea").unwrap();
/// assert_eq!(label.get("textContent"), Value::from("Bea"));
/// ```
pub struct PropertyBinding {
    pub(super) this: Weak<PropertyBinding>,
    connectable: Connectable,
    pub(super) state: Cell<BindingState>,
    scope: RefCell<Option<Rc<Scope>>>,
    part: RefCell<Option<Rc<str>>>,
    source_expression: RefCell<Rc<Expression>>,
    /// Expression whose bind hook ran, so unbind reaches the same behaviors
    /// even if one of them replaced the source expression.
    hooked_expression: RefCell<Option<Rc<Expression>>>,
    target: ObjectRef,
    target_property: Rc<str>,
    mode: BindingMode,
    strategy: EvaluationStrategy,
    target_observer: RefCell<Option<TargetObserver>>,
    /// Listener registered on a from-view target observer.
    target_listener: RefCell<Option<Weak<dyn Subscriber>>>,
    target_bound: Cell<bool>,
    pub(super) persistent_flags: Cell<LifecycleFlags>,
    interceptor: RefCell<Option<Rc<dyn BindingInterceptor>>>,
    pub(super) chain: RefCell<Vec<Rc<ChainSubscriber>>>,
    pub(super) observer_locator: Rc<dyn ObserverLocator>,
    locator: Rc<dyn ServiceLocator>,
}

impl PropertyBinding {
    /// Create a binding, choosing the evaluation strategy from the
    /// expression's shape and the mode.
    pub fn new(
        source_expression: impl Into<Rc<Expression>>,
        target: &ObjectRef,
        target_property: &str,
        mode: BindingMode,
        observer_locator: Rc<dyn ObserverLocator>,
        locator: Rc<dyn ServiceLocator>,
    ) -> Rc<Self> {
        let source_expression = source_expression.into();
        let strategy = EvaluationStrategy::select(&source_expression, mode);
        Self::with_strategy(
            source_expression,
            target,
            target_property,
            mode,
            strategy,
            observer_locator,
            locator,
        )
    }

    /// Create a binding with an explicit strategy.
    ///
    /// An [`EvaluationStrategy::ObserverChain`] binding over anything but a
    /// member chain fails to bind with
    /// [`BindingError::UnsupportedChainNode`].
    pub fn with_strategy(
        source_expression: impl Into<Rc<Expression>>,
        target: &ObjectRef,
        target_property: &str,
        mode: BindingMode,
        strategy: EvaluationStrategy,
        observer_locator: Rc<dyn ObserverLocator>,
        locator: Rc<dyn ServiceLocator>,
    ) -> Rc<Self> {
        let source_expression = source_expression.into();
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            connectable: Connectable::new(),
            state: Cell::new(BindingState::Unbound),
            scope: RefCell::new(None),
            part: RefCell::new(None),
            source_expression: RefCell::new(source_expression),
            hooked_expression: RefCell::new(None),
            target: target.clone(),
            target_property: Rc::from(target_property),
            mode,
            strategy,
            target_observer: RefCell::new(None),
            target_listener: RefCell::new(None),
            target_bound: Cell::new(false),
            persistent_flags: Cell::new(LifecycleFlags::NONE),
            interceptor: RefCell::new(None),
            chain: RefCell::new(Vec::new()),
            observer_locator,
            locator,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.connectable.id()
    }

    /// A weak handle, for decorators that must not keep the binding alive.
    #[must_use]
    pub fn downgrade(&self) -> Weak<PropertyBinding> {
        self.this.clone()
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> BindingState {
        self.state.get()
    }

    #[inline]
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.state.get() == BindingState::Bound
    }

    #[must_use]
    pub fn mode(&self) -> BindingMode {
        self.mode
    }

    #[must_use]
    pub fn strategy(&self) -> EvaluationStrategy {
        self.strategy
    }

    /// The scope while binding or bound.
    #[must_use]
    pub fn scope(&self) -> Option<Rc<Scope>> {
        self.scope.borrow().clone()
    }

    #[must_use]
    pub fn part(&self) -> Option<Rc<str>> {
        self.part.borrow().clone()
    }

    #[must_use]
    pub fn source_expression(&self) -> Rc<Expression> {
        Rc::clone(&self.source_expression.borrow())
    }

    /// Swap the source expression. Meant for binding behaviors, during
    /// their bind hook.
    pub fn replace_source_expression(&self, expression: impl Into<Rc<Expression>>) {
        *self.source_expression.borrow_mut() = expression.into();
    }

    #[must_use]
    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    #[must_use]
    pub fn target_property(&self) -> &str {
        &self.target_property
    }

    /// The resolved target observer, once the binding has been bound.
    #[must_use]
    pub fn target_observer(&self) -> Option<TargetObserver> {
        self.target_observer.borrow().clone()
    }

    /// Flags re-applied to every read and write while bound.
    #[must_use]
    pub fn persistent_flags(&self) -> LifecycleFlags {
        self.persistent_flags.get()
    }

    #[must_use]
    pub fn locator(&self) -> &Rc<dyn ServiceLocator> {
        &self.locator
    }

    #[must_use]
    pub fn observer_locator(&self) -> &Rc<dyn ObserverLocator> {
        &self.observer_locator
    }

    /// Dependencies recorded by the last connect pass.
    #[must_use]
    pub fn observer_slots(&self) -> usize {
        self.connectable.observer_slots()
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.connectable.version()
    }

    /// Live subscribers of the observer chain, root first.
    #[must_use]
    pub fn chain_subscribers(&self) -> Vec<Rc<ChainSubscriber>> {
        self.chain.borrow().clone()
    }

    #[must_use]
    pub fn chain_len(&self) -> usize {
        self.chain.borrow().len()
    }

    // -----------------------------------------------------------------------
    // Interception
    // -----------------------------------------------------------------------

    /// Route change traffic through `interceptor` instead of the binding.
    pub fn set_interceptor(&self, interceptor: Rc<dyn BindingInterceptor>) {
        *self.interceptor.borrow_mut() = Some(interceptor);
    }

    /// Make the binding its own interceptor again.
    pub fn clear_interceptor(&self) {
        *self.interceptor.borrow_mut() = None;
    }

    /// The current interceptor: the installed decorator, or the binding.
    ///
    /// # Errors
    ///
    /// [`BindingError::Released`] if the binding is being dropped.
    pub fn interceptor(&self) -> Result<Rc<dyn BindingInterceptor>> {
        let custom = self.interceptor.borrow().clone();
        if let Some(custom) = custom {
            return Ok(custom);
        }
        self.this
            .upgrade()
            .map(|binding| binding as Rc<dyn BindingInterceptor>)
            .ok_or(BindingError::Released(self.id()))
    }

    fn listener(&self) -> Result<Rc<dyn Subscriber>> {
        Ok(self.interceptor()?.as_subscriber())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Bind to `scope`: resolve the target, push the initial value and
    /// subscribe to whatever the mode requires.
    ///
    /// Binding again to the same scope is a no-op; binding to another scope
    /// unbinds first.
    ///
    /// # Errors
    ///
    /// Any failure rolls the binding back to [`BindingState::Unbound`].
    pub fn bind(&self, flags: LifecycleFlags, scope: &Rc<Scope>, part: Option<&str>) -> Result<()> {
        let _span = tracing::debug_span!("binding_bind", binding = self.id()).entered();
        match self.state.get() {
            BindingState::Bound => {
                let same_scope = self
                    .scope
                    .borrow()
                    .as_ref()
                    .is_some_and(|current| Rc::ptr_eq(current, scope));
                if same_scope {
                    trace!("already bound to this scope");
                    return Ok(());
                }
                self.interceptor()?.unbind(flags | LifecycleFlags::FROM_BIND)?;
            }
            state @ (BindingState::Binding | BindingState::Unbinding) => {
                trace!(?state, "re-entrant bind ignored");
                return Ok(());
            }
            BindingState::Unbound => {}
        }

        self.state.set(BindingState::Binding);
        let flags = flags | LifecycleFlags::IS_STRICT_BINDING_STRATEGY;
        self.persistent_flags.set(flags.persistent());
        *self.scope.borrow_mut() = Some(Rc::clone(scope));
        *self.part.borrow_mut() = part.map(Rc::from);

        let result = self.run_bind_hook(flags, scope).and_then(|()| match self.strategy {
            EvaluationStrategy::FullExpression => self.bind_full(flags, scope, part),
            EvaluationStrategy::ObserverChain => self.bind_chain(flags),
        });
        if let Err(err) = result {
            debug!(error = %err, "bind failed, rolling back");
            self.abort_bind(flags);
            return Err(err);
        }

        self.state.set(BindingState::Bound);
        debug!(mode = ?self.mode, strategy = ?self.strategy, "bound");
        Ok(())
    }

    fn run_bind_hook(&self, flags: LifecycleFlags, scope: &Scope) -> Result<()> {
        let source = self.source_expression();
        if !source.has_bind() {
            return Ok(());
        }
        source.bind(flags, scope, self.locator.as_ref(), self)?;
        *self.hooked_expression.borrow_mut() = Some(source);
        Ok(())
    }

    fn bind_full(&self, flags: LifecycleFlags, scope: &Scope, part: Option<&str>) -> Result<()> {
        let target = self.ensure_target_observer(flags);
        if !self.mode.is_one_time() {
            target.bind(flags);
            self.target_bound.set(true);
        }

        // A bind hook may have replaced the expression.
        let source = self.source_expression();
        let interceptor = self.interceptor()?;
        if self.mode.pushes_on_bind() {
            let value = source.evaluate(flags, scope, self.locator.as_ref(), part)?;
            interceptor.update_target(value, flags)?;
        }
        if self.mode.to_view() {
            source.connect(
                flags,
                scope,
                self.locator.as_ref(),
                interceptor.as_ref(),
                part,
            )?;
        }
        if self.mode.from_view() {
            let listener = Rc::clone(&interceptor).as_subscriber();
            if let Some(observer) = target.as_observer() {
                observer.subscribe(Rc::clone(&listener));
            }
            *self.target_listener.borrow_mut() = Some(Rc::downgrade(&listener));
            if !self.mode.to_view() {
                interceptor.update_source(target.get_value(), flags)?;
            }
        }
        Ok(())
    }

    fn bind_chain(&self, flags: LifecycleFlags) -> Result<()> {
        let target = self.ensure_target_observer(flags);
        target.bind(flags);
        self.target_bound.set(true);
        self.on_chain_change(None, flags)
    }

    /// Tear down every subscription and leave the scope.
    ///
    /// No-op unless bound.
    ///
    /// # Errors
    ///
    /// Returns the failure of the expression's unbind hook, after the
    /// binding has been fully released anyway.
    pub fn unbind(&self, flags: LifecycleFlags) -> Result<()> {
        if self.state.get() != BindingState::Bound {
            return Ok(());
        }
        let _span = tracing::debug_span!("binding_unbind", binding = self.id()).entered();
        self.state.set(BindingState::Unbinding);
        self.persistent_flags.set(LifecycleFlags::NONE);

        let hook_result = self.run_unbind_hook(flags);
        *self.scope.borrow_mut() = None;
        *self.part.borrow_mut() = None;
        self.release(flags);

        self.state.set(BindingState::Unbound);
        debug!("unbound");
        hook_result
    }

    fn run_unbind_hook(&self, flags: LifecycleFlags) -> Result<()> {
        let hooked = self.hooked_expression.borrow_mut().take();
        let scope = self.scope();
        match (hooked, scope) {
            (Some(expression), Some(scope)) => {
                expression.unbind(flags, &scope, self.locator.as_ref(), self)
            }
            _ => Ok(()),
        }
    }

    fn abort_bind(&self, flags: LifecycleFlags) {
        if let Err(err) = self.run_unbind_hook(flags) {
            debug!(error = %err, "unbind hook failed during rollback");
        }
        self.release(flags);
        *self.scope.borrow_mut() = None;
        *self.part.borrow_mut() = None;
        self.persistent_flags.set(LifecycleFlags::NONE);
        self.state.set(BindingState::Unbound);
    }

    /// Drop every subscription the binding holds.
    fn release(&self, flags: LifecycleFlags) {
        let target = self.target_observer.borrow().clone();
        let listener = self.target_listener.borrow_mut().take();
        if let Some(target) = target {
            if self.target_bound.replace(false) {
                target.unbind(flags);
            }
            let listener = listener.as_ref().and_then(Weak::upgrade);
            if let (Some(listener), Some(observer)) = (listener, target.as_observer()) {
                observer.unsubscribe(&listener);
            }
        }
        self.connectable.unobserve_all();
        self.dispose_chain();
    }

    /// Resolve the target observer on first use; later binds reuse it.
    fn ensure_target_observer(&self, flags: LifecycleFlags) -> TargetObserver {
        let existing = self.target_observer.borrow().clone();
        if let Some(existing) = existing {
            return existing;
        }
        let observer = if self.mode.from_view() {
            TargetObserver::Observer(self.observer_locator.get_observer(
                flags,
                &self.target,
                &self.target_property,
            ))
        } else {
            TargetObserver::Accessor(self.observer_locator.get_accessor(
                flags,
                &self.target,
                &self.target_property,
            ))
        };
        *self.target_observer.borrow_mut() = Some(observer.clone());
        observer
    }

    /// Current value of the target property.
    pub(super) fn target_value(&self) -> Value {
        self.target_observer
            .borrow()
            .as_ref()
            .map(TargetObserver::get_value)
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Change propagation
    // -----------------------------------------------------------------------

    fn on_target_direction(
        &self,
        new_value: &Value,
        flags: LifecycleFlags,
        scope: &Scope,
    ) -> Result<()> {
        if self.strategy == EvaluationStrategy::ObserverChain {
            return self.on_chain_change(None, flags);
        }
        let part = self.part();
        let source = self.source_expression();
        let interceptor = self.interceptor()?;
        let previous = self.target_value();

        // A lone scope access has exactly one possible source of change, so
        // the notified value is the new expression value.
        let trusted =
            source.kind() == ExpressionKind::AccessScope && self.connectable.observer_slots() <= 1;
        let value = if trusted {
            new_value.clone()
        } else {
            source.evaluate(flags, scope, self.locator.as_ref(), part.as_deref())?
        };
        if !value.strict_eq(&previous) {
            interceptor.update_target(value, flags)?;
        }
        // The write may have unbound us through a listener on the target.
        if self.state.get() != BindingState::Bound {
            trace!(binding = self.id(), "unbound during target update, skipping reconnect");
            return Ok(());
        }

        if !self.mode.is_one_time() && !trusted {
            self.connectable.bump_version();
            source.connect(
                flags,
                scope,
                self.locator.as_ref(),
                interceptor.as_ref(),
                part.as_deref(),
            )?;
            interceptor.unobserve(false);
        }
        Ok(())
    }

    fn on_source_direction(
        &self,
        new_value: &Value,
        flags: LifecycleFlags,
        scope: &Scope,
    ) -> Result<()> {
        let part = self.part();
        let current = self.source_expression().evaluate(
            flags,
            scope,
            self.locator.as_ref(),
            part.as_deref(),
        )?;
        if new_value.strict_eq(&current) {
            trace!(binding = self.id(), "source already up to date");
            return Ok(());
        }
        self.interceptor()?.update_source(new_value.clone(), flags)
    }
}

impl Subscriber for PropertyBinding {
    fn handle_change(
        &self,
        new_value: &Value,
        _old_value: &Value,
        flags: LifecycleFlags,
    ) -> Result<()> {
        if self.state.get() != BindingState::Bound {
            trace!(binding = self.id(), state = ?self.state.get(), "change ignored");
            return Ok(());
        }
        let Some(scope) = self.scope() else {
            return Ok(());
        };
        let flags = flags | self.persistent_flags.get();
        if flags.contains(LifecycleFlags::UPDATE_TARGET_INSTANCE) {
            self.on_target_direction(new_value, flags, &scope)
        } else if flags.contains(LifecycleFlags::UPDATE_SOURCE_EXPRESSION) {
            self.on_source_direction(new_value, flags, &scope)
        } else {
            Err(BindingError::MissingDirection {
                binding: self.id(),
                flags,
            })
        }
    }
}

impl BindingInterceptor for PropertyBinding {
    fn observe_property(
        &self,
        flags: LifecycleFlags,
        object: &ObjectRef,
        property: &str,
    ) -> Result<()> {
        if !matches!(self.state.get(), BindingState::Binding | BindingState::Bound) {
            return Ok(());
        }
        let observer = self.observer_locator.get_observer(flags, object, property);
        self.connectable.record_dependency(observer, self.listener()?);
        Ok(())
    }

    fn update_target(&self, value: Value, flags: LifecycleFlags) -> Result<()> {
        let flags = flags | self.persistent_flags.get();
        trace!(binding = self.id(), %value, "update target");
        self.ensure_target_observer(flags).set_value(value, flags)
    }

    fn update_source(&self, value: Value, flags: LifecycleFlags) -> Result<()> {
        let Some(scope) = self.scope() else {
            return Ok(());
        };
        let flags = flags | self.persistent_flags.get();
        trace!(binding = self.id(), %value, "update source");
        let part = self.part();
        self.source_expression().assign(
            flags,
            &scope,
            self.locator.as_ref(),
            value,
            part.as_deref(),
        )
    }

    fn unobserve(&self, all: bool) {
        if all {
            self.connectable.unobserve_all();
        } else if let Some(through) = self.connectable.version().checked_sub(1) {
            self.connectable.unobserve_stale(through);
        }
    }

    fn unbind(&self, flags: LifecycleFlags) -> Result<()> {
        PropertyBinding::unbind(self, flags)
    }

    fn as_subscriber(self: Rc<Self>) -> Rc<dyn Subscriber> {
        self
    }
}

impl Drop for PropertyBinding {
    fn drop(&mut self) {
        if self.state.get() != BindingState::Unbound {
            self.release(LifecycleFlags::FROM_UNBIND);
        }
    }
}

impl std::fmt::Debug for PropertyBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyBinding")
            .field("id", &self.id())
            .field("state", &self.state.get())
            .field("mode", &self.mode)
            .field("strategy", &self.strategy)
            .field("source", &self.source_expression.borrow().to_string())
            .field("target_property", &self.target_property)
            .field("observer_slots", &self.observer_slots())
            .field("chain_len", &self.chain_len())
            .finish()
    }
}
