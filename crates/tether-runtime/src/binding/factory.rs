#![forbid(unsafe_code)]

use std::rc::Rc;

use tether_core::{BindingMode, ObjectRef};

use super::{EvaluationStrategy, PropertyBinding};
use crate::ast::Expression;
use crate::config::BindingConfig;
use crate::observation::ObserverLocator;
use crate::resources::ServiceLocator;

/// Creates bindings sharing one pair of locators and one configuration.
#[derive(Clone)]
pub struct BindingFactory {
    observer_locator: Rc<dyn ObserverLocator>,
    locator: Rc<dyn ServiceLocator>,
    config: BindingConfig,
}

impl BindingFactory {
    #[must_use]
    pub fn new(observer_locator: Rc<dyn ObserverLocator>, locator: Rc<dyn ServiceLocator>) -> Self {
        Self::with_config(observer_locator, locator, BindingConfig::default())
    }

    #[must_use]
    pub fn with_config(
        observer_locator: Rc<dyn ObserverLocator>,
        locator: Rc<dyn ServiceLocator>,
        config: BindingConfig,
    ) -> Self {
        Self {
            observer_locator,
            locator,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// The strategy a binding of `source` in `mode` would get.
    #[must_use]
    pub fn strategy_for(&self, source: &Expression, mode: BindingMode) -> EvaluationStrategy {
        if self.config.chain_optimization {
            EvaluationStrategy::select(source, mode)
        } else {
            EvaluationStrategy::FullExpression
        }
    }

    /// A new, unbound binding of `target.target_property` to `source`.
    pub fn property(
        &self,
        source: impl Into<Rc<Expression>>,
        target: &ObjectRef,
        target_property: &str,
        mode: BindingMode,
    ) -> Rc<PropertyBinding> {
        let source = source.into();
        let strategy = self.strategy_for(&source, mode);
        tracing::trace!(%source, ?mode, ?strategy, "creating property binding");
        PropertyBinding::with_strategy(
            source,
            target,
            target_property,
            mode,
            strategy,
            Rc::clone(&self.observer_locator),
            Rc::clone(&self.locator),
        )
    }
}

impl std::fmt::Debug for BindingFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingFactory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::DefaultObserverLocator;
    use crate::resources::ResourceRegistry;

    fn factory(config: BindingConfig) -> BindingFactory {
        BindingFactory::with_config(
            Rc::new(DefaultObserverLocator::new()),
            Rc::new(ResourceRegistry::new()),
            config,
        )
    }

    #[test]
    fn chain_strategy_follows_config() {
        let target = ObjectRef::new();
        let on = factory(BindingConfig::default());
        let off = factory(BindingConfig::default().with_chain_optimization(false));

        let fast = on.property(Expression::path("a.b"), &target, "value", BindingMode::ToView);
        let slow = off.property(Expression::path("a.b"), &target, "value", BindingMode::ToView);
        assert_eq!(fast.strategy(), EvaluationStrategy::ObserverChain);
        assert_eq!(slow.strategy(), EvaluationStrategy::FullExpression);
    }
}
