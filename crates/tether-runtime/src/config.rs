#![forbid(unsafe_code)]

//! Engine configuration.

use std::env;

/// Environment variable toggling the observer-chain fast path.
pub const CHAIN_OPTIMIZATION_ENV: &str = "TETHER_CHAIN_OPTIMIZATION";

/// Settings applied by [`BindingFactory`](crate::binding::BindingFactory).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingConfig {
    /// Use the observer-chain strategy for to-view member chains.
    pub chain_optimization: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            chain_optimization: true,
        }
    }
}

impl BindingConfig {
    /// Read settings from the environment (`TETHER_CHAIN_OPTIMIZATION`).
    #[must_use]
    pub fn from_env() -> Self {
        let raw = env::var(CHAIN_OPTIMIZATION_ENV).ok();
        Self::from_env_value(raw.as_deref())
    }

    #[must_use]
    pub fn with_chain_optimization(mut self, enabled: bool) -> Self {
        self.chain_optimization = enabled;
        self
    }

    fn from_env_value(chain_optimization: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = chain_optimization {
            match parse_toggle(raw) {
                Some(enabled) => config.chain_optimization = enabled,
                None => tracing::warn!(
                    variable = CHAIN_OPTIMIZATION_ENV,
                    value = raw,
                    "unrecognized toggle, keeping default"
                ),
            }
        }
        config
    }
}

fn parse_toggle(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
