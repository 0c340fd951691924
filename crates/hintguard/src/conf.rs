//! Checking configuration.
//!
//! A [`CheckConf`] is an opaque bundle of flags threaded through reduction and
//! code generation. Build it with the builder methods, starting from
//! [`CheckConf::new`] (sampling strategy, no numeric tower, color autodetected).

use std::env;

use strum::{Display, EnumString};

/// How deeply container contents are checked.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, serde::Serialize, serde::Deserialize,
)]
pub enum CheckStrategy {
    /// No checking: decoration returns the original callable.
    O0,
    /// Constant-time checking: one pseudo-randomly sampled item per container.
    #[default]
    O1,
    /// Linear-time checking: every item of every container.
    On,
}

/// Configuration consumed by the decorator and the one-off check functions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CheckConf {
    /// Container checking strategy.
    pub strategy: CheckStrategy,
    /// When true, `float` also accepts `int` and `complex` also accepts `float` and `int`.
    pub is_pep484_tower: bool,
    /// ANSI color in violation messages; `None` autodetects from the environment.
    pub is_color: Option<bool>,
}

impl CheckConf {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the container checking strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: CheckStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enables or disables the implicit numeric tower.
    #[must_use]
    pub fn pep484_tower(mut self, enabled: bool) -> Self {
        self.is_pep484_tower = enabled;
        self
    }

    /// Forces color on or off in violation messages.
    #[must_use]
    pub fn color(mut self, enabled: bool) -> Self {
        self.is_color = Some(enabled);
        self
    }

    /// Resolves the color flag, consulting `NO_COLOR` and `FORCE_COLOR` when unset.
    #[must_use]
    pub fn use_color(&self) -> bool {
        match self.is_color {
            Some(enabled) => enabled,
            None => env::var_os("NO_COLOR").is_none() && env::var_os("FORCE_COLOR").is_some(),
        }
    }
}
