//! DbMap configuration.

use serde::{Deserialize, Serialize};

/// Configuration for [`DbMap`](crate::DbMap) behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbMapConfig {
    /// Log every statement at `debug` instead of `trace`.
    pub log_statements: bool,
    /// Include bound parameter values in statement logs.
    pub log_params: bool,
}

impl DbMapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log statements at `debug`.
    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Include parameter values in statement logs.
    pub fn log_params(mut self, enabled: bool) -> Self {
        self.log_params = enabled;
        self
    }
}
