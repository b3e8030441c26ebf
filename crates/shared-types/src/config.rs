use serde::{Deserialize, Serialize};

use crate::compliance::ResolutionStrategy;

/// What to do with a deadline whose total offset is zero days.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZeroDayPolicy {
    /// The trigger date itself is the deadline, rolled to the next
    /// business day when it is a weekend or holiday.
    #[default]
    RollForward,
    /// The trigger date is returned unchanged even when it is not a
    /// business day.
    AsIs,
}

fn default_memoize_holidays() -> bool {
    true
}

fn default_max_iterations() -> u32 {
    10_000
}

/// Tunables for the deadline engine.
///
/// Loaded from the `[engine]` table of `config.toml`. Every field has a
/// default so a missing or partial file still yields a usable config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub zero_day_policy: ZeroDayPolicy,
    /// Strategy used for detected conflicts that no declared conflict covers.
    #[serde(default)]
    pub default_strategy: ResolutionStrategy,
    #[serde(default = "default_memoize_holidays")]
    pub memoize_holidays: bool,
    /// Upper bound on day-stepping iterations for a single calculation.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            zero_day_policy: ZeroDayPolicy::default(),
            default_strategy: ResolutionStrategy::default(),
            memoize_holidays: default_memoize_holidays(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Top-level config file structure matching `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
}
