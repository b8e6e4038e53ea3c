//! Per-priority SLO availability targets.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::error::ConfigError;

/// Prefix of property keys holding availability targets, the priority number follows the prefix.
pub const SLO_TARGET_PREFIX: &str = "slo_availability_target_priority_";

/// Number of priorities used when it is not configured explicitly.
pub const DEFAULT_NUMBER_OF_PRIORITIES: u32 = 3;

/// Immutable table of availability targets, one for each priority in `0..number_of_priorities`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SloTargets {
    targets: BTreeMap<u32, f64>,
}

impl SloTargets {
    /// Creates targets table, fails if some priority has no target or a target is not in `[0, 1]`.
    pub fn new(targets: BTreeMap<u32, f64>, number_of_priorities: u32) -> Result<Self, ConfigError> {
        if number_of_priorities == 0 {
            return Err(ConfigError::NonPositivePriorityCount(0));
        }
        if targets.len() != number_of_priorities as usize {
            return Err(ConfigError::TargetCountMismatch {
                expected: number_of_priorities,
                found: targets.len(),
            });
        }
        if let Some(priority) = (0..number_of_priorities).find(|p| !targets.contains_key(p)) {
            return Err(ConfigError::MissingTarget(priority));
        }
        for (priority, target) in targets.iter() {
            if !target.is_finite() || *target < 0. || *target > 1. {
                return Err(ConfigError::MalformedTarget {
                    key: format!("{}{}", SLO_TARGET_PREFIX, priority),
                    value: target.to_string(),
                });
            }
        }
        Ok(Self { targets })
    }

    /// Reads targets from a properties source.
    ///
    /// Only keys starting with [`SLO_TARGET_PREFIX`] are considered, other keys are ignored.
    pub fn from_properties<I, K, V>(properties: I, number_of_priorities: u32) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut targets = BTreeMap::new();
        for (key, value) in properties {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            let Some(suffix) = key.strip_prefix(SLO_TARGET_PREFIX) else {
                continue;
            };
            let malformed = || ConfigError::MalformedTarget {
                key: key.to_string(),
                value: value.to_string(),
            };
            let priority = suffix.parse::<u32>().map_err(|_| malformed())?;
            let target = value.parse::<f64>().map_err(|_| malformed())?;
            targets.insert(priority, target);
        }
        Self::new(targets, number_of_priorities)
    }

    /// Returns availability target of the priority.
    ///
    /// Priorities outside of the configured range have no SLO, their target is 0.
    pub fn target(&self, priority: u32) -> f64 {
        self.targets.get(&priority).copied().unwrap_or(0.)
    }

    pub fn number_of_priorities(&self) -> u32 {
        self.targets.len() as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.targets.iter().map(|(p, t)| (*p, *t))
    }
}
