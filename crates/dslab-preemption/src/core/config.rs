//! Preemption engine configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::core::error::ConfigError;
use crate::core::rounding::{DEFAULT_PRECISION, MAX_PRECISION};
use crate::core::slo::{SloTargets, DEFAULT_NUMBER_OF_PRIORITIES, SLO_TARGET_PREFIX};

/// Holds raw config parsed from YAML file.
///
/// Keys not matching the named fields (e.g. availability targets) are collected as properties.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawPreemptionConfig {
    pub number_of_priorities: Option<i64>,
    pub decimal_precision: Option<u32>,
    pub preemption_policy: Option<String>,
    pub host_selection_policy: Option<String>,
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

/// Represents preemption engine configuration.
#[derive(Debug, PartialEq, Clone)]
pub struct PreemptionConfig {
    /// Number of priority levels, priorities are numbered from 0 (the most privileged).
    pub number_of_priorities: u32,
    /// Number of decimal digits kept by capacity values, at most [`MAX_PRECISION`].
    pub decimal_precision: u32,
    /// Preemption policy owned by every host.
    pub preemption_policy: String,
    /// Policy selecting a host for an arriving VM.
    pub host_selection_policy: String,
    /// Availability targets, present if any `slo_availability_target_priority_<n>` key is set.
    pub slo_targets: Option<SloTargets>,
}

impl Default for PreemptionConfig {
    fn default() -> Self {
        Self {
            number_of_priorities: DEFAULT_NUMBER_OF_PRIORITIES,
            decimal_precision: DEFAULT_PRECISION,
            preemption_policy: "FCFS".to_string(),
            host_selection_policy: "WorstFit".to_string(),
            slo_targets: None,
        }
    }
}

impl PreemptionConfig {
    /// Creates config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(file_name).map_err(|source| ConfigError::Io {
            path: file_name.to_string(),
            source,
        })?;
        Self::from_yaml(&data)
    }

    /// Creates config from YAML string, validating the availability targets.
    pub fn from_yaml(data: &str) -> Result<Self, ConfigError> {
        let raw: RawPreemptionConfig = serde_yaml::from_str(data)?;

        let number_of_priorities = raw.number_of_priorities.unwrap_or(DEFAULT_NUMBER_OF_PRIORITIES as i64);
        if number_of_priorities <= 0 || number_of_priorities > u32::MAX as i64 {
            return Err(ConfigError::NonPositivePriorityCount(number_of_priorities));
        }
        let number_of_priorities = number_of_priorities as u32;

        let decimal_precision = raw.decimal_precision.unwrap_or(DEFAULT_PRECISION);
        if decimal_precision > MAX_PRECISION {
            return Err(ConfigError::PrecisionOutOfRange {
                value: decimal_precision,
                max: MAX_PRECISION,
            });
        }

        let mut targets = BTreeMap::new();
        for (key, value) in raw.properties.iter() {
            if !key.starts_with(SLO_TARGET_PREFIX) {
                continue;
            }
            let value = match value {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.clone(),
                other => {
                    return Err(ConfigError::MalformedTarget {
                        key: key.clone(),
                        value: format!("{:?}", other),
                    })
                }
            };
            targets.insert(key.clone(), value);
        }
        let slo_targets = if targets.is_empty() {
            None
        } else {
            Some(SloTargets::from_properties(targets, number_of_priorities)?)
        };

        Ok(Self {
            number_of_priorities,
            decimal_precision,
            preemption_policy: raw.preemption_policy.unwrap_or_else(|| "FCFS".to_string()),
            host_selection_policy: raw.host_selection_policy.unwrap_or_else(|| "WorstFit".to_string()),
            slo_targets,
        })
    }

    /// Returns availability targets, fails if they are not configured.
    pub fn require_slo_targets(&self) -> Result<SloTargets, ConfigError> {
        self.slo_targets.clone().ok_or(ConfigError::TargetCountMismatch {
            expected: self.number_of_priorities,
            found: 0,
        })
    }
}
