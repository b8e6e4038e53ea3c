//! Errors reported by policies and configuration.

use thiserror::Error;

/// Failures of policy operations.
///
/// Empty outcomes (no suitable host, no eviction candidate) are not errors and are returned as `None`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    /// The strategy does not model the requested operation.
    #[error("operation {operation} is not supported by {policy} policy")]
    Unsupported {
        policy: &'static str,
        operation: &'static str,
    },
    /// Host selection was invoked without a VM, which is a caller defect.
    #[error("VM is required for host selection")]
    MissingVm,
    /// The referenced host is not known.
    #[error("unknown host {0}")]
    UnknownHost(u32),
    /// The referenced VM is not known.
    #[error("unknown VM {0}")]
    UnknownVm(u32),
    /// A host with the same ID is already added.
    #[error("host {0} already exists")]
    DuplicateHost(u32),
    /// A VM with the same ID is already submitted.
    #[error("VM {0} already exists")]
    DuplicateVm(u32),
}

impl PolicyError {
    pub(crate) fn unsupported(policy: &'static str, operation: &'static str) -> Self {
        PolicyError::Unsupported { policy, operation }
    }
}

/// Failures of configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("number of priorities must be positive, got {0}")]
    NonPositivePriorityCount(i64),
    #[error("expected {expected} SLO availability targets, found {found}")]
    TargetCountMismatch { expected: u32, found: usize },
    #[error("malformed SLO availability target {key} = {value}")]
    MalformedTarget { key: String, value: String },
    #[error("missing SLO availability target for priority {0}")]
    MissingTarget(u32),
    #[error("decimal precision must not exceed {max}, got {value}")]
    PrecisionOutOfRange { value: u32, max: u32 },
    #[error("unknown policy: {0}")]
    UnknownPolicy(String),
    #[error("{host_selection} host selection policy can't be used with {preemption} preemption policy")]
    IncompatiblePolicies {
        preemption: String,
        host_selection: String,
    },
    #[error("can't read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("can't parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
