//! Policies, comparators and entities of the preemption engine.

pub mod capacity_cost;
pub mod comparators;
pub mod config;
pub mod error;
pub mod host;
pub mod host_selection_policies;
pub mod host_selection_policy;
pub mod monitoring;
pub mod preemption_policies;
pub mod preemption_policy;
pub mod priority_usage;
pub mod rounding;
pub mod slo;
pub mod vm;
