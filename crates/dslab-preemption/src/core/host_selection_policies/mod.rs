//! Implementations of host selection policies.

pub mod worst_fit;
pub mod worst_fit_availability_aware;
pub mod worst_fit_priority_based;
