//! Implementations of preemption policies.

pub mod capacity_cost_based;
pub mod fcfs;
pub mod slo_aware;
pub mod ttv_based;
pub mod vm_availability_based;
