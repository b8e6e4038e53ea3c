//! Capacity and cost quoted by a host for a requested capacity range.

use serde::Serialize;

/// Immutable quote: capacity a host can provide, cost of providing it and the quoting host.
///
/// Orders over quotes are [`by_capacity`](crate::core::comparators::by_capacity) and
/// [`by_cost`](crate::core::comparators::by_cost).
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CapacityCost {
    capacity: f64,
    cost: f64,
    host_id: u32,
}

impl CapacityCost {
    pub fn new(capacity: f64, cost: f64, host_id: u32) -> Self {
        Self {
            capacity,
            cost,
            host_id,
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn host_id(&self) -> u32 {
        self.host_id
    }
}
