//! Total orders over hosts, VMs and capacity-cost quotes.
//!
//! Ordered collections in this crate rely on uniqueness by comparator, so every order here falls through
//! to the entity ID as the last criterion and two distinct entities never compare as equal.
//! Floating-point criteria are compared with `total_cmp`.

use std::cmp::Ordering;

use crate::core::capacity_cost::CapacityCost;
use crate::core::vm::PreemptableVm;

/// Capacity measure of a host taken at the moment of ordering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HostCapacity {
    pub host_id: u32,
    pub mips: f64,
}

impl HostCapacity {
    pub fn new(host_id: u32, mips: f64) -> Self {
        Self { host_id, mips }
    }
}

/// Ascending capacity, then ascending host ID.
pub fn by_available_mips(a: &HostCapacity, b: &HostCapacity) -> Ordering {
    a.mips.total_cmp(&b.mips).then_with(|| a.host_id.cmp(&b.host_id))
}

/// Descending capacity (the most available host first), then ascending host ID.
pub fn by_most_available_mips(a: &HostCapacity, b: &HostCapacity) -> Ordering {
    b.mips.total_cmp(&a.mips).then_with(|| a.host_id.cmp(&b.host_id))
}

/// Ascending capacity, then ascending host ID.
pub fn by_capacity(a: &CapacityCost, b: &CapacityCost) -> Ordering {
    a.capacity()
        .total_cmp(&b.capacity())
        .then_with(|| a.host_id().cmp(&b.host_id()))
}

/// Ascending cost, then ascending capacity, then ascending host ID.
pub fn by_cost(a: &CapacityCost, b: &CapacityCost) -> Ordering {
    a.cost()
        .total_cmp(&b.cost())
        .then_with(|| a.capacity().total_cmp(&b.capacity()))
        .then_with(|| a.host_id().cmp(&b.host_id()))
}

////////////////////////////////////////////////////////////////////////////////

/// Arrival order: ascending priority, then submit time, then VM ID.
#[derive(Clone, Copy, Debug)]
pub struct VmArrivalKey {
    pub priority: u32,
    pub submit_time: f64,
    pub id: u32,
}

impl VmArrivalKey {
    pub fn of(vm: &PreemptableVm) -> Self {
        Self {
            priority: vm.priority,
            submit_time: vm.submit_time,
            id: vm.id,
        }
    }
}

impl Ord for VmArrivalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.submit_time.total_cmp(&other.submit_time))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for VmArrivalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VmArrivalKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VmArrivalKey {}

/// Ascending priority, then ascending current availability, then submit time, then VM ID.
///
/// Within a priority all VMs share the same SLO target, so this is also the order by SLO margin.
#[derive(Clone, Copy, Debug)]
pub struct VmAvailabilityKey {
    pub priority: u32,
    pub availability: f64,
    pub submit_time: f64,
    pub id: u32,
}

impl VmAvailabilityKey {
    pub fn of(vm: &PreemptableVm, time: f64) -> Self {
        Self {
            priority: vm.priority,
            availability: vm.current_availability(time),
            submit_time: vm.submit_time,
            id: vm.id,
        }
    }
}

impl Ord for VmAvailabilityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.availability.total_cmp(&other.availability))
            .then_with(|| self.submit_time.total_cmp(&other.submit_time))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for VmAvailabilityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VmAvailabilityKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VmAvailabilityKey {}

/// Ascending priority, then ascending time to SLO violation, then VM ID.
///
/// Time to violation is `actual_runtime - (time - submit_time) * target`: the runtime the VM received
/// above what its priority's availability target requires. The most urgent VM comes first.
#[derive(Clone, Copy, Debug)]
pub struct VmTtvKey {
    pub priority: u32,
    pub ttv: f64,
    pub id: u32,
}

impl VmTtvKey {
    pub fn of(vm: &PreemptableVm, time: f64, target: f64) -> Self {
        Self {
            priority: vm.priority,
            ttv: time_to_violation(vm, time, target),
            id: vm.id,
        }
    }
}

/// Returns the slack of VM against the availability target at `time`.
pub fn time_to_violation(vm: &PreemptableVm, time: f64, target: f64) -> f64 {
    vm.actual_runtime(time) - (time - vm.submit_time) * target
}

impl Ord for VmTtvKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.ttv.total_cmp(&other.ttv))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for VmTtvKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VmTtvKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VmTtvKey {}
