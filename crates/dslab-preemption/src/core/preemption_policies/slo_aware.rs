//! Capacity accounting aware of SLO availability targets.

use crate::core::priority_usage::PriorityUsage;
use crate::core::slo::SloTargets;
use crate::core::vm::PreemptableVm;

/// Priority usage combined with availability targets.
///
/// The margin of a VM is its current availability minus the target of its priority.
/// VMs with a positive margin run above their target and their capacity can be lent to other VMs of the same
/// priority.
#[derive(Clone)]
pub struct SloAwareUsage {
    pub usage: PriorityUsage,
    pub targets: SloTargets,
}

impl SloAwareUsage {
    pub fn new(targets: SloTargets, precision: u32) -> Self {
        Self {
            usage: PriorityUsage::new(precision),
            targets,
        }
    }

    pub fn margin(&self, vm: &PreemptableVm, time: f64) -> f64 {
        vm.current_availability(time) - self.targets.target(vm.priority)
    }

    /// Returns capacity of running VMs of the same priority which have a positive margin exceeding the margin of
    /// `vm`. VM which already meets its target can't borrow capacity.
    pub fn mips_to_be_available(&self, vm: &PreemptableVm, time: f64) -> f64 {
        let margin = self.margin(vm, time);
        if margin >= 0. {
            return 0.;
        }
        let mips: f64 = self
            .usage
            .running(vm.priority)
            .map(|other| other.borrow())
            .filter(|other| other.id != vm.id && self.margin(other, time) > margin.max(0.))
            .map(|other| other.mips)
            .sum();
        self.usage.round(mips)
    }

    /// Returns capacity available to the priority plus capacity of its VMs running above the target.
    pub fn available_mips_by_priority_and_availability(&self, priority: u32, time: f64) -> f64 {
        let mips: f64 = self
            .usage
            .running(priority)
            .map(|vm| vm.borrow())
            .filter(|vm| self.margin(vm, time) > 0.)
            .map(|vm| vm.mips)
            .sum();
        self.usage
            .round(self.usage.available_mips_by_priority(priority) + mips)
    }

    pub fn available_mips_by_vm(&self, vm: &PreemptableVm, time: f64) -> f64 {
        self.usage
            .round(self.usage.available_mips_by_priority(vm.priority) + self.mips_to_be_available(vm, time))
    }

    pub fn is_suitable_for(&self, vm: &PreemptableVm, time: f64) -> bool {
        self.available_mips_by_vm(vm, time) >= self.usage.round(vm.mips)
    }
}
