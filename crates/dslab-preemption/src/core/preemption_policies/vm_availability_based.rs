//! SLO availability aware preemption policy.

use crate::core::comparators::VmAvailabilityKey;
use crate::core::error::PolicyError;
use crate::core::preemption_policies::slo_aware::SloAwareUsage;
use crate::core::preemption_policy::{sorted_by_key, PreemptionPolicy};
use crate::core::priority_usage::PriorityUsage;
use crate::core::slo::SloTargets;
use crate::core::vm::{PreemptableVm, VmRef};

/// Admits VM if the capacity available to its priority, together with the capacity of same-priority VMs
/// having more slack against the SLO target, covers the VM request.
///
/// VMs are ordered by priority, current availability, submit time and ID, all ascending. The eviction candidate
/// is the last VM of the least privileged priority in this order: the one running furthest above the target,
/// and among VMs with equal availability the latest submitted one. The order is recomputed on every request.
#[derive(Clone)]
pub struct VmAvailabilityBasedPolicy {
    slo: SloAwareUsage,
}

impl VmAvailabilityBasedPolicy {
    pub fn new(targets: SloTargets, precision: u32) -> Self {
        Self {
            slo: SloAwareUsage::new(targets, precision),
        }
    }

    pub fn targets(&self) -> &SloTargets {
        &self.slo.targets
    }

    /// Returns capacity of VMs running above the target which can be lent to `vm`.
    pub fn mips_to_be_available(&self, vm: &PreemptableVm, time: f64) -> f64 {
        self.slo.mips_to_be_available(vm, time)
    }
}

impl PreemptionPolicy for VmAvailabilityBasedPolicy {
    fn name(&self) -> &'static str {
        "VmAvailabilityBased"
    }

    fn supports_vm_capacity(&self) -> bool {
        true
    }

    fn usage(&self) -> &PriorityUsage {
        &self.slo.usage
    }

    fn usage_mut(&mut self) -> &mut PriorityUsage {
        &mut self.slo.usage
    }

    fn is_suitable_for(&self, vm: &PreemptableVm, time: f64) -> Result<bool, PolicyError> {
        Ok(self.slo.is_suitable_for(vm, time))
    }

    fn next_vm_for_preempting(&mut self, time: f64) -> Result<Option<VmRef>, PolicyError> {
        let Some(priority) = self.slo.usage.lowest_privilege_priority() else {
            return Ok(None);
        };
        Ok(self
            .slo
            .usage
            .running(priority)
            .max_by_key(|vm| VmAvailabilityKey::of(&vm.borrow(), time))
            .cloned())
    }

    fn sort_vms(&self, vms: &[VmRef], time: f64) -> Result<Vec<VmRef>, PolicyError> {
        Ok(sorted_by_key(vms, |vm| VmAvailabilityKey::of(vm, time)))
    }

    fn get_available_mips_by_priority_and_availability(&self, priority: u32, time: f64) -> Result<f64, PolicyError> {
        Ok(self.slo.available_mips_by_priority_and_availability(priority, time))
    }

    fn get_available_mips_by_vm(&self, vm: &PreemptableVm, time: f64) -> Result<f64, PolicyError> {
        Ok(self.slo.available_mips_by_vm(vm, time))
    }
}
