//! Priority-only preemption policy.

use crate::core::comparators::VmArrivalKey;
use crate::core::error::PolicyError;
use crate::core::preemption_policy::{sorted_by_key, PreemptionPolicy};
use crate::core::priority_usage::PriorityUsage;
use crate::core::rounding::DEFAULT_PRECISION;
use crate::core::vm::{PreemptableVm, VmRef};

/// Admits VM if the capacity available to its priority covers the VM request.
///
/// VMs are served in arrival order within a priority. The eviction candidate is the most recently
/// submitted VM of the least privileged priority, which minimizes the preempted work.
#[derive(Clone)]
pub struct FcfsPolicy {
    usage: PriorityUsage,
}

impl FcfsPolicy {
    pub fn new(precision: u32) -> Self {
        Self {
            usage: PriorityUsage::new(precision),
        }
    }
}

impl Default for FcfsPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PRECISION)
    }
}

impl PreemptionPolicy for FcfsPolicy {
    fn name(&self) -> &'static str {
        "FCFS"
    }

    fn usage(&self) -> &PriorityUsage {
        &self.usage
    }

    fn usage_mut(&mut self) -> &mut PriorityUsage {
        &mut self.usage
    }

    fn is_suitable_for(&self, vm: &PreemptableVm, _time: f64) -> Result<bool, PolicyError> {
        Ok(self.usage.available_mips_by_priority(vm.priority) >= self.usage.round(vm.mips))
    }

    fn next_vm_for_preempting(&mut self, _time: f64) -> Result<Option<VmRef>, PolicyError> {
        Ok(self
            .usage
            .lowest_privilege_priority()
            .and_then(|priority| self.usage.running(priority).next_back().cloned()))
    }

    fn sort_vms(&self, vms: &[VmRef], _time: f64) -> Result<Vec<VmRef>, PolicyError> {
        Ok(sorted_by_key(vms, VmArrivalKey::of))
    }
}
