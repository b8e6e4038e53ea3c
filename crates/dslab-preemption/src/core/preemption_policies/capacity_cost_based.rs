//! Capacity-cost based preemption policy.

use crate::core::error::PolicyError;
use crate::core::preemption_policy::PreemptionPolicy;
use crate::core::priority_usage::PriorityUsage;
use crate::core::rounding::DEFAULT_PRECISION;
use crate::core::vm::{PreemptableVm, VmRef};

const NAME: &str = "CapacityCostBased";

/// Extension point for cost-driven preemption.
///
/// Only capacity bookkeeping (`allocating` / `deallocating`) is implemented,
/// all decisions and queries report [`PolicyError::Unsupported`].
#[derive(Clone)]
pub struct CapacityCostBasedPolicy {
    usage: PriorityUsage,
}

impl CapacityCostBasedPolicy {
    pub fn new(precision: u32) -> Self {
        Self {
            usage: PriorityUsage::new(precision),
        }
    }
}

impl Default for CapacityCostBasedPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PRECISION)
    }
}

impl PreemptionPolicy for CapacityCostBasedPolicy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports_scheduling(&self) -> bool {
        false
    }

    fn usage(&self) -> &PriorityUsage {
        &self.usage
    }

    fn usage_mut(&mut self) -> &mut PriorityUsage {
        &mut self.usage
    }

    fn is_suitable_for(&self, _vm: &PreemptableVm, _time: f64) -> Result<bool, PolicyError> {
        Err(PolicyError::unsupported(NAME, "is_suitable_for"))
    }

    fn next_vm_for_preempting(&mut self, _time: f64) -> Result<Option<VmRef>, PolicyError> {
        Err(PolicyError::unsupported(NAME, "next_vm_for_preempting"))
    }

    fn sort_vms(&self, _vms: &[VmRef], _time: f64) -> Result<Vec<VmRef>, PolicyError> {
        Err(PolicyError::unsupported(NAME, "sort_vms"))
    }

    fn get_available_mips_by_priority(&self, _priority: u32) -> Result<f64, PolicyError> {
        Err(PolicyError::unsupported(NAME, "get_available_mips_by_priority"))
    }
}
