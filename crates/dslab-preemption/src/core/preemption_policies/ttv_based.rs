//! Time-to-violation aware preemption policy.

use log::trace;

use crate::core::comparators::VmTtvKey;
use crate::core::error::PolicyError;
use crate::core::preemption_policies::slo_aware::SloAwareUsage;
use crate::core::preemption_policy::{sorted_by_key, PreemptionPolicy};
use crate::core::priority_usage::PriorityUsage;
use crate::core::slo::SloTargets;
use crate::core::vm::{PreemptableVm, VmRef};

/// Sorted view of running VMs computed at some simulation time.
#[derive(Clone, Default)]
struct SortedViewCache {
    time: Option<f64>,
    view: Vec<VmRef>,
}

impl SortedViewCache {
    fn is_valid_at(&self, time: f64) -> bool {
        self.time == Some(time)
    }

    fn invalidate(&mut self) {
        self.time = None;
        self.view.clear();
    }
}

/// Ranks VMs by priority and their predicted time to SLO violation
/// `actual_runtime - (time - submit_time) * target`.
///
/// Admission follows [`VmAvailabilityBasedPolicy`](super::vm_availability_based::VmAvailabilityBasedPolicy).
/// The eviction candidate is the VM of the least privileged priority with the largest slack.
/// The sorted view of running VMs is cached until the simulation time advances or the set of running VMs changes.
#[derive(Clone)]
pub struct TtvBasedPolicy {
    slo: SloAwareUsage,
    cache: SortedViewCache,
}

impl TtvBasedPolicy {
    pub fn new(targets: SloTargets, precision: u32) -> Self {
        Self {
            slo: SloAwareUsage::new(targets, precision),
            cache: SortedViewCache::default(),
        }
    }

    pub fn targets(&self) -> &SloTargets {
        &self.slo.targets
    }

    fn key(&self, vm: &PreemptableVm, time: f64) -> VmTtvKey {
        VmTtvKey::of(vm, time, self.slo.targets.target(vm.priority))
    }

    /// Returns running VMs ordered by priority and time to violation.
    pub fn sorted_running_vms(&mut self, time: f64) -> &[VmRef] {
        if !self.cache.is_valid_at(time) {
            trace!(
                "[{:.3} host{}] recomputing TTV order of {} running VMs",
                time,
                self.slo.usage.host_id().unwrap_or_default(),
                self.slo.usage.vm_count()
            );
            let running: Vec<VmRef> = self.slo.usage.all_running().cloned().collect();
            self.cache.view = sorted_by_key(&running, |vm| self.key(vm, time));
            self.cache.time = Some(time);
        }
        &self.cache.view
    }

    /// Returns the time of the cached sorted view, if it is valid.
    pub fn cached_at(&self) -> Option<f64> {
        self.cache.time
    }
}

impl PreemptionPolicy for TtvBasedPolicy {
    fn name(&self) -> &'static str {
        "TTVBased"
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
        // view is ordered by ascending priority, so its tail belongs to the least privileged priority
        Ok(self.sorted_running_vms(time).last().cloned())
    }

    fn sort_vms(&self, vms: &[VmRef], time: f64) -> Result<Vec<VmRef>, PolicyError> {
        Ok(sorted_by_key(vms, |vm| self.key(vm, time)))
    }

    fn get_available_mips_by_priority_and_availability(&self, priority: u32, time: f64) -> Result<f64, PolicyError> {
        Ok(self.slo.available_mips_by_priority_and_availability(priority, time))
    }

    fn get_available_mips_by_vm(&self, vm: &PreemptableVm, time: f64) -> Result<f64, PolicyError> {
        Ok(self.slo.available_mips_by_vm(vm, time))
    }

    fn allocating(&mut self, vm: &VmRef) {
        if self.slo.usage.allocating(vm) {
            self.cache.invalidate();
        }
    }

    fn deallocating(&mut self, vm: &VmRef) {
        if self.slo.usage.deallocating(vm) {
            self.cache.invalidate();
        }
    }
}
