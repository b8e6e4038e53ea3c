//! Preemption policies.

use dyn_clone::{clone_trait_object, DynClone};
use log::trace;

use crate::core::capacity_cost::CapacityCost;
use crate::core::config::PreemptionConfig;
use crate::core::error::{ConfigError, PolicyError};
use crate::core::preemption_policies::capacity_cost_based::CapacityCostBasedPolicy;
use crate::core::preemption_policies::fcfs::FcfsPolicy;
use crate::core::preemption_policies::ttv_based::TtvBasedPolicy;
use crate::core::preemption_policies::vm_availability_based::VmAvailabilityBasedPolicy;
use crate::core::priority_usage::{HostSpec, PriorityUsage};
use crate::core::vm::{PreemptableVm, VmRef};

/// Trait for implementation of preemption policies.
///
/// Each host owns exactly one policy instance. The policy tracks capacity used by running VMs of each priority,
/// decides whether a VM can be admitted without further eviction and proposes the VM to evict when capacity
/// must be reclaimed. Operations which are not modeled by a strategy return [`PolicyError::Unsupported`].
///
/// Policies implement `DynClone`, so a configured prototype can be cloned for every host.
pub trait PreemptionPolicy: DynClone {
    /// Returns the policy name used in configs, logs and errors.
    fn name(&self) -> &'static str;

    /// Returns the shared capacity accounting.
    fn usage(&self) -> &PriorityUsage;

    fn usage_mut(&mut self) -> &mut PriorityUsage;

    /// Returns whether `vm` can be admitted at `time` without further eviction.
    fn is_suitable_for(&self, vm: &PreemptableVm, time: f64) -> Result<bool, PolicyError>;

    /// Returns the best eviction candidate, or `None` if there is no running VM to evict.
    ///
    /// Candidates are taken from the least privileged priority having running VMs.
    fn next_vm_for_preempting(&mut self, time: f64) -> Result<Option<VmRef>, PolicyError>;

    /// Returns VMs ordered according to the strategy (e.g. the service order of a waiting queue).
    fn sort_vms(&self, vms: &[VmRef], time: f64) -> Result<Vec<VmRef>, PolicyError>;

    /// Returns whether the policy decides admission and eviction, so that hosts owning it can be scheduled.
    fn supports_scheduling(&self) -> bool {
        true
    }

    /// Returns whether [`get_available_mips_by_vm`](Self::get_available_mips_by_vm) is modeled.
    fn supports_vm_capacity(&self) -> bool {
        false
    }

    /// Returns total capacity minus capacity used by the priority and all more privileged priorities.
    fn get_available_mips_by_priority(&self, priority: u32) -> Result<f64, PolicyError> {
        Ok(self.usage().available_mips_by_priority(priority))
    }

    /// Returns capacity available to the priority including capacity of VMs running above their SLO target.
    fn get_available_mips_by_priority_and_availability(&self, _priority: u32, _time: f64) -> Result<f64, PolicyError> {
        Err(PolicyError::unsupported(
            self.name(),
            "get_available_mips_by_priority_and_availability",
        ))
    }

    /// Returns capacity which would be available to the specified VM.
    fn get_available_mips_by_vm(&self, _vm: &PreemptableVm, _time: f64) -> Result<f64, PolicyError> {
        Err(PolicyError::unsupported(self.name(), "get_available_mips_by_vm"))
    }

    /// Returns capacity-cost quotes for a requested capacity range.
    fn get_capacity_costs(&self, _min_capacity: f64, _max_capacity: f64) -> Result<Vec<CapacityCost>, PolicyError> {
        Err(PolicyError::unsupported(self.name(), "get_capacity_costs"))
    }

    fn host(&self) -> Option<HostSpec> {
        self.usage().host()
    }

    /// Attaches the policy to its owning host.
    fn set_host(&mut self, host: HostSpec) {
        self.usage_mut().set_host(host);
    }

    /// Records VM admitted on the host. Repeated calls for the same VM are ignored.
    fn allocating(&mut self, vm: &VmRef) {
        if self.usage_mut().allocating(vm) {
            let vm = vm.borrow();
            trace!(
                "[host{}] allocating VM {} (priority {}, {} mips), in use: {}",
                self.usage().host_id().unwrap_or_default(),
                vm.id,
                vm.priority,
                vm.mips,
                self.usage().in_use(vm.priority)
            );
        }
    }

    /// Removes VM from the host. Calls for VMs which are not recorded are ignored.
    fn deallocating(&mut self, vm: &VmRef) {
        if self.usage_mut().deallocating(vm) {
            let vm = vm.borrow();
            trace!(
                "[host{}] deallocating VM {} (priority {}, {} mips), in use: {}",
                self.usage().host_id().unwrap_or_default(),
                vm.id,
                vm.priority,
                vm.mips,
                self.usage().in_use(vm.priority)
            );
        }
    }

    /// Returns capacity used by all running VMs.
    fn used_mips(&self) -> f64 {
        self.usage().used_mips()
    }

    fn used_mips_by_priority(&self, priority: u32) -> f64 {
        self.usage().in_use(priority)
    }
}

clone_trait_object!(PreemptionPolicy);

/// Returns VMs ordered by a key computed once per VM.
pub(crate) fn sorted_by_key<K: Ord>(vms: &[VmRef], key: impl Fn(&PreemptableVm) -> K) -> Vec<VmRef> {
    let mut sorted = vms.to_vec();
    sorted.sort_by_cached_key(|vm| key(&*vm.borrow()));
    sorted
}

/// Creates preemption policy specified by `preemption_policy` config option.
///
/// SLO-aware policies require availability targets to be configured.
pub fn preemption_policy_resolver(config: &PreemptionConfig) -> Result<Box<dyn PreemptionPolicy>, ConfigError> {
    let precision = config.decimal_precision;
    match config.preemption_policy.as_str() {
        "FCFS" => Ok(Box::new(FcfsPolicy::new(precision))),
        "VmAvailabilityBased" => Ok(Box::new(VmAvailabilityBasedPolicy::new(
            config.require_slo_targets()?,
            precision,
        ))),
        "TTVBased" => Ok(Box::new(TtvBasedPolicy::new(config.require_slo_targets()?, precision))),
        "CapacityCostBased" => Ok(Box::new(CapacityCostBasedPolicy::new(precision))),
        other => Err(ConfigError::UnknownPolicy(other.to_string())),
    }
}
