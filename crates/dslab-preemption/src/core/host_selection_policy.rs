//! Host selection policies.

use log::{debug, trace};

use crate::core::comparators::by_most_available_mips;
use crate::core::config::PreemptionConfig;
use crate::core::error::{ConfigError, PolicyError};
use crate::core::host::HostRef;
use crate::core::host_selection_policies::worst_fit::WorstFit;
use crate::core::host_selection_policies::worst_fit_availability_aware::WorstFitAvailabilityAware;
use crate::core::host_selection_policies::worst_fit_priority_based::WorstFitPriorityBased;
use crate::core::preemption_policy::PreemptionPolicy;
use crate::core::vm::PreemptableVm;

/// Trait for implementation of host selection policies.
///
/// The policy returns a host for the arriving VM or `None` if no host is suitable.
/// All policies use [`Host::is_suitable_for_vm`](crate::core::host::Host::is_suitable_for_vm) as the admission
/// check and differ only in the order in which candidates are checked.
pub trait HostSelectionPolicy {
    fn name(&self) -> &'static str;

    /// Selects host for `vm` among `hosts` (ordered by the caller) or among the hosts added to the policy.
    ///
    /// Fails with [`PolicyError::MissingVm`] if `vm` is not passed.
    fn select(
        &mut self,
        hosts: &[HostRef],
        vm: Option<&PreemptableVm>,
        time: f64,
    ) -> Result<Option<HostRef>, PolicyError>;

    /// Returns whether candidates are ranked by capacity available to the specific VM,
    /// which requires host policies supporting such queries.
    fn requires_vm_capacity(&self) -> bool {
        false
    }

    /// Adds host to the candidates pool.
    fn add_host(&mut self, host: HostRef);

    /// Removes host from the candidates pool.
    fn remove_host(&mut self, host_id: u32);
}

/// Returns the first host in `candidates` which is suitable for `vm`.
pub(crate) fn first_suitable<'a>(
    candidates: impl IntoIterator<Item = &'a HostRef>,
    vm: &PreemptableVm,
    time: f64,
    policy: &str,
) -> Result<Option<HostRef>, PolicyError> {
    for host in candidates {
        let suitable = host.borrow().is_suitable_for_vm(vm, time)?;
        trace!(
            "[{:.3} {}] host{} suitable for VM {}: {}",
            time,
            policy,
            host.borrow().id,
            vm.id,
            suitable
        );
        if suitable {
            debug!("[{:.3} {}] selected host{} for VM {}", time, policy, host.borrow().id, vm.id);
            return Ok(Some(host.clone()));
        }
    }
    debug!("[{:.3} {}] no suitable host for VM {}", time, policy, vm.id);
    Ok(None)
}

/// Returns hosts ordered from the most to the least available raw capacity, ties broken by host ID.
pub fn sorted_by_most_available_mips(hosts: &[HostRef]) -> Vec<HostRef> {
    let mut sorted = hosts.to_vec();
    sorted.sort_by(|a, b| by_most_available_mips(&a.borrow().available_capacity(), &b.borrow().available_capacity()));
    sorted
}

/// Creates host selection policy specified by `host_selection_policy` config option.
pub fn host_selection_policy_resolver(config: &PreemptionConfig) -> Result<Box<dyn HostSelectionPolicy>, ConfigError> {
    match config.host_selection_policy.as_str() {
        "WorstFit" => Ok(Box::new(WorstFit::new())),
        "WorstFitPriorityBased" => Ok(Box::new(WorstFitPriorityBased::new())),
        "WorstFitAvailabilityAware" => Ok(Box::new(WorstFitAvailabilityAware::new())),
        other => Err(ConfigError::UnknownPolicy(other.to_string())),
    }
}

/// Checks that hosts owning `prototype` policy can be scheduled with `selector`.
pub fn check_compatibility(
    prototype: &dyn PreemptionPolicy,
    selector: &dyn HostSelectionPolicy,
) -> Result<(), ConfigError> {
    if !prototype.supports_scheduling() || (selector.requires_vm_capacity() && !prototype.supports_vm_capacity()) {
        return Err(ConfigError::IncompatiblePolicies {
            preemption: prototype.name().to_string(),
            host_selection: selector.name().to_string(),
        });
    }
    Ok(())
}
