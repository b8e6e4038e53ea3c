//! Physical host owning a preemption policy.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::comparators::HostCapacity;
use crate::core::error::PolicyError;
use crate::core::preemption_policy::PreemptionPolicy;
use crate::core::priority_usage::HostSpec;
use crate::core::vm::{PreemptableVm, VmRef};

pub type HostRef = Rc<RefCell<Host>>;

/// Host with fixed total capacity.
///
/// Capacity accounting is changed only through the owned preemption policy.
pub struct Host {
    pub id: u32,
    total_mips: f64,
    policy: Box<dyn PreemptionPolicy>,
}

impl Host {
    /// Creates host and attaches the policy to it.
    pub fn new(id: u32, total_mips: f64, mut policy: Box<dyn PreemptionPolicy>) -> Self {
        policy.set_host(HostSpec { id, total_mips });
        Self {
            id,
            total_mips,
            policy,
        }
    }

    pub fn total_mips(&self) -> f64 {
        self.total_mips
    }

    /// Returns capacity used by running VMs of all priorities.
    pub fn used_mips(&self) -> f64 {
        self.policy.used_mips()
    }

    /// Returns capacity not used by any running VM.
    pub fn available_mips(&self) -> f64 {
        self.policy.usage().round(self.total_mips - self.used_mips())
    }

    pub fn available_mips_by_priority(&self, priority: u32) -> Result<f64, PolicyError> {
        self.policy.get_available_mips_by_priority(priority)
    }

    pub fn available_mips_for_vm(&self, vm: &PreemptableVm, time: f64) -> Result<f64, PolicyError> {
        self.policy.get_available_mips_by_vm(vm, time)
    }

    /// Admission check shared by all host selection policies.
    pub fn is_suitable_for_vm(&self, vm: &PreemptableVm, time: f64) -> Result<bool, PolicyError> {
        self.policy.is_suitable_for(vm, time)
    }

    pub fn allocate_vm(&mut self, vm: &VmRef) {
        self.policy.allocating(vm);
    }

    pub fn deallocate_vm(&mut self, vm: &VmRef) {
        self.policy.deallocating(vm);
    }

    pub fn next_vm_for_preempting(&mut self, time: f64) -> Result<Option<VmRef>, PolicyError> {
        self.policy.next_vm_for_preempting(time)
    }

    /// Returns running VMs in the order of priority and arrival.
    pub fn running_vms(&self) -> Vec<VmRef> {
        self.policy.usage().all_running().cloned().collect()
    }

    /// Returns used capacity of each priority having running VMs.
    pub fn usage_by_priority(&self) -> Vec<(u32, f64)> {
        self.policy.usage().usage_by_priority().collect()
    }

    pub fn policy(&self) -> &dyn PreemptionPolicy {
        self.policy.as_ref()
    }

    pub fn policy_mut(&mut self) -> &mut dyn PreemptionPolicy {
        self.policy.as_mut()
    }

    /// Raw available capacity as an ordering key.
    pub fn available_capacity(&self) -> HostCapacity {
        HostCapacity::new(self.id, self.available_mips())
    }

    /// Capacity available to the priority as an ordering key.
    pub fn priority_capacity(&self, priority: u32) -> Result<HostCapacity, PolicyError> {
        Ok(HostCapacity::new(self.id, self.available_mips_by_priority(priority)?))
    }

    /// Capacity available to the VM as an ordering key.
    pub fn capacity_for_vm(&self, vm: &PreemptableVm, time: f64) -> Result<HostCapacity, PolicyError> {
        Ok(HostCapacity::new(self.id, self.available_mips_for_vm(vm, time)?))
    }
}
