//! Datacenter driver placing waiting VMs on hosts.
//!
//! The driver is invoked by the simulation engine when VMs arrive or finish. It orders waiting VMs, selects a
//! host for each of them with the configured host selection policy, evicts victims proposed by the host's
//! preemption policy until the VM fits, and allocates the VM. Preempted VMs are returned to the waiting queue.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use sugars::{rc, refcell};

use crate::core::config::PreemptionConfig;
use crate::core::error::{ConfigError, PolicyError};
use crate::core::host::{Host, HostRef};
use crate::core::host_selection_policy::{
    check_compatibility, host_selection_policy_resolver, sorted_by_most_available_mips, HostSelectionPolicy,
};
use crate::core::monitoring::Monitoring;
use crate::core::preemption_policy::{preemption_policy_resolver, PreemptionPolicy};
use crate::core::rounding::round;
use crate::core::vm::{PreemptableVm, VmRef, VmStatus};

pub struct Datacenter {
    prototype: Box<dyn PreemptionPolicy>,
    selector: Box<dyn HostSelectionPolicy>,
    number_of_priorities: u32,
    hosts: BTreeMap<u32, HostRef>,
    vms: BTreeMap<u32, VmRef>,
    waiting: BTreeMap<u32, VmRef>,
    monitoring: Monitoring,
}

impl Datacenter {
    /// Creates datacenter, every added host gets a clone of `prototype` policy.
    pub fn new(
        prototype: Box<dyn PreemptionPolicy>,
        selector: Box<dyn HostSelectionPolicy>,
        number_of_priorities: u32,
    ) -> Self {
        Self {
            prototype,
            selector,
            number_of_priorities,
            hosts: BTreeMap::new(),
            vms: BTreeMap::new(),
            waiting: BTreeMap::new(),
            monitoring: Monitoring::new(),
        }
    }

    /// Creates datacenter with policies specified in the config.
    ///
    /// Fails if the policies can't be used together.
    pub fn from_config(config: &PreemptionConfig) -> Result<Self, ConfigError> {
        let prototype = preemption_policy_resolver(config)?;
        let selector = host_selection_policy_resolver(config)?;
        check_compatibility(prototype.as_ref(), selector.as_ref())?;
        Ok(Self::new(prototype, selector, config.number_of_priorities))
    }

    pub fn add_host(&mut self, id: u32, total_mips: f64) -> Result<HostRef, PolicyError> {
        if self.hosts.contains_key(&id) {
            warn!("host{} already exists", id);
            return Err(PolicyError::DuplicateHost(id));
        }
        let host = rc!(refcell!(Host::new(id, total_mips, dyn_clone::clone_box(&*self.prototype))));
        self.hosts.insert(id, host.clone());
        self.selector.add_host(host.clone());
        info!("added host{} with {} mips ({} policy)", id, total_mips, self.prototype.name());
        Ok(host)
    }

    /// Removes host, its running VMs are preempted and returned to the waiting queue.
    pub fn remove_host(&mut self, id: u32, time: f64) -> Result<Vec<VmRef>, PolicyError> {
        let host = self.hosts.remove(&id).ok_or(PolicyError::UnknownHost(id))?;
        self.selector.remove_host(id);
        let running = host.borrow().running_vms();
        for vm in running.iter() {
            self.preempt(&host, vm, time);
        }
        Ok(running)
    }

    pub fn host(&self, id: u32) -> Option<HostRef> {
        self.hosts.get(&id).cloned()
    }

    pub fn vm(&self, id: u32) -> Option<VmRef> {
        self.vms.get(&id).cloned()
    }

    /// Returns waiting VMs by ID.
    pub fn waiting_vms(&self) -> Vec<VmRef> {
        self.waiting.values().cloned().collect()
    }

    pub fn monitoring(&self) -> &Monitoring {
        &self.monitoring
    }

    /// Puts VM into the waiting queue. VM IDs are never reused, including IDs of finished VMs.
    pub fn submit_vm(&mut self, vm: PreemptableVm) -> Result<VmRef, PolicyError> {
        let id = vm.id;
        if self.vms.contains_key(&id) {
            warn!("VM {} already exists", id);
            return Err(PolicyError::DuplicateVm(id));
        }
        let vm = rc!(refcell!(vm));
        self.vms.insert(id, vm.clone());
        self.waiting.insert(id, vm.clone());
        Ok(vm)
    }

    /// Tries to place waiting VMs in the order defined by the preemption policy.
    ///
    /// Returns the number of placed VMs. VMs preempted during this call are placed not earlier than the next call.
    ///
    /// On error the VMs placed before it stay placed, host utilization is recorded anyway.
    pub fn schedule(&mut self, time: f64) -> Result<usize, PolicyError> {
        let waiting: Vec<VmRef> = self.waiting.values().cloned().collect();
        let queue = self.prototype.sort_vms(&waiting, time)?;
        let placed = self.place_queue(&queue, time);
        self.record_hosts(time);
        placed
    }

    fn place_queue(&mut self, queue: &[VmRef], time: f64) -> Result<usize, PolicyError> {
        let mut blocked = false;
        let mut placed = 0;

        for vm in queue.iter() {
            let candidates = sorted_by_most_available_mips(&self.hosts.values().cloned().collect::<Vec<_>>());
            let selected = self.selector.select(&candidates, Some(&*vm.borrow()), time)?;
            let Some(host) = selected else {
                blocked = true;
                continue;
            };
            let Some(victims) = self.plan_evictions(&host.borrow(), &vm.borrow(), time)? else {
                warn!(
                    "[{:.3} datacenter] host{} can't free capacity for VM {}",
                    time,
                    host.borrow().id,
                    vm.borrow().id
                );
                blocked = true;
                continue;
            };
            for victim in victims.iter() {
                self.preempt(&host, victim, time);
            }
            self.place(&host, vm, time, blocked);
            placed += 1;
        }
        Ok(placed)
    }

    /// Releases VM, a waiting VM is cancelled.
    pub fn finish_vm(&mut self, id: u32, time: f64) -> Result<(), PolicyError> {
        let vm = self.vms.get(&id).cloned().ok_or(PolicyError::UnknownVm(id))?;
        let status = vm.borrow().status();
        match status {
            VmStatus::Running => {
                let host_id = vm.borrow().host().ok_or(PolicyError::UnknownVm(id))?;
                let host = self.hosts.get(&host_id).ok_or(PolicyError::UnknownHost(host_id))?;
                host.borrow_mut().deallocate_vm(&vm);
                debug!("[{:.3} datacenter] VM {} finished on host{}", time, id, host_id);
            }
            VmStatus::Waiting => {
                self.waiting.remove(&id);
                debug!("[{:.3} datacenter] VM {} cancelled", time, id);
            }
            VmStatus::Finished => return Ok(()),
        }
        vm.borrow_mut().finish(time);
        self.monitoring.record_vm(&vm.borrow(), time);
        self.record_hosts(time);
        Ok(())
    }

    /// Finishes running VMs which have received their requested runtime by `time`.
    pub fn complete_finished(&mut self, time: f64) -> Result<Vec<u32>, PolicyError> {
        let precision = self.prototype.usage().precision();
        let completed: Vec<u32> = self
            .vms
            .values()
            .filter(|vm| {
                let vm = vm.borrow();
                vm.is_running() && round(vm.remaining_runtime(time), precision) <= 0.
            })
            .map(|vm| vm.borrow().id)
            .collect();
        for id in completed.iter() {
            self.finish_vm(*id, time)?;
        }
        Ok(completed)
    }

    /// Returns VMs to evict from the host so that `vm` fits, or `None` if the host can't free enough capacity.
    ///
    /// Evictions are tried on a copy of the host policy, the host itself is not changed.
    fn plan_evictions(&self, host: &Host, vm: &PreemptableVm, time: f64) -> Result<Option<Vec<VmRef>>, PolicyError> {
        let mut policy = dyn_clone::clone_box(host.policy());
        let precision = policy.usage().precision();
        let required = round(vm.mips, precision);
        let mut victims = Vec::new();
        loop {
            if round(host.total_mips() - policy.used_mips(), precision) >= required {
                return Ok(Some(victims));
            }
            let Some(victim) = policy.next_vm_for_preempting(time)? else {
                return Ok(None);
            };
            if victim.borrow().priority < vm.priority {
                return Ok(None);
            }
            policy.deallocating(&victim);
            victims.push(victim);
        }
    }

    fn preempt(&mut self, host: &HostRef, vm: &VmRef, time: f64) {
        host.borrow_mut().deallocate_vm(vm);
        vm.borrow_mut().preempt(time);
        let id = vm.borrow().id;
        debug!("[{:.3} datacenter] VM {} preempted on host{}", time, id, host.borrow().id);
        self.waiting.insert(id, vm.clone());
        self.monitoring.record_vm(&vm.borrow(), time);
    }

    fn place(&mut self, host: &HostRef, vm: &VmRef, time: f64, backfilling: bool) {
        let host_id = host.borrow().id;
        host.borrow_mut().allocate_vm(vm);
        let mut vm_data = vm.borrow_mut();
        vm_data.start(time, host_id);
        if backfilling {
            vm_data.mark_backfilling_choice();
        }
        debug!(
            "[{:.3} datacenter] VM {} (priority {}, {} mips) placed on host{}",
            time, vm_data.id, vm_data.priority, vm_data.mips, host_id
        );
        self.waiting.remove(&vm_data.id);
        self.monitoring.record_vm(&vm_data, time);
    }

    fn record_hosts(&mut self, time: f64) {
        for host in self.hosts.values() {
            self.monitoring.record_host(&host.borrow(), self.number_of_priorities, time);
        }
    }
}
