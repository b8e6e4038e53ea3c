//! Per-priority capacity accounting shared by preemption policies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::comparators::VmArrivalKey;
use crate::core::rounding::round;
use crate::core::vm::VmRef;

/// Identity and capacity of the host owning a policy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HostSpec {
    pub id: u32,
    pub total_mips: f64,
}

/// Stores capacity in use and running VMs for each priority of a single host.
///
/// For every priority the sum of `mips` of recorded VMs equals the capacity in use.
/// Running VMs of a priority are kept in arrival order, buckets of priorities without running VMs are dropped.
#[derive(Clone)]
pub struct PriorityUsage {
    host: Option<HostSpec>,
    precision: u32,
    in_use: BTreeMap<u32, f64>,
    running: BTreeMap<u32, BTreeMap<VmArrivalKey, VmRef>>,
}

impl PriorityUsage {
    /// Creates empty accounting, total capacity is zero until the host is attached.
    pub fn new(precision: u32) -> Self {
        Self {
            host: None,
            precision,
            in_use: BTreeMap::new(),
            running: BTreeMap::new(),
        }
    }

    pub fn host(&self) -> Option<HostSpec> {
        self.host
    }

    pub fn set_host(&mut self, host: HostSpec) {
        self.host = Some(HostSpec {
            id: host.id,
            total_mips: self.round(host.total_mips),
        });
    }

    /// Returns the ID of attached host for log messages.
    pub fn host_id(&self) -> Option<u32> {
        self.host.map(|h| h.id)
    }

    pub fn total_mips(&self) -> f64 {
        self.host.map_or(0., |h| h.total_mips)
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn round(&self, value: f64) -> f64 {
        round(value, self.precision)
    }

    /// Records VM as running and adds its capacity to its priority usage.
    ///
    /// Returns false if the VM is already recorded.
    pub fn allocating(&mut self, vm_ref: &VmRef) -> bool {
        let vm = vm_ref.borrow();
        let bucket = self.running.entry(vm.priority).or_default();
        let key = VmArrivalKey::of(&vm);
        if bucket.contains_key(&key) {
            return false;
        }
        bucket.insert(key, vm_ref.clone());
        let in_use = self.in_use.get(&vm.priority).copied().unwrap_or(0.);
        let in_use = round(in_use + vm.mips, self.precision);
        self.in_use.insert(vm.priority, in_use);
        true
    }

    /// Removes VM from running VMs and subtracts its capacity from its priority usage.
    ///
    /// Returns false if the VM is not recorded.
    pub fn deallocating(&mut self, vm_ref: &VmRef) -> bool {
        let vm = vm_ref.borrow();
        let Some(bucket) = self.running.get_mut(&vm.priority) else {
            return false;
        };
        if bucket.remove(&VmArrivalKey::of(&vm)).is_none() {
            return false;
        }
        if bucket.is_empty() {
            self.running.remove(&vm.priority);
            self.in_use.remove(&vm.priority);
        } else if let Some(in_use) = self.in_use.get_mut(&vm.priority) {
            *in_use = round(*in_use - vm.mips, self.precision);
        }
        true
    }

    /// Returns capacity in use by VMs of the priority.
    pub fn in_use(&self, priority: u32) -> f64 {
        self.in_use.get(&priority).copied().unwrap_or(0.)
    }

    /// Returns capacity in use by VMs of all priorities.
    pub fn used_mips(&self) -> f64 {
        self.round(self.in_use.values().sum())
    }

    /// Returns total capacity minus the capacity used by the priority and all more privileged priorities.
    ///
    /// Usage of less privileged priorities never reduces the result.
    pub fn available_mips_by_priority(&self, priority: u32) -> f64 {
        let used: f64 = self.in_use.range(..=priority).map(|(_, mips)| *mips).sum();
        self.round(self.total_mips() - used)
    }

    /// Returns running VMs of the priority in arrival order.
    pub fn running(&self, priority: u32) -> impl DoubleEndedIterator<Item = &VmRef> + '_ {
        self.running.get(&priority).into_iter().flat_map(|bucket| bucket.values())
    }

    /// Returns all running VMs ordered by priority and arrival.
    pub fn all_running(&self) -> impl Iterator<Item = &VmRef> + '_ {
        self.running.values().flat_map(|bucket| bucket.values())
    }

    /// Returns the least privileged priority having running VMs.
    pub fn lowest_privilege_priority(&self) -> Option<u32> {
        self.running.keys().next_back().copied()
    }

    pub fn vm_count(&self) -> usize {
        self.running.values().map(|bucket| bucket.len()).sum()
    }

    /// Returns priorities with non-zero usage and their usage.
    pub fn usage_by_priority(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.in_use.iter().map(|(p, mips)| (*p, *mips))
    }
}
