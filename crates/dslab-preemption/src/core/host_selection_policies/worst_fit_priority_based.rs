//! Worst Fit by capacity available to the VM priority.

use std::collections::BTreeMap;

use crate::core::comparators::{by_most_available_mips, HostCapacity};
use crate::core::error::PolicyError;
use crate::core::host::HostRef;
use crate::core::host_selection_policy::{first_suitable, HostSelectionPolicy};
use crate::core::vm::PreemptableVm;

/// Uses the suitable host with the most capacity available to the VM priority.
///
/// Capacity used by less privileged priorities is not counted, since it can be reclaimed by preemption.
#[derive(Default)]
pub struct WorstFitPriorityBased {
    hosts: BTreeMap<u32, HostRef>,
}

impl WorstFitPriorityBased {
    pub fn new() -> Self {
        Default::default()
    }
}

impl HostSelectionPolicy for WorstFitPriorityBased {
    fn name(&self) -> &'static str {
        "WorstFitPriorityBased"
    }

    fn select(
        &mut self,
        _hosts: &[HostRef],
        vm: Option<&PreemptableVm>,
        time: f64,
    ) -> Result<Option<HostRef>, PolicyError> {
        let vm = vm.ok_or(PolicyError::MissingVm)?;
        let mut candidates = self
            .hosts
            .values()
            .map(|host| host.borrow().priority_capacity(vm.priority).map(|capacity| (capacity, host)))
            .collect::<Result<Vec<(HostCapacity, &HostRef)>, PolicyError>>()?;
        candidates.sort_by(|a, b| by_most_available_mips(&a.0, &b.0));
        first_suitable(candidates.into_iter().map(|(_, host)| host), vm, time, self.name())
    }

    fn add_host(&mut self, host: HostRef) {
        let id = host.borrow().id;
        self.hosts.insert(id, host);
    }

    fn remove_host(&mut self, host_id: u32) {
        self.hosts.remove(&host_id);
    }
}
