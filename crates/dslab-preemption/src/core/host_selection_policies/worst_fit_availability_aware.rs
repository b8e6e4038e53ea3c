//! Worst Fit by capacity predicted to be available to the arriving VM.

use std::collections::BTreeMap;

use crate::core::comparators::{by_most_available_mips, HostCapacity};
use crate::core::error::PolicyError;
use crate::core::host::HostRef;
use crate::core::host_selection_policy::{first_suitable, HostSelectionPolicy};
use crate::core::vm::PreemptableVm;

/// Uses the suitable host offering the most capacity to the specific VM.
///
/// The capacity depends on the VM (e.g. on its current availability against the SLO target),
/// so candidates are reordered on every selection.
#[derive(Default)]
pub struct WorstFitAvailabilityAware {
    hosts: BTreeMap<u32, HostRef>,
}

impl WorstFitAvailabilityAware {
    pub fn new() -> Self {
        Default::default()
    }
}

impl HostSelectionPolicy for WorstFitAvailabilityAware {
    fn name(&self) -> &'static str {
        "WorstFitAvailabilityAware"
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
            .map(|host| host.borrow().capacity_for_vm(vm, time).map(|capacity| (capacity, host)))
            .collect::<Result<Vec<(HostCapacity, &HostRef)>, PolicyError>>()?;
        candidates.sort_by(|a, b| by_most_available_mips(&a.0, &b.0));
        first_suitable(candidates.into_iter().map(|(_, host)| host), vm, time, self.name())
    }

    fn requires_vm_capacity(&self) -> bool {
        true
    }

    fn add_host(&mut self, host: HostRef) {
        let id = host.borrow().id;
        self.hosts.insert(id, host);
    }

    fn remove_host(&mut self, host_id: u32) {
        self.hosts.remove(&host_id);
    }
}
