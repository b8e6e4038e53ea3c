//! Worst Fit by raw available capacity.

use crate::core::error::PolicyError;
use crate::core::host::HostRef;
use crate::core::host_selection_policy::{first_suitable, HostSelectionPolicy};
use crate::core::vm::PreemptableVm;

/// Uses the first suitable host among hosts passed by the caller.
///
/// The caller is expected to order hosts from the most to the least available capacity
/// (see [`sorted_by_most_available_mips`](crate::core::host_selection_policy::sorted_by_most_available_mips)),
/// the policy does not maintain its own pool.
#[derive(Default)]
pub struct WorstFit;

impl WorstFit {
    pub fn new() -> Self {
        Default::default()
    }
}

impl HostSelectionPolicy for WorstFit {
    fn name(&self) -> &'static str {
        "WorstFit"
    }

    fn select(
        &mut self,
        hosts: &[HostRef],
        vm: Option<&PreemptableVm>,
        time: f64,
    ) -> Result<Option<HostRef>, PolicyError> {
        let vm = vm.ok_or(PolicyError::MissingVm)?;
        first_suitable(hosts, vm, time, self.name())
    }

    fn add_host(&mut self, _host: HostRef) {}

    fn remove_host(&mut self, _host_id: u32) {}
}
