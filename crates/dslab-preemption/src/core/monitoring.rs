//! Records of simulation outcomes: per-VM counters and per-host utilization snapshots.

use std::fs::File;

use serde::Serialize;

use crate::core::host::Host;
use crate::core::vm::PreemptableVm;

/// Outcome counters of a VM at some time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VmOutcome {
    pub vm_id: u32,
    pub time: f64,
    pub priority: u32,
    pub preemptions: u32,
    pub backfilling_choices: u32,
    pub migrations: u32,
    pub availability: f64,
}

/// Capacity used by a priority on a host at some time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UtilizationEntry {
    pub host_id: u32,
    pub time: f64,
    pub priority: u32,
    pub used_mips: f64,
}

/// Accumulates outcome records, which can be saved for later analysis.
#[derive(Default)]
pub struct Monitoring {
    vm_outcomes: Vec<VmOutcome>,
    utilization: Vec<UtilizationEntry>,
}

impl Monitoring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records current counters of the VM.
    pub fn record_vm(&mut self, vm: &PreemptableVm, time: f64) {
        self.vm_outcomes.push(VmOutcome {
            vm_id: vm.id,
            time,
            priority: vm.priority,
            preemptions: vm.preemptions(),
            backfilling_choices: vm.backfilling_choices(),
            migrations: vm.migrations(),
            availability: vm.current_availability(time),
        });
    }

    /// Records used capacity of every priority of the host, priorities without usage are recorded as zero.
    pub fn record_host(&mut self, host: &Host, number_of_priorities: u32, time: f64) {
        let usage = host.usage_by_priority();
        let max_priority = usage.iter().map(|(p, _)| *p + 1).max().unwrap_or(0);
        for priority in 0..number_of_priorities.max(max_priority) {
            let used_mips = usage
                .iter()
                .find(|(p, _)| *p == priority)
                .map_or(0., |(_, mips)| *mips);
            self.utilization.push(UtilizationEntry {
                host_id: host.id,
                time,
                priority,
                used_mips,
            });
        }
    }

    pub fn vm_outcomes(&self) -> &[VmOutcome] {
        &self.vm_outcomes
    }

    pub fn utilization(&self) -> &[UtilizationEntry] {
        &self.utilization
    }

    /// Returns the latest record of the VM.
    pub fn last_vm_outcome(&self, vm_id: u32) -> Option<&VmOutcome> {
        self.vm_outcomes.iter().rev().find(|o| o.vm_id == vm_id)
    }

    pub fn save_vm_outcomes(&self, path: &str) -> Result<(), csv::Error> {
        save_csv(path, &self.vm_outcomes)
    }

    pub fn save_utilization(&self, path: &str) -> Result<(), csv::Error> {
        save_csv(path, &self.utilization)
    }
}

fn save_csv<T: Serialize>(path: &str, records: &[T]) -> Result<(), csv::Error> {
    let file = File::create(path)?;
    let mut wtr = csv::Writer::from_writer(file);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
