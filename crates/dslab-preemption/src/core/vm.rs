//! Representation of preemptable virtual machine and its status.

use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use serde::Serialize;

/// Shared reference to a VM, the VM state is updated by the engine while policies hold it.
pub type VmRef = Rc<RefCell<PreemptableVm>>;

/// Status of virtual machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VmStatus {
    Waiting,
    Running,
    Finished,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Waiting => write!(f, "waiting"),
            VmStatus::Running => write!(f, "running"),
            VmStatus::Finished => write!(f, "finished"),
        }
    }
}

/// Represents virtual machine which can be preempted and later resumed.
///
// VM is characterized by its ID, priority (0 is the most privileged), requested capacity (mips),
// submit time and requested runtime. While running it accrues actual runtime, preemption pauses the accrual.
// The ratio of accrued runtime to elapsed time since submission is the VM's current availability.
#[derive(Clone, Debug, Serialize)]
pub struct PreemptableVm {
    pub id: u32,
    pub priority: u32,
    pub mips: f64,
    pub submit_time: f64,
    pub runtime: f64,
    status: VmStatus,
    accrued_runtime: f64,
    start_time: Option<f64>,
    host: Option<u32>,
    preemptions: u32,
    backfilling_choices: u32,
    migrations: u32,
}

impl PreemptableVm {
    /// Creates waiting VM with specified parameters.
    pub fn new(id: u32, priority: u32, mips: f64, submit_time: f64, runtime: f64) -> Self {
        Self {
            id,
            priority,
            mips,
            submit_time,
            runtime,
            status: VmStatus::Waiting,
            accrued_runtime: 0.,
            start_time: None,
            host: None,
            preemptions: 0,
            backfilling_choices: 0,
            migrations: 0,
        }
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    /// Returns the host the VM runs on or ran on most recently.
    pub fn host(&self) -> Option<u32> {
        self.host
    }

    pub fn is_running(&self) -> bool {
        self.status == VmStatus::Running
    }

    /// Returns runtime received by VM until `time`, including the current running period.
    pub fn actual_runtime(&self, time: f64) -> f64 {
        match self.start_time {
            Some(start_time) if time > start_time => self.accrued_runtime + (time - start_time),
            _ => self.accrued_runtime,
        }
    }

    /// Returns the fraction of time since submission during which the VM was running.
    ///
    /// Before any time has elapsed the availability is 1.
    pub fn current_availability(&self, time: f64) -> f64 {
        let elapsed = time - self.submit_time;
        if elapsed <= 0. {
            return 1.;
        }
        (self.actual_runtime(time) / elapsed).clamp(0., 1.)
    }

    /// Returns runtime still to be served at `time`.
    pub fn remaining_runtime(&self, time: f64) -> f64 {
        (self.runtime - self.actual_runtime(time)).max(0.)
    }

    /// Starts or resumes VM on the specified host.
    ///
    /// Resuming a preempted VM on another host counts as a migration.
    pub fn start(&mut self, time: f64, host: u32) {
        if self.status == VmStatus::Running {
            return;
        }
        if self.preemptions > 0 && self.host.is_some_and(|prev| prev != host) {
            self.migrations += 1;
        }
        self.status = VmStatus::Running;
        self.start_time = Some(time);
        self.host = Some(host);
    }

    /// Pauses VM, the runtime accrued so far is kept.
    pub fn preempt(&mut self, time: f64) {
        if self.status != VmStatus::Running {
            return;
        }
        self.accrued_runtime = self.actual_runtime(time);
        self.start_time = None;
        self.status = VmStatus::Waiting;
        self.preemptions += 1;
    }

    pub fn finish(&mut self, time: f64) {
        self.accrued_runtime = self.actual_runtime(time);
        self.start_time = None;
        self.status = VmStatus::Finished;
    }

    pub fn preemptions(&self) -> u32 {
        self.preemptions
    }

    pub fn backfilling_choices(&self) -> u32 {
        self.backfilling_choices
    }

    pub fn migrations(&self) -> u32 {
        self.migrations
    }

    /// Records that the VM was placed ahead of waiting VMs which were ordered before it.
    pub fn mark_backfilling_choice(&mut self) {
        self.backfilling_choices += 1;
    }
}
