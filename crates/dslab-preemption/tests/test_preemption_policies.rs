use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sugars::{boxed, rc, refcell};

use dslab_preemption::core::error::PolicyError;
use dslab_preemption::core::host::Host;
use dslab_preemption::core::preemption_policies::capacity_cost_based::CapacityCostBasedPolicy;
use dslab_preemption::core::preemption_policies::fcfs::FcfsPolicy;
use dslab_preemption::core::preemption_policies::ttv_based::TtvBasedPolicy;
use dslab_preemption::core::preemption_policies::vm_availability_based::VmAvailabilityBasedPolicy;
use dslab_preemption::core::preemption_policy::PreemptionPolicy;
use dslab_preemption::core::priority_usage::HostSpec;
use dslab_preemption::core::rounding::{round, DEFAULT_PRECISION};
use dslab_preemption::core::slo::SloTargets;
use dslab_preemption::core::vm::{PreemptableVm, VmRef};

fn vm(id: u32, priority: u32, mips: f64, submit_time: f64) -> VmRef {
    rc!(refcell!(PreemptableVm::new(id, priority, mips, submit_time, 100.)))
}

fn targets(values: &[f64]) -> SloTargets {
    let map: BTreeMap<u32, f64> = values.iter().enumerate().map(|(p, t)| (p as u32, *t)).collect();
    SloTargets::new(map, values.len() as u32).unwrap()
}

fn attached<P: PreemptionPolicy>(mut policy: P, total_mips: f64) -> P {
    policy.set_host(HostSpec { id: 0, total_mips });
    policy
}

fn ordered_policies(total_mips: f64) -> Vec<Box<dyn PreemptionPolicy>> {
    vec![
        boxed!(attached(FcfsPolicy::default(), total_mips)) as Box<dyn PreemptionPolicy>,
        boxed!(attached(
            VmAvailabilityBasedPolicy::new(targets(&[0.99, 0.9, 0.5]), DEFAULT_PRECISION),
            total_mips
        )) as Box<dyn PreemptionPolicy>,
        boxed!(attached(
            TtvBasedPolicy::new(targets(&[0.99, 0.9, 0.5]), DEFAULT_PRECISION),
            total_mips
        )) as Box<dyn PreemptionPolicy>,
    ]
}

#[test]
// Host with capacity 100 runs VM A (priority 0, 40 mips). VM B (priority 0, 70 mips) doesn't fit into remaining 60.
// VM C (priority 1, 50 mips) fits since only priority 0 usage counts against priority 1.
fn test_fcfs_priority_partitioning() {
    let mut policy = attached(FcfsPolicy::default(), 100.);
    let a = vm(1, 0, 40., 0.);
    let b = vm(2, 0, 70., 1.);
    let c = vm(3, 1, 50., 2.);

    assert!(policy.is_suitable_for(&a.borrow(), 0.).unwrap());
    policy.allocating(&a);
    assert!(!policy.is_suitable_for(&b.borrow(), 1.).unwrap());
    assert_eq!(policy.next_vm_for_preempting(1.).unwrap().unwrap().borrow().id, 1);

    assert_eq!(policy.get_available_mips_by_priority(1).unwrap(), 60.);
    assert!(policy.is_suitable_for(&c.borrow(), 2.).unwrap());
    policy.allocating(&c);
    assert_eq!(policy.used_mips_by_priority(0), 40.);
    assert_eq!(policy.used_mips_by_priority(1), 50.);
    assert_eq!(policy.get_available_mips_by_priority(0).unwrap(), 60.);
    assert_eq!(policy.get_available_mips_by_priority(1).unwrap(), 10.);

    // lower priority VM is evicted first
    assert_eq!(policy.next_vm_for_preempting(2.).unwrap().unwrap().borrow().id, 3);
}

#[test]
// The most recently submitted VM of the least privileged priority is evicted first.
fn test_fcfs_evicts_last_in() {
    let mut policy = attached(FcfsPolicy::default(), 100.);
    for (id, submit_time) in [(1, 0.), (2, 2.), (3, 1.)] {
        policy.allocating(&vm(id, 1, 10., submit_time));
    }
    policy.allocating(&vm(4, 0, 10., 5.));
    let victim = policy.next_vm_for_preempting(5.).unwrap().unwrap();
    assert_eq!(victim.borrow().id, 2);
    policy.deallocating(&victim);
    assert_eq!(policy.next_vm_for_preempting(5.).unwrap().unwrap().borrow().id, 3);
}

#[test]
fn test_fcfs_sorts_by_priority_and_arrival() {
    let policy = attached(FcfsPolicy::default(), 100.);
    let vms = vec![vm(1, 1, 10., 0.), vm(2, 0, 10., 3.), vm(3, 1, 10., 0.), vm(4, 0, 10., 1.)];
    let sorted: Vec<u32> = policy
        .sort_vms(&vms, 5.)
        .unwrap()
        .iter()
        .map(|vm| vm.borrow().id)
        .collect();
    assert_eq!(sorted, vec![4, 2, 1, 3]);
}

#[test]
fn test_empty_host_has_no_eviction_candidate() {
    for mut policy in ordered_policies(100.) {
        assert!(policy.next_vm_for_preempting(0.).unwrap().is_none());
    }
}

#[test]
// Available capacity of a priority is the total capacity minus usage of the priority and all more privileged ones,
// for any sequence of allocations and deallocations.
fn test_available_mips_matches_recorded_vms() {
    let mut rng = StdRng::seed_from_u64(123);
    for mut policy in ordered_policies(1000.) {
        let mut recorded: Vec<VmRef> = Vec::new();
        for id in 0..500 {
            if !recorded.is_empty() && rng.gen_bool(0.4) {
                let vm = recorded.swap_remove(rng.gen_range(0..recorded.len()));
                policy.deallocating(&vm);
            } else {
                let vm = vm(id, rng.gen_range(0..3), rng.gen_range(1..1000) as f64 / 100., id as f64);
                policy.allocating(&vm);
                recorded.push(vm);
            }
            for priority in 0..3 {
                let used: f64 = recorded
                    .iter()
                    .map(|vm| vm.borrow())
                    .filter(|vm| vm.priority <= priority)
                    .map(|vm| vm.mips)
                    .sum();
                let available = policy.get_available_mips_by_priority(priority).unwrap();
                assert!((available - (1000. - used)).abs() < 1e-6);
            }
        }
    }
}

#[test]
fn test_allocation_round_trip_restores_usage() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut policy = attached(FcfsPolicy::default(), 100.);
    for id in 0..20 {
        policy.allocating(&vm(id, id % 3, rng.gen_range(1..300) as f64 / 100., id as f64));
    }
    for id in 100..200 {
        let vm = vm(id, rng.gen_range(0..3), rng.gen_range(1..300) as f64 / 100., id as f64);
        let priority = vm.borrow().priority;
        let before = policy.used_mips_by_priority(priority);
        policy.allocating(&vm);
        policy.deallocating(&vm);
        assert_eq!(policy.used_mips_by_priority(priority), before);
    }
}

#[test]
// Eviction candidates are never more privileged than any running VM.
fn test_victims_come_from_least_privileged_priority() {
    let mut rng = StdRng::seed_from_u64(7);
    for mut policy in ordered_policies(10000.) {
        for id in 0..60 {
            let vm = vm(id, rng.gen_range(0..3), 10., rng.gen_range(0..20) as f64);
            if rng.gen_bool(0.5) {
                let start = vm.borrow().submit_time + rng.gen_range(0..5) as f64;
                vm.borrow_mut().start(start, 0);
            }
            policy.allocating(&vm);
        }
        let mut remaining = 60;
        while let Some(victim) = policy.next_vm_for_preempting(30.).unwrap() {
            let lowest = policy.usage().lowest_privilege_priority().unwrap();
            assert_eq!(victim.borrow().priority, lowest);
            policy.deallocating(&victim);
            remaining -= 1;
        }
        assert_eq!(remaining, 0);
    }
}

#[test]
// Host without running VMs has no capacity to lend, so availability-aware capacity equals raw capacity.
fn test_availability_capacity_of_empty_host() {
    let policy = attached(
        VmAvailabilityBasedPolicy::new(targets(&[0.9, 0.8]), DEFAULT_PRECISION),
        100.,
    );
    assert_eq!(
        policy.get_available_mips_by_priority_and_availability(0, 0.).unwrap(),
        100.
    );
    assert_eq!(
        policy.get_available_mips_by_priority_and_availability(1, 10.).unwrap(),
        100.
    );
}

#[test]
// VM A runs since submission (availability 1, margin 0.5 against target 0.5). VM B never ran (margin -0.5),
// so the capacity of A can be lent to B. VM C was just submitted and already meets the target, so it can't borrow.
fn test_availability_borrowing() {
    let mut policy = attached(
        VmAvailabilityBasedPolicy::new(targets(&[0.9, 0.5]), DEFAULT_PRECISION),
        100.,
    );
    let a = vm(1, 1, 60., 0.);
    a.borrow_mut().start(0., 0);
    policy.allocating(&a);

    let b = vm(2, 1, 60., 0.);
    assert_eq!(policy.get_available_mips_by_priority(1).unwrap(), 40.);
    assert_eq!(policy.mips_to_be_available(&b.borrow(), 10.), 60.);
    assert_eq!(policy.get_available_mips_by_vm(&b.borrow(), 10.).unwrap(), 100.);
    assert!(policy.is_suitable_for(&b.borrow(), 10.).unwrap());

    let c = vm(3, 1, 60., 10.);
    assert_eq!(policy.mips_to_be_available(&c.borrow(), 10.), 0.);
    assert!(!policy.is_suitable_for(&c.borrow(), 10.).unwrap());

    assert_eq!(
        policy.get_available_mips_by_priority_and_availability(1, 10.).unwrap(),
        100.
    );
    // more privileged priority can't borrow from priority 1
    assert_eq!(
        policy.get_available_mips_by_priority_and_availability(0, 10.).unwrap(),
        100.
    );
}

#[test]
// Only VMs with more slack than the arriving VM are counted.
fn test_availability_borrowing_requires_more_slack() {
    let mut policy = attached(
        VmAvailabilityBasedPolicy::new(targets(&[0.9, 0.5]), DEFAULT_PRECISION),
        100.,
    );
    // availability at time 10: 0.6, margin 0.1
    let a = vm(1, 1, 50., 0.);
    a.borrow_mut().start(4., 0);
    policy.allocating(&a);
    // availability at time 10: 0.2, margin -0.3, it is below the target and can't lend
    let b = vm(2, 1, 30., 0.);
    b.borrow_mut().start(8., 0);
    policy.allocating(&b);

    let arriving = vm(3, 1, 40., 0.);
    assert_eq!(policy.mips_to_be_available(&arriving.borrow(), 10.), 50.);
    assert_eq!(policy.get_available_mips_by_vm(&arriving.borrow(), 10.).unwrap(), 70.);
}

#[test]
// The VM furthest above the target is evicted first.
fn test_availability_victim_and_order() {
    let mut policy = attached(
        VmAvailabilityBasedPolicy::new(targets(&[0.9, 0.5]), DEFAULT_PRECISION),
        100.,
    );
    let x = vm(1, 1, 10., 0.);
    x.borrow_mut().start(0., 0);
    let y = vm(2, 1, 10., 0.);
    y.borrow_mut().start(5., 0);
    policy.allocating(&y);
    policy.allocating(&x);
    assert_eq!(policy.next_vm_for_preempting(10.).unwrap().unwrap().borrow().id, 1);

    // waiting VMs with lower availability are served first
    let waiting = vec![x.clone(), y.clone(), vm(3, 0, 10., 9.)];
    let sorted: Vec<u32> = policy
        .sort_vms(&waiting, 10.)
        .unwrap()
        .iter()
        .map(|vm| vm.borrow().id)
        .collect();
    assert_eq!(sorted, vec![3, 2, 1]);
}

#[test]
// Both VMs run since submission and have availability 1. Among equal availability the later submitted VM
// sorts last and is evicted first.
fn test_availability_tie_evicts_latest_submitted() {
    let mut policy = attached(
        VmAvailabilityBasedPolicy::new(targets(&[0.9, 0.5]), DEFAULT_PRECISION),
        100.,
    );
    let early = vm(1, 1, 10., 0.);
    early.borrow_mut().start(0., 0);
    let late = vm(2, 1, 10., 2.);
    late.borrow_mut().start(2., 0);
    policy.allocating(&late);
    policy.allocating(&early);

    let sorted: Vec<u32> = policy
        .sort_vms(&[late.clone(), early.clone()], 10.)
        .unwrap()
        .iter()
        .map(|vm| vm.borrow().id)
        .collect();
    assert_eq!(sorted, vec![1, 2]);
    assert_eq!(policy.next_vm_for_preempting(10.).unwrap().unwrap().borrow().id, 2);
}

#[test]
fn test_ttv_admission_follows_availability() {
    let mut policy = attached(TtvBasedPolicy::new(targets(&[0.9, 0.5]), DEFAULT_PRECISION), 100.);
    let a = vm(1, 1, 60., 0.);
    a.borrow_mut().start(0., 0);
    policy.allocating(&a);
    let b = vm(2, 1, 60., 0.);
    assert!(policy.is_suitable_for(&b.borrow(), 10.).unwrap());
    assert_eq!(policy.get_available_mips_by_vm(&b.borrow(), 10.).unwrap(), 100.);

    // evicting the victim within the same instant is visible to the next request
    let victim = policy.next_vm_for_preempting(10.).unwrap().unwrap();
    assert_eq!(victim.borrow().id, 1);
    policy.deallocating(&victim);
    assert!(policy.next_vm_for_preempting(10.).unwrap().is_none());
}

#[test]
fn test_ttv_sorts_most_urgent_first() {
    let policy = attached(TtvBasedPolicy::new(targets(&[0.9, 0.5]), DEFAULT_PRECISION), 100.);
    let urgent = vm(1, 1, 10., 0.);
    let relaxed = vm(2, 1, 10., 0.);
    relaxed.borrow_mut().start(0., 0);
    let privileged = vm(3, 0, 10., 0.);
    privileged.borrow_mut().start(0., 0);
    let sorted: Vec<u32> = policy
        .sort_vms(&[relaxed, urgent, privileged], 10.)
        .unwrap()
        .iter()
        .map(|vm| vm.borrow().id)
        .collect();
    assert_eq!(sorted, vec![3, 1, 2]);
}

#[test]
fn test_priority_only_policy_does_not_model_availability() {
    let policy = attached(FcfsPolicy::default(), 100.);
    let vm = vm(1, 0, 10., 0.);
    assert_eq!(
        policy.get_available_mips_by_priority_and_availability(0, 0.),
        Err(PolicyError::Unsupported {
            policy: "FCFS",
            operation: "get_available_mips_by_priority_and_availability",
        })
    );
    assert!(matches!(
        policy.get_available_mips_by_vm(&vm.borrow(), 0.),
        Err(PolicyError::Unsupported { .. })
    ));
    assert!(matches!(
        policy.get_capacity_costs(10., 20.),
        Err(PolicyError::Unsupported { .. })
    ));
}

#[test]
// Capacity-cost policy keeps capacity bookkeeping but reports every decision as unsupported.
fn test_capacity_cost_policy_is_extension_point() {
    let mut policy = attached(CapacityCostBasedPolicy::default(), 100.);
    let vm = vm(1, 0, 10.5, 0.);
    policy.allocating(&vm);
    assert_eq!(policy.used_mips(), 10.5);
    assert_eq!(policy.used_mips_by_priority(0), 10.5);

    assert!(matches!(
        policy.is_suitable_for(&vm.borrow(), 0.),
        Err(PolicyError::Unsupported { .. })
    ));
    assert!(matches!(
        policy.next_vm_for_preempting(0.),
        Err(PolicyError::Unsupported { .. })
    ));
    assert!(matches!(
        policy.sort_vms(&[vm.clone()], 0.),
        Err(PolicyError::Unsupported { .. })
    ));
    assert!(matches!(
        policy.get_available_mips_by_priority(0),
        Err(PolicyError::Unsupported { .. })
    ));
    assert!(matches!(
        policy.get_capacity_costs(0., 10.),
        Err(PolicyError::Unsupported { .. })
    ));

    policy.deallocating(&vm);
    assert_eq!(policy.used_mips(), 0.);
}

#[test]
fn test_host_owns_attached_policy() {
    let mut host = Host::new(7, 100., boxed!(FcfsPolicy::default()));
    assert_eq!(
        host.policy().host(),
        Some(HostSpec {
            id: 7,
            total_mips: 100.
        })
    );
    let a = vm(1, 1, 30.3, 0.);
    let b = vm(2, 0, 20.1, 0.);
    host.allocate_vm(&a);
    host.allocate_vm(&b);
    assert_eq!(host.used_mips(), 50.4);
    assert_eq!(host.available_mips(), round(100. - 50.4, DEFAULT_PRECISION));
    assert_eq!(host.available_mips_by_priority(0).unwrap(), 79.9);
    let running: Vec<u32> = host.running_vms().iter().map(|vm| vm.borrow().id).collect();
    assert_eq!(running, vec![2, 1]);
    host.deallocate_vm(&a);
    host.deallocate_vm(&b);
    assert_eq!(host.available_mips(), 100.);
}
