//! Integration tests exercising the end-to-end properties from the test plan:
//! save/load round trips, and resuming a `GainanovSat` run after an injected interrupt.
//! Per-module unit tests already cover the four learner scenarios (weight-at-most,
//! containment, the five-cycle) directly against `LevelLearn`/`GainanovSat`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use frontier_core::{
    Error, FnPredicate, GainanovSat, Interrupt, KnowledgeBase, LearnOutcome, Oracle, SatModel,
    Sense, SparseSet,
};

#[cfg(feature = "sat-batsat")]
use frontier_core::BatSatBackend;

#[test]
fn save_load_round_trip_preserves_an_enriched_knowledge_base() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kb.bin");

    let mut kb: KnowledgeBase<u32> = KnowledgeBase::with_file(6, path.clone()).unwrap();
    kb.add_lower(SparseSet::from_iter([0]), Some(10), true);
    kb.add_lower(SparseSet::from_iter([1, 2]), None, true);
    kb.add_lower(SparseSet::from_iter([3]), Some(20), true);
    kb.add_upper(SparseSet::from_iter([0, 1, 2, 3, 4]), Some(99), true);
    kb.add_upper(SparseSet::from_iter([5]), None, true);
    kb.set_complete_lower();
    kb.save().unwrap();

    let reloaded: KnowledgeBase<u32> = KnowledgeBase::with_file(6, path.clone()).unwrap();
    assert_eq!(reloaded.n(), 6);
    assert!(reloaded.is_complete_lower());
    assert!(!reloaded.is_complete_upper());

    let lowers: std::collections::HashSet<_> = reloaded.iter_lower().cloned().collect();
    let expected_lowers: std::collections::HashSet<_> = [
        SparseSet::from_iter([0]),
        SparseSet::from_iter([1, 2]),
        SparseSet::from_iter([3]),
    ]
    .into_iter()
    .collect();
    assert_eq!(lowers, expected_lowers);

    let uppers: std::collections::HashSet<_> = reloaded.iter_upper().cloned().collect();
    let expected_uppers: std::collections::HashSet<_> = [
        SparseSet::from_iter([0, 1, 2, 3, 4]),
        SparseSet::from_iter([5]),
    ]
    .into_iter()
    .collect();
    assert_eq!(uppers, expected_uppers);

    assert_eq!(reloaded.meta(&SparseSet::from_iter([0])), Some(&10));
    assert_eq!(reloaded.meta(&SparseSet::from_iter([1, 2])), None);
    assert_eq!(reloaded.meta(&SparseSet::from_iter([3])), Some(&20));
    assert_eq!(reloaded.meta(&SparseSet::from_iter([0, 1, 2, 3, 4])), Some(&99));
}

/// An oracle-call counter that sets an `Interrupt` flag once a threshold is hit, standing
/// in for the operator pressing Ctrl-C mid-run.
fn counting_predicate(
    threshold: usize,
    param: usize,
    calls: Arc<AtomicUsize>,
    interrupt: Interrupt,
) -> impl FnMut(&SparseSet) -> bool {
    move |v: &SparseSet| {
        let seen = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if seen >= threshold {
            interrupt.set();
        }
        v.weight() <= param
    }
}

#[test]
#[cfg(feature = "sat-batsat")]
fn interrupted_gainanov_run_resumes_to_the_same_frontier() {
    const N: usize = 4;
    const PARAM: usize = 2;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kb.bin");

    let interrupt = Interrupt::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let mut kb: KnowledgeBase<()> = KnowledgeBase::with_file(N, path.clone()).unwrap();
    let mut oracle: Oracle<(), _> = Oracle::new(FnPredicate(counting_predicate(
        10,
        PARAM,
        calls,
        interrupt.clone(),
    )));

    let model: SatModel<BatSatBackend> = SatModel::new("batsat");
    let mut learner = GainanovSat::new(Sense::Min, model);
    let outcome = learner.learn_with_interrupt(&mut kb, &mut oracle, Some(interrupt));

    assert!(matches!(outcome, Err(Error::Interrupt)));
    assert!(path.exists(), "state must be saved on interrupt");
    assert!(
        !kb.is_complete(),
        "an interrupt after only 10 oracle calls should not have finished a 4-bit problem"
    );

    // Resume: fresh knowledge base loaded from the saved file, fresh oracle and model, no
    // interrupt this time, running to completion.
    let mut kb2: KnowledgeBase<()> = KnowledgeBase::with_file(N, path.clone()).unwrap();
    let mut oracle2: Oracle<(), _> =
        Oracle::new(FnPredicate(move |v: &SparseSet| v.weight() <= PARAM));
    let model2: SatModel<BatSatBackend> = SatModel::new("batsat");
    let mut learner2 = GainanovSat::new(Sense::Min, model2);
    let outcome2 = learner2.learn(&mut kb2, &mut oracle2).unwrap();
    assert_eq!(outcome2, LearnOutcome::Complete);

    let expected_uppers: std::collections::HashSet<SparseSet> = (0u32..N as u32)
        .map(|skip| SparseSet::from_iter((0..N as u32).filter(|&i| i != skip)))
        .collect();
    let uppers: std::collections::HashSet<_> = kb2.iter_upper().cloned().collect();
    assert_eq!(uppers, expected_uppers);
    assert!(kb2.iter_lower().all(|v| v.weight() <= PARAM));
}
