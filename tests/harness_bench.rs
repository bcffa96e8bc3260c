use parbench::{
    bench_sequential, efficiency, execute, run_benchmark, run_sequential, verify, CombinerKind,
    EvenCount, IndexSum, IterationDomain, ScheduleSpec, Verdict,
};

fn xorshift64(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}

#[test]
fn test_sum_4950_independent_of_policy_and_combiner() {
    let domain = IterationDomain::of_len(100);
    for spec in [
        ScheduleSpec::static_equal(),
        ScheduleSpec::static_chunked(8),
        ScheduleSpec::dynamic(1),
        ScheduleSpec::dynamic(16),
        ScheduleSpec::guided(1),
    ] {
        for kind in [CombinerKind::Critical, CombinerKind::Reduction] {
            let measured = run_benchmark(domain, spec, 4, kind, &IndexSum, 1).unwrap();
            assert_eq!(measured.record.result, 4950, "{spec:?} {kind:?}");
        }
    }
}

#[test]
fn test_even_counting_deterministic_combiners_agree() {
    let mut state = 0x5eed_u64;
    let values: Vec<i32> = (0..1_000_000)
        .map(|_| (xorshift64(&mut state) % 1000) as i32)
        .collect();
    let reducer = EvenCount { values: &values };
    let domain = IterationDomain::of_len(values.len());

    let expected = run_sequential(domain, &reducer);
    let workers = num_cpus::get().max(2);

    for kind in [CombinerKind::Critical, CombinerKind::Reduction] {
        let measured = run_benchmark(
            domain,
            ScheduleSpec::static_equal(),
            workers,
            kind,
            &reducer,
            1,
        )
        .unwrap();
        assert_eq!(measured.record.result, expected, "{kind:?}");
        assert_eq!(
            verify(kind, expected, measured.record.result).unwrap(),
            Verdict::Consistent
        );
    }
}

#[test]
fn test_even_counting_racy_combiner_never_errors() {
    let mut state = 0x1234_u64;
    let values: Vec<i32> = (0..1_000_000)
        .map(|_| (xorshift64(&mut state) % 1000) as i32)
        .collect();
    let reducer = EvenCount { values: &values };
    let domain = IterationDomain::of_len(values.len());

    let expected = run_sequential(domain, &reducer);
    let workers = num_cpus::get().max(2);
    let measured = run_benchmark(
        domain,
        ScheduleSpec::static_equal(),
        workers,
        CombinerKind::Unsynchronized,
        &reducer,
        1,
    )
    .unwrap();

    // Divergence is data, never an error; lost updates can only undercount.
    let verdict = verify(CombinerKind::Unsynchronized, expected, measured.record.result).unwrap();
    match verdict {
        Verdict::Consistent => {}
        Verdict::RaceObserved { expected, observed } => {
            assert!(observed <= expected);
        }
    }
}

#[test]
fn test_guided_on_empty_domain_yields_identity() {
    let domain = IterationDomain::of_len(0);
    let measured = run_benchmark(
        domain,
        ScheduleSpec::guided(1),
        4,
        CombinerKind::Reduction,
        &IndexSum,
        1,
    )
    .unwrap();
    assert_eq!(measured.record.result, 0);
}

#[test]
fn test_single_worker_matches_sequential() {
    let domain = IterationDomain::of_len(100_000);
    let seq = bench_sequential(domain, &IndexSum, 1).unwrap();
    for kind in [CombinerKind::Critical, CombinerKind::Reduction] {
        let measured = run_benchmark(
            domain,
            ScheduleSpec::static_equal(),
            1,
            kind,
            &IndexSum,
            1,
        )
        .unwrap();
        assert_eq!(measured.record.result, seq.result);
        assert_eq!(measured.actual_workers, 1);
    }
    // With one granted worker a speedup of 1.0 is 100% efficiency by definition.
    assert_eq!(efficiency(1.0, 1), 100.0);
}

#[test]
fn test_config_errors_surface_per_run() {
    let domain = IterationDomain::of_len(100);
    assert!(run_benchmark(
        domain,
        ScheduleSpec::dynamic(0),
        4,
        CombinerKind::Reduction,
        &IndexSum,
        1,
    )
    .is_err());
    assert!(execute(
        domain,
        0,
        ScheduleSpec::static_equal(),
        &IndexSum,
        CombinerKind::Reduction,
    )
    .is_err());
}
