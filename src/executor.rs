use std::sync::{Mutex, PoisonError};
use std::thread;

use crate::combine::{AtomicBits, CombinerKind, RacyCell, Reducer};
use crate::domain::IterationDomain;
use crate::error::{Error, Result};
use crate::schedule::{Plan, ScheduleSpec};

/// Result of one parallel run.
#[derive(Debug, Clone, Copy)]
pub struct RunOutcome<A> {
    pub result: A,
    /// Workers actually spawned and joined. Always `>= 1` on success.
    pub actual_workers: usize,
}

/// Sequential baseline: a direct fold, no workers, no combiner.
pub fn run_sequential<R: Reducer>(domain: IterationDomain, reducer: &R) -> R::Acc {
    let mut acc = reducer.identity();
    for i in domain.indices() {
        acc = reducer.combine(acc, reducer.map(i));
    }
    acc
}

/// Runs `reducer` over `domain` on `workers` threads under `spec`, merging
/// partial results according to `kind`. Blocks until every worker has joined;
/// the join establishes happens-before for all worker writes. A panicking
/// worker surfaces as `ExecutionError` after the remaining workers finish —
/// no retry, no partial result.
pub fn execute<R>(
    domain: IterationDomain,
    workers: usize,
    spec: ScheduleSpec,
    reducer: &R,
    kind: CombinerKind,
) -> Result<RunOutcome<R::Acc>>
where
    R: Reducer,
    R::Acc: AtomicBits,
{
    let plan = spec.plan(domain, workers)?;

    let global = Mutex::new(reducer.identity());
    let racy = RacyCell::new(reducer.identity());
    let partials: Mutex<Vec<R::Acc>> = Mutex::new(Vec::with_capacity(workers));

    let fault = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        let mut fault: Option<String> = None;

        for worker in 0..workers {
            let plan = &plan;
            let global = &global;
            let racy = &racy;
            let partials = &partials;
            let builder = thread::Builder::new().name(format!("parbench-{worker}"));
            let spawned = builder.spawn_scoped(scope, move || match kind {
                CombinerKind::Critical => {
                    for_each_range(plan, worker, |range| {
                        for i in range.indices() {
                            let contribution = reducer.map(i);
                            let mut guard =
                                global.lock().expect("shared accumulator lock poisoned");
                            *guard = reducer.combine(*guard, contribution);
                        }
                    });
                }
                CombinerKind::Reduction => {
                    let mut local = reducer.identity();
                    for_each_range(plan, worker, |range| {
                        for i in range.indices() {
                            local = reducer.combine(local, reducer.map(i));
                        }
                    });
                    partials
                        .lock()
                        .expect("partials lock poisoned")
                        .push(local);
                }
                CombinerKind::Unsynchronized => {
                    for_each_range(plan, worker, |range| {
                        for i in range.indices() {
                            // Non-atomic read-modify-write: the race under test.
                            let current = racy.load();
                            racy.store(reducer.combine(current, reducer.map(i)));
                        }
                    });
                }
            });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    fault = Some(format!("failed to spawn worker {worker}: {e}"));
                    break;
                }
            }
        }

        // Join everything that did spawn, even on a fault, so no worker
        // outlives the run.
        for (worker, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() && fault.is_none() {
                fault = Some(format!("worker {worker} panicked"));
            }
        }
        fault
    });

    if let Some(message) = fault {
        return Err(Error::Execution(message));
    }

    let result = match kind {
        CombinerKind::Critical => global
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner),
        CombinerKind::Reduction => {
            let partials = partials.into_inner().unwrap_or_else(PoisonError::into_inner);
            partials
                .into_iter()
                .fold(reducer.identity(), |a, b| reducer.combine(a, b))
        }
        CombinerKind::Unsynchronized => racy.load(),
    };

    Ok(RunOutcome {
        result,
        actual_workers: workers,
    })
}

fn for_each_range(plan: &Plan, worker: usize, mut body: impl FnMut(IterationDomain)) {
    match plan {
        Plan::Assigned(assignment) => {
            for range in assignment.ranges_for(worker) {
                body(range);
            }
        }
        Plan::Shared(cursor) => {
            while let Some(range) = cursor.claim() {
                body(range);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::IndexSum;

    /// Reducer whose map panics at one index, for fault propagation tests.
    struct PanicAt {
        at: usize,
    }

    impl Reducer for PanicAt {
        type Acc = i64;

        fn identity(&self) -> i64 {
            0
        }

        fn map(&self, index: usize) -> i64 {
            assert_ne!(index, self.at, "poisoned iteration");
            index as i64
        }

        fn combine(&self, a: i64, b: i64) -> i64 {
            a + b
        }
    }

    #[test]
    fn test_sum_matches_sequential_across_kinds() {
        let domain = IterationDomain::of_len(100);
        let expected = run_sequential(domain, &IndexSum);
        assert_eq!(expected, 4950);
        for kind in [CombinerKind::Critical, CombinerKind::Reduction] {
            for spec in [
                ScheduleSpec::static_equal(),
                ScheduleSpec::static_chunked(3),
                ScheduleSpec::dynamic(7),
                ScheduleSpec::guided(1),
            ] {
                let outcome = execute(domain, 4, spec, &IndexSum, kind).unwrap();
                assert_eq!(outcome.result, expected, "{kind:?} {spec:?}");
                assert_eq!(outcome.actual_workers, 4);
            }
        }
    }

    #[test]
    fn test_offset_domain() {
        let domain = IterationDomain::new(10, 20).unwrap();
        let outcome = execute(
            domain,
            3,
            ScheduleSpec::static_equal(),
            &IndexSum,
            CombinerKind::Reduction,
        )
        .unwrap();
        assert_eq!(outcome.result, (10..20).sum::<i64>());
    }

    #[test]
    fn test_single_worker_unsynchronized_is_exact() {
        // No contention with one worker, so even the racy cell is correct.
        let domain = IterationDomain::of_len(1000);
        let outcome = execute(
            domain,
            1,
            ScheduleSpec::static_equal(),
            &IndexSum,
            CombinerKind::Unsynchronized,
        )
        .unwrap();
        assert_eq!(outcome.result, run_sequential(domain, &IndexSum));
        assert_eq!(outcome.actual_workers, 1);
    }

    #[test]
    fn test_empty_domain_yields_identity() {
        let domain = IterationDomain::of_len(0);
        for kind in [
            CombinerKind::Critical,
            CombinerKind::Reduction,
            CombinerKind::Unsynchronized,
        ] {
            let outcome = execute(domain, 4, ScheduleSpec::guided(1), &IndexSum, kind).unwrap();
            assert_eq!(outcome.result, 0);
        }
    }

    #[test]
    fn test_worker_panic_becomes_execution_error() {
        let domain = IterationDomain::of_len(100);
        let err = execute(
            domain,
            4,
            ScheduleSpec::static_equal(),
            &PanicAt { at: 57 },
            CombinerKind::Reduction,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Execution(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let domain = IterationDomain::of_len(100);
        let err = execute(
            domain,
            0,
            ScheduleSpec::static_equal(),
            &IndexSum,
            CombinerKind::Reduction,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
