use std::hint::black_box;
use std::time::Instant;

use crate::combine::{AtomicBits, CombinerKind, Reducer};
use crate::domain::IterationDomain;
use crate::error::{Error, Result};
use crate::executor::{execute, run_sequential};
use crate::schedule::ScheduleSpec;

/// Best (minimum-time) trial of one configuration.
#[derive(Debug, Clone, Copy)]
pub struct TrialRecord<A> {
    pub elapsed_seconds: f64,
    pub result: A,
}

#[derive(Debug, Clone, Copy)]
pub struct Measurement<A> {
    pub requested_workers: usize,
    pub actual_workers: usize,
    pub record: TrialRecord<A>,
}

/// Times `trials` sequential passes and keeps the best, then recomputes the
/// reported result in a final untimed pass.
pub fn bench_sequential<R: Reducer>(
    domain: IterationDomain,
    reducer: &R,
    trials: usize,
) -> Result<TrialRecord<R::Acc>> {
    if trials < 1 {
        return Err(Error::Config("trial count must be at least 1".into()));
    }
    let mut best = f64::INFINITY;
    for _ in 0..trials {
        let started = Instant::now();
        black_box(run_sequential(domain, reducer));
        best = best.min(started.elapsed().as_secs_f64());
    }
    Ok(TrialRecord {
        elapsed_seconds: best,
        result: run_sequential(domain, reducer),
    })
}

/// Times `trials` parallel runs of one configuration, keeping the minimum
/// elapsed wall time. Scheduling state (including the dynamic/guided claim
/// cursor) and accumulators are rebuilt from identity for every trial. The
/// reported result comes from a final untimed verification pass, so timing
/// never depends on the value that gets reported.
pub fn run_benchmark<R>(
    domain: IterationDomain,
    spec: ScheduleSpec,
    workers: usize,
    kind: CombinerKind,
    reducer: &R,
    trials: usize,
) -> Result<Measurement<R::Acc>>
where
    R: Reducer,
    R::Acc: AtomicBits,
{
    if trials < 1 {
        return Err(Error::Config("trial count must be at least 1".into()));
    }
    let mut best = f64::INFINITY;
    for _ in 0..trials {
        let started = Instant::now();
        let outcome = execute(domain, workers, spec, reducer, kind)?;
        best = best.min(started.elapsed().as_secs_f64());
        black_box(outcome.result);
    }
    let verification = execute(domain, workers, spec, reducer, kind)?;
    Ok(Measurement {
        requested_workers: workers,
        actual_workers: verification.actual_workers,
        record: TrialRecord {
            elapsed_seconds: best,
            result: verification.result,
        },
    })
}

pub fn speedup(sequential_best: f64, parallel_best: f64) -> f64 {
    sequential_best / parallel_best
}

/// Speedup normalized by the platform-granted worker count, as a percentage.
pub fn efficiency(speedup: f64, actual_workers: usize) -> f64 {
    debug_assert!(actual_workers >= 1, "granted worker count must be positive");
    speedup / actual_workers as f64 * 100.0
}
