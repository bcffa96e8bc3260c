//! Parallel array reduction benchmarks.
//!
//! The library core partitions an iteration domain across worker threads
//! under a scheduling policy (static, dynamic, guided), combines per-worker
//! partial results (mutex-guarded, private reduction, or intentionally racy),
//! and times trials against a sequential baseline. Reporting, array content
//! and CLI parsing live in the binary.

pub mod combine;
pub mod domain;
pub mod error;
pub mod executor;
pub mod harness;
pub mod schedule;
pub mod verify;

pub use combine::{ArraySum, CombinerKind, EvenCount, IndexSum, Reducer, SpinWork};
pub use domain::IterationDomain;
pub use error::{Error, Result};
pub use executor::{execute, run_sequential, RunOutcome};
pub use harness::{bench_sequential, efficiency, run_benchmark, speedup, Measurement, TrialRecord};
pub use schedule::{Policy, ScheduleSpec, WorkAssignment};
pub use verify::{verify, Verdict};
