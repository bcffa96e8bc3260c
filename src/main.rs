use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use parbench::{
    bench_sequential, efficiency, run_benchmark, speedup, verify, ArraySum, CombinerKind,
    EvenCount, IterationDomain, Measurement, ScheduleSpec, SpinWork, Verdict,
};

#[derive(Parser, Debug)]
#[command(name = "parbench")]
#[command(about = "Parallel array reduction benchmarks: scheduling, combining, races", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Number of worker threads (defaults to number of CPU cores)
    #[arg(short = 'j', long, global = true)]
    threads: Option<usize>,

    /// Timed trials per configuration; the best time is kept
    #[arg(short, long, global = true, default_value_t = 3)]
    trials: usize,

    /// Disable progress bar
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sum an array with value[i] = i: sequential vs critical-section vs reduction
    Sum {
        /// Number of array elements
        #[arg(short, long, default_value_t = 100_000_000)]
        size: usize,
    },
    /// Uneven per-iteration workload across static/dynamic/guided schedules
    Schedule {
        /// Number of iterations
        #[arg(short, long, default_value_t = 5_000)]
        size: usize,
    },
    /// Count even values, including the intentionally racy accumulator
    CountEvens {
        /// Number of array elements
        #[arg(short, long, default_value_t = 10_000_000)]
        size: usize,

        /// Seed for the value generator
        #[arg(long, default_value_t = 0x5eed)]
        seed: u64,
    },
    /// Scalability table across thread counts, with CSV output
    Scale {
        /// Number of array elements
        #[arg(short, long, default_value_t = 50_000_000)]
        size: usize,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let workers = args.threads.unwrap_or_else(num_cpus::get);
    if workers < 1 {
        anyhow::bail!("thread count must be at least 1");
    }
    if args.trials < 1 {
        anyhow::bail!("trial count must be at least 1");
    }

    match args.command {
        Command::Sum { size } => run_sum(size, workers, args.trials),
        Command::Schedule { size } => run_schedule(size, workers, args.trials),
        Command::CountEvens { size, seed } => run_count_evens(size, seed, workers, args.trials),
        Command::Scale { size } => run_scale(size, workers, args.trials, args.quiet),
    }
}

/// A config or execution failure skips one configuration; a correctness
/// mismatch halts the whole run.
fn report_or_skip(label: &str, result: parbench::Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e @ parbench::Error::Mismatch { .. }) => Err(e.into()),
        Err(e) => {
            eprintln!("skipping {label}: {e}");
            Ok(())
        }
    }
}

fn print_parallel_block(label: &str, m: &Measurement<i64>, sequential_best: f64) {
    let s = speedup(sequential_best, m.record.elapsed_seconds);
    println!("Parallel result ({label}): {}", m.record.result);
    println!("Parallel time ({label}): {:.6} s", m.record.elapsed_seconds);
    println!(
        "Speedup: {:.2}x, Efficiency: {:.2}% ({} of {} requested workers granted)",
        s,
        efficiency(s, m.actual_workers),
        m.actual_workers,
        m.requested_workers
    );
}

fn run_sum(size: usize, workers: usize, trials: usize) -> Result<()> {
    if size > i32::MAX as usize {
        anyhow::bail!("array values are i32; size must be at most {}", i32::MAX);
    }

    println!("Array size: {size} elements");
    println!("Worker threads: {workers}");
    println!();

    let values: Vec<i32> = (0..size).map(|i| i as i32).collect();
    let reducer = ArraySum { values: &values };
    let domain = IterationDomain::of_len(size);

    println!("=== SEQUENTIAL VERSION ===");
    let seq = bench_sequential(domain, &reducer, trials)?;
    println!("Sequential sum: {}", seq.result);
    println!("Sequential time: {:.6} s", seq.elapsed_seconds);
    println!();

    let spec = ScheduleSpec::static_equal();
    for kind in [CombinerKind::Critical, CombinerKind::Reduction] {
        println!("=== PARALLEL VERSION ({}) ===", kind.label());
        report_or_skip(kind.label(), {
            run_benchmark(domain, spec, workers, kind, &reducer, trials).and_then(|m| {
                print_parallel_block(kind.label(), &m, seq.elapsed_seconds);
                verify(kind, seq.result, m.record.result)?;
                println!("✓ result matches the sequential baseline");
                Ok(())
            })
        })?;
        println!();
    }

    Ok(())
}

fn run_schedule(size: usize, workers: usize, trials: usize) -> Result<()> {
    println!("Uneven Workload Simulation");
    println!("N = {size} iterations");
    println!("Worker threads: {workers}");
    println!("Work per iteration ~ i^2 scaled (BASE=40, DIV=2500)");
    println!();

    let reducer = SpinWork::new(40, 2500);
    let domain = IterationDomain::of_len(size);

    let configs = [
        ("static", ScheduleSpec::static_equal()),
        ("static,256", ScheduleSpec::static_chunked(256)),
        ("dynamic,1", ScheduleSpec::dynamic(1)),
        ("dynamic,64", ScheduleSpec::dynamic(64)),
        ("guided,1", ScheduleSpec::guided(1)),
        ("guided,64", ScheduleSpec::guided(64)),
    ];

    let seq = bench_sequential(domain, &reducer, trials)?;

    for (label, spec) in configs {
        report_or_skip(label, {
            run_benchmark(
                domain,
                spec,
                workers,
                CombinerKind::Reduction,
                &reducer,
                trials,
            )
            .map(|m| {
                println!(
                    "[{label}] best time: {:.6} s, total: {:.6}, speedup: {:.2}x",
                    m.record.elapsed_seconds,
                    m.record.result,
                    speedup(seq.elapsed_seconds, m.record.elapsed_seconds)
                );
            })
        })?;
    }

    println!();
    println!(
        "Sequential baseline: {:.6} s, total: {:.6}",
        seq.elapsed_seconds, seq.result
    );
    Ok(())
}

fn run_count_evens(size: usize, seed: u64, workers: usize, trials: usize) -> Result<()> {
    println!("Even Number Counting - Race Condition Analysis");
    println!("Array size: {size} elements");
    println!("Worker threads: {workers}");
    println!();

    let mut state = seed.max(1);
    let values: Vec<i32> = (0..size)
        .map(|_| (xorshift64(&mut state) % 1000) as i32)
        .collect();
    let reducer = EvenCount { values: &values };
    let domain = IterationDomain::of_len(size);

    println!("=== SEQUENTIAL VERSION ===");
    let seq = bench_sequential(domain, &reducer, trials)?;
    println!("Sequential count: {} even numbers", seq.result);
    println!("Sequential time: {:.6} s", seq.elapsed_seconds);
    println!();

    let spec = ScheduleSpec::static_equal();
    for kind in [
        CombinerKind::Critical,
        CombinerKind::Reduction,
        CombinerKind::Unsynchronized,
    ] {
        println!("=== PARALLEL VERSION ({}) ===", kind.label());
        report_or_skip(kind.label(), {
            run_benchmark(domain, spec, workers, kind, &reducer, trials).and_then(|m| {
                print_parallel_block(kind.label(), &m, seq.elapsed_seconds);
                match verify(kind, seq.result, m.record.result)? {
                    Verdict::Consistent if kind.is_deterministic() => {
                        println!("✓ count matches the sequential baseline");
                    }
                    Verdict::Consistent => {
                        println!("⚠ race did not manifest in this run");
                    }
                    Verdict::RaceObserved { expected, observed } => {
                        println!(
                            "✗ race observed: expected {expected}, observed {observed} ({} updates lost)",
                            expected - observed
                        );
                    }
                }
                Ok(())
            })
        })?;
        println!();
    }

    Ok(())
}

fn run_scale(size: usize, max_workers: usize, trials: usize, quiet: bool) -> Result<()> {
    const MODVAL: i64 = 1000;

    println!("Performance Analysis - Scalability Study");
    println!("Array size: {size} elements");
    println!("Maximum worker threads: {max_workers}");
    println!();

    let values: Vec<i32> = (0..size).map(|i| (i as i64 % MODVAL) as i32).collect();
    let reducer = ArraySum { values: &values };
    let domain = IterationDomain::of_len(size);

    // {1,2,4,8,16,32} capped at the maximum, plus the maximum itself.
    let mut counts: Vec<usize> = [1, 2, 4, 8, 16, 32]
        .into_iter()
        .filter(|&w| w <= max_workers)
        .collect();
    if !counts.contains(&max_workers) {
        counts.push(max_workers);
    }

    println!("=== SEQUENTIAL BASELINE ===");
    let seq = bench_sequential(domain, &reducer, trials)?;
    println!(
        "Sequential - Sum: {} (expected {}), Best Time over {} run(s): {:.6} s",
        seq.result,
        expected_mod_sum(size, MODVAL),
        trials,
        seq.elapsed_seconds
    );
    println!();

    let progress = if !quiet {
        Some(create_progress_bar(counts.len()))
    } else {
        None
    };

    println!("=== PARALLEL PERFORMANCE TESTING ===");
    let mut rows: Vec<Measurement<i64>> = Vec::new();
    for &requested in &counts {
        let label = format!("{requested} workers");
        report_or_skip(&label, {
            run_benchmark(
                domain,
                ScheduleSpec::static_equal(),
                requested,
                CombinerKind::Reduction,
                &reducer,
                trials,
            )
            .and_then(|m| {
                verify(CombinerKind::Reduction, seq.result, m.record.result)?;
                println!(
                    "Requested: {:2}, Actual: {:2}, Sum: {}, Best Time: {:.6} s",
                    m.requested_workers, m.actual_workers, m.record.result, m.record.elapsed_seconds
                );
                rows.push(m);
                Ok(())
            })
        })?;
        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }
    if let Some(ref pb) = progress {
        pb.finish_and_clear();
    }

    println!();
    println!("=== PERFORMANCE ANALYSIS TABLE ===");
    println!(
        "{:<8} {:<12} {:<10} {:<12} {:<12}",
        "Threads", "Time (sec)", "Speedup", "Efficiency", "Notes"
    );
    println!("------------------------------------------------------------");

    let mut best_speedup = 0.0f64;
    let mut best_threads = 0usize;
    for m in &rows {
        let s = speedup(seq.elapsed_seconds, m.record.elapsed_seconds);
        let e = efficiency(s, m.actual_workers);
        if s > best_speedup {
            best_speedup = s;
            best_threads = m.actual_workers;
        }
        let note = if e > 80.0 {
            "Excellent"
        } else if e > 60.0 {
            "Good"
        } else if e > 40.0 {
            "Fair"
        } else {
            "Poor"
        };
        println!(
            "{:<8} {:<12.4} {:<10.2} {:<11.2}% {}",
            m.actual_workers, m.record.elapsed_seconds, s, e, note
        );
    }

    if best_threads > 0 {
        println!();
        println!("=== OPTIMAL CONFIGURATION ===");
        println!("Best performance: {best_threads} threads");
        println!("Maximum speedup: {best_speedup:.2}x");
        println!(
            "Best efficiency: {:.2}%",
            efficiency(best_speedup, best_threads)
        );
    }

    println!();
    println!("=== TREND ANALYSIS ===");
    for pair in rows.windows(2) {
        let prev = speedup(seq.elapsed_seconds, pair[0].record.elapsed_seconds);
        let cur = speedup(seq.elapsed_seconds, pair[1].record.elapsed_seconds);
        if cur + 1e-9 < 0.95 * prev {
            println!(
                "- Performance degradation detected at {} threads ({prev:.2}x -> {cur:.2}x)",
                pair[1].actual_workers
            );
        }
    }

    println!();
    println!("=== CSV DATA FOR GRAPHING ===");
    println!("Threads,Time,Speedup,Efficiency");
    for m in &rows {
        let s = speedup(seq.elapsed_seconds, m.record.elapsed_seconds);
        println!(
            "{},{:.6},{:.2},{:.2}",
            m.actual_workers,
            m.record.elapsed_seconds,
            s,
            efficiency(s, m.actual_workers)
        );
    }

    Ok(())
}

fn create_progress_bar(configurations: usize) -> ProgressBar {
    let pb = ProgressBar::new(configurations as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} configurations ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

fn expected_mod_sum(n: usize, modval: i64) -> i64 {
    let cycle_sum = (modval - 1) * modval / 2;
    let cycles = n as i64 / modval;
    let rem = n as i64 % modval;
    cycles * cycle_sum + rem * (rem - 1) / 2
}

fn xorshift64(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}
