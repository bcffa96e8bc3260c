use std::fmt;
use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};

/// Associative, commutative fold over iteration indices.
///
/// `map` produces one iteration's contribution; `combine` merges two partial
/// results and must tolerate any grouping, since the dynamic and guided
/// schedules merge in a nondeterministic order. `identity` combined with
/// anything leaves it unchanged.
pub trait Reducer: Sync {
    type Acc: Copy + Send + Sync + PartialEq + fmt::Debug;

    fn identity(&self) -> Self::Acc;
    fn map(&self, index: usize) -> Self::Acc;
    fn combine(&self, a: Self::Acc, b: Self::Acc) -> Self::Acc;
}

/// How per-worker partial results reach the global result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinerKind {
    /// One shared accumulator behind a mutex, locked for every update.
    /// Correct by construction; contention grows with workers.
    Critical,
    /// Private per-worker accumulators, serially folded at the join barrier.
    Reduction,
    /// One shared accumulator updated with a non-atomic read-modify-write.
    /// Deliberately loses updates under contention; results are reported,
    /// never asserted.
    Unsynchronized,
}

impl CombinerKind {
    pub fn label(&self) -> &'static str {
        match self {
            CombinerKind::Critical => "critical",
            CombinerKind::Reduction => "reduction",
            CombinerKind::Unsynchronized => "unsynchronized",
        }
    }

    /// Whether this combiner must match the sequential baseline.
    pub fn is_deterministic(&self) -> bool {
        !matches!(self, CombinerKind::Unsynchronized)
    }
}

/// Accumulator types that fit one 64-bit atomic slot, so the racy combiner
/// can stage them in a `RacyCell`.
pub trait AtomicBits: Copy {
    fn to_bits(self) -> u64;
    fn from_bits(bits: u64) -> Self;
}

impl AtomicBits for i64 {
    fn to_bits(self) -> u64 {
        self as u64
    }

    fn from_bits(bits: u64) -> Self {
        bits as i64
    }
}

impl AtomicBits for u64 {
    fn to_bits(self) -> u64 {
        self
    }

    fn from_bits(bits: u64) -> Self {
        bits
    }
}

impl AtomicBits for f64 {
    fn to_bits(self) -> u64 {
        self.to_bits()
    }

    fn from_bits(bits: u64) -> Self {
        f64::from_bits(bits)
    }
}

/// Shared cell for the unsynchronized combiner.
///
/// Load and store are individually atomic (so reading it is not undefined
/// behavior), but the read-modify-write built from them is not: two workers
/// can load the same value and one increment vanishes. This reproduces the
/// classic lost-update race as observable data.
pub struct RacyCell<T: AtomicBits> {
    bits: AtomicU64,
    _marker: std::marker::PhantomData<T>,
}

impl<T: AtomicBits> RacyCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn load(&self) -> T {
        T::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: T) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// `value(i) = i`, summed.
pub struct IndexSum;

impl Reducer for IndexSum {
    type Acc = i64;

    fn identity(&self) -> i64 {
        0
    }

    fn map(&self, index: usize) -> i64 {
        index as i64
    }

    fn combine(&self, a: i64, b: i64) -> i64 {
        a + b
    }
}

/// Sum of a backing value array.
pub struct ArraySum<'a> {
    pub values: &'a [i32],
}

impl Reducer for ArraySum<'_> {
    type Acc = i64;

    fn identity(&self) -> i64 {
        0
    }

    fn map(&self, index: usize) -> i64 {
        self.values[index] as i64
    }

    fn combine(&self, a: i64, b: i64) -> i64 {
        a + b
    }
}

/// Count of even values in a backing array.
pub struct EvenCount<'a> {
    pub values: &'a [i32],
}

impl Reducer for EvenCount<'_> {
    type Acc = i64;

    fn identity(&self) -> i64 {
        0
    }

    fn map(&self, index: usize) -> i64 {
        i64::from(self.values[index] % 2 == 0)
    }

    fn combine(&self, a: i64, b: i64) -> i64 {
        a + b
    }
}

/// Synthetic uneven workload: iteration `i` spins for `base + i*i/divisor`
/// steps, so late iterations cost far more than early ones. Used to expose
/// the load imbalance the dynamic and guided schedules exist to fix.
pub struct SpinWork {
    pub base: u32,
    pub divisor: u32,
}

impl SpinWork {
    pub fn new(base: u32, divisor: u32) -> Self {
        Self { base, divisor }
    }
}

impl Reducer for SpinWork {
    type Acc = f64;

    fn identity(&self) -> f64 {
        0.0
    }

    fn map(&self, index: usize) -> f64 {
        let i = index as u64;
        let steps = self.base as u64 + i * i / self.divisor as u64;
        let mut acc = 0.0f64;
        for k in 0..steps {
            acc += (i.wrapping_mul(1_315_423_911).wrapping_add(k.wrapping_mul(2_654_435_761)))
                as f64
                * 1e-12;
            acc -= (k & 7) as f64 * 1e-12;
        }
        black_box(acc)
    }

    fn combine(&self, a: f64, b: f64) -> f64 {
        a + b
    }
}
