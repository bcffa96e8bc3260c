use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::IterationDomain;
use crate::error::{Error, Result};

/// How iterations are mapped onto workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// `W` contiguous blocks of `ceil(N/W)`, fixed before execution.
    StaticEqual,
    /// Contiguous chunks of a fixed size, chunk `i` goes to worker `i mod W`.
    StaticChunked,
    /// Workers claim the next fixed-size chunk from a shared cursor.
    DynamicChunked,
    /// Like dynamic, but claim size is `max(chunk, remaining / W)` and shrinks.
    Guided,
}

impl Policy {
    pub fn label(&self) -> &'static str {
        match self {
            Policy::StaticEqual => "static",
            Policy::StaticChunked => "static-chunked",
            Policy::DynamicChunked => "dynamic",
            Policy::Guided => "guided",
        }
    }

    fn needs_chunk_size(&self) -> bool {
        !matches!(self, Policy::StaticEqual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSpec {
    pub policy: Policy,
    /// Chunk size for the chunked policies. Ignored by `StaticEqual`,
    /// where 0 means "divide evenly among workers".
    pub chunk_size: usize,
}

impl ScheduleSpec {
    pub fn static_equal() -> Self {
        Self {
            policy: Policy::StaticEqual,
            chunk_size: 0,
        }
    }

    pub fn static_chunked(chunk_size: usize) -> Self {
        Self {
            policy: Policy::StaticChunked,
            chunk_size,
        }
    }

    pub fn dynamic(chunk_size: usize) -> Self {
        Self {
            policy: Policy::DynamicChunked,
            chunk_size,
        }
    }

    pub fn guided(chunk_size: usize) -> Self {
        Self {
            policy: Policy::Guided,
            chunk_size,
        }
    }

    pub fn validate(&self, workers: usize) -> Result<()> {
        if workers < 1 {
            return Err(Error::Config("worker count must be at least 1".into()));
        }
        if self.policy.needs_chunk_size() && self.chunk_size == 0 {
            return Err(Error::Config(format!(
                "{} schedule requires a chunk size of at least 1",
                self.policy.label()
            )));
        }
        Ok(())
    }

    /// Builds the per-trial scheduling state. Static policies produce a fixed
    /// assignment; dynamic and guided produce a fresh shared claim cursor.
    pub fn plan(&self, domain: IterationDomain, workers: usize) -> Result<Plan> {
        self.validate(workers)?;
        match self.policy {
            Policy::StaticEqual => Ok(Plan::Assigned(assign_equal(domain, workers))),
            Policy::StaticChunked => Ok(Plan::Assigned(assign_chunked(
                domain,
                workers,
                self.chunk_size,
            ))),
            Policy::DynamicChunked => Ok(Plan::Shared(ChunkCursor::new(
                domain,
                workers,
                self.chunk_size,
                false,
            ))),
            Policy::Guided => Ok(Plan::Shared(ChunkCursor::new(
                domain,
                workers,
                self.chunk_size,
                true,
            ))),
        }
    }
}

/// Per-trial scheduling state.
pub enum Plan {
    Assigned(WorkAssignment),
    Shared(ChunkCursor),
}

/// Ordered `(worker, subrange)` pairs. The subranges exactly partition the
/// domain: no gap, no overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkAssignment {
    pairs: Vec<(usize, IterationDomain)>,
}

impl WorkAssignment {
    pub fn pairs(&self) -> &[(usize, IterationDomain)] {
        &self.pairs
    }

    /// Subranges assigned to one worker, in claim order.
    pub fn ranges_for(&self, worker: usize) -> impl Iterator<Item = IterationDomain> + '_ {
        self.pairs
            .iter()
            .filter(move |(w, _)| *w == worker)
            .map(|(_, r)| *r)
    }

    /// True when the pairs cover `domain` exactly, in order, without overlap.
    pub fn partitions(&self, domain: IterationDomain) -> bool {
        let mut next = domain.start();
        for (_, range) in &self.pairs {
            if range.start() != next || range.is_empty() {
                return false;
            }
            next = range.end();
        }
        next == domain.end()
    }
}

fn assign_equal(domain: IterationDomain, workers: usize) -> WorkAssignment {
    let n = domain.len();
    let block = n.div_ceil(workers);
    let mut pairs = Vec::with_capacity(workers);
    for worker in 0..workers {
        let start = domain.start() + (worker * block).min(n);
        let end = domain.start() + ((worker + 1) * block).min(n);
        if start < end {
            pairs.push((worker, IterationDomain::span(start, end)));
        }
    }
    WorkAssignment { pairs }
}

fn assign_chunked(domain: IterationDomain, workers: usize, chunk_size: usize) -> WorkAssignment {
    let mut pairs = Vec::new();
    let mut start = domain.start();
    let mut chunk_index = 0;
    while start < domain.end() {
        let end = (start + chunk_size).min(domain.end());
        pairs.push((chunk_index % workers, IterationDomain::span(start, end)));
        start = end;
        chunk_index += 1;
    }
    WorkAssignment { pairs }
}

/// Shared claim cursor for the dynamic and guided policies.
///
/// This is the only shared mutable scheduling state. Claims go through an
/// atomic exclusive-claim operation; a plain read-then-write here would lose
/// iterations exactly like an unsynchronized accumulator loses updates. A
/// cursor is built fresh for every trial and never reused across runs.
pub struct ChunkCursor {
    next: AtomicUsize,
    end: usize,
    chunk_size: usize,
    workers: usize,
    guided: bool,
}

impl ChunkCursor {
    fn new(domain: IterationDomain, workers: usize, chunk_size: usize, guided: bool) -> Self {
        Self {
            next: AtomicUsize::new(domain.start()),
            end: domain.end(),
            chunk_size,
            workers,
            guided,
        }
    }

    /// Claims the next subrange, or `None` once the domain is exhausted.
    ///
    /// Dynamic claims are a single `fetch_add`; guided claims size themselves
    /// from the remaining work, so they use a CAS loop instead.
    pub fn claim(&self) -> Option<IterationDomain> {
        if self.guided {
            return self.claim_guided();
        }
        let start = self.next.fetch_add(self.chunk_size, Ordering::AcqRel);
        if start >= self.end {
            return None;
        }
        Some(IterationDomain::span(
            start,
            (start + self.chunk_size).min(self.end),
        ))
    }

    fn claim_guided(&self) -> Option<IterationDomain> {
        let mut current = self.next.load(Ordering::Acquire);
        loop {
            if current >= self.end {
                return None;
            }
            let remaining = self.end - current;
            let take = (remaining / self.workers)
                .max(self.chunk_size)
                .min(remaining);
            match self.next.compare_exchange_weak(
                current,
                current + take,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(IterationDomain::span(current, current + take)),
                Err(observed) => current = observed,
            }
        }
    }
}
