use crate::builder::Builder;
use crate::clock::TimeSource;
use crate::error::*;
use crate::tsid::*;
use chrono::{DateTime, Utc};
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// Internals of TsidGenerator.
/// This struct is not exposed to the public.
#[derive(Debug)]
pub(crate) struct Internals {
    /// Milliseconds since the custom epoch of the last issued id, -1 before the first.
    pub(crate) elapsed_time: i64,
    pub(crate) sequence: i64,
}

/// SharedTsid is shared between TsidGenerator handles.
/// This struct is not exposed to the public.
pub(crate) struct SharedTsid {
    pub(crate) worker_id: i64,
    pub(crate) process_id: i64,
    pub(crate) clock: Box<dyn TimeSource>,
    pub(crate) max_clock_regression: Duration,
    pub(crate) max_rollover_wait: Duration,
    pub(crate) clock_regression_warn_threshold: Duration,
    pub(crate) internals: Mutex<Internals>,
    pub(crate) sequence_rollovers: AtomicU64,
    pub(crate) clock_regressions: AtomicU64,
}

/// A stall past this long while waiting out an exhausted sequence is logged.
const ROLLOVER_WARN_THRESHOLD: Duration = Duration::from_millis(5);

/// Why `generate` is waiting on the clock.
#[derive(Debug, Clone, Copy)]
enum Stall {
    /// The clock reads earlier than the last issued timestamp.
    ClockRegression,
    /// All sequence numbers of the last millisecond are issued.
    SequenceRollover,
}

/// Counters for the slow paths of [`TsidGenerator::generate`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorStats {
    /// Times the sequence was exhausted and generation moved to the next millisecond.
    pub sequence_rollovers: u64,
    /// Times the clock was observed behind the last issued timestamp.
    pub clock_regressions: u64,
}

/// TsidGenerator is a time-sorted unique ID generator.
/// It is thread-safe and can be cloned to be used in multiple threads;
/// clones share the same sequence state.
pub struct TsidGenerator(pub(crate) Arc<SharedTsid>);

impl TsidGenerator {
    /// Create a new TsidGenerator for the given worker and process ids,
    /// each of which must lie in `[0, 31]`.
    /// For custom configuration see [`builder`].
    ///
    /// [`builder`]: struct.TsidGenerator.html#method.builder
    pub fn new(worker_id: i32, process_id: i32) -> Result<Self, Error> {
        Builder::new()
            .worker_id(worker_id)
            .process_id(process_id)
            .finalize()
    }

    /// Create a new [`Builder`] to construct a TsidGenerator.
    ///
    /// [`Builder`]: struct.Builder.html
    pub fn builder() -> Builder {
        Builder::new()
    }

    pub(crate) fn new_inner(shared: Arc<SharedTsid>) -> Self {
        Self(shared)
    }

    /// Returns the worker ID encoded into every id.
    pub fn worker_id(&self) -> i64 {
        self.0.worker_id
    }

    /// Returns the process ID encoded into every id.
    pub fn process_id(&self) -> i64 {
        self.0.process_id
    }

    /// Returns a snapshot of the slow-path counters.
    pub fn stats(&self) -> GeneratorStats {
        GeneratorStats {
            sequence_rollovers: self.0.sequence_rollovers.load(Ordering::Relaxed),
            clock_regressions: self.0.clock_regressions.load(Ordering::Relaxed),
        }
    }

    /// Generate the next unique id.
    ///
    /// If the clock is behind the last issued timestamp, the call stalls
    /// until it catches up; if the sequence of the current millisecond is
    /// exhausted, it stalls until the next millisecond. A regression stall
    /// longer than the configured maximum returns [`Error::ClockMovedBackwards`],
    /// a rollover stall returns [`Error::ClockStalled`], and once the 41-bit
    /// time field is exhausted every call returns [`Error::OverTimeLimit`].
    /// A failed call leaves the sequence state as it was.
    pub fn generate(&self) -> Result<i64, Error> {
        let mut internals = self.0.internals.lock().map_err(|_| Error::MutexPoisoned)?;
        let last = internals.elapsed_time;

        let mut current = self.current_elapsed_time()?;
        if current < last {
            self.0.clock_regressions.fetch_add(1, Ordering::Relaxed);
            current = self.wait_until(Stall::ClockRegression, last, last)?;
        }

        let (elapsed_time, sequence) = if current == last {
            let sequence = (internals.sequence + 1) & MAX_SEQUENCE;
            if sequence == 0 {
                self.0.sequence_rollovers.fetch_add(1, Ordering::Relaxed);
                debug!(
                    elapsed_time = last,
                    "sequence exhausted, waiting for the next millisecond"
                );
                (self.wait_until(Stall::SequenceRollover, last, last + 1)?, 0)
            } else {
                (last, sequence)
            }
        } else {
            (current, 0)
        };
        internals.elapsed_time = elapsed_time;
        internals.sequence = sequence;

        Ok(elapsed_time << SHIFT_TIME
            | self.0.worker_id << SHIFT_WORKER_ID
            | self.0.process_id << SHIFT_PROCESS_ID
            | sequence)
    }

    /// Same as [`generate`](Self::generate), wrapped in a [`Tsid`].
    pub fn generate_tsid(&self) -> Result<Tsid, Error> {
        self.generate().map(Tsid::from)
    }

    /// Parse an id into `[timestamp, worker_id, process_id, sequence]`; see [`parse`](crate::parse).
    pub fn parse(id: i64) -> [i64; 4] {
        parse(id)
    }

    /// See [`generated_at`](crate::generated_at).
    pub fn generated_at(id: i64) -> DateTime<Utc> {
        generated_at(id)
    }

    /// Returns the current elapsed time in milliseconds since the custom epoch.
    fn current_elapsed_time(&self) -> Result<i64, Error> {
        let elapsed = self.0.clock.current_millis() - CUSTOM_EPOCH_MS;
        if !(0..=MAX_ELAPSED_TIME).contains(&elapsed) {
            return Err(Error::OverTimeLimit);
        }
        Ok(elapsed)
    }

    /// Blocks until the clock reaches `target`, returning the observed time.
    fn wait_until(&self, stall: Stall, last: i64, target: i64) -> Result<i64, Error> {
        let (warn_threshold, max_wait) = match stall {
            Stall::ClockRegression => (
                self.0.clock_regression_warn_threshold,
                self.0.max_clock_regression,
            ),
            Stall::SequenceRollover => (ROLLOVER_WARN_THRESHOLD, self.0.max_rollover_wait),
        };

        let started = Instant::now();
        let mut warned = false;
        loop {
            let current = self.current_elapsed_time()?;
            if current >= target {
                return Ok(current);
            }

            let stalled = started.elapsed();
            if !warned && stalled >= warn_threshold {
                let stalled_ms = stalled.as_millis() as u64;
                match stall {
                    Stall::ClockRegression => warn!(
                        last,
                        current,
                        stalled_ms,
                        "clock is behind the last issued timestamp, stalling id generation"
                    ),
                    Stall::SequenceRollover => warn!(
                        last,
                        current,
                        stalled_ms,
                        "sequence exhausted and clock has not advanced, stalling id generation"
                    ),
                }
                warned = true;
            }
            if stalled >= max_wait {
                return Err(match stall {
                    Stall::ClockRegression => Error::ClockMovedBackwards { last, current },
                    Stall::SequenceRollover => Error::ClockStalled { last, current },
                });
            }

            let behind = (target - current) as u64;
            if behind > 1 {
                thread::sleep(Duration::from_millis(behind - 1).min(max_wait - stalled));
            } else {
                thread::yield_now();
            }
        }
    }
}

/// Returns a new `TsidGenerator` referencing the same state as `self`.
/// This is used for concurrent use.
impl Clone for TsidGenerator {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl fmt::Debug for TsidGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TsidGenerator")
            .field("worker_id", &self.0.worker_id)
            .field("process_id", &self.0.process_id)
            .field("stats", &self.stats())
            .finish()
    }
}
