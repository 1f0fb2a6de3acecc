use crate::clock::{SystemClock, TimeSource};
use crate::error::Error;
use crate::generator::{Internals, SharedTsid, TsidGenerator};
use crate::tsid::{MAX_PROCESS_ID, MAX_WORKER_ID};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Environment variable read by [`Builder::from_env`] for the worker id.
pub const ENV_WORKER_ID: &str = "TSID_WORKER_ID";
/// Environment variable read by [`Builder::from_env`] for the process id.
pub const ENV_PROCESS_ID: &str = "TSID_PROCESS_ID";

const DEFAULT_WORKER_ID: i64 = 1;
const DEFAULT_PROCESS_ID: i64 = 1;
const DEFAULT_MAX_CLOCK_REGRESSION: Duration = Duration::from_secs(1);
const DEFAULT_MAX_ROLLOVER_WAIT: Duration = Duration::from_secs(1);
const DEFAULT_CLOCK_REGRESSION_WARN_THRESHOLD: Duration = Duration::from_millis(5);

/// A builder for building the [`TsidGenerator`].
///
/// [`TsidGenerator`]: struct.TsidGenerator.html
pub struct Builder {
    worker_id: i64,
    process_id: i64,
    clock: Box<dyn TimeSource>,
    max_clock_regression: Duration,
    max_rollover_wait: Duration,
    clock_regression_warn_threshold: Duration,
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Builder {
    /// Construct a new builder for the build of [`TsidGenerator`].
    ///
    /// Worker and process ids default to 1, time comes from the system clock.
    ///
    /// [`TsidGenerator`]: struct.TsidGenerator.html
    pub fn new() -> Self {
        Self {
            worker_id: DEFAULT_WORKER_ID,
            process_id: DEFAULT_PROCESS_ID,
            clock: Box::new(SystemClock),
            max_clock_regression: DEFAULT_MAX_CLOCK_REGRESSION,
            max_rollover_wait: DEFAULT_MAX_ROLLOVER_WAIT,
            clock_regression_warn_threshold: DEFAULT_CLOCK_REGRESSION_WARN_THRESHOLD,
        }
    }

    /// Construct a builder with worker and process ids taken from the
    /// `TSID_WORKER_ID` and `TSID_PROCESS_ID` environment variables.
    /// Unset variables keep the defaults; values that are not integers fail.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut builder = Self::new();
        if let Some(value) = var(ENV_WORKER_ID) {
            builder.worker_id = parse_id("worker_id", &value)?;
        }
        if let Some(value) = var(ENV_PROCESS_ID) {
            builder.process_id = parse_id("process_id", &value)?;
        }
        Ok(builder)
    }

    /// Set the worker ID.
    /// If it is outside `[0, 31]`, 'finalize' will fail.
    pub fn worker_id(mut self, worker_id: i32) -> Self {
        self.worker_id = i64::from(worker_id);
        self
    }

    /// Set the process ID.
    /// If it is outside `[0, 31]`, 'finalize' will fail.
    pub fn process_id(mut self, process_id: i32) -> Self {
        self.process_id = i64::from(process_id);
        self
    }

    /// Set the time source.
    pub fn clock(mut self, clock: impl TimeSource + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Set how long `generate` may stall waiting for a clock that went
    /// backwards before giving up with an error.
    pub fn max_clock_regression(mut self, max_clock_regression: Duration) -> Self {
        self.max_clock_regression = max_clock_regression;
        self
    }

    /// Set how long `generate` may wait for the clock to leave a millisecond
    /// whose sequence is exhausted before giving up with an error.
    pub fn max_rollover_wait(mut self, max_rollover_wait: Duration) -> Self {
        self.max_rollover_wait = max_rollover_wait;
        self
    }

    /// Set how long a clock regression stall lasts before it is logged as a warning.
    pub fn clock_regression_warn_threshold(mut self, threshold: Duration) -> Self {
        self.clock_regression_warn_threshold = threshold;
        self
    }

    /// Finish building and create a TsidGenerator instance.
    /// This method will return an error if the worker or process ID is out of range.
    pub fn finalize(self) -> Result<TsidGenerator, Error> {
        check_range("worker_id", self.worker_id, MAX_WORKER_ID)?;
        check_range("process_id", self.process_id, MAX_PROCESS_ID)?;

        debug!(
            worker_id = self.worker_id,
            process_id = self.process_id,
            "tsid generator configured"
        );

        let shared = Arc::new(SharedTsid {
            worker_id: self.worker_id,
            process_id: self.process_id,
            clock: self.clock,
            max_clock_regression: self.max_clock_regression,
            max_rollover_wait: self.max_rollover_wait,
            clock_regression_warn_threshold: self.clock_regression_warn_threshold,
            internals: Mutex::new(Internals {
                elapsed_time: -1,
                sequence: 0,
            }),
            sequence_rollovers: AtomicU64::new(0),
            clock_regressions: AtomicU64::new(0),
        });
        Ok(TsidGenerator::new_inner(shared))
    }
}

fn check_range(field: &'static str, value: i64, max: i64) -> Result<(), Error> {
    if !(0..=max).contains(&value) {
        return Err(Error::InvalidConfiguration {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn parse_id(field: &'static str, value: &str) -> Result<i64, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidConfiguration {
            field,
            value: value.to_string(),
        })
}
