use chrono::Utc;

/// A source of wall-clock time in milliseconds since the Unix epoch.
///
/// The generator reads time only through this trait, so a deterministic
/// clock can be plugged in where the system clock is not wanted.
///
/// ```
/// use tsid_gen::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> i64 {
///         1_700_000_000_000
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1_700_000_000_000);
/// ```
pub trait TimeSource: Send + Sync {
    /// Returns the current time in milliseconds since 1970-01-01T00:00:00Z.
    fn current_millis(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    #[inline]
    fn current_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}
