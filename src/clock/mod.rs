use parking_lot::RwLock;
use serde::Serialize;
use std::{fmt, sync::Arc, time::Duration};

mod mock;
pub use self::mock::Mock;
mod monotonic;
pub use self::monotonic::Monotonic;
mod wall;
pub use self::wall::Wall;

pub(crate) const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A source of nanosecond readings.
///
/// Readings from one source are only comparable with each other: a monotonic source counts from
/// an arbitrary origin, a wall source counts from the Unix epoch.
pub trait ClockSource {
    fn now(&self) -> u64;
}

impl<T: ClockSource + ?Sized> ClockSource for Arc<T> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// An absolute point in time, as seconds and nanoseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Timestamp {
        Timestamp { seconds, nanos }
    }

    /// Builds a timestamp from nanoseconds since the Unix epoch.
    pub fn from_nanos(nanos: u64) -> Timestamp {
        Timestamp {
            seconds: (nanos / NANOS_PER_SEC) as i64,
            nanos: (nanos % NANOS_PER_SEC) as i32,
        }
    }

    pub fn as_nanos(&self) -> u64 {
        (self.seconds as u64) * NANOS_PER_SEC + self.nanos as u64
    }
}

/// Pairing of a wall-clock reading with a monotonic reading taken at the same instant.
#[derive(Clone, Debug, Default)]
pub struct Calibration {
    ref_time: u64,
    src_time: u64,
}

impl Calibration {
    pub fn new() -> Calibration {
        Default::default()
    }

    pub fn calibrate<R, S>(&mut self, reference: &R, source: &S)
    where
        R: ClockSource + ?Sized,
        S: ClockSource + ?Sized,
    {
        self.src_time = source.now();
        self.ref_time = reference.now();
    }

    fn is_stale(&self, src_now: u64, interval: u64) -> bool {
        src_now.saturating_sub(self.src_time) >= interval
    }

    fn timestamp(&self, src_now: u64) -> Timestamp {
        Timestamp::from_nanos(self.ref_time + src_now.saturating_sub(self.src_time))
    }
}

/// Hybrid clock producing absolute timestamps.
///
/// Elapsed time is measured with a monotonic source and added to the wall-clock reading taken at
/// the last calibration, so a wall-clock jump between calibrations does not skew durations.  The
/// calibration is refreshed once it is older than the recalibration interval, which bounds the
/// drift between the two sources.
///
/// Cloning a `Clock` is cheap and clones share their calibration.
#[derive(Clone)]
pub struct Clock {
    reference: Arc<dyn ClockSource + Send + Sync>,
    source: Arc<dyn ClockSource + Send + Sync>,
    cal: Arc<RwLock<Calibration>>,
    interval: u64,
}

impl Clock {
    pub fn new() -> Clock {
        Clock::with_interval(Duration::from_secs(60))
    }

    pub fn with_interval(interval: Duration) -> Clock {
        Clock::from_parts(Wall::new(), Monotonic::new(), interval)
    }

    /// Creates a clock from an explicit wall-clock reference and elapsed-time source.
    ///
    /// This is the seam for tests: pass two `Arc<Mock>` handles and drive them directly.
    pub fn from_parts<R, S>(reference: R, source: S, interval: Duration) -> Clock
    where
        R: ClockSource + Send + Sync + 'static,
        S: ClockSource + Send + Sync + 'static,
    {
        let mut cal = Calibration::new();
        cal.calibrate(&reference, &source);

        Clock {
            reference: Arc::new(reference),
            source: Arc::new(source),
            cal: Arc::new(RwLock::new(cal)),
            interval: interval.as_secs() * NANOS_PER_SEC + u64::from(interval.subsec_nanos()),
        }
    }

    pub fn recalibrate(&self) {
        self.cal.write().calibrate(&*self.reference, &*self.source);
    }

    pub fn now(&self) -> Timestamp {
        let src_now = self.source.now();
        {
            let cal = self.cal.read();
            if !cal.is_stale(src_now, self.interval) {
                return cal.timestamp(src_now);
            }
        }

        let mut cal = self.cal.write();
        if cal.is_stale(src_now, self.interval) {
            cal.calibrate(&*self.reference, &*self.source);
        }
        cal.timestamp(src_now)
    }
}

impl Default for Clock {
    fn default() -> Clock {
        Clock::new()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Clock")
            .field("cal", &*self.cal.read())
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, ClockSource, Mock, Monotonic, Timestamp, Wall};
    use std::{sync::Arc, time::Duration};

    const EPOCH: u64 = 1_500_000_000 * 1_000_000_000;

    fn mock_clock(interval: Duration) -> (Clock, Arc<Mock>, Arc<Mock>) {
        let wall = Arc::new(Mock::new(EPOCH));
        let mono = Arc::new(Mock::new(0));
        let clock = Clock::from_parts(wall.clone(), mono.clone(), interval);
        (clock, wall, mono)
    }

    #[test]
    fn test_timestamp_from_nanos() {
        let ts = Timestamp::from_nanos(1_500_000_000_123_456_789);
        assert_eq!(ts.seconds, 1_500_000_000);
        assert_eq!(ts.nanos, 123_456_789);
        assert_eq!(ts.as_nanos(), 1_500_000_000_123_456_789);
    }

    #[test]
    fn test_clock_adds_elapsed_to_calibration() {
        let (clock, _wall, mono) = mock_clock(Duration::from_secs(60));
        assert_eq!(clock.now(), Timestamp::new(1_500_000_000, 0));

        mono.increment(2_500_000_000);
        assert_eq!(clock.now(), Timestamp::new(1_500_000_002, 500_000_000));
    }

    #[test]
    fn test_clock_ignores_wall_jump_until_recalibration() {
        let (clock, wall, mono) = mock_clock(Duration::from_secs(60));

        // The wall clock leaps backwards; elapsed time keeps coming from the monotonic source.
        wall.set(EPOCH - 3_600 * 1_000_000_000);
        mono.increment(1_000_000_000);
        assert_eq!(clock.now(), Timestamp::new(1_500_000_001, 0));

        clock.recalibrate();
        assert_eq!(clock.now(), Timestamp::new(1_500_000_000 - 3_600, 0));
    }

    #[test]
    fn test_clock_recalibrates_after_interval() {
        let (clock, wall, mono) = mock_clock(Duration::from_secs(10));

        wall.increment(20 * 1_000_000_000 + 7);
        mono.increment(20 * 1_000_000_000);
        let ts = clock.now();
        assert_eq!(ts, Timestamp::new(1_500_000_020, 7));
    }

    #[test]
    fn test_real_sources_advance() {
        let mono = Monotonic::new();
        let a = mono.now();
        let b = mono.now();
        assert!(b >= a);

        let wall = Wall::new();
        assert!(wall.now() > EPOCH);

        let clock = Clock::new();
        assert!(clock.now().seconds > 1_500_000_000);
    }
}
