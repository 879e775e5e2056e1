use crate::clock::{ClockSource, NANOS_PER_SEC};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time in nanoseconds since the Unix epoch.
#[derive(Clone, Debug, Default)]
pub struct Wall;

impl Wall {
    pub fn new() -> Self {
        Wall {}
    }
}

impl ClockSource for Wall {
    fn now(&self) -> u64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() * NANOS_PER_SEC + u64::from(d.subsec_nanos()),
            Err(_) => 0,
        }
    }
}
