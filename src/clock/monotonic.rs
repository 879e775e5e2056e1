use crate::clock::ClockSource;

/// Monotonic time in nanoseconds from an arbitrary origin.
#[derive(Clone, Debug)]
pub struct Monotonic {
    #[cfg(windows)]
    hz_ratio: f64,
}

#[cfg(unix)]
impl Monotonic {
    pub fn new() -> Self {
        Monotonic {}
    }
}

#[cfg(unix)]
impl ClockSource for Monotonic {
    fn now(&self) -> u64 {
        use crate::clock::NANOS_PER_SEC;

        let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
        unsafe {
            libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
        }
        (ts.tv_sec as u64) * NANOS_PER_SEC + ts.tv_nsec as u64
    }
}

#[cfg(windows)]
impl Monotonic {
    pub fn new() -> Self {
        use std::mem;
        use winapi::um::profileapi;

        let hz = unsafe {
            let mut freq = mem::zeroed();
            profileapi::QueryPerformanceFrequency(&mut freq);
            *freq.QuadPart() as f64
        };

        Monotonic {
            hz_ratio: 1_000_000_000.0 / hz,
        }
    }
}

#[cfg(windows)]
impl ClockSource for Monotonic {
    fn now(&self) -> u64 {
        use std::mem;
        use winapi::um::profileapi;

        let raw = unsafe {
            let mut lint = mem::zeroed();
            profileapi::QueryPerformanceCounter(&mut lint);
            *lint.QuadPart() as u64
        };
        (raw as f64 * self.hz_ratio) as u64
    }
}
