//! Wall-clock and CPU time measurement for training runs.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Wall and CPU time spent on one measured section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub wall: Duration,
    pub cpu: Duration,
}

/// Measures a section of work in both wall-clock and process CPU time.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    wall_start: Instant,
    cpu_start: Duration,
}

impl Stopwatch {
    pub fn start() -> Self {
        Stopwatch { cpu_start: get_cpu_time(), wall_start: Instant::now() }
    }

    /// Time elapsed since `start`. CPU time counts every thread of the process.
    pub fn elapsed(&self) -> Timing {
        let wall = self.wall_start.elapsed();
        let cpu = get_cpu_time().checked_sub(self.cpu_start).unwrap_or(Duration::ZERO);
        Timing { wall, cpu }
    }
}

/// Gets the total CPU time (user + system) consumed by the current process.
///
/// Returns `Duration::ZERO` if the platform is not supported or an error occurs.
pub fn get_cpu_time() -> Duration {
    #[cfg(unix)]
    {
        let mut usage = std::mem::MaybeUninit::<libc::rusage>::uninit();
        // SAFETY: `usage.as_mut_ptr()` provides a valid pointer to `libc::rusage`.
        // `libc::RUSAGE_SELF` is a valid argument. The function returns 0 on success.
        if unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) } == 0 {
            // SAFETY: `getrusage` succeeded, so `usage` is initialized.
            let usage = unsafe { usage.assume_init() };
            let user = Duration::from_secs(usage.ru_utime.tv_sec as u64)
                + Duration::from_micros(usage.ru_utime.tv_usec as u64);
            let system = Duration::from_secs(usage.ru_stime.tv_sec as u64)
                + Duration::from_micros(usage.ru_stime.tv_usec as u64);
            user + system
        } else {
            log::warn!("Failed to get CPU usage via getrusage");
            Duration::ZERO
        }
    }
    #[cfg(not(unix))]
    {
        Duration::ZERO
    }
}
