//! Stage measurement: wall time and process IO around a pipeline stage.
use std::fmt;
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Process IO counters as reported by the operating system.
///
/// Byte counts are storage-level reads and writes; syscall counts cover all
/// read/write calls of the process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IOStats {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_syscalls: u64,
    pub write_syscalls: u64,
}

impl IOStats {
    /// Counter deltas `self - earlier`, saturating at zero.
    ///
    /// # Arguments
    /// - `earlier`: Counters sampled before the measured region.
    pub fn since(&self, earlier: &IOStats) -> IOStats {
        IOStats {
            read_bytes: self.read_bytes.saturating_sub(earlier.read_bytes),
            write_bytes: self.write_bytes.saturating_sub(earlier.write_bytes),
            read_syscalls: self.read_syscalls.saturating_sub(earlier.read_syscalls),
            write_syscalls: self.write_syscalls.saturating_sub(earlier.write_syscalls),
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.read_bytes + self.write_bytes
    }

    pub fn has_io(&self) -> bool {
        self.total_bytes() > 0 || self.read_syscalls + self.write_syscalls > 0
    }

    /// Parses the contents of `/proc/<pid>/io`. Unknown or malformed lines
    /// are ignored.
    pub fn parse_proc_io(content: &str) -> IOStats {
        let mut stats = IOStats::default();
        for line in content.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let Ok(value) = value.trim().parse::<u64>() else {
                continue;
            };
            match key.trim() {
                "read_bytes" => stats.read_bytes = value,
                "write_bytes" => stats.write_bytes = value,
                "syscr" => stats.read_syscalls = value,
                "syscw" => stats.write_syscalls = value,
                _ => {}
            }
        }
        stats
    }
}

impl fmt::Display for IOStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "read {} bytes ({} syscalls), wrote {} bytes ({} syscalls)",
            self.read_bytes, self.read_syscalls, self.write_bytes, self.write_syscalls
        )
    }
}

/// Return value of a measured stage together with its cost.
pub struct StageMeasurement<T> {
    pub result: T,
    pub duration: Duration,
    pub io_stats: IOStats,
}

impl<T> StageMeasurement<T> {
    /// Logs the stage cost at info level.
    pub fn log(&self, stage: &str) {
        if self.io_stats.has_io() {
            let seconds = self.duration.as_secs_f64();
            let throughput = if seconds > 0.0 {
                self.io_stats.total_bytes() as f64 / seconds / 1024.0 / 1024.0
            } else {
                0.0
            };
            info!(
                "Stage {} finished in {:?}: {}, {:.2} MB/s",
                stage, self.duration, self.io_stats, throughput
            );
        } else {
            info!("Stage {} finished in {:?}", stage, self.duration);
        }
    }
}

/// Samples process IO counters around a closure.
pub struct IOStatsCollector;

impl IOStatsCollector {
    /// Reads the current process counters from `/proc/self/io`.
    #[cfg(target_os = "linux")]
    fn current() -> std::io::Result<IOStats> {
        let content = std::fs::read_to_string("/proc/self/io")?;
        Ok(IOStats::parse_proc_io(&content))
    }

    /// Process IO counters are only available on Linux; elsewhere only the
    /// duration is measured.
    #[cfg(not(target_os = "linux"))]
    fn current() -> std::io::Result<IOStats> {
        Ok(IOStats::default())
    }

    /// Runs `f` and measures its duration and the process IO it caused.
    ///
    /// # Type Parameters
    /// - `F`: The measured closure.
    /// - `R`: Its return type.
    pub fn measure<F, R>(f: F) -> StageMeasurement<R>
    where
        F: FnOnce() -> R,
    {
        let start_io = Self::current().unwrap_or_default();
        let start_time = Instant::now();

        let result = f();

        let duration = start_time.elapsed();
        let io_stats = Self::current().unwrap_or_default().since(&start_io);

        StageMeasurement {
            result,
            duration,
            io_stats,
        }
    }

    /// Measures `f`, logs the cost under `stage` and returns `f`'s result.
    pub fn measure_and_log<F, R>(stage: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let measurement = Self::measure(f);
        measurement.log(stage);
        measurement.result
    }

    /// Logs whether process IO counters can be read on this system.
    pub fn log_support() {
        if let Err(e) = Self::current() {
            warn!("Process IO counters unavailable ({}), stage timing only", e);
        }
    }
}

/// Measures a block as a named pipeline stage and logs its duration and IO.
///
/// # Arguments
/// - `$name`: Stage name used in the log line.
/// - `$code`: The block to run.
///
/// # Returns
/// The value of `$code`.
#[macro_export]
macro_rules! measure_stage {
    ($name:expr, $code:block) => {{
        $crate::io_status::IOStatsCollector::measure_and_log($name, || $code)
    }};
}

#[cfg(test)]
mod test_io_status {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_proc_io() {
        let content = "rchar: 10\nwchar: 20\nsyscr: 3\nsyscw: 4\nread_bytes: 4096\nwrite_bytes: 8192\ncancelled_write_bytes: 0\n";
        let stats = IOStats::parse_proc_io(content);
        assert_eq!(
            stats,
            IOStats {
                read_bytes: 4096,
                write_bytes: 8192,
                read_syscalls: 3,
                write_syscalls: 4,
            }
        );
        assert_eq!(IOStats::parse_proc_io("garbage\nread_bytes: x\n"), IOStats::default());
    }

    #[test]
    fn test_since_saturates() {
        let before = IOStats {
            read_bytes: 100,
            write_bytes: 200,
            read_syscalls: 10,
            write_syscalls: 20,
        };
        let after = IOStats {
            read_bytes: 150,
            write_bytes: 100,
            read_syscalls: 15,
            write_syscalls: 25,
        };
        let delta = after.since(&before);
        assert_eq!(delta.read_bytes, 50);
        assert_eq!(delta.write_bytes, 0);
        assert_eq!(delta.total_bytes(), 50);
    }

    #[test]
    fn test_measure_stage_macro() {
        let value = crate::measure_stage!("sleep", {
            std::thread::sleep(Duration::from_millis(1));
            42
        });
        assert_eq!(value, 42);
    }

    #[test]
    fn test_measure_file_write() {
        let dir = tempfile::tempdir().unwrap();
        let measurement = IOStatsCollector::measure(|| {
            let mut file = std::fs::File::create(dir.path().join("io.txt")).unwrap();
            file.write_all(b"follow graph").unwrap();
            file.sync_all().unwrap();
        });
        assert!(measurement.duration > Duration::ZERO);
        assert!(dir.path().join("io.txt").exists());
    }
}
