//! Process memory readers
//!
//! The detector is generic over where readings come from so tests can feed
//! synthetic sequences. The production reader asks the OS for resident set
//! size via `getrusage(2)`.

/// One point-in-time reading handed to the detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryReading {
    /// Resident set size in megabytes
    pub rss_mb: f64,
    /// Objects the allocator/collector reclaimed so far (0 when the
    /// platform has no such counter)
    pub reclaimed_objects: u64,
    /// Objects the allocator/collector could not reclaim
    pub unreclaimable_objects: u64,
}

/// Source of memory readings
pub trait MemoryReader: Send + Sync {
    fn read(&self) -> MemoryReading;
}

/// Reads the current process's resident set size
#[derive(Debug, Default)]
pub struct ProcessMemoryReader;

impl MemoryReader for ProcessMemoryReader {
    fn read(&self) -> MemoryReading {
        MemoryReading {
            rss_mb: rss_bytes() as f64 / 1_048_576.0,
            reclaimed_objects: 0,
            unreclaimable_objects: 0,
        }
    }
}

#[cfg(target_os = "macos")]
fn rss_bytes() -> usize {
    use std::mem::MaybeUninit;

    let mut info: MaybeUninit<libc::rusage> = MaybeUninit::uninit();
    unsafe {
        if libc::getrusage(libc::RUSAGE_SELF, info.as_mut_ptr()) == 0 {
            let info = info.assume_init();
            // ru_maxrss is in bytes on macOS
            info.ru_maxrss as usize
        } else {
            0
        }
    }
}

#[cfg(target_os = "linux")]
fn rss_bytes() -> usize {
    use std::mem::MaybeUninit;

    let mut info: MaybeUninit<libc::rusage> = MaybeUninit::uninit();
    unsafe {
        if libc::getrusage(libc::RUSAGE_SELF, info.as_mut_ptr()) == 0 {
            let info = info.assume_init();
            // ru_maxrss is in kilobytes on Linux
            (info.ru_maxrss as usize) * 1024
        } else {
            0
        }
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn rss_bytes() -> usize {
    // Fallback for unsupported platforms
    0
}
