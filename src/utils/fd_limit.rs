//! File descriptor limit detection for capping concurrent operations (Unix).

use log::debug;

/// Estimated number of file descriptors held by one in-flight item (input, partial output, socket).
pub const FDS_PER_WORKER: usize = 4;

/// Fraction of the process FD limit to use (leave headroom for other code).
const FD_LIMIT_FRACTION: f64 = 0.8;

/// Returns the soft limit for max open file descriptors, or `None` if unavailable (e.g. Windows).
#[cfg(unix)]
pub fn max_open_fds() -> Option<u64> {
    use std::mem::MaybeUninit;
    let mut rlim = MaybeUninit::<libc::rlimit>::uninit();
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, rlim.as_mut_ptr()) } != 0 {
        return None;
    }
    let rlim = unsafe { rlim.assume_init() };
    let cur = rlim.rlim_cur;
    // RLIM_INFINITY is typically !0 or u64::MAX; treat as "no practical limit"
    if cur == libc::RLIM_INFINITY || cur > i64::MAX as u64 {
        return None;
    }
    Some(cur)
}

#[cfg(not(unix))]
pub fn max_open_fds() -> Option<u64> {
    None
}

/// Descriptors kept out of the worker budget: stdio, the error log, the list file, the walker's
/// open directories and the HTTP client's pooled sockets.
const RESERVED_FDS: usize = 32;

/// Worker budget for a given FD limit: 80% of it, minus the reserve, at four per worker.
/// Never below one worker.
pub fn workers_for_fd_limit(limit: u64) -> usize {
    let usable = ((limit as f64 * FD_LIMIT_FRACTION) as usize).saturating_sub(RESERVED_FDS);
    (usable / FDS_PER_WORKER).max(1)
}

/// Worker budget for this process, or `None` when there is no known limit.
pub fn max_workers_by_fd_limit() -> Option<usize> {
    max_open_fds().map(workers_for_fd_limit)
}

/// Cap `requested` workers by the FD limit. Never returns 0 for a non-zero request.
pub fn cap_workers_by_fd_limit(requested: usize) -> usize {
    match max_workers_by_fd_limit() {
        Some(fd_cap) if fd_cap < requested => {
            debug!(
                "Capping concurrency {} -> {} (open-file limit)",
                requested, fd_cap
            );
            fd_cap
        }
        _ => requested,
    }
}
