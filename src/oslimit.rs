//! Best-effort, idempotent raise of the per-process open-file-descriptor
//! ceiling. Called by the `bucket` module when a write hits FD
//! exhaustion, and safe to call speculatively at startup.

#[cfg(unix)]
pub fn raise_nofile_limit(extra: u64) {
    use rlimit::Resource;

    let (soft, hard) = match rlimit::getrlimit(Resource::NOFILE) {
        Ok(limits) => limits,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "could not query the open-file-descriptor limit; try raising it manually"
            );
            return;
        }
    };

    if soft >= hard {
        tracing::error!(
            soft,
            hard,
            "soft and hard limits for open file descriptors are already identical"
        );
        return;
    }

    let new_soft = (soft + extra).min(hard);
    match rlimit::setrlimit(Resource::NOFILE, new_soft, hard) {
        Ok(()) => {
            tracing::warn!(
                old_soft = soft,
                new_soft,
                hard,
                "raised the open-file-descriptor soft limit"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to raise the open-file-descriptor limit");
        }
    }
}

#[cfg(not(unix))]
pub fn raise_nofile_limit(_extra: u64) {
    tracing::warn!(
        "no platform-native mechanism to raise the open-file-descriptor limit on this OS"
    );
}

/// Returns true if the given I/O error looks like open-file-descriptor
/// exhaustion ("too many open files" / `EMFILE`).
pub fn is_fd_exhaustion(err: &std::io::Error) -> bool {
    #[cfg(unix)]
    {
        err.raw_os_error() == Some(libc::EMFILE)
    }
    #[cfg(not(unix))]
    {
        // Best-effort on platforms without EMFILE; the surrounding
        // retry-once policy is a no-op if this never matches.
        let _ = err;
        false
    }
}
