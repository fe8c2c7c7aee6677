//! Error types for vigil operations.

/// Alias for `Result<T, vigil::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end a supervision run before a child exists.
///
/// Everything that can go wrong after the fork is resolved into the outcome
/// fragment instead; see the crate docs.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The status-descriptor argument was not a plain decimal integer.
    #[error("invalid status descriptor argument {0:?}")]
    BadDescriptor(String),

    /// The status descriptor did not pass the open-descriptor probe.
    #[error("status descriptor {fd}: {source}")]
    Probe {
        /// The descriptor number that failed the probe.
        fd: i32,
        /// The probe's error, carrying the OS error code.
        source: std::io::Error,
    },

    /// fork(2) failed; no child was created.
    #[error("fork: {0}")]
    Fork(#[source] std::io::Error),

    /// A deployment configuration value could not be parsed.
    #[error("config: {0}")]
    Config(String),

    /// JSON error from the optional config file.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A raw system call failed during setup.
    #[cfg(unix)]
    #[error(transparent)]
    Sys(#[from] nix::errno::Errno),

    /// An I/O error outside the descriptor probe (config file reads).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The process exit code the wrapper reports for this error.
    ///
    /// Probe failures surface the OS error code itself so the caller can
    /// distinguish "bad descriptor" from everything else; fork failure is
    /// `2`; all other pre-fork failures are usage-class and exit `1`.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Probe { source, .. } => source.raw_os_error().unwrap_or(1),
            Self::Fork(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn probe_exit_code_is_the_os_error() {
        let err = Error::Probe {
            fd: 7,
            source: std::io::Error::from_raw_os_error(libc::EBADF),
        };
        assert_eq!(err.exit_code(), libc::EBADF);
    }

    #[cfg(unix)]
    #[test]
    fn fork_exit_code_is_two() {
        let err = Error::Fork(std::io::Error::from_raw_os_error(libc::EAGAIN));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn usage_errors_exit_one() {
        assert_eq!(Error::BadDescriptor("x".into()).exit_code(), 1);
        assert_eq!(Error::Config("bad".into()).exit_code(), 1);
    }
}
