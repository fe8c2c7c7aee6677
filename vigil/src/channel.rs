//! The status channel: where the outcome fragment goes.
//!
//! The caller opens a descriptor, spawns the wrapper with the descriptor
//! number as the sole argument, and embeds whatever arrives in a record it
//! owns. The descriptor stays the caller's: this process never creates or
//! closes it, except that the child closes its own inherited copy so the
//! payload cannot reach the channel.

// Probe and write target a raw caller-owned descriptor.
#![allow(unsafe_code)]

use std::io;
use std::os::fd::{BorrowedFd, RawFd};

use nix::errno::Errno;
use nix::unistd;

use crate::outcome::Outcome;
use crate::{Error, Result};

/// A validated, caller-owned destination descriptor.
#[derive(Debug, Clone, Copy)]
pub struct StatusChannel {
    /// Descriptor number inherited from the caller.
    fd: RawFd,
}

impl StatusChannel {
    /// Validates the wrapper's descriptor argument.
    ///
    /// The argument must be a plain run of decimal digits (no sign, no
    /// whitespace) naming a descriptor that is open in this process.
    /// Anything else is a usage error; a well-formed number that fails the
    /// probe carries the OS error instead.
    pub fn from_arg(arg: &str) -> Result<Self> {
        if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::BadDescriptor(arg.to_owned()));
        }
        let fd: RawFd = arg
            .parse()
            .map_err(|_| Error::BadDescriptor(arg.to_owned()))?;
        Self::from_raw_fd(fd)
    }

    /// Probes an already-open descriptor and wraps it.
    ///
    /// `F_GETFD` answers "is this an open descriptor at all" without
    /// touching the underlying object. It is a liveness probe only; a
    /// read-only descriptor would pass here and fail at the final write.
    pub fn from_raw_fd(fd: RawFd) -> Result<Self> {
        // SAFETY: F_GETFD only inspects the descriptor table entry.
        let rc = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        if rc == -1 {
            return Err(Error::Probe {
                fd,
                source: io::Error::last_os_error(),
            });
        }
        Ok(Self { fd })
    }

    /// The raw descriptor number.
    #[must_use]
    pub const fn raw(self) -> RawFd {
        self.fd
    }

    /// Writes the outcome fragment in full.
    ///
    /// Interrupted writes are retried and short writes resume where they
    /// stopped. A failure here is reported by the caller but does not
    /// change the wrapper's exit status; the child is already resolved.
    pub fn write_outcome(self, outcome: &Outcome) -> io::Result<()> {
        let text = outcome.to_string();
        let mut rest = text.as_bytes();
        // SAFETY: the probe saw this descriptor open and the caller keeps
        // it open for the wrapper's lifetime.
        let fd = unsafe { BorrowedFd::borrow_raw(self.fd) };
        while !rest.is_empty() {
            match unistd::write(fd, rest) {
                Ok(n) => rest = &rest[n..],
                Err(Errno::EINTR) => {}
                Err(errno) => return Err(io::Error::from(errno)),
            }
        }
        Ok(())
    }

    /// Child side: drops the inherited copy so the payload cannot write
    /// into the caller's record.
    pub(crate) fn close_inherited(self) {
        let _ = unistd::close(self.fd);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::os::fd::AsRawFd;

    use nix::unistd::pipe;

    use super::*;
    use crate::outcome::{Outcome, StatusKind};

    #[test]
    fn rejects_malformed_arguments() {
        for arg in ["", "abc", "-1", "+3", "3x", " 3", "3 ", "9999999999999"] {
            assert!(
                matches!(StatusChannel::from_arg(arg), Err(Error::BadDescriptor(_))),
                "accepted {arg:?}"
            );
        }
    }

    #[test]
    fn accepts_an_open_descriptor() {
        let (_read_end, write_end) = pipe().unwrap();
        let channel = StatusChannel::from_arg(&write_end.as_raw_fd().to_string()).unwrap();
        assert_eq!(channel.raw(), write_end.as_raw_fd());
    }

    #[test]
    fn probe_reports_ebadf_for_a_closed_descriptor() {
        // High enough that nothing in the test process has it open.
        let err = StatusChannel::from_raw_fd(1 << 20).unwrap_err();
        match err {
            Error::Probe { fd, source } => {
                assert_eq!(fd, 1 << 20);
                assert_eq!(source.raw_os_error(), Some(libc::EBADF));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_descriptor_fails_the_probe() {
        assert!(StatusChannel::from_raw_fd(-1).is_err());
    }

    #[test]
    fn fragment_arrives_intact() {
        let (read_end, write_end) = pipe().unwrap();
        let channel = StatusChannel::from_raw_fd(write_end.as_raw_fd()).unwrap();
        let outcome = Outcome {
            timed_out: false,
            status: StatusKind::Exited,
            value: 7,
        };
        channel.write_outcome(&outcome).unwrap();
        drop(write_end);

        let mut got = String::new();
        std::fs::File::from(read_end).read_to_string(&mut got).unwrap();
        assert_eq!(
            got,
            "\"timed_out\":false,\"status_type\":\"exited\",\"status_value\":7,"
        );
    }
}
