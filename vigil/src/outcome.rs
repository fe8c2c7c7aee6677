//! Termination outcome of a supervised payload.
//!
//! Exactly one [`Outcome`] is built per run, after the child has been
//! reaped, and exactly one is written to the status channel. Its rendered
//! form is a fragment with a trailing comma and no enclosing braces,
//! because the caller embeds it in a larger record it owns.

use std::fmt;

use nix::sys::wait::WaitStatus;

/// How the payload ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StatusKind {
    /// Ran to completion; the value is its exit code.
    Exited,
    /// Ended by a signal; the value is the signal number.
    Killed,
    /// Ended by a signal and left a core image.
    CoreDump,
    /// The platform reported a state POSIX says cannot happen here.
    Unknown,
}

impl StatusKind {
    /// The wire name used in the outcome fragment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exited => "exited",
            Self::Killed => "killed",
            Self::CoreDump => "core_dump",
            Self::Unknown => "unknown",
        }
    }
}

/// The record reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the wall-clock bound fired before the payload was reaped.
    pub timed_out: bool,
    /// Classification of the end state.
    pub status: StatusKind,
    /// Exit code for [`StatusKind::Exited`], signal number otherwise.
    pub value: i32,
}

impl Outcome {
    /// Classifies a reaped wait status.
    #[must_use]
    pub fn classify(status: WaitStatus, timed_out: bool) -> Self {
        match status {
            WaitStatus::Exited(_, code) => Self {
                timed_out,
                status: StatusKind::Exited,
                value: code,
            },
            WaitStatus::Signaled(_, signal, core_dumped) => Self {
                timed_out,
                status: if core_dumped {
                    StatusKind::CoreDump
                } else {
                    StatusKind::Killed
                },
                value: signal as i32,
            },
            _ => Self::unknown(timed_out),
        }
    }

    /// Fabricated outcome for a reap that failed in an unexpected way.
    #[must_use]
    pub const fn unknown(timed_out: bool) -> Self {
        Self {
            timed_out,
            status: StatusKind::Unknown,
            value: -1,
        }
    }
}

impl fmt::Display for Outcome {
    /// Renders the exact wire fragment, trailing comma included.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"timed_out\":{},\"status_type\":\"{}\",\"status_value\":{},",
            self.timed_out,
            self.status.as_str(),
            self.value
        )
    }
}

#[cfg(test)]
mod tests {
    use nix::sys::signal::Signal;
    use nix::unistd::Pid;

    use super::*;

    #[test]
    fn normal_exit_renders_exited() {
        let o = Outcome::classify(WaitStatus::Exited(Pid::from_raw(100), 7), false);
        assert_eq!(
            o.to_string(),
            "\"timed_out\":false,\"status_type\":\"exited\",\"status_value\":7,"
        );
    }

    #[test]
    fn signal_death_renders_killed() {
        let status = WaitStatus::Signaled(Pid::from_raw(100), Signal::SIGKILL, false);
        let o = Outcome::classify(status, true);
        assert_eq!(
            o.to_string(),
            "\"timed_out\":true,\"status_type\":\"killed\",\"status_value\":9,"
        );
    }

    #[test]
    fn core_image_upgrades_to_core_dump() {
        let status = WaitStatus::Signaled(Pid::from_raw(100), Signal::SIGQUIT, true);
        let o = Outcome::classify(status, false);
        assert_eq!(o.status, StatusKind::CoreDump);
        assert_eq!(o.value, 3);
    }

    #[test]
    fn anything_else_is_unknown() {
        let o = Outcome::classify(WaitStatus::StillAlive, false);
        assert_eq!(o.status, StatusKind::Unknown);
        assert_eq!(o.value, -1);
        assert_eq!(
            o.to_string(),
            "\"timed_out\":false,\"status_type\":\"unknown\",\"status_value\":-1,"
        );
    }

    #[test]
    fn zero_exit_code_keeps_shape() {
        let o = Outcome::classify(WaitStatus::Exited(Pid::from_raw(100), 0), false);
        assert_eq!(
            o.to_string(),
            "\"timed_out\":false,\"status_type\":\"exited\",\"status_value\":0,"
        );
    }
}
