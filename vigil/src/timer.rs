//! The wall-clock bound on a supervision run.
//!
//! One single-shot timer, armed once, after fork. Expiry delivers SIGALRM
//! to the supervisor and the cleanup handler does the rest. A POSIX
//! per-process timer gives sub-second resolution; when creating or arming
//! one fails, the classic whole-second alarm takes over.

// The downgrade warning is a contractual stderr diagnostic.
#![allow(clippy::print_stderr)]

use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{SigEvent, SigevNotify, Signal};
use nix::sys::time::TimeSpec;
use nix::sys::timer::{Expiration, Timer, TimerSetTimeFlags};
use nix::time::ClockId;
use nix::unistd::alarm;

/// Whichever bound ended up armed, if any.
///
/// Dropping a POSIX timer deletes it, so the supervisor keeps this value
/// alive until the child has been reaped.
pub(crate) enum TimeoutTimer {
    /// One-shot per-process timer, held only so its drop deletes it.
    Posix { _guard: Timer },
    /// alarm(2) fallback, whole seconds.
    Alarm,
    /// Zero bound; nothing armed.
    Unbounded,
}

impl TimeoutTimer {
    /// Arms the bound. Never fails: on any setup error the coarse alarm
    /// takes over, with a warning unless the platform simply lacks the
    /// syscall. A zero bound arms nothing and the run goes unbounded.
    pub(crate) fn arm(timeout: Duration) -> Self {
        if timeout.is_zero() {
            // Zero disarms rather than arms, and alarm::set refuses 0.
            return Self::Unbounded;
        }
        match Self::arm_posix(timeout) {
            Ok(timer) => Self::Posix { _guard: timer },
            Err(errno) => {
                if errno != Errno::ENOSYS {
                    eprintln!("vigil: warning: timer setup: {errno}");
                }
                alarm::set(coarse_seconds(timeout));
                Self::Alarm
            }
        }
    }

    /// One-shot CLOCK_REALTIME timer delivering SIGALRM to the process.
    fn arm_posix(timeout: Duration) -> Result<Timer, Errno> {
        let event = SigEvent::new(SigevNotify::SigevSignal {
            signal: Signal::SIGALRM,
            si_value: 0,
        });
        let mut timer = Timer::new(ClockId::CLOCK_REALTIME, event)?;
        timer.set(
            Expiration::OneShot(TimeSpec::from_duration(timeout)),
            TimerSetTimeFlags::empty(),
        )?;
        Ok(timer)
    }
}

/// Whole seconds for alarm(2), rounded up so short bounds still fire.
fn coarse_seconds(timeout: Duration) -> u32 {
    let mut secs = timeout.as_secs();
    if timeout.subsec_nanos() > 0 {
        secs += 1;
    }
    u32::try_from(secs).unwrap_or(u32::MAX)
}
