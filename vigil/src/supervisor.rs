//! The supervision run: fork the payload, hold the line until it ends or
//! the clock does, classify, report.
//!
//! The ordering here is load-bearing. Dispositions are installed before
//! fork so no signal is ever handled with default disposition; the alarm
//! is unblocked before the timer is armed so it can be delivered at all;
//! and the cleanup set is blocked before the reap loop so a trigger can
//! only fire inside [`suspend`](crate::signals), never between a reap
//! attempt and its result.

// fork and the exec path; child-exec diagnostics and the setpgid warning
// go to stderr.
#![allow(unsafe_code, clippy::print_stderr)]

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;

use nix::sys::signal::Signal;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, execvp, fork, setpgid};

use crate::channel::StatusChannel;
use crate::config::Config;
use crate::outcome::Outcome;
use crate::timer::TimeoutTimer;
use crate::{Error, Result, signals};

/// One configured supervision run.
///
/// Construct once, [`run`](Self::run) once. All process-wide state (group
/// membership, signal dispositions, the timer) is configured on the way in
/// and never touched again.
#[derive(Debug)]
pub struct Supervisor {
    /// Deploy-time parameters, fixed before fork.
    config: Config,
    /// Validated destination for the outcome fragment.
    channel: StatusChannel,
}

impl Supervisor {
    /// Builds a supervisor from a resolved config and a validated channel.
    #[must_use]
    pub const fn new(config: Config, channel: StatusChannel) -> Self {
        Self { config, channel }
    }

    /// Runs the payload to completion or to the timeout boundary and
    /// writes the outcome fragment to the channel.
    ///
    /// Returns the reported [`Outcome`]. `Err` means no child could be
    /// created and nothing was written; everything that happens after the
    /// fork (timeout, signals, exec failure, even a failed status write)
    /// resolves into the outcome instead.
    pub fn run(self) -> Result<Outcome> {
        if !self.config.foreground {
            // Contain the payload and its descendants in our own group.
            if let Err(errno) = setpgid(Pid::from_raw(0), Pid::from_raw(0)) {
                eprintln!("vigil: warning: setpgid: {errno}");
            }
        }

        signals::install(self.config.term_signal)?;

        // SAFETY: this process is single-threaded by contract, and the
        // child calls only async-signal-safe functions before exec.
        match unsafe { fork() }.map_err(|errno| Error::Fork(std::io::Error::from(errno)))? {
            ForkResult::Child => self.child(),
            ForkResult::Parent { child } => self.parent(child),
        }
    }

    /// Child side: default job-control handling, drop the channel copy,
    /// become the payload.
    fn child(self) -> ! {
        signals::restore_job_control_defaults();
        self.channel.close_inherited();

        let payload = self.config.payload;
        match CString::new(payload.as_os_str().as_bytes()) {
            Ok(path) => {
                // PATH search applies when the payload is a bare name.
                let Err(errno) = execvp(&path, &[path.as_c_str()]);
                eprintln!("vigil: exec {}: {errno}", payload.display());
            }
            Err(_) => eprintln!("vigil: payload path contains an interior NUL byte"),
        }
        // The parent classifies this like any ordinary exit.
        std::process::exit(1)
    }

    /// Parent side: arm, wait race-free, classify, report.
    fn parent(self, child: Pid) -> Result<Outcome> {
        signals::set_monitored(child);

        // The alarm must be deliverable even if the caller blocked it.
        signals::unblock(Signal::SIGALRM);
        let _timer = TimeoutTimer::arm(self.config.timeout);

        // Cleanup triggers and SIGCHLD stay blocked from here through the
        // final write; they are only deliverable inside suspend().
        let resume_mask = signals::block_cleanup_and_chld(self.config.term_signal);

        let reaped = loop {
            match waitpid(child, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => signals::suspend(&resume_mask),
                other => break other,
            }
        };

        let outcome = match reaped {
            Ok(status) => Outcome::classify(status, signals::timed_out()),
            Err(errno) => {
                // waitpid refusing to answer for our own child has no
                // recovery; report what is known.
                eprintln!("vigil: warning: waitpid: {errno}");
                Outcome::unknown(signals::timed_out())
            }
        };

        if let Err(err) = self.channel.write_outcome(&outcome) {
            eprintln!("vigil: warning: status write: {err}");
        }
        Ok(outcome)
    }
}
