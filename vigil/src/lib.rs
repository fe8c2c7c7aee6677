//! Race-free timeout supervision for sandboxed payloads.
//!
//! A caller opens a descriptor, spawns the wrapper with that descriptor's
//! number as the only argument, and reads back a JSON fragment describing
//! how the payload ended:
//!
//! ```text
//! "timed_out":false,"status_type":"exited","status_value":0,
//! ```
//!
//! The fragment has no enclosing braces and ends with a comma so the
//! caller can splice it into a larger record. Exactly one fragment is
//! written per run, after the payload has been reaped.
//!
//! The wrapper forks the payload, arms a one-shot timer, and waits without
//! races: termination requests and child exit are blocked except inside
//! the atomic unblock-and-wait of `sigsuspend`, so a signal can never slip
//! between a reap attempt and the decision to keep waiting. On timeout the
//! payload receives the configured signal (`SIGKILL` unless overridden)
//! and its death is reported like any other, with `timed_out` set.
//!
//! ```no_run
//! use vigil::{Config, StatusChannel, Supervisor};
//!
//! fn main() -> vigil::Result<()> {
//!     let channel = StatusChannel::from_arg("3")?;
//!     let config = Config::from_env()?;
//!     let outcome = Supervisor::new(config, channel).run()?;
//!     eprintln!("payload done: {outcome}");
//!     Ok(())
//! }
//! ```

#[cfg(unix)]
mod channel;
#[cfg(unix)]
mod config;
mod error;
#[cfg(unix)]
mod outcome;
#[cfg(unix)]
mod signals;
#[cfg(unix)]
mod supervisor;
#[cfg(unix)]
mod timer;

pub use error::{Error, Result};

#[cfg(unix)]
pub use crate::{
    channel::StatusChannel,
    config::{
        Config, DEFAULT_PAYLOAD, DEFAULT_TERM_SIGNAL, DEFAULT_TIMEOUT, ENV_CONFIG, ENV_FOREGROUND,
        ENV_PAYLOAD, ENV_TERM_SIGNAL, ENV_TIMEOUT_MS,
    },
    outcome::{Outcome, StatusKind},
    supervisor::Supervisor,
};
