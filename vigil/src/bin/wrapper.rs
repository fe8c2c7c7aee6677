//! `vigil-wrapper`: supervise one payload and report how it ended.
//!
//! Usage: `vigil-wrapper <status-fd>`
//!
//! The single argument names an open descriptor inherited from the
//! caller. The wrapper forks the configured payload, enforces the
//! configured timeout, and writes the outcome fragment to that
//! descriptor. Configuration comes from the environment; see
//! `Config::from_env`.

// Standalone binary; stderr is the correct error channel.
#![allow(clippy::print_stderr)]

#[cfg(not(unix))]
fn main() {
    eprintln!("vigil-wrapper: only supported on Unix");
    std::process::exit(1);
}

#[cfg(unix)]
fn main() {
    use vigil::{Config, StatusChannel, Supervisor};

    let mut args = std::env::args().skip(1);
    let (Some(fd_arg), None) = (args.next(), args.next()) else {
        eprintln!("usage: vigil-wrapper <status-fd>");
        std::process::exit(1);
    };

    let channel = or_exit(StatusChannel::from_arg(&fd_arg));
    let config = or_exit(Config::from_env());

    // The run itself never fails the wrapper: a payload that times out,
    // dies on a signal, or cannot exec is an outcome, not an error.
    or_exit(Supervisor::new(config, channel).run());
}

#[cfg(unix)]
fn or_exit<T>(result: vigil::Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            eprintln!("vigil-wrapper: {err}");
            std::process::exit(err.exit_code());
        }
    }
}
