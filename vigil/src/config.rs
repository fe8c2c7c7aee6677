//! Deployment configuration for the supervisor.
//!
//! The wrapper's command line carries only the status descriptor; everything
//! else is fixed at deploy time. A [`Config`] starts from built-in defaults,
//! optionally replaced by a JSON file named in [`ENV_CONFIG`], then by the
//! individual `VIGIL_*` variable overrides. It is resolved once, before
//! fork, and never reconsulted.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Wall-clock bound applied when no deployment override is present.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Signal delivered at the bound when no override is present.
pub const DEFAULT_TERM_SIGNAL: Signal = Signal::SIGKILL;
/// Payload path exec'd when no override is present.
pub const DEFAULT_PAYLOAD: &str = "/vigil/runner";

/// Names a JSON config file applied over the defaults.
pub const ENV_CONFIG: &str = "VIGIL_CONFIG";
/// Overrides the wall-clock bound, in milliseconds; 0 leaves the run
/// unbounded.
pub const ENV_TIMEOUT_MS: &str = "VIGIL_TIMEOUT_MS";
/// Overrides the termination signal, by name ("KILL", "SIGKILL") or number.
pub const ENV_TERM_SIGNAL: &str = "VIGIL_TERM_SIGNAL";
/// Overrides the payload path.
pub const ENV_PAYLOAD: &str = "VIGIL_PAYLOAD";
/// Keeps the caller's process group when set ("1"/"true").
pub const ENV_FOREGROUND: &str = "VIGIL_FOREGROUND";

/// Deploy-time parameters for one supervision run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(default)]
pub struct Config {
    /// Wall-clock bound before [`term_signal`](Self::term_signal) is sent.
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
    /// Signal delivered to the payload when the bound expires.
    #[serde(with = "signal_name")]
    pub term_signal: Signal,
    /// Executable the child becomes; run with no arguments.
    pub payload: PathBuf,
    /// Share the caller's process group instead of creating our own.
    pub foreground: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            term_signal: DEFAULT_TERM_SIGNAL,
            payload: PathBuf::from(DEFAULT_PAYLOAD),
            foreground: false,
        }
    }
}

impl Config {
    /// Replaces the wall-clock bound.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the timeout termination signal.
    #[must_use]
    pub const fn term_signal(mut self, signal: Signal) -> Self {
        self.term_signal = signal;
        self
    }

    /// Replaces the payload path.
    #[must_use]
    pub fn payload(mut self, payload: impl Into<PathBuf>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Keeps the caller's process group instead of creating our own.
    #[must_use]
    pub const fn foreground(mut self, foreground: bool) -> Self {
        self.foreground = foreground;
        self
    }

    /// Resolves deployment configuration from the environment.
    ///
    /// Layering, weakest first: built-in defaults, the JSON file named by
    /// [`ENV_CONFIG`] (if set), then the individual variable overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var_os(ENV_CONFIG) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        if let Some(ms) = env_str(ENV_TIMEOUT_MS)? {
            let ms: u64 = ms
                .parse()
                .map_err(|_| Error::Config(format!("{ENV_TIMEOUT_MS} is not a number: {ms:?}")))?;
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(name) = env_str(ENV_TERM_SIGNAL)? {
            config.term_signal = parse_signal(&name)?;
        }
        if let Some(path) = env::var_os(ENV_PAYLOAD) {
            config.payload = PathBuf::from(path);
        }
        if let Some(value) = env_str(ENV_FOREGROUND)? {
            config.foreground = parse_bool(ENV_FOREGROUND, &value)?;
        }
        Ok(config)
    }

    /// Loads configuration from a JSON file; absent keys keep defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Reads an environment variable, erroring on non-UTF-8 content.
fn env_str(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(Error::Config(format!("{key} is not valid UTF-8")))
        }
    }
}

/// Parses a signal given by number ("9") or name ("KILL", "SIGKILL").
fn parse_signal(value: &str) -> Result<Signal> {
    if let Ok(number) = value.parse::<i32>() {
        return Signal::try_from(number)
            .map_err(|_| Error::Config(format!("unknown signal number {number}")));
    }
    let upper = value.to_ascii_uppercase();
    let name = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };
    name.parse()
        .map_err(|_| Error::Config(format!("unknown signal name {value:?}")))
}

/// Parses a boolean override; only "1"/"0"/"true"/"false" are accepted.
fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(Error::Config(format!(
            "{key} must be 0/1/true/false, got {value:?}"
        ))),
    }
}

/// Serde helpers: a [`Duration`] as integer milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes as a bare millisecond count.
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    /// Deserializes from a bare millisecond count.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Serde helpers: a [`Signal`] by conventional name ("SIGKILL").
mod signal_name {
    use nix::sys::signal::Signal;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes as the full signal name.
    pub fn serialize<S: Serializer>(sig: &Signal, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(sig.as_str())
    }

    /// Deserializes from a name or a number, like the env override.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Signal, D::Error> {
        let name = String::deserialize(d)?;
        super::parse_signal(&name).map_err(D::Error::custom)
    }
}
