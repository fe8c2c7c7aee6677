//! `vigil-splice`: expand a NUL-delimited argument file into an exec.
//!
//! Usage: `vigil-splice <placeholder> <file> <program> [args...]`
//!
//! The file holds zero or more NUL-terminated entries. The first template
//! argument equal to the placeholder is replaced by those entries, in
//! order; the program is then executed over `PATH` with the result. A
//! caller can stage a payload's variable argument list in a file while
//! keeping its own command line fixed.

// Standalone binary; stderr is the correct error channel.
#![allow(clippy::print_stderr)]

#[cfg(unix)]
use std::ffi::{CString, OsStr, OsString};
#[cfg(unix)]
use std::path::PathBuf;

#[cfg(unix)]
use anyhow::{Context, Result, bail};
#[cfg(unix)]
use clap::Parser;

#[cfg(not(unix))]
fn main() {
    eprintln!("vigil-splice: only supported on Unix");
    std::process::exit(1);
}

#[cfg(unix)]
fn main() {
    if let Err(err) = run() {
        eprintln!("vigil-splice: {err:#}");
        std::process::exit(1);
    }
}

/// Expand a NUL-delimited argument file into an exec.
#[cfg(unix)]
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Template argument to replace with the file's entries.
    placeholder: OsString,

    /// File of NUL-terminated entries.
    file: PathBuf,

    /// Program to execute, resolved over PATH.
    program: OsString,

    /// Argument template; the first occurrence of the placeholder is
    /// expanded.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<OsString>,
}

#[cfg(unix)]
fn run() -> Result<()> {
    use std::os::unix::ffi::OsStrExt;

    let cli = Cli::parse();

    let raw = std::fs::read(&cli.file).with_context(|| format!("read {}", cli.file.display()))?;
    let entries = split_nul(&raw)?;

    let (args, replaced) = splice(cli.args, &cli.placeholder, entries);
    if !replaced {
        eprintln!(
            "vigil-splice: warning: placeholder {} not present in the argument template",
            cli.placeholder.to_string_lossy()
        );
    }

    let program = CString::new(cli.program.as_bytes())
        .context("program name contains an interior NUL byte")?;
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(program.clone());
    for arg in args {
        argv.push(CString::new(arg.as_bytes()).context("argument contains an interior NUL byte")?);
    }

    let Err(errno) = nix::unistd::execvp(&program, &argv);
    bail!("exec {}: {errno}", cli.program.to_string_lossy())
}

/// Decodes a file of NUL-terminated entries.
///
/// An empty file holds no entries. Anything else must end with NUL; a
/// lone NUL is a single empty entry.
#[cfg(unix)]
fn split_nul(raw: &[u8]) -> Result<Vec<OsString>> {
    use std::os::unix::ffi::OsStringExt;

    let Some((last, body)) = raw.split_last() else {
        return Ok(Vec::new());
    };
    if *last != 0 {
        bail!("argument file does not end with a NUL terminator");
    }
    Ok(body
        .split(|byte| *byte == 0)
        .map(|entry| OsString::from_vec(entry.to_vec()))
        .collect())
}

/// Replaces the first occurrence of the placeholder with the entries.
///
/// Returns the expanded list and whether a replacement happened. Later
/// occurrences of the placeholder pass through untouched.
#[cfg(unix)]
fn splice(
    template: Vec<OsString>,
    placeholder: &OsStr,
    entries: Vec<OsString>,
) -> (Vec<OsString>, bool) {
    let mut pending = Some(entries);
    let mut out = Vec::with_capacity(template.len());
    for arg in template {
        if pending.is_some() && arg.as_os_str() == placeholder {
            out.extend(pending.take().unwrap_or_default());
        } else {
            out.push(arg);
        }
    }
    let replaced = pending.is_none();
    (out, replaced)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn os(strs: &[&str]) -> Vec<OsString> {
        strs.iter().copied().map(OsString::from).collect()
    }

    #[test]
    fn empty_file_has_no_entries() {
        assert_eq!(split_nul(b"").unwrap(), Vec::<OsString>::new());
    }

    #[test]
    fn entries_are_nul_terminated() {
        assert_eq!(split_nul(b"a\0b c\0").unwrap(), os(&["a", "b c"]));
    }

    #[test]
    fn lone_nul_is_one_empty_entry() {
        assert_eq!(split_nul(b"\0").unwrap(), os(&[""]));
    }

    #[test]
    fn unterminated_file_is_rejected() {
        let err = split_nul(b"a\0b").unwrap_err();
        assert!(err.to_string().contains("NUL"), "{err}");
    }

    #[test]
    fn first_occurrence_is_expanded() {
        let (out, replaced) = splice(os(&["a", "%", "b", "%"]), OsStr::new("%"), os(&["x", "y"]));
        assert!(replaced);
        assert_eq!(out, os(&["a", "x", "y", "b", "%"]));
    }

    #[test]
    fn absent_placeholder_passes_through() {
        let (out, replaced) = splice(os(&["a", "b"]), OsStr::new("%"), os(&["x"]));
        assert!(!replaced);
        assert_eq!(out, os(&["a", "b"]));
    }

    #[test]
    fn empty_entry_list_drops_the_placeholder() {
        let (out, replaced) = splice(os(&["a", "%", "b"]), OsStr::new("%"), Vec::new());
        assert!(replaced);
        assert_eq!(out, os(&["a", "b"]));
    }
}
