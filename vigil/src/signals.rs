//! Signal dispositions for the supervision run.
//!
//! Everything here is installed exactly once, before fork, so no signal can
//! arrive under a default (process-killing) disposition or be handled with
//! stale state. The handlers keep to async-signal-safe ground: they read and
//! write static atomics, send a signal, or exit. Classification and
//! reporting live in the main control flow, which only looks at the flags
//! after waking.

// sigaction/sigprocmask/sigsuspend and the handler bodies are unsafe by
// nature; the two setup warnings are contractual stderr diagnostics.
#![allow(unsafe_code, clippy::print_stderr)]

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use nix::sys::signal::{
    SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal, sigaction, sigprocmask,
};
use nix::unistd::Pid;

use crate::Result;

/// Pid of the supervised child; 0 until fork has produced one.
static MONITORED_PID: AtomicI32 = AtomicI32::new(0);
/// Set by the cleanup handler when the alarm signal fired.
static TIMED_OUT: AtomicBool = AtomicBool::new(false);
/// Signal substituted for the alarm; fixed at install time.
static TERM_SIGNAL: AtomicI32 = AtomicI32::new(libc::SIGKILL);

/// Installs the full disposition table. Call once, before fork.
///
/// Binds the cleanup handler to the alarm, interrupt, quit, hangup, and
/// terminate signals plus `term_signal`; ignores the job-control stall
/// signals so a backgrounded child needing the terminal cannot stop us;
/// gives SIGCHLD a no-op handler so a pending suspend wakes when the child
/// changes state, and unblocks it in case it was inherited blocked.
pub(crate) fn install(term_signal: Signal) -> Result<()> {
    TERM_SIGNAL.store(term_signal as i32, Ordering::SeqCst);

    let cleanup = SigAction::new(
        SigHandler::Handler(cleanup_handler),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for sig in cleanup_signals(term_signal) {
        if matches!(sig, Signal::SIGKILL | Signal::SIGSTOP) {
            // Not catchable; the timeout path delivers it regardless.
            continue;
        }
        // SAFETY: the handler body is async-signal-safe (atomics, kill,
        // _exit) and stays installed for the life of the process.
        unsafe { sigaction(sig, &cleanup) }?;
    }

    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    for sig in [Signal::SIGTTIN, Signal::SIGTTOU] {
        // SAFETY: replaces the disposition with SIG_IGN.
        unsafe { sigaction(sig, &ignore) }?;
    }

    let chld = SigAction::new(
        SigHandler::Handler(chld_handler),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: the handler body is empty.
    unsafe { sigaction(Signal::SIGCHLD, &chld) }?;
    unblock(Signal::SIGCHLD);

    Ok(())
}

/// Records the forked child so the handler forwards instead of exiting.
pub(crate) fn set_monitored(pid: Pid) {
    MONITORED_PID.store(pid.as_raw(), Ordering::SeqCst);
}

/// Whether the alarm fired at any point before the child was reaped.
pub(crate) fn timed_out() -> bool {
    TIMED_OUT.load(Ordering::SeqCst)
}

/// Removes `sig` from this thread's blocked mask.
///
/// The mask is inherited from the caller and not to be trusted: a blocked
/// alarm would turn the timeout into a no-op.
pub(crate) fn unblock(sig: Signal) {
    let mut set = SigSet::empty();
    set.add(sig);
    if let Err(errno) = sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&set), None) {
        eprintln!("vigil: warning: sigprocmask: {errno}");
    }
}

/// Blocks every cleanup-trigger signal plus SIGCHLD, returning the previous
/// mask for [`suspend`].
///
/// From here until the outcome is written no handler can run, so nothing
/// can act on a child id that a concurrent reap is about to retire. On the
/// (never observed) failure to block, the returned mask is empty and the
/// loop degrades to plain suspend-with-everything-open.
pub(crate) fn block_cleanup_and_chld(term_signal: Signal) -> SigSet {
    let mut block = cleanup_set(term_signal);
    block.add(Signal::SIGCHLD);
    let mut prev = SigSet::empty();
    if let Err(errno) = sigprocmask(SigmaskHow::SIG_BLOCK, Some(&block), Some(&mut prev)) {
        eprintln!("vigil: warning: sigprocmask: {errno}");
    }
    prev
}

/// Waits for a signal, atomically swapping `mask` in for the duration.
///
/// This is the race-free half of the reap loop: the cleanup signals are
/// only deliverable while we are actually parked here, so one arriving
/// between a reap attempt and the park is held pending and wakes us
/// immediately instead of being lost.
pub(crate) fn suspend(mask: &SigSet) {
    // SAFETY: sigsuspend reads the set, parks, and always returns with the
    // original mask restored.
    unsafe { libc::sigsuspend(mask.as_ref()) };
}

/// Child side, between fork and exec: put the job-control stall signals
/// back to their defaults. An ignored disposition would survive the exec.
pub(crate) fn restore_job_control_defaults() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for sig in [Signal::SIGTTIN, Signal::SIGTTOU] {
        // SAFETY: restores the default disposition; failure is unobservable
        // in the child and harmless.
        let _ = unsafe { sigaction(sig, &default) };
    }
}

/// The cleanup-trigger set: the alarm, the external termination signals,
/// and whatever gets substituted at the timeout.
fn cleanup_signals(term_signal: Signal) -> [Signal; 6] {
    [
        Signal::SIGALRM,
        Signal::SIGINT,
        Signal::SIGQUIT,
        Signal::SIGHUP,
        Signal::SIGTERM,
        term_signal,
    ]
}

/// Mask covering every signal bound to the cleanup handler.
fn cleanup_set(term_signal: Signal) -> SigSet {
    let mut set = SigSet::empty();
    for sig in cleanup_signals(term_signal) {
        set.add(sig);
    }
    set
}

/// Cleanup handler: timeout marking, signal substitution, forwarding.
///
/// Runs for every cleanup-trigger signal. The alarm marks the timeout and
/// becomes the configured termination signal; with a child on record the
/// signal is forwarded straight to its pid, reaching it even if it made
/// itself a group leader. With no child yet there is nothing to clean up
/// and the process leaves with the conventional code.
extern "C" fn cleanup_handler(raw: libc::c_int) {
    let mut sig = raw;
    if sig == libc::SIGALRM {
        TIMED_OUT.store(true, Ordering::SeqCst);
        sig = TERM_SIGNAL.load(Ordering::SeqCst);
    }
    let pid = MONITORED_PID.load(Ordering::SeqCst);
    if pid == 0 {
        // SAFETY: _exit is async-signal-safe.
        unsafe { libc::_exit(128 + sig) };
    }
    send_sig(pid, sig);
}

/// Wakes a pending [`suspend`] when the child changes state; nothing else.
extern "C" fn chld_handler(_sig: libc::c_int) {}

/// Forwards `sig` to `pid`, or to the whole process group when `pid` is 0.
///
/// A group send includes this process, so the sender's own disposition is
/// first set to ignore to keep the handler from re-entering itself.
fn send_sig(pid: libc::pid_t, sig: libc::c_int) {
    if pid == 0 {
        // SAFETY: signal(2) with SIG_IGN is async-signal-safe.
        unsafe {
            libc::signal(sig, libc::SIG_IGN);
        }
    }
    // SAFETY: kill is async-signal-safe.
    unsafe {
        libc::kill(pid, sig);
    }
}
