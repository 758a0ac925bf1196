//! Runtime control of a running instance through POSIX signals.
//!
//! `pulsekey next|vsync|faster|slower|quit` finds the running process and
//! signals it; the handler only flips atomics, which the loop drains at the
//! next cycle boundary.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

pub static QUIT: AtomicBool = AtomicBool::new(false);
static NEXT_PROFILE: AtomicBool = AtomicBool::new(false);
static TOGGLE_VSYNC: AtomicBool = AtomicBool::new(false);
static RATE_STEPS: AtomicI32 = AtomicI32::new(0);

/// Fixed-rate change per `faster`/`slower` request.
pub const RATE_STEP_HZ: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NextProfile,
    ToggleVsync,
    /// Net number of rate steps requested (negative = slower).
    StepRate(i32),
}

fn faster_signal() -> libc::c_int {
    libc::SIGRTMIN()
}

fn slower_signal() -> libc::c_int {
    libc::SIGRTMIN() + 1
}

/// Handle a control subcommand. Returns `true` if one was given.
pub fn dispatch_subcommand(arg: &str) -> bool {
    let (sig, action) = match arg {
        "next" => (libc::SIGUSR1, "Next profile"),
        "vsync" => (libc::SIGUSR2, "V-sync toggle"),
        "faster" => (faster_signal(), "Faster"),
        "slower" => (slower_signal(), "Slower"),
        "quit" => (libc::SIGTERM, "Quit"),
        _ => return false,
    };
    send_to_running(sig, action);
    true
}

pub fn signal_setup() {
    let handler = signal_handler as libc::sighandler_t;
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
        libc::signal(libc::SIGUSR1, handler);
        libc::signal(libc::SIGUSR2, handler);
        libc::signal(faster_signal(), handler);
        libc::signal(slower_signal(), handler);
    }
}

extern "C" fn signal_handler(sig: libc::c_int) {
    if sig == libc::SIGUSR1 {
        NEXT_PROFILE.store(true, Ordering::Relaxed);
    } else if sig == libc::SIGUSR2 {
        TOGGLE_VSYNC.store(true, Ordering::Relaxed);
    } else if sig == faster_signal() {
        RATE_STEPS.fetch_add(1, Ordering::Relaxed);
    } else if sig == slower_signal() {
        RATE_STEPS.fetch_sub(1, Ordering::Relaxed);
    } else {
        QUIT.store(true, Ordering::Relaxed);
    }
}

/// Take every command requested since the last call.
pub fn drain() -> Vec<Command> {
    let mut commands = Vec::new();
    if NEXT_PROFILE.swap(false, Ordering::Relaxed) {
        commands.push(Command::NextProfile);
    }
    if TOGGLE_VSYNC.swap(false, Ordering::Relaxed) {
        commands.push(Command::ToggleVsync);
    }
    let steps = RATE_STEPS.swap(0, Ordering::Relaxed);
    if steps != 0 {
        commands.push(Command::StepRate(steps));
    }
    commands
}

/// Name the kernel reports in `/proc/<pid>/comm` for this binary.
const PROCESS_NAME: &str = "pulsekey";

/// Pids of other processes whose command name is `name`.
fn instances_named(name: &str) -> Vec<i32> {
    let own = std::process::id() as i32;
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter_map(|entry| {
            let pid: i32 = entry.file_name().to_str()?.parse().ok()?;
            let comm = std::fs::read_to_string(entry.path().join("comm")).ok()?;
            (pid != own && comm.trim() == name).then_some(pid)
        })
        .collect()
}

/// Signal every running instance; exits non-zero if none was reached.
fn send_to_running(sig: libc::c_int, action: &str) {
    let pids = instances_named(PROCESS_NAME);
    if pids.is_empty() {
        eprintln!("No running {} instance found", PROCESS_NAME);
        std::process::exit(1);
    }
    let mut delivered = false;
    for pid in pids {
        if unsafe { libc::kill(pid, sig) } == 0 {
            eprintln!("{} sent to {} (pid {})", action, PROCESS_NAME, pid);
            delivered = true;
        } else {
            eprintln!("Failed to signal {} (pid {})", PROCESS_NAME, pid);
        }
    }
    if !delivered {
        std::process::exit(1);
    }
}
