use std::io;
use tokio::process::Command;
use tracing::debug;

/// Prepare the environment a worker process is started in.
///
/// On Linux the worker is sent SIGTERM when the leader dies, so workers never
/// outlive the process that forked them.
pub fn prepare_worker_command(cmd: &mut Command) {
    #[cfg(target_os = "linux")]
    {
        // SAFETY: the closure only issues an async-signal-safe prctl call.
        unsafe {
            cmd.pre_exec(|| {
                if set_parent_death_signal() != 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = cmd;
    }
}

/// Check if process is alive
///
/// pid 0 names the caller's process group, never a single worker.
pub fn process_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    #[cfg(unix)]
    {
        match send_signal(pid as libc::pid_t, 0) {
            Ok(()) => true,
            // EPERM means the process exists but belongs to someone else
            Err(err) => err.raw_os_error() == Some(libc::EPERM),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

/// Ask a process to exit with SIGTERM.
pub fn terminate_process(pid: u32) -> io::Result<()> {
    if pid == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "refusing to signal pid 0",
        ));
    }
    #[cfg(unix)]
    {
        if !process_alive(pid) {
            return Ok(());
        }
        send_signal(pid as libc::pid_t, libc::SIGTERM)?;
        debug!(pid, "sent SIGTERM");
        Ok(())
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "signals are not supported on this platform",
        ))
    }
}

#[cfg(target_os = "linux")]
fn set_parent_death_signal() -> libc::c_int {
    unsafe { libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) }
}

#[cfg(unix)]
fn send_signal(pid: libc::pid_t, signal: libc::c_int) -> io::Result<()> {
    let result = unsafe { libc::kill(pid, signal) };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
