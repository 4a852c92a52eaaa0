//! Multi-process fan-out
//!
//! The leader starts one worker per slot and then only observes them: each
//! exit is logged with the worker's pid. By default nothing is restarted;
//! [`RestartPolicy::Bounded`] opts into a limited number of restarts per slot
//! with doubling backoff.

use crate::config::{MAX_RESTART_BACKOFF, SHUTDOWN_GRACE};
use crate::error::SupervisorError;
use crate::platform;
use chrono::{DateTime, Utc};
use std::ffi::OsString;
use std::fmt;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Which part a process plays, fixed at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Leader,
    Worker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Spawns workers, then processes exit events
    Leading,
    /// Runs the service in-process
    Working,
}

impl From<Role> for SupervisorState {
    fn from(role: Role) -> Self {
        match role {
            Role::Leader => SupervisorState::Leading,
            Role::Worker => SupervisorState::Working,
        }
    }
}

/// Starts the process backing one worker slot.
pub trait WorkerSpawner: Send + Sync {
    fn spawn(&self, slot: usize) -> io::Result<Child>;
}

/// Re-executes a program (normally the current binary) as a worker.
#[derive(Debug, Clone)]
pub struct ExecSpawner {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExecSpawner {
    pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn current_exe(args: Vec<OsString>) -> Result<Self, SupervisorError> {
        let program = std::env::current_exe().map_err(SupervisorError::CurrentExe)?;
        Ok(Self::new(program, args))
    }
}

impl WorkerSpawner for ExecSpawner {
    fn spawn(&self, _slot: usize) -> io::Result<Child> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        platform::prepare_worker_command(&mut command);
        command.spawn()
    }
}

/// How a worker process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl WorkerExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for WorkerExit {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(signal)) => write!(f, "signal {signal}"),
            (None, None) => f.write_str("unknown status"),
        }
    }
}

/// Leader-side record of one forked worker. Never reused: a restarted slot
/// gets a fresh handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerHandle {
    pub slot: usize,
    pub pid: u32,
    pub spawned_at: DateTime<Utc>,
    pub exited_at: Option<DateTime<Utc>>,
    pub exit: Option<WorkerExit>,
}

impl WorkerHandle {
    fn new(slot: usize, pid: u32) -> Self {
        Self {
            slot,
            pid,
            spawned_at: Utc::now(),
            exited_at: None,
            exit: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.exited_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Log the exit and leave the slot empty
    #[default]
    Never,
    /// Restart a crashed slot up to `max_restarts` times, waiting `backoff`
    /// before the first restart and doubling it for each one after.
    Bounded { max_restarts: u32, backoff: Duration },
}

impl RestartPolicy {
    /// Delay before the next restart of a slot that has already been
    /// restarted `restarts` times, or `None` once the budget is spent.
    pub fn delay_for(&self, restarts: u32) -> Option<Duration> {
        match *self {
            RestartPolicy::Never => None,
            RestartPolicy::Bounded {
                max_restarts,
                backoff,
            } => {
                if restarts >= max_restarts {
                    return None;
                }
                let factor = 1u32.checked_shl(restarts).unwrap_or(u32::MAX);
                Some(
                    backoff
                        .checked_mul(factor)
                        .map_or(MAX_RESTART_BACKOFF, |d| d.min(MAX_RESTART_BACKOFF)),
                )
            }
        }
    }
}

/// Every worker the leader started, in spawn order.
#[derive(Debug, Clone, Default)]
pub struct SupervisorReport {
    pub workers: Vec<WorkerHandle>,
}

impl SupervisorReport {
    pub fn slot(&self, slot: usize) -> impl Iterator<Item = &WorkerHandle> {
        self.workers.iter().filter(move |handle| handle.slot == slot)
    }
}

type ExitEvent = (usize, io::Result<ExitStatus>);

pub struct Supervisor<S> {
    spawner: S,
    worker_count: usize,
    restart: RestartPolicy,
}

impl<S: WorkerSpawner> Supervisor<S> {
    pub fn new(spawner: S, worker_count: usize) -> Self {
        Self {
            spawner,
            worker_count,
            restart: RestartPolicy::Never,
        }
    }

    pub fn with_restart_policy(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Fan out and observe workers until they are all gone or `shutdown`
    /// resolves.
    ///
    /// Fails only if the initial fan-out cannot spawn a worker; exits and
    /// failed restarts later on are logged, not returned.
    pub async fn run_until<F>(self, shutdown: F) -> Result<SupervisorReport, SupervisorError>
    where
        F: Future<Output = ()>,
    {
        if self.worker_count == 0 {
            return Err(SupervisorError::NoWorkers);
        }

        let leader = platform::current_pid();
        info!(pid = leader, workers = self.worker_count, "Leader {} is running", leader);

        let mut handles = Vec::with_capacity(self.worker_count);
        let mut restarts = vec![0u32; self.worker_count];
        let mut exits: JoinSet<ExitEvent> = JoinSet::new();
        let mut timers: JoinSet<usize> = JoinSet::new();

        for slot in 0..self.worker_count {
            self.launch(slot, &mut handles, &mut exits)?;
        }

        tokio::pin!(shutdown);
        loop {
            if exits.is_empty() && timers.is_empty() {
                info!("all workers have exited");
                break;
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutdown requested, stopping workers");
                    timers.shutdown().await;
                    stop_workers(&mut handles, &mut exits).await;
                    break;
                }
                Some(joined) = exits.join_next() => {
                    let Ok((index, status)) = joined else {
                        error!("worker wait task failed");
                        continue;
                    };
                    let exit = record_exit(&mut handles[index], status);
                    let slot = handles[index].slot;
                    if exit.is_some_and(|exit| exit.success()) {
                        continue;
                    }
                    if let Some(delay) = self.restart.delay_for(restarts[slot]) {
                        restarts[slot] += 1;
                        info!(
                            slot,
                            attempt = restarts[slot],
                            delay_ms = delay.as_millis() as u64,
                            "scheduling worker restart"
                        );
                        timers.spawn(async move {
                            tokio::time::sleep(delay).await;
                            slot
                        });
                    }
                }
                Some(joined) = timers.join_next() => {
                    let Ok(slot) = joined else {
                        continue;
                    };
                    if let Err(err) = self.launch(slot, &mut handles, &mut exits) {
                        error!(slot, "{err}");
                    }
                }
            }
        }

        Ok(SupervisorReport { workers: handles })
    }

    fn launch(
        &self,
        slot: usize,
        handles: &mut Vec<WorkerHandle>,
        exits: &mut JoinSet<ExitEvent>,
    ) -> Result<(), SupervisorError> {
        let mut child = self
            .spawner
            .spawn(slot)
            .map_err(|source| SupervisorError::Spawn { slot, source })?;
        // `id` is only `None` once the child has been reaped
        let Some(pid) = child.id() else {
            return Err(SupervisorError::Spawn {
                slot,
                source: io::Error::other("worker exited before its pid was read"),
            });
        };
        let index = handles.len();
        handles.push(WorkerHandle::new(slot, pid));
        debug!(slot, pid, "worker spawned");

        exits.spawn(async move { (index, child.wait().await) });
        Ok(())
    }
}

fn record_exit(handle: &mut WorkerHandle, status: io::Result<ExitStatus>) -> Option<WorkerExit> {
    handle.exited_at = Some(Utc::now());
    match status {
        Ok(status) => {
            let exit = WorkerExit::from(status);
            handle.exit = Some(exit);
            if exit.success() {
                info!(pid = handle.pid, slot = handle.slot, "worker {} died ({})", handle.pid, exit);
            } else {
                warn!(pid = handle.pid, slot = handle.slot, "worker {} died ({})", handle.pid, exit);
            }
            Some(exit)
        }
        Err(err) => {
            warn!(pid = handle.pid, slot = handle.slot, "worker {} died (wait failed: {})", handle.pid, err);
            None
        }
    }
}

/// SIGTERM every live worker, reap them within the grace period, kill the rest.
async fn stop_workers(handles: &mut [WorkerHandle], exits: &mut JoinSet<ExitEvent>) {
    for handle in handles.iter().filter(|handle| handle.is_running()) {
        if let Err(err) = platform::terminate_process(handle.pid) {
            warn!(pid = handle.pid, "failed to signal worker: {err}");
        }
    }

    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while let Some(joined) = exits.join_next().await {
            if let Ok((index, status)) = joined {
                record_exit(&mut handles[index], status);
            }
        }
    })
    .await;

    if drained.is_err() {
        warn!("workers still running after grace period, killing");
        // Aborting the wait tasks drops each `Child`, which kills it
        exits.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_map_to_states() {
        assert_eq!(SupervisorState::from(Role::Leader), SupervisorState::Leading);
        assert_eq!(SupervisorState::from(Role::Worker), SupervisorState::Working);
    }

    #[test]
    fn never_policy_does_not_restart() {
        assert_eq!(RestartPolicy::Never.delay_for(0), None);
    }

    #[test]
    fn bounded_policy_doubles_and_stops() {
        let policy = RestartPolicy::Bounded {
            max_restarts: 3,
            backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(0), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_for(3), None);
    }

    #[test]
    fn bounded_backoff_is_capped() {
        let policy = RestartPolicy::Bounded {
            max_restarts: 100,
            backoff: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for(40), Some(MAX_RESTART_BACKOFF));
    }

    #[test]
    fn exit_display() {
        let clean = WorkerExit { code: Some(0), signal: None };
        let killed = WorkerExit { code: None, signal: Some(9) };
        assert!(clean.success());
        assert!(!killed.success());
        assert_eq!(clean.to_string(), "exit code 0");
        assert_eq!(killed.to_string(), "signal 9");
    }
}
