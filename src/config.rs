use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
// Pending-connection queue per worker listener
pub const LISTEN_BACKLOG: u32 = 1024;

/// Subcommand the leader passes to re-executed workers.
pub const WORKER_SUBCOMMAND: &str = "worker";

pub const ROOT_READY_TEXT: &str = "Ready to receive requests";
pub const API_READY_TEXT: &str = "API ready to receive requests";

pub const DEFAULT_LOG_FILTER: &str = "info,usersvc=debug";

// Restart policy (only consulted when restarts are enabled)
pub const DEFAULT_RESTART_BACKOFF: Duration = Duration::from_millis(500);
pub const MAX_RESTART_BACKOFF: Duration = Duration::from_secs(30);

/// How long workers get to exit after SIGTERM before they are killed.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
