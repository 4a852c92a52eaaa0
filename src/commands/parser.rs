//! CLI argument parsing
//!
//! The process role is chosen explicitly here: the leader is the default
//! command, workers are launched with the hidden `worker` subcommand.

use crate::config::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RESTART_BACKOFF, WORKER_SUBCOMMAND};
use crate::dataset::DatasetSource;
use crate::error::ServiceError;
use crate::platform;
use crate::service::ServiceConfig;
use crate::supervisor::{RestartPolicy, Role};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Listener and dataset options shared by the leader and its workers.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ServiceArgs {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
    /// TCP port shared by all workers
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Dataset JSON file (defaults to the bundled dataset)
    #[arg(long, value_name = "PATH")]
    pub dataset: Option<PathBuf>,
}

impl Default for ServiceArgs {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            dataset: None,
        }
    }
}

impl ServiceArgs {
    pub fn to_config(&self) -> Result<ServiceConfig, ServiceError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ServiceError::InvalidAddress(self.host.clone()))?;
        Ok(ServiceConfig {
            addr: SocketAddr::new(ip, self.port),
            dataset: DatasetSource::from_path(self.dataset.clone()),
        })
    }

    /// Arguments that start a worker with these options.
    pub fn worker_argv(&self, log_level: Option<&str>) -> Vec<OsString> {
        let mut argv: Vec<OsString> = Vec::new();
        if let Some(level) = log_level {
            argv.push("--log-level".into());
            argv.push(level.into());
        }
        argv.push(WORKER_SUBCOMMAND.into());
        argv.push("--host".into());
        argv.push(self.host.clone().into());
        argv.push("--port".into());
        argv.push(self.port.to_string().into());
        if let Some(path) = &self.dataset {
            argv.push("--dataset".into());
            argv.push(path.clone().into_os_string());
        }
        argv
    }
}

/// Leader options.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct StartArgs {
    /// Number of worker processes (defaults to the number of CPU cores)
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,
    /// Restarts allowed per crashed worker slot; 0 only logs exits
    #[arg(long, default_value_t = 0)]
    pub max_restarts: u32,
    /// Delay before the first restart of a slot, doubled for each later one
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_RESTART_BACKOFF.as_millis() as u64)]
    pub restart_backoff_ms: u64,
    #[command(flatten)]
    pub service: ServiceArgs,
}

impl Default for StartArgs {
    fn default() -> Self {
        Self {
            workers: None,
            max_restarts: 0,
            restart_backoff_ms: DEFAULT_RESTART_BACKOFF.as_millis() as u64,
            service: ServiceArgs::default(),
        }
    }
}

impl StartArgs {
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(platform::cpu_count)
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        if self.max_restarts == 0 {
            RestartPolicy::Never
        } else {
            RestartPolicy::Bounded {
                max_restarts: self.max_restarts,
                backoff: Duration::from_millis(self.restart_backoff_ms),
            }
        }
    }
}

/// Prefork user service
#[derive(Parser, Debug, Clone)]
#[command(name = "usersvc", version, about = "Serve a read-only user dataset from one worker process per CPU core")]
pub struct Cli {
    /// Log filter (trace, debug, info, warn, error or a RUST_LOG directive)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the leader and one worker per CPU core (default)
    Start(StartArgs),

    /// Run a single worker (launched by the leader)
    #[command(name = "worker", hide = true)]
    Worker(ServiceArgs),
}

impl Commands {
    pub fn role(&self) -> Role {
        match self {
            Commands::Start(_) => Role::Leader,
            Commands::Worker(_) => Role::Worker,
        }
    }
}

impl Cli {
    /// Parse the process arguments; clap reports errors and exits.
    pub fn parse_cli() -> Cli {
        match Self::try_parse_cli_from(std::env::args_os()) {
            Ok(cli) => cli,
            Err(err) => err.exit(),
        }
    }

    /// Parse arguments, defaulting to `start` when no subcommand is given.
    pub fn try_parse_cli_from<I, T>(iter: I) -> Result<Cli, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut cli = Cli::try_parse_from(iter)?;
        cli.command
            .get_or_insert_with(|| Commands::Start(StartArgs::default()));
        Ok(cli)
    }

    pub fn try_parse_command_from<I, T>(iter: I) -> Result<Commands, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::try_parse_cli_from(iter)?.into_command())
    }

    pub fn into_command(self) -> Commands {
        self.command
            .unwrap_or_else(|| Commands::Start(StartArgs::default()))
    }
}
