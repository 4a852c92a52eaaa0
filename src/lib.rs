//! usersvc
//!
//! A leader process fans out one worker per CPU core; every worker loads the
//! same read-only user dataset and answers HTTP GET requests on a shared port.

pub mod commands;
pub mod config;
pub mod dataset;
pub mod error;
pub mod platform;
pub mod service;
pub mod signal;
pub mod supervisor;
pub mod utils;

pub use dataset::{Dataset, DatasetSource, User};
pub use error::{AppError, DatasetError, ErrorCategory, LookupError, ServiceError, SupervisorError};
pub use service::{RequestLogger, Service, ServiceConfig};
pub use supervisor::{
    ExecSpawner, RestartPolicy, Role, Supervisor, SupervisorReport, SupervisorState, WorkerExit,
    WorkerHandle, WorkerSpawner,
};
