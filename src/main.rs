use std::process::ExitCode;
use std::sync::Arc;
use usersvc::commands::{Cli, Commands, ServiceArgs, StartArgs};
use usersvc::error::AppError;
use usersvc::service::{self, TracingRequestLogger};
use usersvc::supervisor::{ExecSpawner, Supervisor, SupervisorState};
use usersvc::utils::logger::init_logger;

// Each process drives a single-threaded event loop; parallelism comes from
// the worker processes.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse_cli();

    if let Err(err) = init_logger(cli.log_level.as_deref()) {
        eprintln!("Failed to initialise logging: {err}");
        return ExitCode::from(2);
    }

    let log_level = cli.log_level.clone();
    let command = cli.into_command();
    let state = SupervisorState::from(command.role());

    let result = match (state, command) {
        (SupervisorState::Leading, Commands::Start(args)) => {
            run_leader(&args, log_level.as_deref()).await
        }
        (SupervisorState::Working, Commands::Worker(args)) => run_worker(&args).await,
        _ => Err(AppError::Config("role does not match command".to_string())),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(category = %err.category(), "{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run_leader(args: &StartArgs, log_level: Option<&str>) -> Result<(), AppError> {
    // Validate before forking so a bad address fails once, in the leader
    args.service.to_config()?;

    let spawner = ExecSpawner::current_exe(args.service.worker_argv(log_level))?;
    let supervisor =
        Supervisor::new(spawner, args.worker_count()).with_restart_policy(args.restart_policy());
    let shutdown = usersvc::signal::termination()?;

    let report = supervisor.run_until(shutdown).await?;
    tracing::info!(workers = report.workers.len(), "leader exiting");
    Ok(())
}

async fn run_worker(args: &ServiceArgs) -> Result<(), AppError> {
    let config = args.to_config()?;
    service::run_worker(&config, Arc::new(TracingRequestLogger))
        .await
        .map_err(AppError::from)
}

