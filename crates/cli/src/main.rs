//! `rusty-automation-tool` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`             — start the scheduler federation and the API server.
//! - `worker`            — register a worker connection and heartbeat until interrupted.
//! - `migrate`           — run pending database migrations.
//! - `validate`          — validate a workflow definition JSON file.
//! - `scheduler-status`  — print each named scheduler's job count and next fire time.

mod collaborators;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use cron_core::{CronCore, SchedulerRegistry};
use db::DbPool;
use nodes::traits::Collaborators;
use taskqueue::{
    CleanupSweeper, GitSyncScheduler, QueueTaskClient, ScheduledTaskRunner, SyncNotifier, TaskQueue, TaskService,
    TicketSyncScheduler, WorkerRegistry,
};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(
    name = "rusty-automation-tool",
    about = "Self-healing orchestration core for multi-tenant ops automation",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the scheduler federation and the REST API server.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Register a worker connection and heartbeat until interrupted.
    ///
    /// This only keeps the connection alive for the queue to dispatch
    /// against (spec §4.9) — running an assigned task's script on the
    /// worker side is out of scope.
    Worker {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
        /// Stable identifier for this worker process.
        #[arg(long, env = "WORKER_ID")]
        worker_id: String,
        /// Address recorded in `worker_connections.ip`.
        #[arg(long)]
        ip: String,
        /// Access key a dispatcher checks before handing this worker a task.
        #[arg(long, env = "WORKER_ACCESS_KEY")]
        access_key: String,
    },
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow definition JSON file.
        path: std::path::PathBuf,
    },
    /// Print each scheduler's registered job count and next fire time.
    SchedulerStatus {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind, database_url } => {
            if let Err(err) = serve(&bind, &database_url).await {
                error!(%err, "server exited with an error");
                std::process::exit(1);
            }
        }
        Command::Worker { database_url, worker_id, ip, access_key } => {
            if let Err(err) = worker(&database_url, &worker_id, &ip, &access_key).await {
                error!(%err, "worker exited with an error");
                std::process::exit(1);
            }
        }
        Command::Migrate { database_url } => {
            info!("Running migrations against {database_url}");
            let pool = db::pool::create_pool(&database_url, 2).await.expect("failed to connect to database");
            db::pool::run_migrations(&pool).await.expect("migration failed");
            info!("Migrations applied successfully");
        }
        Command::Validate { path } => {
            let content =
                std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read file {}: {e}", path.display()));

            let definition: engine::WorkflowDefinition =
                serde_json::from_str(&content).unwrap_or_else(|e| panic!("invalid JSON: {e}"));

            match engine::validate_dag(&definition) {
                Ok(parsed) => {
                    println!("workflow is valid. execution order: {:?}", parsed.topo_order);
                }
                Err(e) => {
                    eprintln!("validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::SchedulerStatus { database_url } => {
            let pool = db::pool::create_pool(&database_url, 2).await.expect("failed to connect to database");
            let runtime = match build_runtime(pool).await {
                Ok(runtime) => runtime,
                Err(err) => {
                    eprintln!("failed to start schedulers: {err}");
                    std::process::exit(1);
                }
            };
            for status in runtime.registry.status() {
                println!(
                    "{:<16} jobs={:<5} next_fire_at={:?} prev_fire_at={:?}",
                    status.name, status.job_count, status.next_fire_at, status.prev_fire_at
                );
            }
        }
    }
}

/// Everything wired up at process start: the four cron-driven schedulers,
/// the task queue/service pair, the worker registry, and the workflow
/// executor they all feed into.
struct Runtime {
    pool: DbPool,
    executor: Arc<engine::WorkflowExecutor>,
    registry: Arc<SchedulerRegistry>,
    rule_scheduler: Arc<rulesvc::RuleScheduler>,
    queue: Arc<TaskQueue>,
    worker_registry: Arc<WorkerRegistry>,
    // Kept alive for the life of the process — each owns a cron
    // registration that must not be dropped while schedulers are running.
    _scheduled_task_runner: Arc<ScheduledTaskRunner>,
    _git_sync_scheduler: Arc<GitSyncScheduler>,
    _ticket_sync_scheduler: Arc<TicketSyncScheduler>,
}

async fn build_runtime(pool: DbPool) -> Result<Runtime, anyhow::Error> {
    let queue = Arc::new(TaskQueue::new());
    let task_service = Arc::new(TaskService::new(pool.clone(), Arc::clone(&queue)));
    let worker_registry = Arc::new(WorkerRegistry::new(pool.clone()));

    let collaborators = Collaborators {
        hosts: Arc::new(taskqueue::DbHostLookup::new(pool.clone())),
        tasks: Arc::new(QueueTaskClient::new(Arc::clone(&task_service))),
        tickets: Arc::new(collaborators::UnconfiguredTicketWriter),
        credentials: Arc::new(collaborators::UnconfiguredCredentialService),
    };

    let node_registry = nodes::default_registry();
    let executor = Arc::new(engine::WorkflowExecutor::new(
        pool.clone(),
        node_registry,
        collaborators,
        engine::ExecutorConfig::default(),
    ));

    let mut registry = SchedulerRegistry::new();
    let rule_cron = CronCore::new("rule");
    let scheduled_task_cron = CronCore::new("scheduled_task");
    let git_sync_cron = CronCore::new("git_sync");
    let ticket_sync_cron = CronCore::new("ticket_sync");
    registry.register("rule", Arc::clone(&rule_cron));
    registry.register("scheduled_task", Arc::clone(&scheduled_task_cron));
    registry.register("git_sync", Arc::clone(&git_sync_cron));
    registry.register("ticket_sync", Arc::clone(&ticket_sync_cron));
    let registry = Arc::new(registry);

    let rule_scheduler = rulesvc::RuleScheduler::new(
        pool.clone(),
        Arc::clone(&executor),
        rule_cron,
        rulesvc::RuleSchedulerConfig::default(),
    );
    rule_scheduler.start().await?;

    let scheduled_task_runner = ScheduledTaskRunner::new(pool.clone(), Arc::clone(&task_service), scheduled_task_cron);
    scheduled_task_runner.start().await?;

    let sync_notifier = SyncNotifier::new();
    let git_sync_scheduler = GitSyncScheduler::new(pool.clone(), git_sync_cron, sync_notifier.clone());
    git_sync_scheduler.start().await?;
    let ticket_sync_scheduler = TicketSyncScheduler::new(pool.clone(), ticket_sync_cron, sync_notifier);
    ticket_sync_scheduler.start().await?;

    registry.start_all();

    Ok(Runtime {
        pool,
        executor,
        registry,
        rule_scheduler,
        queue,
        worker_registry,
        _scheduled_task_runner: scheduled_task_runner,
        _git_sync_scheduler: git_sync_scheduler,
        _ticket_sync_scheduler: ticket_sync_scheduler,
    })
}

/// Register this process as a worker connection and heartbeat on an
/// interval well under the registry's staleness timeout until the process
/// is interrupted (spec §4.9).
async fn worker(database_url: &str, worker_id: &str, ip: &str, access_key: &str) -> Result<(), anyhow::Error> {
    let pool = db::pool::create_pool(database_url, 2).await?;
    let registry = WorkerRegistry::new(pool);

    registry.register(worker_id, ip, access_key).await?;
    info!(worker_id, ip, "worker connected");

    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(20));
    ticker.tick().await; // first tick fires immediately; registration already covers it

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = registry.heartbeat(worker_id).await {
                    warn!(worker_id, %err, "heartbeat failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!(worker_id, "worker shutting down");
                return Ok(());
            }
        }
    }
}

async fn serve(bind: &str, database_url: &str) -> Result<(), anyhow::Error> {
    let pool = db::pool::create_pool(database_url, 10).await?;
    let runtime = build_runtime(pool).await?;

    let cleanup = CleanupSweeper::new(runtime.pool.clone(), Arc::clone(&runtime.queue));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            ticker.tick().await;
            match cleanup.sweep().await {
                Ok(report) => info!(?report, "cleanup sweep completed"),
                Err(err) => error!(%err, "cleanup sweep failed"),
            }
        }
    });

    let worker_registry = Arc::clone(&runtime.worker_registry);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            ticker.tick().await;
            if let Err(err) = worker_registry.sweep_stale().await {
                warn!(%err, "worker heartbeat sweep failed");
            }
        }
    });

    let state = api::AppState {
        pool: runtime.pool,
        executor: runtime.executor,
        rules: runtime.rule_scheduler,
        schedulers: runtime.registry,
    };

    info!("Starting API server on {bind}");
    api::serve(bind, state).await?;
    Ok(())
}
