use std::{sync::Arc, time::Duration};

use clap::Args;
use jiff::SignedDuration;
use ranksync_app::{
    domain::{links::PgLinksService, sync::PgSyncQueue},
    worker::{RoleSyncWorker, WorkerConfig},
};
use tokio::sync::watch;
use tracing::info;

use crate::cli::args::{DatabaseArgs, DirectoryArgs, RetryArgs};

#[derive(Debug, Args)]
pub(crate) struct WorkerCommand {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    directory: DirectoryArgs,

    #[command(flatten)]
    retry: RetryArgs,

    #[arg(long, env = "SYNC_POLL_INTERVAL_SECONDS", default_value_t = 30)]
    poll_interval_seconds: u64,

    #[arg(long, env = "SYNC_BATCH_SIZE", default_value_t = 25)]
    batch_size: u32,

    #[arg(long, env = "SYNC_RETENTION_DAYS", default_value_t = 30)]
    retention_days: u32,
}

pub(crate) async fn run(command: WorkerCommand) -> Result<(), String> {
    let db = command.database.connect().await?;

    let worker = RoleSyncWorker::new(
        Arc::new(PgSyncQueue::new(db.clone(), command.retry.policy())),
        Arc::new(PgLinksService::new(db)),
        command.directory.client()?,
        WorkerConfig {
            poll_interval: Duration::from_secs(command.poll_interval_seconds.max(1)),
            batch_size: command.batch_size,
            retention: SignedDuration::from_hours(i64::from(command.retention_days) * 24),
            ..WorkerConfig::default()
        },
    );

    let (stop, shutdown) = watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping worker");
            stop.send(true).ok();
        }
    });

    worker.run(shutdown).await;

    Ok(())
}
