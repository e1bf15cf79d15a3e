use clap::{Args, Subcommand};
use jiff::{SignedDuration, Timestamp};
use ranksync_app::domain::{
    identifiers::SubjectId,
    sync::{PgSyncQueue, SyncQueue},
};

use crate::cli::args::{DatabaseArgs, RetryArgs, TenantArgs};

#[derive(Debug, Args)]
pub(crate) struct QueueCommand {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    retry: RetryArgs,

    #[command(subcommand)]
    command: QueueSubcommand,
}

#[derive(Debug, Subcommand)]
enum QueueSubcommand {
    /// Put failed jobs back in the queue with a fresh attempt budget
    Requeue {
        #[command(flatten)]
        tenant: TenantArgs,

        /// Only this subject
        #[arg(long)]
        subject: Option<u64>,
    },

    /// Delete finished jobs older than the retention period
    Purge {
        #[arg(long, env = "SYNC_RETENTION_DAYS", default_value_t = 30)]
        older_than_days: u32,
    },
}

pub(crate) async fn run(command: QueueCommand) -> Result<(), String> {
    let db = command.database.connect().await?;
    let queue = PgSyncQueue::new(db, command.retry.policy());
    let now = Timestamp::now();

    match command.command {
        QueueSubcommand::Requeue { tenant, subject } => {
            let requeued = queue
                .requeue_failed(&tenant.tenant(), subject.map(SubjectId), now)
                .await
                .map_err(|error| format!("failed to requeue jobs: {error}"))?;

            println!("requeued: {requeued}");
        }
        QueueSubcommand::Purge { older_than_days } => {
            let cutoff = now
                .checked_sub(SignedDuration::from_hours(i64::from(older_than_days) * 24))
                .map_err(|error| format!("invalid retention: {error}"))?;

            let purged = queue
                .purge_terminal_before(cutoff)
                .await
                .map_err(|error| format!("failed to purge jobs: {error}"))?;

            println!("purged: {purged}");
        }
    }

    Ok(())
}
