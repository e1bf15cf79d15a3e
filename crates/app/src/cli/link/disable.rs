use clap::Args;
use ranksync_app::domain::links::{LinksService, PgLinksService};

use crate::cli::args::{DatabaseArgs, TenantArgs};

#[derive(Debug, Args)]
pub(crate) struct DisableLinkArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    tenant: TenantArgs,
}

pub(crate) async fn run(args: DisableLinkArgs) -> Result<(), String> {
    let db = args.database.connect().await?;
    let tenant = args.tenant.tenant();

    PgLinksService::new(db)
        .disable_link(&tenant)
        .await
        .map_err(|error| format!("failed to disable link: {error}"))?;

    println!("disabled link {tenant}");

    Ok(())
}
