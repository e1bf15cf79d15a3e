use clap::Args;
use ranksync_app::domain::links::{LinksService, PgLinksService};

use crate::cli::args::{DatabaseArgs, TenantArgs};

#[derive(Debug, Args)]
pub(crate) struct ShowLinkArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    tenant: TenantArgs,
}

pub(crate) async fn run(args: ShowLinkArgs) -> Result<(), String> {
    let db = args.database.connect().await?;

    let link = PgLinksService::new(db)
        .get_link(&args.tenant.tenant())
        .await
        .map_err(|error| format!("failed to load link: {error}"))?;

    super::print_link(&link);

    Ok(())
}
