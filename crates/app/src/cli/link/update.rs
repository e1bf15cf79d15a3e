use clap::Args;
use ranksync_app::domain::{
    identifiers::ResourceId,
    links::{LinksService, PgLinksService, records::LinkTunables},
    templates::records::TemplateUuid,
};
use uuid::Uuid;

use crate::cli::args::{DatabaseArgs, TenantArgs};

#[derive(Debug, Args)]
pub(crate) struct ResourcesArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    tenant: TenantArgs,

    /// Resource id; repeatable. Omit to clear
    #[arg(long = "resource")]
    resources: Vec<u64>,
}

pub(crate) async fn resources(args: ResourcesArgs) -> Result<(), String> {
    let db = args.database.connect().await?;

    let link = PgLinksService::new(db)
        .set_resources(
            &args.tenant.tenant(),
            args.resources.into_iter().map(ResourceId).collect(),
        )
        .await
        .map_err(|error| format!("failed to update resources: {error}"))?;

    super::print_link(&link);

    Ok(())
}

#[derive(Debug, Args)]
pub(crate) struct TemplatesArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    tenant: TenantArgs,

    /// Template UUID; repeatable. Omit to disable every template
    #[arg(long = "template")]
    templates: Vec<Uuid>,
}

pub(crate) async fn templates(args: TemplatesArgs) -> Result<(), String> {
    let db = args.database.connect().await?;

    let link = PgLinksService::new(db)
        .set_enabled_templates(
            &args.tenant.tenant(),
            args.templates
                .into_iter()
                .map(TemplateUuid::from_uuid)
                .collect(),
        )
        .await
        .map_err(|error| format!("failed to update templates: {error}"))?;

    super::print_link(&link);

    Ok(())
}

#[derive(Debug, Args)]
pub(crate) struct TunablesArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    tenant: TenantArgs,

    /// Rate limit window length
    #[arg(long)]
    window_seconds: Option<u32>,

    /// Requests allowed per window
    #[arg(long)]
    max_requests: Option<u32>,

    /// Enqueue rank changes automatically on approval
    #[arg(long)]
    auto_sync: Option<bool>,
}

pub(crate) async fn tunables(args: TunablesArgs) -> Result<(), String> {
    let db = args.database.connect().await?;
    let service = PgLinksService::new(db);
    let tenant = args.tenant.tenant();

    let current = service
        .get_link(&tenant)
        .await
        .map_err(|error| format!("failed to load link: {error}"))?
        .tunables;

    let link = service
        .update_tunables(
            &tenant,
            LinkTunables {
                rate_limit_window_seconds: args
                    .window_seconds
                    .unwrap_or(current.rate_limit_window_seconds),
                rate_limit_max_requests: args
                    .max_requests
                    .unwrap_or(current.rate_limit_max_requests),
                auto_sync: args.auto_sync.unwrap_or(current.auto_sync),
            },
        )
        .await
        .map_err(|error| format!("failed to update tunables: {error}"))?;

    super::print_link(&link);

    Ok(())
}
