use clap::Args;
use jiff::Timestamp;
use ranksync_app::{
    credentials::{CredentialStore, PgCredentialStore},
    domain::{
        identifiers::{GroupId, ResourceId},
        links::{LinksService, PgLinksService, data::NewLink, records::LinkTunables},
    },
};

use crate::cli::args::{DatabaseArgs, TenantArgs};

#[derive(Debug, Args)]
pub(crate) struct CreateLinkArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    tenant: TenantArgs,

    /// Directory group owned by the tenant
    #[arg(long)]
    group: u64,

    /// Resource the credential may act for; repeatable
    #[arg(long = "resource")]
    resources: Vec<u64>,

    /// Do not enqueue rank changes automatically on approval
    #[arg(long)]
    no_auto_sync: bool,
}

pub(crate) async fn run(args: CreateLinkArgs) -> Result<(), String> {
    let db = args.database.connect().await?;
    let tenant = args.tenant.tenant();

    let link = PgLinksService::new(db.clone())
        .create_link(NewLink {
            tenant_id: tenant.clone(),
            group_id: GroupId(args.group),
            resource_ids: args.resources.into_iter().map(ResourceId).collect(),
            tunables: LinkTunables {
                auto_sync: !args.no_auto_sync,
                ..LinkTunables::default()
            },
        })
        .await
        .map_err(|error| format!("failed to create link: {error}"))?;

    let issued = PgCredentialStore::new(db)
        .issue(&tenant, Timestamp::now())
        .await
        .map_err(|error| format!("failed to issue credential: {error}"))?;

    super::print_link(&link);
    println!("credential: {}", issued.token);
    println!("store this credential now; it is only shown once");
    println!("the link stays unverified until `verify start` and `verify check` succeed");

    Ok(())
}
