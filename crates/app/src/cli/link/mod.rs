use clap::{Args, Subcommand};
use ranksync_app::domain::links::records::LinkRecord;

mod create;
mod disable;
mod show;
mod update;

#[derive(Debug, Args)]
pub(crate) struct LinkCommand {
    #[command(subcommand)]
    command: LinkSubcommand,
}

#[derive(Debug, Subcommand)]
enum LinkSubcommand {
    /// Link a tenant to its group and issue its credential
    Create(create::CreateLinkArgs),
    Show(show::ShowLinkArgs),

    /// Replace the authorized resources
    Resources(update::ResourcesArgs),

    /// Replace the templates allowed to trigger synchronization
    Templates(update::TemplatesArgs),

    /// Change rate limiting or auto-sync
    Tunables(update::TunablesArgs),
    Disable(disable::DisableLinkArgs),
}

pub(crate) async fn run(command: LinkCommand) -> Result<(), String> {
    match command.command {
        LinkSubcommand::Create(args) => create::run(args).await,
        LinkSubcommand::Show(args) => show::run(args).await,
        LinkSubcommand::Resources(args) => update::resources(args).await,
        LinkSubcommand::Templates(args) => update::templates(args).await,
        LinkSubcommand::Tunables(args) => update::tunables(args).await,
        LinkSubcommand::Disable(args) => disable::run(args).await,
    }
}

fn join<T: ToString>(values: &[T]) -> String {
    if values.is_empty() {
        return "none".to_string();
    }

    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn print_link(link: &LinkRecord) {
    println!("tenant_id: {}", link.tenant_id);
    println!("group_id: {}", link.group_id);
    println!("resources: {}", join(&link.resource_ids));
    println!("verification_status: {}", link.verification_status);
    println!(
        "verified_at: {}",
        link.verified_at
            .map_or_else(|| "never".to_string(), |value| value.to_string())
    );
    println!("enabled_templates: {}", join(&link.enabled_templates));
    println!(
        "rate_limit: {} requests / {}s",
        link.tunables.rate_limit_max_requests, link.tunables.rate_limit_window_seconds
    );
    println!("auto_sync: {}", link.tunables.auto_sync);
    println!(
        "syncs: {} total, {} failed",
        link.counters.total_syncs, link.counters.failed_syncs
    );

    match link.credential {
        Some(credential) => {
            println!("credential_key_id: {}", credential.key_id);
            println!("credential_issued_at: {}", credential.issued_at);
            println!(
                "credential_last_used_at: {}",
                credential
                    .last_used_at
                    .map_or_else(|| "never".to_string(), |value| value.to_string())
            );
        }
        None => println!("credential: none"),
    }
}
