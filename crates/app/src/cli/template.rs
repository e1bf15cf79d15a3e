use clap::{Args, Subcommand};
use ranksync_app::domain::{
    identifiers::Rank,
    templates::{
        PgTemplatesService, TemplatesService, data::NewTemplate, records::TemplateUuid,
    },
};

use crate::cli::args::{DatabaseArgs, TenantArgs};

#[derive(Debug, Args)]
pub(crate) struct TemplateCommand {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(subcommand)]
    command: TemplateSubcommand,
}

#[derive(Debug, Subcommand)]
enum TemplateSubcommand {
    Create(CreateTemplateArgs),
    List {
        #[command(flatten)]
        tenant: TenantArgs,
    },
}

#[derive(Debug, Args)]
pub(crate) struct CreateTemplateArgs {
    #[command(flatten)]
    tenant: TenantArgs,

    #[arg(long)]
    name: String,

    #[arg(long, default_value = "")]
    description: String,

    /// Question every submission must answer; repeatable
    #[arg(long = "question")]
    questions: Vec<String>,

    /// Rank granted when a submission is approved
    #[arg(long)]
    approval_rank: Option<u8>,

    /// Minimum time between submissions of one subject
    #[arg(long, default_value_t = 0)]
    cooldown_minutes: u32,
}

pub(crate) async fn run(command: TemplateCommand) -> Result<(), String> {
    let db = command.database.connect().await?;
    let service = PgTemplatesService::new(db);

    match command.command {
        TemplateSubcommand::Create(args) => {
            let template = service
                .create_template(
                    &args.tenant.tenant(),
                    NewTemplate {
                        uuid: TemplateUuid::new(),
                        name: args.name,
                        description: args.description,
                        questions: args.questions,
                        approval_rank: args.approval_rank.map(Rank),
                        cooldown_minutes: args.cooldown_minutes,
                    },
                )
                .await
                .map_err(|error| format!("failed to create template: {error}"))?;

            println!("template_uuid: {}", template.uuid);
            println!("enable it with `link templates` to allow automatic synchronization");
        }
        TemplateSubcommand::List { tenant } => {
            let templates = service
                .list_templates(&tenant.tenant())
                .await
                .map_err(|error| format!("failed to list templates: {error}"))?;

            if templates.is_empty() {
                println!("no templates");
            }

            for template in templates {
                println!(
                    "{uuid}  {name}  rank={rank}  cooldown={cooldown}m  active={active}",
                    uuid = template.uuid,
                    name = template.name,
                    rank = template
                        .approval_rank
                        .map_or_else(|| "-".to_string(), |rank| rank.to_string()),
                    cooldown = template.cooldown_minutes,
                    active = template.active,
                );
            }
        }
    }

    Ok(())
}
