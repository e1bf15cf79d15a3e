use clap::{Parser, Subcommand};

mod args;
mod credential;
mod link;
mod queue;
mod submission;
mod template;
mod verify;
mod worker;

#[derive(Debug, Parser)]
#[command(name = "ranksync-app", about = "Ranksync operator CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Onboard and configure tenant links
    Link(link::LinkCommand),

    /// Rotate tenant credentials
    Credential(credential::CredentialCommand),

    /// Prove group ownership
    Verify(verify::VerifyCommand),

    /// Manage decision templates
    Template(template::TemplateCommand),

    /// Review submissions
    Submission(submission::SubmissionCommand),

    /// Sync queue maintenance
    Queue(queue::QueueCommand),

    /// Run the role sync worker in the foreground
    Worker(worker::WorkerCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Link(command) => link::run(command).await,
            Commands::Credential(command) => credential::run(command).await,
            Commands::Verify(command) => verify::run(command).await,
            Commands::Template(command) => template::run(command).await,
            Commands::Submission(command) => submission::run(command).await,
            Commands::Queue(command) => queue::run(command).await,
            Commands::Worker(command) => worker::run(command).await,
        }
    }
}
