use crate::commands::{run_schedule_preview, run_scrape, SchedulePreviewArgs, ScrapeArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use listing_watch::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Listing Watch",
    about = "Scrape brokerage listing pages on a schedule and report on the results",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service and the scheduled scraper (default command)
    Serve(ServeArgs),
    /// Run a single scrape cycle against the listing catalog and exit
    Scrape(ScrapeArgs),
    /// Inspect cron cadences without starting the service
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ScheduleCommand {
    /// Print the next fire times of a cron expression
    Preview(SchedulePreviewArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the listing catalog CSV
    #[arg(long)]
    pub(crate) listings: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Scrape(args) => run_scrape(args).await,
        Command::Schedule {
            command: ScheduleCommand::Preview(args),
        } => run_schedule_preview(args),
    }
}
