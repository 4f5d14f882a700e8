use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;

mod catalog;
mod config;
mod console;
mod controller;
mod datetime;
mod elapsed;
mod list_command;
mod logger;
mod projects_command;
mod store;
mod time_entry;
mod track_command;
mod trackify;

use config::Config;
use console::{ConsoleMarkdownList, ConsolePresenter};
use controller::TimerController;
use list_command::{ListArgs, ListCommand};
use projects_command::{ProjectsArgs, ProjectsCommand};
use track_command::{TrackArgs, TrackCommand};
use trackify::TrackifyClient;

/// projectごとに作業時間を計測するためのCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- track
/// $ cargo run -- list
/// $ cargo run -- projects --search web
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(short = 'v', long = "verbose", global = true, help = "Writes debug logs")]
    verbose: bool,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Tracks time interactively
    Track(TrackArgs),
    /// Lists time entries
    List(ListArgs),
    /// Lists projects with their task counts
    Projects(ProjectsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    logger::init(&config.log_dir, args.verbose)?;

    let client = TrackifyClient::new(&config);
    let mut stdout = io::stdout();
    match args.subcommand {
        SubCommands::Track(track) => {
            let controller = TimerController::new(TrackifyClient::new(&config));
            let mut command = TrackCommand::new(controller, &client, &mut stdout);
            command
                .run(track, BufReader::new(tokio::io::stdin()))
                .await?;
        }
        SubCommands::List(list) => {
            let report = ListCommand::new(&client).run(list).await?;
            let mut presenter = ConsoleMarkdownList::new(&mut stdout);
            presenter.show_time_entries(&report.entries)?;
            writeln!(stdout, "Total: {}", report.total)?;
        }
        SubCommands::Projects(projects) => {
            let summaries = ProjectsCommand::new(&client).run(projects).await?;
            let mut presenter = ConsoleMarkdownList::new(&mut stdout);
            presenter.show_projects(&summaries)?;
        }
    }

    Ok(())
}
