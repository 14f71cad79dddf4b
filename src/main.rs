mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    stickies::logging::init(args.verbose);
    let config = commands::config_from(&args)?;
    let command = args.command.unwrap_or(cli::Command::List { search: None });
    match command {
        cli::Command::List { search } => commands::list(&config, search).await,
        cli::Command::New {
            content,
            color,
            minutes,
            pin,
        } => commands::new(&config, content, color, minutes, pin).await,
        cli::Command::Delete { note_id } => commands::delete(&config, note_id).await,
        cli::Command::Pin { note_id } => commands::pin(&config, note_id).await,
        cli::Command::Duration { note_id, minutes } => {
            commands::duration(&config, note_id, minutes).await
        }
        cli::Command::Focus { note_id } => commands::focus(&config, note_id).await,
    }
}
