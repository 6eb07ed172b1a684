use anyhow::Result;
use clap::Parser;
use talktrack::cli::{
    handle_delete_command, handle_embed_command, handle_list_command, handle_poll_command,
    handle_rename_command, handle_upload_command, Cli, CliCommand,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        CliCommand::Version => {
            println!("talktrack {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliCommand::Upload(args) => handle_upload_command(args).await,
        CliCommand::List(args) => handle_list_command(args),
        CliCommand::Rename(args) => handle_rename_command(args),
        CliCommand::Delete(args) => handle_delete_command(args).await,
        CliCommand::Poll(args) => handle_poll_command(args).await,
        CliCommand::Embed(args) => handle_embed_command(args),
    }
}
