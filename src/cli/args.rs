use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_SCENE: &str = "default";

#[derive(Parser, Debug)]
#[command(name = "talktrack")]
#[command(about = "Board recordings: upload, track processing, embed", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Upload a finished recording and save it to a scene
    Upload(UploadCliArgs),
    /// List the recordings of a scene
    List(ListCliArgs),
    /// Change the title of a recording
    Rename(RenameCliArgs),
    /// Delete a recording locally and at the video host
    Delete(DeleteCliArgs),
    /// Check processing status of pending recordings
    Poll(PollCliArgs),
    /// Print the embed URL of a hosted video
    Embed(EmbedCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct UploadCliArgs {
    /// Encoded recording (webm)
    pub file: PathBuf,
    /// Title shown at the host; defaults to the file name
    #[arg(short, long)]
    pub title: Option<String>,
    /// Recording length in seconds
    #[arg(short, long, default_value = "0")]
    pub duration: u64,
    #[arg(short, long, default_value = DEFAULT_SCENE)]
    pub scene: String,
    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ListCliArgs {
    #[arg(short, long, default_value = DEFAULT_SCENE)]
    pub scene: String,
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug)]
pub struct RenameCliArgs {
    pub id: i64,
    pub title: String,
    #[arg(short, long, default_value = DEFAULT_SCENE)]
    pub scene: String,
}

#[derive(ClapArgs, Debug)]
pub struct DeleteCliArgs {
    pub id: i64,
    #[arg(short, long, default_value = DEFAULT_SCENE)]
    pub scene: String,
}

#[derive(ClapArgs, Debug)]
pub struct PollCliArgs {
    #[arg(short, long, default_value = DEFAULT_SCENE)]
    pub scene: String,
    /// Keep polling until Ctrl-C
    #[arg(short, long)]
    pub watch: bool,
}

#[derive(ClapArgs, Debug)]
pub struct EmbedCliArgs {
    pub video_id: String,
}
