//! Handlers for the recording library commands.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::app::App;
use crate::config::Config;
use crate::store::RecordingEntry;
use crate::upload::{embed_url, ProgressCallback};

use super::args::{DeleteCliArgs, EmbedCliArgs, ListCliArgs, RenameCliArgs, UploadCliArgs};

pub async fn handle_upload_command(args: UploadCliArgs) -> Result<()> {
    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {:?}", args.file))?;
    if data.is_empty() {
        bail!("{:?} is empty, nothing to upload", args.file);
    }

    let title = args
        .title
        .clone()
        .unwrap_or_else(|| default_title(&args.file));

    let app = App::load()?;
    let library = app.library();

    let pb = (!args.no_progress).then(create_progress_bar);
    let on_progress: Option<ProgressCallback> = pb.clone().map(|pb| {
        let callback: ProgressCallback = Arc::new(move |progress| {
            pb.set_position(progress.percentage as u64);
        });
        callback
    });

    let result = library
        .publish(&args.scene, data, &title, args.duration, on_progress)
        .await;

    if let Some(pb) = &pb {
        match &result {
            Ok(_) => pb.finish_with_message("Uploaded"),
            Err(_) => pb.abandon_with_message("Upload failed"),
        }
    }

    let entry = result?;
    println!("Saved recording #{} '{}'", entry.id, entry.title);
    println!("Video id: {}", entry.host_video_id);
    println!("Embed: {}", library.embed_url(&entry.host_video_id));
    println!(
        "\nThe host is still processing it. Check with: talktrack poll --scene {}",
        args.scene
    );
    Ok(())
}

pub fn handle_list_command(args: ListCliArgs) -> Result<()> {
    let app = App::load()?;
    let entries = app.library().list(&args.scene)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No recordings in scene '{}'.", args.scene);
        return Ok(());
    }

    println!("Found {} recording(s):\n", entries.len());
    for entry in &entries {
        print_entry(entry);
    }
    Ok(())
}

pub fn handle_rename_command(args: RenameCliArgs) -> Result<()> {
    let app = App::load()?;
    if !app.library().rename(&args.scene, args.id, &args.title)? {
        bail!("Recording #{} not found in scene '{}'", args.id, args.scene);
    }
    println!("Renamed recording #{} to '{}'", args.id, args.title.trim());
    Ok(())
}

pub async fn handle_delete_command(args: DeleteCliArgs) -> Result<()> {
    let app = App::load()?;
    if !app.library().delete(&args.scene, args.id).await? {
        bail!("Recording #{} not found in scene '{}'", args.id, args.scene);
    }
    println!("Deleted recording #{}", args.id);
    Ok(())
}

/// Needs no credentials, only the configured embed base.
pub fn handle_embed_command(args: EmbedCliArgs) -> Result<()> {
    let config = Config::load()?;
    println!("{}", embed_url(&config.upload.embed_base_url, &args.video_id));
    Ok(())
}

fn print_entry(entry: &RecordingEntry) {
    println!("ID: {}", entry.id);
    println!("Title: {}", entry.title);
    println!("Duration: {}", format_duration(entry.duration_seconds));
    println!("Status: {}", entry.processing_status);
    println!("Video: {}", entry.host_video_id);
    println!("Date: {}", entry.created_at);
    println!("---");
}

fn default_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.trim().is_empty())
        .unwrap_or_else(|| "Recording".to_string())
}

fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸━"),
    );
    pb.set_message("Uploading...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
