use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::App;

use super::args::PollCliArgs;

pub async fn handle_poll_command(args: PollCliArgs) -> Result<()> {
    let app = App::load()?;
    let poller = app.poller();

    if !args.watch {
        let report = poller.poll_once(&args.scene).await?;
        println!(
            "Checked {} recording(s): {} updated, {} still processing, {} failed",
            report.checked, report.updated, report.still_pending, report.failed
        );
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, stopping poller"),
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
        on_signal.cancel();
    });

    poller.run(&args.scene, cancel).await;
    Ok(())
}
