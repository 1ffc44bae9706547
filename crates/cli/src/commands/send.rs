//! `send` command implementation.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use dispatcher::{
    BroadcastConfig, Broadcaster, CancelToken, DeliveryId, DispatchMode, Logger, Message,
    MultiBroadcaster, Registry,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::SendArgs;
use crate::error::CliError;

/// Send result for JSON output
#[derive(Serialize)]
struct SendResult<'a> {
    id: &'a DeliveryId,
    rendered: String,
    targets: usize,
    cancelled: bool,
}

/// Execute the `send` command
pub async fn run_send(args: &SendArgs) -> Result<()> {
    let config = merge_config(args)?;
    let message = build_message(args)?;

    let recorder = args
        .print_metrics
        .then(observability::install_recorder)
        .transpose()?;

    let registry = Registry::with_defaults().context("Failed to register built-in broadcasters")?;
    let broadcaster = MultiBroadcaster::builder()
        .config(&config)
        .resolve_uris(&registry, &config.broadcasters)
        .await
        .context("Failed to create broadcaster")?
        .build();

    let cancel = CancelToken::new();
    // Releases the timeout timer on every exit path
    let _guard = cancel.drop_guard();

    broadcaster
        .set_logger(&cancel, Logger::current("broadcast"))
        .await
        .context("Failed to set broadcaster logger")?;

    info!(
        targets = broadcaster.len(),
        mode = ?broadcaster.mode(),
        images = message.images().len(),
        "Broadcasting message"
    );

    if let Some(secs) = config.timeout_secs {
        cancel.cancel_after(Duration::from_secs(secs));
    }
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            warn!("Received shutdown signal, cancelling broadcast...");
            cancel.cancel();
        }
    });

    let started = Instant::now();
    let result = broadcaster.broadcast_message(&cancel, &message).await;
    watcher.abort();

    let id = result.context("Failed to broadcast message")?;
    let cancelled = cancel.is_cancelled();
    if cancelled {
        warn!("Broadcast cancelled before every target finished");
    }

    let metrics = broadcaster.metrics();
    info!(
        delivered = metrics.delivered,
        failed = metrics.failed,
        skipped = metrics.skipped,
        duration_ms = started.elapsed().as_millis() as u64,
        "Broadcast finished"
    );

    if let Some(handle) = recorder {
        eprint!("{}", handle.render());
    }

    print_result(args, &id, broadcaster.len(), cancelled)
}

/// Combine the optional config file with command-line overrides
fn merge_config(args: &SendArgs) -> Result<BroadcastConfig> {
    let mut config = match args.config {
        Some(ref path) => ConfigLoader::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => BroadcastConfig::default(),
    };

    if !args.broadcasters.is_empty() {
        config.broadcasters = args.broadcasters.clone();
    }
    if args.sequential {
        config.mode = DispatchMode::Sequential;
    }
    if let Some(limit) = args.max_concurrency {
        config.max_concurrency = Some(limit);
    }
    if let Some(secs) = args.timeout {
        config.timeout_secs = Some(secs);
    }

    if config.broadcasters.is_empty() {
        return Err(CliError::NoBroadcasters.into());
    }
    ConfigLoader::validate(&config).map_err(CliError::from)?;

    Ok(config)
}

fn build_message(args: &SendArgs) -> Result<Message> {
    let images = args
        .images
        .iter()
        .map(|path| image::open(path).map_err(|e| CliError::image_load(path, e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Message::new(args.title.as_str(), args.body.as_str()).with_images(images))
}

fn print_result(args: &SendArgs, id: &DeliveryId, targets: usize, cancelled: bool) -> Result<()> {
    if args.json {
        let result = SendResult {
            id,
            rendered: id.render(),
            targets,
            cancelled,
        };
        let json = serde_json::to_string_pretty(&result).context("Failed to serialize send result")?;
        println!("{}", json);
    } else {
        println!("{}", id);
    }
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
