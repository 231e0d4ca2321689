use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
mod modimpl;
use modimpl::config::{Config, Settings};
use modimpl::healthserver;
use modimpl::healthstatus::HealthTracker;
use modimpl::logging::setup_logging;
use modimpl::readiness::require_ready;
use modimpl::scheduler::run_forever;
use modimpl::sink::{DocumentSink, PaperlessSink};
use modimpl::source::{FtpConnector, SourceConnector};
use modimpl::transferpipeline::TransferPipeline;

#[derive(Parser, Debug)]
#[command(name = "ftp-paperless-bridge")]
#[command(about = "Moves documents from an FTPS drop directory into Paperless-ngx")]
#[command(version)]
pub struct Args {
    #[command(flatten)]
    pub settings: Settings,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_settings(args.settings).context("Invalid configuration")?;
    setup_logging(&config.logging)?;
    info!("🚀 Starting ftp-paperless-bridge with Configuration: {:?}", config);

    let health = Arc::new(HealthTracker::new(
        config.health.window,
        config.health.unhealthy_ratio,
    ));
    info!(
        "💓 Health window of {} runs, unhealthy above {} failures",
        config.health.window,
        health.threshold()
    );
    info!("Transferring documents matching {:?}", config.documents.patterns());
    let _health_server = healthserver::spawn(config.health.listen_addr, Arc::clone(&health));

    let connector: Arc<dyn SourceConnector> = Arc::new(FtpConnector::new(config.source.clone()));
    let sink: Arc<dyn DocumentSink> = Arc::new(PaperlessSink::new(config.sink.clone())?);

    require_ready(connector.as_ref(), sink.as_ref()).await?;

    let pipeline = TransferPipeline::new(
        connector,
        sink,
        config.source.path.clone(),
        config.documents.clone(),
    );

    tokio::select! {
        result = run_forever(&config.schedule, &pipeline, &health) => result,
        _ = shutdown_signal() => {
            info!("🛑 Received shutdown signal, exiting");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
