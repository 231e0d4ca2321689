use anyhow::{bail, Context, Result};
use log::{debug, error, info};
use reqwest::StatusCode;

use crate::modimpl::sink::DocumentSink;
use crate::modimpl::source::SourceConnector;

/// One-time startup gate: the drop must accept our credentials and the
/// ingestion service must answer. Unlike the steady-state health window a
/// single failure here is final.
pub async fn readiness_check(connector: &dyn SourceConnector, sink: &dyn DocumentSink) -> bool {
    if let Err(e) = check_source(connector).await {
        error!("Failed to reach FTP server during readiness probe: {:#}", e);
        return false;
    }

    if let Err(e) = check_sink(sink).await {
        error!("Failed to reach Paperless server during readiness probe: {:#}", e);
        return false;
    }

    info!("✅ Readiness probe passed");
    true
}

/// Startup form of [`readiness_check`]: a failed probe becomes an error so
/// the process exits non-zero instead of entering the schedule.
pub async fn require_ready(connector: &dyn SourceConnector, sink: &dyn DocumentSink) -> Result<()> {
    if !readiness_check(connector, sink).await {
        bail!("Readiness probe failed, not starting the transfer schedule");
    }
    Ok(())
}

async fn check_source(connector: &dyn SourceConnector) -> Result<()> {
    let mut session = connector.connect().await.context("connect")?;
    let login = session.login().await.context("login");
    if let Err(e) = session.quit().await {
        debug!("Failed to close FTP connection after readiness probe: {:#}", e);
    }
    login
}

async fn check_sink(sink: &dyn DocumentSink) -> Result<()> {
    let status = sink.probe().await?;
    if is_reachable(status) {
        Ok(())
    } else {
        bail!("unexpected status {}", status)
    }
}

/// A `405` still proves something is listening behind the address.
fn is_reachable(status: StatusCode) -> bool {
    status == StatusCode::METHOD_NOT_ALLOWED
        || !(status.is_client_error() || status.is_server_error())
}
