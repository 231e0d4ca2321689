use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::modimpl::documentfilter::DocumentFilter;
use crate::modimpl::error::TransferError;
use crate::modimpl::filecandidate::FileCandidate;
use crate::modimpl::runreport::RunReport;
use crate::modimpl::sink::DocumentSink;
use crate::modimpl::source::{SourceConnector, SourceSession};

/// Moves eligible documents from the drop into the ingestion service.
///
/// Every run opens its own source session. Connection, login and listing
/// problems abort the run; anything that goes wrong with a single file only
/// abandons that file until the next run picks it up again.
pub struct TransferPipeline {
    connector: Arc<dyn SourceConnector>,
    sink: Arc<dyn DocumentSink>,
    directory: Option<String>,
    filter: DocumentFilter,
}

impl TransferPipeline {
    pub fn new(
        connector: Arc<dyn SourceConnector>,
        sink: Arc<dyn DocumentSink>,
        directory: Option<String>,
        filter: DocumentFilter,
    ) -> Self {
        Self {
            connector,
            sink,
            directory,
            filter,
        }
    }

    pub async fn run(&self) -> RunReport {
        let mut session = match self.connector.connect().await {
            Ok(session) => session,
            Err(e) => {
                let error = TransferError::Connect(e);
                error!("🗷  {}", error);
                return RunReport::aborted(error);
            }
        };

        let report = match self.run_session(session.as_mut()).await {
            Ok(report) => report,
            Err(error) => {
                error!("🗷  {}", error);
                RunReport::aborted(error)
            }
        };

        if let Err(e) = session.quit().await {
            debug!("Failed to close FTP connection: {:#}", e);
        }

        report
    }

    async fn run_session(
        &self,
        session: &mut dyn SourceSession,
    ) -> Result<RunReport, TransferError> {
        session.login().await.map_err(TransferError::Login)?;

        let entries = session
            .list(self.directory.as_deref())
            .await
            .map_err(TransferError::List)?;
        debug!("Listed {} entries", entries.len());

        let mut report = RunReport::default();
        for entry in entries {
            if !self.filter.is_eligible(&entry) {
                info!("Skipping file: {}", entry.name);
                report.skipped.push(entry.name);
                continue;
            }

            info!("✨ Detected document: {}", entry.name);
            match self.transfer_file(session, &entry).await {
                Ok(()) => report.transferred.push(entry.name),
                Err(error) => {
                    if let TransferError::Delete { .. } = error {
                        // Stays in the drop and gets ingested again next run.
                        error!("🗷  {}", error);
                    } else {
                        warn!("❗ {}", error);
                    }
                    report.failures.push(error);
                }
            }
        }

        debug!("All files processed: {}", report.summary());
        Ok(report)
    }

    /// Retrieve, submit, then delete. Nothing is deleted unless the sink
    /// accepted the document.
    async fn transfer_file(
        &self,
        session: &mut dyn SourceSession,
        entry: &FileCandidate,
    ) -> Result<(), TransferError> {
        let path = entry.remote_path(self.directory.as_deref());

        let content = session
            .retrieve(&path)
            .await
            .map_err(|cause| TransferError::Retrieve {
                file: entry.name.clone(),
                cause,
            })?;
        debug!("Retrieved {} ({} bytes)", path, content.len());

        let status = self
            .sink
            .submit(&entry.name, content)
            .await
            .map_err(|cause| TransferError::Submit {
                file: entry.name.clone(),
                cause,
            })?;
        if status.is_client_error() || status.is_server_error() {
            return Err(TransferError::Rejected {
                file: entry.name.clone(),
                status,
            });
        }
        info!("Successfully uploaded file {} to Paperless", entry.name);

        session
            .delete(&path)
            .await
            .map_err(|cause| TransferError::Delete {
                file: entry.name.clone(),
                cause,
            })?;

        info!("🗹  Successfully transferred file {}", entry.name);
        Ok(())
    }
}
