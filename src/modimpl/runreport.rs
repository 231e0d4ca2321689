use crate::modimpl::error::TransferError;

/// What a single transfer run did.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Set when the run never got past connect, login or listing.
    pub aborted: Option<TransferError>,
    pub transferred: Vec<String>,
    pub skipped: Vec<String>,
    pub failures: Vec<TransferError>,
}

impl RunReport {
    pub fn aborted(error: TransferError) -> Self {
        debug_assert!(error.is_systemic(), "per-file error cannot abort a run");
        Self {
            aborted: Some(error),
            ..Self::default()
        }
    }

    /// The outcome fed into the health window. Per-file failures do not count.
    pub fn succeeded(&self) -> bool {
        self.aborted.is_none()
    }

    pub fn summary(&self) -> String {
        match &self.aborted {
            Some(error) => format!("run aborted: {}", error),
            None => format!(
                "{} transferred, {} skipped, {} failed",
                self.transferred.len(),
                self.skipped.len(),
                self.failures.len()
            ),
        }
    }
}
