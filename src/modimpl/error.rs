use reqwest::StatusCode;
use thiserror::Error;

/// Raised while turning CLI flags / environment into a [`Config`](crate::Config).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required setting {0} is missing or empty")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Failures of a transfer run.
///
/// `Connect`, `Login` and `List` abort the whole run and are reported to the
/// health tracker. The remaining variants abandon a single file only.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("failed to connect to FTP server: {0:#}")]
    Connect(anyhow::Error),

    #[error("failed to login to FTP server: {0:#}")]
    Login(anyhow::Error),

    #[error("failed to list files on FTP server: {0:#}")]
    List(anyhow::Error),

    #[error("failed to retrieve file {file}: {cause:#}")]
    Retrieve { file: String, cause: anyhow::Error },

    #[error("failed to upload file {file} to Paperless: {cause:#}")]
    Submit { file: String, cause: anyhow::Error },

    #[error("Paperless rejected file {file}: {status}")]
    Rejected { file: String, status: StatusCode },

    #[error("failed to delete file {file} from FTP server: {cause:#}")]
    Delete { file: String, cause: anyhow::Error },
}

impl TransferError {
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            TransferError::Connect(_) | TransferError::Login(_) | TransferError::List(_)
        )
    }

    /// Name of the file a per-file failure refers to.
    pub fn file(&self) -> Option<&str> {
        match self {
            TransferError::Retrieve { file, .. }
            | TransferError::Submit { file, .. }
            | TransferError::Rejected { file, .. }
            | TransferError::Delete { file, .. } => Some(file),
            _ => None,
        }
    }
}
