use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};

use crate::modimpl::config::{SinkConfig, SinkCredential};

/// Multipart field Paperless-ngx expects the document in.
pub const DOCUMENT_FIELD: &str = "document";

/// The document ingestion service.
///
/// Both calls return the HTTP status instead of judging it, the transfer and
/// readiness logic decide what counts as success.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn submit(&self, file_name: &str, content: Vec<u8>) -> Result<StatusCode>;

    /// Cheap reachability request against the service.
    async fn probe(&self) -> Result<StatusCode>;
}

#[derive(Debug, Clone)]
pub struct PaperlessSink {
    client: Client,
    config: SinkConfig,
}

impl PaperlessSink {
    pub fn new(config: SinkConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.credential {
            SinkCredential::Basic { username, password } => {
                request.basic_auth(username, Some(password.expose()))
            }
            SinkCredential::Token(token) => {
                request.header(AUTHORIZATION, format!("Token {}", token.expose()))
            }
        }
    }
}

#[async_trait]
impl DocumentSink for PaperlessSink {
    async fn submit(&self, file_name: &str, content: Vec<u8>) -> Result<StatusCode> {
        let part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))?;
        let form = Form::new().part(DOCUMENT_FIELD, part);

        let response = self
            .authorize(self.client.post(&self.config.document_url))
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("POST {}", self.config.document_url))?;
        Ok(response.status())
    }

    async fn probe(&self) -> Result<StatusCode> {
        let response = self
            .client
            .get(&self.config.base_url)
            .send()
            .await
            .with_context(|| format!("GET {}", self.config.base_url))?;
        Ok(response.status())
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modimpl::config::Secret;

    fn sink(credential: SinkCredential) -> PaperlessSink {
        PaperlessSink::new(SinkConfig {
            base_url: "http://paperless.local:8000".to_string(),
            document_url: "http://paperless.local:8000/api/documents/post_document/".to_string(),
            credential,
        })
        .unwrap()
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("scan.pdf"), "application/pdf");
        assert_eq!(mime_for("SCAN.PDF"), "application/pdf");
        assert_eq!(mime_for("photo.jpeg"), "image/jpeg");
        assert_eq!(mime_for("README"), "application/octet-stream");
    }

    #[test]
    fn test_token_authorization_header() {
        let sink = sink(SinkCredential::Token(Secret::new("abc123")));
        let request = sink
            .authorize(sink.client.get(&sink.config.base_url))
            .build()
            .unwrap();

        assert_eq!(request.headers()[AUTHORIZATION], "Token abc123");
    }

    #[test]
    fn test_basic_authorization_header() {
        let sink = sink(SinkCredential::Basic {
            username: "admin".to_string(),
            password: Secret::new("secret"),
        });
        let request = sink
            .authorize(sink.client.get(&sink.config.base_url))
            .build()
            .unwrap();

        // base64("admin:secret")
        assert_eq!(request.headers()[AUTHORIZATION], "Basic YWRtaW46c2VjcmV0");
    }
}
