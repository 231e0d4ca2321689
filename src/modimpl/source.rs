use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use native_tls::TlsConnector;
use suppaftp::list::File;
use suppaftp::{FtpResult, NativeTlsConnector, NativeTlsFtpStream};

use crate::modimpl::config::SourceConfig;
use crate::modimpl::filecandidate::{EntryKind, FileCandidate};

/// Opens sessions against the document drop.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Dial the server and secure the control channel. Authentication is a
    /// separate step so callers can tell the two failures apart.
    async fn connect(&self) -> Result<Box<dyn SourceSession>>;
}

/// A live, exclusively owned connection to the document drop.
#[async_trait]
pub trait SourceSession: Send {
    async fn login(&mut self) -> Result<()>;
    async fn list(&mut self, directory: Option<&str>) -> Result<Vec<FileCandidate>>;
    async fn retrieve(&mut self, path: &str) -> Result<Vec<u8>>;
    async fn delete(&mut self, path: &str) -> Result<()>;
    async fn quit(&mut self) -> Result<()>;
}

/// FTP with explicit TLS (`AUTH TLS`).
#[derive(Debug, Clone)]
pub struct FtpConnector {
    config: SourceConfig,
}

impl FtpConnector {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    fn resolve(&self) -> Result<SocketAddr> {
        let address = self.config.address();
        address
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve FTP host {}", address))?
            .next()
            .with_context(|| format!("FTP host {} resolved to no address", address))
    }

    fn dial(&self) -> Result<NativeTlsFtpStream> {
        let addr = self.resolve()?;
        let stream = NativeTlsFtpStream::connect_timeout(addr, self.config.connect_timeout)
            .with_context(|| format!("Failed to reach {}", addr))?;

        let tls = TlsConnector::builder()
            .danger_accept_invalid_certs(self.config.accept_invalid_certs)
            .build()
            .context("Failed to build TLS connector")?;
        let stream = stream
            .into_secure(NativeTlsConnector::from(tls), self.config.domain())
            .context("Failed to negotiate explicit TLS")?;

        debug!("Connected to FTP server {}", addr);
        Ok(stream)
    }
}

#[async_trait]
impl SourceConnector for FtpConnector {
    async fn connect(&self) -> Result<Box<dyn SourceSession>> {
        let connector = self.clone();
        let stream = tokio::task::spawn_blocking(move || connector.dial())
            .await
            .context("FTP connect task failed")??;

        Ok(Box::new(FtpSession {
            stream: Some(stream),
            username: self.config.username.clone(),
            password: self.config.password.expose().to_string(),
        }))
    }
}

pub struct FtpSession {
    stream: Option<NativeTlsFtpStream>,
    username: String,
    password: String,
}

impl FtpSession {
    /// Runs a blocking FTP command off the async workers. The stream is moved
    /// into the blocking task and handed back afterwards.
    async fn with_stream<T, F>(&mut self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut NativeTlsFtpStream) -> FtpResult<T> + Send + 'static,
    {
        let mut stream = self.stream.take().context("FTP session is closed")?;
        let (stream, result) = tokio::task::spawn_blocking(move || {
            let result = op(&mut stream);
            (stream, result)
        })
        .await
        .context("FTP command task failed")?;
        self.stream = Some(stream);
        Ok(result?)
    }
}

#[async_trait]
impl SourceSession for FtpSession {
    async fn login(&mut self) -> Result<()> {
        let username = self.username.clone();
        let user = username.clone();
        let password = self.password.clone();
        self.with_stream(move |stream| stream.login(&user, &password))
            .await
            .with_context(|| format!("Login as {} refused", username))
    }

    async fn list(&mut self, directory: Option<&str>) -> Result<Vec<FileCandidate>> {
        let directory = directory.map(str::to_owned);
        let lines = self
            .with_stream(move |stream| stream.list(directory.as_deref()))
            .await?;
        Ok(parse_listing(&lines))
    }

    async fn retrieve(&mut self, path: &str) -> Result<Vec<u8>> {
        let remote = path.to_owned();
        let buffer = self
            .with_stream(move |stream| stream.retr_as_buffer(&remote))
            .await
            .with_context(|| format!("RETR {}", path))?;
        Ok(buffer.into_inner())
    }

    async fn delete(&mut self, path: &str) -> Result<()> {
        let remote = path.to_owned();
        self.with_stream(move |stream| stream.rm(&remote))
            .await
            .with_context(|| format!("DELE {}", path))
    }

    async fn quit(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            debug!("FTP session already lost, skipping QUIT");
            return Ok(());
        };
        tokio::task::spawn_blocking(move || stream.quit())
            .await
            .context("FTP quit task failed")??;
        Ok(())
    }
}

/// Turns raw `LIST` lines (unix or DOS style) into candidates. Lines that
/// cannot be parsed are left out.
pub fn parse_listing(lines: &[String]) -> Vec<FileCandidate> {
    lines
        .iter()
        .filter_map(|line| match File::from_str(line) {
            Ok(file) => {
                let kind = if file.is_directory() {
                    EntryKind::Directory
                } else if file.is_symlink() {
                    EntryKind::Link
                } else {
                    EntryKind::File
                };
                Some(FileCandidate::new(file.name(), kind))
            }
            Err(e) => {
                debug!("Ignoring unparsable listing line '{}': {:?}", line, e);
                None
            }
        })
        .filter(|candidate| candidate.name != "." && candidate.name != "..")
        .collect()
}
