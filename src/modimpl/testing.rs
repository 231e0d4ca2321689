//! In-memory transports used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::StatusCode;

use crate::modimpl::filecandidate::FileCandidate;
use crate::modimpl::sink::DocumentSink;
use crate::modimpl::source::{SourceConnector, SourceSession};

pub type CallLog = Arc<Mutex<Vec<String>>>;

/// A scripted document drop. Every transport call is appended to `calls`.
#[derive(Default)]
pub struct FakeSource {
    pub fail_connect: bool,
    pub fail_login: bool,
    pub fail_list: bool,
    pub fail_quit: bool,
    pub entries: Vec<FileCandidate>,
    pub fail_retrieve: HashSet<String>,
    pub fail_delete: HashSet<String>,
    pub calls: CallLog,
}

impl FakeSource {
    pub fn with_entries(entries: Vec<FileCandidate>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

struct FakeSession {
    source: Arc<FakeSource>,
}

impl FakeSession {
    fn log(&self, call: String) {
        self.source.calls.lock().unwrap().push(call);
    }
}

pub struct FakeConnector(pub Arc<FakeSource>);

#[async_trait]
impl SourceConnector for FakeConnector {
    async fn connect(&self) -> Result<Box<dyn SourceSession>> {
        self.0.calls.lock().unwrap().push("connect".to_string());
        if self.0.fail_connect {
            return Err(anyhow!("connection refused"));
        }
        Ok(Box::new(FakeSession {
            source: Arc::clone(&self.0),
        }))
    }
}

#[async_trait]
impl SourceSession for FakeSession {
    async fn login(&mut self) -> Result<()> {
        self.log("login".to_string());
        if self.source.fail_login {
            return Err(anyhow!("530 Login incorrect"));
        }
        Ok(())
    }

    async fn list(&mut self, directory: Option<&str>) -> Result<Vec<FileCandidate>> {
        self.log(format!("list:{}", directory.unwrap_or("")));
        if self.source.fail_list {
            return Err(anyhow!("550 No such directory"));
        }
        Ok(self.source.entries.clone())
    }

    async fn retrieve(&mut self, path: &str) -> Result<Vec<u8>> {
        self.log(format!("retrieve:{}", path));
        if self.source.fail_retrieve.contains(path) {
            return Err(anyhow!("426 Connection closed; transfer aborted"));
        }
        Ok(format!("%PDF-1.7 {}", path).into_bytes())
    }

    async fn delete(&mut self, path: &str) -> Result<()> {
        self.log(format!("delete:{}", path));
        if self.source.fail_delete.contains(path) {
            return Err(anyhow!("550 Permission denied"));
        }
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        self.log("quit".to_string());
        if self.source.fail_quit {
            return Err(anyhow!("421 Timeout"));
        }
        Ok(())
    }
}

pub enum SubmitBehavior {
    Status(StatusCode),
    Error,
}

/// A scripted ingestion service. Files without a configured behavior are
/// accepted with `200 OK`.
pub struct FakeSink {
    pub submit: HashMap<String, SubmitBehavior>,
    pub probe: Option<StatusCode>,
    pub submitted: Mutex<Vec<(String, Vec<u8>)>>,
}

impl Default for FakeSink {
    fn default() -> Self {
        Self {
            submit: HashMap::new(),
            probe: Some(StatusCode::OK),
            submitted: Mutex::new(Vec::new()),
        }
    }
}

impl FakeSink {
    pub fn submitted_names(&self) -> Vec<String> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl DocumentSink for FakeSink {
    async fn submit(&self, file_name: &str, content: Vec<u8>) -> Result<StatusCode> {
        self.submitted
            .lock()
            .unwrap()
            .push((file_name.to_string(), content));
        match self.submit.get(file_name) {
            Some(SubmitBehavior::Status(status)) => Ok(*status),
            Some(SubmitBehavior::Error) => Err(anyhow!("connection reset by peer")),
            None => Ok(StatusCode::OK),
        }
    }

    async fn probe(&self) -> Result<StatusCode> {
        self.probe.ok_or_else(|| anyhow!("dns error: no such host"))
    }
}
