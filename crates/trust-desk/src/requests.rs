//! Intake requests awaiting a disbursement decision.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trust_ledger::write_atomic;

use crate::error::{DeskError, Result};

/// Labels attached to a request once it has been paid out.
pub const PROCESSED_LABELS: [&str; 2] = ["approved", "processed"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    #[default]
    Open,
    Closed,
}

/// A request submitted through the intake form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub submitter: String,
    #[serde(default)]
    pub state: RequestState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl Request {
    pub fn new(id: u64, title: impl Into<String>, submitter: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            body: String::new(),
            submitter: submitter.into(),
            state: RequestState::Open,
            labels: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_open(&self) -> bool {
        self.state == RequestState::Open
    }

    fn close(&mut self) {
        self.state = RequestState::Closed;
        for label in PROCESSED_LABELS {
            if !self.labels.iter().any(|l| l == label) {
                self.labels.push(label.to_string());
            }
        }
    }
}

/// Where open requests come from and where processed ones are acknowledged.
pub trait RequestSource: Send + Sync {
    /// Requests still awaiting a decision, in submission order.
    fn open_requests(&self) -> Result<Vec<Request>>;

    /// Mark a request processed.
    ///
    /// Fails with [`DeskError::RequestNotFound`] for an unknown id and
    /// [`DeskError::RequestClosed`] if it was already acknowledged.
    fn acknowledge(&self, id: u64) -> Result<()>;
}

/// Requests kept in a local JSON array file.
///
/// The file is re-read on every call so edits made between commands are
/// picked up. Acknowledging rewrites the whole file atomically.
#[derive(Debug)]
pub struct JsonInbox {
    path: PathBuf,
}

impl JsonInbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every request in the file, open or not. A missing file is empty.
    pub fn all(&self) -> Result<Vec<Request>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DeskError::io(&self.path)(e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| DeskError::Inbox {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Add a request to the file.
    pub fn submit(&self, request: Request) -> Result<()> {
        let mut requests = self.all()?;
        requests.push(request);
        self.store(&requests)
    }

    fn store(&self, requests: &[Request]) -> Result<()> {
        let json = serde_json::to_vec_pretty(requests).map_err(|e| DeskError::Inbox {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }
}

impl RequestSource for JsonInbox {
    fn open_requests(&self) -> Result<Vec<Request>> {
        let open: Vec<Request> = self.all()?.into_iter().filter(Request::is_open).collect();
        debug!(path = %self.path.display(), open = open.len(), "inbox read");
        Ok(open)
    }

    fn acknowledge(&self, id: u64) -> Result<()> {
        let mut requests = self.all()?;
        close_in(&mut requests, id)?;
        self.store(&requests)?;
        info!(id, path = %self.path.display(), "request acknowledged");
        Ok(())
    }
}

/// In-memory request source.
#[derive(Debug, Default)]
pub struct MemoryInbox {
    requests: Mutex<Vec<Request>>,
}

impl MemoryInbox {
    pub fn new(requests: Vec<Request>) -> Self {
        Self {
            requests: Mutex::new(requests),
        }
    }

    /// Every request, open or not.
    pub fn all(&self) -> Vec<Request> {
        self.guard().clone()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, Vec<Request>> {
        self.requests.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl RequestSource for MemoryInbox {
    fn open_requests(&self) -> Result<Vec<Request>> {
        Ok(self.guard().iter().filter(|r| r.is_open()).cloned().collect())
    }

    fn acknowledge(&self, id: u64) -> Result<()> {
        close_in(&mut self.guard(), id)
    }
}

fn close_in(requests: &mut [Request], id: u64) -> Result<()> {
    let request = requests
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or(DeskError::RequestNotFound(id))?;
    if !request.is_open() {
        return Err(DeskError::RequestClosed(id));
    }
    request.close();
    Ok(())
}
