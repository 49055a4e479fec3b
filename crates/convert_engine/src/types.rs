use std::path::PathBuf;

use convert_core::{JobHandle, JobId, JobKey, JobStatus};
use serde::Deserialize;
use thiserror::Error;

use crate::persist::PersistError;

/// Events produced by [`crate::EngineHandle`], tagged with the row they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Submitted {
        key: JobKey,
        handle: JobHandle,
    },
    SubmissionFailed {
        key: JobKey,
        error: SubmissionError,
    },
    Status {
        key: JobKey,
        job_id: JobId,
        status: JobStatus,
    },
    TransportError {
        key: JobKey,
        job_id: JobId,
        error: TransportError,
    },
    ArtifactSaved {
        key: JobKey,
        path: PathBuf,
    },
    ArtifactFailed {
        key: JobKey,
        reason: String,
    },
}

/// One delivery from a poll session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    Status { job_id: JobId, status: JobStatus },
    TransportError { job_id: JobId, error: TransportError },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("invalid service url '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },
    #[error("failed to build http client: {0}")]
    Build(String),
}

/// The job could not be created. Reported once; never retried by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("{reason}")]
    Rejected { status: u16, reason: String },
    #[error("could not reach service: {0}")]
    Network(String),
    #[error("submission timed out")]
    Timeout,
    #[error("unexpected response from service: {0}")]
    InvalidResponse(String),
}

impl SubmissionError {
    /// Human-readable text suitable for showing next to the row.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// A status query could not be completed. Polling stops after the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("status request timed out")]
    Timeout,
    #[error("status request failed with http status {0}")]
    HttpStatus(u16),
    #[error("unreadable status response: {0}")]
    InvalidBody(String),
    #[error("no terminal status after {polls} polls")]
    TimedOut { polls: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{reason}")]
    Rejected { status: u16, reason: String },
    #[error("could not reach service: {0}")]
    Network(String),
    #[error("unexpected response from service: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("invalid artifact reference '{0}'")]
    InvalidRef(String),
    #[error("artifact download failed with http status {0}")]
    HttpStatus(u16),
    #[error("artifact download failed: {0}")]
    Network(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Source metadata and the formats the service can convert it to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub formats: Vec<FormatOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormatOption {
    pub format_id: String,
    pub ext: String,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
}

impl FormatOption {
    /// `MP4 - 1280x720 (720p)` style description.
    pub fn describe(&self) -> String {
        let mut text = self.ext.to_uppercase();
        if let Some(resolution) = self.resolution.as_deref().filter(|r| !r.is_empty()) {
            text.push_str(" - ");
            text.push_str(resolution);
        }
        if let Some(note) = self.note.as_deref().filter(|n| !n.is_empty()) {
            text.push_str(&format!(" ({note})"));
        }
        text
    }
}
