use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use convert_core::{JobHandle, JobId, JobKey, JobRequest, JobStatus};
use engine_logging::{engine_debug, engine_info, engine_warn};
use tokio::sync::mpsc;

use crate::artifact::ArtifactFetcher;
use crate::client::JobService;
use crate::poll::{PollLoop, PollSession, PollSettings, StatusSink};
use crate::{EngineEvent, TransportError};

/// Executes submissions, poll sessions and artifact downloads, reporting back
/// through one event channel. Must be used from within a tokio runtime.
pub struct EngineHandle {
    service: Arc<dyn JobService>,
    poller: PollLoop,
    artifacts: Option<(Arc<ArtifactFetcher>, PathBuf)>,
    sessions: HashMap<JobKey, PollSession>,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineHandle {
    pub fn new(
        service: Arc<dyn JobService>,
        settings: PollSettings,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let poller = PollLoop::new(service.clone(), settings);
        let handle = Self {
            service,
            poller,
            artifacts: None,
            sessions: HashMap::new(),
            event_tx,
        };
        (handle, event_rx)
    }

    /// Enable artifact retrieval into `dest_dir`.
    pub fn with_artifacts(mut self, fetcher: ArtifactFetcher, dest_dir: impl Into<PathBuf>) -> Self {
        self.artifacts = Some((Arc::new(fetcher), dest_dir.into()));
        self
    }

    /// Submit once; the outcome arrives as `Submitted` or `SubmissionFailed`.
    pub fn submit(&self, key: JobKey, request: JobRequest) {
        let service = self.service.clone();
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let event = match service.submit(&request).await {
                Ok(handle) => EngineEvent::Submitted { key, handle },
                Err(error) => {
                    engine_warn!("Submission for {key} failed: {error}");
                    EngineEvent::SubmissionFailed { key, error }
                }
            };
            let _ = event_tx.send(event);
        });
    }

    /// Start polling `handle` for `key`, replacing any earlier session for it.
    pub fn start_polling(&mut self, key: JobKey, handle: JobHandle) {
        self.sessions.retain(|_, session| !session.is_finished());
        if let Some(previous) = self.sessions.remove(&key) {
            engine_info!(
                "Replacing poll session for {key} (job {})",
                previous.job_id()
            );
            previous.cancel();
        }

        let sink = Arc::new(KeyedSink {
            key: key.clone(),
            event_tx: self.event_tx.clone(),
        });
        let session = self.poller.start(handle, sink);
        self.sessions.insert(key, session);
    }

    /// Cancel the session for `key`. Returns whether a live session was stopped.
    pub fn cancel(&mut self, key: &JobKey) -> bool {
        match self.sessions.remove(key) {
            Some(session) if !session.is_finished() => {
                session.cancel();
                true
            }
            Some(_) => false,
            None => {
                engine_debug!("No poll session to cancel for {key}");
                false
            }
        }
    }

    pub fn retrieve_artifact(&self, key: JobKey, artifact_ref: String) {
        let event_tx = self.event_tx.clone();
        let Some((fetcher, dest_dir)) = self.artifacts.clone() else {
            let _ = event_tx.send(EngineEvent::ArtifactFailed {
                key,
                reason: "no save directory configured".to_string(),
            });
            return;
        };

        tokio::spawn(async move {
            let event = match fetcher.fetch(&artifact_ref, &dest_dir).await {
                Ok(path) => EngineEvent::ArtifactSaved { key, path },
                Err(err) => {
                    engine_warn!("Retrieving {artifact_ref} for {key} failed: {err}");
                    EngineEvent::ArtifactFailed {
                        key,
                        reason: err.to_string(),
                    }
                }
            };
            let _ = event_tx.send(event);
        });
    }

    pub fn session(&self, key: &JobKey) -> Option<&PollSession> {
        self.sessions.get(key)
    }

    /// Number of sessions still polling.
    pub fn active_sessions(&self) -> usize {
        self.sessions
            .values()
            .filter(|session| !session.is_finished())
            .count()
    }

    /// Cancel every live session.
    pub fn shutdown(&mut self) {
        for (key, session) in self.sessions.drain() {
            if !session.is_finished() {
                engine_debug!("Shutting down poll session for {key}");
                session.cancel();
            }
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Tags session results with the row they belong to.
struct KeyedSink {
    key: JobKey,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
}

impl StatusSink for KeyedSink {
    fn on_status(&self, job_id: &JobId, status: &JobStatus) {
        let _ = self.event_tx.send(EngineEvent::Status {
            key: self.key.clone(),
            job_id: job_id.clone(),
            status: status.clone(),
        });
    }

    fn on_transport_error(&self, job_id: &JobId, error: &TransportError) {
        let _ = self.event_tx.send(EngineEvent::TransportError {
            key: self.key.clone(),
            job_id: job_id.clone(),
            error: error.clone(),
        });
    }
}
