//! Response-paced status polling for one job at a time.
//!
//! Each [`PollSession`] owns a single tokio task. The task issues a status
//! query, delivers the result, then sleeps for the configured interval before
//! the next query, so at most one query per session is ever in flight.
//! Delivery and cancellation share one lock: once [`PollSession::cancel`]
//! returns, the sink is never called again for that session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use convert_core::{JobHandle, JobId, JobStatus};
use engine_logging::{engine_debug, engine_info, engine_warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::JobService;
use crate::{PollEvent, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Pause between a response and the next query.
    pub interval: Duration,
    /// Upper bound on queries before the session gives up with `TimedOut`.
    /// At least one query is always made.
    pub max_polls: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_polls: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Completed,
    Failed,
    TransportError,
    TimedOut,
    Cancelled,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PollState::Idle | PollState::Polling)
    }
}

/// Receives the results of one session.
///
/// Callbacks run while the session holds its delivery lock, so they must not
/// call back into the same session.
pub trait StatusSink: Send + Sync {
    fn on_status(&self, job_id: &JobId, status: &JobStatus);

    fn on_transport_error(&self, job_id: &JobId, error: &TransportError);
}

/// Forwards session results as [`PollEvent`]s over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelStatusSink {
    tx: mpsc::UnboundedSender<PollEvent>,
}

impl ChannelStatusSink {
    pub fn new(tx: mpsc::UnboundedSender<PollEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PollEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl StatusSink for ChannelStatusSink {
    fn on_status(&self, job_id: &JobId, status: &JobStatus) {
        let _ = self.tx.send(PollEvent::Status {
            job_id: job_id.clone(),
            status: status.clone(),
        });
    }

    fn on_transport_error(&self, job_id: &JobId, error: &TransportError) {
        let _ = self.tx.send(PollEvent::TransportError {
            job_id: job_id.clone(),
            error: error.clone(),
        });
    }
}

#[derive(Debug)]
struct Shared {
    state: PollState,
    last_status: Option<JobStatus>,
    polls: u32,
}

/// Starts poll sessions against one service with shared settings.
#[derive(Clone)]
pub struct PollLoop {
    service: Arc<dyn JobService>,
    settings: PollSettings,
}

impl PollLoop {
    pub fn new(service: Arc<dyn JobService>, settings: PollSettings) -> Self {
        Self { service, settings }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Spawn a session for `handle`. The first query is issued immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, handle: JobHandle, sink: Arc<dyn StatusSink>) -> PollSession {
        start_polling(self.service.clone(), handle, self.settings, sink)
    }

    pub fn cancel(&self, session: &PollSession) {
        session.cancel();
    }
}

pub fn start_polling(
    service: Arc<dyn JobService>,
    handle: JobHandle,
    settings: PollSettings,
    sink: Arc<dyn StatusSink>,
) -> PollSession {
    let job_id = handle.job_id;
    let shared = Arc::new(Mutex::new(Shared {
        state: PollState::Polling,
        last_status: None,
        polls: 0,
    }));
    let cancel = CancellationToken::new();
    let finished = CancellationToken::new();

    engine_info!("Polling job {job_id} every {:?}", settings.interval);
    tokio::spawn(run_session(
        service,
        job_id.clone(),
        settings,
        sink,
        shared.clone(),
        cancel.clone(),
        finished.clone(),
    ));

    PollSession {
        job_id,
        shared,
        cancel,
        finished,
    }
}

/// The live binding between one job and its polling task.
#[derive(Debug)]
pub struct PollSession {
    job_id: JobId,
    shared: Arc<Mutex<Shared>>,
    cancel: CancellationToken,
    finished: CancellationToken,
}

impl PollSession {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn state(&self) -> PollState {
        lock(&self.shared).state
    }

    pub fn last_status(&self) -> Option<JobStatus> {
        lock(&self.shared).last_status.clone()
    }

    /// Number of query results delivered so far.
    pub fn polls(&self) -> u32 {
        lock(&self.shared).polls
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Stop polling. No callback fires after this returns, even for a query
    /// that is already in flight. A no-op on a finished session.
    pub fn cancel(&self) {
        {
            let mut shared = lock(&self.shared);
            if shared.state.is_terminal() {
                return;
            }
            shared.state = PollState::Cancelled;
        }
        engine_info!("Polling cancelled for job {}", self.job_id);
        self.cancel.cancel();
    }

    /// Wait for the polling task to exit and return the final state.
    pub async fn wait(&self) -> PollState {
        self.finished.cancelled().await;
        self.state()
    }
}

async fn run_session(
    service: Arc<dyn JobService>,
    job_id: JobId,
    settings: PollSettings,
    sink: Arc<dyn StatusSink>,
    shared: Arc<Mutex<Shared>>,
    cancel: CancellationToken,
    finished: CancellationToken,
) {
    let _finished = finished.drop_guard();

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = service.status(&job_id) => result,
        };

        let polls = match deliver(&shared, sink.as_ref(), &job_id, result) {
            Some(polls) => polls,
            None => return,
        };

        if settings.max_polls.is_some_and(|max| polls >= max) {
            time_out(&shared, sink.as_ref(), &job_id, polls);
            return;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(settings.interval) => {}
        }
    }
}

/// Hand one query result to the sink. Returns the poll count when the
/// session should keep going.
fn deliver(
    shared: &Mutex<Shared>,
    sink: &dyn StatusSink,
    job_id: &JobId,
    result: Result<JobStatus, TransportError>,
) -> Option<u32> {
    let mut shared = lock(shared);
    if shared.state != PollState::Polling {
        engine_debug!("Discarding poll result for job {job_id}: session is {:?}", shared.state);
        return None;
    }
    shared.polls += 1;

    match result {
        Ok(status) => {
            engine_debug!("Job {job_id} poll {}: {}", shared.polls, status.name());
            sink.on_status(job_id, &status);
            let next = match &status {
                JobStatus::Completed { .. } => Some(PollState::Completed),
                JobStatus::Failed { .. } => Some(PollState::Failed),
                JobStatus::Queued | JobStatus::Running { .. } => None,
            };
            shared.last_status = Some(status);
            match next {
                Some(state) => {
                    shared.state = state;
                    engine_info!("Job {job_id} finished polling: {state:?}");
                    None
                }
                None => Some(shared.polls),
            }
        }
        Err(error) => {
            shared.state = PollState::TransportError;
            engine_warn!("Polling job {job_id} failed: {error}");
            sink.on_transport_error(job_id, &error);
            None
        }
    }
}

fn time_out(shared: &Mutex<Shared>, sink: &dyn StatusSink, job_id: &JobId, polls: u32) {
    let mut shared = lock(shared);
    if shared.state != PollState::Polling {
        return;
    }
    shared.state = PollState::TimedOut;
    engine_warn!("Job {job_id} still running after {polls} polls; giving up");
    sink.on_transport_error(job_id, &TransportError::TimedOut { polls });
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
