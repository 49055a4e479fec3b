#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use convert_core::{JobHandle, JobId, JobRequest, JobStatus};
use convert_engine::{JobService, SubmissionError, TransportError};
use tokio::time::Instant;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

pub fn running(percentage: u8, label: &str) -> JobStatus {
    JobStatus::Running {
        percentage: Some(percentage),
        label: label.to_string(),
    }
}

pub fn completed(artifact_ref: &str) -> JobStatus {
    JobStatus::Completed {
        artifact_ref: artifact_ref.to_string(),
    }
}

pub fn failed(reason: &str) -> JobStatus {
    JobStatus::Failed {
        reason: reason.to_string(),
    }
}

/// In-memory service that replays scripted answers per job and records
/// when each status query was issued.
#[derive(Default)]
pub struct ScriptedService {
    scripts: Mutex<HashMap<JobId, VecDeque<Result<JobStatus, TransportError>>>>,
    submissions: Mutex<VecDeque<Result<JobHandle, SubmissionError>>>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    queries: Mutex<Vec<(JobId, Instant)>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every status query takes this long to answer.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn script(
        self,
        job_id: &str,
        steps: impl IntoIterator<Item = Result<JobStatus, TransportError>>,
    ) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(JobId::new(job_id), steps.into_iter().collect());
        self
    }

    pub fn submission(self, result: Result<JobHandle, SubmissionError>) -> Self {
        self.submissions.lock().unwrap().push_back(result);
        self
    }

    pub fn queries_for(&self, job_id: &str) -> Vec<Instant> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id.as_str() == job_id)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobService for ScriptedService {
    async fn submit(&self, _request: &JobRequest) -> Result<JobHandle, SubmissionError> {
        self.submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SubmissionError::InvalidResponse("nothing scripted".into())))
    }

    async fn status(&self, job_id: &JobId) -> Result<JobStatus, TransportError> {
        self.queries
            .lock()
            .unwrap()
            .push((job_id.clone(), Instant::now()));
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(VecDeque::pop_front);
        next.unwrap_or_else(|| Ok(running(50, "Processing")))
    }
}
