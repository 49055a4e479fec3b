use std::collections::BTreeMap;

use crate::view_model::{AppViewModel, JobRowView, CONNECTION_LOST_TEXT};
use crate::{JobId, JobKey, JobRequest, JobStatus};

/// Tri-state lifecycle of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Terminal(Outcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
    ConnectionLost,
    Cancelled,
    /// Submission was refused; no job exists server-side.
    Rejected,
}

/// Visual tone of the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Normal,
    Indeterminate,
    Error,
}

/// What every submission for the loaded source carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub source_ref: String,
    pub verification_token: Option<String>,
    pub output_name: Option<String>,
}

impl SourceSpec {
    pub fn new(source_ref: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            verification_token: None,
            output_name: None,
        }
    }
}

/// Per-job presentation state. Purely reactive: every change comes from a
/// message routed by [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPanel {
    key: JobKey,
    phase: Phase,
    job_id: Option<JobId>,
    percent: u8,
    status_text: String,
    tone: Tone,
    artifact_ref: Option<String>,
    saved_to: Option<String>,
    detail: Option<String>,
}

impl JobPanel {
    pub fn new(key: JobKey) -> Self {
        Self {
            key,
            phase: Phase::Idle,
            job_id: None,
            percent: 0,
            status_text: String::new(),
            tone: Tone::Normal,
            artifact_ref: None,
            saved_to: None,
            detail: None,
        }
    }

    pub fn key(&self) -> &JobKey {
        &self.key
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// The row action is available whenever the row is not running.
    pub fn action_enabled(&self) -> bool {
        !self.is_running()
    }

    pub(crate) fn start(&mut self) -> bool {
        if !self.action_enabled() {
            return false;
        }
        *self = JobPanel::new(self.key.clone());
        self.phase = Phase::Running;
        self.status_text = "Starting...".to_string();
        true
    }

    pub(crate) fn attach(&mut self, job_id: &JobId) -> bool {
        if !self.is_running() || self.job_id.is_some() {
            return false;
        }
        self.job_id = Some(job_id.clone());
        self.status_text = "Submitted".to_string();
        true
    }

    pub(crate) fn reject(&mut self, reason: &str) -> bool {
        if !self.is_running() || self.job_id.is_some() {
            return false;
        }
        self.phase = Phase::Terminal(Outcome::Rejected);
        self.status_text = format!("Error: {reason}");
        self.tone = Tone::Error;
        true
    }

    pub(crate) fn apply_status(&mut self, job_id: &JobId, status: &JobStatus) -> bool {
        if !self.accepts(job_id) {
            return false;
        }
        match status {
            JobStatus::Queued => {
                self.status_text = "Queued".to_string();
                self.tone = Tone::Indeterminate;
            }
            JobStatus::Running { percentage, label } => {
                self.tone = Tone::Normal;
                match percentage {
                    Some(value) => {
                        // Never let the bar move backwards within one job.
                        self.percent = self.percent.max((*value).min(100));
                        self.status_text = format!("{}% - {}", self.percent, label);
                    }
                    None => self.status_text = label.clone(),
                }
            }
            JobStatus::Completed { artifact_ref } => {
                self.phase = Phase::Terminal(Outcome::Completed);
                self.percent = 100;
                self.tone = Tone::Normal;
                self.status_text = "Completed".to_string();
                self.artifact_ref = Some(artifact_ref.clone());
            }
            JobStatus::Failed { reason } => {
                self.phase = Phase::Terminal(Outcome::Failed);
                self.tone = Tone::Error;
                self.status_text = format!("Failed: {reason}");
            }
        }
        true
    }

    pub(crate) fn apply_transport_error(&mut self, job_id: &JobId, message: &str) -> bool {
        if !self.accepts(job_id) {
            return false;
        }
        self.phase = Phase::Terminal(Outcome::ConnectionLost);
        self.tone = Tone::Error;
        self.status_text = CONNECTION_LOST_TEXT.to_string();
        self.detail = Some(message.to_string());
        true
    }

    pub(crate) fn cancel(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.phase = Phase::Terminal(Outcome::Cancelled);
        self.tone = Tone::Normal;
        self.status_text = "Cancelled".to_string();
        true
    }

    pub(crate) fn artifact_to_retrieve(&self) -> Option<&str> {
        match self.phase {
            Phase::Terminal(Outcome::Completed) => self.artifact_ref.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn record_saved(&mut self, location: &str) -> bool {
        if self.artifact_to_retrieve().is_none() {
            return false;
        }
        self.saved_to = Some(location.to_string());
        self.detail = None;
        true
    }

    pub(crate) fn record_save_failed(&mut self, reason: &str) -> bool {
        if self.artifact_to_retrieve().is_none() {
            return false;
        }
        self.detail = Some(format!("Save failed: {reason}"));
        true
    }

    fn accepts(&self, job_id: &JobId) -> bool {
        self.is_running() && self.job_id.as_ref() == Some(job_id)
    }

    pub fn view(&self) -> JobRowView {
        let action_label = match self.phase {
            Phase::Idle => "Download",
            Phase::Running => "Working",
            Phase::Terminal(Outcome::Completed) => "Download again",
            Phase::Terminal(_) => "Retry",
        };
        JobRowView {
            key: self.key.clone(),
            job_id: self.job_id.clone(),
            phase: self.phase,
            action_enabled: self.action_enabled(),
            action_label,
            status_text: self.status_text.clone(),
            percent: self.percent,
            tone: self.tone,
            artifact_ref: self.artifact_ref.clone(),
            saved_to: self.saved_to.clone(),
            detail: self.detail.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    source: Option<SourceSpec>,
    jobs: BTreeMap<JobKey, JobPanel>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            source_ref: self.source.as_ref().map(|s| s.source_ref.clone()),
            jobs: self.jobs.values().map(JobPanel::view).collect(),
            dirty: self.dirty,
        }
    }

    pub fn job(&self, key: &JobKey) -> Option<&JobPanel> {
        self.jobs.get(key)
    }

    /// Returns whether a render is pending and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Replace the current source and its rows. Returns keys that were still running.
    pub(crate) fn load_source(&mut self, source: SourceSpec, formats: Vec<String>) -> Vec<JobKey> {
        let running = self.cancel_all();
        self.source = Some(source);
        self.jobs = formats
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .map(|f| {
                let key = JobKey::new(f);
                (key.clone(), JobPanel::new(key))
            })
            .collect();
        self.mark_dirty();
        running
    }

    pub(crate) fn start_job(&mut self, key: &JobKey) -> Option<JobRequest> {
        let source = self.source.as_ref()?;
        let panel = self.jobs.get_mut(key)?;
        if !panel.start() {
            return None;
        }
        let mut request = JobRequest::new(source.source_ref.clone(), key.format_selector());
        request.verification_token = source.verification_token.clone();
        request.output_name = source.output_name.clone();
        self.mark_dirty();
        Some(request)
    }

    /// Apply `f` to the row for `key`; marks the state dirty when the row changed.
    pub(crate) fn with_job(&mut self, key: &JobKey, f: impl FnOnce(&mut JobPanel) -> bool) -> bool {
        let changed = self.jobs.get_mut(key).map(f).unwrap_or(false);
        if changed {
            self.mark_dirty();
        }
        changed
    }

    pub(crate) fn artifact_for(&self, key: &JobKey) -> Option<String> {
        self.jobs
            .get(key)
            .and_then(JobPanel::artifact_to_retrieve)
            .map(str::to_string)
    }

    pub(crate) fn cancel_all(&mut self) -> Vec<JobKey> {
        let mut cancelled = Vec::new();
        for (key, panel) in self.jobs.iter_mut() {
            if panel.cancel() {
                cancelled.push(key.clone());
            }
        }
        if !cancelled.is_empty() {
            self.mark_dirty();
        }
        cancelled
    }
}
