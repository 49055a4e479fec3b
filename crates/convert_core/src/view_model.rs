use crate::{JobId, JobKey, Outcome, Phase, Tone};

/// Generic text shown when a status query could not be completed.
pub const CONNECTION_LOST_TEXT: &str = "Error polling: connection lost";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub source_ref: Option<String>,
    pub jobs: Vec<JobRowView>,
    pub dirty: bool,
}

impl AppViewModel {
    /// True when no row is running.
    pub fn all_settled(&self) -> bool {
        self.jobs.iter().all(|job| job.phase != Phase::Running)
    }

    pub fn job(&self, key: &JobKey) -> Option<&JobRowView> {
        self.jobs.iter().find(|job| &job.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub key: JobKey,
    pub job_id: Option<JobId>,
    pub phase: Phase,
    pub action_enabled: bool,
    pub action_label: &'static str,
    pub status_text: String,
    pub percent: u8,
    pub tone: Tone,
    /// Retrieval affordance; present once the job completed.
    pub artifact_ref: Option<String>,
    pub saved_to: Option<String>,
    pub detail: Option<String>,
}

impl JobRowView {
    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            Phase::Terminal(outcome) => Some(outcome),
            Phase::Idle | Phase::Running => None,
        }
    }
}
