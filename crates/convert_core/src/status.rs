use std::fmt;

/// Opaque identifier issued by the conversion service for one job.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Consumer-side identity of one row: the format selector it converts to.
///
/// Two rows for the same source but different formats always have distinct keys,
/// which is what keeps their sessions from cross-delivering events.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobKey(String);

impl JobKey {
    pub fn new(format_selector: impl Into<String>) -> Self {
        Self(format_selector.into())
    }

    pub fn format_selector(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Handle returned by a successful submission. Owned by exactly one poll session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: JobId,
}

impl JobHandle {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(job_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub source_ref: String,
    pub format_selector: String,
    /// Anti-automation proof obtained by the consumer before submitting.
    pub verification_token: Option<String>,
    /// Requested artifact name; the service sanitizes it.
    pub output_name: Option<String>,
}

impl JobRequest {
    pub fn new(source_ref: impl Into<String>, format_selector: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            format_selector: format_selector.into(),
            verification_token: None,
            output_name: None,
        }
    }

    pub fn with_verification_token(mut self, token: impl Into<String>) -> Self {
        self.verification_token = Some(token.into());
        self
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }
}

/// Server-reported state of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    /// `percentage` is `None` when the service sent no progress this tick.
    Running {
        percentage: Option<u8>,
        label: String,
    },
    Completed {
        artifact_ref: String,
    },
    Failed {
        reason: String,
    },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running { .. } => "running",
            JobStatus::Completed { .. } => "completed",
            JobStatus::Failed { .. } => "failed",
        }
    }
}
