use crate::{JobHandle, JobId, JobKey, JobStatus, SourceSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A source was looked up; one idle row is created per format.
    SourceLoaded {
        source: SourceSpec,
        formats: Vec<String>,
    },
    /// User pressed the row action (start, retry or restart).
    StartClicked { key: JobKey },
    /// The service accepted the submission for this row.
    Submitted { key: JobKey, handle: JobHandle },
    /// The service (or the transport) rejected the submission.
    SubmissionFailed { key: JobKey, reason: String },
    /// A poll delivered a status for the job attached to `key`.
    Status {
        key: JobKey,
        job_id: JobId,
        status: JobStatus,
    },
    /// A poll could not be completed; polling for this job has stopped.
    TransportError {
        key: JobKey,
        job_id: JobId,
        message: String,
    },
    /// User cancelled one running row.
    CancelClicked { key: JobKey },
    /// Cancel every running row (shutdown).
    CancelAll,
    /// User asked to retrieve the finished artifact.
    SaveClicked { key: JobKey },
    ArtifactSaved { key: JobKey, location: String },
    ArtifactFailed { key: JobKey, reason: String },
    /// Render tick.
    Tick,
    NoOp,
}
