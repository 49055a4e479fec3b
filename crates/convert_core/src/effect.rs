use crate::{JobHandle, JobKey, JobRequest};

/// Side effects requested by [`crate::update`]; executed outside the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SubmitJob { key: JobKey, request: JobRequest },
    StartPolling { key: JobKey, handle: JobHandle },
    CancelPolling { key: JobKey },
    RetrieveArtifact { key: JobKey, artifact_ref: String },
}
