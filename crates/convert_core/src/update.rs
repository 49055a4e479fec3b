use crate::{AppState, Effect, JobPanel, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SourceLoaded { source, formats } => state
            .load_source(source, formats)
            .into_iter()
            .map(|key| Effect::CancelPolling { key })
            .collect(),
        Msg::StartClicked { key } => match state.start_job(&key) {
            Some(request) => vec![Effect::SubmitJob { key, request }],
            None => Vec::new(),
        },
        Msg::Submitted { key, handle } => {
            if state.with_job(&key, |job| job.attach(&handle.job_id)) {
                vec![Effect::StartPolling { key, handle }]
            } else {
                // Row was cancelled or restarted while the submission was in flight.
                Vec::new()
            }
        }
        Msg::SubmissionFailed { key, reason } => {
            state.with_job(&key, |job| job.reject(&reason));
            Vec::new()
        }
        Msg::Status {
            key,
            job_id,
            status,
        } => {
            state.with_job(&key, |job| job.apply_status(&job_id, &status));
            Vec::new()
        }
        Msg::TransportError {
            key,
            job_id,
            message,
        } => {
            state.with_job(&key, |job| job.apply_transport_error(&job_id, &message));
            Vec::new()
        }
        Msg::CancelClicked { key } => {
            if state.with_job(&key, JobPanel::cancel) {
                vec![Effect::CancelPolling { key }]
            } else {
                Vec::new()
            }
        }
        Msg::CancelAll => state
            .cancel_all()
            .into_iter()
            .map(|key| Effect::CancelPolling { key })
            .collect(),
        Msg::SaveClicked { key } => match state.artifact_for(&key) {
            Some(artifact_ref) => vec![Effect::RetrieveArtifact { key, artifact_ref }],
            None => Vec::new(),
        },
        Msg::ArtifactSaved { key, location } => {
            state.with_job(&key, |job| job.record_saved(&location));
            Vec::new()
        }
        Msg::ArtifactFailed { key, reason } => {
            state.with_job(&key, |job| job.record_save_failed(&reason));
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
