use convert_core::{Effect, Msg};
use convert_engine::{EngineEvent, EngineHandle};
use engine_logging::{engine_debug, engine_info};

/// Hands effects produced by `update` to the engine.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn enqueue(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SubmitJob { key, request } => {
                    engine_info!(
                        "SubmitJob key={} source={} verification={}",
                        key,
                        request.source_ref,
                        request.verification_token.is_some()
                    );
                    self.engine.submit(key, request);
                }
                Effect::StartPolling { key, handle } => {
                    engine_info!("StartPolling key={} job_id={}", key, handle.job_id);
                    self.engine.start_polling(key, handle);
                }
                Effect::CancelPolling { key } => {
                    let stopped = self.engine.cancel(&key);
                    engine_debug!("CancelPolling key={} stopped={}", key, stopped);
                }
                Effect::RetrieveArtifact { key, artifact_ref } => {
                    engine_info!("RetrieveArtifact key={} ref={}", key, artifact_ref);
                    self.engine.retrieve_artifact(key, artifact_ref);
                }
            }
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.engine.active_sessions()
    }

    pub fn shutdown(&mut self) {
        self.engine.shutdown();
    }
}

/// Translate an engine event into the message `update` understands.
pub fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Submitted { key, handle } => Msg::Submitted { key, handle },
        EngineEvent::SubmissionFailed { key, error } => Msg::SubmissionFailed {
            key,
            reason: error.reason(),
        },
        EngineEvent::Status {
            key,
            job_id,
            status,
        } => Msg::Status {
            key,
            job_id,
            status,
        },
        EngineEvent::TransportError { key, job_id, error } => Msg::TransportError {
            key,
            job_id,
            message: error.to_string(),
        },
        EngineEvent::ArtifactSaved { key, path } => Msg::ArtifactSaved {
            key,
            location: path.display().to_string(),
        },
        EngineEvent::ArtifactFailed { key, reason } => Msg::ArtifactFailed { key, reason },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use convert_core::{JobId, JobKey};
    use convert_engine::{SubmissionError, TransportError};
    use pretty_assertions::assert_eq;

    #[test]
    fn submission_failure_carries_service_reason() {
        let msg = event_to_msg(EngineEvent::SubmissionFailed {
            key: JobKey::new("22"),
            error: SubmissionError::Rejected {
                status: 400,
                reason: "CAPTCHA verification failed".into(),
            },
        });
        assert_eq!(
            msg,
            Msg::SubmissionFailed {
                key: JobKey::new("22"),
                reason: "CAPTCHA verification failed".into(),
            }
        );
    }

    #[test]
    fn transport_error_keeps_details_for_the_row() {
        let msg = event_to_msg(EngineEvent::TransportError {
            key: JobKey::new("22"),
            job_id: JobId::new("t1"),
            error: TransportError::TimedOut { polls: 30 },
        });
        assert_eq!(
            msg,
            Msg::TransportError {
                key: JobKey::new("22"),
                job_id: JobId::new("t1"),
                message: "no terminal status after 30 polls".into(),
            }
        );
    }

    #[test]
    fn saved_path_becomes_location_text() {
        let msg = event_to_msg(EngineEvent::ArtifactSaved {
            key: JobKey::new("22"),
            path: PathBuf::from("out/clip.mp4"),
        });
        assert_eq!(
            msg,
            Msg::ArtifactSaved {
                key: JobKey::new("22"),
                location: "out/clip.mp4".into(),
            }
        );
    }
}
