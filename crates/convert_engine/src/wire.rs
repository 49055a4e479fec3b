//! JSON shapes exchanged with the conversion service.

use convert_core::{JobRequest, JobStatus};
use serde::{Deserialize, Serialize};

use crate::TransportError;

/// Status labels the service uses before any work has started.
const QUEUED_LABELS: &[&str] = &["queued", "pending", "waiting", "starting", "starting..."];

const COMPLETED_LABEL: &str = "Completed";
const FAILED_LABEL: &str = "Failed";
const UNKNOWN_FAILURE: &str = "Unknown error";

#[derive(Debug, Serialize)]
pub(crate) struct SubmitBody<'a> {
    url: &'a str,
    format_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<&'a str>,
    #[serde(rename = "g-recaptcha-response", skip_serializing_if = "Option::is_none")]
    verification: Option<&'a str>,
}

impl<'a> From<&'a JobRequest> for SubmitBody<'a> {
    fn from(request: &'a JobRequest) -> Self {
        Self {
            url: &request.source_ref,
            format_id: &request.format_selector,
            filename: request.output_name.as_deref(),
            verification: request.verification_token.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LookupBody<'a> {
    pub url: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitReply {
    #[serde(default)]
    pub task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StatusReply {
    pub status: String,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub download_link: Option<String>,
}

/// Extract the `error` string of a rejection body, if the body carries one.
pub(crate) fn error_reason(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorReply>(body)
        .ok()
        .and_then(|reply| reply.error)
        .map(|error| error.trim().to_string())
        .filter(|error| !error.is_empty())
}

pub(crate) fn decode_status(reply: StatusReply) -> Result<JobStatus, TransportError> {
    let label = reply.status.trim();
    if label.eq_ignore_ascii_case(COMPLETED_LABEL) {
        return reply
            .download_link
            .filter(|link| !link.trim().is_empty())
            .map(|artifact_ref| JobStatus::Completed { artifact_ref })
            .ok_or_else(|| {
                TransportError::InvalidBody("completed status without download_link".to_string())
            });
    }
    if label.eq_ignore_ascii_case(FAILED_LABEL) {
        let reason = reply
            .message
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| UNKNOWN_FAILURE.to_string());
        return Ok(JobStatus::Failed { reason });
    }
    if QUEUED_LABELS
        .iter()
        .any(|queued| label.eq_ignore_ascii_case(queued))
    {
        return Ok(JobStatus::Queued);
    }
    Ok(JobStatus::Running {
        percentage: reply.percentage.and_then(to_percent),
        label: label.to_string(),
    })
}

fn to_percent(value: f64) -> Option<u8> {
    if !value.is_finite() {
        return None;
    }
    Some(value.round().clamp(0.0, 100.0) as u8)
}
