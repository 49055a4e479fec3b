use std::time::Duration;

use async_trait::async_trait;
use convert_core::{JobHandle, JobId, JobRequest, JobStatus};
use engine_logging::{engine_debug, engine_info, engine_warn};
use url::Url;

use crate::wire::{decode_status, error_reason, LookupBody, StatusReply, SubmitBody, SubmitReply};
use crate::{ClientError, LookupError, MediaInfo, SubmissionError, TransportError};

const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Sent as `X-CSRFToken` on submissions when present.
    pub session_token: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            session_token: None,
        }
    }
}

/// The two operations a poll session and the engine need from the service.
#[async_trait]
pub trait JobService: Send + Sync {
    async fn submit(&self, request: &JobRequest) -> Result<JobHandle, SubmissionError>;

    async fn status(&self, job_id: &JobId) -> Result<JobStatus, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestJobClient {
    http: reqwest::Client,
    base: Url,
    session_token: Option<String>,
}

impl ReqwestJobClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let base = parse_base_url(&settings.base_url)?;
        let http = build_http_client(&settings)?;
        Ok(Self {
            http,
            base,
            session_token: settings.session_token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Fetch source metadata and the list of formats it can be converted to.
    pub async fn lookup_formats(&self, source_ref: &str) -> Result<MediaInfo, LookupError> {
        let url = self.endpoint(&["api", "download"]);
        engine_debug!("Looking up formats for {source_ref}");

        let response = self
            .http
            .post(url)
            .json(&LookupBody { url: source_ref })
            .send()
            .await
            .map_err(|err| LookupError::Network(err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| LookupError::Network(err.to_string()))?;

        if !status.is_success() {
            return Err(LookupError::Rejected {
                status: status.as_u16(),
                reason: error_reason(&body).unwrap_or_else(|| status.to_string()),
            });
        }
        serde_json::from_slice(&body).map_err(|err| LookupError::InvalidResponse(err.to_string()))
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl JobService for ReqwestJobClient {
    async fn submit(&self, request: &JobRequest) -> Result<JobHandle, SubmissionError> {
        let url = self.endpoint(&["api", "process-video"]);
        let mut builder = self.http.post(url).json(&SubmitBody::from(request));
        if let Some(token) = self.session_token.as_deref() {
            builder = builder.header(CSRF_HEADER, token);
        }

        let response = builder.send().await.map_err(submission_failure)?;
        let status = response.status();
        let body = response.bytes().await.map_err(submission_failure)?;

        if !status.is_success() {
            let reason = error_reason(&body)
                .unwrap_or_else(|| format!("service responded with {status}"));
            engine_warn!(
                "Submission of {} as {} rejected ({}): {reason}",
                request.source_ref,
                request.format_selector,
                status.as_u16()
            );
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }

        let reply: SubmitReply = serde_json::from_slice(&body)
            .map_err(|err| SubmissionError::InvalidResponse(err.to_string()))?;
        let task_id = reply
            .task_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| SubmissionError::InvalidResponse("missing task_id".to_string()))?;

        engine_info!(
            "Submitted {} as {}: job {task_id}",
            request.source_ref,
            request.format_selector
        );
        Ok(JobHandle::new(task_id))
    }

    async fn status(&self, job_id: &JobId) -> Result<JobStatus, TransportError> {
        let url = self.endpoint(&["api", "status", job_id.as_str()]);
        let response = self.http.get(url).send().await.map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus(status.as_u16()));
        }
        let body = response.bytes().await.map_err(transport_failure)?;
        let reply: StatusReply = serde_json::from_slice(&body)
            .map_err(|err| TransportError::InvalidBody(err.to_string()))?;
        decode_status(reply)
    }
}

/// Parse the service root; the result always ends with `/` so relative
/// references resolve beneath it.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let invalid = |message: String| ClientError::InvalidBaseUrl {
        url: raw.to_string(),
        message,
    };
    let mut url = Url::parse(raw.trim()).map_err(|err| invalid(err.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http(s) url".to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

pub(crate) fn build_http_client(settings: &ClientSettings) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .build()
        .map_err(|err| ClientError::Build(err.to_string()))
}

fn submission_failure(err: reqwest::Error) -> SubmissionError {
    if err.is_timeout() {
        return SubmissionError::Timeout;
    }
    SubmissionError::Network(err.to_string())
}

fn transport_failure(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout;
    }
    TransportError::Network(err.to_string())
}
