use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use url::Url;

use crate::client::parse_base_url;
use crate::filename::artifact_filename;
use crate::persist::StagedFile;
use crate::{ArtifactError, ClientError, ClientSettings};
use engine_logging::{engine_debug, engine_info};

/// Downloads finished artifacts from the conversion service.
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    http: reqwest::Client,
    base: Url,
}

impl ArtifactFetcher {
    /// Artifacts can be large, so only connect and per-read timeouts apply.
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let base = parse_base_url(&settings.base_url)?;
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.request_timeout)
            .build()
            .map_err(|err| ClientError::Build(err.to_string()))?;
        Ok(Self { http, base })
    }

    /// Absolute location of `artifact_ref`; relative references resolve
    /// against the service root.
    pub fn resolve(&self, artifact_ref: &str) -> Result<Url, ArtifactError> {
        let trimmed = artifact_ref.trim();
        if trimmed.is_empty() {
            return Err(ArtifactError::InvalidRef(artifact_ref.to_string()));
        }
        self.base
            .join(trimmed)
            .map_err(|_| ArtifactError::InvalidRef(artifact_ref.to_string()))
    }

    /// Stream the artifact into `dest_dir` and return the saved path.
    pub async fn fetch(&self, artifact_ref: &str, dest_dir: &Path) -> Result<PathBuf, ArtifactError> {
        let url = self.resolve(artifact_ref)?;
        engine_debug!("Retrieving artifact {url}");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| ArtifactError::Network(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArtifactError::HttpStatus(status.as_u16()));
        }

        let suggested = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(disposition_filename);
        let filename = artifact_filename(suggested.as_deref(), artifact_ref);

        let mut staged = StagedFile::create(dest_dir, &filename)?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| ArtifactError::Network(err.to_string()))?;
            staged.write_chunk(&chunk)?;
        }
        let written = staged.written();
        let path = staged.commit()?;

        engine_info!("Saved {written} bytes to {}", path.display());
        Ok(path)
    }
}

/// The plain `filename=` parameter of a `Content-Disposition` value.
fn disposition_filename(value: &str) -> Option<String> {
    value.split(';').find_map(|part| {
        let (name, raw) = part.trim().split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let unquoted = raw.trim().trim_matches('"').trim();
        (!unquoted.is_empty()).then(|| unquoted.to_string())
    })
}
