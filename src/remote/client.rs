use reqwest::multipart::{Form, Part};
use reqwest::Response;
use tracing::{info, warn};

use super::messages::{Effect, ErrorResponse};
use super::UPLOAD_FILENAME;
use crate::audio::{WavBlob, WAV_MIME_TYPE};
use crate::error::{Error, Result};

/// Availability of the remote service, as seen by the effect catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    Online(Vec<Effect>),
    Offline,
}

impl BackendStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, BackendStatus::Online(_))
    }
}

pub struct MorphClient {
    http: reqwest::Client,
    base_url: String,
}

impl MorphClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the effect catalog
    pub async fn effects(&self) -> Result<Vec<Effect>> {
        let url = format!("{}/api/effects", self.base_url);

        let response = self.http.get(&url).send().await?;
        let effects: Vec<Effect> = check_status(response).await?.json().await?;

        info!("Fetched {} effects from {}", effects.len(), url);

        Ok(effects)
    }

    /// Probe the service through its effect catalog
    ///
    /// Never fails: any error is reported as [`BackendStatus::Offline`].
    pub async fn status(&self) -> BackendStatus {
        match self.effects().await {
            Ok(effects) => BackendStatus::Online(effects),
            Err(e) => {
                warn!("Backend unreachable, effects disabled: {}", e);
                BackendStatus::Offline
            }
        }
    }

    /// Upload a recording and return the transformed audio bytes
    pub async fn transform(&self, wav: &WavBlob, effect_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/api/process-audio", self.base_url);

        let audio = Part::bytes(wav.as_bytes().to_vec())
            .file_name(UPLOAD_FILENAME)
            .mime_str(WAV_MIME_TYPE)?;
        let form = Form::new()
            .part("audio", audio)
            .text("effect", effect_id.to_string());

        info!(
            "Uploading {} bytes to {} (effect={})",
            wav.len(),
            url,
            effect_id
        );

        let response = self.http.post(&url).multipart(form).send().await?;
        let body = check_status(response).await?.bytes().await?;

        info!("Received {} bytes of transformed audio", body.len());

        Ok(body.to_vec())
    }
}

/// Turn a non-2xx response into [`Error::Remote`], using the service's
/// `{"error": ...}` body when present
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status.to_string()
            } else {
                body
            }
        });

    Err(Error::Remote {
        status: Some(status.as_u16()),
        message,
    })
}
