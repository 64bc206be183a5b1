//! Client for a remote element-detection service.
//!
//! The service accepts `POST <url>` with a multipart `image` part plus the
//! form fields `return=elements`, `format=json` and `conf_threshold`, and
//! answers `{"elements": [{"bbox": [..4], "point": [..2]?, "confidence": f?}]}`.

use std::time::Duration;

use async_trait::async_trait;
use groundmark_core::dedup::Candidate;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::Detector;
use crate::config::DetectorConfig;
use crate::error::{AnnotatorError, AnnotatorResult};
use crate::imaging::ImageInput;

const SERVICE: &str = "detector";

pub struct HttpDetector {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    conf_threshold: f64,
    min_confidence: f64,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    elements: Vec<RawElement>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    bbox: Vec<f64>,
    #[serde(default)]
    point: Option<Vec<f64>>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl HttpDetector {
    /// Build a detector from configuration. Returns `Ok(None)` when no
    /// detector URL is configured.
    pub fn from_config(config: &DetectorConfig) -> AnnotatorResult<Option<Self>> {
        let Some(url) = config.url.clone() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Some(Self {
            client,
            url,
            api_key: config.api_key.clone(),
            conf_threshold: config.conf_threshold,
            min_confidence: config.min_confidence,
        }))
    }

    async fn ensure_success(response: reqwest::Response) -> AnnotatorResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            return Err(AnnotatorError::Api {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Convert the service response into candidates, dropping malformed entries
/// and those below `min_confidence`.
fn into_candidates(response: DetectResponse, min_confidence: f64) -> Vec<Candidate> {
    response
        .elements
        .into_iter()
        .filter(|el| el.confidence.map_or(true, |c| c >= min_confidence))
        .filter_map(|el| {
            let bbox: [f64; 4] = el.bbox.try_into().ok()?;
            let point = el.point.and_then(|p| <[f64; 2]>::try_from(p).ok());
            Candidate::from_raw(bbox, point, el.confidence)
        })
        .collect()
}

#[async_trait]
impl Detector for HttpDetector {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn detect(&self, image: &ImageInput) -> AnnotatorResult<Vec<Candidate>> {
        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.filename.clone())
            .mime_str(image.mime())?;
        let form = Form::new()
            .part("image", part)
            .text("return", "elements")
            .text("format", "json")
            .text("conf_threshold", self.conf_threshold.to_string());

        let mut request = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json")
            .multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = Self::ensure_success(request.send().await?).await?;
        let parsed: DetectResponse = response.json().await?;
        let candidates = into_candidates(parsed, self.min_confidence);

        tracing::debug!(
            filename = %image.filename,
            candidates = candidates.len(),
            "Detector returned candidates"
        );
        Ok(candidates)
    }
}
