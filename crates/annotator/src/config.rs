//! Collaborator configuration loaded from environment variables.

use std::str::FromStr;

use groundmark_core::annotation::DetailLevel;
use groundmark_core::dedup::DEFAULT_DUPLICATE_IOU;

/// Read `key`, falling back to `default` when unset or blank.
///
/// Panics at startup on an unparsable value, so misconfiguration fails fast.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has an invalid value '{raw}': {e}")),
        _ => default,
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Remote element-detector settings.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Detector endpoint; `None` means only the classical fallback is used.
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Threshold forwarded to the detector service.
    pub conf_threshold: f64,
    /// Candidates below this confidence are discarded locally.
    pub min_confidence: f64,
}

impl DetectorConfig {
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `DETECTOR_URL`            | unset   |
    /// | `DETECTOR_API_KEY`        | unset   |
    /// | `DETECTOR_TIMEOUT_SECS`   | `30`    |
    /// | `DETECTOR_CONF_THRESHOLD` | `0.5`   |
    /// | `DETECTOR_MIN_CONFIDENCE` | `0.3`   |
    pub fn from_env() -> Self {
        Self {
            url: env_opt("DETECTOR_URL"),
            api_key: env_opt("DETECTOR_API_KEY"),
            timeout_secs: env_or("DETECTOR_TIMEOUT_SECS", 30),
            conf_threshold: env_or("DETECTOR_CONF_THRESHOLD", 0.5),
            min_confidence: env_or("DETECTOR_MIN_CONFIDENCE", 0.3),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: 30,
            conf_threshold: 0.5,
            min_confidence: 0.3,
        }
    }
}

// ---------------------------------------------------------------------------
// Language model
// ---------------------------------------------------------------------------

/// OpenAI-compatible chat-completions settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_completion_tokens: u32,
    pub timeout_secs: u64,
    pub service_tier: Option<String>,
}

impl LlmConfig {
    /// | Env Var                        | Default                     |
    /// |--------------------------------|-----------------------------|
    /// | `OPENAI_API_KEY`               | unset                       |
    /// | `OPENAI_BASE_URL`              | `https://api.openai.com/v1` |
    /// | `OPENAI_MODEL`                 | `gpt-5`                     |
    /// | `OPENAI_MAX_COMPLETION_TOKENS` | `4096`                      |
    /// | `OPENAI_TIMEOUT_SECS`          | `900`                       |
    /// | `OPENAI_SERVICE_TIER`          | unset                       |
    pub fn from_env() -> Self {
        Self {
            api_key: env_opt("OPENAI_API_KEY").filter(|k| !k.starts_with("your_")),
            base_url: env_opt("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".into())
                .trim_end_matches('/')
                .to_string(),
            model: env_opt("OPENAI_MODEL").unwrap_or_else(|| "gpt-5".into()),
            max_completion_tokens: env_or("OPENAI_MAX_COMPLETION_TOKENS", 4096),
            timeout_secs: env_or("OPENAI_TIMEOUT_SECS", 900),
            service_tier: env_opt("OPENAI_SERVICE_TIER").map(|t| t.to_ascii_lowercase()),
        }
    }

    /// Reasoning-style models take `max_completion_tokens` and accept a
    /// service tier; older models take `max_tokens`.
    pub fn uses_completion_tokens(&self) -> bool {
        let model = self.model.to_ascii_lowercase();
        model.starts_with("gpt-5") || model.starts_with("o3")
    }
}

// ---------------------------------------------------------------------------
// Annotation pipeline
// ---------------------------------------------------------------------------

/// Tuning for the detect, rank, prompt and snap pipeline.
#[derive(Debug, Clone)]
pub struct AnnotatorConfig {
    /// Hints offered to the model (`0` = unlimited).
    pub max_elements: usize,
    /// Upper bound on elements the model is asked to return.
    pub max_instructions: usize,
    pub detail_level: DetailLevel,
    pub dedup_iou: f64,
    /// Hints that get a cropped close-up attached to the request.
    pub max_crops: usize,
    /// Crops are downscaled so their longer side is at most this many pixels.
    pub crop_long_side: u32,
}

impl AnnotatorConfig {
    /// | Env Var                              | Default |
    /// |--------------------------------------|---------|
    /// | `ANNOTATOR_PREPROCESS_MAX_ELEMENTS`  | `24`    |
    /// | `ANNOTATOR_MAX_INSTRUCTIONS`         | `5`     |
    /// | `ANNOTATOR_DETAIL_LEVEL`             | `high`  |
    /// | `DEDUP_IOU_THRESHOLD`                | `0.6`   |
    /// | `ANNOTATOR_MAX_CROPS`                | `15`    |
    /// | `ANNOTATOR_CROP_LONG_SIDE`           | `160`   |
    pub fn from_env() -> Self {
        Self {
            max_elements: env_or("ANNOTATOR_PREPROCESS_MAX_ELEMENTS", 24),
            max_instructions: env_or("ANNOTATOR_MAX_INSTRUCTIONS", 5usize).max(1),
            detail_level: DetailLevel::parse_or(
                env_opt("ANNOTATOR_DETAIL_LEVEL").as_deref(),
                DetailLevel::High,
            ),
            dedup_iou: env_or("DEDUP_IOU_THRESHOLD", DEFAULT_DUPLICATE_IOU),
            max_crops: env_or("ANNOTATOR_MAX_CROPS", 15),
            crop_long_side: env_or("ANNOTATOR_CROP_LONG_SIDE", 160u32).max(32),
        }
    }
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            max_elements: 24,
            max_instructions: 5,
            detail_level: DetailLevel::High,
            dedup_iou: DEFAULT_DUPLICATE_IOU,
            max_crops: 15,
            crop_long_side: 160,
        }
    }
}
