//! Product descriptions: one vision request per extracted entry.
//!
//! All prompt text lives in [`crate::prompts`]; this module owns provider
//! resolution, the retry loop and turning the reply into a JSON object.
//!
//! ## Retry Strategy
//!
//! Retries are off by default (`max_retries = 0`). When enabled the wait is
//! `retry_backoff_ms * 2^attempt`: with 500 ms base and 3 retries that is
//! 500 ms → 1 s → 2 s. An error that survives every attempt aborts the run.

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::output::RawDescription;
use crate::prompts::{description_request, DESCRIPTION_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

const STYLE_NUMBER_KEY: &str = "Style Number";

/// Produces the structured description of one product.
#[async_trait]
pub trait DescriptionGenerator: Send + Sync {
    async fn generate(
        &self,
        style_number: &str,
        images: &[ImageData],
        keywords: &[String],
    ) -> Result<RawDescription, CatalogError>;
}

/// [`DescriptionGenerator`] backed by an edgequake-llm provider.
pub struct LlmDescriptionGenerator {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl LlmDescriptionGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &CatalogConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DESCRIPTION_SYSTEM_PROMPT.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }

    /// Resolve the provider from `config` and the environment.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl DescriptionGenerator for LlmDescriptionGenerator {
    async fn generate(
        &self,
        style_number: &str,
        images: &[ImageData],
        keywords: &[String],
    ) -> Result<RawDescription, CatalogError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user_with_images(
                description_request(style_number, keywords),
                images.to_vec(),
            ),
        ];
        let options = self.build_options();

        let mut last_err: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Style {}: retry {}/{} after {}ms",
                    style_number, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    debug!(
                        "Style {}: {} input tokens, {} output tokens, {:?}",
                        style_number,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(parse_description(style_number, &response.content));
                }
                Err(e) => {
                    let err_msg = format!("{}", e);
                    warn!("Style {}: attempt {} failed: {}", style_number, attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
            }
        }

        Err(CatalogError::LlmApiError {
            style_number: style_number.to_string(),
            message: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

/// Turn the model's reply into a JSON object.
///
/// Markdown fences and any prose around the outermost braces are dropped.
/// A reply that is not an object becomes an empty map, which the table step
/// fills with placeholders. `Style Number` is set when the model left it out.
pub fn parse_description(style_number: &str, content: &str) -> RawDescription {
    let body = strip_fences(content.trim());
    let body = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    };

    let mut map = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(
                "Style {}: expected a JSON object, got {}",
                style_number,
                json_kind(&other)
            );
            RawDescription::new()
        }
        Err(e) => {
            warn!("Style {}: reply is not valid JSON: {}", style_number, e);
            RawDescription::new()
        }
    };

    let missing = match map.get(STYLE_NUMBER_KEY) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    };
    if missing {
        map.insert(
            STYLE_NUMBER_KEY.to_string(),
            Value::String(style_number.to_string()),
        );
    }
    map
}

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON|markdown)?[ \t]*\n(.*)\n```\s*$").unwrap());

fn strip_fences(text: &str) -> &str {
    match FENCE_RE.captures(text).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => text,
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, CatalogError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        CatalogError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. a pre-built provider on the config
/// 2. `provider_name` plus `model` (API key read from the environment)
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. OpenAI, when `OPENAI_API_KEY` is set
/// 5. whatever [`ProviderFactory::from_env`] detects
pub fn resolve_provider(config: &CatalogConfig) -> Result<Arc<dyn LLMProvider>, CatalogError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| CatalogError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure [llm] provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
