//! Vision-model OCR: transcribe a page image through an edgequake-llm
//! provider.
//!
//! The engine is synchronous from the caller's side. It owns a small tokio
//! runtime and blocks on each provider call. Called from inside another
//! tokio runtime, the blocking call moves to a scoped helper thread, and the
//! owned runtime is shut down in the background on drop.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient. Exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`) with 500 ms base and 3 retries waits
//! 500 ms → 1 s → 2 s before giving up on a page.

use crate::config::VisionSettings;
use crate::error::{GradError, PageError};
use crate::pipeline::encode::encode_page;
use crate::pipeline::ocr::OcrEngine;
use crate::prompts::{page_instruction, TRANSCRIPTION_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// OCR engine backed by a vision language model.
pub struct VisionOcr {
    provider: Arc<dyn LLMProvider>,
    settings: VisionSettings,
    /// Always `Some` until drop.
    runtime: Option<tokio::runtime::Runtime>,
}

impl VisionOcr {
    pub fn new(provider: Arc<dyn LLMProvider>, settings: VisionSettings) -> Result<Self, GradError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| GradError::Internal(format!("Failed to start tokio runtime: {e}")))?;
        Ok(Self {
            provider,
            settings,
            runtime: Some(runtime),
        })
    }

    /// Resolve the provider from `settings` (see [`resolve_provider`]).
    pub fn from_settings(settings: &VisionSettings) -> Result<Self, GradError> {
        let provider = resolve_provider(settings)?;
        Self::new(provider, settings.clone())
    }

    async fn transcribe(&self, page_num: usize, image_data: ImageData) -> Result<String, PageError> {
        let start = Instant::now();
        let system_prompt = self
            .settings
            .system_prompt
            .as_deref()
            .unwrap_or(TRANSCRIPTION_PROMPT);

        let instruction = page_instruction(page_num);
        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user_with_images(instruction.as_str(), vec![image_data]),
        ];
        let options = build_options(&self.settings);

        let mut last_err: Option<String> = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let backoff = backoff_delay(self.settings.retry_backoff_ms, attempt);
                warn!(
                    "Page {}: retry {}/{} after {}ms",
                    page_num, attempt, self.settings.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    debug!(
                        "Page {}: {} input tokens, {} output tokens, {:?}",
                        page_num,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(response.content);
                }
                Err(e) => {
                    let err_msg = format!("{}", e);
                    warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
            }
        }

        Err(PageError::OcrFailed {
            page: page_num,
            retries: self.settings.max_retries.min(u8::MAX as u32) as u8,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

impl OcrEngine for VisionOcr {
    fn name(&self) -> &str {
        "vision"
    }

    fn recognise(&self, page_num: usize, image: &DynamicImage) -> Result<String, PageError> {
        let image_data = encode_page(image).map_err(|e| PageError::OcrFailed {
            page: page_num,
            retries: 0,
            detail: format!("PNG encoding failed: {e}"),
        })?;
        let Some(runtime) = self.runtime.as_ref() else {
            return Err(PageError::OcrFailed {
                page: page_num,
                retries: 0,
                detail: "vision runtime already shut down".into(),
            });
        };

        if tokio::runtime::Handle::try_current().is_err() {
            return runtime.block_on(self.transcribe(page_num, image_data));
        }
        debug!("Page {}: inside a tokio runtime, blocking on a helper thread", page_num);
        std::thread::scope(|scope| {
            scope
                .spawn(|| runtime.block_on(self.transcribe(page_num, image_data)))
                .join()
                .unwrap_or_else(|_| {
                    Err(PageError::OcrFailed {
                        page: page_num,
                        retries: 0,
                        detail: "vision OCR thread panicked".into(),
                    })
                })
        })
    }
}

impl Drop for VisionOcr {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. a pre-built provider in `settings.provider`
/// 2. `settings.provider_name` plus `settings.model`
/// 3. `EDGEQUAKE_LLM_PROVIDER` plus `EDGEQUAKE_MODEL`, when both are set
/// 4. `OPENAI_API_KEY`, then full auto-detection via [`ProviderFactory::from_env`]
pub fn resolve_provider(settings: &VisionSettings) -> Result<Arc<dyn LLMProvider>, GradError> {
    if let Some(ref provider) = settings.provider {
        return Ok(Arc::clone(provider));
    }

    let model = settings.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = settings.provider_name {
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

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_vision_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| GradError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or use --ocr tesseract.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, GradError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        GradError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn build_options(settings: &VisionSettings) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(settings.temperature),
        max_tokens: Some(settings.max_tokens),
        ..Default::default()
    }
}

fn backoff_delay(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}
