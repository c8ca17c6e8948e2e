//! Vision-LLM document converter: page images in, markdown out.
//!
//! [`VlmConverter`] is the crate's [`DocumentConverter`]. It rasterises a PDF
//! (or decodes an image), downsizes each page, sends it to a vision model as
//! a PNG attachment and stitches the per-page markdown back together. Its
//! output is compared against OCR text after canonicalisation, which is why
//! it has no confidence of its own.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient under load. Each page
//! is retried with exponential backoff (`retry_backoff_ms * 2^attempt`).
//! A page that still fails aborts the whole document: the converter has no
//! partial-result mode, same as the OCR path.

use crate::capabilities::{DocumentConverter, PdfRasterizer};
use crate::document::{DocumentKind, RawDocument};
use crate::error::ExtractError;
use crate::output::{ConvertedDocument, PageRaster};
use crate::pipeline::encode::encode_page;
use crate::pipeline::preprocess::{decode_image, downscale};
use crate::pipeline::render::rasterize_pdf;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Settings for [`VlmConverter`].
#[derive(Clone)]
pub struct VlmSettings {
    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None, the provider is picked from the environment.
    pub provider_name: Option<String>,

    /// Model identifier. Default when a provider is named: "gpt-4.1-nano".
    pub model: Option<String>,

    /// Sampling temperature. Default: 0.1 (transcription, not creativity).
    pub temperature: f32,

    /// Maximum tokens generated per page. Default: 4096.
    pub max_tokens: usize,

    /// Retry attempts per page after the first failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom system prompt. If None, uses [`DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Concurrent page requests. Default: 4.
    pub concurrency: usize,

    /// Leading PDF pages converted. Default: 10.
    pub max_pages: usize,

    /// Longest page edge sent to the model. Default: 2000.
    pub max_image_dimension: u32,
}

impl Default for VlmSettings {
    fn default() -> Self {
        Self {
            provider_name: None,
            model: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            system_prompt: None,
            concurrency: 4,
            max_pages: 10,
            max_image_dimension: 2000,
        }
    }
}

impl fmt::Debug for VlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VlmSettings")
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("concurrency", &self.concurrency)
            .field("max_pages", &self.max_pages)
            .field("custom_prompt", &self.system_prompt.is_some())
            .finish()
    }
}

impl VlmSettings {
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.retry_backoff_ms = ms;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.max_pages = n.max(1);
        self
    }

    pub fn max_image_dimension(mut self, px: u32) -> Self {
        self.max_image_dimension = px.max(1);
        self
    }

    fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

/// [`DocumentConverter`] backed by a vision LLM.
pub struct VlmConverter {
    provider: Arc<dyn LLMProvider>,
    rasterizer: Option<Arc<dyn PdfRasterizer>>,
    settings: VlmSettings,
}

impl VlmConverter {
    /// Wrap an already-constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, settings: VlmSettings) -> Self {
        Self {
            provider,
            rasterizer: None,
            settings,
        }
    }

    /// Resolve the provider from `settings` or the environment.
    ///
    /// Order: named provider + model, then `EDGEQUAKE_LLM_PROVIDER` +
    /// `EDGEQUAKE_MODEL`, then whatever API key the factory finds first.
    pub fn from_settings(settings: VlmSettings) -> Result<Self, ExtractError> {
        let provider = resolve_provider(&settings)?;
        info!("Vision-LLM converter ready ({:?})", settings);
        Ok(Self::new(provider, settings))
    }

    /// PDFs can only be converted once a rasterizer is attached.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PdfRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn settings(&self) -> &VlmSettings {
        &self.settings
    }

    async fn convert_document(
        &self,
        document: &RawDocument,
    ) -> Result<ConvertedDocument, ExtractError> {
        let start = Instant::now();
        let (pages, page_count) = match document.kind() {
            DocumentKind::Pdf => {
                let rasterizer =
                    self.rasterizer
                        .clone()
                        .ok_or(ExtractError::CapabilityUnavailable {
                            capability: "PDF rasterizer",
                        })?;
                let doc =
                    rasterize_pdf(rasterizer, document.bytes().to_vec(), self.settings.max_pages)
                        .await?;
                (doc.pages, doc.total_pages)
            }
            DocumentKind::Image => {
                let image = decode_image(document.bytes().to_vec()).await?;
                (vec![PageRaster { page: 1, image }], 1)
            }
        };

        let max_dim = self.settings.max_image_dimension;
        let markdown_pages: Vec<String> = stream::iter(pages)
            .map(|page| async move {
                let page_num = page.page;
                let image_data = tokio::task::spawn_blocking(move || {
                    encode_page(&downscale(page.image, max_dim))
                })
                .await
                .map_err(|e| ExtractError::Internal(format!("Encode task panicked: {}", e)))??;
                self.transcribe_page(page_num, image_data).await
            })
            .buffered(self.settings.concurrency)
            .try_collect()
            .await?;

        info!(
            "Converted {} page(s) in {}ms",
            markdown_pages.len(),
            start.elapsed().as_millis()
        );

        Ok(ConvertedDocument {
            markdown: markdown_pages.join("\n\n"),
            page_count: Some(page_count),
        })
    }

    /// Send one page image to the model, retrying transient failures.
    async fn transcribe_page(
        &self,
        page_num: usize,
        image_data: ImageData,
    ) -> Result<String, ExtractError> {
        let start = Instant::now();
        let system_prompt = self
            .settings
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);

        // The image carries the content; the user turn only needs to exist.
        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user_with_images("", vec![image_data]),
        ];
        let options = self.settings.completion_options();

        let mut last_err = String::from("Unknown error");

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let backoff = self.settings.retry_backoff_ms * 2u64.pow(attempt - 1);
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
                    return Ok(tidy_markdown(&response.content));
                }
                Err(e) => {
                    last_err = e.to_string();
                    warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, last_err);
                }
            }
        }

        Err(ExtractError::Conversion {
            detail: format!(
                "page {} failed after {} retries: {}",
                page_num, self.settings.max_retries, last_err
            ),
        })
    }
}

impl DocumentConverter for VlmConverter {
    fn engine(&self) -> &str {
        "vlm"
    }

    fn convert<'a>(
        &'a self,
        document: &'a RawDocument,
    ) -> BoxFuture<'a, Result<ConvertedDocument, ExtractError>> {
        Box::pin(self.convert_document(document))
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::Conversion {
            detail: format!("LLM provider '{provider_name}' is not configured: {e}"),
        }
    })
}

fn resolve_provider(settings: &VlmSettings) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref name) = settings.provider_name {
        let model = settings.model.as_deref().unwrap_or("gpt-4.1-nano");
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::Conversion {
            detail: format!(
                "No LLM provider could be auto-detected from environment. \
                 Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or name a provider. Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

// ── Output tidying ───────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\n(.*)\n```\s*$").unwrap());

/// Undo the two quirks models show despite the prompt: an outer
/// ```` ```markdown ```` fence and CRLF line endings.
fn tidy_markdown(raw: &str) -> String {
    let normalised = raw.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = normalised.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_options_defaults() {
        let opts = VlmSettings::default().completion_options();
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn settings_setters_clamp() {
        let s = VlmSettings::default()
            .temperature(9.0)
            .concurrency(0)
            .max_pages(0)
            .model("gpt-4.1-mini");
        assert_eq!(s.temperature, 2.0);
        assert_eq!(s.concurrency, 1);
        assert_eq!(s.max_pages, 1);
        assert_eq!(s.model.as_deref(), Some("gpt-4.1-mini"));
    }

    #[test]
    fn tidy_strips_outer_fence() {
        assert_eq!(tidy_markdown("```markdown\n# Hi\nthere\n```"), "# Hi\nthere");
        assert_eq!(tidy_markdown("```\nbody\n```\n"), "body");
    }

    #[test]
    fn tidy_keeps_inner_code_blocks() {
        let md = "Intro\n\n```rust\nfn main() {}\n```\n\nOutro";
        assert_eq!(tidy_markdown(md), md);
    }

    #[test]
    fn tidy_normalises_line_endings() {
        assert_eq!(tidy_markdown("a\r\nb\rc\r\n"), "a\nb\nc");
    }
}
