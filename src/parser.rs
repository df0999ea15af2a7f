//! The extraction delegate: PDF in, one markdown string per page out.
//!
//! The HTTP layer only knows the [`DocumentParser`] trait. Production uses
//! [`VisionParser`], which renders pages with pdfium and transcribes each one
//! with a vision LLM; tests inject stubs.
//!
//! ## Data Flow
//!
//! ```text
//! PDF ──▶ render ──▶ encode ──▶ llm ──▶ postprocess ──▶ Vec<String>
//!        (pdfium)   (PNG)     (VLM)    (cleanup)
//! ```

use crate::config::ParserConfig;
use crate::error::{ApiError, ParseError};
use crate::pipeline::{encode, llm, postprocess, render};
use async_trait::async_trait;
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt, TryStreamExt};
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Something that turns a PDF into per-page markdown.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// Parse every page of the PDF at `pdf`, in page order.
    async fn parse(&self, pdf: &Path) -> Result<Vec<String>, ParseError>;
}

/// Run the parser once. Failures keep the parser's own message.
pub async fn extract(parser: &dyn DocumentParser, pdf: &Path) -> Result<Vec<String>, ApiError> {
    let start = Instant::now();
    let pages = parser.parse(pdf).await?;
    info!(
        "Extracted {} pages from {} in {:?}",
        pages.len(),
        pdf.display(),
        start.elapsed()
    );
    Ok(pages)
}

/// Vision-LLM backed parser.
#[derive(Debug, Clone)]
pub struct VisionParser {
    config: ParserConfig,
}

impl VisionParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Resolve the LLM provider for one parse.
    ///
    /// An injected provider wins. Otherwise the named provider is built now,
    /// which is when it reads its API key from the environment; a missing key
    /// surfaces here as [`ParseError::ProviderNotConfigured`].
    fn resolve_provider(&self) -> Result<Arc<dyn LLMProvider>, ParseError> {
        if let Some(ref provider) = self.config.provider {
            return Ok(Arc::clone(provider));
        }
        ProviderFactory::create_llm_provider(&self.config.provider_name, &self.config.model)
            .map_err(|e| ParseError::ProviderNotConfigured {
                provider: self.config.provider_name.clone(),
                detail: e.to_string(),
            })
    }

    /// Transcribe already rendered pages.
    ///
    /// Up to `concurrency` requests are in flight; results keep page order.
    /// The first failing page aborts the rest.
    pub async fn transcribe_pages(
        &self,
        provider: &Arc<dyn LLMProvider>,
        images: Vec<DynamicImage>,
    ) -> Result<Vec<String>, ParseError> {
        let encoded = images
            .iter()
            .enumerate()
            .map(|(idx, img)| {
                encode::encode_page(img, self.config.image_mode).map_err(|e| {
                    ParseError::EncodingFailed {
                        page: idx + 1,
                        detail: e.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        drop(images);

        let config = &self.config;
        let raw: Vec<String> = stream::iter(encoded.into_iter().enumerate().map(
            |(idx, data)| {
                let provider = Arc::clone(provider);
                async move { llm::process_page(&provider, idx + 1, data, config).await }
            },
        ))
        .buffered(config.concurrency)
        .try_collect()
        .await?;

        Ok(raw
            .iter()
            .map(|page| postprocess::clean_markdown(page))
            .collect())
    }
}

#[async_trait]
impl DocumentParser for VisionParser {
    async fn parse(&self, pdf: &Path) -> Result<Vec<String>, ParseError> {
        let provider = self.resolve_provider()?;
        debug!(
            "Parsing {} with {}/{}",
            pdf.display(),
            provider.name(),
            provider.model()
        );

        let render_start = Instant::now();
        let images = render::render_pages(pdf, self.config.max_rendered_pixels).await?;
        info!(
            "Rendered {} pages in {}ms",
            images.len(),
            render_start.elapsed().as_millis()
        );

        self.transcribe_pages(&provider, images).await
    }
}
