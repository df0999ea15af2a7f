//! VLM interaction: build vision messages and call the provider.
//!
//! This module converts a rasterised page image into a single VLM API call
//! and returns the raw Markdown. All prompt text lives in [`crate::prompts`].
//!
//! There is no retry loop here: a failed call fails the page, and the parser
//! turns that into a failure of the whole document.

use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::prompts::system_prompt;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Convert a single rasterised page into Markdown via the VLM.
///
/// ## Message Layout
///
/// 1. **System message**: the conversion prompt (standard, detailed or
///    user-supplied override)
/// 2. **User message**: the page PNG as an image attachment with empty text
///
/// The empty user text is intentional: VLM APIs require at least one user
/// turn to respond to, but the image carries all the actual content.
pub async fn process_page(
    provider: &Arc<dyn LLMProvider>,
    page_num: usize,
    image_data: ImageData,
    config: &ParserConfig,
) -> Result<String, ParseError> {
    let start = Instant::now();

    let messages = vec![
        ChatMessage::system(system_prompt(config)),
        ChatMessage::user_with_images("", vec![image_data]),
    ];
    let options = build_options(config);

    match provider.chat(&messages, Some(&options)).await {
        Ok(response) => {
            debug!(
                "Page {}: {} input tokens, {} output tokens, {:?}",
                page_num,
                response.prompt_tokens,
                response.completion_tokens,
                start.elapsed()
            );
            Ok(response.content)
        }
        Err(e) => {
            warn!("Page {}: VLM call failed: {}", page_num, e);
            Err(ParseError::LlmApiError {
                page: page_num,
                message: e.to_string(),
            })
        }
    }
}

/// Build `CompletionOptions` from the parser config.
pub(crate) fn build_options(config: &ParserConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        top_p: Some(config.top_p),
        max_tokens: Some(config.max_output_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgequake_llm::MockProvider;

    #[test]
    fn build_options_defaults() {
        let config = ParserConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.9));
        assert_eq!(opts.top_p, Some(0.4));
        assert_eq!(opts.max_tokens, Some(8192));
    }

    #[test]
    fn build_options_follow_config() {
        let config = ParserConfig::builder()
            .temperature(0.0)
            .top_p(1.0)
            .max_output_tokens(512)
            .build()
            .unwrap();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.top_p, Some(1.0));
        assert_eq!(opts.max_tokens, Some(512));
    }

    #[tokio::test]
    async fn returns_provider_content() {
        let mock = MockProvider::new();
        mock.add_response("# Title\n\nBody").await;
        let provider: Arc<dyn LLMProvider> = Arc::new(mock);

        let image = ImageData::new("aGVsbG8=", "image/png");
        let md = process_page(&provider, 1, image, &ParserConfig::default())
            .await
            .unwrap();
        assert_eq!(md, "# Title\n\nBody");
    }
}
