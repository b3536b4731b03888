//! Request payloads for the vision-analysis API.
//!
//! Only the request body is built here; sending it is up to the caller.

use crate::image::ImageService;
use crate::models::{AnalysisConfig, Config};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level messages request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

/// One content block of a user message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

impl AnalysisRequest {
    /// Single-turn request carrying one base64 image followed by the prompt.
    ///
    /// Falls back to the configured default prompt when `prompt` is `None`.
    pub fn new(
        config: &AnalysisConfig,
        media_type: &str,
        base64_data: String,
        prompt: Option<&str>,
    ) -> Self {
        let prompt = prompt.unwrap_or(config.default_prompt.as_str()).to_string();

        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64".to_string(),
                            media_type: media_type.to_string(),
                            data: base64_data,
                        },
                    },
                    ContentBlock::Text { text: prompt },
                ],
            }],
        }
    }

    /// The prompt text of the first message, if any.
    pub fn prompt(&self) -> Option<&str> {
        self.messages
            .first()
            .and_then(|m| {
                m.content.iter().find_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
            })
    }
}

/// A request ready to send, along with the derived image it embeds.
#[derive(Debug, Clone)]
pub struct PreparedAnalysis {
    pub optimized_path: PathBuf,
    pub request: AnalysisRequest,
}

/// Optimize `image_path`, encode the derived image and wrap it in a request.
pub async fn prepare_analysis_request(
    images: &dyn ImageService,
    config: &Config,
    image_path: &Path,
    prompt: Option<&str>,
) -> Result<PreparedAnalysis> {
    let optimized_path = images.optimize(image_path).await?;
    let data = images.encode_to_text(&optimized_path).await?;
    tracing::debug!(
        "Prepared analysis payload from {} ({} base64 chars)",
        optimized_path.display(),
        data.len()
    );

    let request = AnalysisRequest::new(
        &config.analysis,
        images.output_format().media_type(),
        data,
        prompt,
    );

    Ok(PreparedAnalysis {
        optimized_path,
        request,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::MockImageProcessor;
    use crate::models::OutputFormat;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_json_shape() {
        let request = AnalysisRequest::new(
            &AnalysisConfig::default(),
            "image/jpeg",
            "iVBORw==".to_string(),
            None,
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "claude-sonnet-4-5-20250929",
                "max_tokens": 1024,
                "messages": [{
                    "role": "user",
                    "content": [
                        {
                            "type": "image",
                            "source": {
                                "type": "base64",
                                "media_type": "image/jpeg",
                                "data": "iVBORw=="
                            }
                        },
                        {
                            "type": "text",
                            "text": "Analyze this image and describe what you see in detail."
                        }
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_custom_prompt_overrides_default() {
        let request = AnalysisRequest::new(
            &AnalysisConfig::default(),
            "image/png",
            String::new(),
            Some("Count the apples."),
        );

        assert_eq!(request.prompt(), Some("Count the apples."));
    }

    #[test]
    fn test_request_deserializes() {
        let json = r#"{
            "model": "m",
            "max_tokens": 5,
            "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}]
        }"#;

        let request: AnalysisRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.max_tokens, 5);
        assert_eq!(request.prompt(), Some("hi"));
    }

    #[tokio::test]
    async fn test_prepare_uses_service_output() {
        let images = MockImageProcessor::new()
            .with_encoded_text("AAEC".to_string())
            .with_format(OutputFormat::Png);
        let config = Config::default();

        let prepared = prepare_analysis_request(&images, &config, Path::new("cat.heic"), None)
            .await
            .unwrap();

        assert!(prepared.optimized_path.to_string_lossy().ends_with(".png"));
        assert_eq!(images.get_optimize_count(), 1);
        assert_eq!(images.get_encode_count(), 1);

        match &prepared.request.messages[0].content[0] {
            ContentBlock::Image { source } => {
                assert_eq!(source.media_type, "image/png");
                assert_eq!(source.data, "AAEC");
            }
            other => panic!("expected image block, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prepare_propagates_failure() {
        let images = MockImageProcessor::new().with_failure(true);

        let result =
            prepare_analysis_request(&images, &Config::default(), Path::new("a.png"), None).await;

        assert!(result.is_err());
        assert_eq!(images.get_encode_count(), 0);
    }
}
