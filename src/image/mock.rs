use super::ImageService;
use crate::models::OutputFormat;
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Canned image service that never touches the filesystem.
pub struct MockImageProcessor {
    optimize_count: Arc<Mutex<usize>>,
    encode_count: Arc<Mutex<usize>>,
    base_path: PathBuf,
    encoded_text: String,
    format: OutputFormat,
    should_fail: Arc<Mutex<bool>>,
}

impl MockImageProcessor {
    pub fn new() -> Self {
        Self {
            optimize_count: Arc::new(Mutex::new(0)),
            encode_count: Arc::new(Mutex::new(0)),
            base_path: PathBuf::from("/tmp"),
            // "mock image data"
            encoded_text: "bW9jayBpbWFnZSBkYXRh".to_string(),
            format: OutputFormat::Jpeg,
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_base_path(mut self, path: PathBuf) -> Self {
        self.base_path = path;
        self
    }

    pub fn with_encoded_text(mut self, text: String) -> Self {
        self.encoded_text = text;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_optimize_count(&self) -> usize {
        *self.optimize_count.lock().unwrap()
    }

    pub fn get_encode_count(&self) -> usize {
        *self.encode_count.lock().unwrap()
    }

    fn failing(&self) -> bool {
        *self.should_fail.lock().unwrap()
    }
}

impl Default for MockImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageService for MockImageProcessor {
    async fn optimize(&self, image_path: &Path) -> Result<PathBuf> {
        if self.failing() {
            return Err(crate::Error::Image(image::ImageError::IoError(
                std::io::Error::other("Mock failure"),
            )));
        }

        *self.optimize_count.lock().unwrap() += 1;

        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        Ok(self.base_path.join(format!(
            "{}_{}.{}",
            stem,
            Uuid::new_v4(),
            self.format.extension()
        )))
    }

    async fn encode_to_text(&self, _image_path: &Path) -> Result<String> {
        if self.failing() {
            return Err(crate::Error::Io(std::io::Error::other("Mock failure")));
        }

        *self.encode_count.lock().unwrap() += 1;
        Ok(self.encoded_text.clone())
    }

    fn output_format(&self) -> OutputFormat {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_image_processor() {
        let processor = MockImageProcessor::new();

        let derived = processor
            .optimize(Path::new("/photos/beach.png"))
            .await
            .unwrap();

        assert!(derived.starts_with("/tmp"));
        assert!(derived.to_string_lossy().contains("beach_"));
        assert!(derived.to_string_lossy().ends_with(".jpg"));
        assert_eq!(processor.get_optimize_count(), 1);
        assert_eq!(processor.get_encode_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_with_custom_path_and_format() {
        let processor = MockImageProcessor::new()
            .with_base_path(PathBuf::from("/custom/path"))
            .with_format(OutputFormat::Png);

        let derived = processor.optimize(Path::new("a.jpg")).await.unwrap();

        assert!(derived.starts_with("/custom/path"));
        assert!(derived.to_string_lossy().ends_with(".png"));
        assert_eq!(processor.output_format(), OutputFormat::Png);
    }

    #[tokio::test]
    async fn test_mock_encoded_text() {
        let processor = MockImageProcessor::new().with_encoded_text("iVBORw==".to_string());

        let text = processor.encode_to_text(Path::new("x.jpg")).await.unwrap();
        assert_eq!(text, "iVBORw==");
        assert_eq!(processor.get_encode_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_with_failure() {
        let processor = MockImageProcessor::new().with_failure(true);

        assert!(processor.optimize(Path::new("a.png")).await.is_err());
        assert!(processor.encode_to_text(Path::new("a.png")).await.is_err());
        assert_eq!(processor.get_optimize_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_unique_paths() {
        let processor = MockImageProcessor::new();

        let first = processor.optimize(Path::new("a.png")).await.unwrap();
        let second = processor.optimize(Path::new("a.png")).await.unwrap();

        assert_ne!(first, second);
    }
}
