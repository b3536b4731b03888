//! Default values for image preparation and the analysis request.

// Claude API
pub const CLAUDE_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const CLAUDE_MAX_TOKENS: u32 = 1024;

// Image processing
pub const MAX_IMAGE_DIMENSION: u32 = 1568;
pub const IMAGE_COMPRESSION_QUALITY: f32 = 0.8;
pub const IMAGE_FORMAT: &str = "jpeg";

pub const DEFAULT_ANALYSIS_PROMPT: &str =
    "Analyze this image and describe what you see in detail.";

/// Subdirectory of the system temp dir that receives derived images.
pub const OUTPUT_DIR_NAME: &str = "color-image-prep";
