//! Image preparation for the Color photo-analysis app
//!
//! Resizes and recompresses captured photos, then encodes them as base64 text
//! ready to be embedded in a vision-analysis API request.

pub mod analysis;
pub mod constants;
pub mod error;
pub mod image;
pub mod models;

pub use error::{Error, Result};
