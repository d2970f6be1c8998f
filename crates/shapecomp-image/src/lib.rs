#![deny(missing_docs)]
//! Image types for color, depth and mask captures

/// image representation for computer vision purposes.
pub mod image;

/// Color space conversions.
pub mod color;

/// Error types for the image module.
pub mod error;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
