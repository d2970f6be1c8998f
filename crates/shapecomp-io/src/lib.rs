#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for I/O operations.
///
/// Defines [`error::IoError`] variants for file access and encoding/decoding failures.
pub mod error;

/// PNG image encoding and decoding.
///
/// Color captures are always normalized to 8-bit RGB and masks to 8-bit grayscale,
/// whatever color type the file stores.
pub mod png;

/// NumPy `.npy` array reading and writing.
///
/// Depth maps are stored as 2D float arrays and loaded as single channel `f32` images.
pub mod npy;

pub use crate::error::IoError;
