mod parser;
mod properties;
mod writer;

pub use parser::*;
pub use properties::*;
pub use writer::*;

/// Error types for the PLY module.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    /// Failed to read PLY file
    #[error("Failed to read PLY file")]
    Io(#[from] std::io::Error),

    /// Failed to deserialize PLY file
    #[error("Failed to deserialize PLY file")]
    Deserialize(#[from] bincode::error::DecodeError),

    /// The storage format is not supported
    #[error("Unsupported PLY format: {0}")]
    UnsupportedFormat(String),

    /// Unsupported PLY property
    #[error("Unsupported PLY property: {0}")]
    UnsupportedProperty(String),

    /// The header is malformed
    #[error("Invalid PLY header: {0}")]
    InvalidHeader(String),

    /// A required vertex property is missing
    #[error("Missing PLY vertex property: {0}")]
    MissingProperty(&'static str),

    /// A value in the body could not be parsed
    #[error("Parse error {0}")]
    ParseError(String),
}
