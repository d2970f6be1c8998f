/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(std::path::PathBuf),

    /// Invalid file extension.
    #[error("File is does not have a valid extension: {0}")]
    InvalidFileExtension(std::path::PathBuf),

    /// Error to open the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error to create the image.
    #[error("Failed to create image. {0}")]
    ImageCreationError(#[from] shapecomp_image::ImageError),

    /// Error to encode the PNG image.
    #[error("Failed to encode the png image. {0}")]
    PngEncodingError(String),

    /// Error to decode the PNG image.
    #[error("Failed to decode the png image. {0}")]
    PngDecodeError(String),

    /// Malformed NPY magic string or header dictionary.
    #[error("Malformed npy header. {0}")]
    NpyHeaderError(String),

    /// The NPY dtype descriptor is not supported.
    #[error("Unsupported npy dtype: {0}")]
    NpyUnsupportedDtype(String),

    /// The NPY array shape cannot be interpreted as a single channel image.
    #[error("Unsupported npy shape for a depth map: {0:?}")]
    NpyInvalidShape(Vec<usize>),
}
