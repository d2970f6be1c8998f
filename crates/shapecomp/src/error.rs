use std::path::PathBuf;

use shapecomp_3d::{io::camera::CameraIoError, io::ply::PlyError, rgbd::RgbdError};
use shapecomp_io::IoError;
use shapecomp_tensor::TensorError;

/// An error type for the dataset loader.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// The configuration cannot produce any output or has invalid values.
    #[error("Invalid dataset configuration: {0}")]
    InvalidConfig(String),

    /// A directory or file of the dataset could not be accessed.
    #[error("Failed to access the dataset. {0}")]
    Io(#[from] std::io::Error),

    /// The positional index is past the end of the sample list.
    #[error("Sample index {index} is out of range for {len} samples")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of samples.
        len: usize,
    },

    /// No sample with this identifier exists in the split.
    #[error("Unknown sample: {0}")]
    UnknownSample(String),

    /// A frame listed in the mask directory lacks one of its companion files.
    #[error("Frame {frame} is missing {path}")]
    MissingFrameFile {
        /// The frame identifier.
        frame: String,
        /// The expected path of the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be decoded.
    #[error("Invalid configuration file. {0}")]
    Json(#[from] serde_json::Error),

    /// Error decoding a color, mask or depth image.
    #[error(transparent)]
    Image(#[from] IoError),

    /// Error reading a point cloud.
    #[error(transparent)]
    Ply(#[from] PlyError),

    /// Error reading the intrinsics or a pose.
    #[error(transparent)]
    Camera(#[from] CameraIoError),

    /// Error fusing an RGB-D frame.
    #[error(transparent)]
    Rgbd(#[from] RgbdError),

    /// Error building an output tensor.
    #[error(transparent)]
    Tensor(#[from] TensorError),
}
