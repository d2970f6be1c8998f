#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! The loader reads one sample directory per call: the ground-truth PLY, the shared
//! camera intrinsics and every masked RGB-D frame. The frames are back-projected,
//! moved to world coordinates with their pose and fused into one point cloud. Both
//! clouds are randomly subsampled to at most `num_points` points.

/// Dataset configuration.
pub mod config;

/// The dataset and the items it returns.
pub mod dataset;

/// Error types for the dataset loader.
pub mod error;

/// Per-frame file layout and decoding.
pub mod frame;

/// Sample directory listing.
pub mod index;

pub use crate::config::DatasetConfig;
pub use crate::dataset::{RgbdData, SampleItem, ShapeCompletionDataset};
pub use crate::error::DatasetError;
pub use crate::frame::Frame;
pub use crate::index::SampleIndex;

pub use shapecomp_3d::io::camera::{load_intrinsics, read_pose_txt};
pub use shapecomp_3d::rgbd::rgbd_to_pointcloud;
pub use shapecomp_3d::sampling::sample_points;

#[doc(inline)]
pub use shapecomp_3d as k3d;

#[doc(inline)]
pub use shapecomp_image as image;

#[doc(inline)]
pub use shapecomp_io as io;

#[doc(inline)]
pub use shapecomp_tensor as tensor;
