#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pinhole camera model.
pub mod camera;

/// I/O utilities for reading and writing 3D data.
pub mod io;

/// Linear algebra utilities.
pub mod linalg;

/// Point cloud container.
pub mod pointcloud;

/// RGB-D images and back-projection into point clouds.
pub mod rgbd;

/// Random point subsampling into fixed size tensors.
pub mod sampling;
