/// Camera intrinsics and pose readers.
pub mod camera;

/// PLY reader and writer module.
pub mod ply;
