use std::path::{Path, PathBuf};

use shapecomp_3d::io::camera::read_pose_txt;
use shapecomp_image::Image;
use shapecomp_io::{npy::read_npy_depth, png};

use crate::error::DatasetError;

/// Directory of the color frames, relative to the sample root.
pub const COLOR_DIR: &str = "input/color";
/// Directory of the depth maps, relative to the sample root.
pub const DEPTH_DIR: &str = "input/depth";
/// Directory of the masks, relative to the sample root.
pub const MASKS_DIR: &str = "input/masks";
/// Directory of the camera poses, relative to the sample root.
pub const POSES_DIR: &str = "input/poses";

/// One RGB-D capture of a sample.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The color image.
    pub color: Image<u8, 3>,
    /// The raw depth map.
    pub depth: Image<f32, 1>,
    /// The region of interest.
    pub mask: Image<u8, 1>,
    /// The camera-to-world transform in row-major order.
    pub pose: [[f64; 4]; 4],
}

/// The four files of a frame, correlated by their stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePaths {
    /// Path of the color image.
    pub color: PathBuf,
    /// Path of the depth map.
    pub depth: PathBuf,
    /// Path of the mask.
    pub mask: PathBuf,
    /// Path of the pose.
    pub pose: PathBuf,
}

impl FramePaths {
    /// The files of frame `frame_id` under the sample root.
    pub fn new(sample_root: &Path, frame_id: &str) -> Self {
        Self {
            color: sample_root.join(COLOR_DIR).join(format!("{frame_id}.png")),
            depth: sample_root.join(DEPTH_DIR).join(format!("{frame_id}.npy")),
            mask: sample_root.join(MASKS_DIR).join(format!("{frame_id}.png")),
            pose: sample_root.join(POSES_DIR).join(format!("{frame_id}.txt")),
        }
    }

    /// Fail with [`DatasetError::MissingFrameFile`] on the first companion file that
    /// does not exist.
    pub fn check_exists(&self, frame_id: &str) -> Result<(), DatasetError> {
        for path in [&self.mask, &self.color, &self.depth, &self.pose] {
            if !path.is_file() {
                return Err(DatasetError::MissingFrameFile {
                    frame: frame_id.to_string(),
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Frame {
    /// Decode the four files of a frame.
    pub fn load(paths: &FramePaths) -> Result<Self, DatasetError> {
        Ok(Self {
            pose: read_pose_txt(&paths.pose)?,
            color: png::read_image_png_rgb8(&paths.color)?,
            depth: read_npy_depth(&paths.depth)?,
            mask: png::read_image_png_mono8(&paths.mask)?,
        })
    }
}

/// List the frame identifiers of a sample from its mask directory.
///
/// Every `.png` file in the mask directory is a frame named after its stem. Other
/// entries are skipped with a warning. The identifiers are sorted.
pub fn list_frame_ids(sample_root: &Path) -> Result<Vec<String>, DatasetError> {
    let masks_dir = sample_root.join(MASKS_DIR);

    let mut frame_ids = Vec::new();
    for entry in std::fs::read_dir(&masks_dir)? {
        let path = entry?.path();
        let is_png = path.is_file() && path.extension().is_some_and(|ext| ext == "png");
        match path.file_stem().and_then(|stem| stem.to_str()) {
            Some(stem) if is_png => frame_ids.push(stem.to_string()),
            _ => log::warn!("ignoring {} in the mask directory", path.display()),
        }
    }
    frame_ids.sort();

    Ok(frame_ids)
}
