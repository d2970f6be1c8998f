use std::path::{Path, PathBuf};

use serde::Deserialize;
use shapecomp_3d::rgbd::RgbdParams;

use crate::error::DatasetError;

fn default_num_points() -> usize {
    3500
}

fn default_split() -> String {
    "train".to_string()
}

fn default_true() -> bool {
    true
}

fn default_depth_scale() -> f64 {
    1.0
}

fn default_depth_trunc() -> f64 {
    1.0
}

/// Parameters of a [`crate::ShapeCompletionDataset`].
///
/// Every field except `data_source` has a default, so a JSON configuration may
/// be as small as `{"data_source": "/data/fruits"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetConfig {
    /// Root directory of the dataset, holding one directory per split.
    pub data_source: PathBuf,
    /// Maximum number of points in every returned point tensor.
    #[serde(default = "default_num_points")]
    pub num_points: usize,
    /// Name of the split directory, e.g. `train` or `val`.
    #[serde(default = "default_split")]
    pub split: String,
    /// Fuse the RGB-D frames into a sampled point tensor.
    #[serde(default = "default_true")]
    pub return_pcd: bool,
    /// Return the intrinsics and the raw frames.
    #[serde(default = "default_true")]
    pub return_rgbd: bool,
    /// Optional fixed seed for reproducible sampling.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Raw depth values are divided by this factor.
    #[serde(default = "default_depth_scale")]
    pub depth_scale: f64,
    /// Scaled depth beyond this distance is discarded.
    #[serde(default = "default_depth_trunc")]
    pub depth_trunc: f64,
}

impl DatasetConfig {
    /// Create a configuration with default parameters for the given dataset root.
    pub fn new(data_source: impl Into<PathBuf>) -> Self {
        Self {
            data_source: data_source.into(),
            num_points: default_num_points(),
            split: default_split(),
            return_pcd: true,
            return_rgbd: true,
            seed: None,
            depth_scale: default_depth_scale(),
            depth_trunc: default_depth_trunc(),
        }
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path)?;
        let config = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(config)
    }

    /// Check that the parameters can produce an output.
    pub fn validate(&self) -> Result<(), DatasetError> {
        if !self.return_pcd && !self.return_rgbd {
            return Err(DatasetError::InvalidConfig(
                "return_pcd and return_rgbd are both false, set at least one to true".to_string(),
            ));
        }
        if self.num_points == 0 {
            return Err(DatasetError::InvalidConfig(
                "num_points must be positive".to_string(),
            ));
        }
        if self.depth_scale.is_nan() || self.depth_scale <= 0.0 {
            return Err(DatasetError::InvalidConfig(format!(
                "depth_scale must be positive, got {}",
                self.depth_scale
            )));
        }
        if self.depth_trunc.is_nan() || self.depth_trunc <= 0.0 {
            return Err(DatasetError::InvalidConfig(format!(
                "depth_trunc must be positive, got {}",
                self.depth_trunc
            )));
        }
        Ok(())
    }

    /// The depth conversion parameters handed to the back-projection.
    pub fn rgbd_params(&self) -> RgbdParams {
        RgbdParams {
            depth_scale: self.depth_scale,
            depth_trunc: self.depth_trunc,
        }
    }

    /// The directory holding the samples of the configured split.
    pub fn split_dir(&self) -> PathBuf {
        self.data_source.join(&self.split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DatasetConfig::new("/data");
        assert_eq!(config.num_points, 3500);
        assert_eq!(config.split, "train");
        assert!(config.return_pcd);
        assert!(config.return_rgbd);
        assert_eq!(config.seed, None);
        assert_eq!(config.rgbd_params(), RgbdParams::default());
        assert_eq!(config.split_dir(), PathBuf::from("/data/train"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let mut config = DatasetConfig::new("/data");
        config.return_pcd = false;
        assert!(config.validate().is_ok());
        config.return_rgbd = false;
        assert!(matches!(
            config.validate(),
            Err(DatasetError::InvalidConfig(_))
        ));

        let mut config = DatasetConfig::new("/data");
        config.num_points = 0;
        assert!(matches!(
            config.validate(),
            Err(DatasetError::InvalidConfig(_))
        ));

        let mut config = DatasetConfig::new("/data");
        config.depth_scale = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = DatasetConfig::new("/data");
        config.depth_trunc = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"data_source": "/data/fruits", "split": "val", "seed": 7, "return_pcd": false}}"#
        )?;

        let config = DatasetConfig::from_json_file(file.path())?;
        assert_eq!(config.data_source, PathBuf::from("/data/fruits"));
        assert_eq!(config.split, "val");
        assert_eq!(config.seed, Some(7));
        assert!(!config.return_pcd);
        assert!(config.return_rgbd);
        assert_eq!(config.num_points, 3500);
        assert_eq!(config.depth_trunc, 1.0);
        Ok(())
    }

    #[test]
    fn test_from_json_file_missing_source() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{"split": "val"}}"#)?;
        assert!(matches!(
            DatasetConfig::from_json_file(file.path()),
            Err(DatasetError::Json(_))
        ));
        Ok(())
    }
}
