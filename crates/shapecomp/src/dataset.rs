use std::{collections::BTreeMap, path::Path};

use rand::{rngs::StdRng, Rng, SeedableRng};
use shapecomp_3d::{
    io::{camera::load_intrinsics, ply::read_ply},
    pointcloud::PointCloud,
    rgbd::rgbd_to_pointcloud,
    sampling::pointcloud_to_tensor,
};
use shapecomp_tensor::Tensor2;

use crate::{
    config::DatasetConfig,
    error::DatasetError,
    frame::{list_frame_ids, Frame, FramePaths},
    index::SampleIndex,
};

/// Ground-truth point cloud, relative to the sample root.
pub const GROUNDTRUTH_PLY: &str = "gt/pcd/fruit.ply";
/// Camera intrinsics shared by all frames, relative to the sample root.
pub const INTRINSICS_JSON: &str = "input/intrinsic.json";

/// Everything returned for one sample.
#[derive(Debug, Clone)]
pub struct SampleItem {
    /// The sampled ground-truth points, shape `(k, 3)`.
    pub groundtruth_points: Tensor2<f32>,
    /// The sampled fused RGB-D points, present when `return_pcd` is set.
    pub rgbd_points: Option<Tensor2<f32>>,
    /// The row-major camera matrix, present when `return_rgbd` is set.
    pub intrinsics: Option<[[f64; 3]; 3]>,
    /// The raw frames keyed by frame id, present when `return_rgbd` is set.
    pub frames: Option<BTreeMap<String, Frame>>,
}

/// The RGB-D inputs of one sample.
#[derive(Debug, Clone)]
pub struct RgbdData {
    /// The row-major camera matrix.
    pub intrinsics: [[f64; 3]; 3],
    /// The sampled fused points, computed when `return_pcd` is set.
    pub points: Option<Tensor2<f32>>,
    /// The raw frames keyed by frame id, kept when `return_rgbd` is set.
    pub frames: BTreeMap<String, Frame>,
}

/// A shape-completion dataset split.
///
/// Each sample directory holds a ground-truth point cloud and a set of RGB-D frames:
///
/// ```text
/// <data_source>/<split>/<sample>/
///     gt/pcd/fruit.ply
///     input/intrinsic.json
///     input/masks/<frame>.png
///     input/color/<frame>.png
///     input/depth/<frame>.npy
///     input/poses/<frame>.txt
/// ```
///
/// Samples are listed once at construction. Everything else is read from disk on
/// every access.
///
/// Example:
///
/// ```no_run
/// use shapecomp::{DatasetConfig, ShapeCompletionDataset};
///
/// let dataset = ShapeCompletionDataset::new(DatasetConfig::new("/data/fruits"))?;
/// let item = dataset.get(0)?;
/// println!("{:?}", item.groundtruth_points.shape);
/// # Ok::<(), shapecomp::DatasetError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ShapeCompletionDataset {
    config: DatasetConfig,
    index: SampleIndex,
}

impl ShapeCompletionDataset {
    /// Validate the configuration and list the samples of the split.
    ///
    /// # Errors
    ///
    /// [`DatasetError::InvalidConfig`] for unusable parameters and
    /// [`DatasetError::Io`] when the split directory cannot be read.
    pub fn new(config: DatasetConfig) -> Result<Self, DatasetError> {
        config.validate()?;

        let split_dir = config.split_dir();
        let index = SampleIndex::from_split_dir(&split_dir)?;
        log::info!(
            "found {} samples in split '{}' at {}",
            index.len(),
            config.split,
            split_dir.display()
        );

        Ok(Self { config, index })
    }

    /// The configuration of the dataset.
    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// The number of samples.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the split holds no sample.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The sample identifiers in index order.
    pub fn sample_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.index.ids()
    }

    /// Load the sample at position `index`.
    pub fn get(&self, index: usize) -> Result<SampleItem, DatasetError> {
        let (id, root) = self
            .index
            .get(index)
            .ok_or(DatasetError::IndexOutOfRange {
                index,
                len: self.len(),
            })?;
        self.load_item(index, id, root)
    }

    /// Load the sample named `id`.
    pub fn get_by_id(&self, id: &str) -> Result<SampleItem, DatasetError> {
        let index = self
            .index
            .position(id)
            .ok_or_else(|| DatasetError::UnknownSample(id.to_string()))?;
        self.get(index)
    }

    /// Load and sample the ground-truth point cloud of sample `id`.
    pub fn load_groundtruth<R: Rng + ?Sized>(
        &self,
        id: &str,
        rng: &mut R,
    ) -> Result<Tensor2<f32>, DatasetError> {
        let root = self.sample_root(id)?;
        self.groundtruth_from_root(root, rng)
    }

    /// Load the intrinsics and frames of sample `id`, fusing them when `return_pcd`
    /// is set.
    pub fn load_rgbd<R: Rng + ?Sized>(
        &self,
        id: &str,
        rng: &mut R,
    ) -> Result<RgbdData, DatasetError> {
        let root = self.sample_root(id)?;
        self.rgbd_from_root(root, rng)
    }

    fn sample_root(&self, id: &str) -> Result<&Path, DatasetError> {
        self.index
            .root_of(id)
            .ok_or_else(|| DatasetError::UnknownSample(id.to_string()))
    }

    // seed + index when seeded, OS entropy otherwise
    fn rng_for(&self, index: usize) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_os_rng(),
        }
    }

    fn load_item(&self, index: usize, id: &str, root: &Path) -> Result<SampleItem, DatasetError> {
        log::debug!("loading sample {index} '{id}' from {}", root.display());
        let mut rng = self.rng_for(index);

        let groundtruth_points = self.groundtruth_from_root(root, &mut rng)?;
        let rgbd = self.rgbd_from_root(root, &mut rng)?;

        let (intrinsics, frames) = if self.config.return_rgbd {
            (Some(rgbd.intrinsics), Some(rgbd.frames))
        } else {
            (None, None)
        };

        Ok(SampleItem {
            groundtruth_points,
            rgbd_points: rgbd.points,
            intrinsics,
            frames,
        })
    }

    fn groundtruth_from_root<R: Rng + ?Sized>(
        &self,
        root: &Path,
        rng: &mut R,
    ) -> Result<Tensor2<f32>, DatasetError> {
        let pointcloud = read_ply(root.join(GROUNDTRUTH_PLY))?;
        log::debug!("ground truth has {} points", pointcloud.len());
        Ok(pointcloud_to_tensor(&pointcloud, self.config.num_points, rng)?)
    }

    fn rgbd_from_root<R: Rng + ?Sized>(
        &self,
        root: &Path,
        rng: &mut R,
    ) -> Result<RgbdData, DatasetError> {
        let intrinsics = load_intrinsics(root.join(INTRINSICS_JSON))?;
        let params = self.config.rgbd_params();

        let mut fused = PointCloud::default();
        let mut frames = BTreeMap::new();

        for frame_id in list_frame_ids(root)? {
            let paths = FramePaths::new(root, &frame_id);
            paths.check_exists(&frame_id)?;
            let frame = Frame::load(&paths)?;

            if self.config.return_pcd {
                let frame_pcd = rgbd_to_pointcloud(
                    &frame.color,
                    &frame.depth,
                    &frame.mask,
                    &frame.pose,
                    &intrinsics,
                    &params,
                )?;
                log::debug!("frame {frame_id} contributes {} points", frame_pcd.len());
                fused.extend(frame_pcd);
            }

            if self.config.return_rgbd {
                frames.insert(frame_id, frame);
            }
        }

        let points = if self.config.return_pcd {
            log::debug!("fused point cloud has {} points", fused.len());
            Some(pointcloud_to_tensor(&fused, self.config.num_points, rng)?)
        } else {
            None
        };

        Ok(RgbdData {
            intrinsics,
            points,
            frames,
        })
    }
}
