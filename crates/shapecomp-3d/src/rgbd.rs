use shapecomp_image::{Image, ImageError, ImageSize};

use crate::{
    camera::PinholeCameraIntrinsic,
    linalg::{invert_transform, transform_points_inplace},
    pointcloud::PointCloud,
};

/// Error types for RGB-D processing.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RgbdError {
    /// Two images that must be aligned differ in size
    #[error("Image size mismatch: {0} vs {1}")]
    SizeMismatch(ImageSize, ImageSize),

    /// The pose or extrinsic matrix cannot be inverted
    #[error("The camera pose is singular")]
    SingularPose,

    /// Error from the image crate
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Parameters of the depth conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbdParams {
    /// Raw depth values are divided by this factor to get meters.
    pub depth_scale: f64,
    /// Depth values beyond this distance (after scaling) are discarded.
    pub depth_trunc: f64,
}

impl Default for RgbdParams {
    fn default() -> Self {
        Self {
            depth_scale: 1.0,
            depth_trunc: 1.0,
        }
    }
}

/// A color image paired with a metric depth map of the same size.
#[derive(Debug, Clone)]
pub struct RgbdImage<'a> {
    /// The color image.
    pub color: &'a Image<u8, 3>,
    /// The depth in meters, zero where invalid.
    pub depth: Image<f32, 1>,
}

impl<'a> RgbdImage<'a> {
    /// Pair a color image with a raw depth map.
    ///
    /// The depth is divided by `depth_scale`; values above `depth_trunc` or not
    /// finite are set to zero.
    pub fn from_color_and_depth(
        color: &'a Image<u8, 3>,
        depth: &Image<f32, 1>,
        depth_scale: f64,
        depth_trunc: f64,
    ) -> Result<Self, RgbdError> {
        if color.size() != depth.size() {
            return Err(RgbdError::SizeMismatch(color.size(), depth.size()));
        }

        let mut metric = depth.clone();
        metric.as_slice_mut().iter_mut().for_each(|d| {
            let v = *d as f64 / depth_scale;
            *d = if v.is_finite() && v <= depth_trunc {
                v as f32
            } else {
                0.0
            };
        });

        Ok(Self {
            color,
            depth: metric,
        })
    }

    /// The size of the image pair.
    pub fn size(&self) -> ImageSize {
        self.color.size()
    }
}

/// Multiply a depth map element-wise by a mask.
///
/// The raw mask value is the gate, so a binary `{0, 1}` mask keeps the depth inside
/// the region of interest and zeroes it elsewhere.
pub fn gate_depth(depth: &Image<f32, 1>, mask: &Image<u8, 1>) -> Result<Image<f32, 1>, RgbdError> {
    if depth.size() != mask.size() {
        return Err(RgbdError::SizeMismatch(depth.size(), mask.size()));
    }

    let gate = mask.cast::<f32>()?;
    let data = depth
        .as_slice()
        .iter()
        .zip(gate.as_slice())
        .map(|(d, m)| d * m)
        .collect::<Vec<_>>();

    Ok(Image::new(depth.size(), data)?)
}

/// Create a point cloud from an RGB-D image.
///
/// Every pixel with a positive depth is unprojected with the pinhole model and moved
/// from camera to world coordinates with the inverse of `extrinsic`. The points keep
/// the color of their pixel.
///
/// # Arguments
///
/// * `rgbd` - The color and metric depth images.
/// * `intrinsic` - The camera intrinsics.
/// * `extrinsic` - The world-to-camera transform in row-major order.
///
/// # Returns
///
/// The point cloud in world coordinates.
pub fn create_point_cloud_from_rgbd(
    rgbd: &RgbdImage,
    intrinsic: &PinholeCameraIntrinsic,
    extrinsic: &[[f64; 4]; 4],
) -> Result<PointCloud, RgbdError> {
    let camera_pose = invert_transform(extrinsic).ok_or(RgbdError::SingularPose)?;

    let width = rgbd.depth.width();
    let mut points = Vec::new();
    let mut colors = Vec::new();

    for (i, (d, rgb)) in rgbd
        .depth
        .as_slice()
        .iter()
        .zip(rgbd.color.pixels())
        .enumerate()
    {
        if *d <= 0.0 {
            continue;
        }
        let (u, v) = ((i % width) as f64, (i / width) as f64);
        points.push(intrinsic.unproject(u, v, *d as f64));
        colors.push([rgb[0], rgb[1], rgb[2]]);
    }

    transform_points_inplace(&mut points, &camera_pose);

    Ok(PointCloud::new(points, Some(colors), None))
}

/// Back-project one masked RGB-D frame into world coordinates.
///
/// The depth is gated by the mask, the intrinsics are taken from `k` with the image
/// size of the color frame, and the extrinsic handed to the unprojection is the
/// inverse of the camera-to-world `pose`.
///
/// # Arguments
///
/// * `color` - The color frame.
/// * `depth` - The raw depth map.
/// * `mask` - The region of interest, used as a multiplicative gate.
/// * `pose` - The camera-to-world transform in row-major order.
/// * `k` - The row-major 3x3 camera matrix.
/// * `params` - The depth scale and truncation.
///
/// # Returns
///
/// The colored point cloud of the frame.
pub fn rgbd_to_pointcloud(
    color: &Image<u8, 3>,
    depth: &Image<f32, 1>,
    mask: &Image<u8, 1>,
    pose: &[[f64; 4]; 4],
    k: &[[f64; 3]; 3],
    params: &RgbdParams,
) -> Result<PointCloud, RgbdError> {
    let gated = gate_depth(depth, mask)?;
    let rgbd =
        RgbdImage::from_color_and_depth(color, &gated, params.depth_scale, params.depth_trunc)?;

    let intrinsic = PinholeCameraIntrinsic::from_matrix(k, color.size());
    let extrinsic = invert_transform(pose).ok_or(RgbdError::SingularPose)?;

    create_point_cloud_from_rgbd(&rgbd, &intrinsic, &extrinsic)
}
