use shapecomp_image::ImageSize;

/// The intrinsic parameters of a pinhole camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCameraIntrinsic {
    /// Focal length along x in pixels.
    pub fx: f64,
    /// Focal length along y in pixels.
    pub fy: f64,
    /// Principal point x coordinate in pixels.
    pub cx: f64,
    /// Principal point y coordinate in pixels.
    pub cy: f64,
    /// The image size the intrinsics apply to.
    pub image_size: ImageSize,
}

impl PinholeCameraIntrinsic {
    /// Creates a new PinholeCameraIntrinsic with the given parameters.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64, image_size: ImageSize) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            image_size,
        }
    }

    /// Build the intrinsics from a row-major 3x3 camera matrix.
    ///
    /// The focal lengths are read from the diagonal and the principal point from the
    /// third column.
    ///
    /// Example:
    ///
    /// ```
    /// use shapecomp_3d::camera::PinholeCameraIntrinsic;
    /// use shapecomp_image::ImageSize;
    ///
    /// let k = [[500.0, 0.0, 320.0], [0.0, 510.0, 240.0], [0.0, 0.0, 1.0]];
    /// let size = ImageSize { width: 640, height: 480 };
    /// let intrinsic = PinholeCameraIntrinsic::from_matrix(&k, size);
    /// assert_eq!(intrinsic.fy, 510.0);
    /// assert_eq!(intrinsic.cx, 320.0);
    /// ```
    pub fn from_matrix(k: &[[f64; 3]; 3], image_size: ImageSize) -> Self {
        Self::new(k[0][0], k[1][1], k[0][2], k[1][2], image_size)
    }

    /// Returns the camera matrix as a row-major 3x3 array.
    pub fn camera_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    /// Unproject a pixel with a metric depth to a point in camera coordinates.
    #[inline]
    pub fn unproject(&self, u: f64, v: f64, depth: f64) -> [f64; 3] {
        [
            (u - self.cx) * depth / self.fx,
            (v - self.cy) * depth / self.fy,
            depth,
        ]
    }
}
