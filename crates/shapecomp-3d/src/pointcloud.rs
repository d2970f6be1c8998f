use glam::DVec3;

/// A point cloud with points, colors, and normals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    // The points in the point cloud.
    points: Vec<[f64; 3]>,
    // The colors of the points.
    colors: Option<Vec<[u8; 3]>>,
    // The normals of the points.
    normals: Option<Vec<[f64; 3]>>,
}

impl PointCloud {
    /// Create a new point cloud from points, colors (optional), and normals (optional).
    pub fn new(
        points: Vec<[f64; 3]>,
        colors: Option<Vec<[u8; 3]>>,
        normals: Option<Vec<[f64; 3]>>,
    ) -> Self {
        Self {
            points,
            colors,
            normals,
        }
    }

    /// Create a point cloud holding only coordinates.
    pub fn from_points(points: Vec<[f64; 3]>) -> Self {
        Self::new(points, None, None)
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Get as reference the colors of the points in the point cloud.
    pub fn colors(&self) -> Option<&[[u8; 3]]> {
        self.colors.as_deref()
    }

    /// Get as reference the normals of the points in the point cloud.
    pub fn normals(&self) -> Option<&[[f64; 3]]> {
        self.normals.as_deref()
    }

    /// Append all points of `other` to this point cloud.
    ///
    /// Colors and normals are kept only when both clouds carry them, or when this
    /// cloud is empty and takes over the attributes of `other`.
    pub fn extend(&mut self, other: PointCloud) {
        if self.is_empty() {
            *self = other;
            return;
        }
        if other.is_empty() {
            return;
        }

        self.colors = match (self.colors.take(), other.colors) {
            (Some(mut a), Some(b)) => {
                a.extend(b);
                Some(a)
            }
            _ => None,
        };
        self.normals = match (self.normals.take(), other.normals) {
            (Some(mut a), Some(b)) => {
                a.extend(b);
                Some(a)
            }
            _ => None,
        };
        self.points.extend(other.points);
    }

    /// Get the minimum bound of the point cloud.
    pub fn get_min_bound(&self) -> DVec3 {
        self.points
            .iter()
            .map(|p| DVec3::from_array(*p))
            .reduce(|a, b| a.min(b))
            .unwrap_or(DVec3::ZERO)
    }

    /// Get the maximum bound of the point cloud.
    pub fn get_max_bound(&self) -> DVec3 {
        self.points
            .iter()
            .map(|p| DVec3::from_array(*p))
            .reduce(|a, b| a.max(b))
            .unwrap_or(DVec3::ZERO)
    }
}
