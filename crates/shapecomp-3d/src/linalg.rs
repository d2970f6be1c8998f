use glam::{DMat4, DVec3};

// determinants below this are treated as singular
const SINGULAR_EPS: f64 = 1e-12;

fn mat4_from_rows(m: &[[f64; 4]; 4]) -> DMat4 {
    // glam is column-major
    DMat4::from_cols_array_2d(m).transpose()
}

fn mat4_to_rows(m: &DMat4) -> [[f64; 4]; 4] {
    m.transpose().to_cols_array_2d()
}

/// Invert a row-major 4x4 homogeneous transform.
///
/// # Arguments
///
/// * `transform` - A 4x4 matrix in row-major order.
///
/// # Returns
///
/// The inverse matrix in row-major order, or `None` if the matrix is singular.
///
/// Example:
///
/// ```
/// use shapecomp_3d::linalg::invert_transform;
///
/// let pose = [
///     [1.0, 0.0, 0.0, 1.0],
///     [0.0, 1.0, 0.0, 2.0],
///     [0.0, 0.0, 1.0, 3.0],
///     [0.0, 0.0, 0.0, 1.0],
/// ];
/// let inv = invert_transform(&pose).unwrap();
/// assert_eq!(inv[0][3], -1.0);
/// assert_eq!(inv[2][3], -3.0);
/// ```
pub fn invert_transform(transform: &[[f64; 4]; 4]) -> Option<[[f64; 4]; 4]> {
    let m = mat4_from_rows(transform);
    let det = m.determinant();
    if !det.is_finite() || det.abs() < SINGULAR_EPS {
        return None;
    }
    Some(mat4_to_rows(&m.inverse()))
}

/// Transform a set of points with a row-major 4x4 homogeneous transform.
///
/// # Arguments
///
/// * `src_points` - A set of points to be transformed.
/// * `transform` - The 4x4 transform `dst_T_src` in row-major order.
/// * `dst_points` - A pre-allocated vector to store the transformed points.
///
/// PRECONDITION: dst_points is a pre-allocated vector of the same size as source.
pub fn transform_points(
    src_points: &[[f64; 3]],
    transform: &[[f64; 4]; 4],
    dst_points: &mut [[f64; 3]],
) {
    assert_eq!(src_points.len(), dst_points.len());

    let m = mat4_from_rows(transform);
    src_points
        .iter()
        .zip(dst_points.iter_mut())
        .for_each(|(src, dst)| {
            *dst = m.transform_point3(DVec3::from_array(*src)).to_array();
        });
}

/// Transform a set of points in place with a row-major 4x4 homogeneous transform.
pub fn transform_points_inplace(points: &mut [[f64; 3]], transform: &[[f64; 4]; 4]) {
    let m = mat4_from_rows(transform);
    points.iter_mut().for_each(|p| {
        *p = m.transform_point3(DVec3::from_array(*p)).to_array();
    });
}

/// The 4x4 identity transform.
pub const IDENTITY_4X4: [[f64; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];
