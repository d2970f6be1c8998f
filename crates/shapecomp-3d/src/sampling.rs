use rand::Rng;
use shapecomp_tensor::{Tensor2, TensorError};

use crate::pointcloud::PointCloud;

/// Draw `min(num_points, len)` distinct indices uniformly from `0..len`.
pub fn sample_indices<R: Rng + ?Sized>(len: usize, num_points: usize, rng: &mut R) -> Vec<usize> {
    let amount = num_points.min(len);
    rand::seq::index::sample(rng, len, amount).into_vec()
}

/// Randomly subsample a set of points into a `(k, 3)` tensor of `f32`.
///
/// `k` is `min(num_points, points.len())` and the points are drawn without
/// replacement. An empty input gives an empty `(0, 3)` tensor.
///
/// # Arguments
///
/// * `points` - The points to sample from.
/// * `num_points` - The maximum number of points to keep.
/// * `rng` - The random number generator.
///
/// Example:
///
/// ```
/// use rand::{rngs::StdRng, SeedableRng};
/// use shapecomp_3d::sampling::sample_points;
///
/// let points = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]];
/// let mut rng = StdRng::seed_from_u64(0);
///
/// let sampled = sample_points(&points, 2, &mut rng).unwrap();
/// assert_eq!(sampled.shape, [2, 3]);
/// ```
pub fn sample_points<R: Rng + ?Sized>(
    points: &[[f64; 3]],
    num_points: usize,
    rng: &mut R,
) -> Result<Tensor2<f32>, TensorError> {
    if points.is_empty() {
        return Tensor2::from_shape_vec([0, 3], Vec::new());
    }

    let indices = sample_indices(points.len(), num_points, rng);
    let data = indices
        .iter()
        .flat_map(|&i| points[i].map(|v| v as f32))
        .collect::<Vec<_>>();

    Tensor2::from_shape_vec([indices.len(), 3], data)
}

/// Randomly subsample the coordinates of a point cloud, dropping colors and normals.
pub fn pointcloud_to_tensor<R: Rng + ?Sized>(
    pointcloud: &PointCloud,
    num_points: usize,
    rng: &mut R,
) -> Result<Tensor2<f32>, TensorError> {
    sample_points(pointcloud.points(), num_points, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn grid(n: usize) -> Vec<[f64; 3]> {
        (0..n).map(|i| [i as f64, 2.0 * i as f64, -(i as f64)]).collect()
    }

    #[test]
    fn test_sample_points_shape() -> Result<(), TensorError> {
        let mut rng = StdRng::seed_from_u64(42);
        let points = grid(100);

        let sampled = sample_points(&points, 10, &mut rng)?;
        assert_eq!(sampled.shape, [10, 3]);

        // asking for more points than available returns all of them
        let sampled = sample_points(&points, 3500, &mut rng)?;
        assert_eq!(sampled.shape, [100, 3]);
        Ok(())
    }

    #[test]
    fn test_sample_points_empty() -> Result<(), TensorError> {
        let mut rng = StdRng::seed_from_u64(0);
        let sampled = sample_points(&[], 3500, &mut rng)?;
        assert_eq!(sampled.shape, [0, 3]);
        assert!(sampled.is_empty());
        Ok(())
    }

    #[test]
    fn test_sample_points_no_duplicates() -> Result<(), TensorError> {
        let mut rng = StdRng::seed_from_u64(7);
        let points = grid(50);

        let sampled = sample_points(&points, 50, &mut rng)?;
        // the x coordinate is unique per point
        let xs = sampled.rows().map(|r| r[0] as i64).collect::<HashSet<_>>();
        assert_eq!(xs.len(), 50);

        // every sampled row is one of the input points
        for row in sampled.rows() {
            let i = row[0] as usize;
            assert_eq!(row, &[i as f32, 2.0 * i as f32, -(i as f32)]);
        }
        Ok(())
    }

    #[test]
    fn test_sample_points_seeded_is_reproducible() -> Result<(), TensorError> {
        let points = grid(1000);
        let a = sample_points(&points, 20, &mut StdRng::seed_from_u64(3))?;
        let b = sample_points(&points, 20, &mut StdRng::seed_from_u64(3))?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_sample_indices_unique() {
        let mut rng = StdRng::seed_from_u64(11);
        let indices = sample_indices(10, 7, &mut rng);
        assert_eq!(indices.len(), 7);
        assert!(indices.iter().all(|&i| i < 10));
        assert_eq!(indices.iter().collect::<HashSet<_>>().len(), 7);
        assert!(sample_indices(0, 5, &mut rng).is_empty());
    }

    #[test]
    fn test_pointcloud_to_tensor() -> Result<(), TensorError> {
        let pointcloud = PointCloud::new(grid(4), Some(vec![[1, 2, 3]; 4]), None);
        let mut rng = StdRng::seed_from_u64(0);
        let sampled = pointcloud_to_tensor(&pointcloud, 8, &mut rng)?;
        assert_eq!(sampled.shape, [4, 3]);
        Ok(())
    }
}
