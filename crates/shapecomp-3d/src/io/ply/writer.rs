use std::io::{BufWriter, Write};
use std::path::Path;

use super::PlyError;
use crate::pointcloud::PointCloud;

/// Write a point cloud to a `binary_little_endian` PLY file.
///
/// Coordinates and normals are stored as `float`, colors as `uchar`. Colors and
/// normals are written only when the point cloud carries them.
///
/// # Arguments
///
/// * `path` - The path of the file to create.
/// * `pointcloud` - The point cloud to write.
pub fn write_ply_binary(path: impl AsRef<Path>, pointcloud: &PointCloud) -> Result<(), PlyError> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);

    let colors = pointcloud.colors();
    let normals = pointcloud.normals();

    writeln!(writer, "ply")?;
    writeln!(writer, "format binary_little_endian 1.0")?;
    writeln!(writer, "element vertex {}", pointcloud.len())?;
    for axis in ["x", "y", "z"] {
        writeln!(writer, "property float {axis}")?;
    }
    if colors.is_some() {
        for channel in ["red", "green", "blue"] {
            writeln!(writer, "property uchar {channel}")?;
        }
    }
    if normals.is_some() {
        for axis in ["nx", "ny", "nz"] {
            writeln!(writer, "property float {axis}")?;
        }
    }
    writeln!(writer, "end_header")?;

    for (i, point) in pointcloud.points().iter().enumerate() {
        for v in point {
            writer.write_all(&(*v as f32).to_le_bytes())?;
        }
        if let Some(color) = colors.and_then(|c| c.get(i)) {
            writer.write_all(color)?;
        }
        if let Some(normal) = normals.and_then(|n| n.get(i)) {
            for v in normal {
                writer.write_all(&(*v as f32).to_le_bytes())?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}
