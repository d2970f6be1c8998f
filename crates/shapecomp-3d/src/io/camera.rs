use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use serde::Deserialize;

/// Error types for the camera readers.
#[derive(Debug, thiserror::Error)]
pub enum CameraIoError {
    /// Error reading or writing file
    #[error("error reading or writing file")]
    IoError(#[from] std::io::Error),

    /// The JSON document could not be decoded
    #[error("invalid intrinsics document")]
    JsonError(#[from] serde_json::Error),

    /// Invalid number of intrinsic matrix values
    #[error("Invalid number of intrinsic matrix values: expected 9, got {0}")]
    InvalidIntrinsics(usize),

    /// Parse error
    #[error("Parse error {0}")]
    ParseError(String),
}

#[derive(Deserialize)]
struct IntrinsicsFile {
    intrinsic_matrix: Vec<f64>,
}

/// Load a 3x3 camera matrix from an intrinsics JSON file.
///
/// The file holds `{"intrinsic_matrix": [v0, .., v8]}` with the values in
/// column-major order, i.e. `[fx, 0, 0, 0, fy, 0, cx, cy, 1]`.
///
/// # Arguments
///
/// * `path` - The path to the JSON file.
///
/// # Returns
///
/// The camera matrix in row-major order.
pub fn load_intrinsics(path: impl AsRef<Path>) -> Result<[[f64; 3]; 3], CameraIoError> {
    let file = File::open(path)?;
    let intrinsics: IntrinsicsFile = serde_json::from_reader(BufReader::new(file))?;
    intrinsics_from_col_major(&intrinsics.intrinsic_matrix)
}

/// Reshape 9 column-major values into a row-major 3x3 matrix.
pub fn intrinsics_from_col_major(values: &[f64]) -> Result<[[f64; 3]; 3], CameraIoError> {
    if values.len() != 9 {
        return Err(CameraIoError::InvalidIntrinsics(values.len()));
    }

    let mut k = [[0.0; 3]; 3];
    for (i, v) in values.iter().enumerate() {
        k[i % 3][i / 3] = *v;
    }

    Ok(k)
}

fn parse_part<T: std::str::FromStr>(s: &str) -> Result<T, CameraIoError>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| CameraIoError::ParseError(format!("{}: {}", s, e)))
}

/// Read a 4x4 camera-to-world pose from a whitespace delimited text file.
///
/// Text after a `#` is a comment. Blank and comment-only lines are skipped. The file must contain
/// exactly 4 rows of 4 values.
///
/// # Arguments
///
/// * `path` - The path to the pose file.
///
/// # Returns
///
/// The pose in row-major order.
pub fn read_pose_txt(path: impl AsRef<Path>) -> Result<[[f64; 4]; 4], CameraIoError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut rows = Vec::with_capacity(4);
    for line in reader.lines() {
        let line = line?;
        // everything after `#` is a comment
        let values = line.split('#').next().unwrap_or_default().trim();
        if values.is_empty() {
            continue;
        }
        let row = values
            .split_whitespace()
            .map(parse_part::<f64>)
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }

    if rows.len() != 4 {
        return Err(CameraIoError::ParseError(format!(
            "expected 4 pose rows, got {}",
            rows.len()
        )));
    }

    let mut pose = [[0.0; 4]; 4];
    for (dst, src) in pose.iter_mut().zip(rows.iter()) {
        if src.len() != 4 {
            return Err(CameraIoError::ParseError(format!(
                "expected 4 values per pose row, got {}",
                src.len()
            )));
        }
        dst.copy_from_slice(src);
    }

    Ok(pose)
}
