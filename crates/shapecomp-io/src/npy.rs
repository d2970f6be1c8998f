use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use shapecomp_image::{Image, ImageSize};

use crate::error::IoError;

const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Element types supported in `.npy` files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpyDtype {
    /// `u1`
    UInt8,
    /// `u2`
    UInt16,
    /// `i2`
    Int16,
    /// `i4`
    Int32,
    /// `f4`
    Float32,
    /// `f8`
    Float64,
}

impl NpyDtype {
    /// Parse a numpy dtype descriptor such as `<f4` or `|u1`.
    ///
    /// Only little-endian (or byte-order free) descriptors are accepted.
    pub fn from_descr(descr: &str) -> Result<Self, IoError> {
        let (order, kind) = descr
            .split_at_checked(1)
            .ok_or_else(|| IoError::NpyUnsupportedDtype(descr.to_string()))?;
        let dtype = match kind {
            "u1" => NpyDtype::UInt8,
            "u2" => NpyDtype::UInt16,
            "i2" => NpyDtype::Int16,
            "i4" => NpyDtype::Int32,
            "f4" => NpyDtype::Float32,
            "f8" => NpyDtype::Float64,
            _ => return Err(IoError::NpyUnsupportedDtype(descr.to_string())),
        };
        match order {
            "<" | "=" => Ok(dtype),
            "|" if dtype.size() == 1 => Ok(dtype),
            _ => Err(IoError::NpyUnsupportedDtype(descr.to_string())),
        }
    }

    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            NpyDtype::UInt8 => 1,
            NpyDtype::UInt16 | NpyDtype::Int16 => 2,
            NpyDtype::Int32 | NpyDtype::Float32 => 4,
            NpyDtype::Float64 => 8,
        }
    }

    fn read_f32(&self, bytes: &[u8]) -> f32 {
        match self {
            NpyDtype::UInt8 => bytes[0] as f32,
            NpyDtype::UInt16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            NpyDtype::Int16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            NpyDtype::Int32 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            NpyDtype::Float32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            NpyDtype::Float64 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes[..8]);
                f64::from_le_bytes(raw) as f32
            }
        }
    }
}

/// Parsed `.npy` header.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyHeader {
    /// Element type of the array.
    pub dtype: NpyDtype,
    /// Whether the data is stored in column-major (Fortran) order.
    pub fortran_order: bool,
    /// Shape of the array.
    pub shape: Vec<usize>,
}

impl NpyHeader {
    /// Number of elements described by the shape, `None` if it overflows `usize`.
    pub fn numel(&self) -> Option<usize> {
        self.shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }
}

/// Read a depth map stored as a `.npy` array into a single channel `f32` image.
///
/// The array must have shape `(H, W)` or `(H, W, 1)`. Integer and `f8` arrays are
/// converted to `f32` without scaling.
///
/// # Arguments
///
/// * `file_path` - The path to the `.npy` file.
///
/// # Returns
///
/// A depth image of size `W x H`.
pub fn read_npy_depth(file_path: impl AsRef<Path>) -> Result<Image<f32, 1>, IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }
    if file_path.extension().is_none_or(|ext| ext != "npy") {
        return Err(IoError::InvalidFileExtension(file_path.to_path_buf()));
    }

    let mut reader = BufReader::new(File::open(file_path)?);
    let header = read_npy_header(&mut reader)?;

    let (height, width) = match header.shape.as_slice() {
        [h, w] | [h, w, 1] => (*h, *w),
        _ => return Err(IoError::NpyInvalidShape(header.shape.clone())),
    };

    let num_bytes = header
        .numel()
        .and_then(|n| n.checked_mul(header.dtype.size()))
        .ok_or_else(|| {
            IoError::NpyHeaderError(format!("array of shape {:?} is too large", header.shape))
        })?;

    // sized by the bytes read, not by the header
    let mut raw = Vec::new();
    reader.by_ref().take(num_bytes as u64).read_to_end(&mut raw)?;
    if raw.len() != num_bytes {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("expected {num_bytes} bytes of data, found {}", raw.len()),
        )
        .into());
    }

    let values = raw
        .chunks_exact(header.dtype.size())
        .map(|bytes| header.dtype.read_f32(bytes))
        .collect::<Vec<_>>();

    let data = if header.fortran_order {
        // column-major to row-major
        let mut data = vec![0.0f32; values.len()];
        for (i, v) in values.into_iter().enumerate() {
            let (col, row) = (i / height, i % height);
            data[row * width + col] = v;
        }
        data
    } else {
        values
    };

    Ok(Image::new(ImageSize { width, height }, data)?)
}

/// Write a single channel `f32` image as a `(H, W)` little-endian `<f4` `.npy` array.
pub fn write_npy_depth(file_path: impl AsRef<Path>, image: &Image<f32, 1>) -> Result<(), IoError> {
    let mut writer = BufWriter::new(File::create(file_path)?);

    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        image.height(),
        image.width()
    );
    // magic + version + header length + header must be a multiple of 64 bytes
    let unpadded = NPY_MAGIC.len() + 2 + 2 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');

    let header_len = u16::try_from(header.len())
        .map_err(|_| IoError::NpyHeaderError("header too long".to_string()))?;

    writer.write_all(NPY_MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_all(&header_len.to_le_bytes())?;
    writer.write_all(header.as_bytes())?;
    for v in image.as_slice() {
        writer.write_all(&v.to_le_bytes())?;
    }
    writer.flush()?;

    Ok(())
}

/// Read the magic string, version and header dictionary of a `.npy` stream.
pub fn read_npy_header<R: Read>(reader: &mut R) -> Result<NpyHeader, IoError> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    if &magic != NPY_MAGIC {
        return Err(IoError::NpyHeaderError("invalid magic string".to_string()));
    }

    let mut version = [0u8; 2];
    reader.read_exact(&mut version)?;

    let header_len = match version[0] {
        1 => {
            let mut len = [0u8; 2];
            reader.read_exact(&mut len)?;
            u16::from_le_bytes(len) as usize
        }
        2 | 3 => {
            let mut len = [0u8; 4];
            reader.read_exact(&mut len)?;
            u32::from_le_bytes(len) as usize
        }
        v => {
            return Err(IoError::NpyHeaderError(format!(
                "unsupported format version {v}.{}",
                version[1]
            )))
        }
    };

    let mut header = vec![0u8; header_len];
    reader.read_exact(&mut header)?;
    let header = String::from_utf8(header)
        .map_err(|e| IoError::NpyHeaderError(format!("header is not valid text: {e}")))?;

    parse_header_dict(&header)
}

// the header is a python dict literal, e.g.
// {'descr': '<f4', 'fortran_order': False, 'shape': (480, 640), }
fn parse_header_dict(header: &str) -> Result<NpyHeader, IoError> {
    let descr = dict_value(header, "descr")?;
    let descr = descr
        .split(['\'', '"'])
        .nth(1)
        .ok_or_else(|| IoError::NpyHeaderError(format!("invalid descr: {descr}")))?;
    let dtype = NpyDtype::from_descr(descr)?;

    let fortran_order = match dict_value(header, "fortran_order")? {
        v if v.starts_with("True") => true,
        v if v.starts_with("False") => false,
        v => return Err(IoError::NpyHeaderError(format!("invalid fortran_order: {v}"))),
    };

    let shape_value = dict_value(header, "shape")?;
    let shape_str = shape_value
        .strip_prefix('(')
        .and_then(|s| s.split(')').next())
        .ok_or_else(|| IoError::NpyHeaderError(format!("invalid shape: {shape_value}")))?;
    let shape = shape_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|e| IoError::NpyHeaderError(format!("{s}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NpyHeader {
        dtype,
        fortran_order,
        shape,
    })
}

// returns the text following `'key':`, with leading whitespace removed
fn dict_value<'a>(header: &'a str, key: &str) -> Result<&'a str, IoError> {
    let quoted = [format!("'{key}'"), format!("\"{key}\"")];
    let start = quoted
        .iter()
        .find_map(|k| header.find(k.as_str()).map(|pos| pos + k.len()))
        .ok_or_else(|| IoError::NpyHeaderError(format!("missing key '{key}'")))?;

    header[start..]
        .trim_start()
        .strip_prefix(':')
        .map(str::trim_start)
        .ok_or_else(|| IoError::NpyHeaderError(format!("missing value for '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npy_bytes(header: &str, data: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(NPY_MAGIC);
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(data);
        bytes
    }

    #[test]
    fn parse_header_basic() -> Result<(), IoError> {
        let header =
            parse_header_dict("{'descr': '<f4', 'fortran_order': False, 'shape': (480, 640), }")?;
        assert_eq!(header.dtype, NpyDtype::Float32);
        assert!(!header.fortran_order);
        assert_eq!(header.shape, vec![480, 640]);
        assert_eq!(header.numel(), Some(480 * 640));
        Ok(())
    }

    #[test]
    fn parse_header_single_dim_and_order() -> Result<(), IoError> {
        let header =
            parse_header_dict("{'fortran_order': True, 'shape': (7,), 'descr': '|u1', }")?;
        assert_eq!(header.dtype, NpyDtype::UInt8);
        assert!(header.fortran_order);
        assert_eq!(header.shape, vec![7]);
        Ok(())
    }

    #[test]
    fn dtype_descriptors() {
        assert_eq!(NpyDtype::from_descr("<f8").ok(), Some(NpyDtype::Float64));
        assert_eq!(NpyDtype::from_descr("<u2").ok(), Some(NpyDtype::UInt16));
        assert!(NpyDtype::from_descr(">f4").is_err());
        assert!(NpyDtype::from_descr("<c8").is_err());
        assert!(NpyDtype::from_descr("|f4").is_err());
    }

    #[test]
    fn read_write_depth_roundtrip() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("depth.npy");

        let depth = Image::<f32, 1>::new(
            ImageSize {
                width: 3,
                height: 2,
            },
            vec![0.0, 0.25, 0.5, 0.75, 1.0, 1.25],
        )?;
        write_npy_depth(&file_path, &depth)?;

        let bytes = std::fs::read(&file_path)?;
        // data starts on a 64 byte boundary
        assert_eq!((bytes.len() - 6 * 4) % 64, 0);

        let depth_back = read_npy_depth(&file_path)?;
        assert_eq!(depth_back, depth);
        Ok(())
    }

    #[test]
    fn read_depth_f64_fortran() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("depth.npy");

        // logical array [[1, 2, 3], [4, 5, 6]] stored column-major
        let data = [1.0f64, 4.0, 2.0, 5.0, 3.0, 6.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect::<Vec<_>>();
        let bytes = npy_bytes(
            "{'descr': '<f8', 'fortran_order': True, 'shape': (2, 3), }\n",
            &data,
        );
        std::fs::write(&file_path, bytes)?;

        let depth = read_npy_depth(&file_path)?;
        assert_eq!(depth.size().width, 3);
        assert_eq!(depth.size().height, 2);
        assert_eq!(depth.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        Ok(())
    }

    #[test]
    fn read_depth_u16_with_channel_axis() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("depth.npy");

        let data = [500u16, 1000]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect::<Vec<_>>();
        let bytes = npy_bytes(
            "{'descr': '<u2', 'fortran_order': False, 'shape': (1, 2, 1), }\n",
            &data,
        );
        std::fs::write(&file_path, bytes)?;

        let depth = read_npy_depth(&file_path)?;
        assert_eq!(depth.as_slice(), &[500.0, 1000.0]);
        Ok(())
    }

    #[test]
    fn read_depth_invalid_shape() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("depth.npy");
        let bytes = npy_bytes(
            "{'descr': '<f4', 'fortran_order': False, 'shape': (2, 2, 3), }\n",
            &[0u8; 48],
        );
        std::fs::write(&file_path, bytes)?;

        let result = read_npy_depth(&file_path);
        assert!(matches!(result, Err(IoError::NpyInvalidShape(shape)) if shape == vec![2, 2, 3]));
        Ok(())
    }

    #[test]
    fn read_depth_bad_magic() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("depth.npy");
        std::fs::write(&file_path, b"NOTNPY\x01\x00")?;

        let result = read_npy_depth(&file_path);
        assert!(matches!(result, Err(IoError::NpyHeaderError(_))));
        Ok(())
    }

    #[test]
    fn read_depth_truncated_data() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("depth.npy");
        let bytes = npy_bytes(
            "{'descr': '<f4', 'fortran_order': False, 'shape': (2, 2), }\n",
            &[0u8; 8],
        );
        std::fs::write(&file_path, bytes)?;

        let result = read_npy_depth(&file_path);
        assert!(matches!(result, Err(IoError::FileError(_))));
        Ok(())
    }

    #[test]
    fn read_depth_oversized_shape() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("depth.npy");

        let overflowing = npy_bytes(
            "{'descr': '<f4', 'fortran_order': False, 'shape': (8589934592, 8589934592), }\n",
            &[0u8; 16],
        );
        std::fs::write(&file_path, overflowing)?;
        let result = read_npy_depth(&file_path);
        assert!(matches!(result, Err(IoError::NpyHeaderError(_))));

        let huge = npy_bytes(
            "{'descr': '<f4', 'fortran_order': False, 'shape': (1000000, 1000000), }\n",
            &[0u8; 16],
        );
        std::fs::write(&file_path, huge)?;
        let result = read_npy_depth(&file_path);
        assert!(matches!(result, Err(IoError::FileError(_))));
        Ok(())
    }
}
