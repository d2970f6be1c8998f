use std::io::{BufRead, Read};
use std::path::Path;

use super::{
    properties::{DynamicProperty, PlyDataType, PlyPropertyDefinition, PlyType},
    PlyError, PlyPropertyTrait,
};
use crate::pointcloud::PointCloud;

// upper bound on the buffers reserved from the vertex count of the header
const MAX_RESERVED_VERTICES: usize = 1 << 20;

/// The storage formats of the body of a PLY file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyFormat {
    /// Whitespace separated text, one vertex per line.
    Ascii,
    /// Packed little endian binary.
    BinaryLittleEndian,
}

struct PlyHeader {
    pub format: PlyFormat,
    pub vertex_count: usize,
    pub properties: Vec<PlyPropertyDefinition>,
}

impl PlyHeader {
    fn has_all(&self, names: [&str; 3]) -> bool {
        names
            .iter()
            .all(|name| self.properties.iter().any(|p| p.name == *name))
    }
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<PlyHeader, PlyError> {
    let mut line = String::new();
    let mut format = None;
    let mut vertex_count = None;
    let mut properties = Vec::new();
    // name of the element the following properties belong to
    let mut current_element: Option<String> = None;

    reader.read_line(&mut line)?;
    if line.trim() != "ply" {
        return Err(PlyError::InvalidHeader("missing ply magic".to_string()));
    }

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(PlyError::InvalidHeader("missing end_header".to_string()));
        }
        let parts = line.split_whitespace().collect::<Vec<_>>();

        match parts.as_slice() {
            ["end_header"] => break,
            [] | ["comment", ..] | ["obj_info", ..] => continue,
            ["format", kind, _version] => {
                format = Some(match *kind {
                    "ascii" => PlyFormat::Ascii,
                    "binary_little_endian" => PlyFormat::BinaryLittleEndian,
                    other => return Err(PlyError::UnsupportedFormat(other.to_string())),
                });
            }
            ["element", name, count] => {
                if *name == "vertex" {
                    vertex_count = Some(count.parse::<usize>().map_err(|e| {
                        PlyError::InvalidHeader(format!("vertex count {count}: {e}"))
                    })?);
                } else if vertex_count.is_none() {
                    return Err(PlyError::UnsupportedFormat(format!(
                        "element {name} declared before vertex"
                    )));
                }
                current_element = Some(name.to_string());
            }
            ["property", "list", ..] => {
                if current_element.as_deref() == Some("vertex") {
                    return Err(PlyError::UnsupportedProperty(
                        "list property in vertex element".to_string(),
                    ));
                }
            }
            ["property", data_type, name] => {
                if current_element.as_deref() == Some("vertex") {
                    properties.push(PlyPropertyDefinition {
                        name: name.to_string(),
                        data_type: parse_data_type(data_type)?,
                    });
                }
            }
            _ => {
                return Err(PlyError::InvalidHeader(line.trim().to_string()));
            }
        }
    }

    let format = format.ok_or_else(|| PlyError::InvalidHeader("missing format".to_string()))?;
    let vertex_count =
        vertex_count.ok_or_else(|| PlyError::InvalidHeader("missing vertex element".to_string()))?;

    for name in ["x", "y", "z"] {
        if !properties.iter().any(|p| p.name == name) {
            return Err(PlyError::MissingProperty(name));
        }
    }

    Ok(PlyHeader {
        format,
        vertex_count,
        properties,
    })
}

fn parse_data_type(type_str: &str) -> Result<PlyDataType, PlyError> {
    match type_str {
        "float" | "float32" => Ok(PlyDataType::Float32),
        "double" | "float64" => Ok(PlyDataType::Float64),
        "char" | "int8" => Ok(PlyDataType::Int8),
        "uchar" | "uint8" => Ok(PlyDataType::UInt8),
        "short" | "int16" => Ok(PlyDataType::Int16),
        "ushort" | "uint16" => Ok(PlyDataType::UInt16),
        "int" | "int32" => Ok(PlyDataType::Int32),
        "uint" | "uint32" => Ok(PlyDataType::UInt32),
        _ => Err(PlyError::UnsupportedProperty(type_str.to_string())),
    }
}

/// Read the vertices of a PLY file into a point cloud.
///
/// Both `ascii` and `binary_little_endian` files are supported. The coordinates are
/// required, colors and normals are kept only when the file declares them. Elements
/// that follow the vertex element, e.g. faces, are ignored.
///
/// # Arguments
///
/// * `path` - The path to the PLY file.
///
/// # Returns
///
/// A point cloud with one point per vertex.
pub fn read_ply(path: impl AsRef<Path>) -> Result<PointCloud, PlyError> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let header = parse_header(&mut reader)?;
    log::debug!(
        "ply header: {:?}, {} vertices, {} properties",
        header.format,
        header.vertex_count,
        header.properties.len()
    );

    let has_colors = header.has_all(["red", "green", "blue"]);
    let has_normals = header.has_all(["nx", "ny", "nz"]);

    let capacity = header.vertex_count.min(MAX_RESERVED_VERTICES);
    let mut points = Vec::with_capacity(capacity);
    let mut colors = Vec::with_capacity(if has_colors { capacity } else { 0 });
    let mut normals = Vec::with_capacity(if has_normals { capacity } else { 0 });

    let mut push = |vertex: &dyn PlyPropertyTrait| {
        points.push(vertex.to_point());
        if has_colors {
            colors.push(vertex.to_color());
        }
        if has_normals {
            normals.push(vertex.to_normal());
        }
    };

    match header.format {
        PlyFormat::BinaryLittleEndian => {
            let format = PlyType::detect_format(&header.properties);
            let mut buffer = vec![0u8; format.size_of()];
            for _ in 0..header.vertex_count {
                reader.read_exact(&mut buffer)?;
                let property_entry = format.deserialize(&buffer)?;
                push(&property_entry);
            }
        }
        PlyFormat::Ascii => {
            let mut line = String::new();
            let mut read = 0;
            while read < header.vertex_count {
                line.clear();
                if reader.read_line(&mut line)? == 0 {
                    return Err(PlyError::ParseError(format!(
                        "expected {} vertices, found {read}",
                        header.vertex_count
                    )));
                }
                if line.trim().is_empty() {
                    continue;
                }
                let property_entry = DynamicProperty::parse_from_line(&line, &header.properties)?;
                push(&property_entry);
                read += 1;
            }
        }
    }

    Ok(PointCloud::new(
        points,
        has_colors.then_some(colors),
        has_normals.then_some(normals),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const XYZ_RGB_NORMALS_HEADER: &str = "ply\nformat binary_little_endian 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nproperty uchar red\nproperty uchar green\nproperty uchar blue\nproperty float nx\nproperty float ny\nproperty float nz\nend_header\n";

    #[test]
    fn test_parse_header_basic() -> Result<(), PlyError> {
        let header_text = "ply\nformat binary_little_endian 1.0\ncomment made by hand\nelement vertex 10\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        let header = parse_header(&mut reader)?;
        assert_eq!(header.format, PlyFormat::BinaryLittleEndian);
        assert_eq!(header.vertex_count, 10);
        assert_eq!(header.properties.len(), 3);
        assert_eq!(header.properties[0].name, "x");
        assert_eq!(header.properties[0].data_type, PlyDataType::Float32);
        Ok(())
    }

    #[test]
    fn test_parse_header_ignores_faces() -> Result<(), PlyError> {
        let header_text = "ply\nformat ascii 1.0\nelement vertex 3\nproperty double x\nproperty double y\nproperty double z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        let header = parse_header(&mut reader)?;
        assert_eq!(header.format, PlyFormat::Ascii);
        assert_eq!(header.vertex_count, 3);
        assert_eq!(header.properties.len(), 3);
        Ok(())
    }

    #[test]
    fn test_parse_header_errors() {
        let parse = |text: &str| parse_header(&mut std::io::BufReader::new(text.as_bytes()));

        let big_endian = "ply\nformat binary_big_endian 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        assert!(matches!(parse(big_endian), Err(PlyError::UnsupportedFormat(_))));

        let no_z = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nend_header\n";
        assert!(matches!(parse(no_z), Err(PlyError::MissingProperty("z"))));

        let face_first = "ply\nformat ascii 1.0\nelement face 0\nelement vertex 1\nend_header\n";
        assert!(matches!(parse(face_first), Err(PlyError::UnsupportedFormat(_))));

        assert!(matches!(parse("obj\n"), Err(PlyError::InvalidHeader(_))));
        assert!(matches!(
            parse("ply\nformat ascii 1.0\n"),
            Err(PlyError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_data_type_parsing() -> Result<(), PlyError> {
        assert_eq!(parse_data_type("float")?, PlyDataType::Float32);
        assert_eq!(parse_data_type("uchar")?, PlyDataType::UInt8);
        assert_eq!(parse_data_type("float64")?, PlyDataType::Float64);
        assert!(parse_data_type("invalid").is_err());
        Ok(())
    }

    #[test]
    fn test_read_ply_binary_fixed_layout() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        file.write_all(XYZ_RGB_NORMALS_HEADER.as_bytes())?;

        let mut data = Vec::new();
        data.extend_from_slice(&1.0f32.to_le_bytes());
        data.extend_from_slice(&2.0f32.to_le_bytes());
        data.extend_from_slice(&3.0f32.to_le_bytes());
        data.push(255);
        data.push(128);
        data.push(0);
        data.extend_from_slice(&0.0f32.to_le_bytes());
        data.extend_from_slice(&1.0f32.to_le_bytes());
        data.extend_from_slice(&0.0f32.to_le_bytes());
        file.write_all(&data)?;

        let pointcloud = read_ply(file.path())?;
        assert_eq!(pointcloud.len(), 1);
        assert_eq!(pointcloud.points()[0], [1.0, 2.0, 3.0]);
        assert_eq!(pointcloud.colors().map(|c| c[0]), Some([255, 128, 0]));
        assert_eq!(pointcloud.normals().map(|n| n[0]), Some([0.0, 1.0, 0.0]));
        Ok(())
    }

    #[test]
    fn test_read_ply_binary_dynamic_format() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        let header = "ply\nformat binary_little_endian 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nproperty float intensity\nend_header\n";
        file.write_all(header.as_bytes())?;

        let mut data = Vec::new();
        data.extend_from_slice(&1.0f32.to_le_bytes());
        data.extend_from_slice(&2.0f32.to_le_bytes());
        data.extend_from_slice(&3.0f32.to_le_bytes());
        data.extend_from_slice(&0.5f32.to_le_bytes());
        file.write_all(&data)?;

        let pointcloud = read_ply(file.path())?;
        assert_eq!(pointcloud.len(), 1);
        assert_eq!(pointcloud.points()[0], [1.0, 2.0, 3.0]);
        assert!(pointcloud.colors().is_none());
        assert!(pointcloud.normals().is_none());
        Ok(())
    }

    #[test]
    fn test_read_ply_truncated_body() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        file.write_all(XYZ_RGB_NORMALS_HEADER.as_bytes())?;
        file.write_all(&[0u8; 10])?;

        assert!(matches!(read_ply(file.path()), Err(PlyError::Io(_))));
        Ok(())
    }

    #[test]
    fn test_read_ply_ascii_matches_binary() -> Result<(), Box<dyn std::error::Error>> {
        let points = [[0.25f32, -1.0, 2.0], [3.0, 4.5, -0.125]];

        let mut ascii = NamedTempFile::new()?;
        write!(
            ascii,
            "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n"
        )?;
        for p in points.iter() {
            writeln!(ascii, "{} {} {}", p[0], p[1], p[2])?;
        }

        let mut binary = NamedTempFile::new()?;
        write!(
            binary,
            "ply\nformat binary_little_endian 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n"
        )?;
        for v in points.iter().flatten() {
            binary.write_all(&v.to_le_bytes())?;
        }

        let from_ascii = read_ply(ascii.path())?;
        let from_binary = read_ply(binary.path())?;
        assert_eq!(from_ascii.len(), 2);
        assert_eq!(from_ascii, from_binary);
        assert_eq!(from_ascii.points()[1], [3.0, 4.5, -0.125]);
        Ok(())
    }

    #[test]
    fn test_read_ply_ascii_too_few_vertices() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nend_header\n1 2 3\n"
        )?;
        assert!(matches!(read_ply(file.path()), Err(PlyError::ParseError(_))));
        Ok(())
    }

    #[test]
    fn test_read_ply_oversized_vertex_count() -> Result<(), Box<dyn std::error::Error>> {
        let mut binary = NamedTempFile::new()?;
        write!(
            binary,
            "ply\nformat binary_little_endian 1.0\nelement vertex {}\nproperty float x\nproperty float y\nproperty float z\nend_header\n",
            usize::MAX
        )?;
        binary.write_all(&[0u8; 12])?;
        assert!(matches!(read_ply(binary.path()), Err(PlyError::Io(_))));

        let mut ascii = NamedTempFile::new()?;
        write!(
            ascii,
            "ply\nformat ascii 1.0\nelement vertex {}\nproperty float x\nproperty float y\nproperty float z\nend_header\n1 2 3\n",
            usize::MAX
        )?;
        assert!(matches!(read_ply(ascii.path()), Err(PlyError::ParseError(_))));
        Ok(())
    }

    #[test]
    fn test_read_ply_empty_cloud() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            "ply\nformat binary_little_endian 1.0\nelement vertex 0\nproperty float x\nproperty float y\nproperty float z\nend_header\n"
        )?;
        let pointcloud = read_ply(file.path())?;
        assert!(pointcloud.is_empty());
        Ok(())
    }
}
