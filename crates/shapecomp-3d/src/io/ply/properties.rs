use super::PlyError;

/// The vertex layouts the reader knows how to decode.
#[derive(Debug, PartialEq, Clone)]
pub enum PlyType {
    /// `x y z` as float, `red green blue` as uchar, `nx ny nz` as float.
    XYZRgbNormals,
    /// Any other list of scalar properties.
    Dynamic(Vec<PlyPropertyDefinition>),
}

/// A scalar property declared in the header of a PLY file.
#[derive(Debug, PartialEq, Clone)]
pub struct PlyPropertyDefinition {
    /// The property name, e.g. `x` or `red`.
    pub name: String,
    /// The stored scalar type.
    pub data_type: PlyDataType,
}

/// The scalar types a PLY property can be stored as.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum PlyDataType {
    /// `float` / `float32`
    Float32,
    /// `double` / `float64`
    Float64,
    /// `char` / `int8`
    Int8,
    /// `uchar` / `uint8`
    UInt8,
    /// `short` / `int16`
    Int16,
    /// `ushort` / `uint16`
    UInt16,
    /// `int` / `int32`
    Int32,
    /// `uint` / `uint32`
    UInt32,
}

impl PlyDataType {
    /// The size of the type in bytes when stored in binary.
    pub fn size(&self) -> usize {
        match self {
            PlyDataType::Float32 | PlyDataType::Int32 | PlyDataType::UInt32 => 4,
            PlyDataType::Float64 => 8,
            PlyDataType::Int16 | PlyDataType::UInt16 => 2,
            PlyDataType::Int8 | PlyDataType::UInt8 => 1,
        }
    }
}

/// Access to the attributes of one decoded vertex.
pub trait PlyPropertyTrait {
    /// The vertex coordinates.
    fn to_point(&self) -> [f64; 3];
    /// The vertex color, black when absent.
    fn to_color(&self) -> [u8; 3];
    /// The vertex normal, zero when absent.
    fn to_normal(&self) -> [f64; 3];
}

/// The fixed `x y z red green blue nx ny nz` vertex layout.
#[derive(Debug, bincode::Decode)]
pub struct XYZRgbNormalsProperty {
    /// x coordinate
    pub x: f32,
    /// y coordinate
    pub y: f32,
    /// z coordinate
    pub z: f32,
    /// red channel
    pub red: u8,
    /// green channel
    pub green: u8,
    /// blue channel
    pub blue: u8,
    /// normal x
    pub nx: f32,
    /// normal y
    pub ny: f32,
    /// normal z
    pub nz: f32,
}

// 9 fields without padding: 6 x f32 + 3 x u8
const XYZ_RGB_NORMALS_SIZE: usize = 27;

impl PlyPropertyTrait for XYZRgbNormalsProperty {
    fn to_point(&self) -> [f64; 3] {
        [self.x as f64, self.y as f64, self.z as f64]
    }

    fn to_color(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    fn to_normal(&self) -> [f64; 3] {
        [self.nx as f64, self.ny as f64, self.nz as f64]
    }
}

/// Dynamic PLY property that can handle arbitrary schemas
#[derive(Debug)]
pub struct DynamicProperty {
    /// The decoded values, in header order.
    pub properties: Vec<(String, DynamicPropertyValue)>,
}

/// A single decoded scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DynamicPropertyValue {
    /// float32 value
    Float32(f32),
    /// float64 value
    Float64(f64),
    /// int8 value
    Int8(i8),
    /// uint8 value
    UInt8(u8),
    /// int16 value
    Int16(i16),
    /// uint16 value
    UInt16(u16),
    /// int32 value
    Int32(i32),
    /// uint32 value
    UInt32(u32),
}

fn le_bytes<const N: usize>(buffer: &[u8], offset: usize) -> Result<[u8; N], PlyError> {
    buffer
        .get(offset..offset + N)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| PlyError::ParseError(format!("truncated vertex at byte {offset}")))
}

fn parse_token<T: std::str::FromStr>(token: &str) -> Result<T, PlyError>
where
    T::Err: std::fmt::Display,
{
    token
        .parse::<T>()
        .map_err(|e| PlyError::ParseError(format!("{}: {}", token, e)))
}

impl DynamicPropertyValue {
    fn from_le_buffer(
        buffer: &[u8],
        offset: usize,
        data_type: PlyDataType,
    ) -> Result<Self, PlyError> {
        let value = match data_type {
            PlyDataType::Float32 => Self::Float32(f32::from_le_bytes(le_bytes(buffer, offset)?)),
            PlyDataType::Float64 => Self::Float64(f64::from_le_bytes(le_bytes(buffer, offset)?)),
            PlyDataType::Int8 => Self::Int8(i8::from_le_bytes(le_bytes(buffer, offset)?)),
            PlyDataType::UInt8 => Self::UInt8(u8::from_le_bytes(le_bytes(buffer, offset)?)),
            PlyDataType::Int16 => Self::Int16(i16::from_le_bytes(le_bytes(buffer, offset)?)),
            PlyDataType::UInt16 => Self::UInt16(u16::from_le_bytes(le_bytes(buffer, offset)?)),
            PlyDataType::Int32 => Self::Int32(i32::from_le_bytes(le_bytes(buffer, offset)?)),
            PlyDataType::UInt32 => Self::UInt32(u32::from_le_bytes(le_bytes(buffer, offset)?)),
        };
        Ok(value)
    }

    fn from_ascii(token: &str, data_type: PlyDataType) -> Result<Self, PlyError> {
        let value = match data_type {
            PlyDataType::Float32 => Self::Float32(parse_token(token)?),
            PlyDataType::Float64 => Self::Float64(parse_token(token)?),
            PlyDataType::Int8 => Self::Int8(parse_token(token)?),
            PlyDataType::UInt8 => Self::UInt8(parse_token(token)?),
            PlyDataType::Int16 => Self::Int16(parse_token(token)?),
            PlyDataType::UInt16 => Self::UInt16(parse_token(token)?),
            PlyDataType::Int32 => Self::Int32(parse_token(token)?),
            PlyDataType::UInt32 => Self::UInt32(parse_token(token)?),
        };
        Ok(value)
    }

    fn as_f64(&self) -> f64 {
        match *self {
            Self::Float32(v) => v as f64,
            Self::Float64(v) => v,
            Self::Int8(v) => v as f64,
            Self::UInt8(v) => v as f64,
            Self::Int16(v) => v as f64,
            Self::UInt16(v) => v as f64,
            Self::Int32(v) => v as f64,
            Self::UInt32(v) => v as f64,
        }
    }

    fn as_u8(&self) -> u8 {
        match *self {
            Self::UInt8(v) => v,
            // floating point colors are stored in [0, 1]
            Self::Float32(v) => (v.clamp(0.0, 1.0) * 255.0).round() as u8,
            Self::Float64(v) => (v.clamp(0.0, 1.0) * 255.0).round() as u8,
            other => other.as_f64().clamp(0.0, 255.0) as u8,
        }
    }
}

impl DynamicProperty {
    fn parse_from_buffer(
        buffer: &[u8],
        schema: &[PlyPropertyDefinition],
    ) -> Result<Self, PlyError> {
        let mut properties = Vec::with_capacity(schema.len());
        let mut offset = 0;

        for prop_def in schema {
            let value = DynamicPropertyValue::from_le_buffer(buffer, offset, prop_def.data_type)?;
            properties.push((prop_def.name.clone(), value));
            offset += prop_def.data_type.size();
        }

        Ok(DynamicProperty { properties })
    }

    /// Decode one whitespace separated vertex line.
    pub fn parse_from_line(line: &str, schema: &[PlyPropertyDefinition]) -> Result<Self, PlyError> {
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if tokens.len() < schema.len() {
            return Err(PlyError::ParseError(format!(
                "expected {} values, got {}: {line}",
                schema.len(),
                tokens.len()
            )));
        }

        let properties = schema
            .iter()
            .zip(tokens)
            .map(|(prop_def, token)| {
                DynamicPropertyValue::from_ascii(token, prop_def.data_type)
                    .map(|value| (prop_def.name.clone(), value))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DynamicProperty { properties })
    }

    fn get(&self, name: &str) -> Option<&DynamicPropertyValue> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    fn get_float(&self, name: &str) -> f64 {
        self.get(name).map(|v| v.as_f64()).unwrap_or(0.0)
    }

    fn get_u8(&self, name: &str) -> u8 {
        self.get(name).map(|v| v.as_u8()).unwrap_or(0)
    }
}

impl PlyPropertyTrait for DynamicProperty {
    fn to_point(&self) -> [f64; 3] {
        [self.get_float("x"), self.get_float("y"), self.get_float("z")]
    }

    fn to_color(&self) -> [u8; 3] {
        [self.get_u8("red"), self.get_u8("green"), self.get_u8("blue")]
    }

    fn to_normal(&self) -> [f64; 3] {
        [self.get_float("nx"), self.get_float("ny"), self.get_float("nz")]
    }
}

/// A decoded vertex of any supported layout.
pub enum PlyProperty {
    /// A vertex in the fixed layout.
    XYZRgbNormals(XYZRgbNormalsProperty),
    /// A vertex in a dynamic layout.
    Dynamic(DynamicProperty),
}

impl PlyType {
    /// Decode one binary little endian vertex.
    pub fn deserialize(&self, buffer: &[u8]) -> Result<PlyProperty, PlyError> {
        match self {
            PlyType::XYZRgbNormals => {
                let config = bincode::config::standard()
                    .with_little_endian()
                    .with_fixed_int_encoding();
                let (property, _): (XYZRgbNormalsProperty, usize) =
                    bincode::decode_from_slice(buffer, config)?;
                Ok(PlyProperty::XYZRgbNormals(property))
            }
            PlyType::Dynamic(ref schema) => {
                let dynamic_property = DynamicProperty::parse_from_buffer(buffer, schema)?;
                Ok(PlyProperty::Dynamic(dynamic_property))
            }
        }
    }

    /// The size in bytes of one binary vertex.
    pub fn size_of(&self) -> usize {
        match self {
            PlyType::XYZRgbNormals => XYZ_RGB_NORMALS_SIZE,
            PlyType::Dynamic(ref props) => props.iter().map(|p| p.data_type.size()).sum(),
        }
    }

    /// Pick the fixed layout when the properties match it exactly.
    pub fn detect_format(properties: &[PlyPropertyDefinition]) -> Self {
        const EXPECTED: [(&str, PlyDataType); 9] = [
            ("x", PlyDataType::Float32),
            ("y", PlyDataType::Float32),
            ("z", PlyDataType::Float32),
            ("red", PlyDataType::UInt8),
            ("green", PlyDataType::UInt8),
            ("blue", PlyDataType::UInt8),
            ("nx", PlyDataType::Float32),
            ("ny", PlyDataType::Float32),
            ("nz", PlyDataType::Float32),
        ];

        let is_fixed = properties.len() == EXPECTED.len()
            && properties
                .iter()
                .zip(EXPECTED.iter())
                .all(|(p, (name, data_type))| p.name == *name && p.data_type == *data_type);

        if is_fixed {
            PlyType::XYZRgbNormals
        } else {
            PlyType::Dynamic(properties.to_vec())
        }
    }
}

impl PlyPropertyTrait for PlyProperty {
    fn to_point(&self) -> [f64; 3] {
        match self {
            PlyProperty::XYZRgbNormals(property) => property.to_point(),
            PlyProperty::Dynamic(property) => property.to_point(),
        }
    }

    fn to_color(&self) -> [u8; 3] {
        match self {
            PlyProperty::XYZRgbNormals(property) => property.to_color(),
            PlyProperty::Dynamic(property) => property.to_color(),
        }
    }

    fn to_normal(&self) -> [f64; 3] {
        match self {
            PlyProperty::XYZRgbNormals(property) => property.to_normal(),
            PlyProperty::Dynamic(property) => property.to_normal(),
        }
    }
}
