use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Sample type of an output raster
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Byte,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Float64,
}

impl DataType {
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Smallest and largest representable sample
    pub fn range(&self) -> (f64, f64) {
        match self {
            DataType::Byte => (u8::MIN as f64, u8::MAX as f64),
            DataType::UInt16 => (u16::MIN as f64, u16::MAX as f64),
            DataType::Int16 => (i16::MIN as f64, i16::MAX as f64),
            DataType::UInt32 => (u32::MIN as f64, u32::MAX as f64),
            DataType::Int32 => (i32::MIN as f64, i32::MAX as f64),
            DataType::Float32 => (f32::MIN as f64, f32::MAX as f64),
            DataType::Float64 => (f64::MIN, f64::MAX),
        }
    }

    /// Whether `value` survives being stored as this type unchanged
    pub fn can_represent(&self, value: f64) -> bool {
        if value.is_nan() {
            return self.is_float();
        }
        let (min, max) = self.range();
        let in_range = (min..=max).contains(&value);
        if self.is_float() {
            in_range
        } else {
            in_range && value.fract() == 0.0
        }
    }
}

#[derive(Debug)]
pub struct DataTypeParseError(String);

impl fmt::Display for DataTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid data type '{}'", self.0)
    }
}

impl std::error::Error for DataTypeParseError {}

impl FromStr for DataType {
    type Err = DataTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "byte" | "uint8" => Ok(DataType::Byte),
            "uint16" => Ok(DataType::UInt16),
            "int16" => Ok(DataType::Int16),
            "uint32" => Ok(DataType::UInt32),
            "int32" => Ok(DataType::Int32),
            "float32" => Ok(DataType::Float32),
            "float64" => Ok(DataType::Float64),
            _ => Err(DataTypeParseError(s.to_string())),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Byte => "byte",
            DataType::UInt16 => "uint16",
            DataType::Int16 => "int16",
            DataType::UInt32 => "uint32",
            DataType::Int32 => "int32",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        };
        write!(f, "{}", name)
    }
}
