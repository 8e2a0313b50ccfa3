use crate::config::Operation;
use crate::config::data_type::DataType;

use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    NoInputs,
    DuplicateInput(String),
    UnknownInput(String),
    AmbiguousNodataOut(f64),
    NodataOutType(f64, DataType),
    ClipArity(usize),
    TileSize,
    PixelSize(f64),
    AmbiguousInput(String, usize),
    PredicatesNotAllowed(Operation),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Json(e) => write!(f, "Failed to parse JSON: {}", e),
            ConfigError::NoInputs => write!(f, "at least one input raster is required"),
            ConfigError::DuplicateInput(name) => write!(f, "input '{}' is declared twice", name),
            ConfigError::UnknownInput(name) => {
                write!(f, "predicate refers to unknown input '{}'", name)
            }
            ConfigError::AmbiguousNodataOut(v) => {
                write!(f, "nodata_out {} collides with classification values 0 and 1", v)
            }
            ConfigError::NodataOutType(v, data_type) => {
                write!(f, "nodata_out {} cannot be stored as {}", v, data_type)
            }
            ConfigError::ClipArity(n) => {
                write!(f, "clip needs exactly 2 inputs (values, mask), got {}", n)
            }
            ConfigError::TileSize => write!(f, "tile_size should be greater than 0"),
            ConfigError::PixelSize(v) => write!(f, "pixel_size should be positive, got {}", v),
            ConfigError::AmbiguousInput(name, n) => write!(
                f,
                "input '{}' matches {} files, only merge_max accepts several",
                name, n
            ),
            ConfigError::PredicatesNotAllowed(operation) => {
                write!(f, "predicates only apply to classify, not {}", operation)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> ConfigError {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> ConfigError {
        ConfigError::Json(err)
    }
}
