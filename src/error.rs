//! Error types for block-wise raster algebra

use thiserror::Error;

use crate::config::ConfigError;
use crate::readers::ReadError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("read error: {0}")]
    Read(#[from] ReadError),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no nodata value set on input '{0}'")]
    NoDataNotSet(String),

    #[error("block shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("expected {expected} input blocks, got {actual}")]
    InputCount { expected: usize, actual: usize },

    #[error("block buffer of length {len} does not fit {rows}x{cols}")]
    BufferLength { len: usize, rows: usize, cols: usize },

    #[error("output nodata {0} collides with a classification value (0 or 1)")]
    AmbiguousNodataOut(f64),

    #[error("predicate references input #{index} but only {count} inputs are bound")]
    UnboundPredicate { index: usize, count: usize },

    #[error("inputs are not aligned: {0}")]
    Misaligned(String),

    #[error("input extents do not intersect")]
    EmptyExtent,

    #[error("tile ({row}, {col}) of {rows}x{cols} lies outside the {grid_rows}x{grid_cols} grid")]
    TileOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
        grid_rows: usize,
        grid_cols: usize,
    },

    #[error("division by zero: {0}")]
    DivisionByZero(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
