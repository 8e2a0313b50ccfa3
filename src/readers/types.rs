use std::fmt;

use crate::bbox::Bbox;
use crate::combinator::Block;
use crate::config::DataType;

/// Loads a whole raster into memory
pub trait DataReader {
    fn read_data(&self) -> Result<Data, ReadError>;
}

/// Serves aligned windows of one raster, one block at a time
pub trait BlockSource {
    fn name(&self) -> &str;

    fn info(&self) -> &RasterInfo;

    /// Read `cols` x `rows` samples starting at (`col_off`, `row_off`).
    /// The window must lie inside the raster.
    fn read_window(
        &self,
        col_off: usize,
        row_off: usize,
        cols: usize,
        rows: usize,
    ) -> crate::Result<Block>;
}

#[derive(Debug)]
pub enum ReadError {
    GeoTiff(String),
    NotFound(String),
    Pattern(String),
    UnsupportedLayout(String),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::GeoTiff(msg) => write!(f, "GeoTIFF: {}", msg),
            ReadError::NotFound(path) => write!(f, "raster not found: {}", path),
            ReadError::Pattern(msg) => write!(f, "invalid path pattern: {}", msg),
            ReadError::UnsupportedLayout(msg) => write!(f, "unsupported raster layout: {}", msg),
        }
    }
}

impl std::error::Error for ReadError {}

#[derive(Debug)]
pub enum FileError {
    UnknownFileType,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::UnknownFileType => write!(f, "unknown raster file type"),
        }
    }
}

impl std::error::Error for FileError {}

pub enum FileType {
    GeoTiff,
}

/// Grid description shared by every raster source
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub cols: usize,
    pub rows: usize,
    pub geo_transform: [f64; 6],
    /// WKT, empty when the source declares none
    pub projection: String,
    pub nodata: Option<f64>,
    pub data_type: Option<DataType>,
}

impl RasterInfo {
    pub fn extent(&self) -> Result<Bbox, String> {
        Bbox::from_geo_transform(&self.geo_transform, self.cols, self.rows)
    }

    /// (width, height) of one pixel, both positive for a north-up grid
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.geo_transform[1], -self.geo_transform[5])
    }

    pub fn is_north_up(&self) -> bool {
        self.geo_transform[2] == 0.0
            && self.geo_transform[4] == 0.0
            && self.geo_transform[1] > 0.0
            && self.geo_transform[5] < 0.0
    }
}

#[derive(Debug)]
pub struct Data {
    pub width: u32,
    pub height: u32,
    pub buffer: Vec<f64>,
    pub nodata: Option<f64>,
    pub geo_transform: Option<[f64; 6]>,
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let valid = || {
            self.buffer
                .iter()
                .copied()
                .filter(|x| !x.is_nan() && Some(*x) != self.nodata)
        };

        let min_value = valid().reduce(f64::min).unwrap_or(f64::NAN);
        let max_value = valid().reduce(f64::max).unwrap_or(f64::NAN);

        write!(
            f,
            "Width: {}\nHeight: {}\nBuffer Length: {}\nNodata: {:?}\nMin value: {}\nMax value: {}",
            self.width,
            self.height,
            self.buffer.len(),
            self.nodata,
            min_value,
            max_value,
        )
    }
}
