use gdal::Dataset;
use gdal::raster::GdalDataType;
use std::path::Path;
use tracing::{debug, warn};

use super::{BlockSource, RasterInfo};
use crate::combinator::Block;
use crate::config::DataType;
use crate::error::Result;

/// Band 1 of a GDAL dataset, read window by window
#[derive(Debug)]
pub struct GdalRaster {
    name: String,
    dataset: Dataset,
    info: RasterInfo,
}

fn data_type_of(band_type: GdalDataType) -> Option<DataType> {
    match band_type {
        GdalDataType::UInt8 => Some(DataType::Byte),
        GdalDataType::UInt16 => Some(DataType::UInt16),
        GdalDataType::Int16 => Some(DataType::Int16),
        GdalDataType::UInt32 => Some(DataType::UInt32),
        GdalDataType::Int32 => Some(DataType::Int32),
        GdalDataType::Float32 => Some(DataType::Float32),
        GdalDataType::Float64 => Some(DataType::Float64),
        _ => None,
    }
}

impl GdalRaster {
    /// Open `path`; `nodata` replaces whatever sentinel the file declares.
    pub fn open<P: AsRef<Path>>(path: P, name: &str, nodata: Option<f64>) -> Result<Self> {
        let path = path.as_ref();
        let dataset = Dataset::open(path)?;
        let band = dataset.rasterband(1)?;

        let (cols, rows) = dataset.raster_size();
        let geo_transform = match dataset.geo_transform() {
            Ok(gt) => gt,
            Err(e) => {
                warn!("{} has no geotransform ({}), using pixel coordinates", name, e);
                [0.0, 1.0, 0.0, 0.0, 0.0, -1.0]
            }
        };

        let file_nodata = band.no_data_value();
        if nodata.is_some() && file_nodata.is_some() && nodata != file_nodata {
            debug!(
                "{}: overriding file nodata {:?} with {:?}",
                name, file_nodata, nodata
            );
        }

        let info = RasterInfo {
            cols,
            rows,
            geo_transform,
            projection: dataset.projection(),
            nodata: nodata.or(file_nodata),
            data_type: data_type_of(band.band_type()),
        };
        drop(band);

        debug!(
            "Opened {} ({}): {}x{}, nodata {:?}",
            name,
            path.display(),
            cols,
            rows,
            info.nodata
        );

        Ok(Self {
            name: name.to_string(),
            dataset,
            info,
        })
    }
}

impl BlockSource for GdalRaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn read_window(&self, col_off: usize, row_off: usize, cols: usize, rows: usize) -> Result<Block> {
        let band = self.dataset.rasterband(1)?;
        let buffer = band.read_as::<f64>(
            (col_off as isize, row_off as isize),
            (cols, rows),
            (cols, rows),
            None,
        )?;
        Block::new(rows, cols, buffer.data().to_vec())
    }
}
