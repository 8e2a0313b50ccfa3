//! Output rasters, written tile by tile

use gdal::cpl::CslStringList;
use gdal::raster::Buffer;
use gdal::{Dataset, Driver, DriverManager};
use std::path::Path;
use tracing::{debug, warn};

use crate::calculator::OutputGrid;
use crate::combinator::Block;
use crate::config::DataType;
use crate::error::{Error, Result};
use crate::tiles::Tile;

/// Receives result blocks at their tile position
pub trait BlockSink {
    fn write_block(&mut self, tile: &Tile, block: &Block) -> Result<()>;
}

/// Everything needed to create an output raster
#[derive(Debug, Clone)]
pub struct OutputSpec {
    pub driver: String,
    pub data_type: DataType,
    pub nodata: f64,
    /// GTiff internal tiling; ignored unless a multiple of 16
    pub block_size: Option<usize>,
}

impl OutputSpec {
    pub fn new(data_type: DataType, nodata: f64) -> Self {
        Self {
            driver: "GTiff".to_string(),
            data_type,
            nodata,
            block_size: None,
        }
    }

    fn creation_options(&self) -> Result<CslStringList> {
        let mut options = CslStringList::new();
        if self.driver == "GTiff" {
            options.set_name_value("COMPRESS", "DEFLATE")?;
            if let Some(size) = self.block_size.filter(|s| *s > 0 && s % 16 == 0) {
                options.set_name_value("TILED", "YES")?;
                options.set_name_value("BLOCKXSIZE", &size.to_string())?;
                options.set_name_value("BLOCKYSIZE", &size.to_string())?;
            }
        }
        Ok(options)
    }
}

fn create_dataset(
    driver: &Driver,
    path: &Path,
    cols: usize,
    rows: usize,
    data_type: DataType,
    options: &CslStringList,
) -> Result<Dataset> {
    let dataset = match data_type {
        DataType::Byte => {
            driver.create_with_band_type_with_options::<u8, _>(path, cols, rows, 1, options)?
        }
        DataType::UInt16 => {
            driver.create_with_band_type_with_options::<u16, _>(path, cols, rows, 1, options)?
        }
        DataType::Int16 => {
            driver.create_with_band_type_with_options::<i16, _>(path, cols, rows, 1, options)?
        }
        DataType::UInt32 => {
            driver.create_with_band_type_with_options::<u32, _>(path, cols, rows, 1, options)?
        }
        DataType::Int32 => {
            driver.create_with_band_type_with_options::<i32, _>(path, cols, rows, 1, options)?
        }
        DataType::Float32 => {
            driver.create_with_band_type_with_options::<f32, _>(path, cols, rows, 1, options)?
        }
        DataType::Float64 => {
            driver.create_with_band_type_with_options::<f64, _>(path, cols, rows, 1, options)?
        }
    };
    Ok(dataset)
}

/// Single-band GDAL output raster
pub struct GdalSink {
    dataset: Dataset,
    grid: OutputGrid,
}

impl GdalSink {
    pub fn create<P: AsRef<Path>>(path: P, grid: &OutputGrid, spec: &OutputSpec) -> Result<Self> {
        if !spec.data_type.can_represent(spec.nodata) {
            return Err(crate::config::ConfigError::NodataOutType(spec.nodata, spec.data_type).into());
        }

        let driver = DriverManager::get_driver_by_name(&spec.driver)?;
        let options = spec.creation_options()?;
        let mut dataset = create_dataset(
            &driver,
            path.as_ref(),
            grid.cols,
            grid.rows,
            spec.data_type,
            &options,
        )?;

        dataset.set_geo_transform(&grid.geo_transform)?;
        if !grid.projection.is_empty() {
            dataset.set_projection(&grid.projection)?;
        }
        dataset.rasterband(1)?.set_no_data_value(Some(spec.nodata))?;

        debug!(
            "Created {} output {} ({}x{}, {}, nodata {})",
            spec.driver,
            path.as_ref().display(),
            grid.cols,
            grid.rows,
            spec.data_type,
            spec.nodata
        );

        Ok(Self {
            dataset,
            grid: grid.clone(),
        })
    }

    /// Flush and close the output, reporting any error GDAL hits while
    /// writing the last blocks.
    pub fn close(self) -> Result<()> {
        self.dataset.close()?;
        Ok(())
    }
}

impl BlockSink for GdalSink {
    fn write_block(&mut self, tile: &Tile, block: &Block) -> Result<()> {
        if tile.row_offset + tile.rows > self.grid.rows || tile.col_offset + tile.cols > self.grid.cols
        {
            return Err(Error::TileOutOfBounds {
                row: tile.row_offset,
                col: tile.col_offset,
                rows: tile.rows,
                cols: tile.cols,
                grid_rows: self.grid.rows,
                grid_cols: self.grid.cols,
            });
        }
        if block.shape() != (tile.rows, tile.cols) {
            return Err(Error::ShapeMismatch {
                expected: (tile.rows, tile.cols),
                actual: block.shape(),
            });
        }

        let mut band = self.dataset.rasterband(1)?;
        let mut buffer = Buffer::new((tile.cols, tile.rows), block.data().to_vec());
        band.write(
            (tile.col_offset as isize, tile.row_offset as isize),
            (tile.cols, tile.rows),
            &mut buffer,
        )?;
        Ok(())
    }
}

/// Output assembled in memory, mostly for tests and summaries
#[derive(Debug, Clone)]
pub struct MemSink {
    block: Block,
}

impl MemSink {
    pub fn new(grid: &OutputGrid, nodata: f64) -> Self {
        Self {
            block: Block::filled(grid.rows, grid.cols, nodata),
        }
    }

    pub fn into_block(self) -> Block {
        self.block
    }
}

impl BlockSink for MemSink {
    fn write_block(&mut self, tile: &Tile, block: &Block) -> Result<()> {
        self.block.paste(tile, block)
    }
}

/// Create a raster on the grid of `base`, every pixel set to `fill`
pub fn new_raster_from_base<P, Q>(base: P, output: Q, spec: &OutputSpec, fill: f64) -> Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let base = Dataset::open(base.as_ref())?;
    let (cols, rows) = base.raster_size();
    let grid = OutputGrid {
        cols,
        rows,
        geo_transform: base.geo_transform()?,
        projection: base.projection(),
    };

    let sink = GdalSink::create(output, &grid, spec)?;
    sink.dataset.rasterband(1)?.fill(fill, None)?;
    sink.close()
}

/// Create an output raster, hand it to `write` and close it.
///
/// When `write` fails the partially written file is removed.
pub fn write_output<P, T, F>(path: P, grid: &OutputGrid, spec: &OutputSpec, write: F) -> Result<T>
where
    P: AsRef<Path>,
    F: FnOnce(&mut GdalSink) -> Result<T>,
{
    let path = path.as_ref();
    let mut sink = GdalSink::create(path, grid, spec)?;

    match write(&mut sink) {
        Ok(value) => {
            sink.close()?;
            Ok(value)
        }
        Err(e) => {
            drop(sink);
            if path.exists() {
                match std::fs::remove_file(path) {
                    Ok(()) => debug!("Removed partial output {}", path.display()),
                    Err(rm) => warn!("Could not remove partial output {}: {}", path.display(), rm),
                }
            }
            Err(e)
        }
    }
}
