use super::{BlockSource, Data, RasterInfo};
use crate::combinator::Block;
use crate::error::Result;
use crate::tiles::Tile;

/// A raster held entirely in memory
#[derive(Debug, Clone)]
pub struct MemRaster {
    name: String,
    info: RasterInfo,
    block: Block,
}

impl MemRaster {
    pub fn new(name: &str, block: Block, geo_transform: [f64; 6], nodata: Option<f64>) -> Self {
        let (rows, cols) = block.shape();
        Self {
            name: name.to_string(),
            info: RasterInfo {
                cols,
                rows,
                geo_transform,
                projection: String::new(),
                nodata,
                data_type: None,
            },
            block,
        }
    }

    /// Wrap a whole-image read; rasters without georeferencing get a unit
    /// pixel grid anchored at the origin.
    pub fn from_data(name: &str, data: Data) -> Result<Self> {
        let block = Block::new(data.height as usize, data.width as usize, data.buffer)?;
        let geo_transform = data
            .geo_transform
            .unwrap_or([0.0, 1.0, 0.0, 0.0, 0.0, -1.0]);
        Ok(Self::new(name, block, geo_transform, data.nodata))
    }

    pub fn with_projection(mut self, wkt: &str) -> Self {
        self.info.projection = wkt.to_string();
        self
    }

    pub fn block(&self) -> &Block {
        &self.block
    }
}

impl BlockSource for MemRaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn read_window(&self, col_off: usize, row_off: usize, cols: usize, rows: usize) -> Result<Block> {
        self.block.window(&Tile::new(row_off, col_off, rows, cols))
    }
}
