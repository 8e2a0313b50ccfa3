use crate::error::{Error, Result};
use crate::tiles::Tile;

/// One aligned tile of raster samples, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Block {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::BufferLength {
                len: data.len(),
                rows,
                cols,
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    fn check_fits(&self, tile: &Tile) -> Result<()> {
        if tile.row_offset + tile.rows > self.rows || tile.col_offset + tile.cols > self.cols {
            return Err(Error::TileOutOfBounds {
                row: tile.row_offset,
                col: tile.col_offset,
                rows: tile.rows,
                cols: tile.cols,
                grid_rows: self.rows,
                grid_cols: self.cols,
            });
        }
        Ok(())
    }

    /// Copy out the samples covered by `tile`
    pub fn window(&self, tile: &Tile) -> Result<Block> {
        self.check_fits(tile)?;

        let mut data = Vec::with_capacity(tile.len());
        for row in tile.row_offset..tile.row_offset + tile.rows {
            let start = row * self.cols + tile.col_offset;
            data.extend_from_slice(&self.data[start..start + tile.cols]);
        }

        Block::new(tile.rows, tile.cols, data)
    }

    /// Write `block` into this block at the position of `tile`
    pub fn paste(&mut self, tile: &Tile, block: &Block) -> Result<()> {
        self.check_fits(tile)?;
        if block.shape() != (tile.rows, tile.cols) {
            return Err(Error::ShapeMismatch {
                expected: (tile.rows, tile.cols),
                actual: block.shape(),
            });
        }

        for local_row in 0..tile.rows {
            let dst = (tile.row_offset + local_row) * self.cols + tile.col_offset;
            let src = local_row * block.cols;
            self.data[dst..dst + tile.cols].copy_from_slice(&block.data[src..src + tile.cols]);
        }

        Ok(())
    }
}
