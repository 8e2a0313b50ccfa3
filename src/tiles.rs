//! Row-major tiling of a raster grid

/// A rectangular window of the output grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub row_offset: usize,
    pub col_offset: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Tile {
    pub fn new(row_offset: usize, col_offset: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_offset,
            col_offset,
            rows,
            cols,
        }
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Iterator over tiles covering a grid, top-to-bottom then left-to-right.
///
/// Edge tiles are truncated to the grid. A grid with zero rows or columns
/// yields no tiles.
#[derive(Debug, Clone)]
pub struct TileGrid {
    total_rows: usize,
    total_cols: usize,
    tile_rows: usize,
    tile_cols: usize,
    current_row: usize,
    current_col: usize,
}

impl TileGrid {
    pub fn new(total_rows: usize, total_cols: usize, tile_rows: usize, tile_cols: usize) -> Self {
        Self {
            total_rows,
            total_cols,
            tile_rows: tile_rows.max(1),
            tile_cols: tile_cols.max(1),
            current_row: 0,
            current_col: 0,
        }
    }

    pub fn square(total_rows: usize, total_cols: usize, tile_size: usize) -> Self {
        Self::new(total_rows, total_cols, tile_size, tile_size)
    }

    pub fn tile_count(&self) -> usize {
        self.total_rows.div_ceil(self.tile_rows) * self.total_cols.div_ceil(self.tile_cols)
    }
}

impl Iterator for TileGrid {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let rows = self.tile_rows.min(self.total_rows - self.current_row);
        let cols = self.tile_cols.min(self.total_cols - self.current_col);
        let tile = Tile::new(self.current_row, self.current_col, rows, cols);

        self.current_col += self.tile_cols;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row += self.tile_rows;
        }

        Some(tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiles_cover_grid_in_row_major_order() {
        let tiles: Vec<Tile> = TileGrid::new(5, 7, 2, 3).collect();

        assert_eq!(tiles.len(), 9);
        assert_eq!(tiles[0], Tile::new(0, 0, 2, 3));
        assert_eq!(tiles[1], Tile::new(0, 3, 2, 3));
        assert_eq!(tiles[2], Tile::new(0, 6, 2, 1));
        assert_eq!(tiles[3], Tile::new(2, 0, 2, 3));
        assert_eq!(tiles[8], Tile::new(4, 6, 1, 1));

        let covered: usize = tiles.iter().map(Tile::len).sum();
        assert_eq!(covered, 35);
    }

    #[test]
    fn test_tile_count_matches_iteration() {
        let grid = TileGrid::square(1000, 513, 256);
        assert_eq!(grid.tile_count(), grid.clone().count());
        assert_eq!(grid.tile_count(), 4 * 3);
    }

    #[test]
    fn test_empty_grid_yields_nothing() {
        assert_eq!(TileGrid::square(0, 10, 4).count(), 0);
        assert_eq!(TileGrid::square(10, 0, 4).count(), 0);
    }

    #[test]
    fn test_tile_larger_than_grid() {
        let tiles: Vec<Tile> = TileGrid::square(3, 4, 256).collect();
        assert_eq!(tiles, vec![Tile::new(0, 0, 3, 4)]);
    }
}
