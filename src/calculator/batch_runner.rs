use rayon::prelude::*;
use tracing::debug;

use super::plan::Plan;
use crate::combinator::{Block, BlockOp};
use crate::error::{Error, Result};
use crate::readers::BlockSource;
use crate::tiles::{Tile, TileGrid};
use crate::writers::BlockSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cols: usize,
    pub rows: usize,
    pub tiles: usize,
    pub nodata_pixels: usize,
}

/// Tiling and threading knobs for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub tile_size: usize,
    pub parallel: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            tile_size: 256,
            parallel: false,
        }
    }
}

fn count_nodata(block: &Block, nodata_out: f64) -> usize {
    block
        .data()
        .iter()
        .filter(|&&v| crate::combinator::is_nodata(v, nodata_out))
        .count()
}

/// Apply `op` to every tile of the planned grid, in row-major order, and
/// hand each result to `sink`.
///
/// In parallel mode tiles are read in batches on the calling thread,
/// combined on the rayon pool and written back in the same order, so the
/// sink sees exactly the sequence a sequential run produces.
pub fn execute(
    plan: &Plan,
    sources: &[&dyn BlockSource],
    op: &dyn BlockOp,
    options: RunOptions,
    sink: &mut dyn BlockSink,
) -> Result<RunSummary> {
    if op.input_count() != sources.len() {
        return Err(Error::InputCount {
            expected: op.input_count(),
            actual: sources.len(),
        });
    }

    let grid = TileGrid::square(plan.grid.rows, plan.grid.cols, options.tile_size);
    let tile_count = grid.tile_count();
    let mut summary = RunSummary {
        cols: plan.grid.cols,
        rows: plan.grid.rows,
        tiles: 0,
        nodata_pixels: 0,
    };

    if options.parallel {
        let batch_size = rayon::current_num_threads().max(1) * 2;
        let tiles: Vec<Tile> = grid.collect();

        for batch in tiles.chunks(batch_size) {
            let inputs = batch
                .iter()
                .map(|tile| plan.read_blocks(sources, tile))
                .collect::<Result<Vec<Vec<Block>>>>()?;

            let outputs: Vec<Result<Block>> =
                inputs.par_iter().map(|blocks| op.apply(blocks)).collect();

            for (tile, output) in batch.iter().zip(outputs) {
                let output = output?;
                summary.nodata_pixels += count_nodata(&output, op.nodata_out());
                sink.write_block(tile, &output)?;
                summary.tiles += 1;
            }
            debug!("{} {}/{} tiles", op.name(), summary.tiles, tile_count);
        }
    } else {
        for tile in grid {
            let blocks = plan.read_blocks(sources, &tile)?;
            let output = op.apply(&blocks)?;
            summary.nodata_pixels += count_nodata(&output, op.nodata_out());
            sink.write_block(&tile, &output)?;
            summary.tiles += 1;
            debug!(
                "{} tile {}/{} at ({}, {})",
                op.name(),
                summary.tiles,
                tile_count,
                tile.row_offset,
                tile.col_offset
            );
        }
    }

    Ok(summary)
}
