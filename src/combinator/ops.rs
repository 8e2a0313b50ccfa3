use super::block::Block;
use super::pixel::{all_valid, classify_pixel, merge_max_pixel};
use super::predicate::BoundPredicate;
use crate::error::{Error, Result};

/// A per-pixel operation over aligned blocks, one block per bound input.
///
/// Implementations carry their input sentinels and output nodata, bound once
/// when the operation is built, and never depend on neighbouring pixels or
/// on which tile they are called for.
pub trait BlockOp: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of input blocks `apply` expects
    fn input_count(&self) -> usize;

    fn nodata_out(&self) -> f64;

    fn apply(&self, blocks: &[Block]) -> Result<Block>;
}

fn check_blocks(blocks: &[Block], expected: usize) -> Result<(usize, usize)> {
    if blocks.len() != expected {
        return Err(Error::InputCount {
            expected,
            actual: blocks.len(),
        });
    }

    let Some((first, rest)) = blocks.split_first() else {
        return Err(Error::InputCount {
            expected: 1,
            actual: 0,
        });
    };

    let shape = first.shape();
    for block in rest {
        if block.shape() != shape {
            return Err(Error::ShapeMismatch {
                expected: shape,
                actual: block.shape(),
            });
        }
    }

    Ok(shape)
}

/// Run `pixel` over every position, handing it the samples of all blocks.
fn map_pixels<F>(blocks: &[Block], mut pixel: F) -> Result<Block>
where
    F: FnMut(&[f64]) -> f64,
{
    let (rows, cols) = blocks[0].shape();
    let mut samples = vec![0.0; blocks.len()];

    let data = (0..rows * cols)
        .map(|index| {
            for (sample, block) in samples.iter_mut().zip(blocks) {
                *sample = block.data()[index];
            }
            pixel(&samples)
        })
        .collect();

    Block::new(rows, cols, data)
}

/// Ternary classification: nodata where any input is nodata, otherwise 1
/// when every predicate holds and 0 when one fails.
#[derive(Debug, Clone)]
pub struct Classifier {
    nodata: Vec<f64>,
    predicates: Vec<BoundPredicate>,
    nodata_out: f64,
}

impl Classifier {
    pub fn new(nodata: Vec<f64>, predicates: Vec<BoundPredicate>, nodata_out: f64) -> Result<Self> {
        if nodata.is_empty() {
            return Err(Error::InputCount {
                expected: 1,
                actual: 0,
            });
        }
        if nodata_out == 0.0 || nodata_out == 1.0 {
            return Err(Error::AmbiguousNodataOut(nodata_out));
        }
        if let Some(bound) = predicates.iter().find(|p| p.input >= nodata.len()) {
            return Err(Error::UnboundPredicate {
                index: bound.input,
                count: nodata.len(),
            });
        }

        Ok(Self {
            nodata,
            predicates,
            nodata_out,
        })
    }
}

impl BlockOp for Classifier {
    fn name(&self) -> &'static str {
        "classify"
    }

    fn input_count(&self) -> usize {
        self.nodata.len()
    }

    fn nodata_out(&self) -> f64 {
        self.nodata_out
    }

    fn apply(&self, blocks: &[Block]) -> Result<Block> {
        check_blocks(blocks, self.nodata.len())?;
        map_pixels(blocks, |samples| {
            classify_pixel(samples, &self.nodata, &self.predicates).to_value(self.nodata_out)
        })
    }
}

/// Mosaic: the largest valid sample wins, nodata only where all inputs are.
#[derive(Debug, Clone)]
pub struct MaxMerge {
    nodata: Vec<f64>,
    nodata_out: f64,
}

impl MaxMerge {
    pub fn new(nodata: Vec<f64>, nodata_out: f64) -> Result<Self> {
        if nodata.is_empty() {
            return Err(Error::InputCount {
                expected: 1,
                actual: 0,
            });
        }
        Ok(Self { nodata, nodata_out })
    }
}

impl BlockOp for MaxMerge {
    fn name(&self) -> &'static str {
        "merge_max"
    }

    fn input_count(&self) -> usize {
        self.nodata.len()
    }

    fn nodata_out(&self) -> f64 {
        self.nodata_out
    }

    fn apply(&self, blocks: &[Block]) -> Result<Block> {
        check_blocks(blocks, self.nodata.len())?;
        map_pixels(blocks, |samples| {
            merge_max_pixel(samples, &self.nodata).unwrap_or(self.nodata_out)
        })
    }
}

/// Keep the first input's samples where the mask input also has data.
#[derive(Debug, Clone)]
pub struct Clip {
    nodata: [f64; 2],
    nodata_out: f64,
}

impl Clip {
    pub fn new(value_nodata: f64, mask_nodata: f64, nodata_out: f64) -> Self {
        Self {
            nodata: [value_nodata, mask_nodata],
            nodata_out,
        }
    }
}

impl BlockOp for Clip {
    fn name(&self) -> &'static str {
        "clip"
    }

    fn input_count(&self) -> usize {
        2
    }

    fn nodata_out(&self) -> f64 {
        self.nodata_out
    }

    fn apply(&self, blocks: &[Block]) -> Result<Block> {
        check_blocks(blocks, 2)?;
        map_pixels(blocks, |samples| {
            if all_valid(samples, &self.nodata) {
                samples[0]
            } else {
                self.nodata_out
            }
        })
    }
}

/// Arbitrary pixel function, only called where every input is valid.
pub struct MaskedFn<F> {
    nodata: Vec<f64>,
    nodata_out: f64,
    pixel: F,
}

impl<F> MaskedFn<F>
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    pub fn new(nodata: Vec<f64>, nodata_out: f64, pixel: F) -> Result<Self> {
        if nodata.is_empty() {
            return Err(Error::InputCount {
                expected: 1,
                actual: 0,
            });
        }
        Ok(Self {
            nodata,
            nodata_out,
            pixel,
        })
    }
}

impl<F> BlockOp for MaskedFn<F>
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn name(&self) -> &'static str {
        "masked_fn"
    }

    fn input_count(&self) -> usize {
        self.nodata.len()
    }

    fn nodata_out(&self) -> f64 {
        self.nodata_out
    }

    fn apply(&self, blocks: &[Block]) -> Result<Block> {
        check_blocks(blocks, self.nodata.len())?;
        map_pixels(blocks, |samples| {
            if all_valid(samples, &self.nodata) {
                (self.pixel)(samples)
            } else {
                self.nodata_out
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::predicate::Predicate;
    use crate::tiles::TileGrid;

    fn block(rows: usize, cols: usize, data: &[f64]) -> Block {
        Block::new(rows, cols, data.to_vec()).unwrap()
    }

    fn grassland_classifier() -> Classifier {
        Classifier::new(
            vec![255.0, -9999.0, -1.0],
            vec![
                BoundPredicate::new(0, Predicate::equal_to(10.0)),
                BoundPredicate::new(1, Predicate::at_least(2000.0)),
                BoundPredicate::new(2, Predicate::at_most(300.0)),
            ],
            -1.0,
        )
        .unwrap()
    }

    #[test]
    fn test_classify_block() {
        let lulc = block(2, 3, &[10.0, 10.0, 255.0, 10.0, 20.0, 10.0]);
        let dem = block(2, 3, &[2100.0, 1500.0, 2100.0, -9999.0, 2500.0, 2000.0]);
        let dist = block(2, 3, &[150.0, 150.0, 150.0, 10.0, 10.0, 300.0]);

        let out = grassland_classifier().apply(&[lulc, dem, dist]).unwrap();

        assert_eq!(out.shape(), (2, 3));
        assert_eq!(out.data(), &[1.0, 0.0, -1.0, -1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_classify_rejects_shape_mismatch() {
        let a = block(2, 2, &[10.0; 4]);
        let b = block(2, 2, &[2100.0; 4]);
        let c = block(1, 4, &[150.0; 4]);

        assert!(matches!(
            grassland_classifier().apply(&[a, b, c]),
            Err(Error::ShapeMismatch {
                expected: (2, 2),
                actual: (1, 4)
            })
        ));
    }

    #[test]
    fn test_classify_rejects_wrong_input_count() {
        let a = block(1, 1, &[10.0]);
        assert!(matches!(
            grassland_classifier().apply(&[a]),
            Err(Error::InputCount {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_classifier_construction_errors() {
        assert!(matches!(
            Classifier::new(vec![0.0], vec![], 0.0),
            Err(Error::AmbiguousNodataOut(_))
        ));
        assert!(matches!(
            Classifier::new(vec![0.0], vec![], 1.0),
            Err(Error::AmbiguousNodataOut(_))
        ));
        assert!(matches!(
            Classifier::new(
                vec![0.0],
                vec![BoundPredicate::new(1, Predicate::at_least(1.0))],
                -1.0
            ),
            Err(Error::UnboundPredicate { index: 1, count: 1 })
        ));
    }

    #[test]
    fn test_merge_max_block() {
        let north = block(2, 2, &[100.0, -1.0, 300.0, -1.0]);
        let south = block(2, 2, &[150.0, 200.0, -1.0, -1.0]);

        let merge = MaxMerge::new(vec![-1.0, -1.0], -1.0).unwrap();
        let out = merge.apply(&[north, south]).unwrap();

        assert_eq!(out.data(), &[150.0, 200.0, 300.0, -1.0]);
    }

    #[test]
    fn test_merge_with_different_sentinels() {
        let a = block(1, 3, &[0.0, 5.0, 0.0]);
        let b = block(1, 3, &[-9999.0, -9999.0, 7.0]);

        let merge = MaxMerge::new(vec![0.0, -9999.0], -32768.0).unwrap();
        let out = merge.apply(&[a, b]).unwrap();

        assert_eq!(out.data(), &[-32768.0, 5.0, 7.0]);
    }

    #[test]
    fn test_clip_block() {
        let lulc = block(1, 4, &[1.0, 2.0, 255.0, 4.0]);
        let extent = block(1, 4, &[0.0, 255.0, 0.0, 0.0]);

        let out = Clip::new(255.0, 255.0, 255.0).apply(&[lulc, extent]).unwrap();

        assert_eq!(out.data(), &[1.0, 255.0, 255.0, 4.0]);
    }

    #[test]
    fn test_masked_fn_only_sees_valid_pixels() {
        let a = block(1, 3, &[1.0, -1.0, 3.0]);
        let b = block(1, 3, &[10.0, 20.0, -1.0]);

        let sum = MaskedFn::new(vec![-1.0, -1.0], -1.0, |samples: &[f64]| {
            assert!(samples.iter().all(|&s| s != -1.0));
            samples.iter().sum()
        })
        .unwrap();
        let out = sum.apply(&[a, b]).unwrap();

        assert_eq!(out.data(), &[11.0, -1.0, -1.0]);
    }

    #[test]
    fn test_tile_partition_does_not_change_result() {
        let rows = 7;
        let cols = 9;
        let lulc: Vec<f64> = (0..rows * cols)
            .map(|i| if i % 11 == 0 { 255.0 } else if i % 3 == 0 { 20.0 } else { 10.0 })
            .collect();
        let dem: Vec<f64> = (0..rows * cols)
            .map(|i| if i % 13 == 0 { -9999.0 } else { 1800.0 + (i * 17 % 400) as f64 })
            .collect();
        let dist: Vec<f64> = (0..rows * cols).map(|i| (i * 29 % 500) as f64).collect();
        let inputs = [
            block(rows, cols, &lulc),
            block(rows, cols, &dem),
            block(rows, cols, &dist),
        ];

        let op = grassland_classifier();
        let whole = op.apply(&inputs).unwrap();
        assert_eq!(op.apply(&inputs).unwrap(), whole);

        for (tile_rows, tile_cols) in [(1, 1), (2, 3), (4, 4), (7, 2), (3, 9)] {
            let mut stitched = Block::filled(rows, cols, f64::NAN);
            for tile in TileGrid::new(rows, cols, tile_rows, tile_cols) {
                let windows: Vec<Block> = inputs.iter().map(|b| b.window(&tile).unwrap()).collect();
                stitched.paste(&tile, &op.apply(&windows).unwrap()).unwrap();
            }
            assert_eq!(stitched, whole, "tiles {tile_rows}x{tile_cols}");
        }
    }

    #[test]
    fn test_masked_fn_needs_an_input() {
        let empty = MaskedFn::new(Vec::new(), -1.0, |_: &[f64]| 0.0);
        assert!(matches!(
            empty,
            Err(Error::InputCount {
                expected: 1,
                actual: 0
            })
        ));
    }

    #[test]
    fn test_no_blocks_is_an_error() {
        assert!(matches!(
            check_blocks(&[], 0),
            Err(Error::InputCount {
                expected: 1,
                actual: 0
            })
        ));
    }
}
