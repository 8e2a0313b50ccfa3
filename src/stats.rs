//! Pixel tallies over whole rasters: area ratios, class counts and value
//! summaries.

use std::fmt;

use crate::combinator::{Block, PixelClass, Predicate, is_nodata};
use crate::error::{Error, Result};
use crate::readers::BlockSource;
use crate::tiles::TileGrid;

/// ROI pixels and the subset of them that satisfy a predicate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AreaTally {
    pub roi_pixels: usize,
    pub matching_pixels: usize,
}

impl AreaTally {
    pub fn add(&mut self, other: AreaTally) {
        self.roi_pixels += other.roi_pixels;
        self.matching_pixels += other.matching_pixels;
    }

    pub fn ratio(&self) -> Result<f64> {
        if self.roi_pixels == 0 {
            return Err(Error::DivisionByZero("region of interest has no pixels"));
        }
        Ok(self.matching_pixels as f64 / self.roi_pixels as f64)
    }

    pub fn percentage(&self) -> Result<f64> {
        Ok(self.ratio()? * 100.0)
    }

    /// Tally one pair of aligned blocks. Pixels where `values` is nodata
    /// are left out of both counts.
    pub fn from_blocks(
        roi: &Block,
        values: &Block,
        roi_value: f64,
        values_nodata: Option<f64>,
        predicate: &Predicate,
    ) -> Result<Self> {
        if roi.shape() != values.shape() {
            return Err(Error::ShapeMismatch {
                expected: roi.shape(),
                actual: values.shape(),
            });
        }

        let mut tally = AreaTally::default();
        for (&r, &v) in roi.data().iter().zip(values.data()) {
            if r != roi_value || is_nodata(v, values_nodata.unwrap_or(f64::NAN)) {
                continue;
            }
            tally.roi_pixels += 1;
            if predicate.test(v) {
                tally.matching_pixels += 1;
            }
        }
        Ok(tally)
    }
}

/// Count ROI pixels (`roi == roi_value`) and those whose `values` sample
/// satisfies `predicate`, reading both rasters tile by tile.
pub fn area_ratio(
    roi: &dyn BlockSource,
    values: &dyn BlockSource,
    roi_value: f64,
    predicate: &Predicate,
    tile_size: usize,
) -> Result<AreaTally> {
    let (ri, vi) = (roi.info(), values.info());
    if (ri.rows, ri.cols) != (vi.rows, vi.cols) {
        return Err(Error::ShapeMismatch {
            expected: (ri.rows, ri.cols),
            actual: (vi.rows, vi.cols),
        });
    }

    let mut tally = AreaTally::default();
    for tile in TileGrid::square(ri.rows, ri.cols, tile_size) {
        let r = roi.read_window(tile.col_offset, tile.row_offset, tile.cols, tile.rows)?;
        let v = values.read_window(tile.col_offset, tile.row_offset, tile.cols, tile.rows)?;
        tally.add(AreaTally::from_blocks(&r, &v, roi_value, vi.nodata, predicate)?);
    }

    Ok(tally)
}

/// Pixel counts of a classification output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassCounts {
    pub matches: usize,
    pub no_matches: usize,
    pub nodata: usize,
    /// Values that are none of 0, 1 or nodata_out
    pub other: usize,
}

impl ClassCounts {
    pub fn from_block(block: &Block, nodata_out: f64) -> Self {
        let mut counts = ClassCounts::default();
        counts.add_block(block, nodata_out);
        counts
    }

    fn add_block(&mut self, block: &Block, nodata_out: f64) {
        for &value in block.data() {
            match PixelClass::from_value(value, nodata_out) {
                Some(PixelClass::Match) => self.matches += 1,
                Some(PixelClass::NoMatch) => self.no_matches += 1,
                Some(PixelClass::NoData) => self.nodata += 1,
                None => self.other += 1,
            }
        }
    }

    pub fn valid(&self) -> usize {
        self.matches + self.no_matches
    }

    /// Share of valid pixels that matched
    pub fn match_fraction(&self) -> Result<f64> {
        if self.valid() == 0 {
            return Err(Error::DivisionByZero("no valid pixels"));
        }
        Ok(self.matches as f64 / self.valid() as f64)
    }
}

impl fmt::Display for ClassCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "match: {}, no match: {}, nodata: {}",
            self.matches, self.no_matches, self.nodata
        )?;
        if self.other > 0 {
            write!(f, ", unexpected: {}", self.other)?;
        }
        Ok(())
    }
}

pub fn class_counts(source: &dyn BlockSource, nodata_out: f64, tile_size: usize) -> Result<ClassCounts> {
    let info = source.info();
    let mut counts = ClassCounts::default();
    for tile in TileGrid::square(info.rows, info.cols, tile_size) {
        let block = source.read_window(tile.col_offset, tile.row_offset, tile.cols, tile.rows)?;
        counts.add_block(&block, nodata_out);
    }
    Ok(counts)
}

/// Min, max and mean of the valid samples of a raster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub valid: usize,
    pub total: usize,
}

impl RasterSummary {
    pub fn from_source(source: &dyn BlockSource, tile_size: usize) -> Result<Self> {
        let info = source.info();
        let nodata = info.nodata.unwrap_or(f64::NAN);

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut valid = 0;

        for tile in TileGrid::square(info.rows, info.cols, tile_size) {
            let block = source.read_window(tile.col_offset, tile.row_offset, tile.cols, tile.rows)?;
            for &v in block.data().iter().filter(|&&v| !is_nodata(v, nodata)) {
                min = min.min(v);
                max = max.max(v);
                sum += v;
                valid += 1;
            }
        }

        if valid == 0 {
            (min, max) = (f64::NAN, f64::NAN);
        }

        Ok(Self {
            min,
            max,
            mean: if valid == 0 { f64::NAN } else { sum / valid as f64 },
            valid,
            total: info.rows * info.cols,
        })
    }
}

struct Stat(f64);

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_nan() {
            write!(f, "n/a")
        } else {
            write!(f, "{:.2}", self.0)
        }
    }
}

impl fmt::Display for RasterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Min: {}", Stat(self.min))?;
        writeln!(f, "  Max: {}", Stat(self.max))?;
        writeln!(f, "  Mean: {}", Stat(self.mean))?;
        let share = if self.total == 0 {
            0.0
        } else {
            100.0 * self.valid as f64 / self.total as f64
        };
        write!(
            f,
            "  Valid pixels: {} / {} ({:.1}%)",
            self.valid, self.total, share
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::MemRaster;

    fn raster(name: &str, rows: usize, cols: usize, data: Vec<f64>, nodata: Option<f64>) -> MemRaster {
        MemRaster::new(
            name,
            Block::new(rows, cols, data).unwrap(),
            [0.0, 30.0, 0.0, 0.0, 0.0, -30.0],
            nodata,
        )
    }

    #[test]
    fn test_area_ratio_above_threshold() {
        let roi = raster("roi", 2, 3, vec![1.0, 1.0, 0.0, 1.0, 1.0, 0.0], Some(0.0));
        let dem = raster("dem", 2, 3, vec![3600.0, 3400.0, 4000.0, 3500.0, -9999.0, 3700.0], Some(-9999.0));

        let tally = area_ratio(&roi, &dem, 1.0, &Predicate::at_least(3500.0), 2).unwrap();

        // the nodata DEM pixel is outside the count
        assert_eq!(tally.roi_pixels, 3);
        assert_eq!(tally.matching_pixels, 2);
        assert!((tally.percentage().unwrap() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_area_ratio_tile_size_does_not_matter() {
        let n = 17 * 11;
        let roi = raster("roi", 17, 11, (0..n).map(|i| (i % 3 == 0) as u8 as f64).collect(), None);
        let dem = raster("dem", 17, 11, (0..n).map(|i| (i * 97 % 5000) as f64).collect(), None);
        let predicate = Predicate::at_least(2500.0);

        let whole = area_ratio(&roi, &dem, 1.0, &predicate, 1024).unwrap();
        for tile_size in [1, 4, 7] {
            assert_eq!(area_ratio(&roi, &dem, 1.0, &predicate, tile_size).unwrap(), whole);
        }
    }

    #[test]
    fn test_empty_roi_is_division_by_zero() {
        let roi = raster("roi", 2, 2, vec![0.0; 4], Some(0.0));
        let dem = raster("dem", 2, 2, vec![4000.0; 4], None);

        let tally = area_ratio(&roi, &dem, 1.0, &Predicate::at_least(3500.0), 256).unwrap();
        assert_eq!(tally.roi_pixels, 0);
        assert!(matches!(tally.ratio(), Err(Error::DivisionByZero(_))));
        assert!(matches!(tally.percentage(), Err(Error::DivisionByZero(_))));
    }

    #[test]
    fn test_area_ratio_needs_same_shape() {
        let roi = raster("roi", 2, 2, vec![1.0; 4], None);
        let dem = raster("dem", 2, 3, vec![1.0; 6], None);
        assert!(matches!(
            area_ratio(&roi, &dem, 1.0, &Predicate::at_least(0.0), 256),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_class_counts() {
        let block = Block::new(2, 3, vec![1.0, 0.0, -1.0, 1.0, 1.0, 7.0]).unwrap();
        let counts = ClassCounts::from_block(&block, -1.0);

        assert_eq!(
            counts,
            ClassCounts {
                matches: 3,
                no_matches: 1,
                nodata: 1,
                other: 1
            }
        );
        assert_eq!(counts.match_fraction().unwrap(), 0.75);

        let source = raster("out", 2, 3, block.into_vec(), Some(-1.0));
        assert_eq!(class_counts(&source, -1.0, 2).unwrap(), counts);
    }

    #[test]
    fn test_match_fraction_without_valid_pixels() {
        let counts = ClassCounts::from_block(&Block::filled(3, 3, -1.0), -1.0);
        assert_eq!(counts.nodata, 9);
        assert!(matches!(counts.match_fraction(), Err(Error::DivisionByZero(_))));
    }

    #[test]
    fn test_raster_summary_skips_nodata() {
        let source = raster("dem", 2, 2, vec![10.0, -9999.0, 30.0, f64::NAN], Some(-9999.0));
        let summary = RasterSummary::from_source(&source, 1).unwrap();

        assert_eq!(summary.valid, 2);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.max, 30.0);
        assert_eq!(summary.mean, 20.0);
        assert!(summary.to_string().contains("Valid pixels: 2 / 4 (50.0%)"));
    }

    #[test]
    fn test_raster_summary_without_valid_pixels() {
        let source = raster("dem", 1, 3, vec![-9999.0; 3], Some(-9999.0));
        let summary = RasterSummary::from_source(&source, 256).unwrap();

        assert_eq!(summary.valid, 0);
        assert!(summary.min.is_nan());
        assert!(summary.max.is_nan());
        assert!(summary.mean.is_nan());

        let text = summary.to_string();
        assert!(text.contains("Min: n/a"));
        assert!(text.contains("Max: n/a"));
        assert!(!text.contains("inf"));
    }
}
