use super::predicate::BoundPredicate;

/// Outcome of classifying one pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelClass {
    NoData,
    NoMatch,
    Match,
}

impl PixelClass {
    pub fn to_value(self, nodata_out: f64) -> f64 {
        match self {
            PixelClass::NoData => nodata_out,
            PixelClass::NoMatch => 0.0,
            PixelClass::Match => 1.0,
        }
    }

    pub fn from_value(value: f64, nodata_out: f64) -> Option<Self> {
        if is_nodata(value, nodata_out) {
            Some(PixelClass::NoData)
        } else if value == 0.0 {
            Some(PixelClass::NoMatch)
        } else if value == 1.0 {
            Some(PixelClass::Match)
        } else {
            None
        }
    }
}

/// A sample is missing when it equals the sentinel or is NaN.
pub fn is_nodata(value: f64, nodata: f64) -> bool {
    value.is_nan() || value == nodata
}

/// True only when every sample differs from its own sentinel.
pub fn all_valid(samples: &[f64], nodata: &[f64]) -> bool {
    samples
        .iter()
        .zip(nodata)
        .all(|(&value, &nd)| !is_nodata(value, nd))
}

pub fn classify_pixel(samples: &[f64], nodata: &[f64], predicates: &[BoundPredicate]) -> PixelClass {
    if !all_valid(samples, nodata) {
        return PixelClass::NoData;
    }

    if predicates
        .iter()
        .all(|bound| bound.predicate.test(samples[bound.input]))
    {
        PixelClass::Match
    } else {
        PixelClass::NoMatch
    }
}

/// Largest valid sample, or `None` when every input is nodata.
pub fn merge_max_pixel(samples: &[f64], nodata: &[f64]) -> Option<f64> {
    samples
        .iter()
        .zip(nodata)
        .filter(|&(&value, &nd)| !is_nodata(value, nd))
        .map(|(&value, _)| value)
        .reduce(f64::max)
}
