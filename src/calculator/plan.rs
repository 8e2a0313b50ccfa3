use gdal::spatial_ref::SpatialRef;
use tracing::{debug, info};

use crate::bbox::Bbox;
use crate::combinator::Block;
use crate::config::BoundingBoxMode;
use crate::error::{Error, Result};
use crate::readers::BlockSource;
use crate::tiles::Tile;

// Tolerances in pixel units
const PIXEL_SIZE_TOLERANCE: f64 = 1e-6;
const LATTICE_TOLERANCE: f64 = 1e-3;

/// Pixel grid of the output raster
#[derive(Debug, Clone, PartialEq)]
pub struct OutputGrid {
    pub cols: usize,
    pub rows: usize,
    pub geo_transform: [f64; 6],
    pub projection: String,
}

/// Where each input sits on the output grid, and its resolved sentinel.
#[derive(Debug, Clone)]
pub struct Plan {
    pub grid: OutputGrid,
    pub nodata: Vec<f64>,
    /// (col, row) shift: input pixel = output pixel + shift
    pub offsets: Vec<(i64, i64)>,
}

fn same_size(a: f64, b: f64) -> bool {
    (a - b).abs() <= PIXEL_SIZE_TOLERANCE * a.abs().max(b.abs())
}

/// Parse a WKT or user-input CRS string ("EPSG:32611", PROJ strings)
fn parse_crs(source: &dyn BlockSource) -> Result<SpatialRef> {
    SpatialRef::from_definition(&source.info().projection).map_err(|e| {
        Error::Misaligned(format!("{} has an unreadable projection: {}", source.name(), e))
    })
}

fn on_lattice(delta: f64, pixel: f64) -> bool {
    let steps = delta / pixel;
    (steps - steps.round()).abs() <= LATTICE_TOLERANCE
}

/// Work out the output grid for `sources` and check they can be combined
/// pixel for pixel without resampling.
///
/// Every input must declare a nodata value; this is checked before any
/// pixel is read.
pub fn plan(
    sources: &[&dyn BlockSource],
    mode: BoundingBoxMode,
    pixel_size: Option<f64>,
) -> Result<Plan> {
    let Some(first) = sources.first() else {
        return Err(Error::InputCount {
            expected: 1,
            actual: 0,
        });
    };

    let nodata = sources
        .iter()
        .map(|s| {
            s.info()
                .nodata
                .ok_or_else(|| Error::NoDataNotSet(s.name().to_string()))
        })
        .collect::<Result<Vec<f64>>>()?;

    let reference = first.info();
    let (pw, ph) = reference.pixel_size();
    let reference_srs = sources
        .iter()
        .find(|s| !s.info().projection.is_empty())
        .map(|s| parse_crs(*s))
        .transpose()?;

    let mut extents = Vec::with_capacity(sources.len());
    for source in sources {
        let info = source.info();
        if !info.is_north_up() {
            return Err(Error::Misaligned(format!(
                "{} is rotated or not north-up",
                source.name()
            )));
        }

        let (w, h) = info.pixel_size();
        if !same_size(w, pw) || !same_size(h, ph) {
            return Err(Error::Misaligned(format!(
                "{} has pixel size {}x{}, {} has {}x{}",
                source.name(),
                w,
                h,
                first.name(),
                pw,
                ph
            )));
        }

        if let Some(srs) = &reference_srs
            && !info.projection.is_empty()
            && parse_crs(*source)? != *srs
        {
            return Err(Error::Misaligned(format!(
                "{} uses a different projection",
                source.name()
            )));
        }

        let dx = info.geo_transform[0] - reference.geo_transform[0];
        let dy = info.geo_transform[3] - reference.geo_transform[3];
        if !on_lattice(dx, pw) || !on_lattice(dy, ph) {
            return Err(Error::Misaligned(format!(
                "{} is offset from {} by a fraction of a pixel",
                source.name(),
                first.name()
            )));
        }

        extents.push(info.extent().map_err(Error::Misaligned)?);
    }

    if let Some(size) = pixel_size
        && (!same_size(size, pw) || !same_size(size, ph))
    {
        return Err(Error::Misaligned(format!(
            "requested pixel size {} differs from the inputs' {}x{}; resample upstream",
            size, pw, ph
        )));
    }

    let extent = Bbox::combine(&extents, mode).ok_or(Error::EmptyExtent)?;
    let projection = match &reference_srs {
        Some(srs) => srs.to_wkt()?,
        None => String::new(),
    };

    let grid = OutputGrid {
        cols: (extent.width() / pw).round() as usize,
        rows: (extent.height() / ph).round() as usize,
        geo_transform: [extent.xmin, pw, 0.0, extent.ymax, 0.0, -ph],
        projection,
    };

    let offsets = sources
        .iter()
        .map(|s| {
            let gt = s.info().geo_transform;
            (
                ((extent.xmin - gt[0]) / pw).round() as i64,
                ((gt[3] - extent.ymax) / ph).round() as i64,
            )
        })
        .collect::<Vec<_>>();

    info!(
        "Output grid {}x{} ({} of {} inputs), pixel {}x{}",
        grid.cols,
        grid.rows,
        mode,
        sources.len(),
        pw,
        ph
    );
    for (source, offset) in sources.iter().zip(&offsets) {
        debug!("{} offset on output grid: {:?}", source.name(), offset);
    }

    Ok(Plan {
        grid,
        nodata,
        offsets,
    })
}

impl Plan {
    /// Read the window of every input that covers `tile`.
    pub fn read_blocks(&self, sources: &[&dyn BlockSource], tile: &Tile) -> Result<Vec<Block>> {
        sources
            .iter()
            .zip(&self.offsets)
            .zip(&self.nodata)
            .map(|((source, &offset), &nodata)| read_aligned(*source, offset, nodata, tile))
            .collect()
    }
}

/// Read the part of `source` under `tile`; pixels beyond the source's extent
/// are filled with its nodata.
fn read_aligned(
    source: &dyn BlockSource,
    (col_shift, row_shift): (i64, i64),
    nodata: f64,
    tile: &Tile,
) -> Result<Block> {
    let info = source.info();

    let c0 = tile.col_offset as i64 + col_shift;
    let r0 = tile.row_offset as i64 + row_shift;
    let c1 = c0 + tile.cols as i64;
    let r1 = r0 + tile.rows as i64;

    let ic0 = c0.max(0);
    let ir0 = r0.max(0);
    let ic1 = c1.min(info.cols as i64);
    let ir1 = r1.min(info.rows as i64);

    if (ic0, ir0, ic1, ir1) == (c0, r0, c1, r1) {
        return source.read_window(c0 as usize, r0 as usize, tile.cols, tile.rows);
    }

    let mut block = Block::filled(tile.rows, tile.cols, nodata);
    if ic0 < ic1 && ir0 < ir1 {
        let inner = source.read_window(
            ic0 as usize,
            ir0 as usize,
            (ic1 - ic0) as usize,
            (ir1 - ir0) as usize,
        )?;
        let placement = Tile::new(
            (ir0 - r0) as usize,
            (ic0 - c0) as usize,
            inner.rows(),
            inner.cols(),
        );
        block.paste(&placement, &inner)?;
    }

    Ok(block)
}
