
use crate::config::BoundingBoxMode;

/// Axis-aligned extent in projected units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Bbox {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<Self, String> {
        if [xmin, xmax, ymin, ymax].iter().any(|v| !v.is_finite()) {
            return Err("Bounding box coordinates must be finite".to_string());
        }

        if xmin > xmax || ymin > ymax {
            return Err("Min values must be <= max values".to_string());
        }

        Ok(Bbox {
            xmin,
            xmax,
            ymin,
            ymax,
        })
    }

    /// Extent of a north-up grid from its GDAL geotransform
    // geotransform: [top_left_x, pixel_width, 0, top_left_y, 0, -pixel_height]
    pub fn from_geo_transform(gt: &[f64; 6], cols: usize, rows: usize) -> Result<Self, String> {
        let x0 = gt[0];
        let x1 = gt[0] + cols as f64 * gt[1];
        let y0 = gt[3];
        let y1 = gt[3] + rows as f64 * gt[5];

        Self::new(x0.min(x1), x0.max(x1), y0.min(y1), y0.max(y1))
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn union(&self, other: &Bbox) -> Bbox {
        Bbox {
            xmin: self.xmin.min(other.xmin),
            xmax: self.xmax.max(other.xmax),
            ymin: self.ymin.min(other.ymin),
            ymax: self.ymax.max(other.ymax),
        }
    }

    /// Overlapping extent, `None` when the boxes only touch or are disjoint
    pub fn intersection(&self, other: &Bbox) -> Option<Bbox> {
        let xmin = self.xmin.max(other.xmin);
        let xmax = self.xmax.min(other.xmax);
        let ymin = self.ymin.max(other.ymin);
        let ymax = self.ymax.min(other.ymax);

        if xmin < xmax && ymin < ymax {
            Some(Bbox {
                xmin,
                xmax,
                ymin,
                ymax,
            })
        } else {
            None
        }
    }

    /// Combine several extents according to `mode`
    pub fn combine<'a, I>(boxes: I, mode: BoundingBoxMode) -> Option<Bbox>
    where
        I: IntoIterator<Item = &'a Bbox>,
    {
        let mut iter = boxes.into_iter();
        let first = *iter.next()?;

        iter.try_fold(first, |acc, bbox| match mode {
            BoundingBoxMode::Union => Some(acc.union(bbox)),
            BoundingBoxMode::Intersection => acc.intersection(bbox),
        })
    }
}

#[cfg(test)]
mod test {
    use crate::bbox::Bbox;
    use crate::config::BoundingBoxMode;

    #[test]
    fn test_bbox_rejects_inverted_or_non_finite() {
        assert!(Bbox::new(0.0, 10.0, 0.0, 10.0).is_ok());

        let invalid_order_x = Bbox::new(10.0, 0.0, 0.0, 10.0);
        assert!(invalid_order_x.is_err());

        let invalid_order_y = Bbox::new(0.0, 10.0, 10.0, 0.0);
        assert!(invalid_order_y.is_err());

        let infinite = Bbox::new(0.0, f64::INFINITY, 0.0, 10.0);
        assert!(infinite.is_err());
    }

    #[test]
    fn test_bbox_from_geo_transform() {
        let gt = [500000.0, 30.0, 0.0, 4200000.0, 0.0, -30.0];
        let bbox = Bbox::from_geo_transform(&gt, 100, 50).unwrap();

        assert_eq!(bbox, Bbox::new(500000.0, 503000.0, 4198500.0, 4200000.0).unwrap());
        assert_eq!(bbox.width(), 3000.0);
        assert_eq!(bbox.height(), 1500.0);
    }

    #[test]
    fn test_union_and_intersection() {
        let north = Bbox::new(0.0, 100.0, 50.0, 150.0).unwrap();
        let south = Bbox::new(20.0, 120.0, 0.0, 100.0).unwrap();

        assert_eq!(
            Bbox::combine([&north, &south], BoundingBoxMode::Union),
            Some(Bbox::new(0.0, 120.0, 0.0, 150.0).unwrap())
        );
        assert_eq!(
            Bbox::combine([&north, &south], BoundingBoxMode::Intersection),
            Some(Bbox::new(20.0, 100.0, 50.0, 100.0).unwrap())
        );
    }

    #[test]
    fn test_disjoint_intersection_is_none() {
        let west = Bbox::new(0.0, 10.0, 0.0, 10.0).unwrap();
        let east = Bbox::new(10.0, 20.0, 0.0, 10.0).unwrap();

        assert_eq!(west.intersection(&east), None);
        assert_eq!(Bbox::combine([&west, &east], BoundingBoxMode::Intersection), None);
        assert_eq!(Bbox::combine(std::iter::empty(), BoundingBoxMode::Union), None);
    }
}
