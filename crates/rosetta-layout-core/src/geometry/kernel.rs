use geo::{Area, BooleanOps, MultiPolygon, Polygon};
use geo::orient::{Direction, Orient};

/// Polygons whose area falls below this (mm²) are dropped from kernel results.
pub const AREA_EPSILON: f64 = 1e-9;

/// Polygon boolean and offset operations used by the layout engine.
///
/// Implementations take and return plain polygon rings; the rest of the crate never depends on
/// how the kernel computes them.
pub trait GeometryKernel {
    fn union(&self, shapes: &[MultiPolygon<f64>]) -> MultiPolygon<f64>;
    fn difference(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64>;
    /// Shrinks `region` by `distance` (mitred corners). Empty when nothing remains.
    fn offset_inward(&self, region: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64>;
}

/// Default kernel: `geo` boolean ops and `geo-buffer` straight-skeleton offsets.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoKernel;

impl GeometryKernel for GeoKernel {
    fn union(&self, shapes: &[MultiPolygon<f64>]) -> MultiPolygon<f64> {
        let mut iter = shapes.iter().filter(|s| !s.0.is_empty());
        let Some(first) = iter.next() else {
            return MultiPolygon::new(Vec::new());
        };
        let merged = iter.fold(first.clone(), |acc, s| acc.union(s));
        normalize(merged)
    }

    fn difference(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        if b.0.is_empty() {
            return normalize(a.clone());
        }
        normalize(a.difference(b))
    }

    fn offset_inward(&self, region: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
        if distance <= 0.0 {
            return normalize(region.clone());
        }
        normalize(geo_buffer::buffer_multi_polygon(region, -distance))
    }
}

/// Drops slivers and orients rings: exteriors counter-clockwise, holes clockwise.
pub fn normalize(mp: MultiPolygon<f64>) -> MultiPolygon<f64> {
    let kept: Vec<Polygon<f64>> = mp
        .0
        .into_iter()
        .filter(|p| p.unsigned_area() > AREA_EPSILON)
        .collect();
    MultiPolygon::new(kept).orient(Direction::Default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::shapes::rectangle;

    #[test]
    fn union_of_disjoint_squares_keeps_both() {
        let k = GeoKernel;
        let a = MultiPolygon::new(vec![rectangle(0.0, 0.0, 1.0, 1.0)]);
        let b = MultiPolygon::new(vec![rectangle(5.0, 5.0, 1.0, 1.0)]);
        let u = k.union(&[a, b]);
        assert_eq!(u.0.len(), 2);
        assert!((u.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn offset_shrinks_square() {
        let k = GeoKernel;
        let sq = MultiPolygon::new(vec![rectangle(0.0, 0.0, 10.0, 10.0)]);
        let off = k.offset_inward(&sq, 1.0);
        assert!((off.unsigned_area() - 64.0).abs() < 1e-6);
        let gone = k.offset_inward(&sq, 6.0);
        assert!(gone.0.is_empty());
    }
}
