//! Boundary shape constructors (mm). Curved shapes are approximated with straight segments.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use std::f64::consts::TAU;

/// Segments used for circles and ellipses by default.
pub const DEFAULT_SEGMENTS: usize = 32;

/// Axis-aligned rectangle with lower-left corner `(x, y)`.
pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (x, y),
            (x + width, y),
            (x + width, y + height),
            (x, y + height),
            (x, y),
        ]),
        Vec::new(),
    )
}

pub fn circle(cx: f64, cy: f64, r: f64, segments: usize) -> Polygon<f64> {
    ellipse(cx, cy, r, r, segments)
}

pub fn ellipse(cx: f64, cy: f64, rx: f64, ry: f64, segments: usize) -> Polygon<f64> {
    let n = segments.max(3);
    let mut ring: Vec<Coord<f64>> = (0..n)
        .map(|i| {
            let a = TAU * i as f64 / n as f64;
            Coord {
                x: cx + rx * a.cos(),
                y: cy + ry * a.sin(),
            }
        })
        .collect();
    ring.push(ring[0]);
    Polygon::new(LineString::new(ring), Vec::new())
}

/// Builds a polygon from an outer ring and hole rings given as point lists.
pub fn polygon_from_rings(outer: &[[f64; 2]], holes: &[Vec<[f64; 2]>]) -> Polygon<f64> {
    let ring = |pts: &[[f64; 2]]| LineString::from(pts.iter().map(|p| (p[0], p[1])).collect::<Vec<_>>());
    Polygon::new(ring(outer), holes.iter().map(|h| ring(h)).collect())
}

/// Wraps a single polygon as a shape.
pub fn shape(poly: Polygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![poly])
}
