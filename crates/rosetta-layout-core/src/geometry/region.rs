use crate::error::{GeometryIssue, LayoutError, Result, ShapeRef};
use crate::geometry::kernel::{AREA_EPSILON, GeoKernel, GeometryKernel};
use geo::{Area, BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon, Rect, Relate, Scale};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};
use tracing::{debug, instrument};

/// Inner shapes covering more than this share of the outer area are rejected.
pub const MAX_INNER_FRACTION: f64 = 0.95;
/// Regions smaller than this share of the outer area are rejected.
pub const MIN_REGION_FRACTION: f64 = 0.01;

type EdgeEntry = GeomWithData<Rectangle<[f64; 2]>, [[f64; 2]; 2]>;

/// Outer shape minus the union of keep-out shapes. Possibly several disjoint components.
#[derive(Debug, Clone)]
pub struct AllowedRegion {
    polygons: MultiPolygon<f64>,
    area: f64,
    bounds: Rect<f64>,
    edges: RTree<EdgeEntry>,
}

impl AllowedRegion {
    /// Wraps already-normalized polygons; `None` when there is nothing left.
    pub(crate) fn from_polygons(polygons: MultiPolygon<f64>) -> Option<Self> {
        let bounds = polygons.bounding_rect()?;
        let area = polygons.unsigned_area();
        if area <= AREA_EPSILON {
            return None;
        }
        let mut entries = Vec::new();
        for poly in &polygons.0 {
            for ring in std::iter::once(poly.exterior()).chain(poly.interiors()) {
                for line in ring.lines() {
                    let a = [line.start.x, line.start.y];
                    let b = [line.end.x, line.end.y];
                    entries.push(GeomWithData::new(Rectangle::from_corners(a, b), [a, b]));
                }
            }
        }
        Some(Self {
            polygons,
            area,
            bounds,
            edges: RTree::bulk_load(entries),
        })
    }

    pub fn area(&self) -> f64 {
        self.area
    }
    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }
    pub fn polygons(&self) -> &MultiPolygon<f64> {
        &self.polygons
    }
    pub fn component_count(&self) -> usize {
        self.polygons.0.len()
    }

    /// True when `poly` lies strictly inside the region: every vertex in the interior, no edge
    /// touching the region boundary and no hole swallowed.
    pub fn contains_polygon(&self, poly: &Polygon<f64>) -> bool {
        let mut ring: Vec<[f64; 2]> = poly.exterior().coords().map(|c| [c.x, c.y]).collect();
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        self.contains_ring(&ring)
    }

    pub(crate) fn contains_ring(&self, ring: &[[f64; 2]]) -> bool {
        if ring.len() < 3 {
            return false;
        }
        let (lo, hi) = ring_bounds(ring);
        let b = self.bounds;
        if lo[0] < b.min().x || lo[1] < b.min().y || hi[0] > b.max().x || hi[1] > b.max().y {
            return false;
        }
        if !ring
            .iter()
            .all(|p| self.polygons.contains(&Point::new(p[0], p[1])))
        {
            return false;
        }
        let envelope = AABB::from_corners(lo, hi);
        for entry in self.edges.locate_in_envelope_intersecting(&envelope) {
            let [e0, e1] = entry.data;
            for i in 0..ring.len() {
                let r0 = ring[i];
                let r1 = ring[(i + 1) % ring.len()];
                if segments_intersect(r0, r1, e0, e1) {
                    return false;
                }
            }
            if point_in_ring(e0, ring) {
                return false;
            }
        }
        true
    }

    /// Region scaled about the centre of its bounding box.
    pub fn scaled(&self, factor: f64) -> Option<Self> {
        let c = self.bounds.center();
        let scaled = self
            .polygons
            .scale_around_point(factor, factor, Point::from(c));
        Self::from_polygons(scaled)
    }
}

/// Computes `outer − ⋃ inners` with the default kernel.
pub fn compute_allowed_region(
    outer: &MultiPolygon<f64>,
    inners: &[MultiPolygon<f64>],
) -> Result<AllowedRegion> {
    compute_allowed_region_with(&GeoKernel, outer, inners)
}

/// Computes `outer − ⋃ inners` with the given kernel after validating every shape.
#[instrument(skip_all, fields(inners = inners.len()))]
pub fn compute_allowed_region_with<K: GeometryKernel + ?Sized>(
    kernel: &K,
    outer: &MultiPolygon<f64>,
    inners: &[MultiPolygon<f64>],
) -> Result<AllowedRegion> {
    validate_shape(outer).map_err(|r| LayoutError::geometry(ShapeRef::Outer, r))?;
    let outer_area = outer.unsigned_area();
    let outer_bounds = outer
        .bounding_rect()
        .ok_or_else(|| LayoutError::geometry(ShapeRef::Outer, GeometryIssue::ZeroArea))?;

    for (i, inner) in inners.iter().enumerate() {
        let fail = |reason| LayoutError::geometry(ShapeRef::Inner(i), reason);
        validate_shape(inner).map_err(fail)?;
        let ib = inner
            .bounding_rect()
            .ok_or_else(|| fail(GeometryIssue::ZeroArea))?;
        if !rect_within(ib, outer_bounds) {
            return Err(fail(GeometryIssue::ExceedsOuterBounds));
        }
        if inner.unsigned_area() > MAX_INNER_FRACTION * outer_area {
            return Err(fail(GeometryIssue::NotContained));
        }
        if !outer.relate(inner).is_contains() {
            return Err(fail(GeometryIssue::NotContained));
        }
    }

    let blocked = kernel.union(inners);
    let base = kernel.union(std::slice::from_ref(outer));
    let diff = kernel.difference(&base, &blocked);
    let region = AllowedRegion::from_polygons(diff)
        .ok_or_else(|| LayoutError::geometry(ShapeRef::Region, GeometryIssue::EmptyRegion))?;
    if region.area() < MIN_REGION_FRACTION * outer_area {
        return Err(LayoutError::geometry(
            ShapeRef::Region,
            GeometryIssue::RegionTooSmall {
                area: region.area(),
                outer_area,
            },
        ));
    }
    debug!(
        area_mm2 = region.area(),
        components = region.component_count(),
        "allowed region computed"
    );
    Ok(region)
}

fn rect_within(inner: Rect<f64>, outer: Rect<f64>) -> bool {
    let eps = 1e-9;
    inner.min().x >= outer.min().x - eps
        && inner.min().y >= outer.min().y - eps
        && inner.max().x <= outer.max().x + eps
        && inner.max().y <= outer.max().y + eps
}

fn validate_shape(shape: &MultiPolygon<f64>) -> std::result::Result<(), GeometryIssue> {
    if shape.0.is_empty() {
        return Err(GeometryIssue::InvalidRing("no polygons".into()));
    }
    for poly in &shape.0 {
        validate_ring(poly.exterior())?;
        for hole in poly.interiors() {
            validate_ring(hole)?;
        }
        if poly.unsigned_area() <= AREA_EPSILON {
            return Err(GeometryIssue::ZeroArea);
        }
    }
    Ok(())
}

/// Distinct vertices of a ring, without the closing duplicate.
pub(crate) fn open_ring(ring: &LineString<f64>) -> Vec<[f64; 2]> {
    let mut pts: Vec<[f64; 2]> = Vec::with_capacity(ring.0.len());
    for Coord { x, y } in ring.coords().copied() {
        if pts.last() != Some(&[x, y]) {
            pts.push([x, y]);
        }
    }
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    pts
}

fn validate_ring(ring: &LineString<f64>) -> std::result::Result<(), GeometryIssue> {
    if ring.coords().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(GeometryIssue::InvalidRing("non-finite coordinate".into()));
    }
    let pts = open_ring(ring);
    let n = pts.len();
    if n < 3 {
        return Err(GeometryIssue::InvalidRing(format!(
            "{n} distinct vertices, need at least 3"
        )));
    }
    for i in 0..n {
        let (a, b) = (pts[i], pts[(i + 1) % n]);
        for j in (i + 1)..n {
            let (c, d) = (pts[j], pts[(j + 1) % n]);
            let adjacent_after = j == i + 1;
            let adjacent_wrap = i == 0 && j == n - 1;
            let hit = if adjacent_after {
                // shared vertex b == c; only a fold back along the edge is invalid
                collinear_overlap(a, b, d)
            } else if adjacent_wrap {
                // shared vertex a == d
                collinear_overlap(b, a, c)
            } else {
                segments_intersect(a, b, c, d)
            };
            if hit {
                return Err(GeometryIssue::InvalidRing(format!(
                    "self-intersection between edges {i} and {j}"
                )));
            }
        }
    }
    Ok(())
}

/// Edges `p-shared` and `shared-q` overlap beyond their common vertex.
fn collinear_overlap(p: [f64; 2], shared: [f64; 2], q: [f64; 2]) -> bool {
    orient(p, shared, q) == 0.0 && (on_segment(p, shared, q) || on_segment(shared, q, p))
}

fn orient(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// `p` lies on the closed segment `a-b`, assuming the three points are collinear.
fn on_segment(a: [f64; 2], b: [f64; 2], p: [f64; 2]) -> bool {
    p[0] >= a[0].min(b[0]) && p[0] <= a[0].max(b[0]) && p[1] >= a[1].min(b[1]) && p[1] <= a[1].max(b[1])
}

/// Closed segments `p1-p2` and `q1-q2` share at least one point.
pub(crate) fn segments_intersect(p1: [f64; 2], p2: [f64; 2], q1: [f64; 2], q2: [f64; 2]) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0)) && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0)) {
        return true;
    }
    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

/// Even-odd point-in-polygon test for an open ring.
pub(crate) fn point_in_ring(p: [f64; 2], ring: &[[f64; 2]]) -> bool {
    let mut inside = false;
    let n = ring.len();
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a[1] > p[1]) != (b[1] > p[1]) {
            let x = (b[0] - a[0]) * (p[1] - a[1]) / (b[1] - a[1]) + a[0];
            if p[0] < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

pub(crate) fn ring_bounds(ring: &[[f64; 2]]) -> ([f64; 2], [f64; 2]) {
    let mut lo = [f64::INFINITY; 2];
    let mut hi = [f64::NEG_INFINITY; 2];
    for p in ring {
        lo = [lo[0].min(p[0]), lo[1].min(p[1])];
        hi = [hi[0].max(p[0]), hi[1].max(p[1])];
    }
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::shapes::{polygon_from_rings, rectangle, shape};

    #[test]
    fn bow_tie_is_rejected() {
        let bow = polygon_from_rings(&[[0.0, 0.0], [2.0, 2.0], [2.0, 0.0], [0.0, 2.0]], &[]);
        let err = validate_shape(&shape(bow)).unwrap_err();
        assert!(matches!(err, GeometryIssue::InvalidRing(_)));
    }

    #[test]
    fn spike_is_rejected() {
        let spike = polygon_from_rings(&[[0.0, 0.0], [4.0, 0.0], [2.0, 0.0], [2.0, 2.0]], &[]);
        assert!(validate_shape(&shape(spike)).is_err());
    }

    #[test]
    fn closing_duplicate_is_not_a_vertex() {
        let sq = rectangle(0.0, 0.0, 1.0, 1.0);
        assert_eq!(open_ring(sq.exterior()).len(), 4);
        assert!(validate_shape(&shape(sq)).is_ok());
    }

    #[test]
    fn contains_ring_respects_holes() {
        let outer = shape(rectangle(0.0, 0.0, 10.0, 10.0));
        let hole = shape(rectangle(4.0, 4.0, 2.0, 2.0));
        let region = compute_allowed_region(&outer, &[hole]).unwrap();
        assert!(region.contains_ring(&[[1.0, 1.0], [3.0, 1.0], [3.0, 3.0], [1.0, 3.0]]));
        // swallows the hole entirely
        assert!(!region.contains_ring(&[[3.0, 3.0], [7.0, 3.0], [7.0, 7.0], [3.0, 7.0]]));
        // crosses the outer boundary
        assert!(!region.contains_ring(&[[8.0, 8.0], [11.0, 8.0], [11.0, 9.0], [8.0, 9.0]]));
    }
}
