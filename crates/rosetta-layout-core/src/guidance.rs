//! Guidance field: nested inward offsets of the region boundary used as placement rails.
//!
//! Curve `k` sits at distance `k * step_mm` from the boundary. Every curve is oriented with the
//! region interior on its left and starts at its lowest vertex (ties broken by smallest x), so
//! walking the field always visits positions in the same order.

use crate::error::{LayoutError, Result};
use crate::geometry::region::open_ring;
use crate::geometry::{AllowedRegion, GeoKernel, GeometryKernel};
use geo::LineString;
use serde::Serialize;
use tracing::{debug, instrument};

/// Point on a curve with its unit tangent and inward (left) normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSample {
    pub point: [f64; 2],
    pub tangent: [f64; 2],
    pub normal: [f64; 2],
}

impl CurveSample {
    /// Tangent direction in radians, counter-clockwise from +x.
    pub fn angle(&self) -> f64 {
        self.tangent[1].atan2(self.tangent[0])
    }
}

/// Arc-length parameterized polyline.
#[derive(Debug, Clone, Serialize)]
pub struct GuidanceCurve {
    level: usize,
    offset_mm: f64,
    closed: bool,
    /// Vertices; closed curves repeat the first vertex at the end.
    points: Vec<[f64; 2]>,
    /// Arc length from the start to each vertex.
    cumulative: Vec<f64>,
}

impl GuidanceCurve {
    pub fn from_points(level: usize, offset_mm: f64, points: Vec<[f64; 2]>, closed: bool) -> Self {
        let mut points = points;
        if closed && points.len() > 1 && points.first() != points.last() {
            points.push(points[0]);
        }
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, p) in points.iter().enumerate() {
            if i > 0 {
                total += dist(points[i - 1], *p);
            }
            cumulative.push(total);
        }
        Self {
            level,
            offset_mm,
            closed,
            points,
            cumulative,
        }
    }

    fn from_ring(level: usize, offset_mm: f64, ring: &LineString<f64>) -> Self {
        let mut pts = open_ring(ring);
        if let Some(start) = lowest_vertex(&pts) {
            pts.rotate_left(start);
        }
        Self::from_points(level, offset_mm, pts, true)
    }

    pub fn level(&self) -> usize {
        self.level
    }
    pub fn offset_mm(&self) -> f64 {
        self.offset_mm
    }
    pub fn is_closed(&self) -> bool {
        self.closed
    }
    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }
    pub fn length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Samples the curve at arc length `s`. Closed curves wrap; open curves clamp.
    pub fn sample(&self, s: f64) -> Option<CurveSample> {
        let len = self.length();
        if self.points.len() < 2 || len <= 0.0 {
            return None;
        }
        let s = if self.closed {
            s.rem_euclid(len)
        } else {
            s.clamp(0.0, len)
        };
        let seg = self
            .cumulative
            .partition_point(|&c| c <= s)
            .saturating_sub(1)
            .min(self.points.len() - 2);
        let (a, b) = (self.points[seg], self.points[seg + 1]);
        let seg_len = self.cumulative[seg + 1] - self.cumulative[seg];
        let t = if seg_len > 0.0 {
            (s - self.cumulative[seg]) / seg_len
        } else {
            0.0
        };
        let tangent = if seg_len > 0.0 {
            [(b[0] - a[0]) / seg_len, (b[1] - a[1]) / seg_len]
        } else {
            [1.0, 0.0]
        };
        Some(CurveSample {
            point: [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t],
            tangent,
            normal: [-tangent[1], tangent[0]],
        })
    }
}

/// Ordered rails, boundary first.
#[derive(Debug, Clone, Serialize)]
pub struct GuidanceField {
    pub step_mm: f64,
    pub curves: Vec<GuidanceCurve>,
}

impl GuidanceField {
    pub fn len(&self) -> usize {
        self.curves.len()
    }
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
    pub fn total_length(&self) -> f64 {
        self.curves.iter().map(GuidanceCurve::length).sum()
    }
}

pub fn plan_guidance_field(
    region: &AllowedRegion,
    step_mm: f64,
    max_curves: usize,
) -> Result<GuidanceField> {
    plan_guidance_field_with(&GeoKernel, region, step_mm, max_curves)
}

#[instrument(skip_all, fields(step_mm = step_mm, max_curves = max_curves))]
pub fn plan_guidance_field_with<K: GeometryKernel + ?Sized>(
    kernel: &K,
    region: &AllowedRegion,
    step_mm: f64,
    max_curves: usize,
) -> Result<GuidanceField> {
    if !(step_mm.is_finite() && step_mm > 0.0) {
        return Err(LayoutError::InvalidInput(format!(
            "streamline step must be positive, got {step_mm}"
        )));
    }
    if max_curves == 0 {
        return Err(LayoutError::InvalidInput(
            "at least one streamline is required".into(),
        ));
    }
    let mut curves = Vec::new();
    let mut level = 0usize;
    'levels: while curves.len() < max_curves {
        let offset = level as f64 * step_mm;
        let shrunk = if level == 0 {
            region.polygons().clone()
        } else {
            kernel.offset_inward(region.polygons(), offset)
        };
        if shrunk.0.is_empty() {
            break;
        }
        for poly in &shrunk.0 {
            for ring in std::iter::once(poly.exterior()).chain(poly.interiors()) {
                let curve = GuidanceCurve::from_ring(level, offset, ring);
                if curve.length() <= 0.0 {
                    continue;
                }
                curves.push(curve);
                if curves.len() >= max_curves {
                    break 'levels;
                }
            }
        }
        level += 1;
    }
    debug!(curves = curves.len(), levels = level, "guidance field planned");
    Ok(GuidanceField { step_mm, curves })
}

fn lowest_vertex(pts: &[[f64; 2]]) -> Option<usize> {
    pts.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a[1].total_cmp(&b[1]).then(a[0].total_cmp(&b[0])))
        .map(|(i, _)| i)
}

fn dist(a: [f64; 2], b: [f64; 2]) -> f64 {
    (b[0] - a[0]).hypot(b[1] - a[1])
}
