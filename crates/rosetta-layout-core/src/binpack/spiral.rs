use super::EnvelopePacker;
use crate::config::Envelope;
use crate::error::{LayoutError, Result};
use crate::model::{BinPlacement, BinSpec, PackingLayout, PackingResult, PlacementStatus};
use crate::progress::{Checkpoint, JobObserver};
use rstar::{AABB, RTree};
use std::f64::consts::{PI, TAU};
use tracing::{debug, info, warn};

/// Fill ratio the spiral radius bound is derived from.
pub const TARGET_FILL: f64 = 0.85;
/// The spiral gives up beyond this multiple of the target radius.
pub const RADIUS_SAFETY: f64 = 2.0;
/// Radial growth per turn, as a share of the smaller cell side.
const RADIUS_STEP_FRACTION: f64 = 0.25;
/// Distance between consecutive candidates, as a share of the smaller cell side.
const ARC_STEP_FRACTION: f64 = 0.1;

/// Spiral packing for circular and elliptical envelopes.
///
/// Bins are tried at evenly spaced arc lengths along an Archimedean spiral around the origin and
/// kept when their box clears every earlier bin by `gap_px`.
///
/// Ellipses of aspect `k` pack the circle of cells `(cw / k, ch)` and scale every x coordinate
/// by `k`; y is never touched. The walk does this directly by following `x = k·r·cos θ`, so the
/// clearance test always runs on the real bin boxes.
pub struct SpiralPacker {
    envelope: Envelope,
    gap_px: u32,
    radius_safety: f64,
}

/// Bin top-left corners relative to the spiral origin.
struct SpiralRun {
    corners: Vec<[i64; 2]>,
    arc_step: f64,
    radius_step: f64,
    cancelled: bool,
}

impl SpiralPacker {
    pub fn new(envelope: Envelope, gap_px: u32) -> Self {
        Self {
            envelope,
            gap_px,
            radius_safety: RADIUS_SAFETY,
        }
    }

    /// Radius of the unstretched circle at which the cells would fill it to [`TARGET_FILL`].
    pub fn target_radius(&self, bin: BinSpec, count: usize) -> f64 {
        let (cw, ch) = self.circle_cell(bin);
        (count as f64 * cw * ch / (TARGET_FILL * PI)).sqrt()
    }

    /// Radius of the unstretched circle beyond which the walk gives up.
    fn max_radius(&self, bin: BinSpec, count: usize) -> f64 {
        let (cw, ch) = self.circle_cell(bin);
        self.radius_safety * self.target_radius(bin, count) + cw.max(ch)
    }

    fn cell(&self, bin: BinSpec) -> (f64, f64) {
        let g = f64::from(self.gap_px);
        (f64::from(bin.width_px) + g, f64::from(bin.height_px) + g)
    }

    /// Cell size in the unstretched circle.
    fn circle_cell(&self, bin: BinSpec) -> (f64, f64) {
        let (cw, ch) = self.cell(bin);
        (cw / self.stretch(), ch)
    }

    /// x scale of the envelope; 1.0 for circles.
    fn stretch(&self) -> f64 {
        self.envelope.effective_aspect()
    }

    fn run(&self, bin: BinSpec, count: usize, observer: &mut dyn JobObserver) -> Result<SpiralRun> {
        let (cw, ch) = self.circle_cell(bin);
        let k = self.stretch();
        let (bw, bh) = (i64::from(bin.width_px), i64::from(bin.height_px));
        let g = i64::from(self.gap_px);
        let max_radius = self.max_radius(bin, count);
        let radius_step = cw.min(ch) * RADIUS_STEP_FRACTION;
        let arc_step = (cw.min(ch) * ARC_STEP_FRACTION).max(1.0);

        let mut tree: RTree<[i64; 2]> = RTree::new();
        let mut corners = Vec::with_capacity(count);
        let mut theta = 0.0f64;
        let mut cancelled = false;
        let mut candidates = 0usize;
        while corners.len() < count {
            let r = radius_step * theta / TAU;
            if r > max_radius {
                warn!(placed = corners.len(), requested = count, max_radius, "spiral exhausted");
                return Err(LayoutError::PackingInfeasible(format!(
                    "spiral reached radius {max_radius:.0} px with {} of {count} bins placed",
                    corners.len()
                )));
            }
            candidates += 1;
            let (s, c) = theta.sin_cos();
            let x = (k * r * c - bw as f64 / 2.0).round() as i64;
            let y = (r * s - bh as f64 / 2.0).round() as i64;
            // any earlier corner inside this window overlaps or violates the gap
            let window = AABB::from_corners(
                [x - bw - g + 1, y - bh - g + 1],
                [x + bw + g - 1, y + bh + g - 1],
            );
            if tree.locate_in_envelope(&window).next().is_none() {
                tree.insert([x, y]);
                corners.push([x, y]);
                let event = Checkpoint::BinPlaced {
                    placed: corners.len(),
                    total: count,
                };
                if observer.checkpoint(&event).is_break() {
                    cancelled = true;
                    break;
                }
            }
            theta += arc_step / r.max(arc_step);
        }
        debug!(candidates, placed = corners.len(), "spiral walk finished");
        Ok(SpiralRun {
            corners,
            arc_step,
            radius_step,
            cancelled,
        })
    }
}

impl EnvelopePacker for SpiralPacker {
    /// Diameters the walk can reach before giving up.
    fn max_extent(&self, bin: BinSpec, count: usize) -> (f64, f64) {
        let d = 2.0 * self.max_radius(bin, count);
        (d * self.stretch(), d)
    }

    fn pack(
        &self,
        bin: BinSpec,
        count: usize,
        observer: &mut dyn JobObserver,
    ) -> Result<PackingResult> {
        let SpiralRun {
            corners,
            arc_step,
            radius_step,
            cancelled,
        } = self.run(bin, count, observer)?;

        // smallest envelope of the requested aspect around the origin holding every bin corner
        let k = self.stretch();
        let (bw, bh) = (i64::from(bin.width_px), i64::from(bin.height_px));
        let mut t: f64 = 0.0;
        for &[x, y] in &corners {
            for (cx, cy) in [(x, y), (x + bw, y), (x, y + bh), (x + bw, y + bh)] {
                let (ux, uy) = (cx as f64 / k, cy as f64);
                t = t.max(ux.hypot(uy));
            }
        }
        let (rx, ry) = (t * k, t);
        let (ox, oy) = (rx.floor() as i64, ry.floor() as i64);
        let canvas_w = (2.0 * rx).ceil() as u64;
        let canvas_h = (2.0 * ry).ceil() as u64;
        let placements: Vec<BinPlacement> = corners
            .iter()
            .enumerate()
            .map(|(index, &[x, y])| BinPlacement {
                index,
                x_px: (x + ox).max(0) as u64,
                y_px: (y + oy).max(0) as u64,
            })
            .collect();
        let placed = placements.len();
        let envelope_area = PI * rx * ry;
        let utilization = if envelope_area > 0.0 {
            placed as f64 * bin.area() as f64 / envelope_area
        } else {
            0.0
        };
        info!(
            placed,
            requested = count,
            envelope_w = 2.0 * rx,
            envelope_h = 2.0 * ry,
            utilization,
            "spiral packing finished"
        );
        Ok(PackingResult {
            layout: PackingLayout::Spiral {
                arc_step_px: arc_step,
                radius_step_px: radius_step,
                stretch: k,
            },
            envelope: self.envelope,
            bin,
            placements,
            envelope_width_px: 2.0 * rx,
            envelope_height_px: 2.0 * ry,
            canvas_width_px: canvas_w,
            canvas_height_px: canvas_h,
            utilization,
            requested: count,
            placed,
            status: PlacementStatus::from_counts(placed, count, cancelled),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopObserver;

    #[test]
    fn first_bin_sits_on_the_origin() {
        let p = SpiralPacker::new(Envelope::circle(), 0);
        let run = p.run(BinSpec::new(10, 20), 1, &mut NoopObserver).unwrap();
        assert_eq!(run.corners, vec![[-5, -10]]);
    }

    #[test]
    fn wide_ellipse_spreads_along_x() {
        let p = SpiralPacker::new(Envelope::ellipse(2.0), 0);
        let run = p.run(BinSpec::new(10, 10), 200, &mut NoopObserver).unwrap();
        let span = |axis: usize| {
            let lo = run.corners.iter().map(|c| c[axis]).min().unwrap();
            let hi = run.corners.iter().map(|c| c[axis]).max().unwrap();
            hi - lo
        };
        assert!(span(0) > span(1));
    }

    #[test]
    fn extent_covers_the_walk_for_a_single_bin() {
        let p = SpiralPacker::new(Envelope::circle(), 0);
        let bin = BinSpec::new(700, 100);
        let (w, h) = p.max_extent(bin, 1);
        assert!(w >= 700.0 && h >= 100.0);
    }

    #[test]
    fn starved_radius_is_infeasible() {
        let p = SpiralPacker {
            radius_safety: 0.0,
            ..SpiralPacker::new(Envelope::circle(), 0)
        };
        // the walk may only reach one cell side from the origin
        match p.run(BinSpec::new(10, 10), 100, &mut NoopObserver) {
            Err(LayoutError::PackingInfeasible(msg)) => assert!(msg.contains("of 100 bins")),
            Err(other) => panic!("unexpected error {other}"),
            Ok(run) => panic!("placed {} bins inside a starved radius", run.corners.len()),
        }
    }
}
