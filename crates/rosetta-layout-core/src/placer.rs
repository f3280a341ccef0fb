//! Threads pages along the guidance field.
//!
//! Rails are walked in field order. At each arc-length position the placer tries the page at
//! decreasing scales and keeps the first one that stays strictly inside the allowed region and
//! clear of every earlier page by at least `gap_mm`.

use crate::config::{LayoutConfig, Orientation};
use crate::geometry::AllowedRegion;
use crate::guidance::{CurveSample, GuidanceCurve, GuidanceField};
use crate::model::{PageSpec, Placement, PlacementStatus, rotated_rect_corners};
use crate::progress::{Checkpoint, JobObserver, NoopObserver};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};
use std::ops::ControlFlow;
use tracing::{debug, info, instrument, trace, warn};

const TOUCH_EPSILON: f64 = 1e-9;
/// Keeps page edges off the rail itself when `gap_mm` is zero.
const RAIL_CLEARANCE_MM: f64 = 1e-6;

/// Placement knobs taken from [`LayoutConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementParams {
    pub gap_mm: f64,
    pub scale_min: f64,
    pub scale_max: f64,
    pub scale_steps: u32,
    pub orientation: Orientation,
}

impl PlacementParams {
    pub fn from_config(cfg: &LayoutConfig) -> Self {
        Self {
            gap_mm: cfg.gap_mm,
            scale_min: cfg.scale_min,
            scale_max: cfg.scale_max,
            scale_steps: cfg.scale_steps,
            orientation: cfg.orientation,
        }
    }

    /// Scales probed at each position, largest first.
    fn ladder(&self) -> Vec<f64> {
        if self.scale_steps == 0 || self.scale_max <= self.scale_min {
            return vec![self.scale_max];
        }
        let span = self.scale_max - self.scale_min;
        (0..=self.scale_steps)
            .map(|i| self.scale_max - span * i as f64 / self.scale_steps as f64)
            .collect()
    }
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self::from_config(&LayoutConfig::default())
    }
}

/// Result of a placement run. `placed == placements.len()`.
#[derive(Debug, Clone)]
pub struct PlacementRun {
    pub placements: Vec<Placement>,
    pub placed: usize,
    pub status: PlacementStatus,
}

pub fn place_pages(
    pages: &[PageSpec],
    region: &AllowedRegion,
    field: &GuidanceField,
    params: &PlacementParams,
) -> PlacementRun {
    place_pages_observed(pages, region, field, params, &mut NoopObserver)
}

/// Like [`place_pages`], reporting a checkpoint around every rail. A `Break` from the observer
/// stops the run and returns the pages placed so far.
#[instrument(skip_all, fields(pages = pages.len(), curves = field.len()))]
pub fn place_pages_observed(
    pages: &[PageSpec],
    region: &AllowedRegion,
    field: &GuidanceField,
    params: &PlacementParams,
    observer: &mut dyn JobObserver,
) -> PlacementRun {
    let mut state = PlacerState::new(region, params);
    let total = field.len();
    let mut cancelled = false;
    // offset of the last rail that received pages, and how deep that row reaches
    let mut row_offset = f64::NEG_INFINITY;
    let mut occupied_until = f64::NEG_INFINITY;

    for (ci, curve) in field.curves.iter().enumerate() {
        if state.next >= pages.len() {
            break;
        }
        let inside_row = curve.offset_mm() > row_offset + TOUCH_EPSILON
            && curve.offset_mm() + TOUCH_EPSILON < occupied_until;
        if inside_row {
            trace!(curve = ci, offset = curve.offset_mm(), "rail covered by previous row");
            continue;
        }
        if observer
            .checkpoint(&Checkpoint::CurveStarted { curve: ci, total })
            .is_break()
        {
            cancelled = true;
            break;
        }
        let depth = state.walk_curve(ci, curve, pages);
        if let Some(depth) = depth {
            if curve.offset_mm() > row_offset + TOUCH_EPSILON {
                row_offset = curve.offset_mm();
                occupied_until = row_offset + depth + params.gap_mm;
            } else {
                occupied_until = occupied_until.max(row_offset + depth + params.gap_mm);
            }
        }
        if let ControlFlow::Break(()) = observer.checkpoint(&Checkpoint::CurveFinished {
            curve: ci,
            placed_so_far: state.placements.len(),
        }) {
            cancelled = true;
            break;
        }
    }

    let placed = state.placements.len();
    let status = PlacementStatus::from_counts(placed, pages.len(), cancelled);
    match status {
        PlacementStatus::Complete => info!(placed, "all pages placed"),
        PlacementStatus::Incomplete { placed, requested } => {
            warn!(placed, requested, "guidance field exhausted before all pages were placed")
        }
        PlacementStatus::Cancelled { placed, requested } => {
            info!(placed, requested, "placement cancelled")
        }
    }
    PlacementRun {
        placements: state.placements,
        placed,
        status,
    }
}

type Footprint = GeomWithData<Rectangle<[f64; 2]>, usize>;

struct PlacerState<'a> {
    region: &'a AllowedRegion,
    params: &'a PlacementParams,
    ladder: Vec<f64>,
    next: usize,
    placements: Vec<Placement>,
    /// Page rectangles grown by `gap_mm / 2` on every side.
    padded: Vec<[[f64; 2]; 4]>,
    index: RTree<Footprint>,
}

/// A candidate page rectangle.
struct Candidate {
    center: [f64; 2],
    width: f64,
    height: f64,
    angle: f64,
}

impl<'a> PlacerState<'a> {
    fn new(region: &'a AllowedRegion, params: &'a PlacementParams) -> Self {
        Self {
            region,
            params,
            ladder: params.ladder(),
            next: 0,
            placements: Vec::new(),
            padded: Vec::new(),
            index: RTree::new(),
        }
    }

    /// Places pages along one rail. Returns the deepest inward extent of the pages placed on it.
    fn walk_curve(&mut self, ci: usize, curve: &GuidanceCurve, pages: &[PageSpec]) -> Option<f64> {
        let len = curve.length();
        let gap = self.params.gap_mm;
        let mut s = 0.0;
        let mut deepest: Option<f64> = None;
        let mut probes = 0usize;

        while self.next < pages.len() {
            let page = pages[self.next];
            let Some(start) = curve.sample(s) else { break };
            let min_advance = self.along_extent(&page, self.params.scale_min, &start);
            if s + min_advance > len + TOUCH_EPSILON {
                break;
            }
            match self.fit_at(curve, s, &page) {
                Some((cand, scale, advance, depth)) => {
                    self.commit(ci, cand, scale);
                    deepest = Some(deepest.map_or(depth, |d: f64| d.max(depth)));
                    s += advance + gap;
                }
                None => {
                    probes += 1;
                    s += min_advance + gap.max(RAIL_CLEARANCE_MM);
                }
            }
        }
        debug!(
            curve = ci,
            length = len,
            placed_total = self.placements.len(),
            probes,
            "rail walked"
        );
        deepest
    }

    /// Largest scale that fits with its leading edge at arc length `s`.
    fn fit_at(
        &self,
        curve: &GuidanceCurve,
        s: f64,
        page: &PageSpec,
    ) -> Option<(Candidate, f64, f64, f64)> {
        let len = curve.length();
        let start = curve.sample(s)?;
        for &scale in &self.ladder {
            let advance = self.along_extent(page, scale, &start);
            if s + advance > len + TOUCH_EPSILON {
                continue;
            }
            let mid = curve.sample(s + advance / 2.0)?;
            let cand = self.candidate(page, scale, &mid);
            let depth = self.across_extent(page, scale, &mid);
            if self.is_free(&cand) {
                return Some((cand, scale, advance, depth));
            }
        }
        None
    }

    fn along_extent(&self, page: &PageSpec, scale: f64, at: &CurveSample) -> f64 {
        let (w, h) = (page.width_mm() * scale, page.height_mm() * scale);
        match self.params.orientation {
            Orientation::Tangent => w,
            Orientation::Upright => w * at.tangent[0].abs() + h * at.tangent[1].abs(),
        }
    }

    fn across_extent(&self, page: &PageSpec, scale: f64, at: &CurveSample) -> f64 {
        let (w, h) = (page.width_mm() * scale, page.height_mm() * scale);
        match self.params.orientation {
            Orientation::Tangent => h,
            Orientation::Upright => w * at.normal[0].abs() + h * at.normal[1].abs(),
        }
    }

    /// Page resting on the rail at `at`, extending inward along the normal.
    fn candidate(&self, page: &PageSpec, scale: f64, at: &CurveSample) -> Candidate {
        let depth = self.across_extent(page, scale, at);
        let lift = depth / 2.0 + (self.params.gap_mm / 2.0).max(RAIL_CLEARANCE_MM);
        let angle = match self.params.orientation {
            Orientation::Tangent => at.angle(),
            Orientation::Upright => 0.0,
        };
        Candidate {
            center: [
                at.point[0] + at.normal[0] * lift,
                at.point[1] + at.normal[1] * lift,
            ],
            width: page.width_mm() * scale,
            height: page.height_mm() * scale,
            angle,
        }
    }

    fn is_free(&self, cand: &Candidate) -> bool {
        let corners = rotated_rect_corners(cand.center, cand.width, cand.height, cand.angle);
        if !self.region.contains_ring(&corners) {
            return false;
        }
        let padded = self.padded_corners(cand);
        let (lo, hi) = crate::geometry::region::ring_bounds(&padded);
        !self
            .index
            .locate_in_envelope_intersecting(&AABB::from_corners(lo, hi))
            .any(|hit| rects_overlap(&padded, &self.padded[hit.data]))
    }

    fn padded_corners(&self, cand: &Candidate) -> [[f64; 2]; 4] {
        let g = self.params.gap_mm;
        rotated_rect_corners(cand.center, cand.width + g, cand.height + g, cand.angle)
    }

    fn commit(&mut self, curve: usize, cand: Candidate, scale: f64) {
        let padded = self.padded_corners(&cand);
        let (lo, hi) = crate::geometry::region::ring_bounds(&padded);
        let slot = self.padded.len();
        self.padded.push(padded);
        self.index
            .insert(GeomWithData::new(Rectangle::from_corners(lo, hi), slot));
        self.placements.push(Placement {
            page_index: self.next,
            x_mm: cand.center[0],
            y_mm: cand.center[1],
            scale,
            rotation_deg: cand.angle.to_degrees(),
            width_mm: cand.width,
            height_mm: cand.height,
            curve,
        });
        self.next += 1;
    }
}

/// Separating-axis test for two rectangles given as corner quads. Touching is not overlap.
pub(crate) fn rects_overlap(a: &[[f64; 2]; 4], b: &[[f64; 2]; 4]) -> bool {
    for quad in [a, b] {
        for i in 0..2 {
            let (p, q) = (quad[i], quad[i + 1]);
            let axis = [p[1] - q[1], q[0] - p[0]];
            let (a_min, a_max) = project(a, axis);
            let (b_min, b_max) = project(b, axis);
            let scale = axis[0].hypot(axis[1]).max(1.0);
            if a_max <= b_min + TOUCH_EPSILON * scale || b_max <= a_min + TOUCH_EPSILON * scale {
                return false;
            }
        }
    }
    true
}

fn project(quad: &[[f64; 2]; 4], axis: [f64; 2]) -> (f64, f64) {
    quad.iter()
        .map(|p| p[0] * axis[0] + p[1] * axis[1])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
}
