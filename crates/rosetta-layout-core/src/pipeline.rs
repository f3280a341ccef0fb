use crate::binpack::{PackOptions, pack_bins_with};
use crate::config::{CanvasLimits, LayoutConfig};
use crate::error::{LayoutError, Result};
use crate::geometry::{AllowedRegion, ShapeProfile, compute_allowed_region};
use crate::guidance::{GuidanceField, plan_guidance_field};
use crate::model::{BinSpec, CanvasSpec, LayoutStats, PackingResult, PageSpec, PlacementStatus, Placement};
use crate::placer::{PlacementParams, PlacementRun, place_pages_observed};
use crate::progress::{Checkpoint, JobObserver, NoopObserver};
use crate::sizing::{
    SizingParams, canvas_spec, dpi_for_target_mb, optimal_page_height, raster_mb,
    region_scale_factor, required_area_mm2,
};
use geo::{BoundingRect, MultiPolygon, Point, Scale};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Page height used for a single page when a target DPI is set.
const SINGLE_PAGE_HEIGHT_MM: (f64, f64) = (25.0, 40.0);
/// Page-height window searched by adaptive sizing.
const ADAPTIVE_HEIGHT_MM: (f64, f64) = (0.5, 50.0);
const ADAPTIVE_ITERATIONS: usize = 10;

/// Output of a layout job.
///
/// Placement coordinates are canvas millimetres: origin at the canvas' lower-left corner, y up,
/// region centred on the canvas.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutOutput {
    pub placements: Vec<Placement>,
    pub canvas: CanvasSpec,
    pub canvas_width_mm: f64,
    pub canvas_height_mm: f64,
    pub status: PlacementStatus,
    pub stats: LayoutStats,
    pub profile: ShapeProfile,
}

impl LayoutOutput {
    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }
}

pub fn plan_layout(
    outer: &MultiPolygon<f64>,
    inners: &[MultiPolygon<f64>],
    pages: &[PageSpec],
    cfg: LayoutConfig,
) -> Result<LayoutOutput> {
    plan_layout_observed(outer, inners, pages, cfg, &mut NoopObserver)
}

/// Lays `pages` out inside `outer` minus `inners`.
///
/// Geometry and canvas admission failures are returned before any placement work. Running out of
/// rails or being cancelled is not an error; see [`LayoutOutput::status`].
#[instrument(skip_all, fields(pages = pages.len(), inners = inners.len()))]
pub fn plan_layout_observed(
    outer: &MultiPolygon<f64>,
    inners: &[MultiPolygon<f64>],
    pages: &[PageSpec],
    cfg: LayoutConfig,
    observer: &mut dyn JobObserver,
) -> Result<LayoutOutput> {
    cfg.validate()?;
    if pages.is_empty() {
        return Err(LayoutError::InvalidInput("no pages to lay out".into()));
    }

    let mut region = compute_allowed_region(outer, inners)?;
    let sizing = SizingParams::from_config(&cfg);
    let limits = cfg.limits();
    let page_height = nominal_page_height(&region, pages, &cfg, &sizing)?;

    if cfg.auto_scale_shapes {
        let required = required_area_mm2(pages, page_height, cfg.gap_mm);
        if region.area() < required {
            let dpi = cfg.target_dpi.unwrap_or(cfg.output_dpi);
            let factor = region_scale_factor(&region, required, dpi, &limits)?;
            info!(factor, required_mm2 = required, "growing boundary shapes");
            region = rescaled_region(outer, inners, factor)?;
        }
    }

    let profile = ShapeProfile::of(&region);
    info!(
        class = ?profile.class,
        rectangularity = profile.rectangularity,
        area_mm2 = profile.area_mm2,
        "region profile"
    );

    // admission control before any placement work
    let (canvas_w, canvas_h) = canvas_extent(&region, &cfg);
    let dpi = output_dpi(canvas_w, canvas_h, &cfg, &limits);
    let canvas = canvas_spec(canvas_w, canvas_h, dpi, &limits)?;

    let field = plan_guidance_field(&region, cfg.streamline_step_mm, cfg.max_streamlines)?;
    let params = PlacementParams::from_config(&cfg);
    let (height, run) = match cfg.target_fill_ratio {
        Some(target) => adaptive_layout(&region, &field, pages, &params, &sizing, target, observer),
        None => {
            let sized = sized_pages(pages, page_height);
            (page_height, place_pages_observed(&sized, &region, &field, &params, observer))
        }
    };

    let PlacementRun {
        mut placements,
        placed,
        status,
    } = run;
    let b = region.bounds();
    let (dx, dy) = (canvas_w / 2.0 - b.center().x, canvas_h / 2.0 - b.center().y);
    for p in &mut placements {
        p.x_mm += dx;
        p.y_mm += dy;
    }

    let stats = LayoutStats {
        requested: pages.len(),
        placed,
        curves: field.len(),
        page_height_mm: height,
        region_area_mm2: region.area(),
        utilization: placed_area(&placements) / region.area(),
    };
    if let PlacementStatus::Incomplete { placed, requested } = status {
        warn!(placed, requested, "layout incomplete");
    }
    info!("{}", stats.summary());
    Ok(LayoutOutput {
        placements,
        canvas,
        canvas_width_mm: canvas_w,
        canvas_height_mm: canvas_h,
        status,
        stats,
        profile,
    })
}

fn nominal_page_height(
    region: &AllowedRegion,
    pages: &[PageSpec],
    cfg: &LayoutConfig,
    sizing: &SizingParams,
) -> Result<f64> {
    let Some(dpi) = cfg.target_dpi else {
        return Ok(cfg.nominal_height_mm);
    };
    if pages.len() == 1 {
        let (lo, hi) = SINGLE_PAGE_HEIGHT_MM;
        return Ok(cfg.nominal_height_mm.clamp(lo, hi));
    }
    optimal_page_height(region, pages, dpi, sizing)
}

fn sized_pages(pages: &[PageSpec], height_mm: f64) -> Vec<PageSpec> {
    pages.iter().map(|p| p.with_height(height_mm)).collect()
}

fn placed_area(placements: &[Placement]) -> f64 {
    placements.iter().map(Placement::area_mm2).sum()
}

/// Scales every shape about the outer shape's bounding-box centre and rebuilds the region.
fn rescaled_region(
    outer: &MultiPolygon<f64>,
    inners: &[MultiPolygon<f64>],
    factor: f64,
) -> Result<AllowedRegion> {
    let origin = outer
        .bounding_rect()
        .map(|r| Point::from(r.center()))
        .ok_or_else(|| LayoutError::InvalidInput("outer shape is empty".into()))?;
    let outer = outer.scale_around_point(factor, factor, origin);
    let inners: Vec<MultiPolygon<f64>> = inners
        .iter()
        .map(|s| s.scale_around_point(factor, factor, origin))
        .collect();
    compute_allowed_region(&outer, &inners)
}

/// Region bounds plus margins, rounded up to `canvas_bin_mm` when set.
fn canvas_extent(region: &AllowedRegion, cfg: &LayoutConfig) -> (f64, f64) {
    let b = region.bounds();
    let w = b.width() + 2.0 * cfg.canvas_margin_mm;
    let h = b.height() + 2.0 * cfg.canvas_margin_mm;
    match cfg.canvas_bin_mm {
        Some(bin) => ((w / bin).ceil() * bin, (h / bin).ceil() * bin),
        None => (w, h),
    }
}

fn output_dpi(width_mm: f64, height_mm: f64, cfg: &LayoutConfig, limits: &CanvasLimits) -> u32 {
    match (cfg.target_mb, cfg.target_dpi) {
        (Some(mb), _) => dpi_for_target_mb(width_mm, height_mm, mb, cfg.bits_per_pixel, limits),
        (None, Some(dpi)) => dpi,
        (None, None) => cfg.output_dpi,
    }
}

/// Bisects the page height towards `target_fill`, keeping the best-scoring run
/// (`0.7 * utilization + 0.3 * placed ratio`).
fn adaptive_layout(
    region: &AllowedRegion,
    field: &GuidanceField,
    pages: &[PageSpec],
    params: &PlacementParams,
    sizing: &SizingParams,
    target_fill: f64,
    observer: &mut dyn JobObserver,
) -> (f64, PlacementRun) {
    let mut lo = ADAPTIVE_HEIGHT_MM.0.max(sizing.min_height_mm);
    let mut hi = ADAPTIVE_HEIGHT_MM.1.min(sizing.max_height_mm).max(lo);
    let mut best: Option<(f64, f64, PlacementRun)> = None;

    for iteration in 0..ADAPTIVE_ITERATIONS {
        let height = (lo + hi) / 2.0;
        let run = place_pages_observed(&sized_pages(pages, height), region, field, params, observer);
        let fill = placed_area(&run.placements) / region.area();
        let placed_ratio = run.placed as f64 / pages.len() as f64;
        let score = 0.7 * fill + 0.3 * placed_ratio;
        debug!(iteration, height, fill, placed_ratio, score, "adaptive sizing step");

        let cancelled = matches!(run.status, PlacementStatus::Cancelled { .. });
        let all_placed = run.placed == pages.len();
        if best.as_ref().is_none_or(|(_, s, _)| score > *s) || cancelled {
            best = Some((height, score, run));
        }
        if cancelled {
            break;
        }
        let event = Checkpoint::SizingIteration {
            iteration,
            height_mm: height,
            score,
        };
        if observer.checkpoint(&event).is_break() {
            break;
        }
        if all_placed && fill < target_fill {
            lo = height;
        } else {
            hi = height;
        }
    }

    match best {
        Some((height, score, run)) => {
            info!(height_mm = height, score, "adaptive sizing finished");
            (height, run)
        }
        None => (
            lo,
            PlacementRun {
                placements: Vec::new(),
                placed: 0,
                status: PlacementStatus::from_counts(0, pages.len(), true),
            },
        ),
    }
}

pub fn pack_bin_job(bin: BinSpec, bin_count: usize, cfg: LayoutConfig) -> Result<PackingResult> {
    pack_bin_job_observed(bin, bin_count, cfg, &mut NoopObserver)
}

/// Packs identical bins into the configured envelope and admits the realized canvas against the
/// per-axis ceiling.
#[instrument(skip_all, fields(bins = bin_count))]
pub fn pack_bin_job_observed(
    bin: BinSpec,
    bin_count: usize,
    cfg: LayoutConfig,
    observer: &mut dyn JobObserver,
) -> Result<PackingResult> {
    cfg.validate()?;
    let opts = PackOptions::from_config(&cfg);
    let result = pack_bins_with(bin, cfg.envelope, bin_count, &opts, observer)?;
    let (w, h) = (result.canvas_width_px, result.canvas_height_px);
    let axis = cfg.max_axis_pixels;
    if w > axis || h > axis {
        let shrink = axis as f64 / w.max(h) as f64;
        let fitted_w = (w as f64 * shrink).floor() as u64;
        let fitted_h = (h as f64 * shrink).floor() as u64;
        let mb = raster_mb(fitted_w, fitted_h, cfg.bits_per_pixel);
        warn!(width_px = w, height_px = h, suggested_mb = mb, "packed canvas exceeds axis ceiling");
        return Err(LayoutError::Overflow {
            width_px: w,
            height_px: h,
            limit: format!("{axis} px per axis"),
            suggested_dpi: None,
            suggested_target_mb: Some(mb),
        });
    }
    info!("{}", result.summary());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::shapes::{rectangle, shape};

    #[test]
    fn canvas_rounds_up_to_bins() {
        let region = compute_allowed_region(&shape(rectangle(0.0, 0.0, 91.0, 42.0)), &[]).unwrap();
        let cfg = LayoutConfig::builder()
            .canvas_margin_mm(5.0)
            .canvas_bin_mm(Some(25.0))
            .build();
        assert_eq!(canvas_extent(&region, &cfg), (125.0, 75.0));
    }

    #[test]
    fn target_size_takes_precedence_over_dpi() {
        let limits = CanvasLimits::default();
        let cfg = LayoutConfig::builder()
            .target_dpi(Some(600))
            .target_mb(Some(1.0))
            .build();
        let dpi = output_dpi(100.0, 100.0, &cfg, &limits);
        assert_ne!(dpi, 600);
        let cfg = LayoutConfig::builder().target_dpi(Some(600)).build();
        assert_eq!(output_dpi(100.0, 100.0, &cfg, &limits), 600);
    }
}
