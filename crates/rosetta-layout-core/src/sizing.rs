//! Page and canvas sizing under pixel ceilings.
//!
//! These checks are admission control: they run before any raster buffer exists and report an
//! [`LayoutError::Overflow`] with a workable DPI instead of clamping dimensions.

use crate::config::{CanvasLimits, LayoutConfig};
use crate::error::{LayoutError, Result};
use crate::geometry::AllowedRegion;
use crate::model::{CanvasSpec, PageSpec};
use crate::units::{MM_PER_INCH, mm_to_px, px_per_mm};
use tracing::{debug, info, instrument, warn};

/// Upper bound for DPI derived from a target file size.
pub const MAX_TARGET_DPI: u32 = 5000;
/// Lower bound for DPI derived from a target file size.
pub const MIN_TARGET_DPI: u32 = 50;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Bounds and assumptions shared by the page-height calculations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingParams {
    pub min_height_mm: f64,
    pub max_height_mm: f64,
    pub assumed_aspect_ratio: f64,
    pub large_document_threshold: usize,
    pub limits: CanvasLimits,
}

impl SizingParams {
    pub fn from_config(cfg: &LayoutConfig) -> Self {
        Self {
            min_height_mm: cfg.min_page_height_mm,
            max_height_mm: cfg.max_page_height_mm,
            assumed_aspect_ratio: cfg.assumed_aspect_ratio,
            large_document_threshold: cfg.large_document_threshold,
            limits: cfg.limits(),
        }
    }

    fn clamp(&self, h: f64) -> f64 {
        h.clamp(self.min_height_mm, self.max_height_mm)
    }
}

impl Default for SizingParams {
    fn default() -> Self {
        Self::from_config(&LayoutConfig::default())
    }
}

/// Page height for a large document, estimated from the pixel budget alone.
///
/// The budget is treated as a square canvas at `target_dpi`; pages are assumed to share the
/// default aspect ratio and to sit in `sqrt(n * aspect)` columns.
pub fn safe_page_height(
    page_count: usize,
    target_dpi: u32,
    max_canvas_pixels: u64,
    min_h_mm: f64,
    max_h_mm: f64,
) -> Result<f64> {
    let params = SizingParams {
        min_height_mm: min_h_mm,
        max_height_mm: max_h_mm,
        limits: CanvasLimits {
            max_canvas_pixels,
            ..CanvasLimits::default()
        },
        ..SizingParams::default()
    };
    safe_page_height_with(page_count, target_dpi, &params)
}

#[instrument(skip_all, fields(page_count = page_count, target_dpi = target_dpi))]
pub fn safe_page_height_with(page_count: usize, target_dpi: u32, params: &SizingParams) -> Result<f64> {
    check_height_bounds(params)?;
    if page_count == 0 {
        return Err(LayoutError::InvalidInput("page count must be positive".into()));
    }
    if target_dpi == 0 {
        return Err(LayoutError::InvalidInput("target DPI must be positive".into()));
    }
    let aspect = params.assumed_aspect_ratio;
    let side_mm = (params.limits.max_canvas_pixels as f64).sqrt() / px_per_mm(target_dpi);
    let n = page_count as f64;
    let per_row = (n * aspect).sqrt();
    let rows = n / per_row;
    let raw = (side_mm / rows).min(side_mm / (per_row * aspect));
    let height = params.clamp(raw);
    if height != raw {
        debug!(raw, height, "page height clamped");
    }
    check_axis_extent(
        height * aspect * per_row.ceil(),
        height * rows.ceil(),
        target_dpi,
        &params.limits,
    )?;
    debug!(height_mm = height, "safe page height");
    Ok(height)
}

/// Page height that would fill `region` with `pages` at perfect packing, clamped to the bounds.
/// Documents above the large-document threshold fall back to [`safe_page_height_with`].
#[instrument(skip_all, fields(pages = pages.len(), dpi = dpi))]
pub fn optimal_page_height(
    region: &AllowedRegion,
    pages: &[PageSpec],
    dpi: u32,
    params: &SizingParams,
) -> Result<f64> {
    check_height_bounds(params)?;
    if pages.is_empty() {
        return Ok(params.min_height_mm);
    }
    if pages.len() > params.large_document_threshold {
        return safe_page_height_with(pages.len(), dpi, params);
    }
    if dpi == 0 {
        return Err(LayoutError::InvalidInput("DPI must be positive".into()));
    }
    let n = pages.len() as f64;
    let aspect_sum: f64 = pages.iter().map(PageSpec::aspect_ratio).sum();
    let avg_aspect = aspect_sum / n;
    let per_row = (n * avg_aspect).sqrt();
    let rows = n / per_row;
    let area = region.area();
    let raw = (area / (rows * per_row * avg_aspect)).sqrt();
    let height = params.clamp(raw);
    let efficiency = aspect_sum * height * height / area;
    info!(
        region_mm2 = area,
        perfect_height_mm = raw,
        height_mm = height,
        efficiency,
        "page height selected"
    );
    let b = region.bounds();
    check_axis_extent(b.width(), b.height(), dpi, &params.limits)?;
    Ok(height)
}

/// Linear factor that grows an area of `current_area` to `required_area`.
pub fn auto_scale_factor(current_area: f64, required_area: f64) -> Result<f64> {
    if !(current_area.is_finite() && current_area > 0.0) {
        return Err(LayoutError::InvalidInput(format!(
            "current area must be positive, got {current_area}"
        )));
    }
    if !(required_area.is_finite() && required_area >= 0.0) {
        return Err(LayoutError::InvalidInput(format!(
            "required area must be non-negative, got {required_area}"
        )));
    }
    Ok((required_area / current_area).sqrt())
}

/// [`auto_scale_factor`] for a region, verifying the grown region still rasterizes at `dpi`.
pub fn region_scale_factor(
    region: &AllowedRegion,
    required_area: f64,
    dpi: u32,
    limits: &CanvasLimits,
) -> Result<f64> {
    let factor = auto_scale_factor(region.area(), required_area)?;
    let b = region.bounds();
    check_axis_extent(b.width() * factor, b.height() * factor, dpi, limits)?;
    Ok(factor)
}

/// Area needed for `pages` at `page_height_mm`, including an estimate of the gaps of a
/// roughly square grid.
pub fn required_area_mm2(pages: &[PageSpec], page_height_mm: f64, gap_mm: f64) -> f64 {
    if pages.is_empty() {
        return 0.0;
    }
    let n = pages.len() as f64;
    let page_area: f64 = pages
        .iter()
        .map(|p| p.aspect_ratio() * page_height_mm * page_height_mm)
        .sum();
    let per_row = n.sqrt();
    let rows = n / per_row;
    let avg_width = pages.iter().map(PageSpec::aspect_ratio).sum::<f64>() / n * page_height_mm;
    let gap_area = (per_row - 1.0) * rows * avg_width * gap_mm
        + (rows - 1.0) * per_row * page_height_mm * gap_mm;
    page_area + gap_area
}

/// Pixel dimensions of a `width_mm` × `height_mm` canvas at `dpi`, admitted against `limits`.
#[instrument(skip_all, fields(width_mm = width_mm, height_mm = height_mm, dpi = dpi))]
pub fn canvas_spec(width_mm: f64, height_mm: f64, dpi: u32, limits: &CanvasLimits) -> Result<CanvasSpec> {
    if !(width_mm > 0.0 && height_mm > 0.0 && width_mm.is_finite() && height_mm.is_finite()) {
        return Err(LayoutError::InvalidInput(format!(
            "canvas must have positive size ({width_mm} x {height_mm} mm)"
        )));
    }
    if dpi == 0 {
        return Err(LayoutError::InvalidInput("DPI must be positive".into()));
    }
    let spec = CanvasSpec {
        width_px: mm_to_px(width_mm, dpi),
        height_px: mm_to_px(height_mm, dpi),
        dpi,
    };
    if fits(&spec, limits) {
        debug!(width_px = spec.width_px, height_px = spec.height_px, "canvas admitted");
        return Ok(spec);
    }
    let suggested = max_fitting_dpi(width_mm, height_mm, dpi, limits);
    warn!(
        width_px = spec.width_px,
        height_px = spec.height_px,
        suggested_dpi = suggested,
        "canvas exceeds pixel ceiling"
    );
    Err(LayoutError::Overflow {
        width_px: spec.width_px,
        height_px: spec.height_px,
        limit: format!(
            "{} px total, {} px per axis",
            limits.max_canvas_pixels, limits.max_axis_pixels
        ),
        suggested_dpi: Some(suggested),
        suggested_target_mb: None,
    })
}

/// DPI whose uncompressed raster is about `target_mb`, capped by the per-axis ceiling and
/// [`MAX_TARGET_DPI`], floored at [`MIN_TARGET_DPI`].
pub fn dpi_for_target_mb(
    width_mm: f64,
    height_mm: f64,
    target_mb: f64,
    bits_per_pixel: u8,
    limits: &CanvasLimits,
) -> u32 {
    let bytes = target_mb.max(1.0) * BYTES_PER_MB;
    let pixels = bytes * 8.0 / f64::from(bits_per_pixel.max(1));
    let area_in2 = (width_mm * height_mm).max(1e-6) / (MM_PER_INCH * MM_PER_INCH);
    let dpi = (pixels / area_in2).sqrt();
    let axis_dpi = axis_dpi(width_mm.max(height_mm), limits);
    let capped = dpi.min(axis_dpi.min(f64::from(MAX_TARGET_DPI)));
    let out = (capped.round() as u32).max(MIN_TARGET_DPI);
    debug!(target_mb, dpi = out, "dpi derived from target size");
    out
}

/// Uncompressed raster size in MB.
pub fn raster_mb(width_px: u64, height_px: u64, bits_per_pixel: u8) -> f64 {
    width_px as f64 * height_px as f64 * f64::from(bits_per_pixel) / 8.0 / BYTES_PER_MB
}

fn fits(spec: &CanvasSpec, limits: &CanvasLimits) -> bool {
    spec.width_px <= limits.max_axis_pixels
        && spec.height_px <= limits.max_axis_pixels
        && spec
            .width_px
            .checked_mul(spec.height_px)
            .is_some_and(|p| p <= limits.max_canvas_pixels)
}

fn axis_dpi(max_dim_mm: f64, limits: &CanvasLimits) -> f64 {
    (limits.max_axis_pixels as f64 * MM_PER_INCH / max_dim_mm).floor()
}

/// Largest DPI below `dpi` (at least 1) whose canvas fits both ceilings.
fn max_fitting_dpi(width_mm: f64, height_mm: f64, dpi: u32, limits: &CanvasLimits) -> u32 {
    let by_axis = axis_dpi(width_mm.max(height_mm), limits);
    let by_total =
        (limits.max_canvas_pixels as f64 / (width_mm * height_mm)).sqrt() * MM_PER_INCH;
    let mut guess = by_axis.min(by_total).floor().clamp(1.0, f64::from(dpi)) as u32;
    // rounding in mm_to_px can push the estimate a pixel over
    while guess > 1 {
        let spec = CanvasSpec {
            width_px: mm_to_px(width_mm, guess),
            height_px: mm_to_px(height_mm, guess),
            dpi: guess,
        };
        if fits(&spec, limits) {
            break;
        }
        guess -= 1;
    }
    guess
}

/// Fails when either axis of a `width_mm` × `height_mm` extent exceeds the per-axis ceiling.
pub(crate) fn check_axis_extent(
    width_mm: f64,
    height_mm: f64,
    dpi: u32,
    limits: &CanvasLimits,
) -> Result<()> {
    let (w, h) = (mm_to_px(width_mm, dpi), mm_to_px(height_mm, dpi));
    if w <= limits.max_axis_pixels && h <= limits.max_axis_pixels {
        return Ok(());
    }
    let suggested = (axis_dpi(width_mm.max(height_mm), limits) as u32).clamp(1, dpi.max(1));
    Err(LayoutError::Overflow {
        width_px: w,
        height_px: h,
        limit: format!("{} px per axis", limits.max_axis_pixels),
        suggested_dpi: Some(suggested),
        suggested_target_mb: None,
    })
}

fn check_height_bounds(params: &SizingParams) -> Result<()> {
    if !(params.min_height_mm > 0.0 && params.min_height_mm <= params.max_height_mm) {
        return Err(LayoutError::InvalidInput(format!(
            "page height bounds must satisfy 0 < min <= max ({} .. {})",
            params.min_height_mm, params.max_height_mm
        )));
    }
    Ok(())
}
