use crate::config::Envelope;
use crate::error::{LayoutError, Result};
use crate::units::pt_to_mm;
use serde::{Deserialize, Serialize};

/// Page size in millimetres. `aspect_ratio = width / height`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PageSpec {
    width_mm: f64,
    height_mm: f64,
    aspect_ratio: f64,
}

impl PageSpec {
    pub fn new(width_mm: f64, height_mm: f64) -> Result<Self> {
        if !(width_mm.is_finite() && height_mm.is_finite()) || width_mm <= 0.0 || height_mm <= 0.0
        {
            return Err(LayoutError::InvalidInput(format!(
                "page size must be positive ({width_mm} x {height_mm} mm)"
            )));
        }
        Ok(Self {
            width_mm,
            height_mm,
            aspect_ratio: width_mm / height_mm,
        })
    }

    /// Page size as reported by document decoders (PostScript points).
    pub fn from_points(width_pt: f64, height_pt: f64) -> Result<Self> {
        Self::new(pt_to_mm(width_pt), pt_to_mm(height_pt))
    }

    pub fn width_mm(&self) -> f64 {
        self.width_mm
    }
    pub fn height_mm(&self) -> f64 {
        self.height_mm
    }
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }
    pub fn area_mm2(&self) -> f64 {
        self.width_mm * self.height_mm
    }

    /// Same aspect ratio at the given height.
    pub fn with_height(&self, height_mm: f64) -> Self {
        Self {
            width_mm: self.aspect_ratio * height_mm,
            height_mm,
            aspect_ratio: self.aspect_ratio,
        }
    }
}

/// A placed page. `x_mm, y_mm` is the page centre; `width_mm/height_mm` are the scaled size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Placement {
    /// Index into the caller's page list.
    pub page_index: usize,
    pub x_mm: f64,
    pub y_mm: f64,
    pub scale: f64,
    pub rotation_deg: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    /// Guidance curve the page was threaded on.
    pub curve: usize,
}

impl Placement {
    /// Corners of the rotated page rectangle, counter-clockwise.
    pub fn corners(&self) -> [[f64; 2]; 4] {
        rotated_rect_corners(
            [self.x_mm, self.y_mm],
            self.width_mm,
            self.height_mm,
            self.rotation_deg.to_radians(),
        )
    }

    pub fn area_mm2(&self) -> f64 {
        self.width_mm * self.height_mm
    }
}

pub(crate) fn rotated_rect_corners(
    center: [f64; 2],
    width: f64,
    height: f64,
    angle_rad: f64,
) -> [[f64; 2]; 4] {
    let (s, c) = angle_rad.sin_cos();
    let hw = width / 2.0;
    let hh = height / 2.0;
    let local = [[-hw, -hh], [hw, -hh], [hw, hh], [-hw, hh]];
    local.map(|[lx, ly]| [center[0] + lx * c - ly * s, center[1] + lx * s + ly * c])
}

/// Raster canvas. Invariant: `width_px * height_px <= max_canvas_pixels` of the limits it was sized with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanvasSpec {
    pub width_px: u64,
    pub height_px: u64,
    pub dpi: u32,
}

impl CanvasSpec {
    pub fn pixel_count(&self) -> u64 {
        self.width_px * self.height_px
    }
}

/// Fixed pixel size shared by every tile of a packing job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BinSpec {
    pub width_px: u32,
    pub height_px: u32,
}

impl BinSpec {
    pub fn new(width_px: u32, height_px: u32) -> Self {
        Self {
            width_px,
            height_px,
        }
    }
    pub fn area(&self) -> u64 {
        self.width_px as u64 * self.height_px as u64
    }
    pub fn aspect_ratio(&self) -> f64 {
        self.width_px as f64 / self.height_px as f64
    }
}

/// A placed bin; `x_px, y_px` is its top-left corner on the canvas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BinPlacement {
    pub index: usize,
    pub x_px: u64,
    pub y_px: u64,
}

/// How the bins were arranged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PackingLayout {
    Grid {
        rows: u32,
        columns: u32,
    },
    Spiral {
        /// Arc length between consecutive spiral candidates.
        arc_step_px: f64,
        /// Radial growth per full turn.
        radius_step_px: f64,
        /// Horizontal (>1) or vertical (<1) stretch applied for ellipse envelopes.
        stretch: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingResult {
    pub layout: PackingLayout,
    pub envelope: Envelope,
    pub bin: BinSpec,
    pub placements: Vec<BinPlacement>,
    /// Realized envelope extent (diameters for circle/ellipse).
    pub envelope_width_px: f64,
    pub envelope_height_px: f64,
    pub canvas_width_px: u64,
    pub canvas_height_px: u64,
    /// Total bin area / envelope area.
    pub utilization: f64,
    pub requested: usize,
    pub placed: usize,
    pub status: PlacementStatus,
}

impl PackingResult {
    pub fn grid(&self) -> Option<(u32, u32)> {
        match self.layout {
            PackingLayout::Grid { rows, columns } => Some((rows, columns)),
            PackingLayout::Spiral { .. } => None,
        }
    }

    /// Returns a human-readable summary of the packing.
    pub fn summary(&self) -> String {
        let arrangement = match self.layout {
            PackingLayout::Grid { rows, columns } => format!("grid {rows}x{columns}"),
            PackingLayout::Spiral { stretch, .. } => format!("spiral (stretch {stretch:.3})"),
        };
        format!(
            "Bins: {}/{}, {}, Envelope: {:.0}x{:.0} px, Canvas: {}x{} px, Utilization: {:.2}%",
            self.placed,
            self.requested,
            arrangement,
            self.envelope_width_px,
            self.envelope_height_px,
            self.canvas_width_px,
            self.canvas_height_px,
            self.utilization * 100.0,
        )
    }
}

/// Outcome of a placement run. Partial layouts are valid results, not errors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlacementStatus {
    Complete,
    Incomplete { placed: usize, requested: usize },
    Cancelled { placed: usize, requested: usize },
}

impl PlacementStatus {
    pub fn from_counts(placed: usize, requested: usize, cancelled: bool) -> Self {
        if cancelled {
            PlacementStatus::Cancelled { placed, requested }
        } else if placed >= requested {
            PlacementStatus::Complete
        } else {
            PlacementStatus::Incomplete { placed, requested }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, PlacementStatus::Complete)
    }
}

/// Statistics about a page layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LayoutStats {
    pub requested: usize,
    pub placed: usize,
    /// Guidance curves generated for the run.
    pub curves: usize,
    /// Nominal page height before scaling.
    pub page_height_mm: f64,
    pub region_area_mm2: f64,
    /// Placed page area / region area.
    pub utilization: f64,
}

impl LayoutStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Placed: {}/{} pages, Curves: {}, Page height: {:.2} mm, Region: {:.1} mm², Utilization: {:.2}%",
            self.placed,
            self.requested,
            self.curves,
            self.page_height_mm,
            self.region_area_mm2,
            self.utilization * 100.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_spec_rejects_degenerate_sizes() {
        assert!(PageSpec::new(0.0, 10.0).is_err());
        assert!(PageSpec::new(10.0, f64::NAN).is_err());
        let p = PageSpec::new(21.0, 29.7).unwrap();
        assert!((p.aspect_ratio() - 21.0 / 29.7).abs() < 1e-12);
        let q = p.with_height(3.0);
        assert!((q.width_mm() - 3.0 * 21.0 / 29.7).abs() < 1e-12);
    }

    #[test]
    fn corners_follow_rotation() {
        let p = Placement {
            page_index: 0,
            x_mm: 0.0,
            y_mm: 0.0,
            scale: 1.0,
            rotation_deg: 90.0,
            width_mm: 4.0,
            height_mm: 2.0,
            curve: 0,
        };
        let c = p.corners();
        // width axis now points along +y
        assert!((c[0][0] - 1.0).abs() < 1e-9 && (c[0][1] + 2.0).abs() < 1e-9);
    }

    #[test]
    fn status_from_counts() {
        assert!(PlacementStatus::from_counts(3, 3, false).is_complete());
        assert_eq!(
            PlacementStatus::from_counts(2, 3, false),
            PlacementStatus::Incomplete {
                placed: 2,
                requested: 3
            }
        );
        assert_eq!(
            PlacementStatus::from_counts(3, 3, true),
            PlacementStatus::Cancelled {
                placed: 3,
                requested: 3
            }
        );
    }
}
