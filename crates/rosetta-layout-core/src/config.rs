use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Layout configuration.
/// Key notes:
///   - `orientation` decides whether pages follow the guidance curve (`tangent`) or stay at 0°
///   - `target_dpi` switches page sizing from `nominal_height_mm` to region-filling optimization
///   - `max_canvas_pixels` / `max_axis_pixels` are admission limits checked before any raster work
///   - `envelope` and `bin_gap_px` only affect fixed-bin packing jobs

/// Page orientation along guidance curves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Page width axis follows the local curve tangent.
    Tangent,
    /// Rotation fixed at 0°.
    Upright,
}

impl FromStr for Orientation {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tangent" => Ok(Self::Tangent),
            "upright" => Ok(Self::Upright),
            _ => Err(()),
        }
    }
}

/// Target boundary shape for fixed-bin packing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeShape {
    Square,
    Rectangle,
    Circle,
    Ellipse,
}

impl FromStr for EnvelopeShape {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "square" => Ok(Self::Square),
            "rectangle" | "rect" => Ok(Self::Rectangle),
            "circle" => Ok(Self::Circle),
            "ellipse" => Ok(Self::Ellipse),
            _ => Err(()),
        }
    }
}

/// Envelope shape plus width/height aspect ratio (ignored for square and circle).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub shape: EnvelopeShape,
    #[serde(default = "default_envelope_aspect")]
    pub aspect_ratio: f64,
}

impl Envelope {
    pub fn square() -> Self {
        Self {
            shape: EnvelopeShape::Square,
            aspect_ratio: 1.0,
        }
    }
    pub fn rectangle(aspect_ratio: f64) -> Self {
        Self {
            shape: EnvelopeShape::Rectangle,
            aspect_ratio,
        }
    }
    pub fn circle() -> Self {
        Self {
            shape: EnvelopeShape::Circle,
            aspect_ratio: 1.0,
        }
    }
    pub fn ellipse(aspect_ratio: f64) -> Self {
        Self {
            shape: EnvelopeShape::Ellipse,
            aspect_ratio,
        }
    }

    /// Aspect ratio the packer actually targets: 1.0 for square and circle.
    pub fn effective_aspect(&self) -> f64 {
        match self.shape {
            EnvelopeShape::Square | EnvelopeShape::Circle => 1.0,
            EnvelopeShape::Rectangle | EnvelopeShape::Ellipse => self.aspect_ratio,
        }
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::square()
    }
}

/// Pixel ceilings enforced by the canvas sizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CanvasLimits {
    /// Budget for `width_px * height_px`.
    pub max_canvas_pixels: u64,
    /// Hard per-axis ceiling of the raster backend.
    pub max_axis_pixels: u64,
}

impl Default for CanvasLimits {
    fn default() -> Self {
        Self {
            max_canvas_pixels: default_max_canvas_pixels(),
            max_axis_pixels: default_max_axis_pixels(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Minimum spacing between pages (mm).
    #[serde(default = "default_gap_mm")]
    pub gap_mm: f64,
    #[serde(default = "default_orientation")]
    pub orientation: Orientation,
    /// Page scale bounds, relative to the nominal page size.
    #[serde(default = "default_scale_min")]
    pub scale_min: f64,
    #[serde(default = "default_scale_max")]
    pub scale_max: f64,
    /// Number of scale probes between `scale_max` and `scale_min`.
    #[serde(default = "default_scale_steps")]
    pub scale_steps: u32,

    /// Inward offset between consecutive guidance curves (mm).
    #[serde(default = "default_streamline_step_mm")]
    pub streamline_step_mm: f64,
    #[serde(default = "default_max_streamlines")]
    pub max_streamlines: usize,

    /// Page height used when no DPI optimization is requested.
    #[serde(default = "default_nominal_height_mm")]
    pub nominal_height_mm: f64,
    /// Optimize the page size to fill the region at this DPI.
    #[serde(default)]
    pub target_dpi: Option<u32>,
    /// Raster DPI of the canvas when neither `target_mb` nor `target_dpi` is set.
    #[serde(default = "default_output_dpi")]
    pub output_dpi: u32,
    #[serde(default = "default_max_canvas_pixels")]
    pub max_canvas_pixels: u64,
    #[serde(default = "default_max_axis_pixels")]
    pub max_axis_pixels: u64,
    /// Above this page count the sizer skips the region area computation.
    #[serde(default = "default_large_document_threshold")]
    pub large_document_threshold: usize,
    /// Width/height ratio assumed for large documents.
    #[serde(default = "default_assumed_aspect_ratio")]
    pub assumed_aspect_ratio: f64,
    #[serde(default = "default_min_page_height_mm")]
    pub min_page_height_mm: f64,
    #[serde(default = "default_max_page_height_mm")]
    pub max_page_height_mm: f64,

    /// Extra margin around the region bounds on the canvas (mm).
    #[serde(default = "default_canvas_margin_mm")]
    pub canvas_margin_mm: f64,
    /// Round canvas dimensions up to multiples of this value (mm).
    #[serde(default)]
    pub canvas_bin_mm: Option<f64>,
    /// Derive the output DPI from an approximate raster size in MB.
    #[serde(default)]
    pub target_mb: Option<f64>,
    /// 1 for bilevel output, 8 for grayscale.
    #[serde(default = "default_bits_per_pixel")]
    pub bits_per_pixel: u8,
    /// Grow the boundary shapes when the region cannot hold the page set.
    #[serde(default)]
    pub auto_scale_shapes: bool,
    /// Adaptive sizing: search the page height reaching this fill ratio.
    #[serde(default)]
    pub target_fill_ratio: Option<f64>,

    // fixed-bin packing
    #[serde(default)]
    pub envelope: Envelope,
    /// Pixels between bins (spiral modes).
    #[serde(default)]
    pub bin_gap_px: u32,

    /// Evaluate candidate grids in parallel when feature "parallel" is on.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            gap_mm: default_gap_mm(),
            orientation: default_orientation(),
            scale_min: default_scale_min(),
            scale_max: default_scale_max(),
            scale_steps: default_scale_steps(),
            streamline_step_mm: default_streamline_step_mm(),
            max_streamlines: default_max_streamlines(),
            nominal_height_mm: default_nominal_height_mm(),
            target_dpi: None,
            output_dpi: default_output_dpi(),
            max_canvas_pixels: default_max_canvas_pixels(),
            max_axis_pixels: default_max_axis_pixels(),
            large_document_threshold: default_large_document_threshold(),
            assumed_aspect_ratio: default_assumed_aspect_ratio(),
            min_page_height_mm: default_min_page_height_mm(),
            max_page_height_mm: default_max_page_height_mm(),
            canvas_margin_mm: default_canvas_margin_mm(),
            canvas_bin_mm: None,
            target_mb: None,
            bits_per_pixel: default_bits_per_pixel(),
            auto_scale_shapes: false,
            target_fill_ratio: None,
            envelope: Envelope::default(),
            bin_gap_px: 0,
            parallel: default_parallel(),
        }
    }
}

impl LayoutConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - Spacing, step or scale values are negative, zero where a positive value is required, or not finite
    /// - Scale or page-height bounds are inverted
    /// - Pixel ceilings or DPI values are zero
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::LayoutError;

        let positive = [
            ("streamline_step_mm", self.streamline_step_mm),
            ("nominal_height_mm", self.nominal_height_mm),
            ("scale_min", self.scale_min),
            ("scale_max", self.scale_max),
            ("assumed_aspect_ratio", self.assumed_aspect_ratio),
            ("min_page_height_mm", self.min_page_height_mm),
            ("max_page_height_mm", self.max_page_height_mm),
            ("envelope.aspect_ratio", self.envelope.aspect_ratio),
        ];
        for (name, v) in positive {
            if !v.is_finite() || v <= 0.0 {
                return Err(LayoutError::InvalidConfig(format!(
                    "{name} must be a positive number (got {v})"
                )));
            }
        }
        for (name, v) in [("gap_mm", self.gap_mm), ("canvas_margin_mm", self.canvas_margin_mm)] {
            if !v.is_finite() || v < 0.0 {
                return Err(LayoutError::InvalidConfig(format!(
                    "{name} must be zero or positive (got {v})"
                )));
            }
        }
        if self.scale_min > self.scale_max {
            return Err(LayoutError::InvalidConfig(format!(
                "scale_min ({}) exceeds scale_max ({})",
                self.scale_min, self.scale_max
            )));
        }
        if self.min_page_height_mm > self.max_page_height_mm {
            return Err(LayoutError::InvalidConfig(format!(
                "min_page_height_mm ({}) exceeds max_page_height_mm ({})",
                self.min_page_height_mm, self.max_page_height_mm
            )));
        }
        if self.max_streamlines == 0 {
            return Err(LayoutError::InvalidConfig(
                "max_streamlines must be at least 1".into(),
            ));
        }
        if self.max_canvas_pixels == 0 || self.max_axis_pixels == 0 {
            return Err(LayoutError::InvalidConfig(
                "pixel ceilings must be non-zero".into(),
            ));
        }
        if self.output_dpi == 0 || self.target_dpi == Some(0) {
            return Err(LayoutError::InvalidConfig("DPI must be non-zero".into()));
        }
        if !matches!(self.bits_per_pixel, 1 | 8) {
            return Err(LayoutError::InvalidConfig(format!(
                "bits_per_pixel must be 1 or 8 (got {})",
                self.bits_per_pixel
            )));
        }
        if let Some(b) = self.canvas_bin_mm {
            if !b.is_finite() || b <= 0.0 {
                return Err(LayoutError::InvalidConfig(format!(
                    "canvas_bin_mm must be positive (got {b})"
                )));
            }
        }
        if let Some(mb) = self.target_mb {
            if !mb.is_finite() || mb <= 0.0 {
                return Err(LayoutError::InvalidConfig(format!(
                    "target_mb must be positive (got {mb})"
                )));
            }
        }
        if let Some(r) = self.target_fill_ratio {
            if !r.is_finite() || r <= 0.0 || r > 1.0 {
                return Err(LayoutError::InvalidConfig(format!(
                    "target_fill_ratio must be in (0, 1] (got {r})"
                )));
            }
        }
        Ok(())
    }

    /// Pixel ceilings as a standalone record for the canvas sizer.
    pub fn limits(&self) -> CanvasLimits {
        CanvasLimits {
            max_canvas_pixels: self.max_canvas_pixels,
            max_axis_pixels: self.max_axis_pixels,
        }
    }
}

fn default_gap_mm() -> f64 {
    0.5
}
fn default_orientation() -> Orientation {
    Orientation::Tangent
}
fn default_scale_min() -> f64 {
    0.1
}
fn default_scale_max() -> f64 {
    1.0
}
fn default_scale_steps() -> u32 {
    10
}
fn default_streamline_step_mm() -> f64 {
    2.0
}
fn default_max_streamlines() -> usize {
    200
}
fn default_nominal_height_mm() -> f64 {
    3.0
}
fn default_output_dpi() -> u32 {
    1200
}
fn default_max_canvas_pixels() -> u64 {
    100_000_000
}
fn default_max_axis_pixels() -> u64 {
    1 << 30
}
fn default_large_document_threshold() -> usize {
    500
}
fn default_assumed_aspect_ratio() -> f64 {
    1.4
}
fn default_min_page_height_mm() -> f64 {
    1.0
}
fn default_max_page_height_mm() -> f64 {
    50.0
}
fn default_canvas_margin_mm() -> f64 {
    5.0
}
fn default_bits_per_pixel() -> u8 {
    1
}
fn default_envelope_aspect() -> f64 {
    1.0
}
fn default_parallel() -> bool {
    false
}

/// Builder for `LayoutConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct LayoutConfigBuilder {
    cfg: LayoutConfig,
}

impl LayoutConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: LayoutConfig::default(),
        }
    }
    pub fn gap_mm(mut self, v: f64) -> Self {
        self.cfg.gap_mm = v;
        self
    }
    pub fn orientation(mut self, v: Orientation) -> Self {
        self.cfg.orientation = v;
        self
    }
    pub fn scale_range(mut self, min: f64, max: f64) -> Self {
        self.cfg.scale_min = min;
        self.cfg.scale_max = max;
        self
    }
    pub fn scale_steps(mut self, v: u32) -> Self {
        self.cfg.scale_steps = v;
        self
    }
    pub fn streamline_step_mm(mut self, v: f64) -> Self {
        self.cfg.streamline_step_mm = v;
        self
    }
    pub fn max_streamlines(mut self, v: usize) -> Self {
        self.cfg.max_streamlines = v;
        self
    }
    pub fn nominal_height_mm(mut self, v: f64) -> Self {
        self.cfg.nominal_height_mm = v;
        self
    }
    pub fn target_dpi(mut self, v: Option<u32>) -> Self {
        self.cfg.target_dpi = v;
        self
    }
    pub fn output_dpi(mut self, v: u32) -> Self {
        self.cfg.output_dpi = v;
        self
    }
    pub fn max_canvas_pixels(mut self, v: u64) -> Self {
        self.cfg.max_canvas_pixels = v;
        self
    }
    pub fn max_axis_pixels(mut self, v: u64) -> Self {
        self.cfg.max_axis_pixels = v;
        self
    }
    pub fn large_document_threshold(mut self, v: usize) -> Self {
        self.cfg.large_document_threshold = v;
        self
    }
    pub fn page_height_bounds(mut self, min: f64, max: f64) -> Self {
        self.cfg.min_page_height_mm = min;
        self.cfg.max_page_height_mm = max;
        self
    }
    pub fn canvas_margin_mm(mut self, v: f64) -> Self {
        self.cfg.canvas_margin_mm = v;
        self
    }
    pub fn canvas_bin_mm(mut self, v: Option<f64>) -> Self {
        self.cfg.canvas_bin_mm = v;
        self
    }
    pub fn target_mb(mut self, v: Option<f64>) -> Self {
        self.cfg.target_mb = v;
        self
    }
    pub fn bits_per_pixel(mut self, v: u8) -> Self {
        self.cfg.bits_per_pixel = v;
        self
    }
    pub fn auto_scale_shapes(mut self, v: bool) -> Self {
        self.cfg.auto_scale_shapes = v;
        self
    }
    pub fn target_fill_ratio(mut self, v: Option<f64>) -> Self {
        self.cfg.target_fill_ratio = v;
        self
    }
    pub fn envelope(mut self, v: Envelope) -> Self {
        self.cfg.envelope = v;
        self
    }
    pub fn bin_gap_px(mut self, v: u32) -> Self {
        self.cfg.bin_gap_px = v;
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.cfg.parallel = v;
        self
    }
    pub fn build(self) -> LayoutConfig {
        self.cfg
    }
}

impl LayoutConfig {
    /// Create a fluent builder for `LayoutConfig`.
    pub fn builder() -> LayoutConfigBuilder {
        LayoutConfigBuilder::new()
    }
}
