//! Fixed-size bin packing into an envelope shape.
//!
//! Rectangles and squares use a grid search; circles and ellipses grow a spiral from the centre.

use crate::config::{Envelope, EnvelopeShape, LayoutConfig};
use crate::error::{LayoutError, Result};
use crate::model::{BinSpec, PackingResult};
use crate::progress::{JobObserver, NoopObserver};
use tracing::instrument;

pub mod grid;
pub mod spiral;

pub use grid::GridPacker;
pub use spiral::SpiralPacker;

/// An envelope packer places `count` identical bins.
///
/// Implementations must never overlap bins and must report every placed bin in the result,
/// even when the observer cancels the run.
pub trait EnvelopePacker {
    /// Largest bin extent (width, height) the envelope can hold for `count` bins.
    fn max_extent(&self, bin: BinSpec, count: usize) -> (f64, f64);
    fn pack(
        &self,
        bin: BinSpec,
        count: usize,
        observer: &mut dyn JobObserver,
    ) -> Result<PackingResult>;
}

/// Knobs for a packing run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackOptions {
    /// Pixels kept between bins in spiral modes.
    pub gap_px: u32,
    /// Per-axis raster ceiling; a bin larger than this can never be drawn.
    pub max_axis_pixels: u64,
    pub parallel: bool,
}

impl PackOptions {
    pub fn from_config(cfg: &LayoutConfig) -> Self {
        Self {
            gap_px: cfg.bin_gap_px,
            max_axis_pixels: cfg.max_axis_pixels,
            parallel: cfg.parallel,
        }
    }
}

impl Default for PackOptions {
    fn default() -> Self {
        Self::from_config(&LayoutConfig::default())
    }
}

/// Packs `bin_count` copies of `bin` into `envelope` with default options.
pub fn pack_bins(bin: BinSpec, envelope: Envelope, bin_count: usize) -> Result<PackingResult> {
    pack_bins_with(bin, envelope, bin_count, &PackOptions::default(), &mut NoopObserver)
}

#[instrument(skip_all, fields(bins = bin_count, shape = ?envelope.shape))]
pub fn pack_bins_with(
    bin: BinSpec,
    envelope: Envelope,
    bin_count: usize,
    opts: &PackOptions,
    observer: &mut dyn JobObserver,
) -> Result<PackingResult> {
    if bin.width_px == 0 || bin.height_px == 0 {
        return Err(LayoutError::InvalidInput(format!(
            "bin must have positive size ({}x{} px)",
            bin.width_px, bin.height_px
        )));
    }
    if bin_count == 0 {
        return Err(LayoutError::InvalidInput("bin count must be positive".into()));
    }
    let aspect = envelope.effective_aspect();
    if !(aspect.is_finite() && aspect > 0.0) {
        return Err(LayoutError::InvalidInput(format!(
            "envelope aspect ratio must be positive, got {aspect}"
        )));
    }
    let packer: Box<dyn EnvelopePacker> = match envelope.shape {
        EnvelopeShape::Square | EnvelopeShape::Rectangle => {
            Box::new(GridPacker::new(envelope, opts.parallel))
        }
        EnvelopeShape::Circle | EnvelopeShape::Ellipse => {
            Box::new(SpiralPacker::new(envelope, opts.gap_px))
        }
    };
    let (max_w, max_h) = packer.max_extent(bin, bin_count);
    let (max_w, max_h) = (
        max_w.min(opts.max_axis_pixels as f64),
        max_h.min(opts.max_axis_pixels as f64),
    );
    if f64::from(bin.width_px) > max_w || f64::from(bin.height_px) > max_h {
        return Err(LayoutError::PackingInfeasible(format!(
            "bin {}x{} px exceeds the {:?} envelope extent {:.0}x{:.0} px",
            bin.width_px, bin.height_px, envelope.shape, max_w, max_h
        )));
    }
    packer.pack(bin, bin_count, observer)
}
