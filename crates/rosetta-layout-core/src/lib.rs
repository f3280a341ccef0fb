//! Geometric page placement for micro-archival layouts.
//!
//! - Geometry: allowed region = outer shape minus keep-out shapes, validated up front
//! - Guidance field: nested inward offsets used as placement rails
//! - Placement: pages threaded along the rails with scaling and collision checks
//! - Sizing: page height and canvas pixels under hard pixel ceilings
//! - Bin packing: identical bins into square, rectangle, circle or ellipse envelopes
//!
//! The crate works on in-memory geometry only. Parsing shape files and rendering are left to the
//! caller.
//!
//! Quick example:
//! ```ignore
//! use rosetta_layout_core::prelude::*;
//! use rosetta_layout_core::geometry::shapes::{circle, rectangle, shape};
//! # fn main() -> Result<(), LayoutError> {
//! let outer = shape(rectangle(0.0, 0.0, 120.0, 80.0));
//! let logo = shape(circle(60.0, 40.0, 15.0, 32));
//! let pages = vec![PageSpec::new(210.0, 297.0)?; 40];
//! let cfg = LayoutConfig::builder().nominal_height_mm(6.0).build();
//! let out = plan_layout(&outer, &[logo], &pages, cfg)?;
//! println!("{}", out.stats.summary());
//! # Ok(()) }
//! ```

pub mod binpack;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod guidance;
pub mod model;
pub mod pipeline;
pub mod placer;
pub mod progress;
pub mod sizing;
pub mod units;

pub use config::*;
pub use error::*;
pub use export::*;
pub use model::*;
pub use pipeline::*;
pub use progress::*;

/// Convenience prelude for common types and functions.
/// Importing `rosetta_layout_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::binpack::{PackOptions, pack_bins, pack_bins_with};
    pub use crate::config::{
        CanvasLimits, Envelope, EnvelopeShape, LayoutConfig, LayoutConfigBuilder, Orientation,
    };
    pub use crate::error::{LayoutError, Result};
    pub use crate::geometry::{
        AllowedRegion, InnerAnchor, ShapeProfile, compute_allowed_region, position_inner,
    };
    pub use crate::guidance::{GuidanceField, plan_guidance_field};
    pub use crate::model::{
        BinPlacement, BinSpec, CanvasSpec, LayoutStats, PackingLayout, PackingResult, PageSpec,
        Placement, PlacementStatus,
    };
    pub use crate::placer::{PlacementParams, place_pages};
    pub use crate::progress::{Checkpoint, JobObserver, NoopObserver};
    pub use crate::sizing::{auto_scale_factor, canvas_spec, optimal_page_height, safe_page_height};
    pub use crate::{
        LayoutOutput, pack_bin_job, pack_bin_job_observed, plan_layout, plan_layout_observed,
    };
}
