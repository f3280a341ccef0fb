use std::fmt;
use thiserror::Error;

/// Identifies which input shape a geometry failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeRef {
    Outer,
    /// Inner keep-out shape, by position in the caller's list.
    Inner(usize),
    /// The computed allowed region.
    Region,
}

impl fmt::Display for ShapeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeRef::Outer => write!(f, "outer shape"),
            ShapeRef::Inner(i) => write!(f, "inner shape {i}"),
            ShapeRef::Region => write!(f, "allowed region"),
        }
    }
}

/// Reason a shape was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryIssue {
    InvalidRing(String),
    ZeroArea,
    ExceedsOuterBounds,
    NotContained,
    EmptyRegion,
    RegionTooSmall { area: f64, outer_area: f64 },
}

impl fmt::Display for GeometryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryIssue::InvalidRing(why) => write!(f, "invalid ring ({why})"),
            GeometryIssue::ZeroArea => write!(f, "zero area"),
            GeometryIssue::ExceedsOuterBounds => write!(f, "extends beyond the outer shape bounds"),
            GeometryIssue::NotContained => write!(f, "not contained in the outer shape"),
            GeometryIssue::EmptyRegion => write!(f, "empty region"),
            GeometryIssue::RegionTooSmall { area, outer_area } => write!(
                f,
                "region too small ({area:.2} mm² of {outer_area:.2} mm²), insufficient space for pages"
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Geometry error: {shape}: {reason}")]
    Geometry { shape: ShapeRef, reason: GeometryIssue },
    #[error(
        "Canvas {width_px}x{height_px} px exceeds the pixel ceiling ({limit}); {}",
        remedy_hint(.suggested_dpi, .suggested_target_mb)
    )]
    Overflow {
        width_px: u64,
        height_px: u64,
        limit: String,
        suggested_dpi: Option<u32>,
        suggested_target_mb: Option<f64>,
    },
    #[error("Packing infeasible: {0}")]
    PackingInfeasible(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LayoutError {
    pub(crate) fn geometry(shape: ShapeRef, reason: GeometryIssue) -> Self {
        LayoutError::Geometry { shape, reason }
    }
}

fn remedy_hint(dpi: &Option<u32>, target_mb: &Option<f64>) -> String {
    match (*dpi, *target_mb) {
        (Some(d), Some(mb)) => format!("try {d} DPI or a target size of {mb:.1} MB"),
        (Some(d), None) => format!("try {d} DPI"),
        (None, Some(mb)) => format!("reduce the output to about {mb:.1} MB"),
        (None, None) => "reduce the canvas size".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, LayoutError>;
