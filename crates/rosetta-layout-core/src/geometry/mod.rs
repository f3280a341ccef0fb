//! Allowed-region construction from boundary shapes.
//!
//! Shapes arrive as `geo` multipolygons in millimetres (y grows upward). The polygon booleans and
//! inward offsets sit behind [`GeometryKernel`] so another backend can be swapped in.

pub mod kernel;
pub mod region;
pub mod shapes;

pub use kernel::{GeoKernel, GeometryKernel};
pub use region::{AllowedRegion, compute_allowed_region, compute_allowed_region_with};

use crate::error::{LayoutError, Result};
use geo::{BoundingRect, MultiPolygon, Translate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Where a keep-out shape is anchored inside the outer shape's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InnerAnchor {
    #[default]
    Center,
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl FromStr for InnerAnchor {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "center" | "centre" => Ok(Self::Center),
            "top-left" => Ok(Self::TopLeft),
            "top-center" => Ok(Self::TopCenter),
            "top-right" => Ok(Self::TopRight),
            "middle-left" => Ok(Self::MiddleLeft),
            "middle-right" => Ok(Self::MiddleRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-center" => Ok(Self::BottomCenter),
            "bottom-right" => Ok(Self::BottomRight),
            _ => Err(()),
        }
    }
}

/// Moves `inner` so its bounding box sits at `anchor` within `outer`'s bounding box.
/// Edge anchors put the inner box flush with the outer box.
pub fn position_inner(
    inner: &MultiPolygon<f64>,
    outer: &MultiPolygon<f64>,
    anchor: InnerAnchor,
) -> Result<MultiPolygon<f64>> {
    let (Some(ob), Some(ib)) = (outer.bounding_rect(), inner.bounding_rect()) else {
        return Err(LayoutError::InvalidInput("cannot anchor an empty shape".into()));
    };
    let (hw, hh) = (ib.width() / 2.0, ib.height() / 2.0);
    let (left, right) = (ob.min().x + hw, ob.max().x - hw);
    let (bottom, top) = (ob.min().y + hh, ob.max().y - hh);
    let c = ob.center();
    let (tx, ty) = match anchor {
        InnerAnchor::Center => (c.x, c.y),
        InnerAnchor::TopLeft => (left, top),
        InnerAnchor::TopCenter => (c.x, top),
        InnerAnchor::TopRight => (right, top),
        InnerAnchor::MiddleLeft => (left, c.y),
        InnerAnchor::MiddleRight => (right, c.y),
        InnerAnchor::BottomLeft => (left, bottom),
        InnerAnchor::BottomCenter => (c.x, bottom),
        InnerAnchor::BottomRight => (right, bottom),
    };
    let ic = ib.center();
    Ok(inner.translate(tx - ic.x, ty - ic.y))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeClass {
    Rectangular,
    SquareLike,
    Elongated,
    Complex,
}

/// Coarse description of a region, reported alongside a layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeProfile {
    pub width_mm: f64,
    pub height_mm: f64,
    pub area_mm2: f64,
    pub aspect_ratio: f64,
    /// Area over bounding-box area.
    pub rectangularity: f64,
    pub class: ShapeClass,
}

impl ShapeProfile {
    pub fn of(region: &AllowedRegion) -> Self {
        let b = region.bounds();
        let (w, h) = (b.width(), b.height());
        let area = region.area();
        let rectangularity = if w * h > 0.0 { area / (w * h) } else { 0.0 };
        let aspect_ratio = if h > 0.0 { w / h } else { 1.0 };
        let class = if rectangularity > 0.95 {
            ShapeClass::Rectangular
        } else if (aspect_ratio - 1.0).abs() < 0.1 && rectangularity > 0.75 {
            ShapeClass::SquareLike
        } else if !(0.5..=2.0).contains(&aspect_ratio) {
            ShapeClass::Elongated
        } else {
            ShapeClass::Complex
        };
        Self {
            width_mm: w,
            height_mm: h,
            area_mm2: area,
            aspect_ratio,
            rectangularity,
            class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Scale;
    use shapes::{circle, rectangle, shape};

    #[test]
    fn anchors_are_flush_with_outer_bounds() {
        let outer = shape(rectangle(0.0, 0.0, 100.0, 50.0));
        let inner = shape(rectangle(40.0, 20.0, 10.0, 10.0));
        let moved = position_inner(&inner, &outer, InnerAnchor::TopRight).unwrap();
        let b = moved.bounding_rect().unwrap();
        assert!((b.max().x - 100.0).abs() < 1e-9);
        assert!((b.max().y - 50.0).abs() < 1e-9);
        assert_eq!("Bottom-Left".parse::<InnerAnchor>().unwrap(), InnerAnchor::BottomLeft);
    }

    #[test]
    fn profiles_classify_basic_shapes() {
        let rect = compute_allowed_region(&shape(rectangle(0.0, 0.0, 30.0, 20.0)), &[]).unwrap();
        assert_eq!(ShapeProfile::of(&rect).class, ShapeClass::Rectangular);
        let disc = compute_allowed_region(&shape(circle(0.0, 0.0, 10.0, 64)), &[]).unwrap();
        assert_eq!(ShapeProfile::of(&disc).class, ShapeClass::SquareLike);
        let strip = compute_allowed_region(
            &shape(circle(0.0, 0.0, 10.0, 64)).scale_xy(4.0, 1.0),
            &[],
        )
        .unwrap();
        assert_eq!(ShapeProfile::of(&strip).class, ShapeClass::Elongated);
    }
}
