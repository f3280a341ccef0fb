//! Length conversions between millimetres, PostScript points and pixels.

pub const PT_PER_INCH: f64 = 72.0;
pub const MM_PER_INCH: f64 = 25.4;

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_INCH / MM_PER_INCH
}

pub fn pt_to_mm(pt: f64) -> f64 {
    pt * MM_PER_INCH / PT_PER_INCH
}

/// Rounded pixel count of `mm` at `dpi`. Negative lengths clamp to 0.
pub fn mm_to_px(mm: f64, dpi: u32) -> u64 {
    let px = (mm / MM_PER_INCH * dpi as f64).round();
    if px.is_finite() && px > 0.0 { px as u64 } else { 0 }
}

pub fn px_to_mm(px: f64, dpi: u32) -> f64 {
    px * MM_PER_INCH / dpi as f64
}

/// Pixels per millimetre at `dpi`.
pub fn px_per_mm(dpi: u32) -> f64 {
    dpi as f64 / MM_PER_INCH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inch_round_trips() {
        assert_eq!(mm_to_px(25.4, 300), 300);
        assert!((mm_to_pt(25.4) - 72.0).abs() < 1e-12);
        assert!((pt_to_mm(72.0) - 25.4).abs() < 1e-12);
        assert!((px_to_mm(600.0, 600) - 25.4).abs() < 1e-12);
    }

    #[test]
    fn negative_lengths_clamp() {
        assert_eq!(mm_to_px(-3.0, 300), 0);
    }
}
