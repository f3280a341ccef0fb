use rand::{Rng, SeedableRng, rngs::StdRng};
use rosetta_layout_core::geometry::compute_allowed_region;
use rosetta_layout_core::geometry::shapes::{rectangle, shape};
use rosetta_layout_core::sizing::{
    SizingParams, canvas_spec, optimal_page_height, safe_page_height,
};
use rosetta_layout_core::{CanvasLimits, LayoutError, PageSpec};

#[test]
fn safe_height_for_large_documents() {
    let h2000 = safe_page_height(2000, 200, 50_000_000, 1.0, 50.0).unwrap();
    assert!((1.0..=50.0).contains(&h2000), "{h2000}");
    let h4000 = safe_page_height(4000, 200, 50_000_000, 1.0, 50.0).unwrap();
    assert!(h4000 <= h2000);
}

#[test]
fn safe_height_is_monotone_in_page_count() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..50 {
        let dpi = rng.gen_range(72..2400);
        let budget = rng.gen_range(1_000_000u64..500_000_000);
        let mut prev = f64::INFINITY;
        let mut count = rng.gen_range(1..50usize);
        for _ in 0..12 {
            let h = safe_page_height(count, dpi, budget, 1.0, 50.0).unwrap();
            assert!(h <= prev, "height grew at {count} pages: {h} > {prev}");
            prev = h;
            count = count * 2 + rng.gen_range(0..10);
        }
    }
}

#[test]
fn safe_height_rejects_bad_bounds() {
    assert!(matches!(
        safe_page_height(100, 300, 1_000_000, 5.0, 1.0),
        Err(LayoutError::InvalidInput(_))
    ));
    assert!(safe_page_height(0, 300, 1_000_000, 1.0, 50.0).is_err());
}

#[test]
fn extreme_dpi_overflows_with_a_suggestion() {
    let limits = CanvasLimits::default();
    match canvas_spec(500.0, 400.0, 10_000, &limits) {
        Err(LayoutError::Overflow {
            width_px,
            suggested_dpi: Some(dpi),
            ..
        }) => {
            assert!(width_px > 100_000);
            assert!(dpi < 10_000);
            let fitted = canvas_spec(500.0, 400.0, dpi, &limits).unwrap();
            assert!(fitted.pixel_count() <= limits.max_canvas_pixels);
        }
        other => panic!("expected overflow, got {other:?}"),
    }
}

#[test]
fn axis_ceiling_is_enforced_separately() {
    let limits = CanvasLimits {
        max_canvas_pixels: u64::MAX,
        max_axis_pixels: 10_000,
    };
    let err = canvas_spec(2000.0, 10.0, 300, &limits).unwrap_err();
    let LayoutError::Overflow { suggested_dpi, .. } = err else {
        panic!("expected overflow");
    };
    // 10 000 px across 2000 mm
    assert_eq!(suggested_dpi, Some(127));
}

#[test]
fn canvas_never_exceeds_pixel_budget() {
    let mut rng = StdRng::seed_from_u64(1234);
    for _ in 0..500 {
        let limits = CanvasLimits {
            max_canvas_pixels: rng.gen_range(10_000u64..200_000_000),
            max_axis_pixels: rng.gen_range(1_000u64..1 << 30),
        };
        let w = rng.gen_range(1.0..3000.0);
        let h = rng.gen_range(1.0..3000.0);
        let dpi = rng.gen_range(1..20_000);
        match canvas_spec(w, h, dpi, &limits) {
            Ok(c) => {
                assert!(c.pixel_count() <= limits.max_canvas_pixels);
                assert!(c.width_px <= limits.max_axis_pixels && c.height_px <= limits.max_axis_pixels);
            }
            Err(LayoutError::Overflow { suggested_dpi, .. }) => {
                let dpi = suggested_dpi.unwrap();
                assert!(dpi >= 1);
            }
            Err(other) => panic!("unexpected error {other}"),
        }
    }
}

#[test]
fn optimal_height_targets_the_region_area() {
    let region = compute_allowed_region(&shape(rectangle(0.0, 0.0, 100.0, 100.0)), &[]).unwrap();
    let pages = vec![PageSpec::new(1.0, 1.0).unwrap(); 100];
    let params = SizingParams::default();
    // 100 square pages over 10 000 mm² => 10 mm each
    let h = optimal_page_height(&region, &pages, 300, &params).unwrap();
    assert!((h - 10.0).abs() < 1e-9, "{h}");

    let few = vec![PageSpec::new(1.0, 1.0).unwrap(); 2];
    let capped = optimal_page_height(&region, &few, 300, &params).unwrap();
    assert_eq!(capped, params.max_height_mm);
    assert_eq!(
        optimal_page_height(&region, &[], 300, &params).unwrap(),
        params.min_height_mm
    );
}

#[test]
fn large_documents_skip_the_area_estimate() {
    let region = compute_allowed_region(&shape(rectangle(0.0, 0.0, 100.0, 100.0)), &[]).unwrap();
    let params = SizingParams {
        large_document_threshold: 10,
        ..SizingParams::default()
    };
    let pages = vec![PageSpec::new(1.0, 1.4).unwrap(); 11];
    let via_region = optimal_page_height(&region, &pages, 300, &params).unwrap();
    let direct = rosetta_layout_core::sizing::safe_page_height_with(11, 300, &params).unwrap();
    assert_eq!(via_region, direct);
}
