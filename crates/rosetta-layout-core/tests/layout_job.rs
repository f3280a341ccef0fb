use rosetta_layout_core::geometry::shapes::{circle, rectangle, shape};
use rosetta_layout_core::prelude::*;
use rosetta_layout_core::{layout_summary_json, packing_summary_json};
use std::ops::ControlFlow;

fn a4_pages(n: usize) -> Vec<PageSpec> {
    vec![PageSpec::from_points(595.0, 842.0).unwrap(); n]
}

#[test]
fn small_document_lays_out_completely() {
    let outer = shape(rectangle(0.0, 0.0, 120.0, 80.0));
    let logo = shape(circle(60.0, 40.0, 15.0, 32));
    let cfg = LayoutConfig::builder().nominal_height_mm(5.0).build();
    let out = plan_layout(&outer, &[logo], &a4_pages(40), cfg).unwrap();
    assert!(out.is_complete(), "{:?}", out.status);
    assert_eq!(out.stats.placed, 40);
    assert_eq!(out.placements.len(), 40);
    assert!(out.stats.utilization > 0.0 && out.stats.utilization < 1.0);
    // canvas = region bounds + 5 mm margins at the default 1200 DPI
    assert!((out.canvas_width_mm - 130.0).abs() < 1e-9);
    assert_eq!(out.canvas.dpi, 1200);
    assert!(out.canvas.pixel_count() <= 100_000_000);
    for p in &out.placements {
        assert!(p.x_mm > 0.0 && p.x_mm < out.canvas_width_mm);
        assert!(p.y_mm > 0.0 && p.y_mm < out.canvas_height_mm);
    }
}

#[test]
fn jobs_are_deterministic() {
    let outer = shape(circle(0.0, 0.0, 40.0, 48));
    let cfg = LayoutConfig::builder()
        .orientation(Orientation::Tangent)
        .nominal_height_mm(4.0)
        .build();
    let a = plan_layout(&outer, &[], &a4_pages(60), cfg.clone()).unwrap();
    let b = plan_layout(&outer, &[], &a4_pages(60), cfg).unwrap();
    assert_eq!(a.placements, b.placements);
    assert_eq!(a.canvas, b.canvas);
}

#[test]
fn target_dpi_sizes_pages_from_the_region() {
    let outer = shape(rectangle(0.0, 0.0, 100.0, 100.0));
    let pages = vec![PageSpec::new(10.0, 10.0).unwrap(); 25];
    let cfg = LayoutConfig::builder().target_dpi(Some(300)).build();
    let out = plan_layout(&outer, &[], &pages, cfg).unwrap();
    // 25 square pages over 10 000 mm² => 20 mm
    assert!((out.stats.page_height_mm - 20.0).abs() < 1e-9);
    assert_eq!(out.canvas.dpi, 300);
}

#[test]
fn extreme_dpi_fails_before_placement() {
    let outer = shape(rectangle(0.0, 0.0, 500.0, 300.0));
    let cfg = LayoutConfig::builder()
        .target_dpi(Some(10_000))
        .nominal_height_mm(5.0)
        .build();
    let mut curves_seen = 0;
    let mut observer = |e: &Checkpoint| {
        if let Checkpoint::CurveStarted { .. } = e {
            curves_seen += 1;
        }
        ControlFlow::Continue(())
    };
    let err = plan_layout_observed(&outer, &[], &a4_pages(10), cfg, &mut observer).unwrap_err();
    match err {
        LayoutError::Overflow { suggested_dpi, .. } => {
            let dpi = suggested_dpi.unwrap();
            assert!(dpi < 10_000 && dpi > 0);
        }
        other => panic!("expected overflow, got {other}"),
    }
    assert_eq!(curves_seen, 0);
}

#[test]
fn auto_scaling_grows_a_small_region() {
    let outer = shape(rectangle(0.0, 0.0, 20.0, 20.0));
    let cfg = LayoutConfig::builder()
        .nominal_height_mm(5.0)
        .auto_scale_shapes(true)
        .build();
    let out = plan_layout(&outer, &[], &a4_pages(100), cfg).unwrap();
    assert!(out.stats.region_area_mm2 > 400.0);
}

#[test]
fn adaptive_sizing_reports_each_iteration() {
    let outer = shape(rectangle(0.0, 0.0, 60.0, 60.0));
    let cfg = LayoutConfig::builder().target_fill_ratio(Some(0.5)).build();
    let mut iterations = Vec::new();
    let mut observer = |e: &Checkpoint| {
        if let Checkpoint::SizingIteration { iteration, .. } = e {
            iterations.push(*iteration);
        }
        ControlFlow::Continue(())
    };
    let out = plan_layout_observed(&outer, &[], &a4_pages(30), cfg, &mut observer).unwrap();
    assert_eq!(iterations, (0..10).collect::<Vec<_>>());
    assert!(out.stats.page_height_mm >= 1.0 && out.stats.page_height_mm <= 50.0);
    assert!(out.stats.placed > 0);
}

#[test]
fn invalid_configuration_is_rejected() {
    let outer = shape(rectangle(0.0, 0.0, 60.0, 60.0));
    let cfg = LayoutConfig::builder().scale_range(0.9, 0.2).build();
    assert!(matches!(
        plan_layout(&outer, &[], &a4_pages(3), cfg),
        Err(LayoutError::InvalidConfig(_))
    ));
    let cfg = LayoutConfig::builder().gap_mm(-1.0).build();
    assert!(cfg.validate().is_err());
    assert!(matches!(
        plan_layout(&outer, &[], &[], LayoutConfig::default()),
        Err(LayoutError::InvalidInput(_))
    ));
}

#[test]
fn config_round_trips_through_json_with_defaults() {
    let cfg: LayoutConfig = serde_json::from_str(r#"{"gap_mm": 1.0, "orientation": "upright"}"#).unwrap();
    assert_eq!(cfg.gap_mm, 1.0);
    assert_eq!(cfg.orientation, Orientation::Upright);
    assert_eq!(cfg.max_streamlines, 200);
    assert_eq!(cfg.max_canvas_pixels, 100_000_000);
    assert_eq!("Tangent".parse::<Orientation>(), Ok(Orientation::Tangent));
    assert_eq!("ellipse".parse::<EnvelopeShape>(), Ok(EnvelopeShape::Ellipse));
}

#[test]
fn bin_job_rejects_canvases_beyond_the_axis_ceiling() {
    let cfg = LayoutConfig::builder()
        .envelope(Envelope::rectangle(1.29))
        .max_axis_pixels(50_000)
        .build();
    match pack_bin_job(BinSpec::new(1800, 2300), 1000, cfg) {
        Err(LayoutError::Overflow {
            width_px,
            suggested_dpi,
            suggested_target_mb,
            ..
        }) => {
            assert_eq!(width_px, 72_000);
            assert_eq!(suggested_dpi, None);
            assert!(suggested_target_mb.unwrap() > 0.0);
        }
        other => panic!("expected overflow, got {other:?}"),
    }
}

#[test]
fn summaries_export_as_json() {
    let outer = shape(rectangle(0.0, 0.0, 50.0, 50.0));
    let cfg = LayoutConfig::builder().nominal_height_mm(4.0).build();
    let out = plan_layout(&outer, &[], &a4_pages(5), cfg).unwrap();
    let v = layout_summary_json(&out);
    assert_eq!(v["stats"]["placed"], 5);
    assert_eq!(v["status"]["state"], "complete");
    assert_eq!(v["placements"].as_array().unwrap().len(), 5);

    let res = pack_bin_job(BinSpec::new(10, 10), 12, LayoutConfig::default()).unwrap();
    let v = packing_summary_json(&res);
    assert_eq!(v["layout"]["kind"], "grid");
    assert_eq!(v["placements"].as_array().unwrap().len(), 12);
    assert!(res.summary().contains("12/12"));
}
