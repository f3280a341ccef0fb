use rand::{Rng, SeedableRng, rngs::StdRng};
use rosetta_layout_core::geometry::shapes::{circle, polygon_from_rings, rectangle, shape};
use rosetta_layout_core::geometry::{AllowedRegion, compute_allowed_region};
use rosetta_layout_core::guidance::plan_guidance_field;
use rosetta_layout_core::placer::{PlacementParams, place_pages, place_pages_observed};
use rosetta_layout_core::{Checkpoint, Orientation, PageSpec, Placement, PlacementStatus};
use std::collections::HashSet;
use std::ops::ControlFlow;

fn framed_region() -> AllowedRegion {
    let outer = shape(rectangle(0.0, 0.0, 60.0, 40.0));
    let hole = shape(circle(30.0, 20.0, 8.0, 32));
    compute_allowed_region(&outer, &[hole]).unwrap()
}

fn params(orientation: Orientation) -> PlacementParams {
    PlacementParams {
        gap_mm: 0.5,
        scale_min: 0.25,
        scale_max: 1.0,
        scale_steps: 3,
        orientation,
    }
}

/// Minimum distance along any separating axis of the two page rectangles (negative = overlap).
fn separation(a: &Placement, b: &Placement) -> f64 {
    let (ca, cb) = (a.corners(), b.corners());
    let mut best = f64::NEG_INFINITY;
    for quad in [&ca, &cb] {
        for i in 0..2 {
            let (p, q) = (quad[i], quad[i + 1]);
            let len = (q[0] - p[0]).hypot(q[1] - p[1]);
            let axis = [(p[1] - q[1]) / len, (q[0] - p[0]) / len];
            let proj = |c: &[[f64; 2]; 4]| {
                c.iter()
                    .map(|v| v[0] * axis[0] + v[1] * axis[1])
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                        (lo.min(x), hi.max(x))
                    })
            };
            let (a0, a1) = proj(&ca);
            let (b0, b1) = proj(&cb);
            best = best.max((b0 - a1).max(a0 - b1));
        }
    }
    best
}

fn assert_valid_layout(region: &AllowedRegion, placements: &[Placement], gap: f64) {
    let mut seen = HashSet::new();
    for p in placements {
        assert!(seen.insert(p.page_index), "page {} placed twice", p.page_index);
        let ring: Vec<[f64; 2]> = p.corners().to_vec();
        let poly = polygon_from_rings(&ring, &[]);
        assert!(region.contains_polygon(&poly), "page {} leaves the region", p.page_index);
    }
    for (i, a) in placements.iter().enumerate() {
        for b in &placements[i + 1..] {
            // padded rectangles may touch; corner rounding allows a little slack
            assert!(
                separation(a, b) >= gap - 1e-6,
                "pages {} and {} are closer than the gap",
                a.page_index,
                b.page_index
            );
        }
    }
}

#[test]
fn tangent_pages_never_overlap() {
    let region = framed_region();
    let field = plan_guidance_field(&region, 2.0, 200).unwrap();
    let pages = vec![PageSpec::new(2.1, 2.97).unwrap(); 150];
    let run = place_pages(&pages, &region, &field, &params(Orientation::Tangent));
    assert!(run.placed > 0);
    assert_eq!(run.placed, run.placements.len());
    assert_valid_layout(&region, &run.placements, 0.5);
}

#[test]
fn upright_pages_keep_zero_rotation() {
    let region = framed_region();
    let field = plan_guidance_field(&region, 2.0, 200).unwrap();
    let pages = vec![PageSpec::new(2.97, 2.1).unwrap(); 120];
    let run = place_pages(&pages, &region, &field, &params(Orientation::Upright));
    assert!(run.placed > 0);
    assert!(run.placements.iter().all(|p| p.rotation_deg == 0.0));
    assert_valid_layout(&region, &run.placements, 0.5);
}

#[test]
fn mixed_page_sizes_respect_scale_bounds() {
    let mut rng = StdRng::seed_from_u64(7);
    let region = compute_allowed_region(
        &shape(polygon_from_rings(
            &[[0.0, 0.0], [50.0, 0.0], [50.0, 20.0], [25.0, 35.0], [0.0, 20.0]],
            &[],
        )),
        &[],
    )
    .unwrap();
    let field = plan_guidance_field(&region, 1.5, 100).unwrap();
    let pages: Vec<PageSpec> = (0..80)
        .map(|_| PageSpec::new(rng.gen_range(1.0..4.0), rng.gen_range(1.0..4.0)).unwrap())
        .collect();
    let p = params(Orientation::Tangent);
    let run = place_pages(&pages, &region, &field, &p);
    for pl in &run.placements {
        assert!(pl.scale >= p.scale_min - 1e-12 && pl.scale <= p.scale_max + 1e-12);
        let page = pages[pl.page_index];
        assert!((pl.width_mm - page.width_mm() * pl.scale).abs() < 1e-9);
    }
    assert_valid_layout(&region, &run.placements, p.gap_mm);
}

#[test]
fn placements_follow_input_order() {
    let region = framed_region();
    let field = plan_guidance_field(&region, 2.0, 200).unwrap();
    let pages = vec![PageSpec::new(2.0, 3.0).unwrap(); 30];
    let run = place_pages(&pages, &region, &field, &params(Orientation::Tangent));
    let order: Vec<usize> = run.placements.iter().map(|p| p.page_index).collect();
    assert_eq!(order, (0..run.placed).collect::<Vec<_>>());
    assert!(run.placements.windows(2).all(|w| w[0].curve <= w[1].curve));
}

#[test]
fn exhausted_field_reports_incomplete() {
    let region = compute_allowed_region(&shape(rectangle(0.0, 0.0, 12.0, 12.0)), &[]).unwrap();
    let field = plan_guidance_field(&region, 2.0, 10).unwrap();
    let pages = vec![PageSpec::new(2.0, 3.0).unwrap(); 500];
    let run = place_pages(&pages, &region, &field, &params(Orientation::Tangent));
    assert!(run.placed < pages.len());
    assert_eq!(
        run.status,
        PlacementStatus::Incomplete {
            placed: run.placed,
            requested: 500
        }
    );
}

#[test]
fn observer_can_cancel_between_curves() {
    let region = framed_region();
    let field = plan_guidance_field(&region, 2.0, 200).unwrap();
    let pages = vec![PageSpec::new(2.1, 2.97).unwrap(); 400];
    let mut finished = 0;
    let mut stop_after_first = |e: &Checkpoint| {
        if let Checkpoint::CurveFinished { .. } = e {
            finished += 1;
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    };
    let run = place_pages_observed(
        &pages,
        &region,
        &field,
        &params(Orientation::Tangent),
        &mut stop_after_first,
    );
    assert_eq!(finished, 1);
    assert!(matches!(run.status, PlacementStatus::Cancelled { .. }));
    assert!(run.placements.iter().all(|p| p.curve == 0));
    assert_valid_layout(&region, &run.placements, 0.5);
}

#[test]
fn placement_is_deterministic() {
    let region = framed_region();
    let field = plan_guidance_field(&region, 2.0, 200).unwrap();
    let pages = vec![PageSpec::new(2.1, 2.97).unwrap(); 60];
    let a = place_pages(&pages, &region, &field, &params(Orientation::Tangent));
    let b = place_pages(&pages, &region, &field, &params(Orientation::Tangent));
    assert_eq!(a.placements, b.placements);
}
