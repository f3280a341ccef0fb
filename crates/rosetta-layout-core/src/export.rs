use crate::model::{PackingLayout, PackingResult, PlacementStatus};
use crate::pipeline::LayoutOutput;
use serde_json::{Value, json};

fn status_json(status: &PlacementStatus) -> Value {
    match *status {
        PlacementStatus::Complete => json!({"state": "complete"}),
        PlacementStatus::Incomplete { placed, requested } => {
            json!({"state": "incomplete", "placed": placed, "requested": requested})
        }
        PlacementStatus::Cancelled { placed, requested } => {
            json!({"state": "cancelled", "placed": placed, "requested": requested})
        }
    }
}

/// Summary of a layout for reporting: counts, canvas and per-page anchors.
/// Shape: `{ status, stats, canvas: { widthPx, heightPx, dpi, widthMm, heightMm }, profile, placements: [...] }`.
pub fn layout_summary_json(out: &LayoutOutput) -> Value {
    let placements: Vec<Value> = out
        .placements
        .iter()
        .map(|p| {
            json!({
                "page": p.page_index,
                "x": p.x_mm,
                "y": p.y_mm,
                "scale": p.scale,
                "rotation": p.rotation_deg,
                "size": {"w": p.width_mm, "h": p.height_mm},
                "curve": p.curve,
            })
        })
        .collect();
    json!({
        "status": status_json(&out.status),
        "stats": {
            "requested": out.stats.requested,
            "placed": out.stats.placed,
            "curves": out.stats.curves,
            "pageHeightMm": out.stats.page_height_mm,
            "regionAreaMm2": out.stats.region_area_mm2,
            "utilization": out.stats.utilization,
        },
        "canvas": {
            "widthPx": out.canvas.width_px,
            "heightPx": out.canvas.height_px,
            "dpi": out.canvas.dpi,
            "widthMm": out.canvas_width_mm,
            "heightMm": out.canvas_height_mm,
        },
        "profile": &out.profile,
        "placements": placements,
    })
}

/// Summary of a bin packing for reporting.
/// Grid results carry `{ rows, columns }`; spiral results carry their step sizes and stretch.
pub fn packing_summary_json(res: &PackingResult) -> Value {
    let layout = match res.layout {
        PackingLayout::Grid { rows, columns } => {
            json!({"kind": "grid", "rows": rows, "columns": columns})
        }
        PackingLayout::Spiral {
            arc_step_px,
            radius_step_px,
            stretch,
        } => json!({
            "kind": "spiral",
            "arcStepPx": arc_step_px,
            "radiusStepPx": radius_step_px,
            "stretch": stretch,
        }),
    };
    json!({
        "status": status_json(&res.status),
        "envelope": &res.envelope,
        "bin": {"w": res.bin.width_px, "h": res.bin.height_px},
        "layout": layout,
        "placed": res.placed,
        "requested": res.requested,
        "utilization": res.utilization,
        "envelopeSize": {"w": res.envelope_width_px, "h": res.envelope_height_px},
        "canvasSize": {"w": res.canvas_width_px, "h": res.canvas_height_px},
        "placements": res.placements.iter().map(|p| json!([p.x_px, p.y_px])).collect::<Vec<_>>(),
    })
}
