use super::EnvelopePacker;
use crate::config::Envelope;
use crate::error::Result;
use crate::model::{BinPlacement, BinSpec, PackingLayout, PackingResult, PlacementStatus};
use crate::progress::{Checkpoint, JobObserver};
use std::cmp::Ordering;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Grid search for rectangular envelopes.
///
/// Candidates are the row-tight grids: for every row count `r` in `1..=n`, the fewest columns
/// holding all bins, `ceil(n / r)`. The winner has the smallest |realized aspect − target|,
/// then the highest utilization, then the fewest rows.
pub struct GridPacker {
    envelope: Envelope,
    parallel: bool,
}

/// A scored candidate grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCandidate {
    pub rows: u32,
    pub columns: u32,
    pub deviation: f64,
    pub utilization: f64,
}

impl GridCandidate {
    fn rank(&self, other: &Self) -> Ordering {
        self.deviation
            .total_cmp(&other.deviation)
            .then(other.utilization.total_cmp(&self.utilization))
            .then(self.rows.cmp(&other.rows))
    }
}

impl GridPacker {
    pub fn new(envelope: Envelope, parallel: bool) -> Self {
        Self { envelope, parallel }
    }

    fn score(&self, bin: BinSpec, count: usize, rows: u32) -> GridCandidate {
        let columns = count.div_ceil(rows as usize) as u32;
        let width = f64::from(columns) * f64::from(bin.width_px);
        let height = f64::from(rows) * f64::from(bin.height_px);
        GridCandidate {
            rows,
            columns,
            deviation: (width / height - self.envelope.effective_aspect()).abs(),
            utilization: count as f64 / (f64::from(rows) * f64::from(columns)),
        }
    }

    /// Best candidate grid for `count` bins.
    pub fn best_grid(&self, bin: BinSpec, count: usize) -> GridCandidate {
        let max_rows = count.min(u32::MAX as usize) as u32;
        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                if let Some(best) = (1..=max_rows)
                    .into_par_iter()
                    .map(|r| self.score(bin, count, r))
                    .min_by(|a, b| a.rank(b))
                {
                    return best;
                }
            }
        }
        #[cfg(not(feature = "parallel"))]
        let _ = self.parallel;
        let mut best = self.score(bin, count, 1);
        for rows in 2..=max_rows {
            let cand = self.score(bin, count, rows);
            if cand.rank(&best) == Ordering::Less {
                best = cand;
            }
        }
        best
    }
}

impl EnvelopePacker for GridPacker {
    fn max_extent(&self, _bin: BinSpec, _count: usize) -> (f64, f64) {
        (f64::INFINITY, f64::INFINITY)
    }

    fn pack(
        &self,
        bin: BinSpec,
        count: usize,
        observer: &mut dyn JobObserver,
    ) -> Result<PackingResult> {
        let best = self.best_grid(bin, count);
        debug!(
            rows = best.rows,
            columns = best.columns,
            deviation = best.deviation,
            utilization = best.utilization,
            "grid selected"
        );
        let cols = best.columns as usize;
        let mut placements = Vec::with_capacity(count);
        let mut cancelled = false;
        for i in 0..count {
            placements.push(BinPlacement {
                index: i,
                x_px: (i % cols) as u64 * u64::from(bin.width_px),
                y_px: (i / cols) as u64 * u64::from(bin.height_px),
            });
            let event = Checkpoint::BinPlaced {
                placed: i + 1,
                total: count,
            };
            if observer.checkpoint(&event).is_break() {
                cancelled = true;
                break;
            }
        }
        let width = u64::from(best.columns) * u64::from(bin.width_px);
        let height = u64::from(best.rows) * u64::from(bin.height_px);
        let placed = placements.len();
        let utilization = placed as f64 * bin.area() as f64 / (width as f64 * height as f64);
        info!(
            rows = best.rows,
            columns = best.columns,
            placed,
            "grid packing finished"
        );
        Ok(PackingResult {
            layout: PackingLayout::Grid {
                rows: best.rows,
                columns: best.columns,
            },
            envelope: self.envelope,
            bin,
            placements,
            envelope_width_px: width as f64,
            envelope_height_px: height as f64,
            canvas_width_px: width,
            canvas_height_px: height,
            utilization,
            requested: count,
            placed,
            status: PlacementStatus::from_counts(placed, count, cancelled),
        })
    }
}
