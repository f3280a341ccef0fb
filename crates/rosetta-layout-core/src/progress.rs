//! Job checkpoints and cooperative cancellation.
//!
//! Long-running jobs report a [`Checkpoint`] after each guidance curve and each placed bin.
//! Returning [`ControlFlow::Break`] from the observer stops the job; whatever was placed so far
//! is returned with a `Cancelled` status.

use std::ops::ControlFlow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Checkpoint {
    CurveStarted { curve: usize, total: usize },
    CurveFinished { curve: usize, placed_so_far: usize },
    BinPlaced { placed: usize, total: usize },
    SizingIteration { iteration: usize, height_mm: f64, score: f64 },
}

pub trait JobObserver {
    fn checkpoint(&mut self, event: &Checkpoint) -> ControlFlow<()>;
}

/// Observer that never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl JobObserver for NoopObserver {
    fn checkpoint(&mut self, _event: &Checkpoint) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

impl<F> JobObserver for F
where
    F: FnMut(&Checkpoint) -> ControlFlow<()>,
{
    fn checkpoint(&mut self, event: &Checkpoint) -> ControlFlow<()> {
        self(event)
    }
}
