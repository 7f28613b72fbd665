//! Seams between the dispatch loop and the outside world.
//!
//! The dispatcher only needs one remote call per chunk and somewhere to
//! report progress. Production code plugs in the HTTP client and a logging
//! sink; tests plug in scripted optimizers and recording sinks.

use crate::error::OptimizerError;
use crate::model::{Batch, OptimizeRequest, RawBatch};
use crate::progress::ProgressState;

/// Computes one optimized trip for a chunk of houses.
pub trait RouteOptimizer {
    fn optimize(&self, request: &OptimizeRequest) -> Result<RawBatch, OptimizerError>;
}

impl<T> RouteOptimizer for &T
where
    T: RouteOptimizer + ?Sized,
{
    fn optimize(&self, request: &OptimizeRequest) -> Result<RawBatch, OptimizerError> {
        (**self).optimize(request)
    }
}

/// Observer for a dispatch run.
pub trait ProgressSink {
    fn on_progress(&mut self, state: &ProgressState);

    /// Called with each batch as soon as it is annotated.
    fn on_batch(&mut self, _batch: &Batch) {}

    /// Called once when the run ends, successfully or not.
    fn on_finish(&mut self, _state: &ProgressState) {}
}
