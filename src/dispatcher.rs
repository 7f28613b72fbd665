//! Sequential batch dispatch against the remote optimizer.
//!
//! A job is split into fixed-size chunks of houses. Each chunk becomes one
//! trip that ends at the dump yard, so the next chunk starts there. Calls are
//! strictly sequential and the first failure stops the run.

use std::ops::Range;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, error, info};

use crate::error::{DispatchError, OptimizerError};
use crate::model::{Batch, DumpYard, House, Location, OptimizeRequest};
use crate::progress::{ChannelSink, DispatchEvent, ProgressState};
use crate::traits::{ProgressSink, RouteOptimizer};

/// Default number of houses per trip.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Where the final trip ends.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EndLocation {
    /// Every trip, including the last, ends at the dump yard.
    #[default]
    DumpYard,
    /// Return to the start location after the last dump.
    SameAsStart,
    Custom(Location),
}

impl EndLocation {
    /// An explicit end wins over returning to the start.
    pub fn from_choice(end: Option<Location>, return_to_start: bool) -> Self {
        match (end, return_to_start) {
            (Some(location), _) => EndLocation::Custom(location),
            (None, true) => EndLocation::SameAsStart,
            (None, false) => EndLocation::DumpYard,
        }
    }

    /// The extra leg's destination, if one is needed.
    fn final_leg(&self, start: Location, dump: Location) -> Option<Location> {
        let end = match self {
            EndLocation::DumpYard => return None,
            EndLocation::SameAsStart => start,
            EndLocation::Custom(location) => *location,
        };
        (end != dump).then_some(end)
    }
}

/// Picks the dump yard for a run.
///
/// An explicit location wins, then a position in `yards`. With neither, a
/// listing that has exactly one yard uses it; otherwise the choice is left
/// open and dispatch reports [`DispatchError::MissingDumpYard`].
pub fn select_dump_yard(
    yards: &[DumpYard],
    explicit: Option<Location>,
    index: Option<usize>,
) -> Result<Option<Location>, DispatchError> {
    match (explicit, index) {
        (Some(location), _) => Ok(Some(location)),
        (None, Some(index)) => yards
            .get(index)
            .map(|yard| Some(yard.location()))
            .ok_or(DispatchError::UnknownDumpYard {
                index,
                available: yards.len(),
            }),
        (None, None) => match yards {
            [only] => Ok(Some(only.location())),
            _ => Ok(None),
        },
    }
}

/// What to do with completed batches when a later chunk fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    KeepCompleted,
    DiscardAll,
}

#[derive(Debug, Clone)]
pub struct DispatcherOptions {
    pub failure_policy: FailurePolicy,
    /// Passed through to the optimizer; the web client always sends 0.
    pub nn_steps: u32,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::KeepCompleted,
            nn_steps: 0,
        }
    }
}

/// Input for one optimize run.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub geofence: String,
    pub houses: Vec<House>,
    pub start: Option<Location>,
    pub dump: Option<Location>,
    pub end: EndLocation,
    pub batch_size: usize,
}

impl DispatchRequest {
    pub fn new(geofence: impl Into<String>, houses: Vec<House>) -> Self {
        Self {
            geofence: geofence.into(),
            houses,
            start: None,
            dump: None,
            end: EndLocation::DumpYard,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn start(mut self, location: Location) -> Self {
        self.start = Some(location);
        self
    }

    pub fn dump(mut self, location: Location) -> Self {
        self.dump = Some(location);
        self
    }

    pub fn end(mut self, end: EndLocation) -> Self {
        self.end = end;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    fn validate(&self) -> Result<(Location, Location), DispatchError> {
        let dump = self.dump.ok_or(DispatchError::MissingDumpYard)?;
        let start = self.start.ok_or(DispatchError::MissingStart)?;
        if self.geofence.trim().is_empty() {
            return Err(DispatchError::EmptyGeofence);
        }
        if self.houses.is_empty() {
            return Err(DispatchError::EmptyHouses);
        }
        if self.batch_size == 0 {
            return Err(DispatchError::ZeroBatchSize);
        }

        check_finite("start location", start)?;
        check_finite("dump yard", dump)?;
        if let EndLocation::Custom(end) = self.end {
            check_finite("end location", end)?;
        }
        for house in &self.houses {
            check_finite(&format!("house {}", house.house_id), house.location())?;
        }

        Ok((start, dump))
    }
}

fn check_finite(what: &str, location: Location) -> Result<(), DispatchError> {
    if location.is_finite() {
        Ok(())
    } else {
        Err(DispatchError::InvalidCoordinate {
            what: what.to_string(),
        })
    }
}

/// The chunk that stopped a run.
#[derive(Debug, Error)]
#[error("batch {batch_number} of {total_batches} failed: {source}")]
pub struct ChunkFailure {
    pub batch_number: usize,
    pub total_batches: usize,
    pub source: OptimizerError,
}

/// Result of a run that got past its preconditions.
#[derive(Debug)]
pub struct DispatchReport {
    /// Annotated batches in travel order.
    pub batches: Vec<Batch>,
    pub failure: Option<ChunkFailure>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    pub fn houses_routed(&self) -> usize {
        self.batches.iter().map(|batch| batch.houses_in_batch).sum()
    }

    /// Turns a partial run into an error, dropping the completed batches.
    pub fn into_result(self) -> Result<Vec<Batch>, ChunkFailure> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.batches),
        }
    }
}

/// Splits `len` items into consecutive ranges of at most `batch_size`.
pub fn plan_chunks(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    if batch_size == 0 {
        return Vec::new();
    }
    (0..len)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(len))
        .collect()
}

enum Leg {
    Houses(Range<usize>),
    Final(Location),
}

pub struct BatchDispatcher<O> {
    optimizer: O,
    options: DispatcherOptions,
}

impl<O: RouteOptimizer> BatchDispatcher<O> {
    pub fn new(optimizer: O, options: DispatcherOptions) -> Self {
        Self { optimizer, options }
    }

    /// Runs every chunk in order.
    ///
    /// Precondition failures return `Err` before any call is made. A failing
    /// chunk ends the run; its error is carried in the report alongside the
    /// batches completed before it.
    pub fn dispatch(
        &self,
        request: &DispatchRequest,
        progress: &mut dyn ProgressSink,
    ) -> Result<DispatchReport, DispatchError> {
        let (start, dump) = request.validate()?;
        let geofence = request.geofence.trim();

        let legs: Vec<Leg> = plan_chunks(request.houses.len(), request.batch_size)
            .into_iter()
            .map(Leg::Houses)
            .chain(request.end.final_leg(start, dump).map(Leg::Final))
            .collect();
        let total_batches = legs.len();

        let mut state = ProgressState::default();
        state.reset(total_batches, request.houses.len());
        progress.on_progress(&state);
        info!(
            houses = request.houses.len(),
            batch_size = request.batch_size,
            total_batches,
            "starting dispatch"
        );

        let outcome = legs.into_iter().enumerate().try_fold(
            Vec::with_capacity(total_batches),
            |mut batches, (index, leg)| {
                let batch_number = index + 1;
                let leg_start = if index == 0 { start } else { dump };
                let (houses, end_location) = match leg {
                    Leg::Houses(range) => (&request.houses[range], None),
                    Leg::Final(end) => (&[][..], Some(end)),
                };

                let payload = OptimizeRequest {
                    geofence: geofence.to_string(),
                    houses: houses.iter().map(House::location).collect(),
                    start_location: leg_start,
                    dump_location: dump,
                    batch_size: houses.len(),
                    nn_steps: self.options.nn_steps,
                    end_location,
                };
                debug!(batch_number, total_batches, houses = houses.len(), "dispatching chunk");

                match self.optimizer.optimize(&payload) {
                    Ok(raw) => {
                        let batch = Batch::annotate(raw, batch_number, total_batches, houses);
                        info!(
                            batch_number,
                            total_batches,
                            stops = batch.stops.len(),
                            path_points = batch.route_path.len(),
                            "batch optimized"
                        );
                        progress.on_batch(&batch);
                        batches.push(batch);
                        state.advance(batch_number, houses.len());
                        progress.on_progress(&state);
                        Ok(batches)
                    }
                    Err(source) => {
                        error!(batch_number, total_batches, error = %source, "batch failed");
                        Err((
                            batches,
                            ChunkFailure {
                                batch_number,
                                total_batches,
                                source,
                            },
                        ))
                    }
                }
            },
        );

        let report = match outcome {
            Ok(batches) => {
                state.complete();
                DispatchReport {
                    batches,
                    failure: None,
                }
            }
            Err((batches, failure)) => {
                state.fail(failure.batch_number);
                let batches = match self.options.failure_policy {
                    FailurePolicy::KeepCompleted => batches,
                    FailurePolicy::DiscardAll => Vec::new(),
                };
                DispatchReport {
                    batches,
                    failure: Some(failure),
                }
            }
        };
        progress.on_finish(&state);

        Ok(report)
    }
}

impl<O> BatchDispatcher<O>
where
    O: RouteOptimizer + Send + 'static,
{
    /// Runs the dispatch on its own thread, streaming events as they happen.
    ///
    /// The receiver yields progress snapshots and batches in order, then one
    /// `Finished` event. Precondition failures produce no events.
    pub fn spawn(
        self,
        request: DispatchRequest,
    ) -> (
        JoinHandle<Result<DispatchReport, DispatchError>>,
        Receiver<DispatchEvent>,
    ) {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || {
            let mut sink = ChannelSink::new(sender);
            self.dispatch(&request, &mut sink)
        });
        (handle, receiver)
    }
}
