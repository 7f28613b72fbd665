//! Progress reporting for dispatch runs.

use std::sync::mpsc::Sender;

use tracing::info;

use crate::model::Batch;
use crate::traits::ProgressSink;

/// Snapshot of a dispatch run.
///
/// Only the dispatcher mutates this. `active` is false before the first run
/// and again once the run completes or fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressState {
    pub current_batch: usize,
    pub total_batches: usize,
    pub houses_processed: usize,
    pub total_houses: usize,
    pub current_status: String,
    pub active: bool,
}

impl ProgressState {
    pub fn reset(&mut self, total_batches: usize, total_houses: usize) {
        *self = Self {
            current_batch: 0,
            total_batches,
            houses_processed: 0,
            total_houses,
            current_status: "Starting optimization...".to_string(),
            active: true,
        };
    }

    /// Records a completed batch.
    pub fn advance(&mut self, batch_number: usize, houses: usize) {
        self.current_batch = self.current_batch.max(batch_number);
        self.houses_processed += houses;
        self.current_status = format!(
            "Processing batch {} of {}...",
            self.current_batch, self.total_batches
        );
    }

    pub fn complete(&mut self) {
        self.current_status = "Completed".to_string();
        self.active = false;
    }

    pub fn fail(&mut self, batch_number: usize) {
        self.current_status = format!("Failed at batch {} of {}", batch_number, self.total_batches);
        self.active = false;
    }

    /// Share of houses processed, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total_houses == 0 {
            return 0.0;
        }
        (self.houses_processed as f64 / self.total_houses as f64).min(1.0)
    }
}

/// Ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn on_progress(&mut self, _state: &ProgressState) {}
}

/// Keeps every snapshot and batch it sees.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub snapshots: Vec<ProgressState>,
    pub batches: Vec<Batch>,
    pub finished: Option<ProgressState>,
}

impl ProgressSink for RecordingSink {
    fn on_progress(&mut self, state: &ProgressState) {
        self.snapshots.push(state.clone());
    }

    fn on_batch(&mut self, batch: &Batch) {
        self.batches.push(batch.clone());
    }

    fn on_finish(&mut self, state: &ProgressState) {
        self.finished = Some(state.clone());
    }
}

/// Writes progress to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_progress(&mut self, state: &ProgressState) {
        info!(
            batch = state.current_batch,
            total = state.total_batches,
            houses = state.houses_processed,
            total_houses = state.total_houses,
            "{}",
            state.current_status
        );
    }

    fn on_finish(&mut self, state: &ProgressState) {
        info!(houses = state.houses_processed, "{}", state.current_status);
    }
}

/// Message emitted by a dispatch running on a background thread.
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    Progress(ProgressState),
    Batch(Batch),
    Finished(ProgressState),
}

/// Forwards everything over a channel. Send errors mean the receiver hung
/// up, which is not the dispatcher's concern.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<DispatchEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<DispatchEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelSink {
    fn on_progress(&mut self, state: &ProgressState) {
        let _ = self.sender.send(DispatchEvent::Progress(state.clone()));
    }

    fn on_batch(&mut self, batch: &Batch) {
        let _ = self.sender.send(DispatchEvent::Batch(batch.clone()));
    }

    fn on_finish(&mut self, state: &ProgressState) {
        let _ = self.sender.send(DispatchEvent::Finished(state.clone()));
    }
}
