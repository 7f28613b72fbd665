//! Human-readable summaries of optimized trips.

use std::fmt::Write as _;

use serde::Serialize;

use crate::haversine::path_length_km;
use crate::model::{Batch, SpeedProfile, StartType};

/// `"3 km 250 m"` above one kilometer, `"850 m"` otherwise.
pub fn format_distance(km: f64) -> String {
    if km > 1.0 {
        format!("{} km {} m", km.floor() as u64, ((km % 1.0) * 1000.0).round() as u64)
    } else {
        format!("{} m", (km * 1000.0).round() as u64)
    }
}

/// `"1h 35m"`.
pub fn format_minutes(minutes: f64) -> String {
    let minutes = minutes.max(0.0);
    format!("{}h {}m", (minutes / 60.0).floor() as u64, (minutes % 60.0).round() as u64)
}

/// One row of the trip overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub batch_number: usize,
    pub total_batches: usize,
    pub start_type: StartType,
    pub houses: usize,
    pub stops: usize,
    /// Distance reported by the first speed profile, if any.
    pub distance_km: Option<f64>,
    /// Straight-line length of the returned path.
    pub path_km: f64,
    pub fastest: Option<SpeedProfile>,
}

impl From<&Batch> for BatchSummary {
    fn from(batch: &Batch) -> Self {
        let fastest = batch
            .speed_profiles
            .iter()
            .copied()
            .min_by(|a, b| a.time_minutes.total_cmp(&b.time_minutes));

        Self {
            batch_number: batch.batch_number,
            total_batches: batch.total_batches,
            start_type: batch.start_type,
            houses: batch.houses_in_batch,
            stops: batch.stops.len(),
            distance_km: batch.speed_profiles.first().map(|p| p.distance_km),
            path_km: path_length_km(&batch.route_path),
            fastest,
        }
    }
}

/// Totals across a whole job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub trips: Vec<BatchSummary>,
    pub total_houses: usize,
    pub total_distance_km: f64,
    pub total_fastest_minutes: f64,
}

impl JobSummary {
    pub fn new(batches: &[Batch]) -> Self {
        let trips: Vec<BatchSummary> = batches.iter().map(BatchSummary::from).collect();
        Self {
            total_houses: trips.iter().map(|t| t.houses).sum(),
            total_distance_km: trips.iter().filter_map(|t| t.distance_km).sum(),
            total_fastest_minutes: trips
                .iter()
                .filter_map(|t| t.fastest.map(|p| p.time_minutes))
                .sum(),
            trips,
        }
    }

    /// Plain-text table, one line per trip.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<6} {:<14} {:>7} {:>14} {:>10}",
            "Trip", "Start", "Houses", "Distance", "Time"
        );
        for trip in &self.trips {
            let _ = writeln!(
                out,
                "{:<6} {:<14} {:>7} {:>14} {:>10}",
                format!("#{}", trip.batch_number),
                trip.start_type.to_string(),
                trip.houses,
                trip.distance_km.map(format_distance).unwrap_or_else(|| "-".into()),
                trip.fastest
                    .map(|p| format_minutes(p.time_minutes))
                    .unwrap_or_else(|| "-".into()),
            );
        }
        let _ = write!(
            out,
            "{} trips, {} houses, {}",
            self.trips.len(),
            self.total_houses,
            format_distance(self.total_distance_km)
        );
        out
    }
}

/// Speed profile and stop tables for a single trip.
pub fn render_batch(batch: &Batch) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Dump Yard Trip #{} ({})", batch.batch_number, batch.start_type);

    let _ = writeln!(out, "{:<12} {:>14} {:>10}", "Speed (km/h)", "Distance", "Time");
    for profile in &batch.speed_profiles {
        let _ = writeln!(
            out,
            "{:<12} {:>14} {:>10}",
            profile.speed_kmph,
            format!("{:.2} km", profile.distance_km),
            format_minutes(profile.time_minutes)
        );
    }

    let _ = writeln!(
        out,
        "{:<5} {:<16} {:<10} {:>11} {:>11}",
        "#", "Label", "House ID", "Lat", "Lon"
    );
    for stop in &batch.stops {
        let _ = writeln!(
            out,
            "{:<5} {:<16} {:<10} {:>11.6} {:>11.6}",
            stop.stop,
            stop.label,
            stop.house_id.as_deref().unwrap_or("-"),
            stop.lat,
            stop.lon
        );
    }
    out
}
