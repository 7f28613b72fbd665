//! Route playback and visit detection.
//!
//! A vehicle marker steps along a batch's `route_path` one point per tick.
//! On every tick the detector marks houses within a threshold of the marker
//! as visited and adds the step to the traveled distance. Visits are never
//! undone during a playback.

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::thread;
use std::time::Duration;

use rayon::prelude::*;

use crate::haversine::{bearing_deg, haversine_km};
use crate::model::{House, Location, RoutePoint};

/// Distance under which a house counts as visited, in kilometers.
pub const DEFAULT_VISIT_THRESHOLD_KM: f64 = 0.02;

/// Time between playback ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Below this many houses the scan runs on the calling thread.
const PARALLEL_SCAN_MIN_HOUSES: usize = 2048;

/// Tracks visited houses and traveled distance for one playback.
#[derive(Debug, Clone)]
pub struct VisitDetector {
    threshold_km: f64,
    seen: HashSet<String>,
    visited: Vec<String>,
    traveled_km: f64,
}

impl Default for VisitDetector {
    fn default() -> Self {
        Self::new(DEFAULT_VISIT_THRESHOLD_KM)
    }
}

impl VisitDetector {
    pub fn new(threshold_km: f64) -> Self {
        Self {
            threshold_km,
            seen: HashSet::new(),
            visited: Vec::new(),
            traveled_km: 0.0,
        }
    }

    /// Processes the marker arriving at `current`, having come from `previous`.
    ///
    /// Returns the ids marked visited by this call, in house order.
    pub fn observe(
        &mut self,
        previous: Option<Location>,
        current: Location,
        houses: &[House],
    ) -> Vec<String> {
        if let Some(previous) = previous {
            self.traveled_km += haversine_km(previous, current);
        }

        let threshold = self.threshold_km;
        let within = |house: &&House| haversine_km(current, house.location()) < threshold;
        let hits: Vec<&House> = if houses.len() >= PARALLEL_SCAN_MIN_HOUSES {
            houses.par_iter().filter(within).collect()
        } else {
            houses.iter().filter(within).collect()
        };

        hits.into_iter()
            .filter(|house| self.seen.insert(house.house_id.clone()))
            .map(|house| {
                self.visited.push(house.house_id.clone());
                house.house_id.clone()
            })
            .collect()
    }

    pub fn is_visited(&self, house_id: &str) -> bool {
        self.seen.contains(house_id)
    }

    /// Visited ids in the order they were first reached.
    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    pub fn traveled_km(&self) -> f64 {
        self.traveled_km
    }

    pub fn reset(&mut self) {
        self.seen.clear();
        self.visited.clear();
        self.traveled_km = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Finished,
}

/// What one tick produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TickEvent {
    pub index: usize,
    pub position: RoutePoint,
    /// Bearing towards the next point; 0 at the end of the path.
    pub heading_deg: f64,
    pub newly_visited: Vec<String>,
    pub traveled_km: f64,
    pub finished: bool,
}

/// Drives a marker along one route path.
#[derive(Debug, Clone)]
pub struct Playback {
    route: Vec<RoutePoint>,
    houses: Vec<House>,
    index: usize,
    state: PlaybackState,
    detector: VisitDetector,
}

impl Playback {
    pub fn new(route: Vec<RoutePoint>, houses: Vec<House>, threshold_km: f64) -> Self {
        Self {
            route,
            houses,
            index: 0,
            state: PlaybackState::Idle,
            detector: VisitDetector::new(threshold_km),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn position(&self) -> Option<RoutePoint> {
        self.route.get(self.index).copied()
    }

    pub fn heading_deg(&self) -> f64 {
        match (self.route.get(self.index), self.route.get(self.index + 1)) {
            (Some(from), Some(to)) => bearing_deg(*from, *to),
            _ => 0.0,
        }
    }

    pub fn detector(&self) -> &VisitDetector {
        &self.detector
    }

    /// Swaps in a new path: back to the first point, `Idle`, nothing visited.
    pub fn set_route(&mut self, route: Vec<RoutePoint>) {
        self.route = route;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.state = PlaybackState::Idle;
        self.detector.reset();
    }

    /// Starts or resumes playback. A finished playback restarts from the
    /// first point. Paths with fewer than two points cannot play.
    pub fn play(&mut self) -> bool {
        if self.route.len() < 2 {
            return false;
        }
        match self.state {
            PlaybackState::Playing => return true,
            PlaybackState::Finished => self.reset(),
            PlaybackState::Idle => {}
        }

        // The starting point is covered before the first step.
        let current = self.route[self.index];
        self.detector.observe(None, current, &self.houses);
        self.state = PlaybackState::Playing;
        true
    }

    /// `Playing` to `Idle`, keeping the current index.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Idle;
        }
    }

    /// Advances one point. Does nothing unless playing.
    pub fn tick(&mut self) -> Option<TickEvent> {
        if self.state != PlaybackState::Playing {
            return None;
        }
        let next = self.index + 1;
        if next >= self.route.len() {
            self.state = PlaybackState::Finished;
            return None;
        }

        let previous = self.route[self.index];
        let current = self.route[next];
        self.index = next;
        let newly_visited = self.detector.observe(Some(previous), current, &self.houses);

        let finished = next + 1 == self.route.len();
        if finished {
            self.state = PlaybackState::Finished;
        }

        Some(TickEvent {
            index: next,
            position: current,
            heading_deg: self.heading_deg(),
            newly_visited,
            traveled_km: self.detector.traveled_km(),
            finished,
        })
    }

    /// Plays to the end, sleeping `interval` before every tick.
    ///
    /// Breaking out of `on_tick` pauses the playback where it stands.
    pub fn run<F>(&mut self, interval: Duration, mut on_tick: F)
    where
        F: FnMut(&TickEvent) -> ControlFlow<()>,
    {
        if !self.play() {
            return;
        }
        while self.state == PlaybackState::Playing {
            if !interval.is_zero() {
                thread::sleep(interval);
            }
            let Some(event) = self.tick() else {
                break;
            };
            if on_tick(&event).is_break() {
                self.pause();
                break;
            }
        }
    }
}
