//! Optimizer double that answers from the request it receives.

use std::sync::Mutex;

use collection_planner::error::OptimizerError;
use collection_planner::model::{OptimizeRequest, RawBatch, SpeedProfile, Stop};
use collection_planner::traits::RouteOptimizer;

/// Visits houses in request order, then the dump yard (or the requested end).
///
/// Fails every call whose 1-based number is listed in `fail_on`.
#[derive(Debug, Default)]
pub struct ScriptedOptimizer {
    fail_on: Vec<usize>,
    requests: Mutex<Vec<OptimizeRequest>>,
}

impl ScriptedOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on: vec![call],
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<OptimizeRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl RouteOptimizer for ScriptedOptimizer {
    fn optimize(&self, request: &OptimizeRequest) -> Result<RawBatch, OptimizerError> {
        let call = {
            let mut requests = self.requests.lock().expect("requests lock");
            requests.push(request.clone());
            requests.len()
        };
        if self.fail_on.contains(&call) {
            return Err(OptimizerError::Status {
                status: 502,
                body: format!("call {} rejected", call),
            });
        }
        Ok(scripted_batch(request))
    }
}

pub fn scripted_batch(request: &OptimizeRequest) -> RawBatch {
    let finish = request.end_location.unwrap_or(request.dump_location);

    let mut stops: Vec<Stop> = request
        .houses
        .iter()
        .enumerate()
        .map(|(i, house)| Stop {
            stop: i as u32 + 1,
            label: "House".to_string(),
            house_id: None,
            lat: house.lat,
            lon: house.lon,
        })
        .collect();
    stops.push(Stop {
        stop: stops.len() as u32 + 1,
        label: if request.end_location.is_some() { "End" } else { "Dump Yard" }.to_string(),
        house_id: None,
        lat: finish.lat,
        lon: finish.lon,
    });

    let mut route_path = vec![request.start_location];
    route_path.extend(request.houses.iter().copied());
    route_path.push(finish);

    let km = collection_planner::haversine::path_length_km(&route_path);
    let speed_profiles = [15.0, 25.0, 40.0]
        .into_iter()
        .map(|speed| SpeedProfile {
            speed_kmph: speed,
            distance_km: km,
            time_minutes: km / speed * 60.0,
        })
        .collect();

    RawBatch { stops, route_path, speed_profiles }
}
