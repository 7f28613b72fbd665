//! Playback over dispatched trips.

mod fixtures;

use std::ops::ControlFlow;
use std::time::Duration;

use collection_planner::dispatcher::{BatchDispatcher, DispatchRequest, DispatcherOptions};
use collection_planner::haversine::{haversine_km, path_length_km};
use collection_planner::model::{Batch, RawHouse};
use collection_planner::playback::{
    DEFAULT_VISIT_THRESHOLD_KM, Playback, PlaybackState, VisitDetector,
};
use collection_planner::progress::NoopSink;

use fixtures::*;

fn dispatched_trips(house_count: usize, batch_size: usize) -> Vec<Batch> {
    let request = DispatchRequest::new(WARD_GEOFENCE, ward_houses(house_count))
        .start(DEPOT)
        .dump(DUMP)
        .batch_size(batch_size);
    BatchDispatcher::new(ScriptedOptimizer::new(), DispatcherOptions::default())
        .dispatch(&request, &mut NoopSink)
        .unwrap()
        .batches
}

#[test]
fn replaying_a_trip_visits_its_houses() {
    let houses = ward_houses(12);
    let trips = dispatched_trips(12, 5);
    let trip = &trips[1];

    let mut playback =
        Playback::new(trip.route_path.clone(), houses.clone(), DEFAULT_VISIT_THRESHOLD_KM);
    let mut events = Vec::new();
    playback.run(Duration::ZERO, |event| {
        events.push(event.clone());
        ControlFlow::Continue(())
    });

    assert_eq!(playback.state(), PlaybackState::Finished);
    assert_eq!(events.len(), trip.route_path.len() - 1);

    let visited = playback.detector().visited();
    let expected: Vec<String> = (6..=10).map(|i| format!("H{}", i)).collect();
    assert_eq!(visited, &expected[..]);
    for house in &houses {
        let in_trip = expected.contains(&house.house_id);
        assert_eq!(playback.detector().is_visited(&house.house_id), in_trip);
    }
}

#[test]
fn traveled_distance_matches_path_length() {
    let trips = dispatched_trips(8, 8);
    let path = trips[0].route_path.clone();

    let mut playback = Playback::new(path.clone(), ward_houses(8), DEFAULT_VISIT_THRESHOLD_KM);
    let mut last = 0.0;
    playback.run(Duration::ZERO, |event| {
        assert!(event.traveled_km >= last, "distance must not decrease");
        last = event.traveled_km;
        ControlFlow::Continue(())
    });

    assert!((playback.detector().traveled_km() - path_length_km(&path)).abs() < 1e-9);
}

#[test]
fn revisiting_a_point_does_not_duplicate() {
    let houses = ward_houses(1);
    let at_house = houses[0].location();
    let mut detector = VisitDetector::default();

    assert_eq!(detector.observe(None, at_house, &houses), vec!["H1".to_string()]);
    assert!(detector.observe(Some(at_house), DEPOT, &houses).is_empty());
    assert!(detector.observe(Some(DEPOT), at_house, &houses).is_empty());
    assert_eq!(detector.visited(), &["H1".to_string()]);

    let expected = 2.0 * haversine_km(at_house, DEPOT);
    assert!((detector.traveled_km() - expected).abs() < 1e-9);
}

#[test]
fn switching_trips_restarts_playback() {
    let trips = dispatched_trips(6, 3);
    let mut playback =
        Playback::new(trips[0].route_path.clone(), ward_houses(6), DEFAULT_VISIT_THRESHOLD_KM);
    playback.play();
    playback.tick();
    assert!(!playback.detector().visited().is_empty());

    playback.set_route(trips[1].route_path.clone());
    assert_eq!(playback.index(), 0);
    assert_eq!(playback.state(), PlaybackState::Idle);
    assert!(playback.detector().visited().is_empty());
    assert_eq!(playback.position(), trips[1].route_path.first().copied());
}

#[test]
fn houses_sharing_an_id_are_each_visited() {
    let rows: Vec<RawHouse> = serde_json::from_value(serde_json::json!([
        {"House_Id": "H2", "House_Lat": 21.10, "House_Long": 79.00},
        {"House_Id": null, "House_Lat": 21.20, "House_Long": 79.10}
    ]))
    .unwrap();
    let houses = RawHouse::into_houses(rows);
    assert_ne!(houses[0].house_id, houses[1].house_id);

    let mut detector = VisitDetector::default();
    assert_eq!(detector.observe(None, houses[0].location(), &houses).len(), 1);
    let second = detector.observe(Some(houses[0].location()), houses[1].location(), &houses);
    assert_eq!(second, vec![houses[1].house_id.clone()]);
}
