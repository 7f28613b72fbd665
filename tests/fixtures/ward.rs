//! A small synthetic collection ward.

use collection_planner::model::{DumpYard, House, Location};

/// Operator's depot; start of the first trip.
pub const DEPOT: Location = Location::new(21.1458, 79.0882);

/// Main dump yard.
pub const DUMP: Location = Location::new(21.1290, 79.1420);

/// Alternate end location (vehicle parking).
pub const PARKING: Location = Location::new(21.1610, 79.0700);

pub const WARD_GEOFENCE: &str = "21.140,79.080;21.140,79.100;21.155,79.100;21.155,79.080";

pub fn dump_yards() -> Vec<DumpYard> {
    vec![
        DumpYard { lat: DUMP.lat, lon: DUMP.lon, name: Some("Bhandewadi".to_string()) },
        DumpYard { lat: 21.1700, lon: 79.0500, name: None },
    ]
}

/// `count` houses on a 10-column grid inside the ward, ids `H1..`.
pub fn ward_houses(count: usize) -> Vec<House> {
    (0..count)
        .map(|i| {
            let row = (i / 10) as f64;
            let col = (i % 10) as f64;
            House::new(format!("H{}", i + 1), 21.141 + row * 0.0005, 79.081 + col * 0.0005)
        })
        .collect()
}
