//! Wire and domain types for collection jobs.
//!
//! Coordinates arrive as numbers from the optimizer but as strings from the
//! house listing endpoint and spreadsheet exports, so every coordinate field
//! goes through [`coord`] on the way in.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(deserialize_with = "coord::deserialize")]
    pub lat: f64,
    #[serde(deserialize_with = "coord::deserialize")]
    pub lon: f64,
}

impl Location {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lon)
    }
}

impl FromStr for Location {
    type Err = String;

    /// Parses `lat,lon`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected lat,lon but got {:?}", s))?;
        match (coord::parse(lat), coord::parse(lon)) {
            (Some(lat), Some(lon)) => Ok(Self::new(lat, lon)),
            _ => Err(format!("invalid coordinates {:?}", s)),
        }
    }
}

/// One point along a computed path. Sequence order is travel order.
pub type RoutePoint = Location;

/// A house to be collected from. `house_id` is unique within a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct House {
    pub house_id: String,
    #[serde(deserialize_with = "coord::deserialize")]
    pub lat: f64,
    #[serde(deserialize_with = "coord::deserialize")]
    pub lon: f64,
}

impl House {
    pub fn new(house_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            house_id: house_id.into(),
            lat,
            lon,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.lat, self.lon)
    }
}

/// House row as delivered by the listing endpoint or a spreadsheet export.
///
/// Coordinates are kept loose so that one bad row does not reject the whole
/// listing; see [`RawHouse::into_houses`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHouse {
    #[serde(default, alias = "House_Id")]
    pub house_id: Option<serde_json::Value>,
    #[serde(default, alias = "House_Lat")]
    pub lat: Option<serde_json::Value>,
    #[serde(default, alias = "House_Long")]
    pub lon: Option<serde_json::Value>,
}

impl RawHouse {
    /// Coerces raw rows into houses.
    ///
    /// Rows without an id get `H{n}` where `n` is the 1-based input
    /// position. Rows whose coordinates cannot be read as numbers are
    /// dropped; positions of the remaining rows are not renumbered.
    ///
    /// Ids are unique in the result. A fallback id never takes an id some
    /// other row carries explicitly, and repeated ids get a `-2`, `-3`, ...
    /// suffix.
    pub fn into_houses(rows: Vec<RawHouse>) -> Vec<House> {
        let reserved: HashSet<String> = rows
            .iter()
            .filter_map(|row| row.house_id.as_ref().and_then(id_text))
            .collect();
        let mut taken = HashSet::new();

        rows.into_iter()
            .enumerate()
            .filter_map(|(index, row)| {
                let (base_id, fallback) = match row.house_id.as_ref().and_then(id_text) {
                    Some(id) => (id, false),
                    None => (format!("H{}", index + 1), true),
                };

                let lat = row.lat.as_ref().and_then(coord::from_value);
                let lon = row.lon.as_ref().and_then(coord::from_value);
                match (lat, lon) {
                    (Some(lat), Some(lon)) => {
                        let house_id = claim_id(base_id, fallback, &reserved, &mut taken);
                        Some(House { house_id, lat, lon })
                    }
                    _ => {
                        warn!(house_id = %base_id, "dropping house with unreadable coordinates");
                        None
                    }
                }
            })
            .collect()
    }
}

fn claim_id(
    base_id: String,
    fallback: bool,
    reserved: &HashSet<String>,
    taken: &mut HashSet<String>,
) -> String {
    let mut house_id = base_id.clone();
    let mut suffix = 1;
    while taken.contains(&house_id) || ((fallback || suffix > 1) && reserved.contains(&house_id)) {
        suffix += 1;
        house_id = format!("{}-{}", base_id, suffix);
    }
    if suffix > 1 {
        warn!(house_id = %base_id, assigned = %house_id, "house id already in use");
    }
    taken.insert(house_id.clone());
    house_id
}

/// Id text as the web client renders it; integral floats lose their `.0`.
fn id_text(value: &serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(v) if n.is_f64() => v.to_string(),
            _ => n.to_string(),
        },
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Disposal site that ends every collection trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpYard {
    #[serde(deserialize_with = "coord::deserialize")]
    pub lat: f64,
    #[serde(deserialize_with = "coord::deserialize")]
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DumpYard {
    pub fn location(&self) -> Location {
        Location::new(self.lat, self.lon)
    }
}

/// One element of a batch's visiting order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub stop: u32,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_id: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

/// Distance/time estimate for a batch at an assumed travel speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedProfile {
    pub speed_kmph: f64,
    pub distance_km: f64,
    pub time_minutes: f64,
}

/// Where a trip began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartType {
    #[serde(rename = "User Location")]
    UserLocation,
    #[serde(rename = "Dump Yard")]
    DumpYard,
}

impl fmt::Display for StartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartType::UserLocation => f.write_str("User Location"),
            StartType::DumpYard => f.write_str("Dump Yard"),
        }
    }
}

/// A batch exactly as the optimizer returns it, before annotation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawBatch {
    #[serde(default)]
    pub stops: Vec<Stop>,
    pub route_path: Vec<RoutePoint>,
    #[serde(default)]
    pub speed_profiles: Vec<SpeedProfile>,
}

/// One vehicle trip: start point, assigned houses, dump yard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub stops: Vec<Stop>,
    pub route_path: Vec<RoutePoint>,
    pub speed_profiles: Vec<SpeedProfile>,
    pub batch_number: usize,
    pub total_batches: usize,
    pub start_type: StartType,
    pub houses_in_batch: usize,
}

impl Batch {
    /// Annotates an optimizer batch with its position in the job and pairs
    /// each stop with the house at the same position in `houses`.
    ///
    /// Stops beyond the end of `houses` keep whatever id the optimizer gave.
    pub fn annotate(
        raw: RawBatch,
        batch_number: usize,
        total_batches: usize,
        houses: &[House],
    ) -> Self {
        let start_type = if batch_number == 1 {
            StartType::UserLocation
        } else {
            StartType::DumpYard
        };

        let stops = raw
            .stops
            .into_iter()
            .enumerate()
            .map(|(i, mut stop)| {
                if let Some(house) = houses.get(i) {
                    stop.house_id = Some(house.house_id.clone());
                }
                stop
            })
            .collect();

        Self {
            stops,
            route_path: raw.route_path,
            speed_profiles: raw.speed_profiles,
            batch_number,
            total_batches,
            start_type,
            houses_in_batch: houses.len(),
        }
    }
}

/// Payload for one `optimize_route` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizeRequest {
    pub geofence: String,
    pub houses: Vec<Location>,
    pub start_location: Location,
    pub dump_location: Location,
    pub batch_size: usize,
    pub nn_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_location: Option<Location>,
}

/// `optimize_route` response. Newer deployments wrap results in `batches`,
/// single-batch deployments put the batch fields at the top level.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OptimizeResponse {
    Batches { batches: Vec<RawBatch> },
    Single(RawBatch),
}

impl OptimizeResponse {
    pub fn into_first(self) -> Option<RawBatch> {
        match self {
            OptimizeResponse::Batches { batches } => batches.into_iter().next(),
            OptimizeResponse::Single(batch) => Some(batch),
        }
    }
}

/// Lenient coordinate decoding: accepts JSON numbers and numeric strings.
pub mod coord {
    use serde::{Deserialize, Deserializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Coordinate {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Coordinate::deserialize(deserializer)? {
            Coordinate::Number(value) => Ok(value),
            Coordinate::Text(text) => parse(&text)
                .ok_or_else(|| de::Error::custom(format!("invalid coordinate {:?}", text))),
        }
    }

    /// Parses a trimmed decimal coordinate. Empty and non-finite input is rejected.
    pub fn parse(text: &str) -> Option<f64> {
        text.trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
    }

    pub fn from_value(value: &serde_json::Value) -> Option<f64> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
            serde_json::Value::String(s) => parse(s),
            _ => None,
        }
    }
}
