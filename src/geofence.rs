//! Geofence parsing.
//!
//! A geofence travels as `lat,lon;lat,lon;...`. Parsing is forgiving:
//! segments that are not a pair of finite numbers are skipped.

use serde::{Deserialize, Serialize};

use crate::model::{Location, coord};

/// Ordered boundary points of a service area, implicitly closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    points: Vec<Location>,
}

impl Geofence {
    pub fn new(points: Vec<Location>) -> Self {
        Self { points }
    }

    /// Parses the `;`-delimited wire form, dropping malformed segments.
    pub fn parse(raw: &str) -> Self {
        let points = raw
            .split(';')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .filter_map(parse_pair)
            .collect();
        Self { points }
    }

    /// Parses a `.txt` upload with one `lat,lon` pair per line.
    pub fn from_upload(text: &str) -> Self {
        Self::parse(&upload_to_wire(text))
    }

    pub fn points(&self) -> &[Location] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The map only draws a polygon from three points upward.
    pub fn is_polygon(&self) -> bool {
        self.points.len() >= 3
    }

    /// Renders back to the wire form.
    pub fn to_wire(&self) -> String {
        self.points
            .iter()
            .map(|p| format!("{},{}", p.lat, p.lon))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Arithmetic mean of the boundary points.
    pub fn centroid(&self) -> Option<Location> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f64;
        let (lat, lon) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
        Some(Location::new(lat / n, lon / n))
    }

    /// South-west and north-east corners of the bounding box.
    pub fn bounds(&self) -> Option<(Location, Location)> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(min, max), p| {
            (
                Location::new(min.lat.min(p.lat), min.lon.min(p.lon)),
                Location::new(max.lat.max(p.lat), max.lon.max(p.lon)),
            )
        }))
    }
}

/// Joins the non-empty lines of an uploaded geofence file with `;`.
pub fn upload_to_wire(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(";")
}

fn parse_pair(segment: &str) -> Option<Location> {
    let mut parts = segment.split(',');
    let lat = coord::parse(parts.next()?)?;
    let lon = coord::parse(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(Location::new(lat, lon))
}
