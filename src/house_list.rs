//! HTTP adapter for the geofence-wise house listing.
//!
//! One GET per identity, authenticated by the `AppId` / `userId` headers.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::HouseListError;
use crate::geofence::Geofence;
use crate::model::{DumpYard, House, RawHouse};
use crate::session::Credentials;

pub const DEFAULT_HOUSE_LIST_URL: &str =
    "https://weight.ictsbm.com/api/Get/GeoFencingWiseHouseList";

#[derive(Debug, Clone)]
pub struct HouseListConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for HouseListConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_HOUSE_LIST_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Everything the planner needs to start a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HouseListing {
    /// Geofence in wire form, passed through to the optimizer untouched.
    pub geofence: String,
    pub houses: Vec<House>,
    #[serde(rename = "dumpyards")]
    pub dump_yards: Vec<DumpYard>,
}

impl HouseListing {
    pub fn fence(&self) -> Geofence {
        Geofence::parse(&self.geofence)
    }

    /// Decodes a listing body. Missing sections default to empty.
    pub fn from_json(body: &str) -> Result<Self, HouseListError> {
        let parsed: HouseListResponse =
            serde_json::from_str(body).map_err(|err| HouseListError::Malformed(err.to_string()))?;

        Ok(Self {
            geofence: parsed.geofence.unwrap_or_default(),
            houses: RawHouse::into_houses(parsed.houses.unwrap_or_default()),
            dump_yards: parsed.dumpyards.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct HouseListResponse {
    #[serde(default)]
    geofence: Option<String>,
    #[serde(default)]
    houses: Option<Vec<RawHouse>>,
    #[serde(default)]
    dumpyards: Option<Vec<DumpYard>>,
}

#[derive(Debug, Clone)]
pub struct HouseListClient {
    config: HouseListConfig,
    client: reqwest::blocking::Client,
}

impl HouseListClient {
    pub fn new(config: HouseListConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn fetch(&self, credentials: &Credentials) -> Result<HouseListing, HouseListError> {
        if credentials.app_id.trim().is_empty() || credentials.user_id.trim().is_empty() {
            return Err(HouseListError::MissingCredentials);
        }

        debug!(url = %self.config.url, app_id = %credentials.app_id, "fetching house list");
        let response = self
            .client
            .get(&self.config.url)
            .header("AppId", &credentials.app_id)
            .header("userId", &credentials.user_id)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(HouseListError::Status(status.as_u16()));
        }

        let listing = HouseListing::from_json(&response.text()?)?;
        info!(
            houses = listing.houses.len(),
            dump_yards = listing.dump_yards.len(),
            fence_points = listing.fence().len(),
            "house list loaded"
        );
        Ok(listing)
    }
}
