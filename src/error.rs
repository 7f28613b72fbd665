//! Error types shared across the planner.

use thiserror::Error;

/// Failure of a single call to the remote optimizer.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("optimizer returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed optimizer response: {0}")]
    Malformed(String),
}

/// Failure while fetching the house / geofence / dump yard listing.
#[derive(Debug, Error)]
pub enum HouseListError {
    #[error("AppId and UserId are both required")]
    MissingCredentials,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("house list endpoint returned status {0}")]
    Status(u16),

    #[error("malformed house list response: {0}")]
    Malformed(String),
}

/// Precondition failures caught before any optimizer call is made.
#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error("please select a dump yard")]
    MissingDumpYard,

    #[error("no dump yard at index {index} ({available} available)")]
    UnknownDumpYard { index: usize, available: usize },

    #[error("please pick a start location")]
    MissingStart,

    #[error("no houses to route")]
    EmptyHouses,

    #[error("geofence is empty")]
    EmptyGeofence,

    #[error("batch size must be at least 1")]
    ZeroBatchSize,

    #[error("{what} has a non-finite coordinate")]
    InvalidCoordinate { what: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}
