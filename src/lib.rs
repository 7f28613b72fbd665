//! collection-planner core
//!
//! Plans waste-collection trips against a remote route optimizer: splits a
//! house list into dump-yard trips, dispatches them in travel order, and
//! replays the returned route paths to track which houses were visited.

pub mod error;
pub mod model;
pub mod traits;
pub mod haversine;
pub mod geofence;
pub mod session;
pub mod optimizer;
pub mod house_list;
pub mod progress;
pub mod dispatcher;
pub mod playback;
pub mod report;
pub mod config;
