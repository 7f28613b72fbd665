//! Test fixtures for collection-planner.
//!
//! Provides:
//! - A synthetic ward near Nagpur: geofence, dump yards, house grid
//! - A scripted optimizer that records requests and can fail on demand
//! - A one-shot axum responder for exercising the HTTP adapters

#![allow(dead_code)]

pub mod http;
pub mod scripted;
pub mod ward;

#[allow(unused_imports)]
pub use http::*;
#[allow(unused_imports)]
pub use scripted::*;
pub use ward::*;
