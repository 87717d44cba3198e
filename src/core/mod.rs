//! Core library modules for tripcost-fetch
//!
//! This module contains the internal implementation details of the tripcost-fetch library.

pub mod aggregator;
pub mod cache;
pub mod client;
pub mod error;
pub mod fuel;
pub mod location;
pub mod matchers;
pub mod partition;
pub mod report;
pub mod routes;

// Re-export main types for internal use
pub use client::{DistanceMatrixClient, MatrixServiceConfig};
pub use fuel::{FuelPriceScraper, FuelSourceConfig};
pub use routes::{RouteGenerator, RouteRunOptions};
