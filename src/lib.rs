//! # infrakit
//! This crate fetches connectivity infrastructure datasets for a single country, checks them against the
//! country's administrative boundary, and writes them out in a fixed, documented schema.
//!
//! ## Usage
//! A run resolves the country boundary and its ISO3 code, loads schools, broadband performance tiles, cell sites
//! and transmission nodes, derives a mobile coverage footprint from the tiles, and writes four files under
//! `<data_dir>/<ISO3>/processed/`: three CSVs (schools, cell sites, transmission nodes) and one GeoJSON (coverage).
//!
//! Each step is also exposed on its own, so the loaders, the coverage derivation and the standardization can be
//! used without the full pipeline. See `pipeline::run` for the order they are chained in.

pub mod config;
pub mod country;
pub mod coverage;
pub mod datasets;
pub mod error;
pub mod fetch;
pub mod index;
pub mod pipeline;
pub mod plot;
pub mod schema;
pub mod standardize;
pub mod tiles;

pub use error::{Error, Result};
