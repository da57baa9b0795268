//! qrlinker - QR code redirect service with scan analytics
//!
//! # Architecture
//! - `storage`: SeaORM-backed store for QR codes, events and first-seen sessions
//! - `analytics`: session classification, event recording, geography enrichment
//! - `services`: user-agent parsing and GeoIP resolution
//! - `api`: HTTP handlers (redirect page, beacon endpoints, analytics query)
//! - `config`: TOML + environment configuration
//! - `runtime`: application lifecycle and execution modes
//! - `system`: logging setup

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
