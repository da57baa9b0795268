//! Collaborators consumed by the analytics pipeline
//!
//! - `device`: pure user-agent classification
//! - `geoip`: IP → geography resolution (MaxMind / external API)

pub mod device;
pub mod geoip;

pub use device::{DeviceInfo, parse_device_info};
pub use geoip::{GeoInfo, GeoIpLookup, GeoIpProvider};
