//! HTTP layer: redirect page and tracking endpoints

pub mod constants;
pub mod services;
