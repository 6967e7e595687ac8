pub mod bounds;
pub mod config;
pub mod constants;
pub mod crs;
pub mod events;
pub mod geo;
pub mod viewport;
