//! Render surface abstraction the grid draws through

pub mod headless;
pub mod surface;

pub use headless::{ElementId, HeadlessSurface};
pub use surface::RenderSurface;
