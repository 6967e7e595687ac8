//! Core constants derived from Leaflet grid-layer defaults.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Rows/columns of tiles kept around the visible range before pruning.
pub const DEFAULT_KEEP_BUFFER: u32 = 2;

/// Zoom range a grid layer shows tiles for unless configured otherwise.
pub const DEFAULT_MIN_ZOOM: i32 = 0;
pub const DEFAULT_MAX_ZOOM: i32 = 18;

/// How many zoom levels up pruning looks for a loaded replacement tile.
pub const PARENT_RETAIN_DEPTH: i32 = 5;

/// How many zoom levels down pruning looks for loaded replacement tiles.
pub const CHILD_RETAIN_DEPTH: i32 = 2;

/// Class names given to the containers created on the render surface.
pub const GRID_CONTAINER_CLASS: &str = "leaflet-layer";
pub const LEVEL_CONTAINER_CLASS: &str = "leaflet-tile-container leaflet-zoom-animated";
