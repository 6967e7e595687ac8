use crate::core::geo::{Point, TileCoord};
use std::fmt::Debug;

/// The visual side of a grid layer.
///
/// A surface owns whatever elements it hands out; the grid only keeps
/// handles to them and tells the surface where to put them.
pub trait RenderSurface {
    /// Handle to a container or tile element
    type Element: Clone + Debug + PartialEq;

    /// Creates a container, attached under `parent` when given
    fn create_container(
        &mut self,
        tag: &str,
        class_name: &str,
        parent: Option<&Self::Element>,
    ) -> Self::Element;

    /// Creates the element for one tile. `wrapped` is the tile index brought
    /// back into the CRS wrap range, which is what a tile source serves.
    fn create_tile(&mut self, coords: TileCoord, wrapped: TileCoord) -> Self::Element;

    /// Translate-and-scale transform
    fn set_transform(&mut self, el: &Self::Element, translate: Point, scale: f64);

    /// Translate-only positioning
    fn set_position(&mut self, el: &Self::Element, pos: Point);

    fn set_z_index(&mut self, el: &Self::Element, z_index: i32);

    /// Attaches all `tiles` to `container` in one go
    fn append_batch(&mut self, container: &Self::Element, tiles: &[Self::Element]);

    /// Detaches and drops an element and everything below it
    fn remove_element(&mut self, el: &Self::Element);

    /// Forces pending layout so a freshly added container takes part in transitions
    fn flush_layout(&mut self, _el: &Self::Element) {}

    /// Whether combined transforms are available; positioning only otherwise
    fn supports_3d(&self) -> bool {
        true
    }
}
