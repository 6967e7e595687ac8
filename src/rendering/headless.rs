//! In-memory render surface
//!
//! Keeps a small element tree with the last transform, position and stacking
//! order applied to each element. Useful without a UI and in tests.

use super::surface::RenderSurface;
use crate::{
    core::geo::{Point, TileCoord},
    prelude::HashMap,
};

/// Handle to an element of a [`HeadlessSurface`]
pub type ElementId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Container { tag: String, class_name: String },
    Tile { coords: TileCoord, wrapped: TileCoord },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub translate: Point,
    pub scale: f64,
    pub z_index: Option<i32>,
}

impl Node {
    fn new(kind: NodeKind, parent: Option<ElementId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            translate: Point::default(),
            scale: 1.0,
            z_index: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    nodes: HashMap<ElementId, Node>,
    next_id: ElementId,
    supports_3d: bool,
    layout_flushes: usize,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::default(),
            next_id: 0,
            supports_3d: true,
            layout_flushes: 0,
        }
    }

    /// Surface that only supports positioning, never scaling
    pub fn without_3d() -> Self {
        Self {
            supports_3d: false,
            ..Self::new()
        }
    }

    pub fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.nodes
            .get(&id)
            .map_or(&[][..], |node| node.children.as_slice())
    }

    /// Number of live tile elements
    pub fn tile_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| matches!(node.kind, NodeKind::Tile { .. }))
            .count()
    }

    pub fn layout_flushes(&self) -> usize {
        self.layout_flushes
    }

    fn insert(&mut self, node: Node) -> ElementId {
        let id = self.next_id;
        self.next_id += 1;
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.push(id);
        }
        self.nodes.insert(id, node);
        id
    }

    fn remove_subtree(&mut self, id: ElementId) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.children {
                self.remove_subtree(child);
            }
        }
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSurface for HeadlessSurface {
    type Element = ElementId;

    fn create_container(
        &mut self,
        tag: &str,
        class_name: &str,
        parent: Option<&ElementId>,
    ) -> ElementId {
        self.insert(Node::new(
            NodeKind::Container {
                tag: tag.to_string(),
                class_name: class_name.to_string(),
            },
            parent.copied(),
        ))
    }

    fn create_tile(&mut self, coords: TileCoord, wrapped: TileCoord) -> ElementId {
        // detached until appended
        self.insert(Node::new(NodeKind::Tile { coords, wrapped }, None))
    }

    fn set_transform(&mut self, el: &ElementId, translate: Point, scale: f64) {
        if let Some(node) = self.nodes.get_mut(el) {
            node.translate = translate;
            node.scale = scale;
        }
    }

    fn set_position(&mut self, el: &ElementId, pos: Point) {
        if let Some(node) = self.nodes.get_mut(el) {
            node.translate = pos;
        }
    }

    fn set_z_index(&mut self, el: &ElementId, z_index: i32) {
        if let Some(node) = self.nodes.get_mut(el) {
            node.z_index = Some(z_index);
        }
    }

    fn append_batch(&mut self, container: &ElementId, tiles: &[ElementId]) {
        for tile in tiles {
            let previous = match self.nodes.get_mut(tile) {
                Some(node) => node.parent.replace(*container),
                None => continue,
            };
            if let Some(old) = previous.and_then(|p| self.nodes.get_mut(&p)) {
                old.children.retain(|child| child != tile);
            }
            if let Some(parent) = self.nodes.get_mut(container) {
                parent.children.push(*tile);
            }
        }
    }

    fn remove_element(&mut self, el: &ElementId) {
        let parent = self.nodes.get(el).and_then(|node| node.parent);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| child != el);
        }
        self.remove_subtree(*el);
    }

    fn flush_layout(&mut self, _el: &ElementId) {
        self.layout_flushes += 1;
    }

    fn supports_3d(&self) -> bool {
        self.supports_3d
    }
}
