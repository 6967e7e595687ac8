use crate::{
    core::geo::{LatLng, TileCoord},
    prelude::HashMap,
};
use std::{collections::VecDeque, fmt};

/// Events fired by the map and its grid layers
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Zoom changed (or a pinch is in progress)
    Zoom { zoom: f64, pinch: bool },
    /// Center or zoom changed
    Move { center: LatLng, zoom: f64 },
    /// A grid layer started loading a new batch of tiles
    Loading,
    /// A grid layer has no tiles left to load
    Load,
    TileLoadStart { coords: TileCoord },
    TileLoad { coords: TileCoord },
    TileError { coords: TileCoord, error: String },
    /// A tile was removed from the grid
    TileUnload { coords: TileCoord },
    /// A tile still loading was dropped after a zoom change
    TileAbort { coords: TileCoord },
    LevelCreate { zoom: i32 },
    LevelUpdate { zoom: i32 },
    LevelRemove { zoom: i32 },
}

impl MapEvent {
    /// Name listeners register under
    pub fn name(&self) -> &'static str {
        match self {
            MapEvent::Zoom { .. } => "zoom",
            MapEvent::Move { .. } => "move",
            MapEvent::Loading => "loading",
            MapEvent::Load => "load",
            MapEvent::TileLoadStart { .. } => "tileloadstart",
            MapEvent::TileLoad { .. } => "tileload",
            MapEvent::TileError { .. } => "tileerror",
            MapEvent::TileUnload { .. } => "tileunload",
            MapEvent::TileAbort { .. } => "tileabort",
            MapEvent::LevelCreate { .. } => "levelcreate",
            MapEvent::LevelUpdate { .. } => "levelupdate",
            MapEvent::LevelRemove { .. } => "levelremove",
        }
    }
}

/// Anything events can be fired into
pub trait EventBus {
    fn fire(&mut self, event: MapEvent);
}

/// Plain recorder, handy when only the sequence of events matters
impl EventBus for Vec<MapEvent> {
    fn fire(&mut self, event: MapEvent) {
        self.push(event);
    }
}

/// Event listener callback type
pub type EventCallback = Box<dyn Fn(&MapEvent) + Send + Sync>;

/// Queues fired events and dispatches them to listeners by name
#[derive(Default)]
pub struct EventManager {
    /// Event listeners by event type
    listeners: HashMap<String, Vec<EventCallback>>,
    /// Event queue for processing
    event_queue: VecDeque<MapEvent>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event listener
    pub fn on<F>(&mut self, event_type: &str, callback: F)
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.listeners
            .entry(event_type.to_string())
            .or_default()
            .push(Box::new(callback));
    }

    /// Drop all listeners registered for `event_type`
    pub fn off(&mut self, event_type: &str) {
        self.listeners.remove(event_type);
    }

    /// Dispatch all queued events to their listeners and hand them back
    pub fn process_events(&mut self) -> Vec<MapEvent> {
        let events: Vec<_> = self.event_queue.drain(..).collect();

        for event in &events {
            if let Some(callbacks) = self.listeners.get(event.name()) {
                for callback in callbacks {
                    callback(event);
                }
            }
        }

        events
    }

    /// Queued events, oldest first
    pub fn pending(&self) -> impl Iterator<Item = &MapEvent> {
        self.event_queue.iter()
    }

    /// Clear all events from the queue
    pub fn clear_events(&mut self) {
        self.event_queue.clear();
    }

    /// Get number of pending events
    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }
}

impl EventBus for EventManager {
    fn fire(&mut self, event: MapEvent) {
        log::trace!("fire {}", event.name());
        self.event_queue.push_back(event);
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .field("event_queue", &self.event_queue)
            .finish()
    }
}
