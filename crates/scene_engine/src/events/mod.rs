//! Scene event system
//!
//! Key principles:
//! - Key-value arguments (no order dependency)
//! - Handler returns bool (true = consumed, stops forwarding)
//! - Registration system (only notify interested handlers)
//! - Queued delivery, dispatched synchronously by the scene

use std::collections::HashMap;

use crate::scene::NodeId;

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneEventType {
    /// A compilation pass is about to walk the graph
    SceneCompiling,
    /// A compilation pass finished and the display list is ready
    SceneCompiled,
    /// A node was inserted into the graph
    NodeCreated,
    /// A node was removed from the graph
    NodeDestroyed,
}

/// Variant for type-safe event arguments
#[derive(Debug, Clone, PartialEq)]
pub enum EventArg {
    /// Node the event refers to
    Node(NodeId),
    /// Node type name, e.g. `"stencilBuffer"`
    NodeType(&'static str),
    /// Number of nodes in the graph
    NodeCount(usize),
    /// Number of objects in the display list
    ObjectCount(usize),
}

/// Event with type ID and key-value arguments
#[derive(Debug, Clone)]
pub struct Event {
    /// Type of event
    pub event_type: SceneEventType,
    /// Compilation pass counter at the time the event was raised
    pub pass: u64,
    args: HashMap<&'static str, EventArg>,
}

impl Event {
    /// Create a new event with the given type and pass number
    pub fn new(event_type: SceneEventType, pass: u64) -> Self {
        Self {
            event_type,
            pass,
            args: HashMap::new(),
        }
    }

    /// Add an argument to the event (builder pattern)
    #[must_use]
    pub fn with_arg(mut self, key: &'static str, value: EventArg) -> Self {
        self.args.insert(key, value);
        self
    }

    /// Get an argument by key
    pub fn get_arg(&self, key: &str) -> Option<&EventArg> {
        self.args.get(key)
    }

    /// Get node argument if present
    pub fn get_node(&self) -> Option<NodeId> {
        if let Some(EventArg::Node(id)) = self.get_arg("node") {
            Some(*id)
        } else {
            None
        }
    }

    /// Get node type argument if present
    pub fn get_node_type(&self) -> Option<&'static str> {
        if let Some(EventArg::NodeType(name)) = self.get_arg("node_type") {
            Some(name)
        } else {
            None
        }
    }

    /// Get object count argument if present
    pub fn get_object_count(&self) -> Option<usize> {
        if let Some(EventArg::ObjectCount(count)) = self.get_arg("objects") {
            Some(*count)
        } else {
            None
        }
    }

    /// Get node count argument if present
    pub fn get_node_count(&self) -> Option<usize> {
        if let Some(EventArg::NodeCount(count)) = self.get_arg("nodes") {
            Some(*count)
        } else {
            None
        }
    }
}

/// Event handler trait
/// Returns true if event was consumed (stops forwarding)
/// Returns false to allow forwarding to other handlers
pub trait EventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &Event) -> bool;
}

/// Event system with registration and queuing
/// Follows chain of responsibility pattern
#[derive(Default)]
pub struct EventSystem {
    queue: Vec<Event>,
    handlers: HashMap<SceneEventType, Vec<Box<dyn EventHandler>>>,
}

impl EventSystem {
    /// Create a new empty event system
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a specific event type
    pub fn register_handler(&mut self, event_type: SceneEventType, handler: Box<dyn EventHandler>) {
        self.handlers.entry(event_type).or_default().push(handler);
    }

    /// Queue an event for the next dispatch
    pub fn send(&mut self, event: Event) {
        self.queue.push(event);
    }

    /// Number of events waiting for dispatch
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Dispatch all pending events in the order they were sent
    pub fn dispatch(&mut self) {
        let queued = std::mem::take(&mut self.queue);
        for event in queued {
            self.dispatch_event(&event);
        }
    }

    /// Stops on first handler that returns true (consumed)
    fn dispatch_event(&mut self, event: &Event) {
        if let Some(handlers) = self.handlers.get_mut(&event.event_type) {
            for handler in handlers.iter_mut() {
                if handler.on_event(event) {
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("pending", &self.queue.len())
            .field("handler_types", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
