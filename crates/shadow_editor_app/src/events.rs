// SPDX-License-Identifier: MIT OR Apache-2.0
//! Change notifications drained by the UI layer.

use crate::scene::EntityId;
use std::collections::VecDeque;

/// A change the UI should react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// An entity was registered
    EntityRegistered(EntityId),
    /// An entity was unregistered
    EntityUnregistered(EntityId),
    /// A subtree root was attached to the scene
    ObjectAdded(EntityId),
    /// A subtree root was detached from the scene
    ObjectRemoved(EntityId),
    /// A node field changed
    ObjectChanged(EntityId),
    /// Parent/child structure changed
    SceneGraphChanged,
    /// A geometry changed or a mesh switched geometry
    GeometryChanged(EntityId),
    /// A material changed or a mesh switched material
    MaterialChanged(EntityId),
    /// A script was attached to a node
    ScriptAdded {
        /// Owning node
        object: EntityId,
        /// Script identifier
        script: EntityId,
    },
    /// A script was detached from a node
    ScriptRemoved {
        /// Owning node
        object: EntityId,
        /// Script identifier
        script: EntityId,
    },
    /// A script's name or source changed
    ScriptChanged {
        /// Owning node
        object: EntityId,
        /// Script identifier
        script: EntityId,
    },
    /// History entries or cursor changed
    HistoryChanged,
    /// The document was replaced by a load or a clear
    DocumentReplaced,
}

/// Pending events with scene-graph batching
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<EditorEvent>,
    batch_depth: u32,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event. Scene-graph changes are held back while a batch is open.
    pub fn push(&mut self, event: EditorEvent) {
        if self.batch_depth > 0 && event == EditorEvent::SceneGraphChanged {
            return;
        }
        self.events.push_back(event);
    }

    /// Open a batch
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close a batch; the outermost close emits one scene-graph change
    pub fn end_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth == 0 {
            self.events.push_back(EditorEvent::SceneGraphChanged);
        }
    }

    /// Take every queued event
    pub fn drain(&mut self) -> Vec<EditorEvent> {
        self.events.drain(..).collect()
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
