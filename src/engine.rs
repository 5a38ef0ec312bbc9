//! The engine façade: one tree, one scene, one event stream.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::{EventFilter, EventListener, EventServer};
use crate::node::NodeTree;
use crate::render_tree::RenderTree;
use crate::transaction::Transaction;

pub(crate) struct EngineState {
    pub(crate) nodes: NodeTree,
    pub(crate) render: RenderTree,
}

/// The layout engine: owns the node tree, the render tree, and the event
/// server.
///
/// Producers mutate the tree through [`transaction`](LayoutEngine::transaction),
/// which serializes them on the engine's exclusive transaction lock;
/// consumers subscribe through [`request_listener`](LayoutEngine::request_listener)
/// and observe every committed delta in order, on their own threads.
/// Dropping the engine closes the event server, which wakes and fails any
/// blocked listener.
pub struct LayoutEngine {
    state: Mutex<EngineState>,
    events: Arc<EventServer>,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutEngine {
    /// Builds an engine with an empty tree.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EngineState { nodes: NodeTree::new(), render: RenderTree::new() }),
            events: EventServer::new(),
        }
    }

    /// Opens a transaction, blocking until any other producer's transaction
    /// finishes.
    pub fn transaction(&self) -> Transaction<'_> {
        Transaction::begin(self.state.lock(), Arc::downgrade(&self.events))
    }

    /// Registers a listener over the engine's event stream.
    pub fn request_listener(&self, filter: EventFilter) -> EventListener {
        self.events.request_listener(filter)
    }
}

impl Drop for LayoutEngine {
    fn drop(&mut self) {
        self.events.close();
    }
}

impl fmt::Display for LayoutEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayoutEngine(): {}", self.state.lock().nodes)
    }
}
