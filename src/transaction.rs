//! Transactions: scoped exclusive mutation of the tree plus re-render and
//! delta emission.

use std::sync::Weak;
use std::time::Instant;

use log::debug;
use parking_lot::MutexGuard;

use crate::element::Element;
use crate::engine::EngineState;
use crate::error::Result;
use crate::event::{Event, EventKind, EventServer};
use crate::feature::AttributeMap;
use crate::node::NodeId;
use crate::path::Path;
use crate::render_tree::{RenderDiff, RenderTree};

/// A scoped, exclusive mutator of the engine's tree.
///
/// Opening a transaction takes the engine's transaction lock for the
/// guard's whole lifetime, snapshots the render tree, and clears it (the
/// scene is fully reconstructed on render). All tree and element mutation
/// goes through the guard; [`render`](Transaction::render) then replays the
/// render pipeline from the root, diffs the new scene against the snapshot,
/// and appends one event per difference. Dropping the guard releases the
/// lock.
///
/// A thread must finish its transaction before opening another; opening a
/// second one while the first guard lives deadlocks on the engine lock.
pub struct Transaction<'engine> {
    state: MutexGuard<'engine, EngineState>,
    previous: RenderTree,
    events: Weak<EventServer>,
}

impl<'engine> Transaction<'engine> {
    pub(crate) fn begin(
        mut state: MutexGuard<'engine, EngineState>,
        events: Weak<EventServer>,
    ) -> Self {
        let previous = state.render.clone();
        state.render.clear();
        Self { state, previous, events }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.state.nodes.root()
    }

    /// Appends a new child under `parent`; the element's name becomes the
    /// child name.
    pub fn construct_child(
        &mut self,
        parent: NodeId,
        element: Box<dyn Element>,
    ) -> Result<NodeId> {
        self.state.nodes.construct_child(parent, element)
    }

    /// Declares a template on `parent`.
    pub fn construct_template(&mut self, parent: NodeId, element: Box<dyn Element>) -> NodeId {
        self.state.nodes.construct_template(parent, element)
    }

    /// Clones the named template into a new child called `new_name`.
    pub fn make_template(
        &mut self,
        parent: NodeId,
        template_name: &str,
        new_name: &str,
    ) -> Result<NodeId> {
        self.state.nodes.try_make_template(parent, template_name, new_name)
    }

    /// The existing child with `new_name`, or a fresh one cloned from the
    /// named template.
    pub fn get_child_or_make_template(
        &mut self,
        parent: NodeId,
        template_name: &str,
        new_name: &str,
    ) -> Result<NodeId> {
        self.state.nodes.try_get_child_or_make_template(parent, template_name, new_name)
    }

    /// Removes the named child and its subtree; absent names are a no-op.
    pub fn remove_child(&mut self, parent: NodeId, with_name: &str) {
        self.state.nodes.remove_child(parent, with_name);
    }

    /// Resolves a path from the root.
    pub fn find_descendant(&self, path: &Path) -> Option<NodeId> {
        self.state.nodes.find_descendant(self.state.nodes.root(), path)
    }

    /// The node's path.
    pub fn node_path(&self, id: NodeId) -> Path {
        self.state.nodes.path_of(id)
    }

    /// The node's element.
    pub fn element(&self, id: NodeId) -> &dyn Element {
        self.state.nodes.element(id)
    }

    /// Mutable access to the node's element, e.g. to change attributes
    /// before the render.
    pub fn element_mut(&mut self, id: NodeId) -> &mut dyn Element {
        self.state.nodes.element_mut(id)
    }

    /// Replaces the node's element.
    pub fn set_element(&mut self, id: NodeId, element: Box<dyn Element>) {
        self.state.nodes.set_element(id, element);
    }

    /// Updates the node's element attributes from a string map.
    pub fn update_attributes(&mut self, id: NodeId, attributes: &AttributeMap) -> Result<()> {
        self.state.nodes.element_mut(id).update_from_attributes(attributes)
    }

    /// The render tree as of the last render inside this transaction.
    pub fn render_tree(&self) -> &RenderTree {
        &self.state.render
    }

    /// Re-renders the scene from the root and emits one event per
    /// difference against the snapshot taken when the transaction began.
    ///
    /// Returns `Ok(false)` when the event server is gone: the scene was
    /// still rendered, but nobody can observe the deltas and the
    /// transaction should be considered lost. Render failures (attribute
    /// cycles, missing ancestor values) leave the render tree partial.
    pub fn render(&mut self) -> Result<bool> {
        let render_timer = Instant::now();
        {
            let EngineState { nodes, render } = &mut *self.state;
            nodes.render_from_root(render)?;
        }
        debug!(
            "rendered {} geometries in {:?}",
            self.state.render.len(),
            render_timer.elapsed()
        );

        let Some(server) = self.events.upgrade() else {
            debug!("event server is gone; transaction deltas are unobservable");
            return Ok(false);
        };

        let differences = self.state.render.differences_from(&self.previous);
        debug!("emitting {} events", differences.len());
        for (path, difference) in differences {
            let (kind, geometry) = match difference {
                RenderDiff::FirstMissing => (EventKind::Remove, self.previous.get(&path)),
                RenderDiff::SecondMissing => (EventKind::Add, self.state.render.get(&path)),
                RenderDiff::Pos => (EventKind::Move, self.state.render.get(&path)),
                RenderDiff::Bounds => (EventKind::Resize, self.state.render.get(&path)),
                RenderDiff::Color => (EventKind::Recolor, self.state.render.get(&path)),
                RenderDiff::Text => (EventKind::Retext, self.state.render.get(&path)),
            };
            let Some(geometry) = geometry else {
                continue;
            };
            server.append(Event { path, geometry: geometry.clone(), kind });
        }
        Ok(true)
    }
}
