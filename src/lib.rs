//! trellis is a reactive 3D layout engine.
//!
//! A hierarchical tree of declarative *elements* (boxes, planes, spheres,
//! cylinders, imported meshes, and layout combinators such as juxtapose,
//! grid, padding, scale, rotate, and street) is re-rendered into a
//! path-keyed scene (the *render tree*) whenever it is mutated. The
//! structural diff between successive scenes becomes a stream of typed
//! delta events (add / remove / move / resize / recolor / retext) that thin
//! viewers consume to update an already-drawn scene incrementally.
//!
//! # Producing
//!
//! Mutation happens inside a [`Transaction`], which holds the engine's
//! exclusive transaction lock:
//!
//! ```
//! use trellis::{AttributeMap, BoxElement, JuxtaposeElement, LayoutEngine};
//!
//! # fn main() -> trellis::Result<()> {
//! let engine = LayoutEngine::new();
//!
//! let mut txn = engine.transaction();
//! let root = txn.root();
//! let mut attributes = AttributeMap::new();
//! attributes.insert("axis".to_string(), "x".to_string());
//! let row = txn.construct_child(root, Box::new(JuxtaposeElement::new("row", &attributes)?))?;
//!
//! let mut attributes = AttributeMap::new();
//! attributes.insert("width".to_string(), "2".to_string());
//! attributes.insert("color".to_string(), "red5".to_string());
//! txn.construct_child(row, Box::new(BoxElement::new("b", &attributes)?))?;
//!
//! txn.render()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Consuming
//!
//! Listeners run on their own threads and observe every committed delta in
//! order:
//!
//! ```
//! use trellis::{EventFilter, LayoutEngine};
//!
//! let engine = LayoutEngine::new();
//! let listener = engine.request_listener(EventFilter::SkipNonDrawable);
//! // ... elsewhere: engine.transaction() + render() ...
//! while let Ok(Some(event)) = listener.poll() {
//!     println!("{} changed: {:?}", event.path, event.kind);
//! }
//! ```
//!
//! # Sizing and relative values
//!
//! Element attributes are string key/value pairs. Numeric attributes may be
//! *relative*: `width="50%"` is half the nearest ancestor's width,
//! `width="2h"` is twice this element's own height, `width="eq%"` is an
//! equal share among siblings. Dependencies between relative values are
//! resolved in topological order, and cycles are reported as errors.

#![deny(missing_docs, clippy::unwrap_used)]

mod bounds;
mod color;
mod coords;
mod element;
mod engine;
mod error;
mod event;
mod feature;
mod geometry;
mod mesh;
mod node;
mod path;
mod render_tree;
mod rotation;
mod transaction;
mod value;


pub use crate::{
    bounds::Bounds,
    color::{DEFAULT_COLOR, Rgba, WHITE},
    coords::{Alignment, Axis, Point, UnitInterval},
    element::{
        BoxElement, CylinderElement, Element, GridElement, HideShowElement, ImportElement,
        JuxtaposeElement, MeshFeatures, NoLayoutElement, NopElement, PaddingElement,
        PlaneElement, RotateElement, ScaleElement, SphereElement, StreetElement,
    },
    engine::LayoutEngine,
    error::{Error, Result},
    event::{Event, EventFilter, EventKind, EventListener, EventServer, ListenerToken},
    feature::{
        AlignFeature, AttributeMap, AxisFeature, CircularFeature, ColorFeature, HideShowFeature,
        JuxtaposeFeatureSet, OpticsFeature, PaddingFeature, RotateFeature, ScaleFeatureSet,
        SizeFeature, SpacingFeature, TextFeature,
    },
    geometry::{Face, Geometry},
    mesh::{MeshData, MeshProvider, ProceduralMeshProvider, SharedMeshProvider},
    node::{NodeId, NodeTree},
    path::{Path, is_valid_path_part},
    render_tree::{RenderDiff, RenderTree},
    rotation::Rotation,
    transaction::Transaction,
    value::{
        AncestorValues, AxisValue, AlignmentValue, BoolValue, ColorValue, FloatValue, IntValue,
        RelativeFloatValue, RotationValue, ScopePayload, ScopeValue, StringValue, TypedValue,
        UnitIntervalValue, topological_sort_with_aliases,
    },
};
