//! Elements: the behavior attached to each node of the tree.
//!
//! An element owns a set of features (its attributes) and a render
//! procedure. During the render walk each element first publishes its
//! non-defaulted attribute values into the ancestor scope; later, after its
//! children have rendered, it positions and manipulates the children's
//! geometries and writes its own geometry into the render tree. Elements
//! that emit no geometry of their own get an empty union-of-children
//! geometry synthesized by the node walk, so parents always see bounds.

mod layout;
mod mesh;
mod solid;

use std::any::Any;

pub use layout::{
    GridElement, HideShowElement, JuxtaposeElement, NoLayoutElement, PaddingElement,
    RotateElement, ScaleElement, StreetElement,
};
pub use mesh::{CylinderElement, ImportElement, SphereElement};
pub use solid::{BoxElement, PlaneElement};

use crate::error::Result;
use crate::feature::{
    AttributeMap, ColorFeature, HideShowFeature, OpticsFeature, TextFeature,
};
use crate::geometry::{Face, Geometry};
use crate::coords::Point;
use crate::path::Path;
use crate::render_tree::RenderTree;
use crate::value::AncestorValues;

/// Behavior attached to a node: named, cloneable attribute state plus a
/// render procedure.
pub trait Element: Send {
    /// The element's name; doubles as the node name in paths.
    fn name(&self) -> &str;

    /// Renames the element. Used when templates are materialized.
    fn set_name(&mut self, name: String);

    /// Clones the element behind a fresh box.
    fn clone_box(&self) -> Box<dyn Element>;

    /// Updates the element's attribute state from a string map.
    fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()>;

    /// The element's attribute state in string form.
    fn attributes(&self) -> AttributeMap {
        AttributeMap::new()
    }

    /// Evaluates relative attribute values against `scope` and publishes the
    /// non-defaulted ones for descendants to reference.
    fn update_ancestor_values(&mut self, _scope: &mut AncestorValues) -> Result<()> {
        Ok(())
    }

    /// Positions and manipulates children geometries and, for mesh-bearing
    /// elements, writes this element's own geometry at `path`.
    fn render(&self, _path: &Path, _render_tree: &mut RenderTree) -> Result<()> {
        Ok(())
    }

    /// Typed access to the concrete element.
    fn as_any(&self) -> &dyn Any;

    /// Typed mutable access to the concrete element.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn Element> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Implements the name/clone/any boilerplate shared by every element type.
macro_rules! impl_element_common {
    () => {
        fn name(&self) -> &str {
            &self.name
        }

        fn set_name(&mut self, name: String) {
            self.name = name;
        }

        fn clone_box(&self) -> Box<dyn Element> {
            Box::new(self.clone())
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    };
}
pub(crate) use impl_element_common;

/// A placeholder element with no attributes and no geometry; the root node
/// carries one.
#[derive(Debug, Clone, Default)]
pub struct NopElement {
    name: String,
}

impl NopElement {
    /// Builds a nop element with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Element for NopElement {
    impl_element_common!();

    fn update_from_attributes(&mut self, _attributes: &AttributeMap) -> Result<()> {
        Ok(())
    }
}

/// The features every mesh-producing element carries: label, color, optics,
/// and visibility distances.
#[derive(Debug, Clone, Default)]
pub struct MeshFeatures {
    /// Label text.
    pub text: TextFeature,
    /// Base color and darkness.
    pub color: ColorFeature,
    /// Opacity.
    pub optics: OpticsFeature,
    /// Camera-distance visibility.
    pub hide_show: HideShowFeature,
}

impl MeshFeatures {
    /// Parses all four features from the attribute map.
    pub fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.text.update_from_attributes(attributes)?;
        self.color.update_from_attributes(attributes)?;
        self.optics.update_from_attributes(attributes)?;
        self.hide_show.update_from_attributes(attributes)
    }

    /// The combined string form of the four features.
    pub fn attributes(&self) -> AttributeMap {
        let mut attributes = self.text.attributes();
        attributes.extend(self.color.attributes());
        attributes.extend(self.optics.attributes());
        attributes.extend(self.hide_show.attributes());
        attributes
    }

    /// Publishes all four features.
    pub fn compute_and_update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.text.compute_and_update_ancestor_values(scope)?;
        self.color.compute_and_update_ancestor_values(scope)?;
        self.optics.compute_and_update_ancestor_values(scope)?;
        self.hide_show.compute_and_update_ancestor_values(scope)
    }

    /// Builds a geometry carrying this feature set's color, distances, and
    /// text.
    pub fn construct_geometry(
        &self,
        vertexes: Vec<Point>,
        faces: Vec<Face>,
        pos: Point,
    ) -> Geometry {
        Geometry::new(
            vertexes,
            faces,
            pos,
            self.color.compute_color(self.optics.opacity()),
            self.hide_show.hide_distance(),
            self.hide_show.show_distance(),
            self.text.text(),
        )
    }
}
