//! The cuboid-based elements: box and plane.

use crate::coords::Point;
use crate::element::{Element, MeshFeatures, impl_element_common};
use crate::error::Result;
use crate::feature::{AttributeMap, PaddingFeature, SizeFeature};
use crate::geometry::{Face, Geometry};
use crate::path::Path;
use crate::render_tree::RenderTree;
use crate::value::AncestorValues;

/// Builds the unit-orientation cuboid mesh for the given extents.
///
/// The triangle indices are hardcoded against the fixed vertex order below;
/// the winding of each pair matters to the viewers and must not be
/// reordered.
fn box_geometry(
    mesh: &MeshFeatures,
    width: f32,
    height: f32,
    depth: f32,
    pos: Point,
) -> Geometry {
    let vertexes = vec![
        Point::new(0.0, 0.0, 0.0),
        Point::new(0.0, height, 0.0),
        Point::new(width, 0.0, 0.0),
        Point::new(width, height, 0.0),
        Point::new(0.0, 0.0, depth),
        Point::new(0.0, height, depth),
        Point::new(width, 0.0, depth),
        Point::new(width, height, depth),
    ];
    let triangles: Vec<Face> = vec![
        [1, 2, 0], // Bottom
        [1, 3, 2],
        [0, 4, 1], // Left side
        [4, 5, 1],
        [4, 6, 5], // Top
        [6, 7, 5],
        [3, 6, 2], // Right side
        [3, 7, 6],
        [2, 4, 0], // Front
        [2, 6, 4],
        [1, 5, 3], // Back
        [5, 7, 3],
    ];
    mesh.construct_geometry(vertexes, triangles, pos)
}

/// A cuboid of (width, height, depth) with the shared mesh features.
#[derive(Debug, Clone)]
pub struct BoxElement {
    name: String,
    size: SizeFeature,
    mesh: MeshFeatures,
}

impl BoxElement {
    /// Builds a box element from an attribute map.
    pub fn new(name: impl Into<String>, attributes: &AttributeMap) -> Result<Self> {
        let mut element =
            Self { name: name.into(), size: SizeFeature::default(), mesh: MeshFeatures::default() };
        Element::update_from_attributes(&mut element, attributes)?;
        Ok(element)
    }

    /// The size feature.
    pub fn size(&self) -> &SizeFeature {
        &self.size
    }

    /// Mutable access to the size feature.
    pub fn size_mut(&mut self) -> &mut SizeFeature {
        &mut self.size
    }

    /// The shared mesh features.
    pub fn mesh_features(&self) -> &MeshFeatures {
        &self.mesh
    }

    /// Mutable access to the shared mesh features.
    pub fn mesh_features_mut(&mut self) -> &mut MeshFeatures {
        &mut self.mesh
    }
}

impl Element for BoxElement {
    impl_element_common!();

    fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.size.update_from_attributes(attributes)?;
        self.mesh.update_from_attributes(attributes)
    }

    fn attributes(&self) -> AttributeMap {
        let mut attributes = self.size.attributes();
        attributes.extend(self.mesh.attributes());
        attributes
    }

    fn update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.size.compute_and_update_ancestor_values(scope)?;
        self.mesh.compute_and_update_ancestor_values(scope)
    }

    fn render(&self, path: &Path, render_tree: &mut RenderTree) -> Result<()> {
        let (width, height, depth) = self.size.lengths();
        let geometry = box_geometry(&self.mesh, width, height, depth, Point::ZERO);
        render_tree.update(path.clone(), geometry);
        Ok(())
    }
}

/// A box that grows its footprint around its descendants and raises them on
/// top of itself, padded on all four sides.
#[derive(Debug, Clone)]
pub struct PlaneElement {
    name: String,
    size: SizeFeature,
    padding: PaddingFeature,
    mesh: MeshFeatures,
}

impl PlaneElement {
    /// Builds a plane element from an attribute map.
    pub fn new(name: impl Into<String>, attributes: &AttributeMap) -> Result<Self> {
        let mut element = Self {
            name: name.into(),
            size: SizeFeature::default(),
            padding: PaddingFeature::default(),
            mesh: MeshFeatures::default(),
        };
        Element::update_from_attributes(&mut element, attributes)?;
        Ok(element)
    }

    /// The size feature.
    pub fn size(&self) -> &SizeFeature {
        &self.size
    }

    /// Mutable access to the size feature.
    pub fn size_mut(&mut self) -> &mut SizeFeature {
        &mut self.size
    }

    /// The padding feature.
    pub fn padding(&self) -> &PaddingFeature {
        &self.padding
    }

    /// Mutable access to the padding feature.
    pub fn padding_mut(&mut self) -> &mut PaddingFeature {
        &mut self.padding
    }

    /// The shared mesh features.
    pub fn mesh_features(&self) -> &MeshFeatures {
        &self.mesh
    }

    /// Mutable access to the shared mesh features.
    pub fn mesh_features_mut(&mut self) -> &mut MeshFeatures {
        &mut self.mesh
    }
}

impl Element for PlaneElement {
    impl_element_common!();

    fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.size.update_from_attributes(attributes)?;
        self.padding.update_from_attributes(attributes)?;
        self.mesh.update_from_attributes(attributes)
    }

    fn attributes(&self) -> AttributeMap {
        let mut attributes = self.size.attributes();
        attributes.extend(self.padding.attributes());
        attributes.extend(self.mesh.attributes());
        attributes
    }

    fn update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.size.compute_and_update_ancestor_values(scope)?;
        self.padding.compute_and_update_ancestor_values(scope)?;
        self.mesh.compute_and_update_ancestor_values(scope)
    }

    fn render(&self, path: &Path, render_tree: &mut RenderTree) -> Result<()> {
        let mut bounds = crate::bounds::Bounds::default();
        for (_, geometry) in render_tree.children_of(path) {
            bounds += geometry.positioned_bounds();
        }
        let (descendant_width, _, descendant_depth) = bounds.lengths();

        let our_padding = self.padding.padding();
        let our_width = self.size.width().max(descendant_width) + our_padding * 2.0;
        let our_depth = self.size.depth().max(descendant_depth) + our_padding * 2.0;
        let geometry =
            box_geometry(&self.mesh, our_width, self.size.height(), our_depth, Point::ZERO);
        render_tree.update(path.clone(), geometry);

        let offset = Point::new(our_padding, self.size.height(), our_padding);
        render_tree.move_descendants_by(path, offset);
        Ok(())
    }
}
