//! Mesh-provider-backed elements: sphere, cylinder, and external import.

use crate::coords::Point;
use crate::element::{Element, MeshFeatures, impl_element_common};
use crate::error::{Error, Result};
use crate::feature::{AttributeMap, CircularFeature, ScaleFeatureSet, SizeFeature};
use crate::geometry::Face;
use crate::mesh::{MeshData, SharedMeshProvider, to_engine_vertices, triangulate};
use crate::path::Path;
use crate::render_tree::RenderTree;
use crate::value::AncestorValues;

fn import_mesh(mesh: &MeshData, fixup_offset: Point) -> (Vec<Point>, Vec<Face>) {
    let mut vertexes = to_engine_vertices(&mesh.vertices);
    for vertex in &mut vertexes {
        *vertex += fixup_offset;
    }
    (vertexes, triangulate(&mesh.faces))
}

/// A UV sphere tessellated by the mesh provider, shifted so its footprint
/// starts at the origin.
#[derive(Clone)]
pub struct SphereElement {
    name: String,
    circular: CircularFeature,
    mesh: MeshFeatures,
    provider: SharedMeshProvider,
}

impl SphereElement {
    /// Builds a sphere element from an attribute map and a mesh provider.
    pub fn with_provider(
        name: impl Into<String>,
        attributes: &AttributeMap,
        provider: SharedMeshProvider,
    ) -> Result<Self> {
        let mut element = Self {
            name: name.into(),
            circular: CircularFeature::default(),
            mesh: MeshFeatures::default(),
            provider,
        };
        Element::update_from_attributes(&mut element, attributes)?;
        Ok(element)
    }

    /// Builds a sphere element backed by the built-in procedural provider.
    pub fn new(name: impl Into<String>, attributes: &AttributeMap) -> Result<Self> {
        Self::with_provider(name, attributes, crate::mesh::ProceduralMeshProvider::shared())
    }

    /// The circular feature.
    pub fn circular(&self) -> &CircularFeature {
        &self.circular
    }

    /// Mutable access to the circular feature.
    pub fn circular_mut(&mut self) -> &mut CircularFeature {
        &mut self.circular
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

impl Element for SphereElement {
    impl_element_common!();

    fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.circular.update_from_attributes(attributes)?;
        self.mesh.update_from_attributes(attributes)
    }

    fn attributes(&self) -> AttributeMap {
        let mut attributes = self.circular.attributes();
        attributes.extend(self.mesh.attributes());
        attributes
    }

    fn update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.circular.compute_and_update_ancestor_values(scope)?;
        self.mesh.compute_and_update_ancestor_values(scope)
    }

    fn render(&self, path: &Path, render_tree: &mut RenderTree) -> Result<()> {
        let radius = self.circular.radius();
        let n_slices = self.circular.num_circular_slices();
        let sphere = self.provider.uv_sphere(radius, n_slices, n_slices);

        let (vertexes, faces) = import_mesh(&sphere, Point::new(radius, 0.0, radius));
        let geometry = self.mesh.construct_geometry(vertexes, faces, Point::ZERO);
        render_tree.update(path.clone(), geometry);
        Ok(())
    }
}

/// A cylinder standing on the ground plane, tessellated by the mesh
/// provider.
#[derive(Clone)]
pub struct CylinderElement {
    name: String,
    circular: CircularFeature,
    size: SizeFeature,
    mesh: MeshFeatures,
    provider: SharedMeshProvider,
}

impl CylinderElement {
    /// Builds a cylinder element from an attribute map and a mesh provider.
    pub fn with_provider(
        name: impl Into<String>,
        attributes: &AttributeMap,
        provider: SharedMeshProvider,
    ) -> Result<Self> {
        let mut element = Self {
            name: name.into(),
            circular: CircularFeature::default(),
            size: SizeFeature::default(),
            mesh: MeshFeatures::default(),
            provider,
        };
        Element::update_from_attributes(&mut element, attributes)?;
        Ok(element)
    }

    /// Builds a cylinder element backed by the built-in procedural provider.
    pub fn new(name: impl Into<String>, attributes: &AttributeMap) -> Result<Self> {
        Self::with_provider(name, attributes, crate::mesh::ProceduralMeshProvider::shared())
    }

    /// The circular feature.
    pub fn circular(&self) -> &CircularFeature {
        &self.circular
    }

    /// Mutable access to the circular feature.
    pub fn circular_mut(&mut self) -> &mut CircularFeature {
        &mut self.circular
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

impl Element for CylinderElement {
    impl_element_common!();

    fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.circular.update_from_attributes(attributes)?;
        self.size.update_from_attributes(attributes)?;
        self.mesh.update_from_attributes(attributes)
    }

    fn attributes(&self) -> AttributeMap {
        let mut attributes = self.circular.attributes();
        attributes.extend(self.size.attributes());
        attributes.extend(self.mesh.attributes());
        attributes
    }

    fn update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.circular.compute_and_update_ancestor_values(scope)?;
        self.size.compute_and_update_ancestor_values(scope)?;
        self.mesh.compute_and_update_ancestor_values(scope)
    }

    fn render(&self, path: &Path, render_tree: &mut RenderTree) -> Result<()> {
        let radius = self.circular.radius();
        let n_slices = self.circular.num_circular_slices();
        let cylinder = self.provider.cylinder(n_slices, radius, self.size.height());

        let (vertexes, faces) = import_mesh(&cylinder, Point::new(radius, 0.0, radius));
        let geometry = self.mesh.construct_geometry(vertexes, faces, Point::ZERO);
        render_tree.update(path.clone(), geometry);
        Ok(())
    }
}

/// A mesh loaded through the provider's `read`, re-based so its bounds start
/// at the origin and scaled toward any declared target lengths.
#[derive(Clone)]
pub struct ImportElement {
    name: String,
    scale: ScaleFeatureSet,
    mesh: MeshFeatures,
    provider: SharedMeshProvider,
    filepath: String,
}

impl ImportElement {
    /// Builds an import element. The attribute map must carry a `path` to
    /// hand to the provider.
    pub fn new(
        name: impl Into<String>,
        attributes: &AttributeMap,
        provider: SharedMeshProvider,
    ) -> Result<Self> {
        let filepath = attributes.get("path").cloned().ok_or_else(|| Error::InvalidAttribute {
            name: "path".to_string(),
            value: String::new(),
        })?;
        let mut element = Self {
            name: name.into(),
            scale: ScaleFeatureSet::default(),
            mesh: MeshFeatures::default(),
            provider,
            filepath,
        };
        Element::update_from_attributes(&mut element, attributes)?;
        Ok(element)
    }

    /// The provider path the mesh is read from.
    pub fn filepath(&self) -> &str {
        &self.filepath
    }

    /// The scale feature set.
    pub fn scale(&self) -> &ScaleFeatureSet {
        &self.scale
    }

    /// Mutable access to the scale feature set.
    pub fn scale_mut(&mut self) -> &mut ScaleFeatureSet {
        &mut self.scale
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

impl Element for ImportElement {
    impl_element_common!();

    fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.scale.update_from_attributes(attributes)?;
        self.mesh.update_from_attributes(attributes)
    }

    fn attributes(&self) -> AttributeMap {
        let mut attributes = self.scale.attributes();
        attributes.extend(self.mesh.attributes());
        attributes.insert("path".to_string(), self.filepath.clone());
        attributes
    }

    fn update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.scale.compute_and_update_ancestor_values(scope)?;
        self.mesh.compute_and_update_ancestor_values(scope)
    }

    fn render(&self, path: &Path, render_tree: &mut RenderTree) -> Result<()> {
        let mesh = self.provider.read(&self.filepath)?;

        // Re-base so the mesh's lowest corner sits at the origin.
        let (vertexes, faces) = import_mesh(&mesh, Point::ZERO);
        let mut geometry = self.mesh.construct_geometry(vertexes, faces, Point::ZERO);
        let base = geometry.bounds().base();
        let (rebased, faces) = (
            geometry.vertexes().iter().map(|vertex| *vertex - base).collect(),
            geometry.triangles().to_vec(),
        );
        geometry = self.mesh.construct_geometry(rebased, faces, Point::ZERO);

        let (width, height, depth) = geometry.bounds().lengths();
        geometry.scale_by(self.scale.compute_scale_factor(width, height, depth));

        render_tree.update(path.clone(), geometry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshProvider;
    use std::sync::Arc;

    fn attrs(pairs: &[(&str, &str)]) -> AttributeMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn path(s: &str) -> Path {
        s.parse().unwrap_or_else(|err| panic!("'{s}' should parse: {err}"))
    }

    /// Serves one fixed triangle mesh for every request.
    struct FixedProvider;

    impl MeshProvider for FixedProvider {
        fn uv_sphere(&self, _radius: f32, _slices: usize, _stacks: usize) -> MeshData {
            MeshData::default()
        }

        fn cylinder(&self, _slices: usize, _radius: f32, _height: f32) -> MeshData {
            MeshData::default()
        }

        fn read(&self, _path: &str) -> crate::error::Result<MeshData> {
            Ok(MeshData {
                vertices: vec![
                    Point::new(1.0, 1.0, 1.0),
                    Point::new(3.0, 1.0, 1.0),
                    Point::new(3.0, 3.0, 5.0),
                ],
                faces: vec![vec![0, 1, 2]],
            })
        }
    }

    #[test]
    fn sphere_footprint_starts_at_the_origin() {
        let element = SphereElement::new("s", &attrs(&[("radius", "2")]))
            .unwrap_or_else(|err| panic!("{err}"));
        let mut tree = RenderTree::new();
        element.render(&path(".s"), &mut tree).unwrap_or_else(|err| panic!("{err}"));

        let geometry = tree.get(&path(".s")).unwrap_or_else(|| panic!("missing"));
        assert!(geometry.should_draw());
        let bounds = geometry.bounds();
        // The tessellation hits the exact extremes on x, and comes within a
        // slice of them on z.
        assert!(bounds.base().x.abs() < 1e-3);
        assert!(bounds.base().z.abs() < 0.2);
        assert!((bounds.width() - 4.0).abs() < 1e-2);
        assert!((bounds.depth() - 4.0).abs() < 0.5);
    }

    #[test]
    fn cylinder_stands_up_to_its_height() {
        let element = CylinderElement::new("c", &attrs(&[("radius", "1"), ("height", "5")]))
            .unwrap_or_else(|err| panic!("{err}"));
        let mut tree = RenderTree::new();
        element.render(&path(".c"), &mut tree).unwrap_or_else(|err| panic!("{err}"));

        let geometry = tree.get(&path(".c")).unwrap_or_else(|| panic!("missing"));
        let bounds = geometry.bounds();
        assert!((bounds.height() - 5.0).abs() < 1e-3);
        assert!(bounds.base().y.abs() < 1e-3);
        assert!(bounds.base().x.abs() < 1e-3);
        assert!(bounds.base().z.abs() < 0.1);
    }

    #[test]
    fn import_rebases_and_scales_the_mesh() {
        let element = ImportElement::new(
            "m",
            &attrs(&[("path", "model.obj"), ("width", "4")]),
            Arc::new(FixedProvider),
        )
        .unwrap_or_else(|err| panic!("{err}"));
        let mut tree = RenderTree::new();
        element.render(&path(".m"), &mut tree).unwrap_or_else(|err| panic!("{err}"));

        let geometry = tree.get(&path(".m")).unwrap_or_else(|| panic!("missing"));
        // Provider extents were (2, 4, 2) after the axis swap; width 4 is
        // the binding target, so everything doubles.
        assert_eq!(geometry.bounds().base(), Point::ZERO);
        assert_eq!(geometry.bounds().end(), Point::new(4.0, 8.0, 4.0));
    }

    #[test]
    fn import_requires_a_path_attribute() {
        assert!(matches!(
            ImportElement::new("m", &AttributeMap::new(), Arc::new(FixedProvider)),
            Err(Error::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn import_propagates_provider_failures() {
        let element =
            ImportElement::new("m", &attrs(&[("path", "model.obj")]), crate::mesh::ProceduralMeshProvider::shared())
                .unwrap_or_else(|err| panic!("{err}"));
        let mut tree = RenderTree::new();
        assert!(matches!(
            element.render(&path(".m"), &mut tree),
            Err(Error::MeshImport { .. })
        ));
    }
}
