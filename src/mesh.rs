//! The mesh provider boundary: external meshes and procedural primitives.
//!
//! Providers hand back vertices plus faces of arbitrary arity in the
//! mathematical z-up convention; the engine fans any face with more than
//! three corners into triangles and swaps the y and z axes on import to
//! match its own y-up convention.

use std::fmt;
use std::sync::Arc;

use crate::coords::Point;
use crate::error::{Error, Result};
use crate::geometry::Face;

/// A mesh as produced by a provider: not yet triangulated, not yet in
/// engine coordinates.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Vertex positions in the provider's z-up convention.
    pub vertices: Vec<Point>,
    /// Faces as corner-index lists; any arity of three or more is allowed.
    pub faces: Vec<Vec<u32>>,
}

/// A source of meshes for the sphere, cylinder, and import elements.
pub trait MeshProvider: Send + Sync {
    /// A UV sphere centered at the origin.
    fn uv_sphere(&self, radius: f32, slices: usize, stacks: usize) -> MeshData;

    /// A closed cylinder with its base circle at the origin plane.
    fn cylinder(&self, slices: usize, radius: f32, height: f32) -> MeshData;

    /// Loads a mesh from an external source.
    fn read(&self, path: &str) -> Result<MeshData>;
}

/// A shareable mesh provider handle.
pub type SharedMeshProvider = Arc<dyn MeshProvider>;

/// Triangulates a provider mesh by fanning every larger face from its first
/// corner in circular order, which keeps the fan free of overlapping faces.
pub fn triangulate(faces: &[Vec<u32>]) -> Vec<Face> {
    let mut triangles = Vec::new();
    for face in faces {
        if face.len() < 3 {
            continue;
        }
        for i in 1..face.len() - 1 {
            triangles.push([face[0], face[i], face[i + 1]]);
        }
    }
    triangles
}

/// Converts provider vertices into engine coordinates by swapping the y and
/// z axes.
pub fn to_engine_vertices(vertices: &[Point]) -> Vec<Point> {
    vertices.iter().map(|pt| Point::new(pt.x, pt.z, pt.y)).collect()
}

/// The built-in procedural provider: spheres and cylinders generated in
/// memory. It has no file meshes; [`MeshProvider::read`] always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProceduralMeshProvider;

impl ProceduralMeshProvider {
    /// A shareable handle to the procedural provider.
    pub fn shared() -> SharedMeshProvider {
        Arc::new(ProceduralMeshProvider)
    }
}

impl fmt::Display for ProceduralMeshProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("procedural mesh provider")
    }
}

impl MeshProvider for ProceduralMeshProvider {
    fn uv_sphere(&self, radius: f32, slices: usize, stacks: usize) -> MeshData {
        let slices = slices.max(3);
        let stacks = stacks.max(2);

        let mut vertices = Vec::with_capacity(2 + (stacks - 1) * slices);
        vertices.push(Point::new(0.0, 0.0, radius));
        for stack in 1..stacks {
            let theta = std::f32::consts::PI * stack as f32 / stacks as f32;
            let ring_z = radius * theta.cos();
            let ring_radius = radius * theta.sin();
            for slice in 0..slices {
                let phi = std::f32::consts::TAU * slice as f32 / slices as f32;
                vertices.push(Point::new(
                    ring_radius * phi.cos(),
                    ring_radius * phi.sin(),
                    ring_z,
                ));
            }
        }
        let bottom_pole = vertices.len() as u32;
        vertices.push(Point::new(0.0, 0.0, -radius));

        let ring_start = |stack: usize| 1 + (stack - 1) * slices;
        let mut faces = Vec::new();
        // Triangle fans at the poles, quads between the rings.
        for slice in 0..slices {
            let next = (slice + 1) % slices;
            faces.push(vec![
                0,
                (ring_start(1) + slice) as u32,
                (ring_start(1) + next) as u32,
            ]);
        }
        for stack in 1..stacks - 1 {
            let upper = ring_start(stack);
            let lower = ring_start(stack + 1);
            for slice in 0..slices {
                let next = (slice + 1) % slices;
                faces.push(vec![
                    (upper + slice) as u32,
                    (upper + next) as u32,
                    (lower + next) as u32,
                    (lower + slice) as u32,
                ]);
            }
        }
        for slice in 0..slices {
            let next = (slice + 1) % slices;
            let last = ring_start(stacks - 1);
            faces.push(vec![bottom_pole, (last + next) as u32, (last + slice) as u32]);
        }

        MeshData { vertices, faces }
    }

    fn cylinder(&self, slices: usize, radius: f32, height: f32) -> MeshData {
        let slices = slices.max(3);

        let mut vertices = Vec::with_capacity(slices * 2);
        for level in [0.0, height] {
            for slice in 0..slices {
                let phi = std::f32::consts::TAU * slice as f32 / slices as f32;
                vertices.push(Point::new(radius * phi.cos(), radius * phi.sin(), level));
            }
        }

        let mut faces = Vec::new();
        for slice in 0..slices {
            let next = (slice + 1) % slices;
            let top = slices + slice;
            let top_next = slices + next;
            faces.push(vec![slice as u32, next as u32, top_next as u32, top as u32]);
        }
        // Caps as single n-gons; the import path fans them.
        faces.push((0..slices as u32).rev().collect());
        faces.push((slices as u32..(2 * slices) as u32).collect());

        MeshData { vertices, faces }
    }

    fn read(&self, path: &str) -> Result<MeshData> {
        Err(Error::MeshImport {
            path: path.to_string(),
            reason: "the procedural provider has no file meshes".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_triangulation_splits_larger_faces() {
        let faces = vec![vec![0, 1, 2], vec![3, 4, 5, 6], vec![0, 1, 2, 3, 4]];
        let triangles = triangulate(&faces);
        assert_eq!(triangles.len(), 1 + 2 + 3);
        assert_eq!(triangles[1], [3, 4, 5]);
        assert_eq!(triangles[2], [3, 5, 6]);
        // Fans always pivot on the first corner.
        assert!(triangles[3..].iter().all(|triangle| triangle[0] == 0));
    }

    #[test]
    fn axis_conversion_swaps_y_and_z() {
        let converted = to_engine_vertices(&[Point::new(1.0, 2.0, 3.0)]);
        assert_eq!(converted, vec![Point::new(1.0, 3.0, 2.0)]);
    }

    #[test]
    fn sphere_vertices_lie_on_the_radius() {
        let mesh = ProceduralMeshProvider.uv_sphere(2.0, 10, 10);
        assert!(!mesh.faces.is_empty());
        for vertex in &mesh.vertices {
            let length = (vertex.x * vertex.x + vertex.y * vertex.y + vertex.z * vertex.z).sqrt();
            assert!((length - 2.0).abs() < 1e-4, "vertex {vertex} off the sphere");
        }
        // Poles plus quad rings.
        assert_eq!(mesh.vertices.len(), 2 + 9 * 10);
    }

    #[test]
    fn sphere_face_indices_are_in_range() {
        let mesh = ProceduralMeshProvider.uv_sphere(1.0, 6, 4);
        let vertex_count = mesh.vertices.len() as u32;
        for face in &mesh.faces {
            assert!(face.len() >= 3);
            assert!(face.iter().all(|index| *index < vertex_count));
        }
    }

    #[test]
    fn cylinder_spans_its_height_with_ngon_caps() {
        let mesh = ProceduralMeshProvider.cylinder(8, 1.0, 5.0);
        assert_eq!(mesh.vertices.len(), 16);
        assert!(mesh.vertices.iter().all(|v| v.z == 0.0 || v.z == 5.0));
        // 8 side quads + 2 caps.
        assert_eq!(mesh.faces.len(), 10);
        assert_eq!(mesh.faces[8].len(), 8);
        assert_eq!(mesh.faces[9].len(), 8);
    }

    #[test]
    fn procedural_provider_cannot_read_files() {
        assert!(matches!(
            ProceduralMeshProvider.read("model.obj"),
            Err(Error::MeshImport { .. })
        ));
    }
}
