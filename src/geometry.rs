//! Positioned mesh geometry, the value stored per path in the render tree.

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::bounds::Bounds;
use crate::color::{DEFAULT_COLOR, Rgba};
use crate::coords::{Axis, Point};
use crate::rotation::Rotation;

/// A triangular face: three indices into a geometry's vertex list.
pub type Face = [u32; 3];

/// A mesh with a position, color, visibility distances, and a label.
///
/// The vertex list is in local coordinates; `pos` places the mesh in the
/// scene. The axis-aligned bounds over the vertices are computed once at
/// construction and kept in sync by the mutating operations. Layout-only
/// elements use [`Geometry::empty`], which has no vertices, just bounds;
/// such geometries are not drawn ([`Geometry::should_draw`] is false).
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    vertexes: Vec<Point>,
    triangles: Vec<Face>,
    bounds: Bounds,
    pos: Point,
    color: Rgba,
    hide_distance: f32,
    show_distance: f32,
    text: String,
}

impl Geometry {
    /// Builds a geometry from vertices and triangles, computing its bounds.
    pub fn new(
        vertexes: Vec<Point>,
        triangles: Vec<Face>,
        pos: Point,
        color: Rgba,
        hide_distance: f32,
        show_distance: f32,
        text: String,
    ) -> Self {
        let bounds = compute_bounds(&vertexes);
        Self { vertexes, triangles, bounds, pos, color, hide_distance, show_distance, text }
    }

    /// Builds a mesh geometry with default color, distances, and text.
    pub fn from_mesh(vertexes: Vec<Point>, triangles: Vec<Face>, pos: Point) -> Self {
        Self::new(vertexes, triangles, pos, DEFAULT_COLOR, 0.0, f32::INFINITY, String::new())
    }

    /// Builds a vertex-less geometry carrying only a position and bounds.
    pub fn empty(pos: Point, bounds: Bounds) -> Self {
        let mut geometry = Self::from_mesh(Vec::new(), Vec::new(), pos);
        geometry.bounds = bounds;
        geometry
    }

    /// True iff there is anything to draw.
    pub fn should_draw(&self) -> bool {
        !self.vertexes.is_empty()
    }

    /// The local-space vertices.
    pub fn vertexes(&self) -> &[Point] {
        &self.vertexes
    }

    /// The triangular faces.
    pub fn triangles(&self) -> &[Face] {
        &self.triangles
    }

    /// The local-space bounds.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// The bounds translated by the position.
    pub fn positioned_bounds(&self) -> Bounds {
        self.bounds + self.pos
    }

    /// The scene position.
    pub fn pos(&self) -> Point {
        self.pos
    }

    /// Replaces the scene position.
    pub fn set_pos(&mut self, pos: Point) {
        self.pos = pos;
    }

    /// Shifts the scene position.
    pub fn offset_pos(&mut self, offset: Point) {
        self.pos += offset;
    }

    /// The mesh color.
    pub fn color(&self) -> Rgba {
        self.color
    }

    /// Replaces the mesh color.
    pub fn set_color(&mut self, color: Rgba) {
        self.color = color;
    }

    /// Camera distance below which the mesh is hidden.
    pub fn hide_distance(&self) -> f32 {
        self.hide_distance
    }

    /// Replaces the hide distance.
    pub fn set_hide_distance(&mut self, distance: f32) {
        self.hide_distance = distance;
    }

    /// Camera distance above which the mesh is hidden.
    pub fn show_distance(&self) -> f32 {
        self.show_distance
    }

    /// Replaces the show distance.
    pub fn set_show_distance(&mut self, distance: f32) {
        self.show_distance = distance;
    }

    /// The label text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the label text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Uniformly scales the position, vertices, bounds, and both visibility
    /// distances.
    pub fn scale_by(&mut self, factor: f32) {
        self.pos *= factor;
        for vertex in &mut self.vertexes {
            *vertex *= factor;
        }
        self.bounds *= factor;
        self.show_distance *= factor;
        self.hide_distance *= factor;
    }

    /// Stretches the mesh along one axis: every vertex past the mean of the
    /// distinct axis values moves by `amount`, and the bounds' end follows.
    pub fn stretch_by(&mut self, axis: Axis, amount: f32) {
        if self.vertexes.is_empty() {
            return;
        }

        // Distinct values, so heavily tessellated faces don't bias the split.
        let mut axis_values: Vec<f32> = self.vertexes.iter().map(|vertex| vertex[axis]).collect();
        axis_values.sort_by(f32::total_cmp);
        axis_values.dedup();
        let total: f32 = axis_values.iter().sum();
        let avg = total / axis_values.len() as f32;

        for vertex in &mut self.vertexes {
            if vertex[axis] > avg {
                vertex[axis] += amount;
            }
        }

        let mut offset = Point::ZERO;
        offset[axis] = amount;
        self.bounds = Bounds::new(self.bounds.base(), self.bounds.end() + offset);
    }

    /// Merges two geometries into one, re-basing both vertex sets on the
    /// union of the positioned bounds. Color, distances, and text come from
    /// `self`.
    pub fn combine_with(&self, other: &Geometry) -> Geometry {
        let new_pos = (self.positioned_bounds() + other.positioned_bounds()).base();
        let offset = self.pos - new_pos;
        let other_offset = other.pos - new_pos;

        let vertex_count = self.vertexes.len() as u32;
        let mut vertexes = Vec::with_capacity(self.vertexes.len() + other.vertexes.len());
        vertexes.extend(self.vertexes.iter().map(|vertex| *vertex + offset));
        vertexes.extend(other.vertexes.iter().map(|vertex| *vertex + other_offset));

        let mut triangles = self.triangles.clone();
        triangles.extend(
            other
                .triangles
                .iter()
                .map(|[a, b, c]| [a + vertex_count, b + vertex_count, c + vertex_count]),
        );

        Geometry::new(
            vertexes,
            triangles,
            new_pos,
            self.color,
            self.hide_distance,
            self.show_distance,
            self.text.clone(),
        )
    }

    /// Rotates the position, bounds, and every vertex around `rotation_pt`.
    pub fn rotate_around(&mut self, rotation_pt: Point, rotation: &Rotation) {
        self.pos = rotation.rotate_coord(rotation_pt, self.pos);
        self.bounds = self.bounds.rotate_around(rotation_pt, rotation);
        for vertex in &mut self.vertexes {
            *vertex = rotation.rotate_coord(rotation_pt, *vertex);
        }
    }
}

fn compute_bounds(vertexes: &[Point]) -> Bounds {
    if vertexes.is_empty() {
        return Bounds::default();
    }

    let inf = f32::INFINITY;
    let mut min_pt = Point::new(inf, inf, inf);
    let mut max_pt = Point::new(-inf, -inf, -inf);
    for pt in vertexes {
        min_pt.x = min_pt.x.min(pt.x);
        min_pt.y = min_pt.y.min(pt.y);
        min_pt.z = min_pt.z.min(pt.z);
        max_pt.x = max_pt.x.max(pt.x);
        max_pt.y = max_pt.y.max(pt.y);
        max_pt.z = max_pt.z.max(pt.z);
    }
    Bounds::new(min_pt, max_pt)
}

impl Serialize for Geometry {
    /// The wire shape viewers consume: vertices, triangles, position, color,
    /// visibility distances, text, and the drawability flag.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Geometry", 8)?;
        state.serialize_field("vertexes", &self.vertexes)?;
        state.serialize_field("triangles", &self.triangles)?;
        state.serialize_field("pos", &self.pos)?;
        state.serialize_field("color", &self.color)?;
        state.serialize_field("hide_distance", &self.hide_distance)?;
        state.serialize_field("show_distance", &self.show_distance)?;
        state.serialize_field("text", &self.text)?;
        state.serialize_field("should_draw", &self.should_draw())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_geometry() -> Geometry {
        Geometry::from_mesh(
            vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(2.0, 0.0, 0.0),
                Point::new(2.0, 1.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
            Point::new(1.0, 1.0, 1.0),
        )
    }

    #[test]
    fn bounds_cover_the_vertices() {
        let geometry = quad_geometry();
        assert_eq!(geometry.bounds().base(), Point::ZERO);
        assert_eq!(geometry.bounds().end(), Point::new(2.0, 1.0, 0.0));
        assert_eq!(geometry.positioned_bounds().base(), Point::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn empty_geometry_keeps_given_bounds_and_never_draws() {
        let bounds = Bounds::from_lengths(4.0, 5.0, 6.0);
        let geometry = Geometry::empty(Point::new(1.0, 0.0, 0.0), bounds);
        assert!(!geometry.should_draw());
        assert_eq!(geometry.bounds(), bounds);
        assert!(quad_geometry().should_draw());
    }

    #[test]
    fn scaling_scales_everything() {
        let mut geometry = quad_geometry();
        geometry.set_hide_distance(1.0);
        geometry.set_show_distance(10.0);
        geometry.scale_by(2.0);
        assert_eq!(geometry.pos(), Point::new(2.0, 2.0, 2.0));
        assert_eq!(geometry.bounds().end(), Point::new(4.0, 2.0, 0.0));
        assert_eq!(geometry.vertexes()[1], Point::new(4.0, 0.0, 0.0));
        assert_eq!(geometry.hide_distance(), 2.0);
        assert_eq!(geometry.show_distance(), 20.0);
    }

    #[test]
    fn stretch_moves_only_the_far_vertices() {
        let mut geometry = quad_geometry();
        geometry.stretch_by(Axis::X, 3.0);
        // Vertices at x=2 (above the mean of {0, 2}) move; x=0 stay.
        assert_eq!(geometry.vertexes()[0].x, 0.0);
        assert_eq!(geometry.vertexes()[1].x, 5.0);
        assert_eq!(geometry.bounds().end().x, 5.0);
    }

    #[test]
    fn combine_re_bases_both_meshes() {
        let a = quad_geometry();
        let mut b = quad_geometry();
        b.set_pos(Point::new(5.0, 1.0, 1.0));
        let combined = a.combine_with(&b);
        assert_eq!(combined.vertexes().len(), 8);
        assert_eq!(combined.triangles().len(), 4);
        // Faces of the second mesh index past the first mesh's vertices.
        assert_eq!(combined.triangles()[2], [4, 5, 6]);
        assert_eq!(combined.pos(), Point::new(1.0, 1.0, 1.0));
        assert_eq!(
            combined.positioned_bounds(),
            a.positioned_bounds() + b.positioned_bounds()
        );
    }

    #[test]
    fn serializes_to_the_wire_shape() {
        let geometry = Geometry::empty(Point::ZERO, Bounds::default());
        let value = serde_json::to_value(&geometry).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(value["should_draw"], serde_json::json!(false));
        assert_eq!(value["pos"]["x"], serde_json::json!(0.0));
        assert_eq!(value["text"], serde_json::json!(""));
    }
}
