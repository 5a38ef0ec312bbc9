//! The render tree: the materialized scene, keyed by path.

use std::collections::BTreeMap;

use crate::bounds::Bounds;
use crate::coords::Point;
use crate::geometry::Geometry;
use crate::path::Path;
use crate::rotation::Rotation;

/// One difference between two render trees at a path.
///
/// `FirstMissing`/`SecondMissing` report a path present on only one side;
/// the remaining variants report a changed field of a common path, emitted
/// in the fixed order `Pos`, `Bounds`, `Color`, `Text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderDiff {
    /// The path exists only in the tree passed to `differences_from`.
    FirstMissing,
    /// The path exists only in `self`.
    SecondMissing,
    /// The geometry's position changed.
    Pos,
    /// The geometry's bounds changed.
    Bounds,
    /// The geometry's color changed.
    Color,
    /// The geometry's text changed.
    Text,
}

/// A map from path to rendered geometry, preserving insertion order.
///
/// Lookup and diffing iterate in sorted path order (length first, then
/// part-wise); enumerating the direct children of a path uses the order the
/// paths were first inserted, which is the node tree's child order. The tree
/// is not necessarily closed under ancestry; descendant queries work purely
/// on path relations.
#[derive(Debug, Default, Clone)]
pub struct RenderTree {
    insertion_order: Vec<Path>,
    rendered: BTreeMap<Path, Geometry>,
}

impl RenderTree {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every geometry. This is the engine's (deliberately coarse)
    /// cache invalidation: the whole scene is reconstructed on each render.
    pub fn clear(&mut self) {
        self.rendered.clear();
        self.insertion_order.clear();
    }

    /// True when nothing has been rendered.
    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }

    /// Number of rendered geometries.
    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    /// True when no geometry has been rendered at `path` yet.
    pub fn needs_updating(&self, path: &Path) -> bool {
        !self.rendered.contains_key(path)
    }

    /// Inserts or replaces the geometry at `path`, appending to the
    /// insertion order on first insert.
    pub fn update(&mut self, path: Path, geometry: Geometry) {
        if !self.rendered.contains_key(&path) {
            self.insertion_order.push(path.clone());
        }
        self.rendered.insert(path, geometry);
    }

    /// The geometry at `path`, if rendered.
    pub fn get(&self, path: &Path) -> Option<&Geometry> {
        self.rendered.get(path)
    }

    /// Iterates all rendered `(path, geometry)` pairs in sorted path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Geometry)> {
        self.rendered.iter()
    }

    /// The union of the positioned bounds of every rendered geometry at or
    /// below `path`. Returns the zero bounds when nothing is rendered there.
    pub fn positioned_bounds_of(&self, path: &Path) -> Bounds {
        // Start from the first real bounds rather than the zero bounds: the
        // union identity at (0,0,0) could mask a higher real lower corner.
        let mut maybe_bounds: Option<Bounds> = None;
        for (rendered_path, geometry) in &self.rendered {
            if rendered_path.is_descendant_of(path, true) {
                let positioned = geometry.positioned_bounds();
                match &mut maybe_bounds {
                    Some(bounds) => *bounds += positioned,
                    None => maybe_bounds = Some(positioned),
                }
            }
        }
        maybe_bounds.unwrap_or_default()
    }

    /// Number of direct children of `path`.
    pub fn num_children_of(&self, path: &Path) -> usize {
        self.insertion_order.iter().filter(|candidate| candidate.is_child_of(path)).count()
    }

    /// The direct children of `path` in insertion order.
    pub fn children_of(&self, path: &Path) -> Vec<(Path, Geometry)> {
        self.insertion_order
            .iter()
            .filter(|candidate| candidate.is_child_of(path))
            .filter_map(|candidate| {
                self.rendered.get(candidate).map(|geometry| (candidate.clone(), geometry.clone()))
            })
            .collect()
    }

    /// Every rendered path below `path` (inclusively when `including`), in
    /// insertion order.
    pub fn descendants_of(&self, path: &Path, including: bool) -> Vec<(Path, Geometry)> {
        self.insertion_order
            .iter()
            .filter(|candidate| candidate.is_descendant_of(path, including))
            .filter_map(|candidate| {
                self.rendered.get(candidate).map(|geometry| (candidate.clone(), geometry.clone()))
            })
            .collect()
    }

    fn move_impl(
        &mut self,
        path: &Path,
        by_pos: Point,
        excluding_subdescendants_of: Option<&Path>,
        excluding_parent: bool,
    ) {
        if !excluding_parent {
            if let Some(geometry) = self.rendered.get_mut(path) {
                geometry.offset_pos(by_pos);
            }
        }

        for (rendered_path, geometry) in &mut self.rendered {
            if !rendered_path.is_strict_descendant_of(path) {
                continue;
            }
            if let Some(excluded) = excluding_subdescendants_of {
                if rendered_path.is_descendant_of(excluded, true) {
                    continue;
                }
            }
            geometry.offset_pos(by_pos);
        }
    }

    /// Offsets the geometry at `path` and every strict descendant.
    pub fn move_parent_and_descendants_by(&mut self, path: &Path, by_pos: Point) {
        self.move_impl(path, by_pos, None, false);
    }

    /// As [`move_parent_and_descendants_by`](Self::move_parent_and_descendants_by),
    /// leaving the subtree at `excluding` (inclusive) in place.
    pub fn move_parent_and_descendants_by_excluding(
        &mut self,
        path: &Path,
        by_pos: Point,
        excluding: &Path,
    ) {
        self.move_impl(path, by_pos, Some(excluding), false);
    }

    /// Offsets only the strict descendants of `path`.
    pub fn move_descendants_by(&mut self, path: &Path, by_pos: Point) {
        self.move_impl(path, by_pos, None, true);
    }

    /// Uniformly scales the geometry at `path` and every descendant.
    pub fn scale_parent_and_descendants_by(&mut self, path: &Path, factor: f32) {
        for (rendered_path, geometry) in &mut self.rendered {
            if rendered_path.is_descendant_of(path, true) {
                geometry.scale_by(factor);
            }
        }
    }

    fn rotate_children_of(&mut self, path: &Path, rotation_pt: Point, rotation: &Rotation) {
        let child_paths: Vec<Path> =
            self.children_of(path).into_iter().map(|(child_path, _)| child_path).collect();
        for child_path in child_paths {
            self.rotate_children_of(&child_path, rotation_pt, rotation);
        }

        // The top of the recursion may have no geometry of its own.
        if let Some(geometry) = self.rendered.get_mut(path) {
            geometry.rotate_around(rotation_pt, rotation);
        }
    }

    /// Rotates the subtree at `path` around the center of its positioned
    /// bounds, then translates everything back so the bottom-left corner of
    /// the positioned bounds is unchanged.
    pub fn rotate_parent_and_descendants_in_place(&mut self, path: &Path, rotation: &Rotation) {
        let pos_bounds = self.positioned_bounds_of(path);
        let old_left_corner = pos_bounds.bottom_left();
        let rotation_pt = pos_bounds.center();
        self.rotate_children_of(path, rotation_pt, rotation);

        let new_left_corner = self.positioned_bounds_of(path).bottom_left();
        self.move_parent_and_descendants_by(path, old_left_corner - new_left_corner);
    }

    /// The differences between `self` (the new tree) and `other` (the
    /// previous tree), as a linear merge over both maps in sorted path
    /// order.
    pub fn differences_from(&self, other: &RenderTree) -> Vec<(Path, RenderDiff)> {
        let mut differences = Vec::new();

        let mut ours = self.rendered.iter().peekable();
        let mut theirs = other.rendered.iter().peekable();
        loop {
            let our_key = ours.peek().map(|(path, _)| (*path).clone());
            let their_key = theirs.peek().map(|(path, _)| (*path).clone());
            match (our_key, their_key) {
                (None, None) => break,
                (Some(our_path), None) => {
                    differences.push((our_path, RenderDiff::SecondMissing));
                    ours.next();
                }
                (None, Some(their_path)) => {
                    differences.push((their_path, RenderDiff::FirstMissing));
                    theirs.next();
                }
                (Some(our_path), Some(their_path)) => {
                    if our_path < their_path {
                        differences.push((our_path, RenderDiff::SecondMissing));
                        ours.next();
                        continue;
                    }
                    if their_path < our_path {
                        differences.push((their_path, RenderDiff::FirstMissing));
                        theirs.next();
                        continue;
                    }

                    if let (Some((_, our_geometry)), Some((_, their_geometry))) =
                        (ours.next(), theirs.next())
                    {
                        if our_geometry.pos() != their_geometry.pos() {
                            differences.push((our_path.clone(), RenderDiff::Pos));
                        }
                        if our_geometry.bounds() != their_geometry.bounds() {
                            differences.push((our_path.clone(), RenderDiff::Bounds));
                        }
                        if our_geometry.color() != their_geometry.color() {
                            differences.push((our_path.clone(), RenderDiff::Color));
                        }
                        if our_geometry.text() != their_geometry.text() {
                            differences.push((our_path, RenderDiff::Text));
                        }
                    }
                }
            }
        }

        differences
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;

    fn path(s: &str) -> Path {
        s.parse().unwrap_or_else(|err| panic!("'{s}' should parse: {err}"))
    }

    fn box_geometry(width: f32, pos: Point) -> Geometry {
        Geometry::from_mesh(
            vec![
                Point::ZERO,
                Point::new(width, 0.0, 0.0),
                Point::new(width, 2.0, 2.0),
            ],
            vec![[0, 1, 2]],
            pos,
        )
    }

    #[test]
    fn update_tracks_insertion_order_for_children() {
        let mut tree = RenderTree::new();
        tree.update(path(".a.z"), box_geometry(1.0, Point::ZERO));
        tree.update(path(".a.b"), box_geometry(1.0, Point::ZERO));
        tree.update(path(".a.z"), box_geometry(2.0, Point::ZERO));

        let children: Vec<Path> =
            tree.children_of(&path(".a")).into_iter().map(|(child, _)| child).collect();
        assert_eq!(children, vec![path(".a.z"), path(".a.b")]);
        assert_eq!(tree.num_children_of(&path(".a")), 2);
        assert!(!tree.needs_updating(&path(".a.z")));
        assert!(tree.needs_updating(&path(".a.c")));
    }

    #[test]
    fn positioned_bounds_union_descendants() {
        let mut tree = RenderTree::new();
        tree.update(path(".a.b"), box_geometry(2.0, Point::new(1.0, 0.0, 0.0)));
        tree.update(path(".a.c"), box_geometry(1.0, Point::new(5.0, 0.0, 0.0)));
        tree.update(path(".x"), box_geometry(9.0, Point::new(50.0, 0.0, 0.0)));

        let bounds = tree.positioned_bounds_of(&path(".a"));
        assert_eq!(bounds.base(), Point::new(1.0, 0.0, 0.0));
        assert_eq!(bounds.end(), Point::new(6.0, 2.0, 2.0));
        assert_eq!(tree.positioned_bounds_of(&path(".missing")), Bounds::default());
    }

    #[test]
    fn positioned_bounds_do_not_anchor_at_the_origin() {
        let mut tree = RenderTree::new();
        tree.update(path(".a.b"), box_geometry(1.0, Point::new(4.0, 4.0, 4.0)));
        // The base is the geometry's base, not the zero bounds' origin.
        assert_eq!(tree.positioned_bounds_of(&path(".a")).base(), Point::new(4.0, 4.0, 4.0));
    }

    #[test]
    fn moves_can_exclude_a_subtree() {
        let mut tree = RenderTree::new();
        tree.update(path(".a"), box_geometry(1.0, Point::ZERO));
        tree.update(path(".a.b"), box_geometry(1.0, Point::ZERO));
        tree.update(path(".a.c"), box_geometry(1.0, Point::ZERO));
        tree.update(path(".a.c.d"), box_geometry(1.0, Point::ZERO));

        let offset = Point::new(1.0, 0.0, 0.0);
        tree.move_parent_and_descendants_by_excluding(&path(".a"), offset, &path(".a.c"));

        let pos = |p: &str| tree.get(&path(p)).map(Geometry::pos);
        assert_eq!(pos(".a"), Some(offset));
        assert_eq!(pos(".a.b"), Some(offset));
        assert_eq!(pos(".a.c"), Some(Point::ZERO));
        assert_eq!(pos(".a.c.d"), Some(Point::ZERO));
    }

    #[test]
    fn move_descendants_leaves_the_parent() {
        let mut tree = RenderTree::new();
        tree.update(path(".a"), box_geometry(1.0, Point::ZERO));
        tree.update(path(".a.b"), box_geometry(1.0, Point::ZERO));

        tree.move_descendants_by(&path(".a"), Point::new(0.0, 3.0, 0.0));
        let pos = |p: &str| tree.get(&path(p)).map(Geometry::pos);
        assert_eq!(pos(".a"), Some(Point::ZERO));
        assert_eq!(pos(".a.b"), Some(Point::new(0.0, 3.0, 0.0)));
    }

    #[test]
    fn scaling_applies_to_the_whole_subtree() {
        let mut tree = RenderTree::new();
        tree.update(path(".a"), box_geometry(1.0, Point::new(1.0, 0.0, 0.0)));
        tree.update(path(".a.b"), box_geometry(1.0, Point::new(2.0, 0.0, 0.0)));

        tree.scale_parent_and_descendants_by(&path(".a"), 2.0);
        let pos = |p: &str| tree.get(&path(p)).map(Geometry::pos);
        assert_eq!(pos(".a"), Some(Point::new(2.0, 0.0, 0.0)));
        assert_eq!(pos(".a.b"), Some(Point::new(4.0, 0.0, 0.0)));
    }

    #[test]
    fn rotate_in_place_preserves_the_positioned_base() {
        let mut tree = RenderTree::new();
        let geometry = Geometry::from_mesh(
            vec![Point::ZERO, Point::new(2.0, 0.0, 0.0), Point::new(2.0, 2.0, 2.0)],
            vec![[0, 1, 2]],
            Point::new(1.0, 0.0, 1.0),
        );
        tree.update(path(".r.box"), geometry);

        let before = tree.positioned_bounds_of(&path(".r"));
        tree.rotate_parent_and_descendants_in_place(&path(".r"), &Rotation::from_degrees(90.0));
        let after = tree.positioned_bounds_of(&path(".r"));

        let base_delta = after.base() - before.base();
        assert!(base_delta.x.abs() < 1e-3);
        assert!(base_delta.y.abs() < 1e-3);
        assert!(base_delta.z.abs() < 1e-3);
    }

    #[test]
    fn diff_reports_one_sided_paths() {
        let mut first = RenderTree::new();
        first.update(path(".a"), box_geometry(1.0, Point::ZERO));
        first.update(path(".b"), box_geometry(1.0, Point::ZERO));
        let mut second = RenderTree::new();
        second.update(path(".b"), box_geometry(1.0, Point::ZERO));
        second.update(path(".c"), box_geometry(1.0, Point::ZERO));

        let differences = second.differences_from(&first);
        assert_eq!(
            differences,
            vec![
                (path(".a"), RenderDiff::FirstMissing),
                (path(".c"), RenderDiff::SecondMissing),
            ]
        );
    }

    #[test]
    fn diff_missing_sets_are_symmetric() {
        let mut first = RenderTree::new();
        first.update(path(".a"), box_geometry(1.0, Point::ZERO));
        first.update(path(".a.b"), box_geometry(1.0, Point::ZERO));
        let mut second = RenderTree::new();
        second.update(path(".a"), box_geometry(1.0, Point::ZERO));
        second.update(path(".z"), box_geometry(1.0, Point::ZERO));

        let forward: Vec<Path> = second
            .differences_from(&first)
            .into_iter()
            .filter(|(_, diff)| *diff == RenderDiff::FirstMissing)
            .map(|(diff_path, _)| diff_path)
            .collect();
        let backward: Vec<Path> = first
            .differences_from(&second)
            .into_iter()
            .filter(|(_, diff)| *diff == RenderDiff::SecondMissing)
            .map(|(diff_path, _)| diff_path)
            .collect();
        assert_eq!(forward, backward);
    }

    #[test]
    fn diff_emits_field_tags_in_fixed_order() {
        let mut first = RenderTree::new();
        first.update(path(".a"), box_geometry(1.0, Point::ZERO));
        let mut second = RenderTree::new();
        let mut changed = box_geometry(2.0, Point::new(1.0, 0.0, 0.0));
        changed.set_color(Rgba::new(1, 2, 3));
        changed.set_text("label");
        second.update(path(".a"), changed);

        let differences = second.differences_from(&first);
        assert_eq!(
            differences,
            vec![
                (path(".a"), RenderDiff::Pos),
                (path(".a"), RenderDiff::Bounds),
                (path(".a"), RenderDiff::Color),
                (path(".a"), RenderDiff::Text),
            ]
        );
    }

    #[test]
    fn clear_empties_everything() {
        let mut tree = RenderTree::new();
        tree.update(path(".a"), box_geometry(1.0, Point::ZERO));
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.children_of(&Path::root()), vec![]);
    }
}
