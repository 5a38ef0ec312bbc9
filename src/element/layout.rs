//! Layout-only elements: they position children and carry no mesh of their
//! own.

use std::collections::BTreeMap;

use log::warn;

use crate::bounds::Bounds;
use crate::coords::{Axis, Point};
use crate::element::{Element, impl_element_common};
use crate::error::Result;
use crate::feature::{
    AttributeMap, AxisFeature, HideShowFeature, JuxtaposeFeatureSet, PaddingFeature,
    RotateFeature, ScaleFeatureSet, SizeFeature, SpacingFeature,
};
use crate::geometry::Geometry;
use crate::path::Path;
use crate::render_tree::RenderTree;
use crate::rotation::Rotation;
use crate::value::AncestorValues;

/// Holds a declared size for descendants to reference but lays nothing out;
/// children stay where they rendered themselves.
#[derive(Debug, Clone)]
pub struct NoLayoutElement {
    name: String,
    size: SizeFeature,
}

impl NoLayoutElement {
    /// Builds a no-layout element from an attribute map.
    pub fn new(name: impl Into<String>, attributes: &AttributeMap) -> Result<Self> {
        let mut element = Self { name: name.into(), size: SizeFeature::default() };
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
}

impl Element for NoLayoutElement {
    impl_element_common!();

    fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.size.update_from_attributes(attributes)
    }

    fn attributes(&self) -> AttributeMap {
        self.size.attributes()
    }

    fn update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.size.compute_and_update_ancestor_values(scope)
    }
}

/// Lays children out in a `⌈√n⌉`-sided grid on the ground plane, sized by
/// per-row maximum widths and per-column maximum depths.
#[derive(Debug, Clone)]
pub struct GridElement {
    name: String,
    spacing: SpacingFeature,
}

impl GridElement {
    /// Builds a grid element from an attribute map.
    pub fn new(name: impl Into<String>, attributes: &AttributeMap) -> Result<Self> {
        let mut element = Self { name: name.into(), spacing: SpacingFeature::default() };
        Element::update_from_attributes(&mut element, attributes)?;
        Ok(element)
    }

    /// The spacing feature.
    pub fn spacing(&self) -> &SpacingFeature {
        &self.spacing
    }

    /// Mutable access to the spacing feature.
    pub fn spacing_mut(&mut self) -> &mut SpacingFeature {
        &mut self.spacing
    }
}

impl Element for GridElement {
    impl_element_common!();

    fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.spacing.update_from_attributes(attributes)
    }

    fn attributes(&self) -> AttributeMap {
        self.spacing.attributes()
    }

    fn update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.spacing.compute_and_update_ancestor_values(scope)
    }

    fn render(&self, path: &Path, render_tree: &mut RenderTree) -> Result<()> {
        let children = render_tree.children_of(path);
        if children.is_empty() {
            return Ok(());
        }

        let diameter = (children.len() as f32).sqrt().ceil() as usize;
        let grid_pts: Vec<(usize, usize)> = (0..diameter)
            .flat_map(|row| (0..diameter).map(move |col| (row, col)))
            .collect();

        // Per-row max width and per-column max depth over the occupied cells.
        let mut x_lengths = vec![0.0f32; children.len()];
        let mut z_lengths = vec![0.0f32; children.len()];
        for ((row, col), (_, geometry)) in grid_pts.iter().zip(children.iter()) {
            let (width, _, depth) = geometry.bounds().lengths();
            x_lengths[*row] = x_lengths[*row].max(width);
            z_lengths[*col] = z_lengths[*col].max(depth);
        }

        let spacing = self.spacing.spacing();
        let cumulative = |lengths: &[f32], count: usize| -> f32 {
            lengths[..count].iter().map(|length| length + spacing).sum()
        };
        for ((row, col), (child_path, _)) in grid_pts.iter().zip(children.iter()) {
            let by_pos =
                Point::new(cumulative(&x_lengths, *row), 0.0, cumulative(&z_lengths, *col));
            render_tree.move_parent_and_descendants_by(child_path, by_pos);
        }
        Ok(())
    }
}

/// Scales its whole subtree by the factor that fits the subtree's measured
/// bounds to the declared target lengths.
#[derive(Debug, Clone)]
pub struct ScaleElement {
    name: String,
    scale: ScaleFeatureSet,
}

impl ScaleElement {
    /// Builds a scale element from an attribute map.
    pub fn new(name: impl Into<String>, attributes: &AttributeMap) -> Result<Self> {
        let mut element = Self { name: name.into(), scale: ScaleFeatureSet::default() };
        Element::update_from_attributes(&mut element, attributes)?;
        Ok(element)
    }

    /// The scale feature set.
    pub fn scale(&self) -> &ScaleFeatureSet {
        &self.scale
    }

    /// Mutable access to the scale feature set.
    pub fn scale_mut(&mut self) -> &mut ScaleFeatureSet {
        &mut self.scale
    }
}

impl Element for ScaleElement {
    impl_element_common!();

    fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.scale.update_from_attributes(attributes)
    }

    fn attributes(&self) -> AttributeMap {
        self.scale.attributes()
    }

    fn update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.scale.compute_and_update_ancestor_values(scope)
    }

    fn render(&self, path: &Path, render_tree: &mut RenderTree) -> Result<()> {
        let (width, height, depth) = render_tree.positioned_bounds_of(path).lengths();
        let factor = self.scale.compute_scale_factor(width, height, depth);
        render_tree.scale_parent_and_descendants_by(path, factor);
        Ok(())
    }
}

/// Raises descendants' hide/show distances to its own, per the clamp flags.
#[derive(Debug, Clone)]
pub struct HideShowElement {
    name: String,
    hide_show: HideShowFeature,
}

impl HideShowElement {
    /// Builds a hide/show element from an attribute map.
    pub fn new(name: impl Into<String>, attributes: &AttributeMap) -> Result<Self> {
        let mut element = Self { name: name.into(), hide_show: HideShowFeature::default() };
        Element::update_from_attributes(&mut element, attributes)?;
        Ok(element)
    }

    /// The hide/show feature.
    pub fn hide_show(&self) -> &HideShowFeature {
        &self.hide_show
    }

    /// Mutable access to the hide/show feature.
    pub fn hide_show_mut(&mut self) -> &mut HideShowFeature {
        &mut self.hide_show
    }
}

impl Element for HideShowElement {
    impl_element_common!();

    fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.hide_show.update_from_attributes(attributes)
    }

    fn attributes(&self) -> AttributeMap {
        self.hide_show.attributes()
    }

    fn update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.hide_show.compute_and_update_ancestor_values(scope)
    }

    fn render(&self, path: &Path, render_tree: &mut RenderTree) -> Result<()> {
        let (hide_distance, show_distance) = self.hide_show.hide_and_show_distances();
        let clamp_hide = self.hide_show.clamp_descendant_hide_distances();
        let clamp_show = self.hide_show.clamp_descendant_show_distances();

        for (descendant_path, mut geometry) in render_tree.descendants_of(path, false) {
            if clamp_hide && geometry.hide_distance() < hide_distance {
                geometry.set_hide_distance(hide_distance);
            }
            if clamp_show && geometry.show_distance() < show_distance {
                geometry.set_show_distance(show_distance);
            }
            render_tree.update(descendant_path, geometry);
        }
        Ok(())
    }
}

/// Rotates its subtree in place around the center of the subtree's bounds.
#[derive(Debug, Clone)]
pub struct RotateElement {
    name: String,
    rotate: RotateFeature,
}

impl RotateElement {
    /// Builds a rotate element from an attribute map.
    pub fn new(name: impl Into<String>, attributes: &AttributeMap) -> Result<Self> {
        let mut element = Self { name: name.into(), rotate: RotateFeature::default() };
        Element::update_from_attributes(&mut element, attributes)?;
        Ok(element)
    }

    /// The rotate feature.
    pub fn rotate(&self) -> &RotateFeature {
        &self.rotate
    }

    /// Mutable access to the rotate feature.
    pub fn rotate_mut(&mut self) -> &mut RotateFeature {
        &mut self.rotate
    }
}

impl Element for RotateElement {
    impl_element_common!();

    fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.rotate.update_from_attributes(attributes)
    }

    fn attributes(&self) -> AttributeMap {
        self.rotate.attributes()
    }

    fn update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.rotate.compute_and_update_ancestor_values(scope)
    }

    fn render(&self, path: &Path, render_tree: &mut RenderTree) -> Result<()> {
        render_tree.rotate_parent_and_descendants_in_place(path, &self.rotate.rotation());
        Ok(())
    }
}

/// Sweeps children along an axis with spacing, optionally centering them
/// within a declared length and aligning them on the perpendicular axes.
#[derive(Debug, Clone)]
pub struct JuxtaposeElement {
    name: String,
    juxtapose: JuxtaposeFeatureSet,
}

impl JuxtaposeElement {
    /// Builds a juxtapose element from an attribute map.
    pub fn new(name: impl Into<String>, attributes: &AttributeMap) -> Result<Self> {
        let mut element = Self { name: name.into(), juxtapose: JuxtaposeFeatureSet::default() };
        Element::update_from_attributes(&mut element, attributes)?;
        Ok(element)
    }

    /// The juxtapose feature set.
    pub fn juxtapose(&self) -> &JuxtaposeFeatureSet {
        &self.juxtapose
    }

    /// Mutable access to the juxtapose feature set.
    pub fn juxtapose_mut(&mut self) -> &mut JuxtaposeFeatureSet {
        &mut self.juxtapose
    }
}

impl Element for JuxtaposeElement {
    impl_element_common!();

    fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.juxtapose.update_from_attributes(attributes)
    }

    fn attributes(&self) -> AttributeMap {
        self.juxtapose.attributes()
    }

    fn update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.juxtapose.compute_and_update_ancestor_values(scope)
    }

    fn render(&self, path: &Path, render_tree: &mut RenderTree) -> Result<()> {
        let our_children = render_tree.children_of(path);
        if our_children.is_empty() {
            return Ok(());
        }
        let our_paths: Vec<Path> =
            our_children.into_iter().map(|(child_path, _)| child_path).collect();

        self.juxtapose.juxtapose(&our_paths, render_tree);

        let our_axis = self.juxtapose.axis().axis();
        if !self.juxtapose.size().axis_length_is_defaulted(our_axis) {
            self.juxtapose.center_within_axis_length(&our_paths, render_tree, our_axis);
        }

        let pos_bounds =
            self.juxtapose.positioned_bounds_with_provided_lengths(&our_paths, render_tree);
        if !self.juxtapose.axis().axis_is_defaulted() {
            self.juxtapose.align(
                &our_paths,
                render_tree,
                &pos_bounds,
                our_axis,
                self.juxtapose.align_feature().alignment(),
            );
        }

        let geometry = Geometry::empty(pos_bounds.base(), pos_bounds.strip_pos());
        render_tree.update(path.clone(), geometry);
        Ok(())
    }
}

/// Reserves space: an empty geometry sized to its declared lengths or its
/// children, whichever is larger per axis; children are untouched.
#[derive(Debug, Clone)]
pub struct PaddingElement {
    name: String,
    padding: PaddingFeature,
    size: SizeFeature,
}

impl PaddingElement {
    /// Builds a padding element from an attribute map.
    pub fn new(name: impl Into<String>, attributes: &AttributeMap) -> Result<Self> {
        let mut element = Self {
            name: name.into(),
            padding: PaddingFeature::default(),
            size: SizeFeature::default(),
        };
        Element::update_from_attributes(&mut element, attributes)?;
        Ok(element)
    }

    /// The padding feature.
    pub fn padding(&self) -> &PaddingFeature {
        &self.padding
    }

    /// Mutable access to the padding feature.
    pub fn padding_mut(&mut self) -> &mut PaddingFeature {
        &mut self.padding
    }

    /// The size feature.
    pub fn size(&self) -> &SizeFeature {
        &self.size
    }

    /// Mutable access to the size feature.
    pub fn size_mut(&mut self) -> &mut SizeFeature {
        &mut self.size
    }
}

impl Element for PaddingElement {
    impl_element_common!();

    fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.padding.update_from_attributes(attributes)?;
        self.size.update_from_attributes(attributes)
    }

    fn attributes(&self) -> AttributeMap {
        let mut attributes = self.padding.attributes();
        attributes.extend(self.size.attributes());
        attributes
    }

    fn update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.padding.compute_and_update_ancestor_values(scope)?;
        self.size.compute_and_update_ancestor_values(scope)
    }

    fn render(&self, path: &Path, render_tree: &mut RenderTree) -> Result<()> {
        let child_bounds = render_tree.positioned_bounds_of(path);
        let (children_width, children_height, children_depth) = child_bounds.lengths();

        let width = if self.size.width_is_defaulted() {
            children_width
        } else {
            self.size.width().max(children_width)
        };
        let height = if self.size.height_is_defaulted() {
            children_height
        } else {
            self.size.height().max(children_height)
        };
        let depth = if self.size.depth_is_defaulted() {
            children_depth
        } else {
            self.size.depth().max(children_depth)
        };

        let bounds = Bounds::from_lengths(width, height, depth);
        let geometry = Geometry::empty(child_bounds.base(), bounds);
        render_tree.update(path.clone(), geometry);
        Ok(())
    }
}

type GridPt = (i32, i32);

/// Lays out a "street": the last child is the street itself, every earlier
/// child is a house placed on alternating sides of it. Far-side houses are
/// rotated to face the street, and the street is stretched along the layout
/// axis to span every house plus spacing.
#[derive(Debug, Clone)]
pub struct StreetElement {
    name: String,
    spacing: SpacingFeature,
    axis: AxisFeature,
}

impl StreetElement {
    /// Builds a street element from an attribute map.
    pub fn new(name: impl Into<String>, attributes: &AttributeMap) -> Result<Self> {
        let mut element = Self {
            name: name.into(),
            spacing: SpacingFeature::default(),
            axis: AxisFeature::default(),
        };
        Element::update_from_attributes(&mut element, attributes)?;
        Ok(element)
    }

    /// The spacing feature.
    pub fn spacing(&self) -> &SpacingFeature {
        &self.spacing
    }

    /// Mutable access to the spacing feature.
    pub fn spacing_mut(&mut self) -> &mut SpacingFeature {
        &mut self.spacing
    }

    /// The axis feature.
    pub fn axis(&self) -> &AxisFeature {
        &self.axis
    }

    /// Mutable access to the axis feature.
    pub fn axis_mut(&mut self) -> &mut AxisFeature {
        &mut self.axis
    }

    /// Positions the street and house grid cells into scene offsets, using
    /// per-row/per-column block sizes derived from the actual child extents.
    fn scale_into_axis_aligned_blocks(&self, pts: &[GridPt], sizes: &[Point]) -> Vec<Point> {
        if pts.is_empty() {
            return Vec::new();
        }

        let nrows = pts.iter().map(|pt| pt.0).max().unwrap_or(0) + 1;
        let ncols = pts.iter().map(|pt| pt.1).max().unwrap_or(0) + 1;

        let (row_lengths, col_lengths) =
            compute_plane_grid_block_sizes(sizes, nrows as usize, ncols as usize, pts);
        let opposite_axis = if self.axis.axis() == Axis::Z { Axis::X } else { Axis::Z };
        let per_axis_value_lengths = compute_per_axis_block_sizes(sizes, pts, opposite_axis);

        let spacing = self.spacing.spacing();
        let empty = Vec::new();
        let mut new_pts = Vec::with_capacity(pts.len());
        for &(row, col) in pts {
            let (row_block_offset, col_block_offset);
            if self.axis.axis() == Axis::X {
                let within_col = per_axis_value_lengths.get(&col).unwrap_or(&empty);
                col_block_offset = col_lengths.iter().take(col as usize).sum::<f32>();
                row_block_offset = within_col.iter().take(row as usize).sum::<f32>()
                    + spacing * row as f32;
            } else {
                let within_row = per_axis_value_lengths.get(&row).unwrap_or(&empty);
                row_block_offset = row_lengths.iter().take(row as usize).sum::<f32>();
                col_block_offset = within_row.iter().take(col as usize).sum::<f32>()
                    + spacing * col as f32;
            }
            new_pts.push(Point::new(row_block_offset, 0.0, col_block_offset));
        }
        new_pts
    }

    /// Derives the street offset and one offset per house from a synthetic
    /// grid: one row (or column) for the street, twin columns (or rows) for
    /// the houses alternating to either side.
    fn street_layout_pts(
        &self,
        street_geometry: &Geometry,
        house_geometries: &[Geometry],
    ) -> (Point, Vec<Point>) {
        let street_pt: GridPt = if self.axis.axis() == Axis::X { (0, 1) } else { (1, 0) };
        let mut all_street_pts = vec![street_pt];

        let num_houses = house_geometries.len();
        let half_rounded_up = num_houses.div_ceil(2);
        for i in 0..half_rounded_up as i32 {
            for j in [0, 2] {
                if self.axis.axis() == Axis::X {
                    all_street_pts.push((i, j));
                } else {
                    all_street_pts.push((j, i));
                }
            }
        }
        all_street_pts.truncate(num_houses + 1);

        let mut sizes = Vec::with_capacity(num_houses + 1);
        let (width, height, depth) = street_geometry.bounds().lengths();
        sizes.push(Point::new(width, height, depth));
        for house_geometry in house_geometries {
            let (width, height, depth) = house_geometry.bounds().lengths();
            sizes.push(Point::new(width, height, depth));
        }

        let mut new_pts = self.scale_into_axis_aligned_blocks(&all_street_pts, &sizes);
        let street_offset = new_pts.remove(0);
        (street_offset, new_pts)
    }

    /// Stretches the street along the layout axis until it spans the union
    /// of the house bounds plus spacing.
    fn stretch_street(
        &self,
        street_path: &Path,
        mut street_geometry: Geometry,
        house_bounds: &Bounds,
        render_tree: &mut RenderTree,
    ) {
        let our_axis = self.axis.axis();
        let street_bounds = street_geometry.bounds();
        let curr_street_length =
            if our_axis == Axis::X { street_bounds.width() } else { street_bounds.depth() };
        let house_length =
            if our_axis == Axis::X { house_bounds.width() } else { house_bounds.depth() };
        let wanted_street_length = house_length + self.spacing.spacing();

        let stretch_amount = (wanted_street_length - curr_street_length).max(0.0);
        street_geometry.stretch_by(our_axis, stretch_amount);
        render_tree.update(street_path.clone(), street_geometry);
    }
}

impl Element for StreetElement {
    impl_element_common!();

    fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.spacing.update_from_attributes(attributes)?;
        self.axis.update_from_attributes(attributes)
    }

    fn attributes(&self) -> AttributeMap {
        let mut attributes = self.spacing.attributes();
        attributes.extend(self.axis.attributes());
        attributes
    }

    fn update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.spacing.compute_and_update_ancestor_values(scope)?;
        self.axis.compute_and_update_ancestor_values(scope)
    }

    fn render(&self, path: &Path, render_tree: &mut RenderTree) -> Result<()> {
        let our_children = render_tree.children_of(path);
        if our_children.len() <= 1 {
            // Need both a street and at least one house.
            return Ok(());
        }
        if self.axis.axis() == Axis::Y {
            warn!("street '{path}' cannot lay out along the y axis; skipping");
            return Ok(());
        }

        let (street_path, street_geometry) = match our_children.last() {
            Some(last) => last.clone(),
            None => return Ok(()),
        };
        let houses = &our_children[..our_children.len() - 1];
        let house_geometries: Vec<Geometry> =
            houses.iter().map(|(_, geometry)| geometry.clone()).collect();

        let (street_pt, house_pts) = self.street_layout_pts(&street_geometry, &house_geometries);
        let min_x = house_pts.iter().map(|pt| pt.x).fold(f32::INFINITY, f32::min);
        let min_z = house_pts.iter().map(|pt| pt.z).fold(f32::INFINITY, f32::min);

        let mut house_bounds = Bounds::default();
        for ((house_path, _), house_pt) in houses.iter().zip(house_pts.iter()) {
            render_tree.move_parent_and_descendants_by(house_path, *house_pt);

            let is_on_far_side = if self.axis.axis() == Axis::Z {
                house_pt.x > min_x
            } else {
                house_pt.z > min_z
            };
            if is_on_far_side {
                render_tree
                    .rotate_parent_and_descendants_in_place(house_path, &Rotation::from_degrees(180.0));
            }

            house_bounds += render_tree.positioned_bounds_of(house_path);
        }

        self.stretch_street(&street_path, street_geometry, &house_bounds, render_tree);
        render_tree.move_parent_and_descendants_by(&street_path, street_pt);
        Ok(())
    }
}

/// Per-row maximum widths and per-column maximum depths over the occupied
/// grid cells.
fn compute_plane_grid_block_sizes(
    sizes: &[Point],
    nrows: usize,
    ncols: usize,
    pts: &[GridPt],
) -> (Vec<f32>, Vec<f32>) {
    let mut width_per_row = vec![0.0f32; nrows];
    let mut depth_per_col = vec![0.0f32; ncols];

    for (&(row, col), size) in pts.iter().zip(sizes.iter()) {
        width_per_row[row as usize] = width_per_row[row as usize].max(size.x);
        depth_per_col[col as usize] = depth_per_col[col as usize].max(size.z);
    }
    (width_per_row, depth_per_col)
}

/// Groups the cell sizes by their coordinate along `axis` (rows for x,
/// columns for z), each group ordered by cell position.
fn compute_per_axis_block_sizes(
    sizes: &[Point],
    pts: &[GridPt],
    axis: Axis,
) -> BTreeMap<i32, Vec<f32>> {
    let mut per_axis_value_entries: BTreeMap<i32, Vec<(GridPt, usize)>> = BTreeMap::new();
    for (index, &pt) in pts.iter().enumerate() {
        let axis_value = if axis == Axis::X { pt.0 } else { pt.1 };
        per_axis_value_entries.entry(axis_value).or_default().push((pt, index));
    }

    let mut per_axis_value_sizes = BTreeMap::new();
    for (axis_value, mut entries) in per_axis_value_entries {
        entries.sort_by_key(|(pt, _)| *pt);
        let lengths = entries
            .into_iter()
            .map(|(_, index)| if axis == Axis::X { sizes[index].x } else { sizes[index].z })
            .collect();
        per_axis_value_sizes.insert(axis_value, lengths);
    }
    per_axis_value_sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::BoxElement;

    fn attrs(pairs: &[(&str, &str)]) -> AttributeMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn path(s: &str) -> Path {
        s.parse().unwrap_or_else(|err| panic!("'{s}' should parse: {err}"))
    }

    fn render_box(tree: &mut RenderTree, at: &str, width: f32, height: f32, depth: f32) {
        let element = BoxElement::new(
            "b",
            &attrs(&[
                ("width", &width.to_string()),
                ("height", &height.to_string()),
                ("depth", &depth.to_string()),
            ]),
        )
        .unwrap_or_else(|err| panic!("{err}"));
        element.render(&path(at), tree).unwrap_or_else(|err| panic!("{err}"));
    }

    #[test]
    fn juxtapose_lays_children_along_x() {
        let element = JuxtaposeElement::new("j", &attrs(&[("spacing", "1")]))
            .unwrap_or_else(|err| panic!("{err}"));
        let mut tree = RenderTree::new();
        render_box(&mut tree, ".j.a", 2.0, 1.0, 1.0);
        render_box(&mut tree, ".j.b", 3.0, 1.0, 1.0);

        element.render(&path(".j"), &mut tree).unwrap_or_else(|err| panic!("{err}"));

        let pos = |p: &str| tree.get(&path(p)).map(Geometry::pos);
        assert_eq!(pos(".j.a"), Some(Point::ZERO));
        assert_eq!(pos(".j.b"), Some(Point::new(3.0, 0.0, 0.0)));

        let own = tree.get(&path(".j")).unwrap_or_else(|| panic!("missing"));
        assert!(!own.should_draw());
        assert_eq!(own.bounds().width(), 6.0);
    }

    #[test]
    fn juxtapose_centers_within_a_declared_length() {
        let element = JuxtaposeElement::new("j", &attrs(&[("width", "10")]))
            .unwrap_or_else(|err| panic!("{err}"));
        let mut tree = RenderTree::new();
        render_box(&mut tree, ".j.a", 2.0, 1.0, 1.0);
        render_box(&mut tree, ".j.b", 2.0, 1.0, 1.0);

        element.render(&path(".j"), &mut tree).unwrap_or_else(|err| panic!("{err}"));

        let pos = |p: &str| tree.get(&path(p)).map(Geometry::pos);
        assert_eq!(pos(".j.a"), Some(Point::new(3.0, 0.0, 0.0)));
        assert_eq!(pos(".j.b"), Some(Point::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn padding_takes_the_larger_of_own_and_children() {
        let element = PaddingElement::new("p", &attrs(&[("width", "10"), ("height", "0.25")]))
            .unwrap_or_else(|err| panic!("{err}"));
        let mut tree = RenderTree::new();
        render_box(&mut tree, ".p.a", 2.0, 1.0, 3.0);

        element.render(&path(".p"), &mut tree).unwrap_or_else(|err| panic!("{err}"));

        let geometry = tree.get(&path(".p")).unwrap_or_else(|| panic!("missing"));
        assert_eq!(geometry.bounds().width(), 10.0);
        assert_eq!(geometry.bounds().height(), 1.0);
        assert_eq!(geometry.bounds().depth(), 3.0);
        // The child stays put.
        let child = tree.get(&path(".p.a")).unwrap_or_else(|| panic!("missing child"));
        assert_eq!(child.pos(), Point::ZERO);
    }

    #[test]
    fn grid_places_four_children_in_a_square() {
        let element =
            GridElement::new("g", &attrs(&[("spacing", "1")])).unwrap_or_else(|err| panic!("{err}"));
        let mut tree = RenderTree::new();
        for name in ["a", "b", "c", "d"] {
            render_box(&mut tree, &format!(".g.{name}"), 2.0, 1.0, 3.0);
        }

        element.render(&path(".g"), &mut tree).unwrap_or_else(|err| panic!("{err}"));

        let pos = |p: &str| tree.get(&path(p)).map(Geometry::pos);
        assert_eq!(pos(".g.a"), Some(Point::ZERO));
        assert_eq!(pos(".g.b"), Some(Point::new(0.0, 0.0, 4.0)));
        assert_eq!(pos(".g.c"), Some(Point::new(3.0, 0.0, 0.0)));
        assert_eq!(pos(".g.d"), Some(Point::new(3.0, 0.0, 4.0)));
    }

    #[test]
    fn scale_fits_the_subtree_to_its_target() {
        let element = ScaleElement::new("s", &attrs(&[("width", "8")]))
            .unwrap_or_else(|err| panic!("{err}"));
        let mut tree = RenderTree::new();
        render_box(&mut tree, ".s.a", 2.0, 1.0, 1.0);

        element.render(&path(".s"), &mut tree).unwrap_or_else(|err| panic!("{err}"));

        let child = tree.get(&path(".s.a")).unwrap_or_else(|| panic!("missing"));
        assert_eq!(child.bounds().width(), 8.0);
        assert_eq!(child.bounds().height(), 4.0);
    }

    #[test]
    fn hide_show_raises_descendant_distances() {
        let element = HideShowElement::new(
            "h",
            &attrs(&[("hide_distance", "5"), ("clamp_descendant_hide_distances", "true")]),
        )
        .unwrap_or_else(|err| panic!("{err}"));
        let mut tree = RenderTree::new();
        render_box(&mut tree, ".h.a", 1.0, 1.0, 1.0);

        element.render(&path(".h"), &mut tree).unwrap_or_else(|err| panic!("{err}"));

        let child = tree.get(&path(".h.a")).unwrap_or_else(|| panic!("missing"));
        assert_eq!(child.hide_distance(), 5.0);
        assert_eq!(child.show_distance(), f32::INFINITY);
    }

    #[test]
    fn rotate_element_keeps_the_base_corner() {
        let element =
            RotateElement::new("r", &attrs(&[("angle", "90")])).unwrap_or_else(|err| panic!("{err}"));
        let mut tree = RenderTree::new();
        render_box(&mut tree, ".r.a", 2.0, 2.0, 2.0);
        if let Some(geometry) = tree.get(&path(".r.a")) {
            let mut moved = geometry.clone();
            moved.set_pos(Point::new(1.0, 0.0, 1.0));
            tree.update(path(".r.a"), moved);
        }

        let before = tree.positioned_bounds_of(&path(".r")).base();
        element.render(&path(".r"), &mut tree).unwrap_or_else(|err| panic!("{err}"));
        let after = tree.positioned_bounds_of(&path(".r")).base();

        assert!((after.x - before.x).abs() < 1e-3);
        assert!((after.y - before.y).abs() < 1e-3);
        assert!((after.z - before.z).abs() < 1e-3);
    }

    #[test]
    fn street_lays_houses_on_both_sides_and_stretches_the_street() {
        let element = StreetElement::new("s", &attrs(&[("spacing", "1")]))
            .unwrap_or_else(|err| panic!("{err}"));
        let mut tree = RenderTree::new();
        // Two houses, then the street (the last child).
        render_box(&mut tree, ".s.h1", 2.0, 1.0, 2.0);
        render_box(&mut tree, ".s.h2", 2.0, 1.0, 2.0);
        render_box(&mut tree, ".s.road", 1.0, 0.1, 1.0);

        element.render(&path(".s"), &mut tree).unwrap_or_else(|err| panic!("{err}"));

        let get = |p: &str| tree.get(&path(p)).unwrap_or_else(|| panic!("missing {p}"));
        // First house on the near side, second on the far side beyond the
        // street block.
        assert_eq!(get(".s.h1").pos().z, 0.0);
        assert!(get(".s.h2").positioned_bounds().base().z >= 2.0);
        // The street slots between the two house columns and is stretched
        // along x to cover the houses plus spacing.
        assert_eq!(get(".s.road").pos().z, 2.0);
        assert!(get(".s.road").bounds().width() > 2.9);
    }

    #[test]
    fn street_needs_at_least_two_children() {
        let element =
            StreetElement::new("s", &AttributeMap::new()).unwrap_or_else(|err| panic!("{err}"));
        let mut tree = RenderTree::new();
        render_box(&mut tree, ".s.road", 1.0, 0.1, 1.0);
        let before = tree.get(&path(".s.road")).map(Geometry::pos);

        element.render(&path(".s"), &mut tree).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(tree.get(&path(".s.road")).map(Geometry::pos), before);
    }
}
