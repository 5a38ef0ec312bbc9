//! Features: reusable collections of attribute values and the logic that
//! goes with them.
//!
//! Elements are assembled from features. Each feature parses its state from
//! a string attribute map (the key=value pairs of a visualization
//! description), round-trips that state back out, and publishes its
//! non-defaulted values into the ancestor scope during the render walk.

use std::collections::HashMap;

use crate::bounds::Bounds;
use crate::color::{DEFAULT_COLOR, Rgba};
use crate::coords::{Alignment, Axis, Point, UnitInterval};
use crate::error::{Error, Result};
use crate::path::Path;
use crate::render_tree::RenderTree;
use crate::rotation::Rotation;
use crate::value::{
    AncestorValues, AxisValue, AlignmentValue, BoolValue, ColorValue, FloatValue,
    RelativeFloatValue, RotationValue, StringValue, UnitIntervalValue,
    topological_sort_with_aliases,
};

/// String attributes as parsed from a visualization description element.
pub type AttributeMap = HashMap<String, String>;

/// Default extent used for every size axis.
pub const DEFAULT_LENGTH: f32 = 1.0;

/// Default tessellation detail for circular meshes.
pub const DEFAULT_DETAIL: f32 = 0.5;

fn parse_float(name: &str, value: &str) -> Result<f32> {
    value.parse::<f32>().map_err(|_| Error::InvalidAttribute {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// A label carried by a geometry; clients render it, the engine only
/// transports it.
#[derive(Debug, Clone)]
pub struct TextFeature {
    text: StringValue,
}

impl Default for TextFeature {
    fn default() -> Self {
        Self { text: StringValue::new("text", "text", String::new()) }
    }
}

impl TextFeature {
    /// Reads `text` from the attribute map.
    pub fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        if let Some(text) = attributes.get("text") {
            self.text.set_value(text.clone());
        }
        Ok(())
    }

    /// The string form of the feature state.
    pub fn attributes(&self) -> AttributeMap {
        AttributeMap::from([("text".to_string(), self.text.value())])
    }

    /// Publishes the text when set.
    pub fn compute_and_update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.text.update_ancestor_values(scope);
        Ok(())
    }

    /// Replaces the label text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text.set_value(text.into());
    }

    /// The label text.
    pub fn text(&self) -> String {
        self.text.value()
    }
}

/// Width, height, and depth, each possibly relative to an ancestor value.
#[derive(Debug, Clone)]
pub struct SizeFeature {
    width: RelativeFloatValue,
    height: RelativeFloatValue,
    depth: RelativeFloatValue,
}

impl Default for SizeFeature {
    fn default() -> Self {
        Self {
            width: RelativeFloatValue::new("width", "w", DEFAULT_LENGTH),
            height: RelativeFloatValue::new("height", "h", DEFAULT_LENGTH),
            depth: RelativeFloatValue::new("depth", "d", DEFAULT_LENGTH),
        }
    }
}

impl SizeFeature {
    /// Reads `width`/`w`, `height`/`h`, and `depth`/`d` from the map.
    pub fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        for (attribute_name, attribute_value) in attributes {
            if self.width.matches_attribute_name(attribute_name) {
                self.width.update_from_attribute(attribute_value)?;
            } else if self.height.matches_attribute_name(attribute_name) {
                self.height.update_from_attribute(attribute_value)?;
            } else if self.depth.matches_attribute_name(attribute_name) {
                self.depth.update_from_attribute(attribute_value)?;
            }
        }
        Ok(())
    }

    /// The string form of the feature state.
    pub fn attributes(&self) -> AttributeMap {
        AttributeMap::from([
            ("width".to_string(), self.width.attribute_string()),
            ("height".to_string(), self.height.attribute_string()),
            ("depth".to_string(), self.depth.attribute_string()),
        ])
    }

    /// Evaluates and publishes the three lengths in dependency order, so a
    /// length that is relative to a sibling length sees the sibling's
    /// already-published literal.
    pub fn compute_and_update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        let dependencies = [&self.width, &self.height, &self.depth]
            .into_iter()
            .map(|value| {
                (value.name().to_string(), value.relative_name().map(str::to_string))
            })
            .collect();
        let aliases = [&self.width, &self.height, &self.depth]
            .into_iter()
            .map(|value| (value.abbreviation().to_string(), value.name().to_string()))
            .collect();
        let ordered_names = topological_sort_with_aliases(&dependencies, &aliases)?;

        for name in &ordered_names {
            match name.as_str() {
                "width" => self.width.update_ancestor_values(scope)?,
                "height" => self.height.update_ancestor_values(scope)?,
                "depth" => self.depth.update_ancestor_values(scope)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Sets the width, clamped below at zero.
    pub fn set_width(&mut self, width: f32) {
        self.width.set_value(width.max(0.0));
    }

    /// The current width.
    pub fn width(&self) -> f32 {
        self.width.value()
    }

    /// True until a width is given.
    pub fn width_is_defaulted(&self) -> bool {
        self.width.is_defaulted()
    }

    /// Sets the height, clamped below at zero.
    pub fn set_height(&mut self, height: f32) {
        self.height.set_value(height.max(0.0));
    }

    /// The current height.
    pub fn height(&self) -> f32 {
        self.height.value()
    }

    /// True until a height is given.
    pub fn height_is_defaulted(&self) -> bool {
        self.height.is_defaulted()
    }

    /// Sets the depth, clamped below at zero.
    pub fn set_depth(&mut self, depth: f32) {
        self.depth.set_value(depth.max(0.0));
    }

    /// The current depth.
    pub fn depth(&self) -> f32 {
        self.depth.value()
    }

    /// True until a depth is given.
    pub fn depth_is_defaulted(&self) -> bool {
        self.depth.is_defaulted()
    }

    /// `(width, height, depth)`.
    pub fn lengths(&self) -> (f32, f32, f32) {
        (self.width(), self.height(), self.depth())
    }

    /// The length along one axis.
    pub fn axis_length(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.width(),
            Axis::Y => self.height(),
            Axis::Z => self.depth(),
        }
    }

    /// True until the length along `axis` is given.
    pub fn axis_length_is_defaulted(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.width_is_defaulted(),
            Axis::Y => self.height_is_defaulted(),
            Axis::Z => self.depth_is_defaulted(),
        }
    }
}

/// Base color plus a darkening factor.
#[derive(Debug, Clone)]
pub struct ColorFeature {
    color: ColorValue,
    darkness: UnitIntervalValue,
}

impl Default for ColorFeature {
    fn default() -> Self {
        Self {
            color: ColorValue::new("color", "c", DEFAULT_COLOR),
            darkness: UnitIntervalValue::new("darkness", "darkness", UnitInterval::new(0.0)),
        }
    }
}

impl ColorFeature {
    /// Reads `color` (palette name or RGBA literal) and `darkness`.
    pub fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        if let Some(value) = attributes.get("color") {
            self.color.set_value(Rgba::from_string(value, 1.0)?);
        }
        if let Some(value) = attributes.get("darkness") {
            self.darkness.set_value(UnitInterval::new(parse_float("darkness", value)?));
        }
        Ok(())
    }

    /// The string form of the feature state.
    pub fn attributes(&self) -> AttributeMap {
        AttributeMap::from([
            ("color".to_string(), self.color.value().to_string()),
            ("darkness".to_string(), self.darkness.value().to_string()),
        ])
    }

    /// Publishes the color when set.
    pub fn compute_and_update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.color.update_ancestor_values(scope);
        Ok(())
    }

    /// Replaces the base color.
    pub fn set_color(&mut self, color: Rgba) {
        self.color.set_value(color);
    }

    /// The base color.
    pub fn color(&self) -> Rgba {
        self.color.value()
    }

    /// Sets the darkening factor (clamped to [0, 1]).
    pub fn set_darkness(&mut self, darkness: f32) {
        self.darkness.set_value(UnitInterval::new(darkness));
    }

    /// The darkening factor.
    pub fn darkness(&self) -> f32 {
        self.darkness.value().value()
    }

    /// The base color with `opacity` applied and the darkness factored in.
    pub fn compute_color(&self, opacity: f32) -> Rgba {
        let mut color = self.color();
        color.set_opacity(opacity);
        color.darken_by(self.darkness());
        color
    }
}

/// Mesh opacity.
#[derive(Debug, Clone)]
pub struct OpticsFeature {
    opacity: UnitIntervalValue,
}

impl Default for OpticsFeature {
    fn default() -> Self {
        Self { opacity: UnitIntervalValue::new("opacity", "o", UnitInterval::new(1.0)) }
    }
}

impl OpticsFeature {
    /// Reads `opacity` from the map.
    pub fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        if let Some(value) = attributes.get("opacity") {
            self.opacity.set_value(UnitInterval::new(parse_float("opacity", value)?));
        }
        Ok(())
    }

    /// The string form of the feature state.
    pub fn attributes(&self) -> AttributeMap {
        AttributeMap::from([("opacity".to_string(), self.opacity.value().to_string())])
    }

    /// Publishes the opacity when set.
    pub fn compute_and_update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.opacity.update_ancestor_values(scope);
        Ok(())
    }

    /// Sets the opacity (clamped to [0, 1]).
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity.set_value(UnitInterval::new(opacity));
    }

    /// The opacity as a plain float.
    pub fn opacity(&self) -> f32 {
        self.opacity.value().value()
    }
}

/// Camera-distance visibility plus flags for clamping descendants.
#[derive(Debug, Clone)]
pub struct HideShowFeature {
    hide_distance: FloatValue,
    show_distance: FloatValue,
    clamp_descendant_hide_distances: BoolValue,
    clamp_descendant_show_distances: BoolValue,
}

impl Default for HideShowFeature {
    fn default() -> Self {
        Self {
            hide_distance: FloatValue::new("hide_distance", "hide_distance", 0.0),
            show_distance: FloatValue::new("show_distance", "show_distance", f32::INFINITY),
            clamp_descendant_hide_distances: BoolValue::new(
                "clamp_descendant_hide_distances",
                "clamp_descendant_hide_distances",
                false,
            ),
            clamp_descendant_show_distances: BoolValue::new(
                "clamp_descendant_show_distances",
                "clamp_descendant_show_distances",
                false,
            ),
        }
    }
}

impl HideShowFeature {
    /// Reads the two distances and the two clamp flags from the map.
    pub fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        if let Some(value) = attributes.get("hide_distance") {
            self.hide_distance.set_value(parse_float("hide_distance", value)?);
        }
        if let Some(value) = attributes.get("show_distance") {
            self.show_distance.set_value(parse_float("show_distance", value)?);
        }
        if let Some(value) = attributes.get("clamp_descendant_hide_distances") {
            self.clamp_descendant_hide_distances.set_value(value == "true");
        }
        if let Some(value) = attributes.get("clamp_descendant_show_distances") {
            self.clamp_descendant_show_distances.set_value(value == "true");
        }
        Ok(())
    }

    /// The string form of the feature state.
    pub fn attributes(&self) -> AttributeMap {
        AttributeMap::from([
            ("hide_distance".to_string(), self.hide_distance.value().to_string()),
            ("show_distance".to_string(), self.show_distance.value().to_string()),
        ])
    }

    /// Publishes the distances when set.
    pub fn compute_and_update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.hide_distance.update_ancestor_values(scope);
        self.show_distance.update_ancestor_values(scope);
        Ok(())
    }

    /// Sets the hide distance.
    pub fn set_hide_distance(&mut self, distance: f32) {
        self.hide_distance.set_value(distance);
    }

    /// The hide distance.
    pub fn hide_distance(&self) -> f32 {
        self.hide_distance.value()
    }

    /// Sets the show distance.
    pub fn set_show_distance(&mut self, distance: f32) {
        self.show_distance.set_value(distance);
    }

    /// The show distance.
    pub fn show_distance(&self) -> f32 {
        self.show_distance.value()
    }

    /// `(hide_distance, show_distance)`.
    pub fn hide_and_show_distances(&self) -> (f32, f32) {
        (self.hide_distance(), self.show_distance())
    }

    /// Whether descendants' hide distances are raised to this feature's.
    pub fn clamp_descendant_hide_distances(&self) -> bool {
        self.clamp_descendant_hide_distances.value()
    }

    /// Sets the hide-distance clamp flag.
    pub fn set_clamp_descendant_hide_distances(&mut self, should: bool) {
        self.clamp_descendant_hide_distances.set_value(should);
    }

    /// Whether descendants' show distances are raised to this feature's.
    pub fn clamp_descendant_show_distances(&self) -> bool {
        self.clamp_descendant_show_distances.value()
    }

    /// Sets the show-distance clamp flag.
    pub fn set_clamp_descendant_show_distances(&mut self, should: bool) {
        self.clamp_descendant_show_distances.set_value(should);
    }
}

/// A rotation attribute, given either as a single yaw angle or as full
/// yaw/pitch/roll.
#[derive(Debug, Clone)]
pub struct RotateFeature {
    rotation: RotationValue,
}

impl Default for RotateFeature {
    fn default() -> Self {
        Self { rotation: RotationValue::new("rotation", "rotation", Rotation::none()) }
    }
}

impl RotateFeature {
    /// Reads `angle`/`degrees` (yaw only) or `yaw`/`pitch`/`roll`.
    pub fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        if let Some(value) = attributes.get("angle").or_else(|| attributes.get("degrees")) {
            self.rotation.set_value(Rotation::from_degrees(parse_float("angle", value)?));
            return Ok(());
        }

        let current = self.rotation.value();
        let mut yaw = current.yaw();
        let mut pitch = current.pitch();
        let mut roll = current.roll();
        let mut any_given = false;
        if let Some(value) = attributes.get("yaw") {
            yaw = parse_float("yaw", value)?;
            any_given = true;
        }
        if let Some(value) = attributes.get("pitch") {
            pitch = parse_float("pitch", value)?;
            any_given = true;
        }
        if let Some(value) = attributes.get("roll") {
            roll = parse_float("roll", value)?;
            any_given = true;
        }
        if any_given {
            self.rotation.set_value(Rotation::from_angles(yaw, pitch, roll));
        }
        Ok(())
    }

    /// The string form of the feature state: only non-zero angles.
    pub fn attributes(&self) -> AttributeMap {
        let rotation = self.rotation.value();
        let mut attributes = AttributeMap::new();
        if rotation.yaw() != 0.0 {
            attributes.insert("yaw".to_string(), rotation.yaw().to_string());
        }
        if rotation.pitch() != 0.0 {
            attributes.insert("pitch".to_string(), rotation.pitch().to_string());
        }
        if rotation.roll() != 0.0 {
            attributes.insert("roll".to_string(), rotation.roll().to_string());
        }
        attributes
    }

    /// Publishes the rotation when set.
    pub fn compute_and_update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.rotation.update_ancestor_values(scope);
        Ok(())
    }

    /// Replaces the rotation.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation.set_value(rotation);
    }

    /// The current rotation.
    pub fn rotation(&self) -> Rotation {
        self.rotation.value()
    }
}

/// Uniform padding around descendants.
#[derive(Debug, Clone)]
pub struct PaddingFeature {
    padding: RelativeFloatValue,
}

impl Default for PaddingFeature {
    fn default() -> Self {
        Self { padding: RelativeFloatValue::new("padding", "p", 0.0) }
    }
}

impl PaddingFeature {
    /// Reads `padding` from the map.
    pub fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        if let Some(value) = attributes.get("padding") {
            self.padding.set_value(parse_float("padding", value)?);
        }
        Ok(())
    }

    /// The string form of the feature state.
    pub fn attributes(&self) -> AttributeMap {
        AttributeMap::from([("padding".to_string(), self.padding.attribute_string())])
    }

    /// Publishes the padding when set.
    pub fn compute_and_update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.padding.update_ancestor_values(scope)
    }

    /// Sets the padding.
    pub fn set_padding(&mut self, padding: f32) {
        self.padding.set_value(padding);
    }

    /// The padding.
    pub fn padding(&self) -> f32 {
        self.padding.value()
    }
}

/// Gap inserted between laid-out children.
#[derive(Debug, Clone)]
pub struct SpacingFeature {
    spacing: RelativeFloatValue,
}

impl Default for SpacingFeature {
    fn default() -> Self {
        Self { spacing: RelativeFloatValue::new("spacing", "s", 0.0) }
    }
}

impl SpacingFeature {
    /// Reads `spacing` from the map.
    pub fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        if let Some(value) = attributes.get("spacing") {
            self.spacing.set_value(parse_float("spacing", value)?);
        }
        Ok(())
    }

    /// The string form of the feature state.
    pub fn attributes(&self) -> AttributeMap {
        AttributeMap::from([("spacing".to_string(), self.spacing.attribute_string())])
    }

    /// Publishes the spacing when set.
    pub fn compute_and_update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.spacing.update_ancestor_values(scope)
    }

    /// Sets the spacing.
    pub fn set_spacing(&mut self, spacing: f32) {
        self.spacing.set_value(spacing);
    }

    /// The spacing.
    pub fn spacing(&self) -> f32 {
        self.spacing.value()
    }
}

/// The axis a layout sweeps along.
#[derive(Debug, Clone)]
pub struct AxisFeature {
    axis: AxisValue,
}

impl Default for AxisFeature {
    fn default() -> Self {
        Self { axis: AxisValue::new("axis", "axis", Axis::X) }
    }
}

impl AxisFeature {
    /// Reads `axis` from the map.
    pub fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        if let Some(value) = attributes.get("axis") {
            self.axis.set_value(value.parse()?);
        }
        Ok(())
    }

    /// The string form of the feature state.
    pub fn attributes(&self) -> AttributeMap {
        AttributeMap::from([("axis".to_string(), self.axis.value().to_string())])
    }

    /// Publishes the axis when set.
    pub fn compute_and_update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.axis.update_ancestor_values(scope);
        Ok(())
    }

    /// Sets the axis.
    pub fn set_axis(&mut self, axis: Axis) {
        self.axis.set_value(axis);
    }

    /// The axis.
    pub fn axis(&self) -> Axis {
        self.axis.value()
    }

    /// True until an axis is given.
    pub fn axis_is_defaulted(&self) -> bool {
        self.axis.is_defaulted()
    }
}

/// Perpendicular alignment of laid-out children.
#[derive(Debug, Clone)]
pub struct AlignFeature {
    alignment: AlignmentValue,
}

impl Default for AlignFeature {
    fn default() -> Self {
        Self { alignment: AlignmentValue::new("align", "align", Alignment::Center) }
    }
}

impl AlignFeature {
    /// Reads `align` from the map.
    pub fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        if let Some(value) = attributes.get("align") {
            self.alignment.set_value(value.parse()?);
        }
        Ok(())
    }

    /// The string form of the feature state.
    pub fn attributes(&self) -> AttributeMap {
        AttributeMap::from([("align".to_string(), self.alignment.value().to_string())])
    }

    /// Publishes the alignment when set.
    pub fn compute_and_update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.alignment.update_ancestor_values(scope);
        Ok(())
    }

    /// Sets the alignment.
    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment.set_value(alignment);
    }

    /// The alignment.
    pub fn alignment(&self) -> Alignment {
        self.alignment.value()
    }
}

/// Radius plus tessellation detail for circular meshes.
#[derive(Debug, Clone)]
pub struct CircularFeature {
    radius: RelativeFloatValue,
    detail: FloatValue,
}

impl Default for CircularFeature {
    fn default() -> Self {
        Self {
            radius: RelativeFloatValue::new("radius", "r", 1.0),
            detail: FloatValue::new("detail", "detail", DEFAULT_DETAIL),
        }
    }
}

impl CircularFeature {
    /// Reads `radius` and `detail` from the map.
    pub fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        if let Some(value) = attributes.get("radius") {
            self.radius.set_value(parse_float("radius", value)?);
        }
        if let Some(value) = attributes.get("detail") {
            self.detail.set_value(UnitInterval::new(parse_float("detail", value)?).value());
        }
        Ok(())
    }

    /// The string form of the feature state.
    pub fn attributes(&self) -> AttributeMap {
        AttributeMap::from([
            ("radius".to_string(), self.radius.attribute_string()),
            ("detail".to_string(), self.detail.value().to_string()),
        ])
    }

    /// Publishes the radius and detail when set.
    pub fn compute_and_update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.radius.update_ancestor_values(scope)?;
        self.detail.update_ancestor_values(scope);
        Ok(())
    }

    /// Sets the radius.
    pub fn set_radius(&mut self, radius: f32) {
        self.radius.set_value(radius);
    }

    /// The radius.
    pub fn radius(&self) -> f32 {
        self.radius.value()
    }

    /// Sets the detail (clamped to [0, 1]).
    pub fn set_detail(&mut self, detail: f32) {
        self.detail.set_value(UnitInterval::new(detail).value());
    }

    /// The detail.
    pub fn detail(&self) -> f32 {
        self.detail.value()
    }

    /// Slice count for circular tessellation. The formula grows gently with
    /// radius so large shapes stay round without slice blowup at full
    /// detail; 10 is the bare minimum that still reads as a circle.
    pub fn num_circular_slices(&self) -> usize {
        ((self.detail() + 1.0).sqrt().log10() * self.radius() + 10.0) as usize
    }
}

/// Size plus axis: the inputs to uniform scale-factor computation.
#[derive(Debug, Clone, Default)]
pub struct ScaleFeatureSet {
    size: SizeFeature,
    axis: AxisFeature,
}

impl ScaleFeatureSet {
    /// Reads the size and axis attributes from the map.
    pub fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.size.update_from_attributes(attributes)?;
        self.axis.update_from_attributes(attributes)
    }

    /// The string form of the combined feature state.
    pub fn attributes(&self) -> AttributeMap {
        let mut attributes = self.size.attributes();
        attributes.extend(self.axis.attributes());
        attributes
    }

    /// Publishes both features.
    pub fn compute_and_update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.size.compute_and_update_ancestor_values(scope)?;
        self.axis.compute_and_update_ancestor_values(scope)
    }

    /// The size feature.
    pub fn size(&self) -> &SizeFeature {
        &self.size
    }

    /// Mutable access to the size feature.
    pub fn size_mut(&mut self) -> &mut SizeFeature {
        &mut self.size
    }

    /// The axis feature.
    pub fn axis(&self) -> &AxisFeature {
        &self.axis
    }

    /// Mutable access to the axis feature.
    pub fn axis_mut(&mut self) -> &mut AxisFeature {
        &mut self.axis
    }

    /// The uniform factor that scales a mesh of the given extents toward the
    /// declared target lengths.
    ///
    /// Axes that were never given a target, or whose current extent is not a
    /// normal positive number, contribute no factor. With no axis declared
    /// the most conservative (smallest) finite factor wins, falling back to
    /// 1; with a declared axis that axis' factor is used directly.
    pub fn compute_scale_factor(&self, width: f32, height: f32, depth: f32) -> f32 {
        let unconstrained_width = self.size.width_is_defaulted();
        let unconstrained_height = self.size.height_is_defaulted();
        let unconstrained_depth = self.size.depth_is_defaulted();
        if unconstrained_width && unconstrained_height && unconstrained_depth {
            return 1.0;
        }

        let (target_width, target_height, target_depth) = self.size.lengths();
        let inf = f32::INFINITY;
        let width_factor = if unconstrained_width || !width.is_normal() {
            inf
        } else {
            target_width / width
        };
        let height_factor = if unconstrained_height || !height.is_normal() {
            inf
        } else {
            target_height / height
        };
        let depth_factor = if unconstrained_depth || !depth.is_normal() {
            inf
        } else {
            target_depth / depth
        };

        if self.axis.axis_is_defaulted() {
            let factor = width_factor.min(height_factor).min(depth_factor);
            return if factor == inf { 1.0 } else { factor };
        }

        match self.axis.axis() {
            Axis::X => width_factor,
            Axis::Y => height_factor,
            Axis::Z => depth_factor,
        }
    }
}

/// Size, axis, spacing, and alignment: the inputs to sweep layout.
#[derive(Debug, Clone, Default)]
pub struct JuxtaposeFeatureSet {
    size: SizeFeature,
    axis: AxisFeature,
    spacing: SpacingFeature,
    align: AlignFeature,
}

impl JuxtaposeFeatureSet {
    /// Reads all four features from the map.
    pub fn update_from_attributes(&mut self, attributes: &AttributeMap) -> Result<()> {
        self.size.update_from_attributes(attributes)?;
        self.axis.update_from_attributes(attributes)?;
        self.spacing.update_from_attributes(attributes)?;
        self.align.update_from_attributes(attributes)
    }

    /// The string form of the combined feature state.
    pub fn attributes(&self) -> AttributeMap {
        let mut attributes = self.size.attributes();
        attributes.extend(self.axis.attributes());
        attributes.extend(self.spacing.attributes());
        attributes.extend(self.align.attributes());
        attributes
    }

    /// Publishes all four features.
    pub fn compute_and_update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        self.size.compute_and_update_ancestor_values(scope)?;
        self.axis.compute_and_update_ancestor_values(scope)?;
        self.spacing.compute_and_update_ancestor_values(scope)?;
        self.align.compute_and_update_ancestor_values(scope)
    }

    /// The size feature.
    pub fn size(&self) -> &SizeFeature {
        &self.size
    }

    /// Mutable access to the size feature.
    pub fn size_mut(&mut self) -> &mut SizeFeature {
        &mut self.size
    }

    /// The axis feature.
    pub fn axis(&self) -> &AxisFeature {
        &self.axis
    }

    /// Mutable access to the axis feature.
    pub fn axis_mut(&mut self) -> &mut AxisFeature {
        &mut self.axis
    }

    /// The spacing feature.
    pub fn spacing(&self) -> &SpacingFeature {
        &self.spacing
    }

    /// Mutable access to the spacing feature.
    pub fn spacing_mut(&mut self) -> &mut SpacingFeature {
        &mut self.spacing
    }

    /// The align feature.
    pub fn align_feature(&self) -> &AlignFeature {
        &self.align
    }

    /// Mutable access to the align feature.
    pub fn align_feature_mut(&mut self) -> &mut AlignFeature {
        &mut self.align
    }

    /// Sweeps the subtrees at `paths` along the axis, advancing the cursor
    /// by each subtree's extent plus spacing (no spacing after the last).
    pub fn juxtapose(&self, paths: &[Path], render_tree: &mut RenderTree) {
        let our_axis = self.axis.axis();
        let our_spacing = self.spacing.spacing();
        let mut offset_pt = Point::ZERO;

        for (index, path) in paths.iter().enumerate() {
            let bounds = render_tree.positioned_bounds_of(path).strip_pos();
            render_tree.move_parent_and_descendants_by(path, offset_pt);

            let spacing = if index != paths.len() - 1 { our_spacing } else { 0.0 };
            offset_pt[our_axis] += bounds.axis_length(our_axis) + spacing;
        }
    }

    /// Distributes the surplus between the declared axis length and the
    /// union of the children as equal offsets at both ends.
    pub fn center_within_axis_length(
        &self,
        paths: &[Path],
        render_tree: &mut RenderTree,
        our_axis: Axis,
    ) {
        if paths.is_empty() {
            return;
        }

        let mut total_bounds = Bounds::default();
        for path in paths {
            total_bounds += render_tree.positioned_bounds_of(path);
        }

        let total_length = total_bounds.axis_length(our_axis);
        let target_length = self.size.axis_length(our_axis);
        let remaining_space = target_length - total_length;

        let mut offset = Point::ZERO;
        offset[our_axis] = remaining_space / 2.0;
        for path in paths {
            render_tree.move_parent_and_descendants_by(path, offset);
        }
    }

    /// Shifts each subtree on the axes orthogonal to `our_axis` so it sits
    /// at the left/center/right of `total_pos_bounds`. Subtrees without any
    /// bounds are left alone.
    pub fn align(
        &self,
        paths: &[Path],
        render_tree: &mut RenderTree,
        total_pos_bounds: &Bounds,
        our_axis: Axis,
        our_alignment: Alignment,
    ) {
        for path in paths {
            let pos_bounds = render_tree.positioned_bounds_of(path);
            if pos_bounds == Bounds::default() {
                continue;
            }

            let mut offset = Point::ZERO;
            match our_axis {
                Axis::X => {
                    offset.z +=
                        offset_from_alignment(our_alignment, Axis::Z, &pos_bounds, total_pos_bounds);
                }
                Axis::Y => {
                    offset.x +=
                        offset_from_alignment(our_alignment, Axis::X, &pos_bounds, total_pos_bounds);
                    offset.z +=
                        offset_from_alignment(our_alignment, Axis::Z, &pos_bounds, total_pos_bounds);
                }
                Axis::Z => {
                    offset.x +=
                        offset_from_alignment(our_alignment, Axis::X, &pos_bounds, total_pos_bounds);
                }
            }

            render_tree.move_parent_and_descendants_by(path, offset);
        }
    }

    /// The union of the geometries at `paths`, with any declared length
    /// overriding the corresponding extent from the base.
    pub fn positioned_bounds_with_provided_lengths(
        &self,
        paths: &[Path],
        render_tree: &RenderTree,
    ) -> Bounds {
        let mut total_bounds = Bounds::default();
        for path in paths {
            if let Some(geometry) = render_tree.get(path) {
                total_bounds += geometry.positioned_bounds();
            }
        }

        let base = total_bounds.base();
        let mut end = total_bounds.end();
        if !self.size.width_is_defaulted() {
            end.x = base.x + self.size.width();
            total_bounds = Bounds::new(base, end);
        }
        if !self.size.height_is_defaulted() {
            end.y = base.y + self.size.height();
            total_bounds = Bounds::new(base, end);
        }
        if !self.size.depth_is_defaulted() {
            end.z = base.z + self.size.depth();
            total_bounds = Bounds::new(base, end);
        }
        total_bounds
    }
}

fn offset_from_alignment(
    align: Alignment,
    axis: Axis,
    bounds: &Bounds,
    total_bounds: &Bounds,
) -> f32 {
    match align {
        Alignment::Left => total_bounds.bottom_left()[axis] - bounds.bottom_left()[axis],
        Alignment::Right => total_bounds.bottom_right()[axis] - bounds.bottom_right()[axis],
        Alignment::Center => total_bounds.center()[axis] - bounds.center()[axis],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    fn attrs(pairs: &[(&str, &str)]) -> AttributeMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn size_feature_resolves_sibling_relative_lengths() {
        let mut size = SizeFeature::default();
        size.update_from_attributes(&attrs(&[("width", "2h"), ("height", "5")]))
            .unwrap_or_else(|err| panic!("{err}"));

        let mut scope = AncestorValues::new();
        size.compute_and_update_ancestor_values(&mut scope)
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(size.width(), 10.0);
        assert_eq!(scope.get_float("width").ok(), Some(10.0));
        assert_eq!(scope.get_float("h").ok(), Some(5.0));
    }

    #[test]
    fn size_feature_detects_cycles() {
        let mut size = SizeFeature::default();
        size.update_from_attributes(&attrs(&[("width", "100%h"), ("height", "50w")]))
            .unwrap_or_else(|err| panic!("{err}"));

        let mut scope = AncestorValues::new();
        assert!(matches!(
            size.compute_and_update_ancestor_values(&mut scope),
            Err(Error::AttributeCycle(_))
        ));
    }

    #[test]
    fn size_setters_clamp_below_zero() {
        let mut size = SizeFeature::default();
        size.set_width(-2.0);
        assert_eq!(size.width(), 0.0);
        assert!(!size.width_is_defaulted());
        assert!(size.height_is_defaulted());
    }

    #[test]
    fn color_feature_computes_darkened_color() {
        let mut color = ColorFeature::default();
        color
            .update_from_attributes(&attrs(&[("color", "(200, 100, 50)"), ("darkness", "0.5")]))
            .unwrap_or_else(|err| panic!("{err}"));
        let computed = color.compute_color(0.5);
        assert_eq!((computed.r, computed.g, computed.b), (100, 50, 25));
        assert_eq!(computed.a, 127);
    }

    #[test]
    fn hide_show_parses_flags() {
        let mut feature = HideShowFeature::default();
        feature
            .update_from_attributes(&attrs(&[
                ("hide_distance", "3"),
                ("clamp_descendant_hide_distances", "true"),
            ]))
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(feature.hide_distance(), 3.0);
        assert!(feature.clamp_descendant_hide_distances());
        assert!(!feature.clamp_descendant_show_distances());
        assert_eq!(feature.show_distance(), f32::INFINITY);
    }

    #[test]
    fn rotate_feature_prefers_single_angle() {
        let mut feature = RotateFeature::default();
        feature
            .update_from_attributes(&attrs(&[("angle", "90"), ("pitch", "45")]))
            .unwrap_or_else(|err| panic!("{err}"));
        assert!((feature.rotation().yaw() - 90.0).abs() < 0.1);
        assert!(feature.rotation().pitch().abs() < 0.1);
    }

    #[test]
    fn circular_slices_grow_gently_and_bottom_out_at_ten() {
        let feature = CircularFeature::default();
        assert_eq!(feature.num_circular_slices(), 10);

        let mut big = CircularFeature::default();
        big.set_radius(100.0);
        big.set_detail(1.0);
        let slices = big.num_circular_slices();
        assert!(slices >= 10);
        assert!(slices < 100);
    }

    #[test]
    fn scale_factor_defaults_to_identity() {
        let set = ScaleFeatureSet::default();
        assert_eq!(set.compute_scale_factor(3.0, 4.0, 5.0), 1.0);
    }

    #[test]
    fn scale_factor_takes_the_minimum_finite_factor() {
        let mut set = ScaleFeatureSet::default();
        set.size_mut().set_width(10.0);
        set.size_mut().set_height(2.0);
        // width factor 10/5 = 2, height factor 2/4 = 0.5, depth unconstrained.
        assert_eq!(set.compute_scale_factor(5.0, 4.0, 3.0), 0.5);
    }

    #[test]
    fn scale_factor_follows_a_declared_axis() {
        let mut set = ScaleFeatureSet::default();
        set.size_mut().set_width(10.0);
        set.size_mut().set_height(2.0);
        set.axis_mut().set_axis(Axis::X);
        assert_eq!(set.compute_scale_factor(5.0, 4.0, 3.0), 2.0);
    }

    #[test]
    fn scale_factor_ignores_degenerate_axes() {
        let mut set = ScaleFeatureSet::default();
        set.size_mut().set_width(10.0);
        // Current width of zero cannot produce a factor; fall back to 1.
        assert_eq!(set.compute_scale_factor(0.0, 4.0, 3.0), 1.0);
    }

    fn tree_with_children(widths: &[f32]) -> (RenderTree, Vec<Path>) {
        let mut tree = RenderTree::new();
        let mut paths = Vec::new();
        for (index, width) in widths.iter().enumerate() {
            let path: Path = format!(".j.c{index}").parse().unwrap_or_else(|err| panic!("{err}"));
            let geometry = Geometry::from_mesh(
                vec![
                    Point::ZERO,
                    Point::new(*width, 0.0, 0.0),
                    Point::new(*width, 1.0, 1.0),
                ],
                vec![[0, 1, 2]],
                Point::ZERO,
            );
            tree.update(path.clone(), geometry);
            paths.push(path);
        }
        (tree, paths)
    }

    #[test]
    fn juxtapose_sweeps_with_spacing_between() {
        let mut set = JuxtaposeFeatureSet::default();
        set.spacing_mut().set_spacing(1.0);
        let (mut tree, paths) = tree_with_children(&[2.0, 3.0, 1.0]);

        set.juxtapose(&paths, &mut tree);

        let pos =
            |path: &Path| tree.get(path).map(Geometry::pos).unwrap_or_else(|| panic!("missing"));
        assert_eq!(pos(&paths[0]), Point::ZERO);
        assert_eq!(pos(&paths[1]), Point::new(3.0, 0.0, 0.0));
        assert_eq!(pos(&paths[2]), Point::new(7.0, 0.0, 0.0));
    }

    #[test]
    fn center_within_axis_length_splits_the_surplus() {
        let mut set = JuxtaposeFeatureSet::default();
        set.size_mut().set_width(10.0);
        let (mut tree, paths) = tree_with_children(&[2.0, 2.0]);
        set.juxtapose(&paths, &mut tree);
        set.center_within_axis_length(&paths, &mut tree, Axis::X);

        let pos =
            |path: &Path| tree.get(path).map(Geometry::pos).unwrap_or_else(|| panic!("missing"));
        // 10 - 4 = 6 surplus, 3 at each end.
        assert_eq!(pos(&paths[0]), Point::new(3.0, 0.0, 0.0));
        assert_eq!(pos(&paths[1]), Point::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn align_left_keeps_children_on_the_base_edge() {
        let set = JuxtaposeFeatureSet::default();
        let (mut tree, paths) = tree_with_children(&[2.0, 2.0]);
        // Make the second child deeper than the first.
        if let Some(geometry) = tree.get(&paths[1]) {
            let mut deeper = geometry.clone();
            deeper.set_pos(Point::new(3.0, 0.0, 0.0));
            tree.update(paths[1].clone(), deeper);
        }

        let total = set.positioned_bounds_with_provided_lengths(&paths, &tree);
        set.align(&paths, &mut tree, &total, Axis::X, Alignment::Left);

        let pos =
            |path: &Path| tree.get(path).map(Geometry::pos).unwrap_or_else(|| panic!("missing"));
        // Both children already share the total's base z.
        assert_eq!(pos(&paths[0]).z, 0.0);
        assert_eq!(pos(&paths[1]).z, 0.0);
    }

    #[test]
    fn provided_lengths_override_the_union() {
        let mut set = JuxtaposeFeatureSet::default();
        set.size_mut().set_width(20.0);
        let (tree, paths) = tree_with_children(&[2.0, 3.0]);
        let bounds = set.positioned_bounds_with_provided_lengths(&paths, &tree);
        assert_eq!(bounds.width(), 20.0);
        assert_eq!(bounds.height(), 1.0);
    }
}
