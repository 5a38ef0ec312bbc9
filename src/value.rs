//! Typed attribute values, ancestor-value scope, and relative-value
//! arithmetic.
//!
//! Elements hold their attributes as typed values with a *defaulted* flag;
//! only values a user actually set propagate into the [`AncestorValues`]
//! scope that the renderer carries down the tree. Numeric attributes may be
//! *relative*, defined against an ancestor's published value (optionally as
//! a percentage), and inter-attribute dependencies are resolved with a
//! topological sort so each relative target is evaluated first.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use crate::color::Rgba;
use crate::coords::{Alignment, Axis, UnitInterval};
use crate::error::{Error, Result};
use crate::rotation::Rotation;

/// Types that can live in the ancestor-value scope.
pub trait ScopeValue: Clone {
    /// Human-readable type name used in lookup failure messages.
    const TYPE_NAME: &'static str;

    /// Wraps the value into a scope payload.
    fn into_payload(self) -> ScopePayload;

    /// Unwraps a payload of this type, if it is one.
    fn from_payload(payload: &ScopePayload) -> Option<&Self>;
}

/// A type-erased value held in the ancestor scope.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopePayload {
    /// Plain float.
    Float(f32),
    /// Clamped unit-interval float.
    UnitInterval(UnitInterval),
    /// Boolean flag.
    Bool(bool),
    /// Integer.
    Int(i32),
    /// Text.
    Text(String),
    /// Color.
    Color(Rgba),
    /// Rotation.
    Rotation(Rotation),
    /// Axis choice.
    Axis(Axis),
    /// Alignment choice.
    Alignment(Alignment),
}

macro_rules! impl_scope_value {
    ($type:ty, $variant:ident, $name:literal) => {
        impl ScopeValue for $type {
            const TYPE_NAME: &'static str = $name;

            fn into_payload(self) -> ScopePayload {
                ScopePayload::$variant(self)
            }

            fn from_payload(payload: &ScopePayload) -> Option<&Self> {
                match payload {
                    ScopePayload::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}

impl_scope_value!(f32, Float, "float");
impl_scope_value!(UnitInterval, UnitInterval, "unit_interval");
impl_scope_value!(bool, Bool, "bool");
impl_scope_value!(i32, Int, "int");
impl_scope_value!(String, Text, "string");
impl_scope_value!(Rgba, Color, "color");
impl_scope_value!(Rotation, Rotation, "rotation");
impl_scope_value!(Axis, Axis, "axis");
impl_scope_value!(Alignment, Alignment, "alignment");

/// An attribute value of type `T` with a name, a short abbreviation, and a
/// defaulted flag. Setting a value always clears the flag; only
/// non-defaulted values are published to the ancestor scope.
#[derive(Debug, Clone)]
pub struct TypedValue<T> {
    name: &'static str,
    abbreviation: &'static str,
    value: T,
    defaulted: bool,
}

impl<T: Clone> TypedValue<T> {
    /// Builds a defaulted value.
    pub fn new(name: &'static str, abbreviation: &'static str, default_value: T) -> Self {
        Self { name, abbreviation, value: default_value, defaulted: true }
    }

    /// The full attribute name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The short attribute name.
    pub fn abbreviation(&self) -> &'static str {
        self.abbreviation
    }

    /// True iff `attribute` is the full or abbreviated name.
    pub fn matches_attribute_name(&self, attribute: &str) -> bool {
        attribute == self.name || attribute == self.abbreviation
    }

    /// The current value.
    pub fn value(&self) -> T {
        self.value.clone()
    }

    /// Replaces the value and clears the defaulted flag.
    pub fn set_value(&mut self, value: T) {
        self.value = value;
        self.defaulted = false;
    }

    /// True until the first `set_value`.
    pub fn is_defaulted(&self) -> bool {
        self.defaulted
    }
}

impl<T: ScopeValue> TypedValue<T> {
    /// Publishes the value into `scope` iff it is not defaulted.
    pub fn update_ancestor_values(&self, scope: &mut AncestorValues) {
        if !self.defaulted {
            scope.update(self.name, self.abbreviation, self.value.clone());
        }
    }
}

/// Boolean attribute value.
pub type BoolValue = TypedValue<bool>;
/// Integer attribute value.
pub type IntValue = TypedValue<i32>;
/// Plain float attribute value.
pub type FloatValue = TypedValue<f32>;
/// Unit-interval attribute value.
pub type UnitIntervalValue = TypedValue<UnitInterval>;
/// Text attribute value.
pub type StringValue = TypedValue<String>;
/// Color attribute value.
pub type ColorValue = TypedValue<Rgba>;
/// Rotation attribute value.
pub type RotationValue = TypedValue<Rotation>;
/// Axis attribute value.
pub type AxisValue = TypedValue<Axis>;
/// Alignment attribute value.
pub type AlignmentValue = TypedValue<Alignment>;

/// The attribute values visible to a node from its ancestors.
///
/// The renderer populates one of these while descending the tree, handing
/// each child a copy so siblings cannot see one another's values. Lookups
/// accept either the full name or the abbreviation and fail when the name is
/// absent or bound to a different type.
#[derive(Debug, Default, Clone)]
pub struct AncestorValues {
    values: BTreeMap<String, ScopeEntry>,
}

#[derive(Debug, Clone)]
struct ScopeEntry {
    abbreviation: String,
    payload: ScopePayload,
}

impl AncestorValues {
    /// An empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the value published under `name`.
    pub fn update<T: ScopeValue>(&mut self, name: &str, abbreviation: &str, value: T) {
        self.values.insert(
            name.to_string(),
            ScopeEntry { abbreviation: abbreviation.to_string(), payload: value.into_payload() },
        );
    }

    /// Looks up a value of type `T` by full name or abbreviation.
    pub fn get<T: ScopeValue>(&self, name: &str) -> Result<T> {
        self.values
            .iter()
            .find_map(|(value_name, entry)| {
                let value = T::from_payload(&entry.payload)?;
                (value_name.as_str() == name || entry.abbreviation == name)
                    .then(|| value.clone())
            })
            .ok_or_else(|| Error::MissingAncestorValue {
                name: name.to_string(),
                expected: T::TYPE_NAME,
            })
    }

    /// Float lookup, the common case for relative values.
    pub fn get_float(&self, name: &str) -> Result<f32> {
        self.get::<f32>(name)
    }
}

/// A float attribute that may be *relative*: scaled by a multiplier, defined
/// against another published value, and/or interpreted as a percentage of
/// the ancestor's value of the same name.
///
/// Evaluating the value against a scope caches the resulting literal back
/// into the value, so repeated evaluation against the same scope is
/// idempotent.
#[derive(Debug, Clone)]
pub struct RelativeFloatValue {
    name: &'static str,
    abbreviation: &'static str,
    value: f32,
    defaulted: bool,
    multiplier: f32,
    is_percentage: bool,
    relative_name: Option<String>,
}

impl RelativeFloatValue {
    /// Builds a defaulted, non-relative value.
    pub fn new(name: &'static str, abbreviation: &'static str, default_value: f32) -> Self {
        Self {
            name,
            abbreviation,
            value: default_value,
            defaulted: true,
            multiplier: 1.0,
            is_percentage: false,
            relative_name: None,
        }
    }

    /// The full attribute name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The short attribute name.
    pub fn abbreviation(&self) -> &'static str {
        self.abbreviation
    }

    /// True iff `attribute` is the full or abbreviated name.
    pub fn matches_attribute_name(&self, attribute: &str) -> bool {
        attribute == self.name || attribute == self.abbreviation
    }

    /// The most recently computed literal value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// True until the value is set or parsed from an attribute.
    pub fn is_defaulted(&self) -> bool {
        self.defaulted
    }

    /// True when evaluation reads another name from the scope.
    pub fn is_relative(&self) -> bool {
        self.relative_name.is_some()
    }

    /// The name this value is relative to, if any.
    pub fn relative_name(&self) -> Option<&str> {
        self.relative_name.as_deref()
    }

    /// Makes the value relative to `relative_name`.
    pub fn set_relative_name(&mut self, relative_name: impl Into<String>) {
        self.relative_name = Some(relative_name.into());
    }

    /// Replaces the value with an absolute literal, resetting the multiplier
    /// and percentage state.
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
        self.defaulted = false;
        self.is_percentage = false;
        self.multiplier = 1.0;
    }

    fn compute_relative_value(&self, known_values: &AncestorValues) -> Result<f32> {
        let mut val = match &self.relative_name {
            None => {
                if self.is_percentage {
                    self.multiplier
                } else {
                    self.value * self.multiplier
                }
            }
            Some(relative_name) => known_values.get_float(relative_name)? * self.multiplier,
        };

        if self.is_percentage {
            // e.g. 90% means 90% of the ancestor's value of our own name.
            let ancestor_value = known_values.get_float(self.name)?;
            val = ancestor_value * (val / 100.0);
        }
        Ok(val)
    }

    /// Evaluates the expression against `scope`, caches the literal back
    /// into the value, and publishes the literal under this value's own name
    /// iff not defaulted.
    pub fn update_ancestor_values(&mut self, scope: &mut AncestorValues) -> Result<()> {
        let computed = self.compute_relative_value(scope)?;
        self.value = computed;

        if !self.defaulted {
            scope.update(self.name, self.abbreviation, computed);
        }
        Ok(())
    }

    /// Parses an attribute string of the form `[±]?[digits.]?[name][%]?`.
    ///
    /// A trailing `%` makes the value a percentage; a leading number is the
    /// multiplier; any remaining text is the relative name. A pure number is
    /// an absolute value, a pure name a relative one with multiplier 1. The
    /// value state is only modified once the whole string parses.
    pub fn update_from_attribute(&mut self, attribute_value: &str) -> Result<()> {
        if attribute_value.is_empty() {
            return Ok(());
        }

        let invalid = || Error::InvalidAttribute {
            name: self.name.to_string(),
            value: attribute_value.to_string(),
        };

        let mut is_percentage = false;
        let mut multiplier = 1.0f32;
        let mut maybe_value = None;
        let mut relative_name = None;

        let mut remainder = attribute_value;
        if let Some(stripped) = remainder.strip_suffix('%') {
            if stripped.is_empty() {
                return Err(invalid());
            }
            is_percentage = true;
            remainder = stripped;
        }

        let starts_numeric = remainder
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-');
        if starts_numeric {
            let (numeric, rest) = split_leading_float(remainder);
            multiplier = numeric.parse::<f32>().map_err(|_| invalid())?;
            remainder = rest;
        }

        if !remainder.is_empty() {
            relative_name = Some(remainder.to_string());
        } else if !is_percentage {
            maybe_value = Some(multiplier);
            multiplier = self.multiplier;
        }

        if relative_name.is_some() {
            self.relative_name = relative_name;
        }
        self.is_percentage = is_percentage;
        self.multiplier = multiplier;
        self.defaulted = false;
        if let Some(value) = maybe_value {
            self.set_value(value);
        }
        Ok(())
    }

    /// The attribute-syntax form of the value.
    pub fn attribute_string(&self) -> String {
        let mut out = String::new();
        match &self.relative_name {
            None if !self.is_percentage => {
                let _ = write!(out, "{}", self.value);
            }
            None => {
                let _ = write!(out, "{}%", self.multiplier);
            }
            Some(relative_name) => {
                if self.multiplier != 1.0 {
                    let _ = write!(out, "{}", self.multiplier);
                }
                out.push_str(relative_name);
                if self.is_percentage {
                    out.push('%');
                }
            }
        }
        out
    }
}

/// Splits the longest leading `[+-]?digits[.digits]` prefix off `text`.
fn split_leading_float(text: &str) -> (&str, &str) {
    let mut end = 0;
    let mut seen_dot = false;
    for (index, c) in text.char_indices() {
        let accept = if index == 0 {
            c.is_ascii_digit() || c == '+' || c == '-'
        } else if c == '.' {
            !seen_dot
        } else {
            c.is_ascii_digit()
        };
        if !accept {
            break;
        }
        if c == '.' {
            seen_dot = true;
        }
        end = index + c.len_utf8();
    }
    text.split_at(end)
}

/// Orders `dependencies` so that every name appears after the name it
/// depends on, resolving dependency names through `aliases` first.
///
/// Fails with [`Error::AttributeCycle`] when the dependencies are cyclic.
pub fn topological_sort_with_aliases(
    dependencies: &BTreeMap<String, Option<String>>,
    aliases: &BTreeMap<String, String>,
) -> Result<Vec<String>> {
    let resolve = |name: &str| -> String {
        aliases.get(name).cloned().unwrap_or_else(|| name.to_string())
    };

    // Build the dependency graph: an edge dep -> name for each relative
    // value, plus isolated vertexes for everything else.
    let mut nodes: BTreeSet<String> = BTreeSet::new();
    let mut outgoing: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut incoming_count: BTreeMap<String, usize> = BTreeMap::new();
    for (name, maybe_dep) in dependencies {
        nodes.insert(name.clone());
        incoming_count.entry(name.clone()).or_insert(0);
        if let Some(dep) = maybe_dep {
            let dep = resolve(dep);
            nodes.insert(dep.clone());
            incoming_count.entry(dep.clone()).or_insert(0);
            outgoing.entry(dep).or_default().push(name.clone());
            *incoming_count.entry(name.clone()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<String> = incoming_count
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| name.clone())
        .collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(name) = ready.iter().next().cloned() {
        ready.remove(&name);
        if let Some(dependents) = outgoing.get(&name) {
            for dependent in dependents {
                if let Some(count) = incoming_count.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent.clone());
                    }
                }
            }
        }
        order.push(name);
    }

    if order.len() != nodes.len() {
        let mut description = String::new();
        for (name, maybe_dep) in dependencies {
            let _ = write!(description, "{{ {name}");
            if let Some(dep) = maybe_dep {
                let _ = write!(description, " -> {dep}");
            }
            description.push_str(" } ");
        }
        return Err(Error::AttributeCycle(description.trim_end().to_string()));
    }

    Ok(order.into_iter().filter(|name| dependencies.contains_key(name)).collect())
}
