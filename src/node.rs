//! The node tree: the hierarchy of elements behind the rendered scene.
//!
//! Nodes live in an [`indextree::Arena`] owned by the engine; the stable
//! [`NodeId`] handles it hands out stay valid across mutations, so callers
//! can pin a node and keep addressing it between transactions. Each node
//! owns an element plus an ordered list of *templates*: prototype subtrees
//! that can be cloned into real children on demand, spliced in at the
//! position the template was declared at.

use std::fmt;

use indextree::Arena;
pub use indextree::NodeId;
use log::debug;

use crate::bounds::Bounds;
use crate::element::{Element, NopElement};
use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::path::{Path, is_valid_path_part};
use crate::render_tree::RenderTree;
use crate::value::AncestorValues;

struct NodeData {
    element: Box<dyn Element>,
    templates: Vec<TemplateSlot>,
}

#[derive(Debug, Clone, Copy)]
struct TemplateSlot {
    node: NodeId,
    /// Child position recorded when the template was declared; constructed
    /// children and template-derived children interleave deterministically
    /// through it.
    insertion_index: usize,
}

/// The tree of nodes, rooted at a nameless placeholder element.
pub struct NodeTree {
    arena: Arena<NodeData>,
    root: NodeId,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// An empty tree: just the root.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeData {
            element: Box::new(NopElement::new("")),
            templates: Vec::new(),
        });
        Self { arena, root }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// True for the root node.
    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    /// The node's element.
    pub fn element(&self, id: NodeId) -> &dyn Element {
        self.arena[id].get().element.as_ref()
    }

    /// Mutable access to the node's element. Attribute changes made through
    /// this are picked up by the next render.
    pub fn element_mut(&mut self, id: NodeId) -> &mut dyn Element {
        self.arena[id].get_mut().element.as_mut()
    }

    /// Replaces the node's element.
    pub fn set_element(&mut self, id: NodeId, element: Box<dyn Element>) {
        self.arena[id].get_mut().element = element;
    }

    /// The node's name (its element's name).
    pub fn name_of(&self, id: NodeId) -> &str {
        self.element(id).name()
    }

    /// The node's parent, if it is not the root.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    /// The node's path from the root.
    pub fn path_of(&self, id: NodeId) -> Path {
        let mut names: Vec<String> = id
            .ancestors(&self.arena)
            .filter(|ancestor| *ancestor != self.root)
            .map(|ancestor| self.name_of(ancestor).to_string())
            .collect();
        names.reverse();
        Path::from_parts_unchecked(names)
    }

    /// The node's children in order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        id.children(&self.arena).collect()
    }

    /// The children's names in order.
    pub fn children_names(&self, id: NodeId) -> Vec<String> {
        id.children(&self.arena).map(|child| self.name_of(child).to_string()).collect()
    }

    /// The child with the given name, if any.
    pub fn try_get_child(&self, id: NodeId, with_name: &str) -> Option<NodeId> {
        id.children(&self.arena).find(|child| self.name_of(*child) == with_name)
    }

    /// True iff a child with the given name exists.
    pub fn has_child(&self, id: NodeId, with_name: &str) -> bool {
        self.try_get_child(id, with_name).is_some()
    }

    /// Appends a new child node owning `element`. The element's name becomes
    /// the child name and must be a valid path part, unique among siblings.
    pub fn construct_child(
        &mut self,
        parent: NodeId,
        element: Box<dyn Element>,
    ) -> Result<NodeId> {
        let name = element.name().to_string();
        if !is_valid_path_part(&name) {
            return Err(Error::InvalidPath(format!("'{name}' is not usable as a node name")));
        }
        if self.has_child(parent, &name) {
            return Err(Error::DuplicateChildName(name));
        }

        let node = self.arena.new_node(NodeData { element, templates: Vec::new() });
        parent.append(node, &mut self.arena);
        Ok(node)
    }

    /// Declares a template on `parent`: a detached prototype subtree that
    /// [`try_make_template`](Self::try_make_template) clones into a real
    /// child later. The current child count is recorded as the insertion
    /// position for children made from it.
    pub fn construct_template(&mut self, parent: NodeId, element: Box<dyn Element>) -> NodeId {
        let insertion_index = parent.children(&self.arena).count();
        let node = self.arena.new_node(NodeData { element, templates: Vec::new() });
        self.arena[parent].get_mut().templates.push(TemplateSlot { node, insertion_index });
        node
    }

    /// The template with the given name, if declared on this node.
    pub fn try_get_template(&self, id: NodeId, with_name: &str) -> Option<NodeId> {
        self.arena[id]
            .get()
            .templates
            .iter()
            .find(|slot| self.name_of(slot.node) == with_name)
            .map(|slot| slot.node)
    }

    /// The names of the templates declared on this node.
    pub fn template_names(&self, id: NodeId) -> Vec<String> {
        self.arena[id]
            .get()
            .templates
            .iter()
            .map(|slot| self.name_of(slot.node).to_string())
            .collect()
    }

    /// Clones the named template (children and nested templates included)
    /// into a new child called `new_name`, spliced in at the template's
    /// recorded insertion position.
    pub fn try_make_template(
        &mut self,
        parent: NodeId,
        template_name: &str,
        new_name: &str,
    ) -> Result<NodeId> {
        let slot = self.arena[parent]
            .get()
            .templates
            .iter()
            .find(|slot| self.name_of(slot.node) == template_name)
            .copied()
            .ok_or_else(|| Error::UnknownTemplate(template_name.to_string()))?;

        if !is_valid_path_part(new_name) {
            return Err(Error::InvalidPath(format!("'{new_name}' is not usable as a node name")));
        }
        if self.has_child(parent, new_name) {
            return Err(Error::DuplicateChildName(new_name.to_string()));
        }

        let constructed = self.clone_subtree(slot.node);
        self.element_mut(constructed).set_name(new_name.to_string());

        let children = self.children(parent);
        let insertion_index = slot.insertion_index.min(children.len());
        if insertion_index == children.len() {
            parent.append(constructed, &mut self.arena);
        } else {
            children[insertion_index].insert_before(constructed, &mut self.arena);
        }

        // Later template positions shift right, the materialized template's
        // own position included, so repeat materializations keep appending
        // after one another.
        for slot in &mut self.arena[parent].get_mut().templates {
            if slot.insertion_index >= insertion_index {
                slot.insertion_index += 1;
            }
        }
        Ok(constructed)
    }

    /// The existing child with `new_name`, or a fresh one made from the
    /// named template.
    pub fn try_get_child_or_make_template(
        &mut self,
        parent: NodeId,
        template_name: &str,
        new_name: &str,
    ) -> Result<NodeId> {
        if let Some(child) = self.try_get_child(parent, new_name) {
            return Ok(child);
        }
        self.try_make_template(parent, template_name, new_name)
    }

    /// Removes the named child and its whole subtree (declared templates
    /// included). Template insertion positions past the removed child shift
    /// left. Removing an absent name is a no-op.
    pub fn remove_child(&mut self, parent: NodeId, with_name: &str) {
        let children = self.children(parent);
        let Some(index) = children.iter().position(|child| self.name_of(*child) == with_name)
        else {
            return;
        };

        self.remove_subtree_with_templates(children[index]);
        for slot in &mut self.arena[parent].get_mut().templates {
            if slot.insertion_index > index {
                slot.insertion_index -= 1;
            }
        }
    }

    fn remove_subtree_with_templates(&mut self, id: NodeId) {
        let mut template_roots = Vec::new();
        for descendant in id.descendants(&self.arena) {
            for slot in &self.arena[descendant].get().templates {
                template_roots.push(slot.node);
            }
        }
        for template_root in template_roots {
            self.remove_subtree_with_templates(template_root);
        }
        id.remove_subtree(&mut self.arena);
    }

    /// Resolves a path below this node. A single-part path equal to the
    /// node's own name resolves to the node itself.
    pub fn find_descendant(&self, from: NodeId, path: &Path) -> Option<NodeId> {
        for child in from.children(&self.arena) {
            if self.name_of(child) != path.first() {
                continue;
            }
            return if path.is_leaf() {
                Some(child)
            } else {
                self.find_descendant(child, &path.without_first())
            };
        }

        if path.is_leaf() && self.name_of(from) == path.first() {
            return Some(from);
        }
        None
    }

    fn clone_subtree(&mut self, src: NodeId) -> NodeId {
        let element = self.arena[src].get().element.clone();
        let new_id = self.arena.new_node(NodeData { element, templates: Vec::new() });

        let child_ids: Vec<NodeId> = src.children(&self.arena).collect();
        for child in child_ids {
            let cloned_child = self.clone_subtree(child);
            new_id.append(cloned_child, &mut self.arena);
        }

        let slots: Vec<TemplateSlot> = self.arena[src].get().templates.clone();
        for slot in slots {
            let cloned_template = self.clone_subtree(slot.node);
            self.arena[new_id]
                .get_mut()
                .templates
                .push(TemplateSlot { node: cloned_template, insertion_index: slot.insertion_index });
        }
        new_id
    }

    /// Renders the whole tree into `render_tree`, descending with a fresh
    /// ancestor-value scope.
    pub fn render_from_root(&mut self, render_tree: &mut RenderTree) -> Result<()> {
        debug!("rendering node tree from the root");
        let mut scope = AncestorValues::new();
        self.render_node(self.root, &mut scope, render_tree)
    }

    fn render_node(
        &mut self,
        id: NodeId,
        scope: &mut AncestorValues,
        render_tree: &mut RenderTree,
    ) -> Result<()> {
        // Hierarchical values every node republishes: the sibling count and
        // the per-sibling percentage share.
        let num_children = match self.arena[id].parent() {
            Some(parent) => parent.children(&self.arena).count(),
            None => 0,
        };
        scope.update("children", "n", num_children as f32);
        let equal = if num_children > 0 { 100.0 / num_children as f32 } else { 0.0 };
        scope.update("equal", "eq", equal);

        self.arena[id].get_mut().element.update_ancestor_values(scope)?;

        let child_ids: Vec<NodeId> = id.children(&self.arena).collect();
        for child in child_ids {
            // Each child gets a copy, so a child's published values never
            // leak into its siblings.
            let mut child_scope = scope.clone();
            self.render_node(child, &mut child_scope, render_tree)?;
        }

        let path = self.path_of(id);
        self.arena[id].get().element.render(&path, render_tree)?;

        // Elements need not emit a geometry, but parents must still find
        // bounds for this subtree when they lay out.
        if render_tree.needs_updating(&path) {
            let mut bounds = Bounds::default();
            for (_, geometry) in render_tree.children_of(&path) {
                bounds += geometry.positioned_bounds();
            }
            render_tree.update(path, Geometry::empty(bounds.base(), bounds.strip_pos()));
        }
        Ok(())
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, indent: usize) -> fmt::Result {
        let pad = "\t".repeat(indent);
        writeln!(f, "{pad}Node '{}' (", self.name_of(id))?;

        let template_names = self.template_names(id);
        if template_names.is_empty() {
            writeln!(f, "{pad}\ttemplates: <>) {{")?;
        } else {
            writeln!(f, "{pad}\ttemplates: <{}>) {{", template_names.join(", "))?;
        }
        for child in id.children(&self.arena) {
            self.fmt_node(f, child, indent + 1)?;
        }
        writeln!(f, "{pad}}}")
    }
}

impl fmt::Display for NodeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, self.root, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{BoxElement, JuxtaposeElement};
    use crate::feature::AttributeMap;

    fn attrs(pairs: &[(&str, &str)]) -> AttributeMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn boxed(name: &str, pairs: &[(&str, &str)]) -> Box<dyn Element> {
        Box::new(BoxElement::new(name, &attrs(pairs)).unwrap_or_else(|err| panic!("{err}")))
    }

    fn path(s: &str) -> Path {
        s.parse().unwrap_or_else(|err| panic!("'{s}' should parse: {err}"))
    }

    #[test]
    fn construct_child_builds_paths() {
        let mut tree = NodeTree::new();
        let a = tree
            .construct_child(tree.root(), boxed("a", &[]))
            .unwrap_or_else(|err| panic!("{err}"));
        let b = tree.construct_child(a, boxed("b", &[])).unwrap_or_else(|err| panic!("{err}"));

        assert_eq!(tree.path_of(tree.root()), Path::root());
        assert_eq!(tree.path_of(b), path(".a.b"));
        assert_eq!(tree.children_names(tree.root()), vec!["a"]);
        assert_eq!(tree.parent_of(b), Some(a));
    }

    #[test]
    fn duplicate_child_names_are_rejected() {
        let mut tree = NodeTree::new();
        tree.construct_child(tree.root(), boxed("a", &[]))
            .unwrap_or_else(|err| panic!("{err}"));
        assert!(matches!(
            tree.construct_child(tree.root(), boxed("a", &[])),
            Err(Error::DuplicateChildName(_))
        ));
        assert!(matches!(
            tree.construct_child(tree.root(), boxed("not a name", &[])),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn templates_materialize_at_their_declared_position() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        tree.construct_template(root, boxed("t", &[]));
        tree.construct_child(root, boxed("a", &[])).unwrap_or_else(|err| panic!("{err}"));
        tree.construct_child(root, boxed("c", &[])).unwrap_or_else(|err| panic!("{err}"));
        tree.try_make_template(root, "t", "b").unwrap_or_else(|err| panic!("{err}"));

        // The template was declared before 'a', so its children come first.
        assert_eq!(tree.children_names(root), vec!["b", "a", "c"]);
    }

    #[test]
    fn templates_declared_mid_sequence_interleave() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        tree.construct_child(root, boxed("a", &[])).unwrap_or_else(|err| panic!("{err}"));
        tree.construct_template(root, boxed("t", &[]));
        tree.construct_child(root, boxed("c", &[])).unwrap_or_else(|err| panic!("{err}"));
        tree.try_make_template(root, "t", "b").unwrap_or_else(|err| panic!("{err}"));

        assert_eq!(tree.children_names(root), vec!["a", "b", "c"]);

        // A second materialization lands after the first.
        tree.try_make_template(root, "t", "b2").unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(tree.children_names(root), vec!["a", "b", "b2", "c"]);
    }

    #[test]
    fn unknown_templates_fail() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        assert!(matches!(
            tree.try_make_template(root, "missing", "x"),
            Err(Error::UnknownTemplate(_))
        ));
    }

    #[test]
    fn template_clones_are_deep_and_independent() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let template = tree.construct_template(root, boxed("t", &[("width", "3")]));
        tree.construct_child(template, boxed("inner", &[]))
            .unwrap_or_else(|err| panic!("{err}"));

        let made = tree.try_make_template(root, "t", "copy").unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(tree.name_of(made), "copy");
        assert_eq!(tree.children_names(made), vec!["inner"]);
        assert_eq!(tree.path_of(tree.children(made)[0]), path(".copy.inner"));

        // Renaming the clone did not touch the template.
        assert_eq!(tree.template_names(root), vec!["t"]);
    }

    #[test]
    fn get_or_make_reuses_existing_children() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        tree.construct_template(root, boxed("t", &[]));
        let first = tree
            .try_get_child_or_make_template(root, "t", "x")
            .unwrap_or_else(|err| panic!("{err}"));
        let second = tree
            .try_get_child_or_make_template(root, "t", "x")
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(first, second);
        assert_eq!(tree.children_names(root), vec!["x"]);
    }

    #[test]
    fn remove_child_shifts_template_positions() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        tree.construct_child(root, boxed("a", &[])).unwrap_or_else(|err| panic!("{err}"));
        tree.construct_child(root, boxed("b", &[])).unwrap_or_else(|err| panic!("{err}"));
        tree.construct_template(root, boxed("t", &[]));

        tree.remove_child(root, "a");
        assert_eq!(tree.children_names(root), vec!["b"]);

        // The template's position followed the shift: materializing appends
        // after 'b', not past the end of a stale index.
        tree.try_make_template(root, "t", "x").unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(tree.children_names(root), vec!["b", "x"]);

        // Removing a missing name is a no-op.
        tree.remove_child(root, "missing");
        assert_eq!(tree.children_names(root), vec!["b", "x"]);
    }

    #[test]
    fn find_descendant_walks_named_children() {
        let mut tree = NodeTree::new();
        let a = tree
            .construct_child(tree.root(), boxed("a", &[]))
            .unwrap_or_else(|err| panic!("{err}"));
        let b = tree.construct_child(a, boxed("b", &[])).unwrap_or_else(|err| panic!("{err}"));

        assert_eq!(tree.find_descendant(tree.root(), &path(".a.b")), Some(b));
        assert_eq!(tree.find_descendant(tree.root(), &path(".a")), Some(a));
        assert_eq!(tree.find_descendant(tree.root(), &path(".a.x")), None);
        // A single-part path matching the node's own name resolves to it.
        assert_eq!(tree.find_descendant(a, &path(".a")), Some(a));
    }

    #[test]
    fn render_synthesizes_bounds_for_layoutless_nodes() {
        let mut tree = NodeTree::new();
        let j = tree
            .construct_child(
                tree.root(),
                Box::new(
                    JuxtaposeElement::new("j", &AttributeMap::new())
                        .unwrap_or_else(|err| panic!("{err}")),
                ),
            )
            .unwrap_or_else(|err| panic!("{err}"));
        tree.construct_child(j, boxed("b", &[("width", "2"), ("height", "3"), ("depth", "4")]))
            .unwrap_or_else(|err| panic!("{err}"));

        let mut render_tree = RenderTree::new();
        tree.render_from_root(&mut render_tree).unwrap_or_else(|err| panic!("{err}"));

        // The box drew itself; the juxtapose and root got empty geometries.
        assert!(render_tree.get(&path(".j.b")).is_some_and(Geometry::should_draw));
        let juxtapose = render_tree.get(&path(".j")).unwrap_or_else(|| panic!("missing .j"));
        assert!(!juxtapose.should_draw());
        assert_eq!(juxtapose.bounds().lengths(), (2.0, 3.0, 4.0));
        let root = render_tree.get(&Path::root()).unwrap_or_else(|| panic!("missing root"));
        assert!(!root.should_draw());
    }

    #[test]
    fn hierarchical_values_expose_sibling_share() {
        let mut tree = NodeTree::new();
        let j = tree
            .construct_child(
                tree.root(),
                Box::new(
                    JuxtaposeElement::new("j", &attrs(&[("width", "10")]))
                        .unwrap_or_else(|err| panic!("{err}")),
                ),
            )
            .unwrap_or_else(|err| panic!("{err}"));
        // Two siblings, each sized to the "equal" share of the parent width.
        tree.construct_child(j, boxed("a", &[("width", "eq%"), ("height", "1"), ("depth", "1")]))
            .unwrap_or_else(|err| panic!("{err}"));
        tree.construct_child(j, boxed("b", &[("width", "eq%"), ("height", "1"), ("depth", "1")]))
            .unwrap_or_else(|err| panic!("{err}"));

        let mut render_tree = RenderTree::new();
        tree.render_from_root(&mut render_tree).unwrap_or_else(|err| panic!("{err}"));

        let a = render_tree.get(&path(".j.a")).unwrap_or_else(|| panic!("missing .j.a"));
        assert_eq!(a.bounds().width(), 5.0);
    }
}
