//! Scene graph nodes with stable identity.
//!
//! A [`SceneNode`] is a shared handle: clones refer to the same node, and
//! mutating through one handle is visible through all of them. Nodes are
//! updated in place across frames rather than rebuilt, which is what lets a
//! renderer hold on to them.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Quat, Vec3};

use crate::geometry::Geometry;
use crate::light::Light;
use crate::material::Material;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Local translation, rotation and scale relative to the parent node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Geometry paired with the material it is drawn with.
///
/// Geometry is shared so that many markers can reference one unit box.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: Rc<Geometry>,
    pub material: Material,
}

/// What a node contributes to the scene besides its children.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Mesh(Mesh),
    Light(Light),
}

/// Payload of a node.
#[derive(Debug)]
pub struct NodeData {
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
    pub kind: NodeKind,
    children: Vec<SceneNode>,
}

impl NodeData {
    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    /// Material of a mesh node.
    pub fn material(&self) -> Option<&Material> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(&mesh.material),
            _ => None,
        }
    }

    pub fn material_mut(&mut self) -> Option<&mut Material> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(&mut mesh.material),
            _ => None,
        }
    }

    pub fn light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }
}

/// Shared handle to a scene node.
#[derive(Clone)]
pub struct SceneNode {
    id: u64,
    data: Rc<RefCell<NodeData>>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            data: Rc::new(RefCell::new(NodeData {
                name: name.into(),
                transform: Transform::default(),
                visible: true,
                kind,
                children: Vec::new(),
            })),
        }
    }

    /// Empty container.
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(name: impl Into<String>, geometry: Rc<Geometry>, material: Material) -> Self {
        Self::new(name, NodeKind::Mesh(Mesh { geometry, material }))
    }

    pub fn light(name: impl Into<String>, light: Light) -> Self {
        Self::new(name, NodeKind::Light(light))
    }

    /// Process-unique identifier, stable for the node's lifetime.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> String {
        self.data.borrow().name.clone()
    }

    /// Whether both handles refer to the same node.
    pub fn ptr_eq(&self, other: &SceneNode) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    pub fn read(&self) -> Ref<'_, NodeData> {
        self.data.borrow()
    }

    /// Mutate the node in place.
    ///
    /// # Panics
    ///
    /// Panics if called while a [`read`](Self::read) guard on the same node
    /// is alive.
    pub fn update<R>(&self, f: impl FnOnce(&mut NodeData) -> R) -> R {
        f(&mut self.data.borrow_mut())
    }

    /// Snapshot of the direct children.
    pub fn children(&self) -> Vec<SceneNode> {
        self.data.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.data.borrow().children.len()
    }

    pub fn add(&self, child: SceneNode) {
        self.data.borrow_mut().children.push(child);
    }

    /// Detach `child`. Returns `false` if it was not a direct child.
    pub fn remove(&self, child: &SceneNode) -> bool {
        let mut data = self.data.borrow_mut();
        let before = data.children.len();
        data.children.retain(|c| !c.ptr_eq(child));
        data.children.len() != before
    }

    pub fn clear(&self) {
        self.data.borrow_mut().children.clear();
    }

    /// Swap the whole child list in one step. No observer ever sees the
    /// node with a partially replaced child list.
    pub fn replace_children(&self, children: Vec<SceneNode>) {
        self.data.borrow_mut().children = children;
    }

    /// Depth-first search for the first node (self included) named `name`.
    pub fn find(&self, name: &str) -> Option<SceneNode> {
        if self.data.borrow().name == name {
            return Some(self.clone());
        }
        self.children().iter().find_map(|child| child.find(name))
    }

    /// Visit every visible node depth-first with its world transform.
    pub fn walk(&self, visit: &mut dyn FnMut(&SceneNode, Mat4)) {
        self.walk_from(Mat4::IDENTITY, visit);
    }

    fn walk_from(&self, parent: Mat4, visit: &mut dyn FnMut(&SceneNode, Mat4)) {
        let (visible, world) = {
            let data = self.data.borrow();
            (data.visible, parent * data.transform.matrix())
        };
        if !visible {
            return;
        }
        visit(self, world);
        for child in self.children() {
            child.walk_from(world, visit);
        }
    }
}

impl fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.borrow();
        f.debug_struct("SceneNode")
            .field("id", &self.id)
            .field("name", &data.name)
            .field("children", &data.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_identity() {
        let node = SceneNode::group("root");
        let alias = node.clone();
        alias.update(|data| data.name = "renamed".into());
        assert_eq!(node.name(), "renamed");
        assert!(node.ptr_eq(&alias));
        assert_eq!(node.id(), alias.id());
        assert!(!node.ptr_eq(&SceneNode::group("root")));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = SceneNode::group("a");
        let b = SceneNode::group("a");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_add_remove_replace() {
        let root = SceneNode::group("root");
        let a = SceneNode::group("a");
        let b = SceneNode::group("b");
        root.add(a.clone());
        root.add(b.clone());
        assert_eq!(root.child_count(), 2);

        assert!(root.remove(&a));
        assert!(!root.remove(&a));
        assert_eq!(root.child_count(), 1);

        root.replace_children(vec![a.clone(), b.clone(), SceneNode::group("c")]);
        assert_eq!(root.child_count(), 3);
        root.clear();
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn test_find_by_name() {
        let root = SceneNode::group("root");
        let inner = SceneNode::group("inner");
        inner.add(SceneNode::light(
            "sun",
            Light::Directional {
                color: Vec3::ONE,
                intensity: 1.0,
            },
        ));
        root.add(inner);
        let sun = root.find("sun").unwrap();
        assert!(sun.read().light().is_some());
        assert!(root.find("moon").is_none());
    }

    #[test]
    fn test_walk_composes_world_transforms_and_skips_hidden() {
        let root = SceneNode::group("root");
        root.update(|d| d.transform = Transform::from_translation(Vec3::X));
        let child = SceneNode::group("child");
        child.update(|d| d.transform = Transform::from_translation(Vec3::Y));
        let hidden = SceneNode::group("hidden");
        hidden.update(|d| d.visible = false);
        hidden.add(SceneNode::group("under-hidden"));
        root.add(child);
        root.add(hidden);

        let mut seen = Vec::new();
        root.walk(&mut |node, world| seen.push((node.name(), world.w_axis.truncate())));
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "root");
        assert_eq!(seen[1].0, "child");
        assert!((seen[1].1 - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_material_accessors() {
        let mesh = SceneNode::mesh(
            "box",
            Rc::new(Geometry::cuboid(1.0, 1.0, 1.0)),
            Material::default(),
        );
        mesh.update(|d| {
            if let Some(m) = d.material_mut() {
                m.opacity = 0.5;
            }
        });
        assert_eq!(mesh.read().material().map(|m| m.opacity), Some(0.5));
        assert!(SceneNode::group("g").read().material().is_none());
    }
}
