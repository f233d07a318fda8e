// SPDX-License-Identifier: MIT OR Apache-2.0
//! Entity registry.
//!
//! Every node, geometry, material, texture and animation of a document is
//! stored here under its identifier. Only commands (and the document loader)
//! can mutate the registry; everything outside the crate gets shared
//! references.

use crate::components::{NodeKind, SceneComponent};
use crate::events::{EditorEvent, EventQueue};
use crate::resources::{Geometry, Material, Texture};
use crate::scene::{EntityId, SceneNode, Subtree};
use indexmap::IndexMap;
use shadow_editor_animation::{AnimationClip, AnimationGroup, AnimationSet, TargetBinding};
use std::collections::HashSet;
use thiserror::Error;

/// Registry errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// Identifier already in use
    #[error("Duplicate identifier: {0}")]
    DuplicateId(EntityId),

    /// Identifier not registered
    #[error("Entity not found: {0}")]
    NotFound(EntityId),

    /// Identifier registered as a different kind of entity
    #[error("Entity {id} is not a {expected}")]
    WrongKind {
        /// Identifier
        id: EntityId,
        /// Expected entity kind
        expected: &'static str,
    },

    /// The scene root cannot be detached or moved
    #[error("Cannot detach or move the scene root {0}")]
    RootNode(EntityId),

    /// A non-root node was registered without a parent
    #[error("Node {0} has no parent")]
    Orphan(EntityId),

    /// Move would make a node its own ancestor
    #[error("Cannot move {object} under its own descendant {parent}")]
    Cycle {
        /// Node being moved
        object: EntityId,
        /// Requested parent
        parent: EntityId,
    },
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// An owned registry entry
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// Scene node
    Node(SceneNode),
    /// Geometry
    Geometry(Geometry),
    /// Material
    Material(Material),
    /// Texture
    Texture(Texture),
    /// Animation group
    AnimationGroup(AnimationGroup),
    /// Animation clip
    AnimationClip(AnimationClip),
}

impl Entity {
    /// Identifier of the entry
    pub fn id(&self) -> EntityId {
        match self {
            Self::Node(n) => n.uuid.clone(),
            Self::Geometry(g) => g.uuid.clone(),
            Self::Material(m) => m.uuid.clone(),
            Self::Texture(t) => t.uuid.clone(),
            Self::AnimationGroup(g) => EntityId::from(g.uuid.as_str()),
            Self::AnimationClip(c) => EntityId::from(c.uuid.as_str()),
        }
    }
}

/// A borrowed registry entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityRef<'a> {
    /// Scene node
    Node(&'a SceneNode),
    /// Geometry
    Geometry(&'a Geometry),
    /// Material
    Material(&'a Material),
    /// Texture
    Texture(&'a Texture),
    /// Animation group
    AnimationGroup(&'a AnimationGroup),
    /// Animation clip
    AnimationClip(&'a AnimationClip),
}

impl<'a> EntityRef<'a> {
    /// Human-readable kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Node(_) => "node",
            Self::Geometry(_) => "geometry",
            Self::Material(_) => "material",
            Self::Texture(_) => "texture",
            Self::AnimationGroup(_) => "animation group",
            Self::AnimationClip(_) => "animation clip",
        }
    }
}

/// A subtree removed from the scene together with where it was
#[derive(Debug, Clone, PartialEq)]
pub struct Detached {
    /// Removed nodes
    pub subtree: Subtree,
    /// Former parent
    pub parent: EntityId,
    /// Former index in the parent's children
    pub index: usize,
}

/// Identifier to entity mapping for one document
#[derive(Debug)]
pub struct Registry {
    root: EntityId,
    nodes: IndexMap<EntityId, SceneNode>,
    geometries: IndexMap<EntityId, Geometry>,
    materials: IndexMap<EntityId, Material>,
    textures: IndexMap<EntityId, Texture>,
    animations: AnimationSet,
    events: EventQueue,
}

impl Registry {
    /// Create a registry holding an empty scene
    pub fn new() -> Self {
        Self::with_root(SceneNode::new(
            "Scene",
            NodeKind::Scene(SceneComponent::default()),
        ))
    }

    /// Create a registry around an existing root node
    pub fn with_root(mut root: SceneNode) -> Self {
        root.parent = None;
        root.children.clear();
        let id = root.uuid.clone();
        let mut nodes = IndexMap::new();
        nodes.insert(id.clone(), root);
        Self {
            root: id,
            nodes,
            geometries: IndexMap::new(),
            materials: IndexMap::new(),
            textures: IndexMap::new(),
            animations: AnimationSet::new(),
            events: EventQueue::new(),
        }
    }

    /// Identifier of the scene root
    pub fn root(&self) -> &EntityId {
        &self.root
    }

    /// The scene root node
    pub fn root_node(&self) -> &SceneNode {
        &self.nodes[&self.root]
    }

    /// Whether any entity uses `id`
    pub fn contains(&self, id: &EntityId) -> bool {
        self.nodes.contains_key(id)
            || self.geometries.contains_key(id)
            || self.materials.contains_key(id)
            || self.textures.contains_key(id)
            || self.animations.contains(id.as_str())
    }

    /// Look up any entity
    pub fn get(&self, id: &EntityId) -> Option<EntityRef<'_>> {
        if let Some(node) = self.nodes.get(id) {
            return Some(EntityRef::Node(node));
        }
        if let Some(geometry) = self.geometries.get(id) {
            return Some(EntityRef::Geometry(geometry));
        }
        if let Some(material) = self.materials.get(id) {
            return Some(EntityRef::Material(material));
        }
        if let Some(texture) = self.textures.get(id) {
            return Some(EntityRef::Texture(texture));
        }
        if let Some(group) = self.animations.group(id.as_str()) {
            return Some(EntityRef::AnimationGroup(group));
        }
        self.animations
            .clip(id.as_str())
            .map(EntityRef::AnimationClip)
    }

    /// Look up any entity, failing when absent
    pub fn resolve(&self, id: &EntityId) -> Result<EntityRef<'_>> {
        self.get(id).ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Store an entity under its identifier
    ///
    /// A node is appended to its parent's children; its own child list is
    /// rebuilt as its children are registered.
    pub(crate) fn register(&mut self, entity: Entity) -> Result<()> {
        let id = entity.id();
        if self.contains(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        match entity {
            Entity::Node(mut node) => {
                let parent_id = node.parent.clone().ok_or_else(|| RegistryError::Orphan(id.clone()))?;
                let parent = self
                    .nodes
                    .get_mut(&parent_id)
                    .ok_or(RegistryError::NotFound(parent_id))?;
                parent.children.push(id.clone());
                node.children.clear();
                self.nodes.insert(id.clone(), node);
            }
            Entity::Geometry(geometry) => {
                self.geometries.insert(id.clone(), geometry);
            }
            Entity::Material(material) => {
                self.materials.insert(id.clone(), material);
            }
            Entity::Texture(texture) => {
                self.textures.insert(id.clone(), texture);
            }
            Entity::AnimationGroup(group) => {
                self.animations.insert_group(group);
            }
            Entity::AnimationClip(clip) => {
                self.animations.insert_clip(clip);
            }
        }
        tracing::trace!("Registered {}", id);
        self.events.push(EditorEvent::EntityRegistered(id));
        Ok(())
    }

    /// Remove an entity. Removing a node detaches its whole subtree.
    pub(crate) fn unregister(&mut self, id: &EntityId) -> Result<Entity> {
        let entity = if self.nodes.contains_key(id) {
            let detached = self.detach(id)?;
            let root = detached.subtree.nodes.into_iter().next();
            Entity::Node(root.ok_or_else(|| RegistryError::NotFound(id.clone()))?)
        } else if let Some(geometry) = self.geometries.shift_remove(id) {
            Entity::Geometry(geometry)
        } else if let Some(material) = self.materials.shift_remove(id) {
            Entity::Material(material)
        } else if let Some(texture) = self.textures.shift_remove(id) {
            Entity::Texture(texture)
        } else if let Some(group) = self.animations.remove_group(id.as_str()) {
            Entity::AnimationGroup(group)
        } else if let Some(clip) = self.animations.remove_clip(id.as_str()) {
            Entity::AnimationClip(clip)
        } else {
            return Err(RegistryError::NotFound(id.clone()));
        };
        tracing::trace!("Unregistered {}", id);
        self.events.push(EditorEvent::EntityUnregistered(id.clone()));
        Ok(entity)
    }

    /// Get a node
    pub fn node(&self, id: &EntityId) -> Result<&SceneNode> {
        self.nodes.get(id).ok_or_else(|| self.missing(id, "node"))
    }

    pub(crate) fn node_mut(&mut self, id: &EntityId) -> Result<&mut SceneNode> {
        if !self.nodes.contains_key(id) {
            return Err(self.missing(id, "node"));
        }
        self.nodes
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Get a geometry
    pub fn geometry(&self, id: &EntityId) -> Result<&Geometry> {
        self.geometries
            .get(id)
            .ok_or_else(|| self.missing(id, "geometry"))
    }

    pub(crate) fn geometry_mut(&mut self, id: &EntityId) -> Result<&mut Geometry> {
        if !self.geometries.contains_key(id) {
            return Err(self.missing(id, "geometry"));
        }
        self.geometries
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Get a material
    pub fn material(&self, id: &EntityId) -> Result<&Material> {
        self.materials
            .get(id)
            .ok_or_else(|| self.missing(id, "material"))
    }

    pub(crate) fn material_mut(&mut self, id: &EntityId) -> Result<&mut Material> {
        if !self.materials.contains_key(id) {
            return Err(self.missing(id, "material"));
        }
        self.materials
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Get a texture
    pub fn texture(&self, id: &EntityId) -> Result<&Texture> {
        self.textures
            .get(id)
            .ok_or_else(|| self.missing(id, "texture"))
    }

    fn missing(&self, id: &EntityId, expected: &'static str) -> RegistryError {
        if self.contains(id) {
            RegistryError::WrongKind {
                id: id.clone(),
                expected,
            }
        } else {
            RegistryError::NotFound(id.clone())
        }
    }

    /// All nodes, in registration order
    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values()
    }

    /// All geometries, in registration order
    pub fn geometries(&self) -> impl Iterator<Item = &Geometry> {
        self.geometries.values()
    }

    /// All materials, in registration order
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }

    /// All textures, in registration order
    pub fn textures(&self) -> impl Iterator<Item = &Texture> {
        self.textures.values()
    }

    /// Animation groups and clips
    pub fn animations(&self) -> &AnimationSet {
        &self.animations
    }

    /// Number of nodes including the root
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// `id` followed by all of its descendants in pre-order
    pub fn descendants(&self, id: &EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            stack.extend(node.children.iter().rev().cloned());
            out.push(current);
        }
        out
    }

    /// Position of `child` in its parent's child list
    pub fn child_index(&self, child: &EntityId) -> Option<usize> {
        let parent = self.nodes.get(child)?.parent.as_ref()?;
        self.nodes
            .get(parent)?
            .children
            .iter()
            .position(|c| c == child)
    }

    /// Copy a subtree out of the scene without touching it
    pub fn snapshot(&self, id: &EntityId) -> Result<Subtree> {
        let nodes: Vec<SceneNode> = self
            .descendants(id)
            .iter()
            .filter_map(|n| self.nodes.get(n).cloned())
            .collect();
        let mut subtree = Subtree::from_nodes(nodes).ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        subtree.root_mut().parent = None;
        Ok(subtree)
    }

    /// Whether any node or material references the asset `id`
    pub fn is_referenced(&self, id: &EntityId) -> bool {
        self.nodes
            .values()
            .any(|n| n.geometry() == Some(id) || n.material() == Some(id))
            || self.materials.values().any(|m| m.maps.values().any(|t| t == id))
    }

    /// Unregister an asset nothing references any more
    pub(crate) fn release_if_unreferenced(&mut self, id: &EntityId) -> Option<Entity> {
        if self.nodes.contains_key(id) || self.is_referenced(id) {
            return None;
        }
        self.unregister(id).ok()
    }

    /// Attach a detached subtree under `parent` at `index` (append when `None`)
    ///
    /// Carried assets already present are shared rather than duplicated.
    /// Returns the identifiers of the assets this call registered.
    pub(crate) fn attach(
        &mut self,
        subtree: Subtree,
        parent: &EntityId,
        index: Option<usize>,
    ) -> Result<Vec<EntityId>> {
        self.node(parent)?;

        let mut seen = HashSet::new();
        for node in &subtree.nodes {
            if self.contains(&node.uuid) || !seen.insert(node.uuid.clone()) {
                return Err(RegistryError::DuplicateId(node.uuid.clone()));
            }
        }

        let mut available: HashSet<EntityId> = HashSet::new();
        for geometry in &subtree.geometries {
            self.check_shared(&geometry.uuid, self.geometries.contains_key(&geometry.uuid))?;
            available.insert(geometry.uuid.clone());
        }
        for material in &subtree.materials {
            self.check_shared(&material.uuid, self.materials.contains_key(&material.uuid))?;
            available.insert(material.uuid.clone());
        }
        for texture in &subtree.textures {
            self.check_shared(&texture.uuid, self.textures.contains_key(&texture.uuid))?;
            available.insert(texture.uuid.clone());
        }
        let known = |id: &EntityId| available.contains(id) || self.contains(id);
        for node in &subtree.nodes {
            for asset in node.geometry().into_iter().chain(node.material()) {
                if !known(asset) {
                    return Err(RegistryError::NotFound(asset.clone()));
                }
            }
        }
        for material in &subtree.materials {
            if let Some(missing) = material.maps.values().find(|t| !known(t)) {
                return Err(RegistryError::NotFound(missing.clone()));
            }
        }

        let Subtree {
            nodes,
            geometries,
            materials,
            textures,
        } = subtree;
        let mut registered = Vec::new();
        let assets = textures
            .into_iter()
            .map(Entity::Texture)
            .chain(materials.into_iter().map(Entity::Material))
            .chain(geometries.into_iter().map(Entity::Geometry));
        for asset in assets {
            let id = asset.id();
            if !self.contains(&id) {
                self.register(asset)?;
                registered.push(id);
            }
        }

        let mut nodes = nodes.into_iter();
        let Some(mut root) = nodes.next() else {
            return Ok(registered);
        };
        let root_id = root.uuid.clone();
        root.parent = Some(parent.clone());
        let parent_node = self.node_mut(parent)?;
        let at = index
            .unwrap_or(parent_node.children.len())
            .min(parent_node.children.len());
        parent_node.children.insert(at, root_id.clone());
        self.nodes.insert(root_id.clone(), root);
        for node in nodes {
            self.nodes.insert(node.uuid.clone(), node);
        }

        self.events.push(EditorEvent::ObjectAdded(root_id));
        self.events.push(EditorEvent::SceneGraphChanged);
        Ok(registered)
    }

    fn check_shared(&self, id: &EntityId, same_kind: bool) -> Result<()> {
        if self.contains(id) && !same_kind {
            return Err(RegistryError::DuplicateId(id.clone()));
        }
        Ok(())
    }

    /// Remove a node and its descendants from the scene
    pub(crate) fn detach(&mut self, id: &EntityId) -> Result<Detached> {
        if id == &self.root {
            return Err(RegistryError::RootNode(id.clone()));
        }
        let parent = self
            .node(id)?
            .parent
            .clone()
            .ok_or_else(|| RegistryError::Orphan(id.clone()))?;
        let ids = self.descendants(id);

        let parent_node = self.node_mut(&parent)?;
        let index = parent_node
            .children
            .iter()
            .position(|c| c == id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        parent_node.children.remove(index);

        let mut nodes: Vec<SceneNode> = ids
            .iter()
            .filter_map(|n| self.nodes.shift_remove(n))
            .collect();
        if let Some(root) = nodes.first_mut() {
            root.parent = None;
        }
        let subtree = Subtree::from_nodes(nodes).ok_or_else(|| RegistryError::NotFound(id.clone()))?;

        self.events.push(EditorEvent::ObjectRemoved(id.clone()));
        self.events.push(EditorEvent::SceneGraphChanged);
        Ok(Detached {
            subtree,
            parent,
            index,
        })
    }

    /// Re-parent a node, inserting it at `index` of the new parent's children
    pub(crate) fn move_node(&mut self, id: &EntityId, parent: &EntityId, index: usize) -> Result<()> {
        if id == &self.root {
            return Err(RegistryError::RootNode(id.clone()));
        }
        self.node(parent)?;
        if self.descendants(id).contains(parent) {
            return Err(RegistryError::Cycle {
                object: id.clone(),
                parent: parent.clone(),
            });
        }
        let old_parent = self
            .node(id)?
            .parent
            .clone()
            .ok_or_else(|| RegistryError::Orphan(id.clone()))?;

        self.node_mut(&old_parent)?.children.retain(|c| c != id);
        let new_parent = self.node_mut(parent)?;
        let at = index.min(new_parent.children.len());
        new_parent.children.insert(at, id.clone());
        self.node_mut(id)?.parent = Some(parent.clone());

        self.events.push(EditorEvent::SceneGraphChanged);
        Ok(())
    }

    /// Clear the clip targets that point at any of `objects`
    pub(crate) fn unbind_clips(&mut self, objects: &[EntityId]) -> Vec<(String, TargetBinding)> {
        let objects: Vec<&str> = objects.iter().map(EntityId::as_str).collect();
        self.animations.unbind(&objects)
    }

    /// Restore a clip target cleared by [`Self::unbind_clips`]
    pub(crate) fn rebind_clip(&mut self, clip: &str, binding: TargetBinding) {
        if !self.animations.bind(clip, binding) {
            tracing::debug!("Clip {clip} is gone, binding not restored");
        }
    }

    /// Give a node a new identifier, updating parent, child and clip links
    pub(crate) fn rekey_node(&mut self, old: &EntityId, new: &EntityId) -> Result<()> {
        if self.contains(new) {
            return Err(RegistryError::DuplicateId(new.clone()));
        }
        let mut node = self
            .nodes
            .shift_remove(old)
            .ok_or_else(|| self.missing(old, "node"))?;
        node.uuid = new.clone();

        if let Some(parent) = node.parent.clone() {
            if let Some(parent) = self.nodes.get_mut(&parent) {
                for child in parent.children.iter_mut().filter(|c| **c == *old) {
                    *child = new.clone();
                }
            }
        }
        for child in &node.children {
            if let Some(child) = self.nodes.get_mut(child) {
                child.parent = Some(new.clone());
            }
        }
        if &self.root == old {
            self.root = new.clone();
        }
        self.nodes.insert(new.clone(), node);
        self.animations.retarget(old.as_str(), new.as_str());

        self.events.push(EditorEvent::ObjectChanged(new.clone()));
        self.events.push(EditorEvent::SceneGraphChanged);
        Ok(())
    }

    pub(crate) fn emit(&mut self, event: EditorEvent) {
        self.events.push(event);
    }

    pub(crate) fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    pub(crate) fn drain_events(&mut self) -> Vec<EditorEvent> {
        self.events.drain()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::MeshComponent;
    use crate::resources::{GeometryKind, MaterialKind};
    use shadow_editor_animation::ClipKind;

    fn group(name: &str) -> SceneNode {
        SceneNode::new(name, NodeKind::Group)
    }

    #[test]
    fn test_register_duplicate_and_resolve() {
        let mut registry = Registry::new();
        let geometry = Geometry::new("Box", GeometryKind::default());
        let id = geometry.uuid.clone();
        registry.register(Entity::Geometry(geometry.clone())).unwrap();

        assert_eq!(
            registry.register(Entity::Geometry(geometry)),
            Err(RegistryError::DuplicateId(id.clone()))
        );
        assert_eq!(registry.resolve(&id).map(|e| e.kind_name()), Ok("geometry"));
        assert!(matches!(
            registry.material(&id),
            Err(RegistryError::WrongKind { .. })
        ));

        registry.unregister(&id).unwrap();
        assert_eq!(registry.resolve(&id), Err(RegistryError::NotFound(id)));
    }

    #[test]
    fn test_register_emits_events() {
        let mut registry = Registry::new();
        let texture = Texture::new("Grass", "grass.png");
        let id = texture.uuid.clone();
        registry.register(Entity::Texture(texture)).unwrap();
        registry.unregister(&id).unwrap();
        assert_eq!(
            registry.drain_events(),
            vec![
                EditorEvent::EntityRegistered(id.clone()),
                EditorEvent::EntityUnregistered(id),
            ]
        );
    }

    #[test]
    fn test_attach_and_detach_restore_position() {
        let mut registry = Registry::new();
        let root = registry.root().clone();
        let a = group("A");
        let b = group("B");
        let (a_id, b_id) = (a.uuid.clone(), b.uuid.clone());
        registry.attach(Subtree::new(a), &root, None).unwrap();
        registry.attach(Subtree::new(b), &root, None).unwrap();

        let detached = registry.detach(&a_id).unwrap();
        assert_eq!(detached.index, 0);
        assert_eq!(&detached.parent, &root);
        assert!(registry.get(&a_id).is_none());
        assert_eq!(registry.root_node().children(), &[b_id.clone()]);

        registry
            .attach(detached.subtree, &detached.parent, Some(detached.index))
            .unwrap();
        assert_eq!(registry.root_node().children(), &[a_id.clone(), b_id]);
        assert_eq!(registry.node(&a_id).unwrap().parent(), Some(&root));
    }

    #[test]
    fn test_attach_rejects_duplicates_without_mutating() {
        let mut registry = Registry::new();
        let root = registry.root().clone();
        let a = group("A");
        registry.attach(Subtree::new(a.clone()), &root, None).unwrap();

        let mut tree = Subtree::new(group("B"));
        let b_id = tree.root().uuid.clone();
        tree.add_child(&b_id, a.clone()).unwrap();
        assert_eq!(
            registry.attach(tree, &root, None),
            Err(RegistryError::DuplicateId(a.uuid))
        );
        assert!(registry.get(&b_id).is_none());
        assert_eq!(registry.root_node().children().len(), 1);
    }

    #[test]
    fn test_attach_checks_asset_references() {
        let mut registry = Registry::new();
        let root = registry.root().clone();
        let geometry = Geometry::new("Box", GeometryKind::default());
        let material = Material::new("Paint", MaterialKind::Basic);
        let mesh = SceneNode::new(
            "Mesh",
            NodeKind::Mesh(MeshComponent {
                geometry: Some(geometry.uuid.clone()),
                material: Some(material.uuid.clone()),
            }),
        );

        let err = registry
            .attach(Subtree::new(mesh.clone()).with_geometry(geometry.clone()), &root, None)
            .unwrap_err();
        assert_eq!(err, RegistryError::NotFound(material.uuid.clone()));

        let registered = registry
            .attach(
                Subtree::new(mesh).with_geometry(geometry.clone()).with_material(material),
                &root,
                None,
            )
            .unwrap();
        assert_eq!(registered.len(), 2);
        assert!(registry.is_referenced(&geometry.uuid));
    }

    #[test]
    fn test_move_rejects_cycles() {
        let mut registry = Registry::new();
        let root = registry.root().clone();
        let a = group("A");
        let a_id = a.uuid.clone();
        let mut tree = Subtree::new(a);
        let child = group("A1");
        let child_id = child.uuid.clone();
        tree.add_child(&a_id, child).unwrap();
        registry.attach(tree, &root, None).unwrap();

        assert!(matches!(
            registry.move_node(&a_id, &child_id, 0),
            Err(RegistryError::Cycle { .. })
        ));
        registry.move_node(&child_id, &root, 0).unwrap();
        assert_eq!(registry.root_node().children(), &[child_id.clone(), a_id.clone()]);
        assert!(registry.node(&a_id).unwrap().children().is_empty());
        assert_eq!(
            registry.move_node(&root, &a_id, 0),
            Err(RegistryError::RootNode(root))
        );
    }

    #[test]
    fn test_rekey_updates_links() {
        let mut registry = Registry::new();
        let root = registry.root().clone();
        let mut tree = Subtree::new(group("A"));
        let a_id = tree.root().uuid.clone();
        let child = group("A1");
        let child_id = child.uuid.clone();
        tree.add_child(&a_id, child).unwrap();
        registry.attach(tree, &root, None).unwrap();

        let clip = AnimationClip::new("Bob", ClipKind::Tween).with_target(TargetBinding::object(a_id.as_str()));
        let clip_id = clip.uuid.clone();
        registry.register(Entity::AnimationClip(clip)).unwrap();

        let new_id = EntityId::from("renamed");
        registry.rekey_node(&a_id, &new_id).unwrap();
        assert!(registry.get(&a_id).is_none());
        assert_eq!(registry.root_node().children(), &[new_id.clone()]);
        assert_eq!(registry.node(&child_id).unwrap().parent(), Some(&new_id));
        let target = registry.animations().clip(&clip_id).and_then(|c| c.target.clone());
        assert_eq!(target, Some(TargetBinding::object("renamed")));

        assert_eq!(
            registry.rekey_node(&new_id, &child_id),
            Err(RegistryError::DuplicateId(child_id))
        );
    }

    #[test]
    fn test_unregister_node_removes_subtree() {
        let mut registry = Registry::new();
        let root = registry.root().clone();
        let mut tree = Subtree::new(group("A"));
        let a_id = tree.root().uuid.clone();
        let child = group("A1");
        let child_id = child.uuid.clone();
        tree.add_child(&a_id, child).unwrap();
        registry.attach(tree, &root, None).unwrap();

        let removed = registry.unregister(&a_id).unwrap();
        assert_eq!(removed.id(), a_id);
        assert!(!registry.contains(&child_id));
        assert_eq!(registry.node_count(), 1);
    }
}
