// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene graph data.
//!
//! Nodes reference their parent by identifier only; the parent's `children`
//! list is the owning direction. Geometries and materials are referenced by
//! identifier and stored once in the registry.

use crate::components::NodeKind;
use crate::registry::RegistryError;
use crate::resources::{Geometry, Material, Texture};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Attribute access errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    /// The target has no attribute with this name
    #[error("{target} has no attribute `{attribute}`")]
    Unknown {
        /// Type tag of the target
        target: String,
        /// Requested attribute
        attribute: String,
    },

    /// The value does not fit the attribute
    #[error("Invalid value for `{attribute}`: {reason}")]
    Invalid {
        /// Attribute being written
        attribute: String,
        /// Why the value was rejected
        reason: String,
    },
}

impl FieldError {
    pub(crate) fn unknown(target: &str, attribute: &str) -> Self {
        Self::Unknown {
            target: target.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub(crate) fn invalid(attribute: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }
}

pub(crate) fn value_f32(attribute: &str, value: &Value) -> Result<f32, FieldError> {
    value
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| FieldError::invalid(attribute, "expected a number"))
}

pub(crate) fn value_bool(attribute: &str, value: &Value) -> Result<bool, FieldError> {
    value
        .as_bool()
        .ok_or_else(|| FieldError::invalid(attribute, "expected a boolean"))
}

pub(crate) fn value_string(attribute: &str, value: &Value) -> Result<String, FieldError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| FieldError::invalid(attribute, "expected a string"))
}

pub(crate) fn value_i32(attribute: &str, value: &Value) -> Result<i32, FieldError> {
    value
        .as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| FieldError::invalid(attribute, "expected an integer"))
}

/// Opaque identifier of a registered entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string().to_uppercase())
    }

    /// Wrap an existing identifier
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Transform component data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in parent space
    pub position: [f32; 3],
    /// Euler rotation in radians
    pub rotation: [f32; 3],
    /// Scale
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }
}

/// Where a node's source asset was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadOrigin {
    /// Created or imported locally
    #[default]
    Local,
    /// Instantiated from the asset server
    Server,
}

/// Script hook lists carried in user data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptHook {
    /// Run once when play starts
    OnStart,
    /// Run every frame
    OnUpdate,
    /// Run once when play stops
    OnStop,
}

impl ScriptHook {
    /// All hooks
    pub const ALL: [ScriptHook; 3] = [ScriptHook::OnStart, ScriptHook::OnUpdate, ScriptHook::OnStop];
}

/// Identity of the catalog entry a node was instantiated from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceIdentity {
    /// Server-side asset ID
    pub id: String,
    /// Asset name
    pub name: String,
    /// Download URL
    pub url: String,
    /// Thumbnail URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Handle to renderer-side model data. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelHandle(pub u64);

/// Free-form per-node data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    /// Catalog source, if instantiated from one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceIdentity>,
    /// Pinyin initials used for search
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub first_pinyin: String,
    /// Full pinyin used for search
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub total_pinyin: String,
    /// Load origin
    #[serde(default)]
    pub origin: LoadOrigin,
    /// Scripts run on start
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_start: Vec<EntityId>,
    /// Scripts run every frame
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_update: Vec<EntityId>,
    /// Scripts run on stop
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_stop: Vec<EntityId>,
    /// Open bag for application data
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom_data: Map<String, Value>,
    /// Transient renderer handle
    #[serde(skip)]
    pub model_handle: Option<ModelHandle>,
}

impl UserData {
    /// Scripts bound to a hook
    pub fn hook(&self, hook: ScriptHook) -> &[EntityId] {
        match hook {
            ScriptHook::OnStart => &self.on_start,
            ScriptHook::OnUpdate => &self.on_update,
            ScriptHook::OnStop => &self.on_stop,
        }
    }

    pub(crate) fn hook_mut(&mut self, hook: ScriptHook) -> &mut Vec<EntityId> {
        match hook {
            ScriptHook::OnStart => &mut self.on_start,
            ScriptHook::OnUpdate => &mut self.on_update,
            ScriptHook::OnStop => &mut self.on_stop,
        }
    }
}

/// A node of the scene tree
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Unique identifier
    pub uuid: EntityId,
    /// Display name
    pub name: String,
    /// Type tag and kind-specific data
    pub kind: NodeKind,
    /// Local transform
    pub transform: Transform,
    /// Whether the node is rendered
    pub visible: bool,
    /// Whether the node casts shadows
    pub cast_shadow: bool,
    /// Whether the node receives shadows
    pub receive_shadow: bool,
    /// Whether the renderer may cull the node
    pub frustum_culled: bool,
    /// Render order override
    pub render_order: i32,
    /// User data
    pub user_data: UserData,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
}

impl SceneNode {
    /// Create a detached node with a fresh identifier
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            uuid: EntityId::new(),
            name: name.into(),
            kind,
            transform: Transform::default(),
            visible: true,
            cast_shadow: false,
            receive_shadow: false,
            frustum_culled: true,
            render_order: 0,
            user_data: UserData::default(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Replace the identifier
    pub fn with_uuid(mut self, uuid: EntityId) -> Self {
        self.uuid = uuid;
        self
    }

    /// Set the position
    pub fn with_position(mut self, position: [f32; 3]) -> Self {
        self.transform.position = position;
        self
    }

    /// Parent identifier, `None` for the root or a detached node
    pub fn parent(&self) -> Option<&EntityId> {
        self.parent.as_ref()
    }

    /// Child identifiers in order
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// Type tag
    pub fn type_tag(&self) -> &'static str {
        self.kind.type_tag()
    }

    /// Referenced geometry
    pub fn geometry(&self) -> Option<&EntityId> {
        self.kind.mesh().and_then(|mesh| mesh.geometry.as_ref())
    }

    /// Referenced material
    pub fn material(&self) -> Option<&EntityId> {
        self.kind.mesh().and_then(|mesh| mesh.material.as_ref())
    }

    /// Read an attribute by name as a JSON value
    pub fn attribute(&self, name: &str) -> Option<Value> {
        let value = match name {
            "name" => Value::from(self.name.clone()),
            "visible" => Value::from(self.visible),
            "castShadow" => Value::from(self.cast_shadow),
            "receiveShadow" => Value::from(self.receive_shadow),
            "frustumCulled" => Value::from(self.frustum_culled),
            "renderOrder" => Value::from(self.render_order),
            "userData" => serde_json::to_value(&self.user_data).ok()?,
            _ => return self.kind.attribute(name),
        };
        Some(value)
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: &Value) -> Result<(), FieldError> {
        match name {
            "name" => self.name = value_string(name, value)?,
            "visible" => self.visible = value_bool(name, value)?,
            "castShadow" => self.cast_shadow = value_bool(name, value)?,
            "receiveShadow" => self.receive_shadow = value_bool(name, value)?,
            "frustumCulled" => self.frustum_culled = value_bool(name, value)?,
            "renderOrder" => self.render_order = value_i32(name, value)?,
            "userData" => {
                let handle = self.user_data.model_handle;
                self.user_data = serde_json::from_value(value.clone())
                    .map_err(|err| FieldError::invalid(name, err.to_string()))?;
                self.user_data.model_handle = handle;
            }
            _ => self.kind.set_attribute(name, value)?,
        }
        Ok(())
    }

    /// Read a colour attribute
    pub fn color(&self, name: &str) -> Option<u32> {
        self.kind.color(name)
    }

    pub(crate) fn set_color(&mut self, name: &str, hex: u32) -> Result<(), FieldError> {
        self.kind.set_color(name, hex)
    }
}

/// A detached tree of nodes plus the assets it carries
///
/// Nodes are stored in pre-order; the first node is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Subtree {
    pub(crate) nodes: Vec<SceneNode>,
    /// Geometries to register alongside the nodes
    pub geometries: Vec<Geometry>,
    /// Materials to register alongside the nodes
    pub materials: Vec<Material>,
    /// Textures to register alongside the nodes
    pub textures: Vec<Texture>,
}

impl Subtree {
    /// Start a subtree from its root node
    pub fn new(mut root: SceneNode) -> Self {
        root.parent = None;
        root.children.clear();
        Self {
            nodes: vec![root],
            geometries: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
        }
    }

    pub(crate) fn from_nodes(nodes: Vec<SceneNode>) -> Option<Self> {
        if nodes.is_empty() {
            return None;
        }
        Some(Self {
            nodes,
            geometries: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
        })
    }

    /// Append `node` as the last child of `parent`
    pub fn add_child(&mut self, parent: &EntityId, mut node: SceneNode) -> Result<(), RegistryError> {
        if self.node(&node.uuid).is_some() {
            return Err(RegistryError::DuplicateId(node.uuid));
        }
        let Some(position) = self.nodes.iter().position(|n| &n.uuid == parent) else {
            return Err(RegistryError::NotFound(parent.clone()));
        };
        node.parent = Some(parent.clone());
        node.children.clear();
        self.nodes[position].children.push(node.uuid.clone());

        // keep pre-order: insert after the parent's last descendant
        let end = self.descendant_end(position);
        self.nodes.insert(end, node);
        Ok(())
    }

    fn descendant_end(&self, position: usize) -> usize {
        let mut inside: HashSet<&EntityId> = HashSet::new();
        inside.insert(&self.nodes[position].uuid);
        let mut end = position + 1;
        while end < self.nodes.len() {
            match self.nodes[end].parent.as_ref() {
                Some(parent) if inside.contains(parent) => {
                    inside.insert(&self.nodes[end].uuid);
                    end += 1;
                }
                _ => break,
            }
        }
        end
    }

    /// Carry a geometry
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometries.push(geometry);
        self
    }

    /// Carry a material
    pub fn with_material(mut self, material: Material) -> Self {
        self.materials.push(material);
        self
    }

    /// Carry a texture
    pub fn with_texture(mut self, texture: Texture) -> Self {
        self.textures.push(texture);
        self
    }

    /// Root node
    pub fn root(&self) -> &SceneNode {
        &self.nodes[0]
    }

    pub(crate) fn root_mut(&mut self) -> &mut SceneNode {
        &mut self.nodes[0]
    }

    /// All nodes in pre-order
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    /// Find a node by identifier
    pub fn node(&self, id: &EntityId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| &n.uuid == id)
    }

    /// Split into one subtree per child of the root, each carrying the assets
    /// its nodes reference
    pub fn split_children(&self) -> Vec<Subtree> {
        let root = self.root();
        root.children
            .iter()
            .filter_map(|child| {
                let start = self.nodes.iter().position(|n| &n.uuid == child)?;
                let end = self.descendant_end(start);
                let mut nodes = self.nodes[start..end].to_vec();
                nodes[0].parent = None;
                let mut part = Subtree::from_nodes(nodes)?;
                part.take_assets_from(self);
                Some(part)
            })
            .collect()
    }

    fn take_assets_from(&mut self, source: &Subtree) {
        let geometries: HashSet<&EntityId> = self.nodes.iter().filter_map(SceneNode::geometry).collect();
        let materials: HashSet<&EntityId> = self.nodes.iter().filter_map(SceneNode::material).collect();
        self.geometries = source
            .geometries
            .iter()
            .filter(|g| geometries.contains(&g.uuid))
            .cloned()
            .collect();
        self.materials = source
            .materials
            .iter()
            .filter(|m| materials.contains(&m.uuid))
            .cloned()
            .collect();
        let textures: HashSet<&EntityId> = self.materials.iter().flat_map(|m| m.maps.values()).collect();
        self.textures = source
            .textures
            .iter()
            .filter(|t| textures.contains(&t.uuid))
            .cloned()
            .collect();
    }
}
