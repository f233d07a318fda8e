// SPDX-License-Identifier: MIT OR Apache-2.0
//! Commands that change the shape of the scene tree.

use super::{CommandError, EditorCommand, EditorContext, Result};
use crate::registry::{Entity, RegistryError};
use crate::scene::{EntityId, SceneNode, Subtree};
use crate::scripts::Script;
use crate::serialization::geometry::{geometry_from_record, geometry_to_record};
use crate::serialization::material::{
    material_from_record, material_to_record, texture_from_record, texture_to_record,
};
use crate::serialization::object::{tree_from_record, tree_to_record};
use crate::serialization::{as_record, decode_record, encode_record, Record, RecordError, RecordReader, Warnings};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shadow_editor_animation::TargetBinding;

pub(crate) fn subtree_to_record(subtree: &Subtree) -> Result<Record> {
    let root = &subtree.root().uuid;
    let object = tree_to_record(subtree, root)?.ok_or_else(|| RegistryError::NotFound(root.clone()))?;
    let mut r = Record::new();
    r.insert("object".into(), Value::Object(object));
    if !subtree.geometries.is_empty() {
        let records = subtree
            .geometries
            .iter()
            .map(|g| geometry_to_record(g).map(Value::Object))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        r.insert("geometries".into(), Value::Array(records));
    }
    if !subtree.materials.is_empty() {
        let records = subtree.materials.iter().map(|m| Value::Object(material_to_record(m)));
        r.insert("materials".into(), Value::Array(records.collect()));
    }
    if !subtree.textures.is_empty() {
        let records = subtree
            .textures
            .iter()
            .map(|t| texture_to_record(t).map(Value::Object))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        r.insert("textures".into(), Value::Array(records));
    }
    Ok(r)
}

fn records<T>(
    reader: &RecordReader<'_>,
    field: &str,
    read: fn(&Record, Option<T>) -> crate::serialization::Result<T>,
) -> Result<Vec<T>> {
    let items = reader
        .array(field)?
        .iter()
        .map(|value| as_record(field, value).and_then(|record| read(record, None)))
        .collect::<std::result::Result<Vec<_>, RecordError>>()?;
    Ok(items)
}

/// Read a subtree; unlike document loading, any bad part fails the whole record
pub(crate) fn subtree_from_record(record: &Record) -> Result<Subtree> {
    let reader = RecordReader::new("subtree", record);
    let object = reader
        .object("object")?
        .ok_or_else(|| reader.invalid("object", "missing subtree root"))?;
    let mut warnings = Warnings::new();
    let nodes = tree_from_record(object, &mut warnings)?;
    warnings.into_strict()?;

    let mut subtree = Subtree::from_nodes(nodes).ok_or_else(|| reader.invalid("object", "empty subtree"))?;
    subtree.geometries = records(&reader, "geometries", geometry_from_record)?;
    subtree.materials = records(&reader, "materials", material_from_record)?;
    subtree.textures = records(&reader, "textures", texture_from_record)?;
    Ok(subtree)
}

/// Scripts and clip targets of nodes that are out of the scene
///
/// A command that takes a subtree out keeps these so that putting the
/// subtree back, in this session or after a reload, restores them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Attachments {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    scripts: IndexMap<EntityId, Vec<Script>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    targets: IndexMap<String, TargetBinding>,
}

impl Attachments {
    fn take(ctx: &mut EditorContext, nodes: &[SceneNode]) -> Self {
        let ids: Vec<EntityId> = nodes.iter().map(|node| node.uuid.clone()).collect();
        let scripts = ids
            .iter()
            .map(|id| (id.clone(), ctx.scripts.take(id)))
            .filter(|(_, list)| !list.is_empty())
            .collect();
        let targets = ctx.registry.unbind_clips(&ids).into_iter().collect();
        Self { scripts, targets }
    }

    fn restore(self, ctx: &mut EditorContext) {
        for (object, list) in self.scripts {
            for script in list {
                ctx.scripts.insert(&object, None, script);
            }
        }
        for (clip, binding) in self.targets {
            ctx.registry.rebind_clip(&clip, binding);
        }
    }

    fn write(&self, r: &mut Record) -> Result<()> {
        if let Value::Object(fields) = serde_json::to_value(self)? {
            r.extend(fields);
        }
        Ok(())
    }

    fn read(reader: &RecordReader<'_>) -> Result<Self> {
        Ok(Self {
            scripts: reader.decode("scripts")?.unwrap_or_default(),
            targets: reader.decode("targets")?.unwrap_or_default(),
        })
    }
}

fn keep_asset(subtree: &mut Subtree, entity: Entity) {
    match entity {
        Entity::Geometry(geometry) => {
            subtree.geometries.retain(|g| g.uuid != geometry.uuid);
            subtree.geometries.push(geometry);
        }
        Entity::Material(material) => {
            subtree.materials.retain(|m| m.uuid != material.uuid);
            subtree.materials.push(material);
        }
        Entity::Texture(texture) => {
            subtree.textures.retain(|t| t.uuid != texture.uuid);
            subtree.textures.push(texture);
        }
        _ => {}
    }
}

/// Attach a subtree under a parent
///
/// Assets the subtree carries are registered unless already present; undo
/// unregisters the ones this command registered once nothing uses them.
#[derive(Debug, Clone, PartialEq)]
pub struct AddObjectCommand {
    subtree: Subtree,
    object: EntityId,
    parent: Option<EntityId>,
    index: Option<usize>,
    registered: Vec<EntityId>,
    attachments: Attachments,
}

impl AddObjectCommand {
    /// Add `subtree` as the last child of the scene root
    pub fn new(subtree: Subtree) -> Self {
        Self {
            object: subtree.root().uuid.clone(),
            subtree,
            parent: None,
            index: None,
            registered: Vec::new(),
            attachments: Attachments::default(),
        }
    }

    /// Add under `parent` at `index` (appended when `None`)
    pub fn with_parent(mut self, parent: &EntityId, index: Option<usize>) -> Self {
        self.parent = Some(parent.clone());
        self.index = index;
        self
    }

    /// Root of the added subtree
    pub fn object(&self) -> &EntityId {
        &self.object
    }

    /// Parent, once known
    pub fn parent(&self) -> Option<&EntityId> {
        self.parent.as_ref()
    }
}

impl EditorCommand for AddObjectCommand {
    const TYPE: &'static str = "AddObjectCommand";

    fn default_name(&self) -> String {
        format!("Add Object: {}", self.subtree.root().name)
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        let parent = match &self.parent {
            Some(parent) => parent.clone(),
            None => ctx.registry.root().clone(),
        };
        self.registered = ctx.registry.attach(self.subtree.clone(), &parent, self.index)?;
        self.index = ctx.registry.child_index(&self.object);
        self.parent = Some(parent);
        std::mem::take(&mut self.attachments).restore(ctx);
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        let detached = ctx.registry.detach(&self.object)?;
        self.attachments = Attachments::take(ctx, &detached.subtree.nodes);
        self.subtree.nodes = detached.subtree.nodes;
        // materials go before the textures they reference
        for id in std::mem::take(&mut self.registered).into_iter().rev() {
            if let Some(entity) = ctx.registry.release_if_unreferenced(&id) {
                keep_asset(&mut self.subtree, entity);
            }
        }
        Ok(())
    }

    fn to_record(&self) -> Result<Record> {
        let mut r = subtree_to_record(&self.subtree)?;
        r.insert("parent".into(), serde_json::to_value(&self.parent)?);
        r.insert("index".into(), serde_json::to_value(self.index)?);
        if !self.registered.is_empty() {
            r.insert("registered".into(), serde_json::to_value(&self.registered)?);
        }
        self.attachments.write(&mut r)?;
        Ok(r)
    }

    fn from_record(record: &Record) -> Result<Self> {
        let reader = RecordReader::new(Self::TYPE, record);
        let subtree = subtree_from_record(record)?;
        Ok(Self {
            object: subtree.root().uuid.clone(),
            subtree,
            parent: reader.opt_id("parent")?,
            index: reader.decode("index")?,
            registered: reader.decode("registered")?.unwrap_or_default(),
            attachments: Attachments::read(&reader)?,
        })
    }
}

/// Detach a subtree, remembering where it was
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveObjectCommand {
    object: EntityId,
    parent: EntityId,
    index: usize,
    subtree: Subtree,
    attachments: Attachments,
}

impl RemoveObjectCommand {
    /// Remove `object` and its descendants
    pub fn new(ctx: &EditorContext, object: &EntityId) -> Result<Self> {
        let node = ctx.registry.node(object)?;
        let parent = node
            .parent()
            .cloned()
            .ok_or_else(|| RegistryError::RootNode(object.clone()))?;
        let index = ctx
            .registry
            .child_index(object)
            .ok_or_else(|| RegistryError::NotFound(object.clone()))?;
        Ok(Self {
            object: object.clone(),
            parent,
            index,
            subtree: ctx.registry.snapshot(object)?,
            attachments: Attachments::default(),
        })
    }

    /// Removed node
    pub fn object(&self) -> &EntityId {
        &self.object
    }
}

impl EditorCommand for RemoveObjectCommand {
    const TYPE: &'static str = "RemoveObjectCommand";

    fn default_name(&self) -> String {
        format!("Remove Object: {}", self.subtree.root().name)
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        let detached = ctx.registry.detach(&self.object)?;
        self.parent = detached.parent;
        self.index = detached.index;
        self.attachments = Attachments::take(ctx, &detached.subtree.nodes);
        self.subtree = detached.subtree;
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        ctx.registry
            .attach(self.subtree.clone(), &self.parent, Some(self.index))?;
        std::mem::take(&mut self.attachments).restore(ctx);
        Ok(())
    }

    fn to_record(&self) -> Result<Record> {
        let mut r = subtree_to_record(&self.subtree)?;
        r.insert("parent".into(), Value::from(self.parent.as_str()));
        r.insert("index".into(), Value::from(self.index));
        self.attachments.write(&mut r)?;
        Ok(r)
    }

    fn from_record(record: &Record) -> Result<Self> {
        let reader = RecordReader::new(Self::TYPE, record);
        let subtree = subtree_from_record(record)?;
        Ok(Self {
            object: subtree.root().uuid.clone(),
            subtree,
            parent: reader.id("parent")?,
            index: reader.decode("index")?.unwrap_or_default(),
            attachments: Attachments::read(&reader)?,
        })
    }
}

/// Re-parent or reorder a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveObjectCommand {
    object: EntityId,
    old_parent: EntityId,
    old_index: usize,
    new_parent: EntityId,
    new_index: usize,
}

impl MoveObjectCommand {
    /// Move `object` so it sits before the child currently at `index` of
    /// `new_parent` (appended when `index` is past the end)
    pub fn new(ctx: &EditorContext, object: &EntityId, new_parent: &EntityId, index: usize) -> Result<Self> {
        let node = ctx.registry.node(object)?;
        let old_parent = node
            .parent()
            .cloned()
            .ok_or_else(|| RegistryError::RootNode(object.clone()))?;
        let old_index = ctx
            .registry
            .child_index(object)
            .ok_or_else(|| RegistryError::NotFound(object.clone()))?;
        let siblings = ctx.registry.node(new_parent)?.children().len();

        let mut new_index = index.min(siblings);
        // removing the node first shifts later siblings down by one
        if &old_parent == new_parent && new_index > old_index {
            new_index -= 1;
        }
        Ok(Self {
            object: object.clone(),
            old_parent,
            old_index,
            new_parent: new_parent.clone(),
            new_index,
        })
    }

    /// Index the node lands at in the new parent
    pub fn new_index(&self) -> usize {
        self.new_index
    }
}

impl EditorCommand for MoveObjectCommand {
    const TYPE: &'static str = "MoveObjectCommand";

    fn default_name(&self) -> String {
        "Move Object".to_string()
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        ctx.registry
            .move_node(&self.object, &self.new_parent, self.new_index)?;
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        ctx.registry
            .move_node(&self.object, &self.old_parent, self.old_index)?;
        Ok(())
    }

    fn to_record(&self) -> Result<Record> {
        Ok(encode_record(self)?)
    }

    fn from_record(record: &Record) -> Result<Self> {
        decode_record(Self::TYPE, record).map_err(CommandError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::components::{MeshComponent, NodeKind};
    use crate::registry::Entity;
    use crate::resources::{Geometry, GeometryKind, Material, MaterialKind};
    use crate::scene::SceneNode;
    use crate::scripts::ScriptKind;
    use shadow_editor_animation::{AnimationClip, ClipKind};

    fn group(name: &str) -> SceneNode {
        SceneNode::new(name, NodeKind::Group)
    }

    fn add(ctx: &mut EditorContext, node: SceneNode) -> EntityId {
        let id = node.uuid.clone();
        Command::from(AddObjectCommand::new(Subtree::new(node)))
            .execute(ctx)
            .unwrap();
        id
    }

    fn mesh_subtree() -> (Subtree, EntityId, EntityId) {
        let geometry = Geometry::new("Cube", GeometryKind::default());
        let material = Material::new("Paint", MaterialKind::Basic);
        let (g, m) = (geometry.uuid.clone(), material.uuid.clone());
        let mesh = SceneNode::new(
            "Cube",
            NodeKind::Mesh(MeshComponent {
                geometry: Some(g.clone()),
                material: Some(m.clone()),
            }),
        );
        let subtree = Subtree::new(mesh).with_geometry(geometry).with_material(material);
        (subtree, g, m)
    }

    #[test]
    fn test_add_undo_releases_carried_assets() {
        let mut ctx = EditorContext::new();
        let (subtree, g, m) = mesh_subtree();
        let object = subtree.root().uuid.clone();
        let mut command = Command::from(AddObjectCommand::new(subtree));

        command.execute(&mut ctx).unwrap();
        assert!(ctx.registry().contains(&object));
        assert!(ctx.registry().geometry(&g).is_ok());

        command.undo(&mut ctx).unwrap();
        assert!(!ctx.registry().contains(&object));
        assert!(!ctx.registry().contains(&g));
        assert!(!ctx.registry().contains(&m));

        command.execute(&mut ctx).unwrap();
        assert!(ctx.registry().material(&m).is_ok());
    }

    #[test]
    fn test_remove_undo_restores_position() {
        let mut ctx = EditorContext::new();
        let a = add(&mut ctx, group("A"));
        let b = add(&mut ctx, group("B"));
        let c = add(&mut ctx, group("C"));
        let mut child = group("Child");
        child.transform.position = [4.0, 0.0, 0.0];
        let child_id = child.uuid.clone();
        Command::from(AddObjectCommand::new(Subtree::new(child)).with_parent(&b, None))
            .execute(&mut ctx)
            .unwrap();

        let mut remove = Command::from(RemoveObjectCommand::new(&ctx, &b).unwrap());
        remove.execute(&mut ctx).unwrap();
        assert!(!ctx.registry().contains(&child_id));

        remove.undo(&mut ctx).unwrap();
        let root = ctx.registry().root_node();
        assert_eq!(root.children(), &[a, b.clone(), c]);
        let child = ctx.registry().node(&child_id).unwrap();
        assert_eq!(child.parent(), Some(&b));
        assert_eq!(child.transform.position, [4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_remove_carries_scripts_and_clip_targets() {
        let mut ctx = EditorContext::new();
        let a = add(&mut ctx, group("A"));
        let child = group("Child");
        let child_id = child.uuid.clone();
        Command::from(AddObjectCommand::new(Subtree::new(child)).with_parent(&a, None))
            .execute(&mut ctx)
            .unwrap();
        ctx.scripts.insert(&child_id, None, Script::new("Spin", ScriptKind::Javascript, ""));
        let clip = AnimationClip::new("Bob", ClipKind::Tween).with_target(TargetBinding::object(child_id.as_str()));
        let clip_id = clip.uuid.clone();
        ctx.registry.register(Entity::AnimationClip(clip)).unwrap();
        let target = |ctx: &EditorContext| ctx.registry().animations().clip(&clip_id).and_then(|c| c.target.clone());

        let mut remove = Command::from(RemoveObjectCommand::new(&ctx, &a).unwrap());
        remove.execute(&mut ctx).unwrap();
        assert!(ctx.scripts().scripts(&child_id).is_empty());
        assert_eq!(target(&ctx), None);

        let record = remove.to_record().unwrap();
        assert_eq!(record["scripts"][child_id.as_str()][0]["name"], "Spin");
        assert_eq!(record["targets"][clip_id.as_str()]["object"], child_id.as_str());

        remove.undo(&mut ctx).unwrap();
        assert_eq!(ctx.scripts().scripts(&child_id).len(), 1);
        assert_eq!(target(&ctx), Some(TargetBinding::object(child_id.as_str())));
    }

    #[test]
    fn test_add_undo_carries_scripts() {
        let mut ctx = EditorContext::new();
        let node = group("A");
        let id = node.uuid.clone();
        let mut command = Command::from(AddObjectCommand::new(Subtree::new(node)));
        command.execute(&mut ctx).unwrap();
        ctx.scripts.insert(&id, None, Script::new("Spin", ScriptKind::Javascript, ""));

        command.undo(&mut ctx).unwrap();
        assert!(ctx.scripts().is_empty());
        command.execute(&mut ctx).unwrap();
        assert_eq!(ctx.scripts().scripts(&id).len(), 1);
    }

    #[test]
    fn test_move_down_within_parent() {
        let mut ctx = EditorContext::new();
        let a = add(&mut ctx, group("A"));
        let b = add(&mut ctx, group("B"));
        let c = add(&mut ctx, group("C"));
        let root = ctx.registry().root().clone();

        // place A before C
        let mut command = Command::from(MoveObjectCommand::new(&ctx, &a, &root, 2).unwrap());
        command.execute(&mut ctx).unwrap();
        assert_eq!(ctx.registry().root_node().children(), &[b.clone(), a.clone(), c.clone()]);

        command.undo(&mut ctx).unwrap();
        assert_eq!(ctx.registry().root_node().children(), &[a, b, c]);
    }

    #[test]
    fn test_move_into_descendant_fails() {
        let mut ctx = EditorContext::new();
        let a = add(&mut ctx, group("A"));
        let inner = group("Inner");
        let inner_id = inner.uuid.clone();
        Command::from(AddObjectCommand::new(Subtree::new(inner)).with_parent(&a, None))
            .execute(&mut ctx)
            .unwrap();

        let mut command = Command::from(MoveObjectCommand::new(&ctx, &a, &inner_id, 0).unwrap());
        assert!(matches!(
            command.execute(&mut ctx),
            Err(CommandError::Registry(RegistryError::Cycle { .. }))
        ));
    }

    #[test]
    fn test_add_record_round_trip() {
        let (subtree, _, _) = mesh_subtree();
        let command = AddObjectCommand::new(subtree).with_parent(&EntityId::from("PARENT"), Some(2));
        let record = command.to_record().unwrap();
        assert!(record.get("registered").is_none());
        assert_eq!(AddObjectCommand::from_record(&record).unwrap(), command);
    }
}
