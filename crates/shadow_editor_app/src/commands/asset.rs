// SPDX-License-Identifier: MIT OR Apache-2.0
//! Commands that point a node or material at a different asset.
//!
//! The incoming asset is registered when it is not known yet. The asset it
//! replaces is unregistered once nothing references it, and the command
//! keeps the released copy so undo can register it again. An incoming asset
//! whose id is already registered updates that asset in place.

use super::field::mesh_material;
use super::{CommandError, EditorCommand, EditorContext, Result};
use crate::components::NodeKind;
use crate::events::EditorEvent;
use crate::registry::{Entity, RegistryError};
use crate::resources::{Geometry, Material, Texture};
use crate::scene::EntityId;
use crate::serialization::geometry::{geometry_from_record, geometry_to_record};
use crate::serialization::material::{
    material_from_record, material_to_record, texture_from_record, texture_to_record,
};
use crate::serialization::{Record, RecordReader};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetSlot {
    Geometry,
    Material,
}

impl AssetSlot {
    fn name(self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::Material => "material",
        }
    }

    fn changed(self, object: &EntityId) -> EditorEvent {
        match self {
            Self::Geometry => EditorEvent::GeometryChanged(object.clone()),
            Self::Material => EditorEvent::MaterialChanged(object.clone()),
        }
    }
}

fn asset_slot<'a>(
    ctx: &'a mut EditorContext,
    object: &EntityId,
    slot: AssetSlot,
) -> Result<&'a mut Option<EntityId>> {
    let node = ctx.registry.node_mut(object)?;
    let tag = node.type_tag();
    match (&mut node.kind, slot) {
        (NodeKind::Mesh(mesh), AssetSlot::Geometry) => Ok(&mut mesh.geometry),
        (NodeKind::Mesh(mesh) | NodeKind::Sprite(mesh), AssetSlot::Material) => Ok(&mut mesh.material),
        _ => Err(CommandError::UnknownField {
            target: tag.to_string(),
            attribute: slot.name().to_string(),
        }),
    }
}

/// How an incoming asset entered the registry
enum Installed {
    /// Newly registered
    Registered,
    /// Already registered with the same contents
    Shared,
    /// Registered version updated in place; holds the version it replaced
    Updated(Entity),
}

/// Register `entity`, or update the registered asset with the same id in
/// place so every node sharing it sees the new version
fn install(ctx: &mut EditorContext, entity: Entity) -> Result<Installed> {
    let id = entity.id();
    if let Entity::Material(material) = &entity {
        for texture in material.maps.values() {
            ctx.registry.texture(texture)?;
        }
    }
    if !ctx.registry.contains(&id) {
        ctx.registry.register(entity)?;
        return Ok(Installed::Registered);
    }
    let replaced = match entity {
        Entity::Geometry(incoming) => {
            let record = geometry_to_record(&incoming)?;
            let current = ctx.registry.geometry_mut(&id)?;
            let updated = geometry_from_record(&record, Some(current.clone()))?;
            (updated != *current).then(|| Entity::Geometry(std::mem::replace(current, updated)))
        }
        Entity::Material(incoming) => {
            let record = material_to_record(&incoming);
            let current = ctx.registry.material_mut(&id)?;
            let mut base = current.clone();
            base.maps.clear();
            let updated = material_from_record(&record, Some(base))?;
            (updated != *current).then(|| Entity::Material(std::mem::replace(current, updated)))
        }
        Entity::Texture(_) => {
            ctx.registry.texture(&id)?;
            None
        }
        _ => return Err(RegistryError::DuplicateId(id).into()),
    };
    Ok(replaced.map_or(Installed::Shared, Installed::Updated))
}

/// Point `slot` of `object` at `incoming`
///
/// Returns the asset the slot no longer uses: the released previous asset,
/// or the old version of an asset updated in place.
fn swap_asset(
    ctx: &mut EditorContext,
    object: &EntityId,
    slot: AssetSlot,
    incoming: Option<Entity>,
) -> Result<Option<Entity>> {
    asset_slot(ctx, object, slot)?;
    let incoming_id = incoming.as_ref().map(Entity::id);
    let installed = match incoming {
        Some(entity) => install(ctx, entity)?,
        None => Installed::Shared,
    };
    let previous = std::mem::replace(asset_slot(ctx, object, slot)?, incoming_id.clone());
    ctx.registry.emit(slot.changed(object));
    if let Installed::Updated(replaced) = installed {
        return Ok(Some(replaced));
    }
    Ok(previous
        .filter(|p| Some(p) != incoming_id.as_ref())
        .and_then(|p| ctx.registry.release_if_unreferenced(&p)))
}

fn optional_record(value: Option<Record>) -> Value {
    value.map(Value::Object).unwrap_or(Value::Null)
}

/// Give a mesh a different geometry
#[derive(Debug, Clone, PartialEq)]
pub struct SetGeometryCommand {
    object: EntityId,
    old: Option<Geometry>,
    new: Geometry,
}

impl SetGeometryCommand {
    /// Replace the geometry of mesh `object` with `geometry`
    pub fn new(ctx: &EditorContext, object: &EntityId, geometry: Geometry) -> Result<Self> {
        let node = ctx.registry.node(object)?;
        if !matches!(node.kind, NodeKind::Mesh(_)) {
            return Err(CommandError::UnknownField {
                target: node.type_tag().to_string(),
                attribute: "geometry".to_string(),
            });
        }
        let old = node
            .geometry()
            .map(|id| ctx.registry.geometry(id).cloned())
            .transpose()?;
        Ok(Self {
            object: object.clone(),
            old,
            new: geometry,
        })
    }
}

impl EditorCommand for SetGeometryCommand {
    const TYPE: &'static str = "SetGeometryCommand";

    fn default_name(&self) -> String {
        "Set Geometry".to_string()
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        let incoming = Entity::Geometry(self.new.clone());
        if let Some(Entity::Geometry(released)) = swap_asset(ctx, &self.object, AssetSlot::Geometry, Some(incoming))? {
            self.old = Some(released);
        }
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        let incoming = self.old.clone().map(Entity::Geometry);
        if let Some(Entity::Geometry(released)) = swap_asset(ctx, &self.object, AssetSlot::Geometry, incoming)? {
            self.new = released;
        }
        Ok(())
    }

    fn to_record(&self) -> Result<Record> {
        let mut r = Record::new();
        r.insert("object".into(), Value::from(self.object.as_str()));
        r.insert("oldGeometry".into(), optional_record(self.old.as_ref().map(geometry_to_record).transpose()?));
        r.insert("newGeometry".into(), Value::Object(geometry_to_record(&self.new)?));
        Ok(r)
    }

    fn from_record(record: &Record) -> Result<Self> {
        let reader = RecordReader::new(Self::TYPE, record);
        let new = reader
            .object("newGeometry")?
            .ok_or_else(|| reader.invalid("newGeometry", "missing geometry"))?;
        Ok(Self {
            object: reader.id("object")?,
            old: reader
                .object("oldGeometry")?
                .map(|r| geometry_from_record(r, None))
                .transpose()?,
            new: geometry_from_record(new, None)?,
        })
    }
}

/// Give a mesh or sprite a different material
#[derive(Debug, Clone, PartialEq)]
pub struct SetMaterialCommand {
    object: EntityId,
    old: Option<Material>,
    new: Material,
}

impl SetMaterialCommand {
    /// Replace the material of `object` with `material`
    ///
    /// Every texture the material maps must already be registered.
    pub fn new(ctx: &EditorContext, object: &EntityId, material: Material) -> Result<Self> {
        let node = ctx.registry.node(object)?;
        if node.kind.mesh().is_none() {
            return Err(CommandError::UnknownField {
                target: node.type_tag().to_string(),
                attribute: "material".to_string(),
            });
        }
        for texture in material.maps.values() {
            ctx.registry.texture(texture)?;
        }
        let old = node
            .material()
            .map(|id| ctx.registry.material(id).cloned())
            .transpose()?;
        Ok(Self {
            object: object.clone(),
            old,
            new: material,
        })
    }
}

impl EditorCommand for SetMaterialCommand {
    const TYPE: &'static str = "SetMaterialCommand";

    fn default_name(&self) -> String {
        "New Material".to_string()
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        let incoming = Entity::Material(self.new.clone());
        if let Some(Entity::Material(released)) = swap_asset(ctx, &self.object, AssetSlot::Material, Some(incoming))? {
            self.old = Some(released);
        }
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        let incoming = self.old.clone().map(Entity::Material);
        if let Some(Entity::Material(released)) = swap_asset(ctx, &self.object, AssetSlot::Material, incoming)? {
            self.new = released;
        }
        Ok(())
    }

    fn to_record(&self) -> Result<Record> {
        let mut r = Record::new();
        r.insert("object".into(), Value::from(self.object.as_str()));
        r.insert("oldMaterial".into(), optional_record(self.old.as_ref().map(material_to_record)));
        r.insert("newMaterial".into(), Value::Object(material_to_record(&self.new)));
        Ok(r)
    }

    fn from_record(record: &Record) -> Result<Self> {
        let reader = RecordReader::new(Self::TYPE, record);
        let new = reader
            .object("newMaterial")?
            .ok_or_else(|| reader.invalid("newMaterial", "missing material"))?;
        Ok(Self {
            object: reader.id("object")?,
            old: reader
                .object("oldMaterial")?
                .map(|r| material_from_record(r, None))
                .transpose()?,
            new: material_from_record(new, None)?,
        })
    }
}

/// Fill or clear one texture slot of a node's material
#[derive(Debug, Clone, PartialEq)]
pub struct SetMaterialMapCommand {
    object: EntityId,
    slot: String,
    old: Option<Texture>,
    new: Option<Texture>,
}

impl SetMaterialMapCommand {
    /// Set map `slot` of the material used by `object`; `None` clears it
    pub fn new(ctx: &EditorContext, object: &EntityId, slot: &str, texture: Option<Texture>) -> Result<Self> {
        let material = ctx.registry.material(&mesh_material(ctx, object)?)?;
        if !material.kind.supports_map(slot) {
            return Err(CommandError::UnknownField {
                target: material.kind.type_tag().to_string(),
                attribute: slot.to_string(),
            });
        }
        let old = material
            .maps
            .get(slot)
            .map(|id| ctx.registry.texture(id).cloned())
            .transpose()?;
        Ok(Self {
            object: object.clone(),
            slot: slot.to_string(),
            old,
            new: texture,
        })
    }

    fn set_map(&self, ctx: &mut EditorContext, incoming: Option<Texture>) -> Result<Option<Texture>> {
        let material_id = mesh_material(ctx, &self.object)?;
        ctx.registry.material(&material_id)?;
        let incoming_id = incoming.as_ref().map(|t| t.uuid.clone());
        if let Some(texture) = incoming {
            install(ctx, Entity::Texture(texture))?;
        }

        let maps = &mut ctx.registry.material_mut(&material_id)?.maps;
        let previous = match &incoming_id {
            Some(id) => maps.insert(self.slot.clone(), id.clone()),
            None => maps.remove(&self.slot),
        };
        ctx.registry.emit(EditorEvent::MaterialChanged(self.object.clone()));

        let released = previous
            .filter(|p| Some(p) != incoming_id.as_ref())
            .and_then(|p| ctx.registry.release_if_unreferenced(&p));
        Ok(match released {
            Some(Entity::Texture(texture)) => Some(texture),
            _ => None,
        })
    }
}

impl EditorCommand for SetMaterialMapCommand {
    const TYPE: &'static str = "SetMaterialMapCommand";

    fn default_name(&self) -> String {
        format!("Set Material.{}", self.slot)
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        if let Some(released) = self.set_map(ctx, self.new.clone())? {
            self.old = Some(released);
        }
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        if let Some(released) = self.set_map(ctx, self.old.clone())? {
            self.new = Some(released);
        }
        Ok(())
    }

    fn to_record(&self) -> Result<Record> {
        let mut r = Record::new();
        r.insert("object".into(), Value::from(self.object.as_str()));
        r.insert("mapName".into(), Value::from(self.slot.clone()));
        r.insert("oldMap".into(), optional_record(self.old.as_ref().map(texture_to_record).transpose()?));
        r.insert("newMap".into(), optional_record(self.new.as_ref().map(texture_to_record).transpose()?));
        Ok(r)
    }

    fn from_record(record: &Record) -> Result<Self> {
        let reader = RecordReader::new(Self::TYPE, record);
        Ok(Self {
            object: reader.id("object")?,
            slot: reader.str("mapName")?.to_string(),
            old: reader.object("oldMap")?.map(|r| texture_from_record(r, None)).transpose()?,
            new: reader.object("newMap")?.map(|r| texture_from_record(r, None)).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{AddObjectCommand, Command};
    use crate::components::MeshComponent;
    use crate::registry::RegistryError;
    use crate::resources::{GeometryKind, MaterialKind, SphereParams};
    use crate::scene::{SceneNode, Subtree};

    fn mesh_context() -> (EditorContext, EntityId, Geometry, Material) {
        let geometry = Geometry::new("Cube", GeometryKind::default());
        let material = Material::new("Paint", MaterialKind::Basic);
        let node = SceneNode::new(
            "Cube",
            NodeKind::Mesh(MeshComponent {
                geometry: Some(geometry.uuid.clone()),
                material: Some(material.uuid.clone()),
            }),
        );
        let id = node.uuid.clone();
        let mut ctx = EditorContext::new();
        let subtree = Subtree::new(node)
            .with_geometry(geometry.clone())
            .with_material(material.clone());
        Command::from(AddObjectCommand::new(subtree)).execute(&mut ctx).unwrap();
        (ctx, id, geometry, material)
    }

    #[test]
    fn test_set_geometry_releases_and_restores() {
        let (mut ctx, id, cube, _) = mesh_context();
        let sphere = Geometry::new("Ball", GeometryKind::Sphere(SphereParams::default()));
        let mut command = Command::from(SetGeometryCommand::new(&ctx, &id, sphere.clone()).unwrap());

        command.execute(&mut ctx).unwrap();
        assert_eq!(ctx.registry().node(&id).unwrap().geometry(), Some(&sphere.uuid));
        assert!(!ctx.registry().contains(&cube.uuid));

        command.undo(&mut ctx).unwrap();
        assert_eq!(ctx.registry().node(&id).unwrap().geometry(), Some(&cube.uuid));
        assert_eq!(ctx.registry().geometry(&cube.uuid).unwrap(), &cube);
        assert!(!ctx.registry().contains(&sphere.uuid));
    }

    #[test]
    fn test_shared_geometry_is_kept() {
        let (mut ctx, id, cube, material) = mesh_context();
        let twin = SceneNode::new(
            "Twin",
            NodeKind::Mesh(MeshComponent {
                geometry: Some(cube.uuid.clone()),
                material: Some(material.uuid.clone()),
            }),
        );
        Command::from(AddObjectCommand::new(Subtree::new(twin))).execute(&mut ctx).unwrap();

        let sphere = Geometry::new("Ball", GeometryKind::Sphere(SphereParams::default()));
        Command::from(SetGeometryCommand::new(&ctx, &id, sphere).unwrap())
            .execute(&mut ctx)
            .unwrap();
        assert!(ctx.registry().geometry(&cube.uuid).is_ok());
    }

    #[test]
    fn test_set_material_requires_registered_maps() {
        let (ctx, id, _, _) = mesh_context();
        let mut material = Material::new("Textured", MaterialKind::Basic);
        material.maps.insert("map".to_string(), EntityId::from("MISSING"));
        assert!(matches!(
            SetMaterialCommand::new(&ctx, &id, material),
            Err(CommandError::Registry(RegistryError::NotFound(_)))
        ));
    }

    #[test]
    fn test_set_material_round_trip() {
        let (mut ctx, id, _, paint) = mesh_context();
        let gloss = Material::new("Gloss", MaterialKind::Basic);
        let mut command = Command::from(SetMaterialCommand::new(&ctx, &id, gloss.clone()).unwrap());
        command.execute(&mut ctx).unwrap();
        assert_eq!(ctx.registry().node(&id).unwrap().material(), Some(&gloss.uuid));

        let record = command.to_record().unwrap();
        assert_eq!(record["newMaterial"]["name"], "Gloss");
        assert_eq!(record["oldMaterial"]["uuid"], paint.uuid.as_str());

        command.undo(&mut ctx).unwrap();
        assert_eq!(ctx.registry().node(&id).unwrap().material(), Some(&paint.uuid));
    }

    #[test]
    fn test_same_id_material_updates_in_place() {
        let (mut ctx, id, _, paint) = mesh_context();
        let mut repainted = paint.clone();
        repainted.color = 0x00ff00;
        let mut command = Command::from(SetMaterialCommand::new(&ctx, &id, repainted).unwrap());

        command.execute(&mut ctx).unwrap();
        assert_eq!(ctx.registry().node(&id).unwrap().material(), Some(&paint.uuid));
        let current = ctx.registry().material(&paint.uuid).unwrap();
        assert_eq!(current.color, 0x00ff00);
        assert_eq!(current.name, "Paint");

        command.undo(&mut ctx).unwrap();
        assert_eq!(ctx.registry().material(&paint.uuid).unwrap(), &paint);

        command.execute(&mut ctx).unwrap();
        assert_eq!(ctx.registry().material(&paint.uuid).unwrap().color, 0x00ff00);
    }

    #[test]
    fn test_same_id_geometry_updates_in_place() {
        let (mut ctx, id, cube, _) = mesh_context();
        let mut stretched = cube.clone();
        stretched.name = "Stretched".to_string();
        let mut command = Command::from(SetGeometryCommand::new(&ctx, &id, stretched).unwrap());

        command.execute(&mut ctx).unwrap();
        assert_eq!(ctx.registry().geometry(&cube.uuid).unwrap().name, "Stretched");
        assert_eq!(ctx.registry().node(&id).unwrap().geometry(), Some(&cube.uuid));

        command.undo(&mut ctx).unwrap();
        assert_eq!(ctx.registry().geometry(&cube.uuid).unwrap(), &cube);
    }

    #[test]
    fn test_material_map_slot() {
        let (mut ctx, id, _, paint) = mesh_context();
        let texture = Texture::new("Bricks", "bricks.png");
        let mut command = Command::from(SetMaterialMapCommand::new(&ctx, &id, "map", Some(texture.clone())).unwrap());

        command.execute(&mut ctx).unwrap();
        let material = ctx.registry().material(&paint.uuid).unwrap();
        assert_eq!(material.maps.get("map"), Some(&texture.uuid));
        assert!(ctx.registry().texture(&texture.uuid).is_ok());

        command.undo(&mut ctx).unwrap();
        assert!(ctx.registry().material(&paint.uuid).unwrap().maps.is_empty());
        assert!(!ctx.registry().contains(&texture.uuid));

        assert!(matches!(
            SetMaterialMapCommand::new(&ctx, &id, "shadowMap", None),
            Err(CommandError::UnknownField { .. })
        ));
    }
}
