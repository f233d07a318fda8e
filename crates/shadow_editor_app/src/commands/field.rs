// SPDX-License-Identifier: MIT OR Apache-2.0
//! Commands that overwrite one field and remember the value they replaced.
//!
//! The old value is read when the command is built; `execute` writes the
//! new value and `undo` writes the old one back.

use super::{CommandError, EditorCommand, EditorContext, MergeKey, Result};
use crate::events::EditorEvent;
use crate::registry::RegistryError;
use crate::scene::EntityId;
use crate::serialization::{decode_record, encode_record, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(super) fn mesh_geometry(ctx: &EditorContext, object: &EntityId) -> Result<EntityId> {
    let node = ctx.registry.node(object)?;
    node.geometry().cloned().ok_or_else(|| CommandError::UnknownField {
        target: node.type_tag().to_string(),
        attribute: "geometry".to_string(),
    })
}

pub(super) fn mesh_material(ctx: &EditorContext, object: &EntityId) -> Result<EntityId> {
    let node = ctx.registry.node(object)?;
    node.material().cloned().ok_or_else(|| CommandError::UnknownField {
        target: node.type_tag().to_string(),
        attribute: "material".to_string(),
    })
}

macro_rules! transform_command {
    ($(#[$meta:meta])* $name:ident, $tag:literal, $label:literal, $field:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            object: EntityId,
            old_value: [f32; 3],
            new_value: [f32; 3],
        }

        impl $name {
            /// Set the field of `object` to `value`
            pub fn new(ctx: &EditorContext, object: &EntityId, value: [f32; 3]) -> Result<Self> {
                let old_value = ctx.registry.node(object)?.transform.$field;
                Ok(Self {
                    object: object.clone(),
                    old_value,
                    new_value: value,
                })
            }

            fn write(&self, ctx: &mut EditorContext, value: [f32; 3]) -> Result<()> {
                ctx.registry.node_mut(&self.object)?.transform.$field = value;
                ctx.registry.emit(EditorEvent::ObjectChanged(self.object.clone()));
                Ok(())
            }
        }

        impl EditorCommand for $name {
            const TYPE: &'static str = $tag;

            fn default_name(&self) -> String {
                $label.to_string()
            }

            fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
                self.write(ctx, self.new_value)
            }

            fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
                self.write(ctx, self.old_value)
            }

            fn to_record(&self) -> Result<Record> {
                Ok(encode_record(self)?)
            }

            fn from_record(record: &Record) -> Result<Self> {
                Ok(decode_record(Self::TYPE, record)?)
            }

            fn merge_key(&self) -> Option<MergeKey> {
                Some(MergeKey::new(&self.object, stringify!($field)))
            }

            fn merge(&mut self, newer: Self) {
                self.new_value = newer.new_value;
            }
        }
    };
}

transform_command!(
    /// Move a node
    SetPositionCommand,
    "SetPositionCommand",
    "Set Position",
    position
);
transform_command!(
    /// Rotate a node (Euler angles in radians)
    SetRotationCommand,
    "SetRotationCommand",
    "Set Rotation",
    rotation
);
transform_command!(
    /// Scale a node
    SetScaleCommand,
    "SetScaleCommand",
    "Set Scale",
    scale
);

/// Set a named node attribute (`name`, `visible`, `intensity`, `fov`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetValueCommand {
    object: EntityId,
    attribute: String,
    old_value: Value,
    new_value: Value,
}

impl SetValueCommand {
    /// Set `attribute` of `object` to `value`
    pub fn new(ctx: &EditorContext, object: &EntityId, attribute: &str, value: Value) -> Result<Self> {
        let node = ctx.registry.node(object)?;
        let old_value = node.attribute(attribute).ok_or_else(|| CommandError::UnknownField {
            target: node.type_tag().to_string(),
            attribute: attribute.to_string(),
        })?;
        Ok(Self::with_old(object, attribute, old_value, value))
    }

    /// Build with an explicit old value, for nodes that do not exist yet
    pub fn with_old(object: &EntityId, attribute: &str, old_value: Value, new_value: Value) -> Self {
        Self {
            object: object.clone(),
            attribute: attribute.to_string(),
            old_value,
            new_value,
        }
    }

    fn write(&self, ctx: &mut EditorContext, value: &Value) -> Result<()> {
        ctx.registry
            .node_mut(&self.object)?
            .set_attribute(&self.attribute, value)?;
        ctx.registry.emit(EditorEvent::ObjectChanged(self.object.clone()));
        Ok(())
    }
}

impl EditorCommand for SetValueCommand {
    const TYPE: &'static str = "SetValueCommand";

    fn default_name(&self) -> String {
        format!("Set {}", self.attribute)
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        self.write(ctx, &self.new_value)
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        self.write(ctx, &self.old_value)
    }

    fn to_record(&self) -> Result<Record> {
        Ok(encode_record(self)?)
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(decode_record(Self::TYPE, record)?)
    }

    fn merge_key(&self) -> Option<MergeKey> {
        Some(MergeKey::new(&self.object, self.attribute.clone()))
    }

    fn merge(&mut self, newer: Self) {
        self.new_value = newer.new_value;
    }
}

/// Set a node colour (`color`, `groundColor`, `background`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetColorCommand {
    object: EntityId,
    attribute: String,
    old_value: u32,
    new_value: u32,
}

impl SetColorCommand {
    /// Set colour `attribute` of `object` to `hex`
    pub fn new(ctx: &EditorContext, object: &EntityId, attribute: &str, hex: u32) -> Result<Self> {
        let node = ctx.registry.node(object)?;
        let old_value = node.color(attribute).ok_or_else(|| CommandError::UnknownField {
            target: node.type_tag().to_string(),
            attribute: attribute.to_string(),
        })?;
        Ok(Self {
            object: object.clone(),
            attribute: attribute.to_string(),
            old_value,
            new_value: hex,
        })
    }

    fn write(&self, ctx: &mut EditorContext, hex: u32) -> Result<()> {
        ctx.registry
            .node_mut(&self.object)?
            .set_color(&self.attribute, hex)?;
        ctx.registry.emit(EditorEvent::ObjectChanged(self.object.clone()));
        Ok(())
    }
}

impl EditorCommand for SetColorCommand {
    const TYPE: &'static str = "SetColorCommand";

    fn default_name(&self) -> String {
        format!("Set {}", self.attribute)
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        self.write(ctx, self.new_value)
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        self.write(ctx, self.old_value)
    }

    fn to_record(&self) -> Result<Record> {
        Ok(encode_record(self)?)
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(decode_record(Self::TYPE, record)?)
    }

    fn merge_key(&self) -> Option<MergeKey> {
        Some(MergeKey::new(&self.object, self.attribute.clone()))
    }

    fn merge(&mut self, newer: Self) {
        self.new_value = newer.new_value;
    }
}

/// Give a node a new identifier
///
/// Parent and child links and attached scripts follow the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUuidCommand {
    old_uuid: EntityId,
    new_uuid: EntityId,
}

impl SetUuidCommand {
    /// Rename `object` to `new_uuid`
    pub fn new(ctx: &EditorContext, object: &EntityId, new_uuid: EntityId) -> Result<Self> {
        ctx.registry.node(object)?;
        if ctx.registry.contains(&new_uuid) {
            return Err(RegistryError::DuplicateId(new_uuid).into());
        }
        Ok(Self {
            old_uuid: object.clone(),
            new_uuid,
        })
    }

    fn rekey(ctx: &mut EditorContext, from: &EntityId, to: &EntityId) -> Result<()> {
        ctx.registry.rekey_node(from, to)?;
        ctx.scripts.rekey(from, to);
        Ok(())
    }
}

impl EditorCommand for SetUuidCommand {
    const TYPE: &'static str = "SetUuidCommand";

    fn default_name(&self) -> String {
        "Update UUID".to_string()
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        Self::rekey(ctx, &self.old_uuid, &self.new_uuid)
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        Self::rekey(ctx, &self.new_uuid, &self.old_uuid)
    }

    fn to_record(&self) -> Result<Record> {
        Ok(encode_record(self)?)
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(decode_record(Self::TYPE, record)?)
    }
}

/// Set a construction parameter of a mesh's geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetGeometryValueCommand {
    object: EntityId,
    attribute: String,
    old_value: Value,
    new_value: Value,
}

impl SetGeometryValueCommand {
    /// Set parameter `attribute` of the geometry used by `object`
    pub fn new(ctx: &EditorContext, object: &EntityId, attribute: &str, value: Value) -> Result<Self> {
        let geometry = ctx.registry.geometry(&mesh_geometry(ctx, object)?)?;
        let old_value = geometry.attribute(attribute).ok_or_else(|| CommandError::UnknownField {
            target: geometry.kind.type_tag().to_string(),
            attribute: attribute.to_string(),
        })?;
        Ok(Self {
            object: object.clone(),
            attribute: attribute.to_string(),
            old_value,
            new_value: value,
        })
    }

    fn write(&self, ctx: &mut EditorContext, value: &Value) -> Result<()> {
        let geometry = mesh_geometry(ctx, &self.object)?;
        ctx.registry
            .geometry_mut(&geometry)?
            .set_attribute(&self.attribute, value.clone())?;
        ctx.registry.emit(EditorEvent::GeometryChanged(self.object.clone()));
        Ok(())
    }
}

impl EditorCommand for SetGeometryValueCommand {
    const TYPE: &'static str = "SetGeometryValueCommand";

    fn default_name(&self) -> String {
        format!("Set Geometry.{}", self.attribute)
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        self.write(ctx, &self.new_value)
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        self.write(ctx, &self.old_value)
    }

    fn to_record(&self) -> Result<Record> {
        Ok(encode_record(self)?)
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(decode_record(Self::TYPE, record)?)
    }

    fn merge_key(&self) -> Option<MergeKey> {
        Some(MergeKey::new(&self.object, self.attribute.clone()))
    }

    fn merge(&mut self, newer: Self) {
        self.new_value = newer.new_value;
    }
}

/// Set an attribute of a node's material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMaterialValueCommand {
    object: EntityId,
    attribute: String,
    old_value: Value,
    new_value: Value,
}

impl SetMaterialValueCommand {
    /// Set `attribute` of the material used by `object`
    pub fn new(ctx: &EditorContext, object: &EntityId, attribute: &str, value: Value) -> Result<Self> {
        let material = ctx.registry.material(&mesh_material(ctx, object)?)?;
        let old_value = material.attribute(attribute).ok_or_else(|| CommandError::UnknownField {
            target: material.kind.type_tag().to_string(),
            attribute: attribute.to_string(),
        })?;
        Ok(Self {
            object: object.clone(),
            attribute: attribute.to_string(),
            old_value,
            new_value: value,
        })
    }

    fn write(&self, ctx: &mut EditorContext, value: &Value) -> Result<()> {
        let material = mesh_material(ctx, &self.object)?;
        ctx.registry
            .material_mut(&material)?
            .set_attribute(&self.attribute, value)?;
        ctx.registry.emit(EditorEvent::MaterialChanged(self.object.clone()));
        Ok(())
    }
}

impl EditorCommand for SetMaterialValueCommand {
    const TYPE: &'static str = "SetMaterialValueCommand";

    fn default_name(&self) -> String {
        format!("Set Material.{}", self.attribute)
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        self.write(ctx, &self.new_value)
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        self.write(ctx, &self.old_value)
    }

    fn to_record(&self) -> Result<Record> {
        Ok(encode_record(self)?)
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(decode_record(Self::TYPE, record)?)
    }

    fn merge_key(&self) -> Option<MergeKey> {
        Some(MergeKey::new(&self.object, self.attribute.clone()))
    }

    fn merge(&mut self, newer: Self) {
        self.new_value = newer.new_value;
    }
}

/// Set a colour of a node's material (`color`, `emissive`, `specular`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMaterialColorCommand {
    object: EntityId,
    attribute: String,
    old_value: u32,
    new_value: u32,
}

impl SetMaterialColorCommand {
    /// Set colour `attribute` of the material used by `object`
    pub fn new(ctx: &EditorContext, object: &EntityId, attribute: &str, hex: u32) -> Result<Self> {
        let material = ctx.registry.material(&mesh_material(ctx, object)?)?;
        let old_value = material.color(attribute).ok_or_else(|| CommandError::UnknownField {
            target: material.kind.type_tag().to_string(),
            attribute: attribute.to_string(),
        })?;
        Ok(Self {
            object: object.clone(),
            attribute: attribute.to_string(),
            old_value,
            new_value: hex,
        })
    }

    fn write(&self, ctx: &mut EditorContext, hex: u32) -> Result<()> {
        let material = mesh_material(ctx, &self.object)?;
        ctx.registry
            .material_mut(&material)?
            .set_color(&self.attribute, hex)?;
        ctx.registry.emit(EditorEvent::MaterialChanged(self.object.clone()));
        Ok(())
    }
}

impl EditorCommand for SetMaterialColorCommand {
    const TYPE: &'static str = "SetMaterialColorCommand";

    fn default_name(&self) -> String {
        format!("Set Material.{}", self.attribute)
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        self.write(ctx, self.new_value)
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        self.write(ctx, self.old_value)
    }

    fn to_record(&self) -> Result<Record> {
        Ok(encode_record(self)?)
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(decode_record(Self::TYPE, record)?)
    }

    fn merge_key(&self) -> Option<MergeKey> {
        Some(MergeKey::new(&self.object, self.attribute.clone()))
    }

    fn merge(&mut self, newer: Self) {
        self.new_value = newer.new_value;
    }
}
