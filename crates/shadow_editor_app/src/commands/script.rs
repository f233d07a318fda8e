// SPDX-License-Identifier: MIT OR Apache-2.0
//! Commands that attach, detach and edit node scripts.

use super::{CommandError, EditorCommand, EditorContext, MergeKey, Result};
use crate::events::EditorEvent;
use crate::registry::RegistryError;
use crate::scene::{EntityId, ScriptHook};
use crate::scripts::Script;
use crate::serialization::{decode_record, encode_record, Record};
use serde::{Deserialize, Serialize};

/// Attach a script to a node, optionally binding it to a play hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddScriptCommand {
    object: EntityId,
    script: Script,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hook: Option<ScriptHook>,
}

impl AddScriptCommand {
    /// Attach `script` to `object`
    pub fn new(ctx: &EditorContext, object: &EntityId, script: Script, hook: Option<ScriptHook>) -> Result<Self> {
        ctx.registry.node(object)?;
        Ok(Self {
            object: object.clone(),
            script,
            hook,
        })
    }

    fn event(&self, added: bool) -> EditorEvent {
        let (object, script) = (self.object.clone(), self.script.uuid.clone());
        if added {
            EditorEvent::ScriptAdded { object, script }
        } else {
            EditorEvent::ScriptRemoved { object, script }
        }
    }
}

impl EditorCommand for AddScriptCommand {
    const TYPE: &'static str = "AddScriptCommand";

    fn default_name(&self) -> String {
        "Add Script".to_string()
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        let node = ctx.registry.node_mut(&self.object)?;
        if let Some(hook) = self.hook {
            node.user_data.hook_mut(hook).push(self.script.uuid.clone());
        }
        ctx.scripts.insert(&self.object, None, self.script.clone());
        ctx.registry.emit(self.event(true));
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        let node = ctx.registry.node_mut(&self.object)?;
        if let Some(hook) = self.hook {
            node.user_data.hook_mut(hook).retain(|id| id != &self.script.uuid);
        }
        if let Some((_, script)) = ctx.scripts.remove(&self.object, &self.script.uuid) {
            self.script = script;
        }
        ctx.registry.emit(self.event(false));
        Ok(())
    }

    fn to_record(&self) -> Result<Record> {
        Ok(encode_record(self)?)
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(decode_record(Self::TYPE, record)?)
    }
}

/// Detach a script, remembering its position and hook bindings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveScriptCommand {
    object: EntityId,
    script: Script,
    index: usize,
    #[serde(default)]
    hooks: Vec<(ScriptHook, usize)>,
}

impl RemoveScriptCommand {
    /// Detach script `script` from `object`
    pub fn new(ctx: &EditorContext, object: &EntityId, script: &EntityId) -> Result<Self> {
        ctx.registry.node(object)?;
        let (index, found) = ctx
            .scripts
            .find(object, script)
            .ok_or_else(|| RegistryError::NotFound(script.clone()))?;
        Ok(Self {
            object: object.clone(),
            script: found.clone(),
            index,
            hooks: Vec::new(),
        })
    }
}

impl EditorCommand for RemoveScriptCommand {
    const TYPE: &'static str = "RemoveScriptCommand";

    fn default_name(&self) -> String {
        "Remove Script".to_string()
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        let node = ctx.registry.node_mut(&self.object)?;
        let (index, script) = ctx
            .scripts
            .remove(&self.object, &self.script.uuid)
            .ok_or_else(|| RegistryError::NotFound(self.script.uuid.clone()))?;

        self.hooks.clear();
        for hook in ScriptHook::ALL {
            let bound = node.user_data.hook_mut(hook);
            if let Some(at) = bound.iter().position(|id| id == &script.uuid) {
                bound.remove(at);
                self.hooks.push((hook, at));
            }
        }
        self.index = index;
        self.script = script;
        ctx.registry.emit(EditorEvent::ScriptRemoved {
            object: self.object.clone(),
            script: self.script.uuid.clone(),
        });
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        let node = ctx.registry.node_mut(&self.object)?;
        for (hook, at) in &self.hooks {
            let bound = node.user_data.hook_mut(*hook);
            bound.insert((*at).min(bound.len()), self.script.uuid.clone());
        }
        ctx.scripts.insert(&self.object, Some(self.index), self.script.clone());
        ctx.registry.emit(EditorEvent::ScriptAdded {
            object: self.object.clone(),
            script: self.script.uuid.clone(),
        });
        Ok(())
    }

    fn to_record(&self) -> Result<Record> {
        Ok(encode_record(self)?)
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(decode_record(Self::TYPE, record)?)
    }
}

/// Change a script's `name`, `source` or `type`
///
/// Consecutive edits of the same script field always collapse into one
/// history entry, however far apart they are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetScriptValueCommand {
    object: EntityId,
    script: EntityId,
    attribute: String,
    old_value: String,
    new_value: String,
}

impl SetScriptValueCommand {
    /// Set `attribute` of script `script` on `object` to `value`
    pub fn new(
        ctx: &EditorContext,
        object: &EntityId,
        script: &EntityId,
        attribute: &str,
        value: impl Into<String>,
    ) -> Result<Self> {
        let (_, found) = ctx
            .scripts
            .find(object, script)
            .ok_or_else(|| RegistryError::NotFound(script.clone()))?;
        let old_value = found.attribute(attribute).ok_or_else(|| CommandError::UnknownField {
            target: "Script".to_string(),
            attribute: attribute.to_string(),
        })?;
        Ok(Self {
            object: object.clone(),
            script: script.clone(),
            attribute: attribute.to_string(),
            old_value,
            new_value: value.into(),
        })
    }

    fn write(&self, ctx: &mut EditorContext, value: &str) -> Result<()> {
        ctx.scripts
            .script_mut(&self.object, &self.script)
            .ok_or_else(|| RegistryError::NotFound(self.script.clone()))?
            .set_attribute(&self.attribute, value.to_string())?;
        ctx.registry.emit(EditorEvent::ScriptChanged {
            object: self.object.clone(),
            script: self.script.clone(),
        });
        Ok(())
    }
}

impl EditorCommand for SetScriptValueCommand {
    const TYPE: &'static str = "SetScriptValueCommand";

    fn default_name(&self) -> String {
        format!("Set Script.{}", self.attribute)
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
        Some(MergeKey {
            object: self.object.clone(),
            attribute: format!("{}.{}", self.script, self.attribute),
            ignore_window: true,
        })
    }

    fn merge(&mut self, newer: Self) {
        self.new_value = newer.new_value;
    }
}
