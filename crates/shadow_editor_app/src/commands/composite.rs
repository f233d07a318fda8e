// SPDX-License-Identifier: MIT OR Apache-2.0
//! Commands made of other commands.
//!
//! Children run in order and undo in reverse. If one child fails, the
//! children already applied are reverted before the error is returned, so a
//! composite is applied completely or not at all. Scene-graph notifications
//! raised by the children are collapsed into one.

use super::field::{SetUuidCommand, SetValueCommand};
use super::structure::AddObjectCommand;
use super::{
    commands_from, execute_all, records_of, undo_all, Command, CommandState, EditorCommand,
    EditorContext, Result,
};
use crate::scene::Subtree;
use crate::serialization::{Record, RecordReader};

fn run_batched(
    ctx: &mut EditorContext,
    commands: &mut [Command],
    run: fn(&mut [Command], &mut EditorContext) -> Result<()>,
) -> Result<()> {
    ctx.registry.events_mut().begin_batch();
    let result = run(commands, ctx);
    ctx.registry.events_mut().end_batch();
    result
}

fn children_record(commands: &[Command]) -> Result<Record> {
    let mut r = Record::new();
    r.insert("commands".into(), records_of(commands)?);
    Ok(r)
}

fn children_from_record(kind: &str, record: &Record) -> Result<Vec<Command>> {
    commands_from(&RecordReader::new(kind, record), "commands")
}

fn mark_children(commands: &mut [Command], state: CommandState) {
    for command in commands {
        command.set_state(state);
    }
}

/// Several commands recorded as one history entry
#[derive(Debug, Clone, PartialEq)]
pub struct MultiCmdsCommand {
    commands: Vec<Command>,
}

impl MultiCmdsCommand {
    /// Group `commands`, which run in the given order
    pub fn new(commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
        }
    }

    /// Child commands
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub(super) fn set_state(&mut self, state: CommandState) {
        mark_children(&mut self.commands, state);
    }
}

impl EditorCommand for MultiCmdsCommand {
    const TYPE: &'static str = "MultiCmdsCommand";

    fn default_name(&self) -> String {
        "Multiple Changes".to_string()
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        run_batched(ctx, &mut self.commands, execute_all)
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        run_batched(ctx, &mut self.commands, undo_all)
    }

    fn to_record(&self) -> Result<Record> {
        children_record(&self.commands)
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            commands: children_from_record(Self::TYPE, record)?,
        })
    }
}

/// Load a whole scene into the current document
///
/// The scene root takes the loaded root's identifier, name and user data,
/// and every child of the loaded root is added under it.
#[derive(Debug, Clone, PartialEq)]
pub struct SetSceneCommand {
    commands: Vec<Command>,
}

impl SetSceneCommand {
    /// Build the steps that turn the current root into `scene`
    pub fn new(ctx: &EditorContext, scene: &Subtree) -> Result<Self> {
        let current = ctx.registry.root_node();
        let incoming = scene.root();
        let target = incoming.uuid.clone();
        let mut commands = Vec::new();

        if current.uuid != target {
            commands.push(Command::from(SetUuidCommand::new(ctx, &current.uuid, target.clone())?));
        }
        commands.push(Command::from(SetValueCommand::with_old(
            &target,
            "name",
            serde_json::Value::from(current.name.clone()),
            serde_json::Value::from(incoming.name.clone()),
        )));
        commands.push(Command::from(SetValueCommand::with_old(
            &target,
            "userData",
            serde_json::to_value(&current.user_data)?,
            serde_json::to_value(&incoming.user_data)?,
        )));
        for part in scene.split_children() {
            commands.push(Command::from(AddObjectCommand::new(part).with_parent(&target, None)));
        }
        Ok(Self { commands })
    }

    /// Steps in execution order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub(super) fn set_state(&mut self, state: CommandState) {
        mark_children(&mut self.commands, state);
    }
}

impl EditorCommand for SetSceneCommand {
    const TYPE: &'static str = "SetSceneCommand";

    fn default_name(&self) -> String {
        "Set Scene".to_string()
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        run_batched(ctx, &mut self.commands, execute_all)
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        run_batched(ctx, &mut self.commands, undo_all)
    }

    fn to_record(&self) -> Result<Record> {
        children_record(&self.commands)
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            commands: children_from_record(Self::TYPE, record)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandError, SetPositionCommand};
    use crate::components::{MeshComponent, NodeKind, SceneComponent};
    use crate::events::EditorEvent;
    use crate::resources::{Geometry, GeometryKind, Material, MaterialKind};
    use crate::scene::{EntityId, SceneNode};
    use serde_json::json;

    fn add_group(ctx: &mut EditorContext, name: &str) -> EntityId {
        let node = SceneNode::new(name, NodeKind::Group);
        let id = node.uuid.clone();
        Command::from(AddObjectCommand::new(Subtree::new(node)))
            .execute(ctx)
            .unwrap();
        id
    }

    #[test]
    fn test_failed_child_reverts_applied_children() {
        let mut ctx = EditorContext::new();
        let id = add_group(&mut ctx, "Box");
        let mut command = Command::from(MultiCmdsCommand::new([
            Command::from(SetPositionCommand::new(&ctx, &id, [5.0, 0.0, 0.0]).unwrap()),
            Command::from(SetValueCommand::new(&ctx, &id, "visible", json!("no")).unwrap()),
        ]));

        assert!(matches!(command.execute(&mut ctx), Err(CommandError::InvalidValue { .. })));
        assert_eq!(command.state(), CommandState::Created);
        assert_eq!(ctx.registry().node(&id).unwrap().transform.position, [0.0; 3]);
    }

    #[test]
    fn test_batch_emits_one_scene_graph_change() {
        let mut ctx = EditorContext::new();
        let a = SceneNode::new("A", NodeKind::Group);
        let b = SceneNode::new("B", NodeKind::Group);
        let mut command = Command::from(MultiCmdsCommand::new([
            Command::from(AddObjectCommand::new(Subtree::new(a))),
            Command::from(AddObjectCommand::new(Subtree::new(b))),
        ]));
        command.execute(&mut ctx).unwrap();

        let events = ctx.registry.drain_events();
        let graph_changes = events
            .iter()
            .filter(|e| **e == EditorEvent::SceneGraphChanged)
            .count();
        assert_eq!(graph_changes, 1);
        assert_eq!(ctx.registry().root_node().children().len(), 2);

        command.undo(&mut ctx).unwrap();
        assert!(ctx.registry().root_node().children().is_empty());
    }

    #[test]
    fn test_set_scene_and_undo() {
        let mut ctx = EditorContext::new();
        let original_root = ctx.registry().root().clone();

        let mut root = SceneNode::new("Level 1", NodeKind::Scene(SceneComponent::default()));
        root.user_data.first_pinyin = "L1".to_string();
        let mut scene = Subtree::new(root);
        let scene_root = scene.root().uuid.clone();
        let geometry = Geometry::new("Cube", GeometryKind::default());
        let material = Material::new("Paint", MaterialKind::Basic);
        let cube = SceneNode::new(
            "Cube",
            NodeKind::Mesh(MeshComponent {
                geometry: Some(geometry.uuid.clone()),
                material: Some(material.uuid.clone()),
            }),
        );
        let cube_id = cube.uuid.clone();
        scene.add_child(&scene_root, cube).unwrap();
        scene.add_child(&scene_root, SceneNode::new("Empty", NodeKind::Group)).unwrap();
        let scene = scene.with_geometry(geometry).with_material(material);

        let mut command = Command::from(SetSceneCommand::new(&ctx, &scene).unwrap());
        command.execute(&mut ctx).unwrap();

        let registry = ctx.registry();
        assert_eq!(registry.root(), &scene_root);
        assert_eq!(registry.root_node().name, "Level 1");
        assert_eq!(registry.root_node().user_data.first_pinyin, "L1");
        assert_eq!(registry.root_node().children().len(), 2);
        assert!(registry.node(&cube_id).unwrap().geometry().is_some());

        command.undo(&mut ctx).unwrap();
        assert_eq!(ctx.registry().root(), &original_root);
        assert_eq!(ctx.registry().node_count(), 1);
        assert_eq!(ctx.registry().geometries().count(), 0);
    }

    #[test]
    fn test_loaded_children_follow_parent_state() {
        let mut ctx = EditorContext::new();
        let id = add_group(&mut ctx, "Box");
        let mut command = Command::from(MultiCmdsCommand::new([Command::from(
            SetPositionCommand::new(&ctx, &id, [1.0, 2.0, 3.0]).unwrap(),
        )]));
        command.execute(&mut ctx).unwrap();

        let mut loaded = Command::from_record(&command.to_record().unwrap()).unwrap();
        loaded.set_state(CommandState::Executed);
        loaded.undo(&mut ctx).unwrap();
        assert_eq!(ctx.registry().node(&id).unwrap().transform.position, [0.0; 3]);
    }
}
