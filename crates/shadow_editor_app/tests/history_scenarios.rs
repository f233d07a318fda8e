// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo behaviour of the editor across command kinds.

use serde_json::json;
use shadow_editor_app::commands::{
    AddObjectCommand, MoveObjectCommand, MultiCmdsCommand, RemoveObjectCommand, SetColorCommand,
    SetMaterialColorCommand, SetMaterialValueCommand, SetPositionCommand, SetRotationCommand,
    SetScaleCommand, SetUuidCommand, SetValueCommand,
};
use shadow_editor_app::components::{LightComponent, MeshComponent, NodeKind};
use shadow_editor_app::resources::{Geometry, GeometryKind, Material, MaterialKind};
use shadow_editor_app::{Command, Editor, EditorOptions, EntityId, HistoryError, SceneNode, Subtree};

fn add(editor: &mut Editor, node: SceneNode) -> EntityId {
    let id = node.uuid.clone();
    editor.execute(AddObjectCommand::new(Subtree::new(node))).unwrap();
    id
}

fn add_mesh(editor: &mut Editor, name: &str) -> EntityId {
    let geometry = Geometry::new(name, GeometryKind::default());
    let material = Material::new(name, MaterialKind::Basic);
    let node = SceneNode::new(
        name,
        NodeKind::Mesh(MeshComponent {
            geometry: Some(geometry.uuid.clone()),
            material: Some(material.uuid.clone()),
        }),
    );
    let id = node.uuid.clone();
    let subtree = Subtree::new(node).with_geometry(geometry).with_material(material);
    editor.execute(AddObjectCommand::new(subtree)).unwrap();
    id
}

#[test]
fn add_then_set_position_undo_redo() {
    let mut editor = Editor::new();
    let n1 = add(&mut editor, SceneNode::new("N1", NodeKind::Group));
    let set = SetPositionCommand::new(editor.context(), &n1, [1.0, 2.0, 3.0]).unwrap();
    editor.execute(set).unwrap();

    editor.undo().unwrap();
    assert_eq!(editor.registry().node(&n1).unwrap().transform.position, [0.0, 0.0, 0.0]);

    editor.undo().unwrap();
    assert!(editor.object_by_uuid(&n1).is_none());
    assert!(!editor.registry().root_node().children().contains(&n1));

    editor.redo().unwrap();
    editor.redo().unwrap();
    let node = editor.registry().node(&n1).unwrap();
    assert_eq!(node.transform.position, [1.0, 2.0, 3.0]);
    assert_eq!(node.parent(), Some(editor.registry().root()));
}

#[test]
fn execute_after_undo_discards_redo_branch() {
    let mut editor = Editor::new();
    let a = add(&mut editor, SceneNode::new("A", NodeKind::Group));
    let b = add(&mut editor, SceneNode::new("B", NodeKind::Group));
    let c = add(&mut editor, SceneNode::new("C", NodeKind::Group));

    editor.undo().unwrap();
    editor.undo().unwrap();
    let d = add(&mut editor, SceneNode::new("D", NodeKind::Group));

    let labels: Vec<&str> = editor.history().entries().iter().map(Command::name).collect();
    assert_eq!(labels, vec!["Add Object: A", "Add Object: D"]);
    assert!(matches!(editor.redo(), Err(HistoryError::NothingToRedo)));
    assert!(editor.object_by_uuid(&a).is_some());
    assert!(editor.object_by_uuid(&b).is_none());
    assert!(editor.object_by_uuid(&c).is_none());
    assert!(editor.object_by_uuid(&d).is_some());
}

#[test]
fn every_field_command_restores_the_prior_node() {
    let mut editor = Editor::new();
    let mesh = add_mesh(&mut editor, "Crate");
    let lamp = add(
        &mut editor,
        SceneNode::new("Lamp", NodeKind::PointLight(LightComponent::default())),
    );

    let commands: Vec<Command> = vec![
        SetPositionCommand::new(editor.context(), &mesh, [4.0, 0.0, -2.0]).unwrap().into(),
        SetRotationCommand::new(editor.context(), &mesh, [0.0, 1.5, 0.0]).unwrap().into(),
        SetScaleCommand::new(editor.context(), &mesh, [2.0, 2.0, 2.0]).unwrap().into(),
        SetValueCommand::new(editor.context(), &mesh, "visible", json!(false)).unwrap().into(),
        SetValueCommand::new(editor.context(), &mesh, "name", json!("Barrel")).unwrap().into(),
        SetColorCommand::new(editor.context(), &lamp, "color", 0xff0000).unwrap().into(),
    ];

    for command in commands {
        let target = if command.type_tag() == "SetColorCommand" { &lamp } else { &mesh };
        let before = editor.registry().node(target).unwrap().clone();
        editor.execute(command).unwrap();
        assert_ne!(editor.registry().node(target).unwrap(), &before);
        editor.undo().unwrap();
        assert_eq!(editor.registry().node(target).unwrap(), &before);
        editor.redo().unwrap();
    }
}

#[test]
fn material_commands_restore_the_prior_material() {
    let mut editor = Editor::new();
    let mesh = add_mesh(&mut editor, "Crate");
    let material_id = editor.registry().node(&mesh).unwrap().material().cloned().unwrap();
    let before = editor.registry().material(&material_id).unwrap().clone();

    let color = SetMaterialColorCommand::new(editor.context(), &mesh, "color", 0x00ff00).unwrap();
    editor.execute(color).unwrap();
    let opacity = SetMaterialValueCommand::new(editor.context(), &mesh, "opacity", json!(0.5)).unwrap();
    editor.execute(opacity).unwrap();
    let changed = editor.registry().material(&material_id).unwrap();
    assert_eq!(changed.color, 0x00ff00);
    assert_eq!(changed.opacity, 0.5);

    editor.undo().unwrap();
    editor.undo().unwrap();
    assert_eq!(editor.registry().material(&material_id).unwrap(), &before);
}

#[test]
fn remove_and_move_restore_exact_positions() {
    let mut editor = Editor::new();
    let first = add(&mut editor, SceneNode::new("first", NodeKind::Group));
    let middle = add(&mut editor, SceneNode::new("middle", NodeKind::Group));
    let last = add(&mut editor, SceneNode::new("last", NodeKind::Group));
    let original = editor.registry().root_node().children().to_vec();

    let remove = RemoveObjectCommand::new(editor.context(), &middle).unwrap();
    editor.execute(remove).unwrap();
    assert_eq!(editor.registry().root_node().children(), &[first.clone(), last.clone()]);
    editor.undo().unwrap();
    assert_eq!(editor.registry().root_node().children(), original.as_slice());

    let move_under = MoveObjectCommand::new(editor.context(), &last, &first, 0).unwrap();
    editor.execute(move_under).unwrap();
    assert_eq!(editor.registry().node(&last).unwrap().parent(), Some(&first));
    editor.undo().unwrap();
    assert_eq!(editor.registry().root_node().children(), original.as_slice());
    assert_eq!(editor.registry().node(&last).unwrap().parent(), Some(editor.registry().root()));
}

#[test]
fn uuid_change_round_trips_identity() {
    let mut editor = Editor::new();
    let old = add(&mut editor, SceneNode::new("Box", NodeKind::Group));
    let new = EntityId::from("RENAMED");
    let command = SetUuidCommand::new(editor.context(), &old, new.clone()).unwrap();
    editor.execute(command).unwrap();
    assert!(editor.object_by_uuid(&old).is_none());
    assert!(editor.registry().root_node().children().contains(&new));

    editor.undo().unwrap();
    assert!(editor.object_by_uuid(&new).is_none());
    assert!(editor.registry().root_node().children().contains(&old));
}

#[test]
fn composite_is_one_atomic_entry() {
    let mut editor = Editor::new();
    let n = add(&mut editor, SceneNode::new("N", NodeKind::Group));
    let before = editor.registry().node(&n).unwrap().clone();
    let entries_before = editor.history().entries().len();

    let composite = MultiCmdsCommand::new([
        Command::from(SetPositionCommand::new(editor.context(), &n, [1.0, 1.0, 1.0]).unwrap()),
        Command::from(SetScaleCommand::new(editor.context(), &n, [3.0, 3.0, 3.0]).unwrap()),
        Command::from(SetValueCommand::new(editor.context(), &n, "name", json!("Moved")).unwrap()),
    ]);
    editor.execute(composite).unwrap();
    assert_eq!(editor.history().entries().len(), entries_before + 1);
    assert_eq!(editor.registry().node(&n).unwrap().name, "Moved");

    editor.undo().unwrap();
    assert_eq!(editor.registry().node(&n).unwrap(), &before);
    assert_eq!(editor.history().undo_description(), Some("Add Object: N"));
}

#[test]
fn disabled_history_keeps_no_entries() {
    let mut editor = Editor::with_options(EditorOptions {
        history_enabled: false,
        ..EditorOptions::default()
    });
    let n = add(&mut editor, SceneNode::new("N", NodeKind::Group));
    let set = SetPositionCommand::new(editor.context(), &n, [5.0, 5.0, 5.0]).unwrap();
    editor.execute(set).unwrap();
    assert_eq!(editor.registry().node(&n).unwrap().transform.position, [5.0, 5.0, 5.0]);

    assert!(editor.undo().is_err());
    assert_eq!(editor.registry().node(&n).unwrap().transform.position, [5.0, 5.0, 5.0]);
    assert!(editor.history().entries().is_empty());

    editor.set_history_enabled(true);
    let set = SetPositionCommand::new(editor.context(), &n, [6.0, 6.0, 6.0]).unwrap();
    editor.execute(set).unwrap();
    assert_eq!(editor.history().entries().len(), 1);
    editor.undo().unwrap();
    assert_eq!(editor.registry().node(&n).unwrap().transform.position, [5.0, 5.0, 5.0]);
    assert!(matches!(editor.undo(), Err(HistoryError::NothingToUndo)));
}

#[test]
fn rapid_edits_of_one_field_merge() {
    let mut editor = Editor::new();
    let n = add(&mut editor, SceneNode::new("N", NodeKind::Group));
    for x in 1..=5 {
        let set = SetPositionCommand::new(editor.context(), &n, [x as f32, 0.0, 0.0]).unwrap();
        editor.execute(set).unwrap();
    }
    assert_eq!(editor.history().entries().len(), 2);

    editor.undo().unwrap();
    assert_eq!(editor.registry().node(&n).unwrap().transform.position, [0.0, 0.0, 0.0]);
}

#[test]
fn go_to_walks_history_both_ways() {
    let mut editor = Editor::new();
    let a = add(&mut editor, SceneNode::new("A", NodeKind::Group));
    let b = add(&mut editor, SceneNode::new("B", NodeKind::Group));
    let first_id = editor.history().entries()[0].id();
    let last_id = editor.history().entries()[1].id();

    editor.go_to(0).unwrap();
    assert!(editor.object_by_uuid(&a).is_none());
    editor.go_to(last_id).unwrap();
    assert!(editor.object_by_uuid(&b).is_some());
    editor.go_to(first_id).unwrap();
    assert!(editor.object_by_uuid(&a).is_some());
    assert!(editor.object_by_uuid(&b).is_none());
    assert!(matches!(editor.go_to(99), Err(HistoryError::UnknownState(99))));
}
