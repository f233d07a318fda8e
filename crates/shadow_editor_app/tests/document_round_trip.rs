// SPDX-License-Identifier: MIT OR Apache-2.0
//! Saving and reloading whole documents.

use serde_json::{json, Value};
use shadow_editor_app::commands::{
    AddObjectCommand, AddScriptCommand, MoveObjectCommand, MultiCmdsCommand, RemoveObjectCommand,
    SetMaterialColorCommand, SetMaterialMapCommand, SetPositionCommand, SetScriptValueCommand, SetValueCommand,
};
use shadow_editor_app::components::{MeshComponent, NodeKind, SceneComponent};
use shadow_editor_app::resources::{Geometry, GeometryKind, Material, MaterialKind, Texture};
use shadow_editor_app::scene::ScriptHook;
use shadow_editor_app::scripts::{Script, ScriptKind};
use shadow_editor_app::{Command, Editor, EditorEvent, EntityId, LoadWarning, SceneNode, Subtree};

fn busy_editor() -> Editor {
    let mut editor = Editor::new();

    let geometry = Geometry::new("Crate", GeometryKind::default());
    let material = Material::new("Crate", MaterialKind::Basic);
    let crate_node = SceneNode::new(
        "Crate",
        NodeKind::Mesh(MeshComponent {
            geometry: Some(geometry.uuid.clone()),
            material: Some(material.uuid.clone()),
        }),
    );
    let crate_id = crate_node.uuid.clone();
    let subtree = Subtree::new(crate_node).with_geometry(geometry).with_material(material);
    editor.execute(AddObjectCommand::new(subtree)).unwrap();

    let shelf = SceneNode::new("Shelf", NodeKind::Group);
    let shelf_id = shelf.uuid.clone();
    editor.execute(AddObjectCommand::new(Subtree::new(shelf))).unwrap();

    let set = SetPositionCommand::new(editor.context(), &crate_id, [0.5, 1.25, -3.0]).unwrap();
    editor.execute(set).unwrap();
    let rename = SetValueCommand::new(editor.context(), &shelf_id, "name", json!("Bookshelf")).unwrap();
    editor.execute(rename).unwrap();
    let tint = SetMaterialColorCommand::new(editor.context(), &crate_id, "color", 0x8b4513).unwrap();
    editor.execute(tint).unwrap();
    let map = SetMaterialMapCommand::new(
        editor.context(),
        &crate_id,
        "map",
        Some(Texture::new("Planks", "textures/planks.png")),
    )
    .unwrap();
    editor.execute(map).unwrap();

    let script = Script::new("Wobble", ScriptKind::Javascript, "function update() {}");
    let script_id = script.uuid.clone();
    let attach = AddScriptCommand::new(editor.context(), &crate_id, script, Some(ScriptHook::OnUpdate)).unwrap();
    editor.execute(attach).unwrap();
    let edit = SetScriptValueCommand::new(editor.context(), &crate_id, &script_id, "source", "function update(t) {}")
        .unwrap();
    editor.execute(edit).unwrap();

    let batch = MultiCmdsCommand::new([
        Command::from(MoveObjectCommand::new(editor.context(), &crate_id, &shelf_id, 0).unwrap()),
        Command::from(SetPositionCommand::new(editor.context(), &shelf_id, [2.0, 0.0, 0.0]).unwrap()),
    ]);
    editor.execute(batch).unwrap();

    // leave one entry on the redo side
    editor.undo().unwrap();
    editor
}

#[test]
fn save_load_save_is_identical() {
    let editor = busy_editor();
    let first = editor.to_json().unwrap();

    let (loaded, report) = Editor::from_json(&first.to_string()).unwrap();
    assert!(report.is_clean(), "{:?}", report.warnings);
    assert_eq!(loaded.to_json().unwrap(), first);
}

#[test]
fn reloaded_history_can_be_walked() {
    let editor = busy_editor();
    let saved = editor.to_json_string().unwrap();
    let (mut loaded, _) = Editor::from_json(&saved).unwrap();

    assert_eq!(loaded.history().stats().undo_count, editor.history().stats().undo_count);
    assert_eq!(loaded.history().stats().redo_count, 1);

    loaded.redo().unwrap();
    while loaded.history().can_undo() {
        loaded.undo().unwrap();
    }
    assert_eq!(loaded.registry().node_count(), 1);
    assert_eq!(loaded.registry().geometries().count(), 0);
    assert!(loaded.scripts().is_empty());

    while loaded.history().can_redo() {
        loaded.redo().unwrap();
    }
    let shelf = loaded
        .registry()
        .nodes()
        .find(|node| node.name == "Bookshelf")
        .map(|node| node.uuid.clone())
        .unwrap();
    assert_eq!(loaded.registry().node(&shelf).unwrap().children().len(), 1);
}

#[test]
fn undoing_a_reloaded_removal_restores_scripts_and_clip_targets() {
    let doc = json!({
        "object": {
            "uuid": "ROOT", "type": "Scene", "name": "Scene",
            "children": [ { "uuid": "N", "type": "Group", "name": "Crane" } ]
        },
        "animations": [
            { "uuid": "CLIP", "type": "Tween", "name": "Lift", "target": { "object": "N" }, "beginTime": 0.0, "endTime": 1.0 }
        ]
    });
    let mut editor = Editor::new();
    editor.load_value(&doc).unwrap();
    let n = EntityId::from("N");

    let script = Script::new("Hoist", ScriptKind::Javascript, "function update() {}");
    let attach = AddScriptCommand::new(editor.context(), &n, script, None).unwrap();
    editor.execute(attach).unwrap();
    let remove = RemoveObjectCommand::new(editor.context(), &n).unwrap();
    editor.execute(remove).unwrap();
    assert!(editor.scripts().scripts(&n).is_empty());

    let saved = editor.to_json_string().unwrap();
    let (mut loaded, report) = Editor::from_json(&saved).unwrap();
    assert!(report.is_clean(), "{:?}", report.warnings);

    loaded.undo().unwrap();
    assert!(loaded.object_by_uuid(&n).is_some());
    assert_eq!(loaded.scripts().scripts(&n).len(), 1);
    let target = loaded.registry().animations().clip("CLIP").and_then(|clip| clip.target.as_ref());
    assert_eq!(target.map(|t| t.object.as_str()), Some("N"));

    loaded.undo().unwrap();
    assert!(loaded.scripts().scripts(&n).is_empty());
}

#[test]
fn group_with_missing_clip_warns_once() {
    let doc = json!({
        "object": { "uuid": "ROOT", "type": "Scene", "name": "Scene" },
        "animations": [
            { "uuid": "G", "type": "AnimationGroup", "name": "Layer", "animations": ["CLIP", "GONE"] },
            { "uuid": "CLIP", "type": "Tween", "name": "Slide", "beginTime": 0.0, "endTime": 2.0 }
        ]
    });
    let mut editor = Editor::new();
    let report = editor.load_value(&doc).unwrap();

    assert_eq!(
        report.warnings,
        vec![LoadWarning::UnresolvedReference {
            owner: "G".to_string(),
            missing: "GONE".to_string(),
        }]
    );
    let group = editor.registry().animations().group("G").unwrap();
    assert_eq!(group.animations, vec!["CLIP".to_string()]);
    assert_eq!(editor.registry().animations().resolve("G").len(), 1);
}

#[test]
fn unknown_history_entries_are_skipped() {
    let editor = busy_editor();
    let mut doc = editor.to_json().unwrap();
    let undos = doc["history"]["undos"].as_array_mut().unwrap();
    let kept = undos.len();
    undos.insert(1, json!({ "type": "TeleportCommand", "id": 500, "name": "Teleport" }));

    let mut loaded = Editor::new();
    let report = loaded.load_value(&doc).unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(
        &report.warnings[0],
        LoadWarning::UnknownCommandKind { kind, .. } if kind == "TeleportCommand"
    ));
    assert_eq!(loaded.history().stats().undo_count, kept);
}

#[test]
fn load_replaces_document_and_notifies() {
    let mut editor = busy_editor();
    editor.drain_events();
    let doc = json!({
        "object": {
            "uuid": "LEVEL", "type": "Scene", "name": "Level", "background": 0x202020,
            "children": [ { "uuid": "SUN", "type": "DirectionalLight", "intensity": 0.8 } ]
        },
        "options": { "historyEnabled": false }
    });
    let report = editor.load_value(&doc).unwrap();

    assert!(report.is_clean(), "{:?}", report.warnings);
    assert_eq!(editor.registry().root(), &EntityId::from("LEVEL"));
    assert_eq!(
        editor.registry().root_node().kind,
        NodeKind::Scene(SceneComponent {
            background: Some(0x202020)
        })
    );
    assert!(editor.object_by_uuid(&EntityId::from("SUN")).is_some());
    assert!(!editor.history().is_enabled());
    assert!(editor.scripts().is_empty());
    assert_eq!(editor.drain_events(), vec![EditorEvent::DocumentReplaced]);
}

#[test]
fn unparseable_documents_fail_without_side_effects() {
    let mut editor = busy_editor();
    let before = editor.to_json().unwrap();
    assert!(editor.load_json("{ \"object\": ").is_err());
    assert!(editor.load_value(&Value::Array(Vec::new())).is_err());
    assert_eq!(editor.to_json().unwrap(), before);
}
