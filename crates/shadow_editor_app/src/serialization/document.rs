// SPDX-License-Identifier: MIT OR Apache-2.0
//! Whole-document serialization.
//!
//! A document holds the scene tree under `"object"`, loose geometry,
//! material, texture and animation records, scripts keyed by node, the
//! history and the editor options. Only text that is not JSON, or JSON that
//! is not an object, fails a load. Everything else that is wrong is skipped
//! and reported as a [`LoadWarning`].
//!
//! Loading registers entities in dependency order: textures, materials,
//! geometries, nodes (pre-order), animation clips, animation groups and
//! finally scripts.

use super::animation::{animations_from_records, clip_to_record, group_to_record};
use super::geometry::{geometry_from_record, geometry_to_record};
use super::material::{material_from_record, material_to_record, texture_from_record, texture_to_record};
use super::object::{tree_from_record, tree_to_record};
use super::{as_record, decode_record, encode_record, Encoded, LoadWarning, Record, RecordError, RecordReader, Warnings};
use crate::commands::EditorContext;
use crate::history::{History, HistoryError};
use crate::registry::{Entity, Registry, RegistryError};
use crate::resources::{Geometry, Material, Texture};
use crate::scene::{EntityId, SceneNode};
use crate::scripts::{Script, ScriptStore};
use crate::settings::EditorOptions;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Document errors
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Text is not JSON
    #[error("Document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Top-level value is not a JSON object
    #[error("Document must be a JSON object")]
    NotAnObject,

    /// An entity could not be written
    #[error("Could not encode document: {0}")]
    Encode(#[source] serde_json::Error),

    /// History could not be written
    #[error("Could not encode history: {0}")]
    History(#[from] HistoryError),
}

/// Warnings from a load that succeeded
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoadReport {
    /// Every skipped record or dropped reference, in discovery order
    pub warnings: Vec<LoadWarning>,
}

impl LoadReport {
    /// Whether the document loaded without skipping anything
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// The parts of a loaded document
#[derive(Debug)]
pub struct LoadedDocument {
    /// Scene, assets, animations and scripts
    pub context: EditorContext,
    /// Saved options, or defaults
    pub options: EditorOptions,
    /// Saved history record, not yet rebuilt
    pub history: Option<Record>,
}

/// Serialize a document
///
/// Scripts and clip targets of nodes a command has taken out of the scene
/// travel with that command's record, so everything held here is written.
pub fn document_to_record(
    ctx: &EditorContext,
    options: &EditorOptions,
    history: &History,
) -> Result<Record, DocumentError> {
    let mut doc = entities_to_record(ctx).map_err(DocumentError::Encode)?;
    doc.insert("history".into(), Value::Object(history.to_record()?));
    let options = encode_record(options).map_err(DocumentError::Encode)?;
    doc.insert("options".into(), Value::Object(options));
    Ok(doc)
}

fn entities_to_record(ctx: &EditorContext) -> Encoded {
    let registry = &ctx.registry;
    let mut doc = Record::new();

    if let Some(object) = tree_to_record(registry, registry.root())? {
        doc.insert("object".into(), Value::Object(object));
    }
    let geometries = registry
        .geometries()
        .map(|g| geometry_to_record(g).map(Value::Object))
        .collect::<Encoded<Vec<_>>>()?;
    doc.insert("geometries".into(), Value::Array(geometries));
    doc.insert(
        "materials".into(),
        registry.materials().map(|m| Value::Object(material_to_record(m))).collect(),
    );
    let textures = registry
        .textures()
        .map(|t| texture_to_record(t).map(Value::Object))
        .collect::<Encoded<Vec<_>>>()?;
    doc.insert("textures".into(), Value::Array(textures));

    let animations = registry.animations();
    let mut records: Vec<Value> = animations
        .groups()
        .map(|group| Value::Object(group_to_record(group)))
        .collect();
    for clip in animations.clips() {
        records.push(Value::Object(clip_to_record(clip)?));
    }
    doc.insert("animations".into(), Value::Array(records));

    let mut scripts = Record::new();
    for (object, list) in ctx.scripts.iter() {
        let records = list
            .iter()
            .map(|script| encode_record(script).map(Value::Object))
            .collect::<Encoded<Vec<_>>>()?;
        scripts.insert(object.to_string(), Value::Array(records));
    }
    doc.insert("scripts".into(), Value::Object(scripts));
    Ok(doc)
}

/// Parse document text
pub fn parse_document(text: &str, warnings: &mut Warnings) -> Result<LoadedDocument, DocumentError> {
    let value: Value = serde_json::from_str(text)?;
    read_document(&value, warnings)
}

/// Rebuild the parts of a document
pub fn read_document(value: &Value, warnings: &mut Warnings) -> Result<LoadedDocument, DocumentError> {
    let doc = value.as_object().ok_or(DocumentError::NotAnObject)?;
    let reader = RecordReader::new("document", doc);

    let options = match reader.decode::<EditorOptions>("options") {
        Ok(options) => options.unwrap_or_default(),
        Err(error) => {
            warnings.push(LoadWarning::SkippedRecord {
                context: "options".to_string(),
                error,
            });
            EditorOptions::default()
        }
    };

    let mut nodes = read_tree(&reader, warnings).into_iter();
    let mut registry = match nodes.next() {
        Some(root) => Registry::with_root(root),
        None => Registry::new(),
    };

    for texture in read_list::<Texture>(&reader, "textures", |r| texture_from_record(r, None), warnings) {
        register(&mut registry, Entity::Texture(texture), warnings);
    }
    for material in read_list::<Material>(&reader, "materials", |r| material_from_record(r, None), warnings) {
        let material = drop_missing_maps(material, &registry, warnings);
        register(&mut registry, Entity::Material(material), warnings);
    }
    for geometry in read_list::<Geometry>(&reader, "geometries", |r| geometry_from_record(r, None), warnings) {
        register(&mut registry, Entity::Geometry(geometry), warnings);
    }

    let root = registry.root().clone();
    if let Ok(root_node) = registry.node(&root) {
        let checked = drop_missing_assets(root_node.clone(), &registry, warnings);
        if let Ok(slot) = registry.node_mut(&root) {
            *slot = checked;
        }
    }
    register_nodes(&mut registry, nodes, warnings);

    match reader.array("animations") {
        Ok(records) => {
            let loaded = animations_from_records(records, warnings);
            for mut clip in loaded.clips {
                let missing = clip
                    .target
                    .as_ref()
                    .filter(|target| registry.node(&EntityId::from(target.object.as_str())).is_err())
                    .map(|target| target.object.clone());
                if let Some(missing) = missing {
                    warnings.push(LoadWarning::UnresolvedReference {
                        owner: clip.uuid.clone(),
                        missing,
                    });
                    clip.target = None;
                }
                register(&mut registry, Entity::AnimationClip(clip), warnings);
            }
            for group in loaded.groups {
                register(&mut registry, Entity::AnimationGroup(group), warnings);
            }
        }
        Err(error) => warnings.push(LoadWarning::SkippedRecord {
            context: "animations".to_string(),
            error,
        }),
    }

    let scripts = read_scripts(&reader, &registry, warnings);

    let history = match reader.object("history") {
        Ok(history) => history.cloned(),
        Err(error) => {
            warnings.push(LoadWarning::SkippedRecord {
                context: "history".to_string(),
                error,
            });
            None
        }
    };

    tracing::info!(
        "Read document: {} nodes, {} warnings",
        registry.node_count(),
        warnings.len()
    );
    Ok(LoadedDocument {
        context: EditorContext::from_parts(registry, scripts),
        options,
        history,
    })
}

fn read_tree(reader: &RecordReader<'_>, warnings: &mut Warnings) -> Vec<SceneNode> {
    let object = match reader.object("object") {
        Ok(Some(object)) => object,
        Ok(None) => {
            warnings.push(LoadWarning::SkippedRecord {
                context: "scene".to_string(),
                error: RecordError::MissingField {
                    record: "document".to_string(),
                    field: "object".to_string(),
                },
            });
            return Vec::new();
        }
        Err(error) => {
            warnings.push(LoadWarning::SkippedRecord {
                context: "scene".to_string(),
                error,
            });
            return Vec::new();
        }
    };
    tree_from_record(object, warnings).unwrap_or_else(|error| {
        warnings.push(LoadWarning::SkippedRecord {
            context: "scene root".to_string(),
            error,
        });
        Vec::new()
    })
}

fn read_list<T>(
    reader: &RecordReader<'_>,
    field: &str,
    read: fn(&Record) -> super::Result<T>,
    warnings: &mut Warnings,
) -> Vec<T> {
    let values = match reader.array(field) {
        Ok(values) => values,
        Err(error) => {
            warnings.push(LoadWarning::SkippedRecord {
                context: field.to_string(),
                error,
            });
            return Vec::new();
        }
    };
    values
        .iter()
        .enumerate()
        .filter_map(|(i, value)| match as_record(field, value).and_then(read) {
            Ok(item) => Some(item),
            Err(error) => {
                warnings.push(LoadWarning::SkippedRecord {
                    context: format!("{field} {i}"),
                    error,
                });
                None
            }
        })
        .collect()
}

fn register(registry: &mut Registry, entity: Entity, warnings: &mut Warnings) -> bool {
    match registry.register(entity) {
        Ok(()) => true,
        Err(RegistryError::DuplicateId(id)) => {
            warnings.push(LoadWarning::DuplicateId(id.to_string()));
            false
        }
        Err(RegistryError::NotFound(missing)) => {
            warnings.push(LoadWarning::SkippedRecord {
                context: "entity".to_string(),
                error: RecordError::UnresolvedReference {
                    owner: "registry".to_string(),
                    missing: missing.to_string(),
                },
            });
            false
        }
        Err(other) => {
            warnings.push(LoadWarning::SkippedRecord {
                context: "entity".to_string(),
                error: RecordError::Malformed {
                    record: "entity".to_string(),
                    reason: other.to_string(),
                },
            });
            false
        }
    }
}

/// Register pre-ordered nodes; a skipped node takes its descendants with it
fn register_nodes(registry: &mut Registry, nodes: impl Iterator<Item = SceneNode>, warnings: &mut Warnings) {
    let mut skipped: HashSet<EntityId> = HashSet::new();
    for node in nodes {
        if node.parent().is_some_and(|parent| skipped.contains(parent)) {
            skipped.insert(node.uuid.clone());
            continue;
        }
        let id = node.uuid.clone();
        let node = drop_missing_assets(node, registry, warnings);
        if !register(registry, Entity::Node(node), warnings) {
            skipped.insert(id);
        }
    }
}

fn drop_missing_assets(mut node: SceneNode, registry: &Registry, warnings: &mut Warnings) -> SceneNode {
    let owner = node.uuid.to_string();
    if let Some(mesh) = node.kind.mesh_mut() {
        if let Some(geometry) = mesh.geometry.take_if(|g| registry.geometry(g).is_err()) {
            warnings.push(LoadWarning::UnresolvedReference {
                owner: owner.clone(),
                missing: geometry.to_string(),
            });
        }
        if let Some(material) = mesh.material.take_if(|m| registry.material(m).is_err()) {
            warnings.push(LoadWarning::UnresolvedReference {
                owner,
                missing: material.to_string(),
            });
        }
    }
    node
}

fn drop_missing_maps(mut material: Material, registry: &Registry, warnings: &mut Warnings) -> Material {
    let owner = material.uuid.to_string();
    material.maps.retain(|_, texture| {
        let known = registry.texture(texture).is_ok();
        if !known {
            warnings.push(LoadWarning::UnresolvedReference {
                owner: owner.clone(),
                missing: texture.to_string(),
            });
        }
        known
    });
    material
}

fn read_scripts(reader: &RecordReader<'_>, registry: &Registry, warnings: &mut Warnings) -> ScriptStore {
    let mut store = ScriptStore::new();
    let scripts = match reader.object("scripts") {
        Ok(Some(scripts)) => scripts,
        Ok(None) => return store,
        Err(error) => {
            warnings.push(LoadWarning::SkippedRecord {
                context: "scripts".to_string(),
                error,
            });
            return store;
        }
    };

    for (object, list) in scripts {
        let object = EntityId::from(object.as_str());
        if registry.node(&object).is_err() {
            warnings.push(LoadWarning::UnresolvedReference {
                owner: "scripts".to_string(),
                missing: object.to_string(),
            });
            continue;
        }
        let Some(list) = list.as_array() else {
            warnings.push(LoadWarning::SkippedRecord {
                context: format!("scripts of {object}"),
                error: RecordError::InvalidField {
                    record: "scripts".to_string(),
                    field: object.to_string(),
                    reason: "expected an array".to_string(),
                },
            });
            continue;
        };
        for (i, value) in list.iter().enumerate() {
            match as_record("script", value).and_then(|r| decode_record::<Script>("script", r)) {
                Ok(script) => store.insert(&object, None, script),
                Err(error) => warnings.push(LoadWarning::SkippedRecord {
                    context: format!("script {i} of {object}"),
                    error,
                }),
            }
        }
    }
    store
}
