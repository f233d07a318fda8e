// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene node serializers.
//!
//! `object3d_*` handles the fields every node has. Lights, cameras, meshes
//! and the scene root build on it: the base runs first, then the kind adds
//! or overrides its own fields. When `from_record` is given an existing node
//! it updates that node in place, keeping any field the record leaves out.

use super::{as_record, vec3, Encoded, LoadWarning, NodeLookup, Record, RecordError, RecordReader, Result, Warnings};
use crate::components::{CameraComponent, LightComponent, MeshComponent, NodeKind, SceneComponent};
use crate::scene::{EntityId, SceneNode, UserData};
use serde_json::Value;
use std::collections::HashSet;

type ToRecordFn = fn(&SceneNode) -> Encoded;
type FromRecordFn = fn(&Record, Option<SceneNode>) -> Result<SceneNode>;

struct NodeSerializer {
    tag: &'static str,
    to_record: ToRecordFn,
    from_record: FromRecordFn,
}

const NODE_SERIALIZERS: [NodeSerializer; 13] = [
    NodeSerializer { tag: "Scene", to_record: scene_to_record, from_record: scene_from_record },
    NodeSerializer { tag: "Object3D", to_record: object3d_to_record, from_record: plain_from_record },
    NodeSerializer { tag: "Group", to_record: object3d_to_record, from_record: plain_from_record },
    NodeSerializer { tag: "Bone", to_record: object3d_to_record, from_record: plain_from_record },
    NodeSerializer { tag: "Mesh", to_record: mesh_to_record, from_record: mesh_from_record },
    NodeSerializer { tag: "Sprite", to_record: sprite_to_record, from_record: sprite_from_record },
    NodeSerializer { tag: "AmbientLight", to_record: light_to_record, from_record: ambient_light_from_record },
    NodeSerializer { tag: "DirectionalLight", to_record: light_to_record, from_record: directional_light_from_record },
    NodeSerializer { tag: "HemisphereLight", to_record: hemisphere_light_to_record, from_record: hemisphere_light_from_record },
    NodeSerializer { tag: "PointLight", to_record: point_light_to_record, from_record: point_light_from_record },
    NodeSerializer { tag: "SpotLight", to_record: spot_light_to_record, from_record: spot_light_from_record },
    NodeSerializer { tag: "PerspectiveCamera", to_record: perspective_camera_to_record, from_record: perspective_camera_from_record },
    NodeSerializer { tag: "OrthographicCamera", to_record: orthographic_camera_to_record, from_record: orthographic_camera_from_record },
];

fn serializer(tag: &str) -> Option<&'static NodeSerializer> {
    NODE_SERIALIZERS.iter().find(|s| s.tag == tag)
}

/// Node type tags with a serializer
pub fn node_types() -> impl Iterator<Item = &'static str> {
    NODE_SERIALIZERS.iter().map(|s| s.tag)
}

/// Serialize one node (without children)
pub fn node_to_record(node: &SceneNode) -> Encoded {
    match serializer(node.type_tag()) {
        Some(s) => (s.to_record)(node),
        None => object3d_to_record(node),
    }
}

/// Deserialize one node, dispatching on its `type`
///
/// With `existing`, the node is updated in place and returned.
pub fn node_from_record(record: &Record, existing: Option<SceneNode>) -> Result<SceneNode> {
    let tag = RecordReader::new("object", record).str("type")?;
    let s = serializer(tag).ok_or_else(|| RecordError::UnknownType {
        category: "object",
        tag: tag.to_string(),
    })?;
    (s.from_record)(record, existing)
}

/// Fields shared by every node
pub fn object3d_to_record(node: &SceneNode) -> Encoded {
    let mut r = Record::new();
    r.insert("uuid".into(), Value::from(node.uuid.as_str()));
    r.insert("type".into(), Value::from(node.type_tag()));
    r.insert("name".into(), Value::from(node.name.clone()));
    r.insert("position".into(), vec3(node.transform.position));
    r.insert("rotation".into(), vec3(node.transform.rotation));
    r.insert("scale".into(), vec3(node.transform.scale));
    r.insert("visible".into(), Value::from(node.visible));
    r.insert("castShadow".into(), Value::from(node.cast_shadow));
    r.insert("receiveShadow".into(), Value::from(node.receive_shadow));
    r.insert("frustumCulled".into(), Value::from(node.frustum_culled));
    r.insert("renderOrder".into(), Value::from(node.render_order));
    r.insert("userData".into(), serde_json::to_value(&node.user_data)?);
    Ok(r)
}

/// Read the shared fields, keeping the kind of `existing` (or `Object3D`)
pub fn object3d_from_record(record: &Record, existing: Option<SceneNode>) -> Result<SceneNode> {
    let tag = record.get("type").and_then(Value::as_str).unwrap_or("Object3D");
    let reader = RecordReader::new(tag, record);
    let uuid = reader.id("uuid")?;
    let mut node = match existing {
        Some(mut node) => {
            node.uuid = uuid;
            node
        }
        None => SceneNode::new("", NodeKind::Object3D).with_uuid(uuid),
    };

    node.name = reader.string_or("name", &node.name)?;
    node.transform.position = reader.vec3_or("position", node.transform.position)?;
    node.transform.rotation = reader.vec3_or("rotation", node.transform.rotation)?;
    node.transform.scale = reader.vec3_or("scale", node.transform.scale)?;
    node.visible = reader.bool_or("visible", node.visible)?;
    node.cast_shadow = reader.bool_or("castShadow", node.cast_shadow)?;
    node.receive_shadow = reader.bool_or("receiveShadow", node.receive_shadow)?;
    node.frustum_culled = reader.bool_or("frustumCulled", node.frustum_culled)?;
    node.render_order = reader.i32_or("renderOrder", node.render_order)?;
    if let Some(user_data) = reader.decode::<UserData>("userData")? {
        let handle = node.user_data.model_handle;
        node.user_data = user_data;
        node.user_data.model_handle = handle;
    }
    Ok(node)
}

fn plain_from_record(record: &Record, existing: Option<SceneNode>) -> Result<SceneNode> {
    let mut node = object3d_from_record(record, existing)?;
    node.kind = match record.get("type").and_then(Value::as_str) {
        Some("Group") => NodeKind::Group,
        Some("Bone") => NodeKind::Bone,
        _ => NodeKind::Object3D,
    };
    Ok(node)
}

fn scene_to_record(node: &SceneNode) -> Encoded {
    let mut r = object3d_to_record(node)?;
    if let NodeKind::Scene(SceneComponent {
        background: Some(background),
    }) = &node.kind
    {
        r.insert("background".into(), Value::from(*background));
    }
    Ok(r)
}

fn scene_from_record(record: &Record, existing: Option<SceneNode>) -> Result<SceneNode> {
    let mut node = object3d_from_record(record, existing)?;
    let reader = RecordReader::new("Scene", record);
    let background = match record.get("background").filter(|v| !v.is_null()) {
        Some(_) => Some(reader.u32_or("background", 0)?),
        None => None,
    };
    node.kind = NodeKind::Scene(SceneComponent { background });
    Ok(node)
}

fn mesh_to_record(node: &SceneNode) -> Encoded {
    let mut r = object3d_to_record(node)?;
    if let Some(geometry) = node.geometry() {
        r.insert("geometry".into(), Value::from(geometry.as_str()));
    }
    if let Some(material) = node.material() {
        r.insert("material".into(), Value::from(material.as_str()));
    }
    Ok(r)
}

fn mesh_component(reader: &RecordReader<'_>, node: &SceneNode) -> Result<MeshComponent> {
    let current = node.kind.mesh().cloned().unwrap_or_default();
    Ok(MeshComponent {
        geometry: reader.opt_id("geometry")?.or(current.geometry),
        material: reader.opt_id("material")?.or(current.material),
    })
}

fn mesh_from_record(record: &Record, existing: Option<SceneNode>) -> Result<SceneNode> {
    let mut node = object3d_from_record(record, existing)?;
    let mesh = mesh_component(&RecordReader::new("Mesh", record), &node)?;
    node.kind = NodeKind::Mesh(mesh);
    Ok(node)
}

fn sprite_to_record(node: &SceneNode) -> Encoded {
    let mut r = object3d_to_record(node)?;
    if let Some(material) = node.material() {
        r.insert("material".into(), Value::from(material.as_str()));
    }
    Ok(r)
}

fn sprite_from_record(record: &Record, existing: Option<SceneNode>) -> Result<SceneNode> {
    let mut node = object3d_from_record(record, existing)?;
    let mut mesh = mesh_component(&RecordReader::new("Sprite", record), &node)?;
    mesh.geometry = None;
    node.kind = NodeKind::Sprite(mesh);
    Ok(node)
}

fn light_to_record(node: &SceneNode) -> Encoded {
    let mut r = object3d_to_record(node)?;
    if let Some(light) = node.kind.light() {
        r.insert("color".into(), Value::from(light.color));
        r.insert("intensity".into(), Value::from(light.intensity));
    }
    Ok(r)
}

fn light_base(record: &Record, existing: Option<SceneNode>) -> Result<(SceneNode, LightComponent)> {
    let node = object3d_from_record(record, existing)?;
    let reader = RecordReader::new("Light", record);
    let mut light = node.kind.light().cloned().unwrap_or_default();
    light.color = reader.u32_or("color", light.color)?;
    light.intensity = reader.f32_or("intensity", light.intensity)?;
    Ok((node, light))
}

fn ambient_light_from_record(record: &Record, existing: Option<SceneNode>) -> Result<SceneNode> {
    let (mut node, light) = light_base(record, existing)?;
    node.kind = NodeKind::AmbientLight(light);
    Ok(node)
}

fn directional_light_from_record(record: &Record, existing: Option<SceneNode>) -> Result<SceneNode> {
    let (mut node, light) = light_base(record, existing)?;
    node.kind = NodeKind::DirectionalLight(light);
    Ok(node)
}

fn hemisphere_light_to_record(node: &SceneNode) -> Encoded {
    let mut r = light_to_record(node)?;
    if let Some(light) = node.kind.light() {
        r.insert("groundColor".into(), Value::from(light.ground_color));
    }
    Ok(r)
}

fn hemisphere_light_from_record(record: &Record, existing: Option<SceneNode>) -> Result<SceneNode> {
    let (mut node, mut light) = light_base(record, existing)?;
    light.ground_color = RecordReader::new("HemisphereLight", record).u32_or("groundColor", light.ground_color)?;
    node.kind = NodeKind::HemisphereLight(light);
    Ok(node)
}

fn point_light_to_record(node: &SceneNode) -> Encoded {
    let mut r = light_to_record(node)?;
    if let Some(light) = node.kind.light() {
        r.insert("distance".into(), Value::from(light.distance));
        r.insert("decay".into(), Value::from(light.decay));
    }
    Ok(r)
}

fn point_light_base(record: &Record, existing: Option<SceneNode>) -> Result<(SceneNode, LightComponent)> {
    let (node, mut light) = light_base(record, existing)?;
    let reader = RecordReader::new("PointLight", record);
    light.distance = reader.f32_or("distance", light.distance)?;
    light.decay = reader.f32_or("decay", light.decay)?;
    Ok((node, light))
}

fn point_light_from_record(record: &Record, existing: Option<SceneNode>) -> Result<SceneNode> {
    let (mut node, light) = point_light_base(record, existing)?;
    node.kind = NodeKind::PointLight(light);
    Ok(node)
}

fn spot_light_to_record(node: &SceneNode) -> Encoded {
    let mut r = point_light_to_record(node)?;
    if let Some(light) = node.kind.light() {
        r.insert("angle".into(), Value::from(light.angle));
        r.insert("penumbra".into(), Value::from(light.penumbra));
    }
    Ok(r)
}

fn spot_light_from_record(record: &Record, existing: Option<SceneNode>) -> Result<SceneNode> {
    let (mut node, mut light) = point_light_base(record, existing)?;
    let reader = RecordReader::new("SpotLight", record);
    light.angle = reader.f32_or("angle", light.angle)?;
    light.penumbra = reader.f32_or("penumbra", light.penumbra)?;
    node.kind = NodeKind::SpotLight(light);
    Ok(node)
}

fn camera_to_record(node: &SceneNode) -> Encoded {
    let mut r = object3d_to_record(node)?;
    if let Some(camera) = node.kind.camera() {
        r.insert("near".into(), Value::from(camera.near));
        r.insert("far".into(), Value::from(camera.far));
        r.insert("zoom".into(), Value::from(camera.zoom));
    }
    Ok(r)
}

fn camera_base(record: &Record, existing: Option<SceneNode>) -> Result<(SceneNode, CameraComponent)> {
    let node = object3d_from_record(record, existing)?;
    let reader = RecordReader::new("Camera", record);
    let mut camera = node.kind.camera().cloned().unwrap_or_default();
    camera.near = reader.f32_or("near", camera.near)?;
    camera.far = reader.f32_or("far", camera.far)?;
    camera.zoom = reader.f32_or("zoom", camera.zoom)?;
    Ok((node, camera))
}

fn perspective_camera_to_record(node: &SceneNode) -> Encoded {
    let mut r = camera_to_record(node)?;
    if let Some(camera) = node.kind.camera() {
        r.insert("fov".into(), Value::from(camera.fov));
        r.insert("aspect".into(), Value::from(camera.aspect));
    }
    Ok(r)
}

fn perspective_camera_from_record(record: &Record, existing: Option<SceneNode>) -> Result<SceneNode> {
    let (mut node, mut camera) = camera_base(record, existing)?;
    let reader = RecordReader::new("PerspectiveCamera", record);
    camera.fov = reader.f32_or("fov", camera.fov)?;
    camera.aspect = reader.f32_or("aspect", camera.aspect)?;
    node.kind = NodeKind::PerspectiveCamera(camera);
    Ok(node)
}

fn orthographic_camera_to_record(node: &SceneNode) -> Encoded {
    let mut r = camera_to_record(node)?;
    if let Some(camera) = node.kind.camera() {
        r.insert("left".into(), Value::from(camera.left));
        r.insert("right".into(), Value::from(camera.right));
        r.insert("top".into(), Value::from(camera.top));
        r.insert("bottom".into(), Value::from(camera.bottom));
    }
    Ok(r)
}

fn orthographic_camera_from_record(record: &Record, existing: Option<SceneNode>) -> Result<SceneNode> {
    let (mut node, mut camera) = camera_base(record, existing)?;
    let reader = RecordReader::new("OrthographicCamera", record);
    camera.left = reader.f32_or("left", camera.left)?;
    camera.right = reader.f32_or("right", camera.right)?;
    camera.top = reader.f32_or("top", camera.top)?;
    camera.bottom = reader.f32_or("bottom", camera.bottom)?;
    node.kind = NodeKind::OrthographicCamera(camera);
    Ok(node)
}

/// Serialize `id` and its descendants as nested records
///
/// Returns `None` when `id` is not in `lookup`; missing children are left out.
pub fn tree_to_record(lookup: &impl NodeLookup, id: &EntityId) -> Encoded<Option<Record>> {
    let Some(node) = lookup.lookup(id) else {
        return Ok(None);
    };
    let mut record = node_to_record(node)?;
    let mut children = Vec::new();
    for child in node.children() {
        if let Some(child) = tree_to_record(lookup, child)? {
            children.push(Value::Object(child));
        }
    }
    if !children.is_empty() {
        record.insert("children".into(), Value::Array(children));
    }
    Ok(Some(record))
}

/// Read nested records into pre-ordered nodes with parent/child links set
///
/// Only a bad root fails; a bad descendant is skipped with its subtree and
/// reported.
pub fn tree_from_record(record: &Record, warnings: &mut Warnings) -> Result<Vec<SceneNode>> {
    let root = node_from_record(record, None)?;
    let mut seen = HashSet::new();
    seen.insert(root.uuid.clone());
    let mut nodes = vec![root];
    read_children(record, 0, &mut nodes, &mut seen, warnings);
    Ok(nodes)
}

fn read_children(
    record: &Record,
    parent: usize,
    nodes: &mut Vec<SceneNode>,
    seen: &mut HashSet<EntityId>,
    warnings: &mut Warnings,
) {
    let parent_id = nodes[parent].uuid.clone();
    let children = match RecordReader::new("object", record).array("children") {
        Ok(children) => children,
        Err(error) => {
            warnings.push(LoadWarning::SkippedRecord {
                context: format!("children of {parent_id}"),
                error,
            });
            return;
        }
    };

    for (i, child) in children.iter().enumerate() {
        let parsed = as_record("object", child)
            .and_then(|child_record| node_from_record(child_record, None).map(|node| (child_record, node)));
        let (child_record, mut node) = match parsed {
            Ok(parsed) => parsed,
            Err(error) => {
                warnings.push(LoadWarning::SkippedRecord {
                    context: format!("child {i} of {parent_id}"),
                    error,
                });
                continue;
            }
        };
        if !seen.insert(node.uuid.clone()) {
            warnings.push(LoadWarning::DuplicateId(node.uuid.to_string()));
            continue;
        }
        node.parent = Some(parent_id.clone());
        nodes[parent].children.push(node.uuid.clone());
        nodes.push(node);
        let index = nodes.len() - 1;
        read_children(child_record, index, nodes, seen, warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{LoadOrigin, ModelHandle, Subtree};
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn sample_nodes() -> Vec<SceneNode> {
        let mut spot = SceneNode::new("Spot", NodeKind::SpotLight(LightComponent::default()));
        if let NodeKind::SpotLight(light) = &mut spot.kind {
            light.penumbra = 0.25;
            light.distance = 40.0;
        }
        spot.transform.position = [1.0, 2.0, 3.0];
        let mut camera = SceneNode::new("Ortho", NodeKind::OrthographicCamera(CameraComponent::default()));
        camera.cast_shadow = true;
        vec![
            SceneNode::new("Root", NodeKind::Scene(SceneComponent { background: Some(0x222222) })),
            SceneNode::new("Group", NodeKind::Group),
            SceneNode::new("Bone", NodeKind::Bone),
            SceneNode::new(
                "Mesh",
                NodeKind::Mesh(MeshComponent {
                    geometry: Some(EntityId::from("G")),
                    material: Some(EntityId::from("M")),
                }),
            ),
            spot,
            SceneNode::new("Hemi", NodeKind::HemisphereLight(LightComponent::default())),
            camera,
        ]
    }

    #[test]
    fn test_every_kind_round_trips() {
        for node in sample_nodes() {
            let record = node_to_record(&node).unwrap();
            let back = node_from_record(&record, None).unwrap();
            assert_eq!(back, node, "{}", node.type_tag());
        }
    }

    #[test]
    fn test_subtype_fields_overlay_base() {
        let spot = sample_nodes().remove(4);
        let r = node_to_record(&spot).unwrap();
        assert_eq!(r["type"], "SpotLight");
        assert_eq!(r["position"], json!([1.0, 2.0, 3.0]));
        assert_eq!(r["intensity"], json!(1.0));
        assert_eq!(r["distance"], json!(40.0));
        assert_eq!(r["penumbra"], json!(0.25));
        assert!(r.get("fov").is_none());
    }

    #[test]
    fn test_in_place_update_keeps_missing_fields() {
        let mut node = SceneNode::new("Lamp", NodeKind::PointLight(LightComponent::default()));
        node.user_data.model_handle = Some(ModelHandle(3));
        node.transform.scale = [2.0; 3];
        let id = node.uuid.clone();
        let r = record(json!({
            "uuid": id.as_str(),
            "type": "PointLight",
            "intensity": 4.0,
            "userData": { "origin": "server" }
        }));

        let updated = node_from_record(&r, Some(node)).unwrap();
        assert_eq!(updated.uuid, id);
        assert_eq!(updated.name, "Lamp");
        assert_eq!(updated.transform.scale, [2.0; 3]);
        assert_eq!(updated.kind.light().map(|l| l.intensity), Some(4.0));
        assert_eq!(updated.user_data.origin, LoadOrigin::Server);
        assert_eq!(updated.user_data.model_handle, Some(ModelHandle(3)));
    }

    #[test]
    fn test_malformed_records() {
        let missing = record(json!({ "type": "Group" }));
        assert!(matches!(
            node_from_record(&missing, None),
            Err(RecordError::MissingField { .. })
        ));
        let unknown = record(json!({ "uuid": "A", "type": "LensFlare" }));
        assert_eq!(
            node_from_record(&unknown, None),
            Err(RecordError::UnknownType {
                category: "object",
                tag: "LensFlare".to_string(),
            })
        );
        assert!(node_types().any(|t| t == "OrthographicCamera"));
    }

    #[test]
    fn test_tree_round_trip_and_bad_child() {
        let mut tree = Subtree::new(SceneNode::new("Root", NodeKind::Group));
        let root_id = tree.root().uuid.clone();
        let child = SceneNode::new("Child", NodeKind::Group);
        let child_id = child.uuid.clone();
        tree.add_child(&root_id, child).unwrap();
        tree.add_child(&child_id, SceneNode::new("Leaf", NodeKind::Object3D)).unwrap();

        let mut r = tree_to_record(&tree, &root_id).unwrap().unwrap();
        let mut warnings = Warnings::new();
        let nodes = tree_from_record(&r, &mut warnings).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(nodes, tree.nodes());

        if let Some(Value::Array(children)) = r.get_mut("children") {
            children.push(json!({ "uuid": "bad" }));
            children.push(json!({ "uuid": child_id.as_str(), "type": "Group" }));
        }
        let mut warnings = Warnings::new();
        let nodes = tree_from_record(&r, &mut warnings).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(warnings.len(), 2);
    }
}
