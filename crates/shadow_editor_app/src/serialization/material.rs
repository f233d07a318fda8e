// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material and texture serializers.
//!
//! Texture map slots are written at the top level of the material record as
//! `slot: textureUuid`, matching the other colour and scalar fields.

use super::{decode_record, encode_record, Encoded, Record, RecordError, RecordReader, Result};
use crate::resources::{
    LambertParams, Material, MaterialKind, PhongParams, Side, StandardParams, Texture, MAP_SLOTS,
};
use serde_json::Value;

/// Fields every material record carries
pub fn material_base_to_record(material: &Material) -> Record {
    let mut r = Record::new();
    r.insert("uuid".into(), Value::from(material.uuid.as_str()));
    r.insert("type".into(), Value::from(material.kind.type_tag()));
    r.insert("name".into(), Value::from(material.name.clone()));
    r.insert("color".into(), Value::from(material.color));
    r.insert("opacity".into(), Value::from(material.opacity));
    r.insert("transparent".into(), Value::from(material.transparent));
    r.insert("wireframe".into(), Value::from(material.wireframe));
    r.insert("side".into(), Value::from(material.side.code()));
    r.insert("depthTest".into(), Value::from(material.depth_test));
    r.insert("depthWrite".into(), Value::from(material.depth_write));
    r.insert("visible".into(), Value::from(material.visible));
    for (slot, texture) in &material.maps {
        r.insert(slot.clone(), Value::from(texture.as_str()));
    }
    if !material.user_data.is_empty() {
        r.insert("userData".into(), Value::Object(material.user_data.clone()));
    }
    r
}

/// Serialize a material
pub fn material_to_record(material: &Material) -> Record {
    let mut r = material_base_to_record(material);
    match &material.kind {
        MaterialKind::Basic => {}
        MaterialKind::Lambert(p) => {
            r.insert("emissive".into(), Value::from(p.emissive));
        }
        MaterialKind::Phong(p) => {
            r.insert("emissive".into(), Value::from(p.emissive));
            r.insert("specular".into(), Value::from(p.specular));
            r.insert("shininess".into(), Value::from(p.shininess));
        }
        MaterialKind::Standard(p) => {
            r.insert("emissive".into(), Value::from(p.emissive));
            r.insert("roughness".into(), Value::from(p.roughness));
            r.insert("metalness".into(), Value::from(p.metalness));
        }
        MaterialKind::Sprite { rotation } => {
            r.insert("rotation".into(), Value::from(*rotation));
        }
        MaterialKind::LineBasic { linewidth } => {
            r.insert("linewidth".into(), Value::from(*linewidth));
        }
    }
    r
}

fn kind_from_record(tag: &str, reader: &RecordReader<'_>, current: &MaterialKind) -> Result<MaterialKind> {
    let kind = match tag {
        "MeshBasicMaterial" => MaterialKind::Basic,
        "MeshLambertMaterial" => {
            let defaults = match current {
                MaterialKind::Lambert(p) => p.clone(),
                _ => LambertParams::default(),
            };
            MaterialKind::Lambert(LambertParams {
                emissive: reader.u32_or("emissive", defaults.emissive)?,
            })
        }
        "MeshPhongMaterial" => {
            let defaults = match current {
                MaterialKind::Phong(p) => p.clone(),
                _ => PhongParams::default(),
            };
            MaterialKind::Phong(PhongParams {
                emissive: reader.u32_or("emissive", defaults.emissive)?,
                specular: reader.u32_or("specular", defaults.specular)?,
                shininess: reader.f32_or("shininess", defaults.shininess)?,
            })
        }
        "MeshStandardMaterial" => {
            let defaults = match current {
                MaterialKind::Standard(p) => p.clone(),
                _ => StandardParams::default(),
            };
            MaterialKind::Standard(StandardParams {
                emissive: reader.u32_or("emissive", defaults.emissive)?,
                roughness: reader.f32_or("roughness", defaults.roughness)?,
                metalness: reader.f32_or("metalness", defaults.metalness)?,
            })
        }
        "SpriteMaterial" => {
            let rotation = match current {
                MaterialKind::Sprite { rotation } => *rotation,
                _ => 0.0,
            };
            MaterialKind::Sprite {
                rotation: reader.f32_or("rotation", rotation)?,
            }
        }
        "LineBasicMaterial" => {
            let linewidth = match current {
                MaterialKind::LineBasic { linewidth } => *linewidth,
                _ => 1.0,
            };
            MaterialKind::LineBasic {
                linewidth: reader.f32_or("linewidth", linewidth)?,
            }
        }
        _ => {
            return Err(RecordError::UnknownType {
                category: "material",
                tag: tag.to_string(),
            })
        }
    };
    Ok(kind)
}

/// Read the fields every material has, keeping the kind of `existing`
///
/// Map slots in the record are added or replaced; slots it leaves out stay.
pub fn material_base_from_record(record: &Record, existing: Option<Material>) -> Result<Material> {
    let reader = RecordReader::new("material", record);
    let uuid = reader.id("uuid")?;
    let mut material = match existing {
        Some(material) => material,
        None => Material::new("", MaterialKind::Basic),
    };
    material.uuid = uuid;
    material.name = reader.string_or("name", &material.name)?;
    material.color = reader.u32_or("color", material.color)?;
    material.opacity = reader.f32_or("opacity", material.opacity)?;
    material.transparent = reader.bool_or("transparent", material.transparent)?;
    material.wireframe = reader.bool_or("wireframe", material.wireframe)?;
    let side = reader.u64_or("side", u64::from(material.side.code()))?;
    material.side = Side::from_code(side).ok_or_else(|| reader.invalid("side", "expected 0, 1 or 2"))?;
    material.depth_test = reader.bool_or("depthTest", material.depth_test)?;
    material.depth_write = reader.bool_or("depthWrite", material.depth_write)?;
    material.visible = reader.bool_or("visible", material.visible)?;
    for slot in MAP_SLOTS {
        if let Some(texture) = reader.opt_id(slot)? {
            material.maps.insert(slot.to_string(), texture);
        }
    }
    if let Some(user_data) = reader.object("userData")? {
        material.user_data = user_data.clone();
    }
    Ok(material)
}

/// Deserialize a material, dispatching on its `type`
///
/// Map slots the kind does not have are dropped. References are not
/// checked here.
pub fn material_from_record(record: &Record, existing: Option<Material>) -> Result<Material> {
    let mut material = material_base_from_record(record, existing)?;
    let reader = RecordReader::new("material", record);
    material.kind = kind_from_record(reader.str("type")?, &reader, &material.kind)?;
    let kind = &material.kind;
    material.maps.retain(|slot, _| kind.supports_map(slot));
    Ok(material)
}

/// Serialize a texture
pub fn texture_to_record(texture: &Texture) -> Encoded {
    encode_record(texture)
}

/// Deserialize a texture; with `existing`, fields the record leaves out are kept
pub fn texture_from_record(record: &Record, existing: Option<Texture>) -> Result<Texture> {
    let Some(existing) = existing else {
        return decode_record("texture", record);
    };
    let mut merged = encode_record(&existing).map_err(|err| RecordError::Malformed {
        record: "texture".to_string(),
        reason: err.to_string(),
    })?;
    merged.extend(record.iter().map(|(k, v)| (k.clone(), v.clone())));
    decode_record("texture", &merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::EntityId;
    use serde_json::json;

    #[test]
    fn test_material_round_trip_with_maps() {
        let mut material = Material::new("Steel", MaterialKind::Standard(StandardParams::default()));
        material.side = Side::Double;
        material.maps.insert("normalMap".to_string(), EntityId::from("T1"));
        material.user_data.insert("tag".to_string(), json!("metal"));

        let r = material_to_record(&material);
        assert_eq!(r["type"], "MeshStandardMaterial");
        assert_eq!(r["normalMap"], "T1");
        assert_eq!(r["side"], 2);
        assert_eq!(material_from_record(&r, None).unwrap(), material);
    }

    #[test]
    fn test_kind_overlay_fields() {
        let material = Material::new("Shiny", MaterialKind::Phong(PhongParams::default()));
        let r = material_to_record(&material);
        assert_eq!(r["specular"], 0x111111);
        assert!(r.get("roughness").is_none());

        let line = Material::new("Line", MaterialKind::LineBasic { linewidth: 2.0 });
        assert_eq!(material_from_record(&material_to_record(&line), None).unwrap(), line);
    }

    #[test]
    fn test_unsupported_slot_and_bad_side() {
        let r = json!({ "uuid": "M", "type": "SpriteMaterial", "map": "T", "normalMap": "N" });
        let material = material_from_record(r.as_object().unwrap(), None).unwrap();
        assert_eq!(material.maps.len(), 1);

        let r = json!({ "uuid": "M", "type": "MeshBasicMaterial", "side": 7 });
        assert!(matches!(
            material_from_record(r.as_object().unwrap(), None),
            Err(RecordError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_texture_record() {
        let texture = Texture::new("Brick", "textures/brick.png");
        let r = texture_to_record(&texture).unwrap();
        assert_eq!(r["flipY"], true);
        assert_eq!(texture_from_record(&r, None).unwrap(), texture);
    }

    #[test]
    fn test_material_in_place_update() {
        let mut steel = Material::new("Steel", MaterialKind::Standard(StandardParams::default()));
        steel.color = 0x888888;
        steel.maps.insert("map".to_string(), EntityId::from("T1"));
        let id = steel.uuid.clone();

        let r = json!({
            "uuid": id.as_str(),
            "type": "MeshStandardMaterial",
            "roughness": 0.2,
            "normalMap": "T2"
        });
        let updated = material_from_record(r.as_object().unwrap(), Some(steel.clone())).unwrap();
        assert_eq!(updated.uuid, id);
        assert_eq!(updated.name, "Steel");
        assert_eq!(updated.color, 0x888888);
        assert_eq!(updated.maps.len(), 2);
        match &updated.kind {
            MaterialKind::Standard(p) => {
                assert_eq!(p.roughness, 0.2);
                assert_eq!(p.metalness, StandardParams::default().metalness);
            }
            other => panic!("unexpected kind {other:?}"),
        }

        // switching to a kind without normal maps drops that slot
        let r = json!({ "uuid": id.as_str(), "type": "SpriteMaterial" });
        let sprite = material_from_record(r.as_object().unwrap(), Some(updated)).unwrap();
        assert_eq!(sprite.kind, MaterialKind::Sprite { rotation: 0.0 });
        assert_eq!(sprite.maps.keys().collect::<Vec<_>>(), vec!["map"]);
        assert_eq!(sprite.color, 0x888888);
    }

    #[test]
    fn test_texture_in_place_update() {
        let mut brick = Texture::new("Brick", "textures/brick.png");
        brick.repeat = [4.0, 4.0];
        let r = json!({ "uuid": brick.uuid.as_str(), "url": "textures/brick_2k.png" });
        let updated = texture_from_record(r.as_object().unwrap(), Some(brick.clone())).unwrap();
        assert_eq!(updated.url, "textures/brick_2k.png");
        assert_eq!(updated.name, "Brick");
        assert_eq!(updated.repeat, [4.0, 4.0]);
    }
}
