// SPDX-License-Identifier: MIT OR Apache-2.0
//! Geometry serializers.
//!
//! With an `existing` geometry the readers update it in place: the kind's
//! parameters are overlaid field by field and anything the record leaves
//! out keeps its current value.

use super::{decode_record, encode_record, Encoded, Record, RecordError, RecordReader, Result};
use crate::resources::{BufferData, Geometry, GeometryKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Fields every geometry record carries
pub fn geometry_base_to_record(geometry: &Geometry) -> Record {
    let mut r = Record::new();
    r.insert("uuid".into(), Value::from(geometry.uuid.as_str()));
    r.insert("type".into(), Value::from(geometry.kind.type_tag()));
    if !geometry.name.is_empty() {
        r.insert("name".into(), Value::from(geometry.name.clone()));
    }
    if !geometry.user_data.is_empty() {
        r.insert("userData".into(), Value::Object(geometry.user_data.clone()));
    }
    r
}

/// Serialize a geometry
pub fn geometry_to_record(geometry: &Geometry) -> Encoded {
    let mut r = geometry_base_to_record(geometry);
    let (field, overlay) = match &geometry.kind {
        GeometryKind::Box(p) => ("parameters", encode_record(p)?),
        GeometryKind::Sphere(p) => ("parameters", encode_record(p)?),
        GeometryKind::Plane(p) => ("parameters", encode_record(p)?),
        GeometryKind::Cylinder(p) => ("parameters", encode_record(p)?),
        GeometryKind::Torus(p) => ("parameters", encode_record(p)?),
        GeometryKind::Buffer(data) => ("data", encode_record(data)?),
    };
    r.insert(field.into(), Value::Object(overlay));
    Ok(r)
}

/// Read the fields every geometry has, keeping the kind of `existing`
pub fn geometry_base_from_record(record: &Record, existing: Option<Geometry>) -> Result<Geometry> {
    let reader = RecordReader::new("geometry", record);
    let uuid = reader.id("uuid")?;
    let mut geometry = match existing {
        Some(geometry) => geometry,
        None => Geometry::new("", GeometryKind::default()),
    };
    geometry.uuid = uuid;
    geometry.name = reader.string_or("name", &geometry.name)?;
    if let Some(user_data) = reader.object("userData")? {
        geometry.user_data = user_data.clone();
    }
    Ok(geometry)
}

/// Overlay `parameters` onto `current`, or onto defaults
fn params<T>(reader: &RecordReader<'_>, current: Option<&T>) -> Result<T>
where
    T: DeserializeOwned + Serialize + Default + Clone,
{
    let Some(overlay) = reader.object("parameters")? else {
        return Ok(current.cloned().unwrap_or_default());
    };
    let mut merged = match current {
        Some(current) => encode_record(current).map_err(|err| reader.invalid("parameters", err.to_string()))?,
        None => Record::new(),
    };
    merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    decode_record("geometry parameters", &merged)
}

macro_rules! parametric {
    ($reader:expr, $current:expr, $variant:ident) => {
        GeometryKind::$variant(params(
            &$reader,
            match $current {
                GeometryKind::$variant(p) => Some(p),
                _ => None,
            },
        )?)
    };
}

/// Deserialize a geometry, dispatching on its `type`
///
/// Both `BoxBufferGeometry` and `BoxGeometry` style tags are accepted.
pub fn geometry_from_record(record: &Record, existing: Option<Geometry>) -> Result<Geometry> {
    let mut geometry = geometry_base_from_record(record, existing)?;
    let reader = RecordReader::new("geometry", record);
    let tag = reader.str("type")?;
    let current = &geometry.kind;
    let kind = match tag.trim_end_matches("Geometry").trim_end_matches("Buffer") {
        "Box" => parametric!(reader, current, Box),
        "Sphere" => parametric!(reader, current, Sphere),
        "Plane" => parametric!(reader, current, Plane),
        "Cylinder" => parametric!(reader, current, Cylinder),
        "Torus" => parametric!(reader, current, Torus),
        "" => match (reader.decode::<BufferData>("data")?, current) {
            (Some(data), _) => GeometryKind::Buffer(data),
            (None, GeometryKind::Buffer(data)) => GeometryKind::Buffer(data.clone()),
            (None, _) => GeometryKind::Buffer(BufferData::default()),
        },
        _ => {
            return Err(RecordError::UnknownType {
                category: "geometry",
                tag: tag.to_string(),
            })
        }
    };
    geometry.kind = kind;
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{BoxParams, BufferAttribute, SphereParams, TorusParams};
    use serde_json::json;

    #[test]
    fn test_parametric_round_trip() {
        let mut geometry = Geometry::new("Ring", GeometryKind::Torus(TorusParams::default()));
        geometry.set_attribute("tube", json!(0.1)).unwrap();
        let r = geometry_to_record(&geometry).unwrap();
        assert_eq!(r["type"], "TorusBufferGeometry");
        assert!(r["parameters"].get("tubularSegments").is_some());
        assert_eq!(geometry_from_record(&r, None).unwrap(), geometry);
    }

    #[test]
    fn test_buffer_geometry_round_trip() {
        let mut data = BufferData::default();
        data.attributes.insert(
            "position".to_string(),
            BufferAttribute {
                item_size: 3,
                array: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                normalized: false,
            },
        );
        data.index = Some(vec![0, 1, 2]);
        let geometry = Geometry::new("Tri", GeometryKind::Buffer(data));
        let r = geometry_to_record(&geometry).unwrap();
        assert!(r.get("parameters").is_none());
        assert_eq!(geometry_from_record(&r, None).unwrap(), geometry);
    }

    #[test]
    fn test_aliases_and_defaults() {
        let r = json!({ "uuid": "G", "type": "BoxGeometry", "parameters": { "width": 4 } });
        let geometry = geometry_from_record(r.as_object().unwrap(), None).unwrap();
        match geometry.kind {
            GeometryKind::Box(p) => {
                assert_eq!(p.width, 4.0);
                assert_eq!(p.height, BoxParams::default().height);
            }
            other => panic!("unexpected kind {other:?}"),
        }

        let r = json!({ "uuid": "G", "type": "TeapotGeometry" });
        assert!(matches!(
            geometry_from_record(r.as_object().unwrap(), None),
            Err(RecordError::UnknownType { category: "geometry", .. })
        ));
    }

    #[test]
    fn test_in_place_update_overlays_parameters() {
        let mut ball = Geometry::new("Ball", GeometryKind::Sphere(SphereParams::default()));
        ball.set_attribute("radius", json!(3.0)).unwrap();
        ball.user_data.insert("lod".to_string(), json!(2));
        let id = ball.uuid.clone();

        let r = json!({
            "uuid": id.as_str(),
            "type": "SphereGeometry",
            "parameters": { "widthSegments": 64 }
        });
        let updated = geometry_from_record(r.as_object().unwrap(), Some(ball.clone())).unwrap();
        assert_eq!(updated.uuid, id);
        assert_eq!(updated.name, "Ball");
        assert_eq!(updated.user_data["lod"], 2);
        assert_eq!(updated.attribute("radius"), Some(json!(3.0)));
        assert_eq!(updated.attribute("widthSegments"), Some(json!(64)));

        // a different kind starts from that kind's defaults
        let r = json!({ "uuid": id.as_str(), "type": "BoxGeometry" });
        let boxed = geometry_from_record(r.as_object().unwrap(), Some(ball)).unwrap();
        assert_eq!(boxed.kind, GeometryKind::Box(BoxParams::default()));
        assert_eq!(boxed.name, "Ball");
    }
}
