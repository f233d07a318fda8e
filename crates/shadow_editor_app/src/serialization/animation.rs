// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation group and clip serializers.
//!
//! Documents store groups and clips in one flat list. Loading takes two
//! passes: every clip record is parsed first, then each group's clip list is
//! resolved against the parsed clips. A clip id that resolves to nothing is
//! dropped from the group and reported once.

use super::{as_record, Encoded, LoadWarning, Record, RecordError, RecordReader, Result, Warnings};
use serde_json::Value;
use shadow_editor_animation::{
    AnimationClip, AnimationGroup, ClipData, ClipKind, TargetBinding, Tween,
};
use std::collections::HashSet;

/// Type tag of group records
pub const GROUP_TYPE: &str = "AnimationGroup";

/// Serialize a group
pub fn group_to_record(group: &AnimationGroup) -> Record {
    let mut r = Record::new();
    r.insert("uuid".into(), Value::from(group.uuid.clone()));
    r.insert("type".into(), Value::from(GROUP_TYPE));
    r.insert("name".into(), Value::from(group.name.clone()));
    r.insert(
        "animations".into(),
        Value::from(group.animations.clone()),
    );
    r
}

/// Deserialize a group without resolving its clips
pub fn group_from_record(record: &Record) -> Result<AnimationGroup> {
    let reader = RecordReader::new(GROUP_TYPE, record);
    let uuid = reader.str("uuid")?.to_string();
    let animations = reader
        .array("animations")?
        .iter()
        .map(|id| {
            id.as_str()
                .map(str::to_string)
                .ok_or_else(|| reader.invalid("animations", "expected clip identifiers"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(AnimationGroup {
        uuid,
        name: reader.string_or("name", "")?,
        animations,
    })
}

/// Serialize a clip
pub fn clip_to_record(clip: &AnimationClip) -> Encoded {
    let mut r = Record::new();
    r.insert("uuid".into(), Value::from(clip.uuid.clone()));
    r.insert("type".into(), Value::from(clip.kind.tag()));
    r.insert("name".into(), Value::from(clip.name.clone()));
    if let Some(target) = &clip.target {
        r.insert("target".into(), serde_json::to_value(target)?);
    }
    r.insert("beginTime".into(), Value::from(clip.begin_time));
    r.insert("endTime".into(), Value::from(clip.end_time));
    r.insert("layer".into(), Value::from(clip.layer));
    let data = match &clip.data {
        ClipData::Tween(tween) => serde_json::to_value(tween)?,
        ClipData::Opaque(value) => value.clone(),
    };
    r.insert("data".into(), data);
    Ok(r)
}

/// Deserialize a clip
pub fn clip_from_record(record: &Record) -> Result<AnimationClip> {
    let reader = RecordReader::new("animation", record);
    let uuid = reader.str("uuid")?.to_string();
    let tag = reader.str("type")?;
    let kind = ClipKind::from_tag(tag).map_err(|_| RecordError::UnknownType {
        category: "animation",
        tag: tag.to_string(),
    })?;

    let data = match kind {
        ClipKind::Tween => ClipData::Tween(reader.decode::<Tween>("data")?.unwrap_or_default()),
        _ => match record.get("data").filter(|v| !v.is_null()) {
            Some(value) => ClipData::Opaque(value.clone()),
            None => ClipData::for_kind(kind),
        },
    };

    let mut clip = AnimationClip::new(reader.string_or("name", "")?, kind);
    clip.uuid = uuid;
    let clip = clip
        .with_span(reader.f32_or("beginTime", 0.0)?, reader.f32_or("endTime", 10.0)?)
        .map_err(|err| reader.invalid("endTime", err.to_string()))?;
    Ok(AnimationClip {
        target: reader.decode::<TargetBinding>("target")?,
        layer: reader.u32_or("layer", 0)?,
        data,
        ..clip
    })
}

/// Animations read from a document
#[derive(Debug, Default)]
pub struct LoadedAnimations {
    /// Groups with unresolved clip ids removed
    pub groups: Vec<AnimationGroup>,
    /// Every readable clip
    pub clips: Vec<AnimationClip>,
}

/// Read a flat animation list
pub fn animations_from_records(records: &[Value], warnings: &mut Warnings) -> LoadedAnimations {
    let mut loaded = LoadedAnimations::default();
    let mut group_records = Vec::new();

    for (i, value) in records.iter().enumerate() {
        let record = match as_record("animation", value) {
            Ok(record) => record,
            Err(error) => {
                warnings.push(LoadWarning::SkippedRecord {
                    context: format!("animation {i}"),
                    error,
                });
                continue;
            }
        };
        if record.get("type").and_then(Value::as_str) == Some(GROUP_TYPE) {
            group_records.push((i, record));
            continue;
        }
        match clip_from_record(record) {
            Ok(clip) => loaded.clips.push(clip),
            Err(error) => warnings.push(LoadWarning::SkippedRecord {
                context: format!("animation {i}"),
                error,
            }),
        }
    }

    let clip_ids: HashSet<&str> = loaded.clips.iter().map(|c| c.uuid.as_str()).collect();
    for (i, record) in group_records {
        let mut group = match group_from_record(record) {
            Ok(group) => group,
            Err(error) => {
                warnings.push(LoadWarning::SkippedRecord {
                    context: format!("animation group {i}"),
                    error,
                });
                continue;
            }
        };
        let mut reported = HashSet::new();
        for missing in group.animations.iter().filter(|id| !clip_ids.contains(id.as_str())) {
            if reported.insert(missing.clone()) {
                warnings.push(LoadWarning::UnresolvedReference {
                    owner: group.uuid.clone(),
                    missing: missing.clone(),
                });
            }
        }
        group.animations.retain(|id| clip_ids.contains(id.as_str()));
        loaded.groups.push(group);
    }
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shadow_editor_animation::{Ease, TransformStatus};

    fn tween_clip() -> AnimationClip {
        let end = TransformStatus {
            position: [0.0, 5.0, 0.0],
            ..TransformStatus::default()
        };
        let mut clip = AnimationClip::new("Rise", ClipKind::Tween)
            .with_span(1.0, 3.0)
            .unwrap()
            .with_target(TargetBinding::object("NODE"));
        clip.data = ClipData::Tween(Tween::to(end, Ease::QuadOut));
        clip.layer = 2;
        clip
    }

    #[test]
    fn test_clip_round_trip() {
        let clip = tween_clip();
        let r = clip_to_record(&clip).unwrap();
        assert_eq!(r["type"], "Tween");
        assert_eq!(r["data"]["ease"], "quadOut");
        assert_eq!(clip_from_record(&r).unwrap(), clip);

        let audio = AnimationClip::new("Music", ClipKind::Audio);
        assert_eq!(clip_from_record(&clip_to_record(&audio).unwrap()).unwrap(), audio);
    }

    #[test]
    fn test_clip_rejects_reversed_span() {
        let r = json!({ "uuid": "C", "type": "Tween", "beginTime": 4, "endTime": 2 });
        assert!(matches!(
            clip_from_record(r.as_object().unwrap()),
            Err(RecordError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_groups_resolve_after_clips() {
        let clip = tween_clip();
        let mut group = AnimationGroup::new("Intro");
        group.add_clip(&clip);
        group.animations.push("GHOST".to_string());
        group.animations.push("GHOST".to_string());

        // group listed before the clip it references
        let records = vec![
            Value::Object(group_to_record(&group)),
            Value::Object(clip_to_record(&clip).unwrap()),
        ];
        let mut warnings = Warnings::new();
        let loaded = animations_from_records(&records, &mut warnings);

        assert_eq!(loaded.clips.len(), 1);
        assert_eq!(loaded.groups[0].animations, vec![clip.uuid.clone()]);
        assert_eq!(
            warnings.into_vec(),
            vec![LoadWarning::UnresolvedReference {
                owner: group.uuid.clone(),
                missing: "GHOST".to_string(),
            }]
        );
    }
}
