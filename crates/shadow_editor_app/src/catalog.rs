// SPDX-License-Identifier: MIT OR Apache-2.0
//! Asset-server catalog entries.
//!
//! A catalog entry describes a model or prefab published on the asset
//! server. Instantiating an entry copies a template subtree under fresh
//! identifiers and stamps the copy's root with the entry's identity, so the
//! same model can be added to a scene any number of times.

use crate::scene::{EntityId, LoadOrigin, SourceIdentity, Subtree};
use crate::serialization::{Record, RecordReader, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A model listed by the asset server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Server-side identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Download URL, relative to the server
    pub url: String,
    /// Thumbnail URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Pinyin initials of the name
    #[serde(default)]
    pub first_pinyin: String,
    /// Full pinyin of the name
    #[serde(default)]
    pub total_pinyin: String,
    /// Server file type, e.g. `json` or `fbx`
    #[serde(default)]
    pub model_type: String,
}

impl CatalogEntry {
    /// Create an entry with no pinyin keys
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            thumbnail: None,
            first_pinyin: String::new(),
            total_pinyin: String::new(),
            model_type: String::new(),
        }
    }

    /// Read an entry from an asset-server listing
    pub fn from_server_record(record: &Record) -> Result<Self> {
        let reader = RecordReader::new("catalog", record);
        let thumbnail = match reader.string_or("Thumbnail", "")? {
            t if t.is_empty() => reader.string_or("Image", "")?,
            t => t,
        };
        Ok(Self {
            id: reader.str("ID")?.to_string(),
            name: reader.string_or("Name", "")?,
            url: reader.str("Url")?.to_string(),
            thumbnail: (!thumbnail.is_empty()).then_some(thumbnail),
            first_pinyin: reader.string_or("FirstPinYin", "")?,
            total_pinyin: reader.string_or("TotalPinYin", "")?,
            model_type: reader.string_or("Type", "")?,
        })
    }

    /// Whether a search query matches the name or a pinyin key
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.name.to_lowercase().contains(&query)
            || self.first_pinyin.to_lowercase().contains(&query)
            || self.total_pinyin.to_lowercase().contains(&query)
    }

    /// Copy `template` under fresh identifiers, named and tagged after this
    /// entry
    pub fn instantiate(&self, template: &Subtree) -> Subtree {
        let mut fresh: HashMap<EntityId, EntityId> = HashMap::new();
        let mut renew = |id: &EntityId| fresh.entry(id.clone()).or_insert_with(EntityId::new).clone();

        let mut copy = template.clone();
        for node in &mut copy.nodes {
            node.uuid = renew(&node.uuid);
            node.parent = node.parent.as_ref().map(&mut renew);
            node.children = node.children.iter().map(&mut renew).collect();
            if let Some(mesh) = node.kind.mesh_mut() {
                mesh.geometry = mesh.geometry.as_ref().map(&mut renew);
                mesh.material = mesh.material.as_ref().map(&mut renew);
            }
        }
        for geometry in &mut copy.geometries {
            geometry.uuid = renew(&geometry.uuid);
        }
        for material in &mut copy.materials {
            material.uuid = renew(&material.uuid);
            for texture in material.maps.values_mut() {
                *texture = renew(texture);
            }
        }
        for texture in &mut copy.textures {
            texture.uuid = renew(&texture.uuid);
        }

        let root = copy.root_mut();
        root.name = self.name.clone();
        root.user_data.source = Some(SourceIdentity {
            id: self.id.clone(),
            name: self.name.clone(),
            url: self.url.clone(),
            thumbnail: self.thumbnail.clone(),
        });
        root.user_data.first_pinyin = self.first_pinyin.clone();
        root.user_data.total_pinyin = self.total_pinyin.clone();
        root.user_data.origin = LoadOrigin::Server;
        root.user_data.model_handle = None;
        copy
    }
}
