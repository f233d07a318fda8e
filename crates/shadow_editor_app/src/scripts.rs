// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scripts attached to scene nodes.

use crate::scene::{EntityId, FieldError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Script language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScriptKind {
    /// Behaviour script
    #[default]
    #[serde(rename = "javascript")]
    Javascript,
    /// Vertex shader source
    #[serde(rename = "vertexShader")]
    VertexShader,
    /// Fragment shader source
    #[serde(rename = "fragmentShader")]
    FragmentShader,
    /// Data file
    #[serde(rename = "json")]
    Json,
}

impl ScriptKind {
    /// Name used in documents
    pub fn name(&self) -> &'static str {
        match self {
            Self::Javascript => "javascript",
            Self::VertexShader => "vertexShader",
            Self::FragmentShader => "fragmentShader",
            Self::Json => "json",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        [Self::Javascript, Self::VertexShader, Self::FragmentShader, Self::Json]
            .into_iter()
            .find(|kind| kind.name() == name)
    }
}

/// A script record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Unique identifier
    pub uuid: EntityId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Language
    #[serde(rename = "type", default)]
    pub kind: ScriptKind,
    /// Source text
    #[serde(default)]
    pub source: String,
}

impl Script {
    /// Create a script with a fresh identifier
    pub fn new(name: impl Into<String>, kind: ScriptKind, source: impl Into<String>) -> Self {
        Self {
            uuid: EntityId::new(),
            name: name.into(),
            kind,
            source: source.into(),
        }
    }

    /// Read an editable attribute
    pub fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.clone()),
            "source" => Some(self.source.clone()),
            "type" => Some(self.kind.name().to_string()),
            _ => None,
        }
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: String) -> Result<(), FieldError> {
        match name {
            "name" => self.name = value,
            "source" => self.source = value,
            "type" => {
                self.kind = ScriptKind::from_name(&value)
                    .ok_or_else(|| FieldError::invalid(name, format!("unknown script type {value}")))?;
            }
            _ => return Err(FieldError::unknown("Script", name)),
        }
        Ok(())
    }
}

/// Scripts per node, in attachment order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptStore {
    scripts: IndexMap<EntityId, Vec<Script>>,
}

impl ScriptStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts attached to `object`
    pub fn scripts(&self, object: &EntityId) -> &[Script] {
        self.scripts.get(object).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Find a script and its index
    pub fn find(&self, object: &EntityId, script: &EntityId) -> Option<(usize, &Script)> {
        self.scripts(object)
            .iter()
            .enumerate()
            .find(|(_, s)| &s.uuid == script)
    }

    /// Every node with at least one script
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &[Script])> {
        self.scripts
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(object, list)| (object, list.as_slice()))
    }

    /// Total number of scripts
    pub fn len(&self) -> usize {
        self.scripts.values().map(Vec::len).sum()
    }

    /// Whether no scripts are attached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn insert(&mut self, object: &EntityId, index: Option<usize>, script: Script) {
        let list = self.scripts.entry(object.clone()).or_default();
        let at = index.unwrap_or(list.len()).min(list.len());
        list.insert(at, script);
    }

    pub(crate) fn remove(&mut self, object: &EntityId, script: &EntityId) -> Option<(usize, Script)> {
        let list = self.scripts.get_mut(object)?;
        let index = list.iter().position(|s| &s.uuid == script)?;
        let removed = list.remove(index);
        if list.is_empty() {
            self.scripts.shift_remove(object);
        }
        Some((index, removed))
    }

    pub(crate) fn take(&mut self, object: &EntityId) -> Vec<Script> {
        self.scripts.shift_remove(object).unwrap_or_default()
    }

    pub(crate) fn script_mut(&mut self, object: &EntityId, script: &EntityId) -> Option<&mut Script> {
        self.scripts
            .get_mut(object)?
            .iter_mut()
            .find(|s| &s.uuid == script)
    }

    pub(crate) fn rekey(&mut self, old: &EntityId, new: &EntityId) {
        if let Some(list) = self.scripts.shift_remove(old) {
            self.scripts.insert(new.clone(), list);
        }
    }
}
