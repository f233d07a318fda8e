// SPDX-License-Identifier: MIT OR Apache-2.0
//! The editor facade.
//!
//! [`Editor`] owns one document: the registry with its scene root, the
//! scripts, the undo/redo history and the document options. Every change to
//! the document goes through [`Editor::execute`] (or an undo/redo), which
//! hands the command this editor's context and records it in the history.

use crate::assets::{AssetError, PendingCommand};
use crate::commands::{Command, CommandError, EditorContext};
use crate::events::EditorEvent;
use crate::history::{History, HistoryError};
use crate::registry::{EntityRef, Registry, RegistryError};
use crate::scene::EntityId;
use crate::scripts::ScriptStore;
use crate::serialization::document::{document_to_record, read_document, DocumentError, LoadReport};
use crate::serialization::Warnings;
use crate::settings::EditorOptions;
use serde_json::Value;
use thiserror::Error;

/// Errors from operations that combine loading with execution
#[derive(Debug, Error)]
pub enum EditorError {
    /// The asset a command depends on did not load
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// The command could not be built from the loaded asset
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The command failed or history refused it
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// One open document with its history
#[derive(Debug)]
pub struct Editor {
    context: EditorContext,
    history: History,
    options: EditorOptions,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// Create an editor holding an empty scene
    pub fn new() -> Self {
        Self::with_options(EditorOptions::default())
    }

    /// Create an empty editor with the given options
    pub fn with_options(options: EditorOptions) -> Self {
        Self {
            context: EditorContext::new(),
            history: History::with_options(&options),
            options,
        }
    }

    /// Load a document into a new editor
    pub fn from_json(text: &str) -> Result<(Self, LoadReport), DocumentError> {
        let mut editor = Self::new();
        let report = editor.load_json(text)?;
        Ok((editor, report))
    }

    /// Scene, assets and scripts
    pub fn context(&self) -> &EditorContext {
        &self.context
    }

    /// Registered entities
    pub fn registry(&self) -> &Registry {
        self.context.registry()
    }

    /// Scripts by node
    pub fn scripts(&self) -> &ScriptStore {
        self.context.scripts()
    }

    /// Undo/redo history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Document options
    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    /// Replace the document options
    ///
    /// Switching history recording on or off discards the current history.
    pub fn set_options(&mut self, options: EditorOptions) {
        let toggled = options.history_enabled != self.options.history_enabled;
        self.history.apply_options(&options);
        self.options = options;
        if toggled {
            self.context.registry.emit(EditorEvent::HistoryChanged);
        }
    }

    /// Switch history recording on or off
    pub fn set_history_enabled(&mut self, enabled: bool) {
        let options = EditorOptions {
            history_enabled: enabled,
            ..self.options.clone()
        };
        self.set_options(options);
    }

    /// Run a command against this document and record it
    ///
    /// Returns the history id of the entry holding the command, which is an
    /// earlier entry when the command was merged, or `0` when history is
    /// disabled.
    pub fn execute(&mut self, command: impl Into<Command>) -> Result<u64, HistoryError> {
        let id = self.history.execute(command.into(), &mut self.context)?;
        self.context.registry.emit(EditorEvent::HistoryChanged);
        Ok(id)
    }

    /// Run a command under a custom history label
    pub fn execute_named(&mut self, command: impl Into<Command>, name: impl Into<String>) -> Result<u64, HistoryError> {
        self.execute(command.into().with_name(name))
    }

    /// Wait for the asset a command depends on, then build and run it
    ///
    /// Nothing in the document changes until the load has settled and the
    /// command has been built.
    pub async fn execute_pending(&mut self, pending: PendingCommand<'_>) -> Result<u64, EditorError> {
        let PendingCommand { load, build } = pending;
        let asset = load.await?;
        let command = build(asset, &self.context)?;
        Ok(self.execute(command)?)
    }

    /// Revert the newest applied entry
    pub fn undo(&mut self) -> Result<&Command, HistoryError> {
        let command = self.history.undo(&mut self.context)?;
        self.context.registry.emit(EditorEvent::HistoryChanged);
        Ok(command)
    }

    /// Re-apply the oldest undone entry
    pub fn redo(&mut self) -> Result<&Command, HistoryError> {
        let command = self.history.redo(&mut self.context)?;
        self.context.registry.emit(EditorEvent::HistoryChanged);
        Ok(command)
    }

    /// Undo or redo until entry `id` is the newest applied one
    pub fn go_to(&mut self, id: u64) -> Result<(), HistoryError> {
        self.history.go_to(id, &mut self.context)?;
        self.context.registry.emit(EditorEvent::HistoryChanged);
        Ok(())
    }

    /// Look up any entity, `None` when absent
    pub fn object_by_uuid(&self, id: &EntityId) -> Option<EntityRef<'_>> {
        self.context.registry().get(id)
    }

    /// Look up any entity, failing when absent
    pub fn resolve(&self, id: &EntityId) -> Result<EntityRef<'_>, RegistryError> {
        self.context.registry().resolve(id)
    }

    /// Discard the document and its history, starting over with an empty scene
    pub fn clear(&mut self) {
        self.context = EditorContext::new();
        self.history.clear();
        self.context.registry.drain_events();
        self.context.registry.emit(EditorEvent::DocumentReplaced);
        tracing::info!("Cleared document");
    }

    /// Take the pending change notifications
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        self.context.registry.drain_events()
    }

    /// Serialize the document, history and options
    pub fn to_json(&self) -> Result<Value, DocumentError> {
        let record = document_to_record(&self.context, &self.options, &self.history)?;
        Ok(Value::Object(record))
    }

    /// Serialize the document as pretty-printed text
    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(&self.to_json()?)?)
    }

    /// Replace the document with one parsed from `text`
    pub fn load_json(&mut self, text: &str) -> Result<LoadReport, DocumentError> {
        let value: Value = serde_json::from_str(text)?;
        self.load_value(&value)
    }

    /// Replace the document with `value`
    ///
    /// On error the current document is left as it was. Otherwise the
    /// returned report lists everything that was skipped.
    pub fn load_value(&mut self, value: &Value) -> Result<LoadReport, DocumentError> {
        let mut warnings = Warnings::new();
        let loaded = read_document(value, &mut warnings)?;

        let mut history = History::with_options(&loaded.options);
        if let Some(record) = &loaded.history {
            history.load_record(record, &mut warnings);
        }

        self.context = loaded.context;
        self.options = loaded.options;
        self.history = history;
        self.context.registry.drain_events();
        self.context.registry.emit(EditorEvent::DocumentReplaced);

        tracing::info!(
            "Loaded document: {} nodes, {} history entries, {} warnings",
            self.registry().node_count(),
            self.history.entries().len(),
            warnings.len()
        );
        Ok(LoadReport {
            warnings: warnings.into_vec(),
        })
    }
}
