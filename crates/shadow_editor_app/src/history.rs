// SPDX-License-Identifier: MIT OR Apache-2.0
//! Linear undo/redo history of executed commands.
//!
//! Entries before the cursor are applied; entries from the cursor on can be
//! redone until a new command is executed, which discards them. Repeated
//! edits of one field that arrive within the merge window collapse into the
//! newest entry.

use crate::commands::{Command, CommandError, CommandState, EditorContext};
use crate::serialization::{LoadWarning, Record, RecordReader, Warnings};
use crate::settings::EditorOptions;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// History recording is switched off
    #[error("History is disabled")]
    Disabled,

    /// No entry with this id
    #[error("No history entry with id {0}")]
    UnknownState(u64),

    /// The command itself failed
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// History statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    /// Entries that can be undone
    pub undo_count: usize,
    /// Entries that can be redone
    pub redo_count: usize,
    /// Maximum history depth
    pub max_depth: usize,
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct History {
    entries: Vec<Command>,
    cursor: usize,
    next_id: u64,
    max_depth: usize,
    enabled: bool,
    merge_window: Duration,
    last_execute: Option<Instant>,
}

impl History {
    /// Create a history with default options
    pub fn new() -> Self {
        Self::with_options(&EditorOptions::default())
    }

    /// Create a history configured from editor options
    pub fn with_options(options: &EditorOptions) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            next_id: 1,
            max_depth: options.history_limit,
            enabled: options.history_enabled,
            merge_window: Duration::from_millis(options.merge_window_ms),
            last_execute: None,
        }
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::new()
        }
    }

    /// Apply changed options. Switching recording on or off clears the
    /// history.
    pub fn apply_options(&mut self, options: &EditorOptions) {
        self.max_depth = options.history_limit;
        self.merge_window = Duration::from_millis(options.merge_window_ms);
        self.set_enabled(options.history_enabled);
        self.enforce_limit();
    }

    /// Whether executed commands are recorded
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Switch recording on or off. Any change clears the history.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.clear();
            tracing::info!("History {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    /// Time within which repeated edits of one field merge
    pub fn set_merge_window(&mut self, window: Duration) {
        self.merge_window = window;
    }

    /// Execute a command and record it
    ///
    /// Returns the id of the entry that now holds the command, or 0 when
    /// recording is disabled.
    pub fn execute(&mut self, mut command: Command, ctx: &mut EditorContext) -> Result<u64> {
        command.execute(ctx)?;
        if !self.enabled {
            return Ok(0);
        }

        let now = Instant::now();
        let within_window = self
            .last_execute
            .is_some_and(|last| now.duration_since(last) <= self.merge_window);
        self.last_execute = Some(now);

        // a new edit discards the redo branch
        self.entries.truncate(self.cursor);

        if let Some(last) = self.entries.last_mut() {
            if last.can_merge(&command, within_window) {
                last.merge(command);
                tracing::debug!("Merged into history entry {}", last.id());
                return Ok(last.id());
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        command.set_id(id);
        self.entries.push(command);
        self.cursor = self.entries.len();
        self.enforce_limit();
        Ok(id)
    }

    fn enforce_limit(&mut self) {
        if self.entries.len() > self.max_depth {
            let excess = self.entries.len() - self.max_depth;
            self.entries.drain(..excess);
            self.cursor = self.cursor.saturating_sub(excess);
        }
    }

    /// Undo the newest applied entry
    pub fn undo(&mut self, ctx: &mut EditorContext) -> Result<&Command> {
        if !self.enabled {
            return Err(HistoryError::Disabled);
        }
        if self.cursor == 0 {
            tracing::warn!("Nothing to undo");
            return Err(HistoryError::NothingToUndo);
        }
        self.entries[self.cursor - 1].undo(ctx)?;
        self.cursor -= 1;
        self.last_execute = None;
        Ok(&self.entries[self.cursor])
    }

    /// Redo the oldest undone entry
    pub fn redo(&mut self, ctx: &mut EditorContext) -> Result<&Command> {
        if !self.enabled {
            return Err(HistoryError::Disabled);
        }
        if self.cursor == self.entries.len() {
            tracing::warn!("Nothing to redo");
            return Err(HistoryError::NothingToRedo);
        }
        self.entries[self.cursor].execute(ctx)?;
        self.cursor += 1;
        self.last_execute = None;
        Ok(&self.entries[self.cursor - 1])
    }

    /// Undo or redo until entry `id` is the newest applied one; 0 undoes
    /// everything
    pub fn go_to(&mut self, id: u64, ctx: &mut EditorContext) -> Result<()> {
        if !self.enabled {
            return Err(HistoryError::Disabled);
        }
        let target = if id == 0 {
            0
        } else {
            self.entries
                .iter()
                .position(|entry| entry.id() == id)
                .map(|index| index + 1)
                .ok_or(HistoryError::UnknownState(id))?
        };
        while self.cursor > target {
            self.undo(ctx)?;
        }
        while self.cursor < target {
            self.redo(ctx)?;
        }
        Ok(())
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.enabled && self.cursor > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.enabled && self.cursor < self.entries.len()
    }

    /// All entries, oldest first; their state tells applied from undone
    pub fn entries(&self) -> &[Command] {
        &self.entries
    }

    /// Number of applied entries
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.next_id = 1;
        self.last_execute = None;
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.cursor,
            redo_count: self.entries.len() - self.cursor,
            max_depth: self.max_depth,
        }
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(Command::name)
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(Command::name)
    }

    /// Serialize as `{undos, redos}`
    ///
    /// `redos` lists the next entry to redo last.
    pub fn to_record(&self) -> Result<Record> {
        let (applied, undone) = self.entries.split_at(self.cursor);
        let undos = applied
            .iter()
            .map(|c| c.to_record().map(Value::Object))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let redos = undone
            .iter()
            .rev()
            .map(|c| c.to_record().map(Value::Object))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut r = Record::new();
        r.insert("undos".into(), Value::Array(undos));
        r.insert("redos".into(), Value::Array(redos));
        Ok(r)
    }

    /// Replace the history with a saved one
    ///
    /// Commands are not re-executed: saved undos are taken as applied and
    /// saved redos as undone. Entries that cannot be rebuilt are skipped
    /// with a warning.
    pub fn load_record(&mut self, record: &Record, warnings: &mut Warnings) {
        self.clear();
        let undos = load_list(record, "undos", CommandState::Executed, warnings);
        let mut redos = load_list(record, "redos", CommandState::Undone, warnings);
        redos.reverse();

        self.cursor = undos.len();
        self.entries = undos;
        self.entries.extend(redos);
        self.next_id = self.entries.iter().map(Command::id).max().unwrap_or(0) + 1;
        tracing::info!(
            "Loaded history: {} applied, {} undone",
            self.cursor,
            self.entries.len() - self.cursor
        );
    }
}

fn load_list(record: &Record, field: &str, state: CommandState, warnings: &mut Warnings) -> Vec<Command> {
    let values = match RecordReader::new("history", record).array(field) {
        Ok(values) => values,
        Err(error) => {
            warnings.push(LoadWarning::SkippedRecord {
                context: format!("history {field}"),
                error,
            });
            return Vec::new();
        }
    };

    let mut commands = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        let Some(record) = value.as_object() else {
            warnings.push(LoadWarning::SkippedCommand {
                index,
                reason: "expected a command record".to_string(),
            });
            continue;
        };
        match Command::from_record(record) {
            Ok(mut command) => {
                command.set_state(state);
                commands.push(command);
            }
            Err(CommandError::UnknownKind(kind)) => {
                warnings.push(LoadWarning::UnknownCommandKind { index, kind });
            }
            Err(err) => warnings.push(LoadWarning::SkippedCommand {
                index,
                reason: err.to_string(),
            }),
        }
    }
    commands
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
