// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reversible editor commands.
//!
//! A [`Command`] wraps one [`CommandKind`] together with its history id,
//! label and state. Commands move `Created -> Executed -> Undone ->
//! Executed ...`; calling `execute` or `undo` out of order fails with
//! [`CommandError::InvalidState`].
//!
//! Commands never hold a reference to the editor. They receive the
//! [`EditorContext`] they operate on for every call, and the registry only
//! exposes its mutating methods inside this crate.
//!
//! Saved commands are rebuilt from the fixed table of type tags built by
//! `command_kinds!`; an unknown tag fails with [`CommandError::UnknownKind`].

pub mod asset;
pub mod composite;
pub mod field;
pub mod script;
pub mod structure;

pub use asset::{SetGeometryCommand, SetMaterialCommand, SetMaterialMapCommand};
pub use composite::{MultiCmdsCommand, SetSceneCommand};
pub use field::{
    SetColorCommand, SetGeometryValueCommand, SetMaterialColorCommand, SetMaterialValueCommand,
    SetPositionCommand, SetRotationCommand, SetScaleCommand, SetUuidCommand, SetValueCommand,
};
pub use script::{AddScriptCommand, RemoveScriptCommand, SetScriptValueCommand};
pub use structure::{AddObjectCommand, MoveObjectCommand, RemoveObjectCommand};

use crate::registry::{Registry, RegistryError};
use crate::scene::{EntityId, FieldError};
use crate::scripts::ScriptStore;
use crate::serialization::{Record, RecordError, RecordReader};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Command errors
#[derive(Debug, Error)]
pub enum CommandError {
    /// `execute`/`undo` called out of sequence
    #[error("Cannot {action} {kind} while it is {state}")]
    InvalidState {
        /// Command type tag
        kind: &'static str,
        /// Attempted action
        action: &'static str,
        /// Current state
        state: CommandState,
    },

    /// Saved command with a type tag this editor does not ship
    #[error("Unknown command kind `{0}`")]
    UnknownKind(String),

    /// Attribute the target does not have
    #[error("{target} has no attribute `{attribute}`")]
    UnknownField {
        /// Target type tag
        target: String,
        /// Requested attribute
        attribute: String,
    },

    /// Value that does not fit the attribute
    #[error("Invalid value for `{attribute}`: {reason}")]
    InvalidValue {
        /// Attribute being written
        attribute: String,
        /// Why it was rejected
        reason: String,
    },

    /// Registry lookup or structural failure
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Malformed command record
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Payload could not be encoded or decoded
    #[error("Command payload error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<FieldError> for CommandError {
    fn from(err: FieldError) -> Self {
        match err {
            FieldError::Unknown { target, attribute } => Self::UnknownField { target, attribute },
            FieldError::Invalid { attribute, reason } => Self::InvalidValue { attribute, reason },
        }
    }
}

/// Result type for command operations
pub type Result<T> = std::result::Result<T, CommandError>;

/// Lifecycle state of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    /// Built but never run
    Created,
    /// Applied
    Executed,
    /// Reverted
    Undone,
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Executed => "executed",
            Self::Undone => "undone",
        })
    }
}

/// State a command operates on
#[derive(Debug, Default)]
pub struct EditorContext {
    pub(crate) registry: Registry,
    pub(crate) scripts: ScriptStore,
}

impl EditorContext {
    /// Create a context holding an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(registry: Registry, scripts: ScriptStore) -> Self {
        Self { registry, scripts }
    }

    /// Entity registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Scripts attached to nodes
    pub fn scripts(&self) -> &ScriptStore {
        &self.scripts
    }
}

/// Identity of the field an updatable command writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeKey {
    /// Target entity
    pub object: EntityId,
    /// Attribute (or script and attribute) written
    pub attribute: String,
    /// Merge regardless of the time since the previous edit
    pub ignore_window: bool,
}

impl MergeKey {
    pub(crate) fn new(object: &EntityId, attribute: impl Into<String>) -> Self {
        Self {
            object: object.clone(),
            attribute: attribute.into(),
            ignore_window: false,
        }
    }
}

/// Behaviour shared by every concrete command
///
/// `execute` and `undo` only apply the change; state checks live in
/// [`Command`].
pub trait EditorCommand: Sized {
    /// Type tag written to saved history
    const TYPE: &'static str;

    /// Label shown in history panels
    fn default_name(&self) -> String;

    /// Apply the change
    fn execute(&mut self, ctx: &mut EditorContext) -> Result<()>;

    /// Revert the change
    fn undo(&mut self, ctx: &mut EditorContext) -> Result<()>;

    /// Kind-specific record fields
    fn to_record(&self) -> Result<Record>;

    /// Rebuild from a record written by `to_record`
    fn from_record(record: &Record) -> Result<Self>;

    /// Key for collapsing repeated edits; `None` for commands that never merge
    fn merge_key(&self) -> Option<MergeKey> {
        None
    }

    /// Fold a newer edit of the same field into this one
    fn merge(&mut self, newer: Self) {
        let _ = newer;
    }
}

type DecodeFn = fn(&Record) -> Result<CommandKind>;

fn decode<T: EditorCommand + Into<CommandKind>>(record: &Record) -> Result<CommandKind> {
    T::from_record(record).map(Into::into)
}

macro_rules! command_kinds {
    ($($(#[$meta:meta])* $variant:ident($command:ty)),* $(,)?) => {
        /// Every command the editor ships
        #[derive(Debug, Clone, PartialEq)]
        pub enum CommandKind {
            $($(#[$meta])* $variant($command),)*
        }

        impl CommandKind {
            /// Type tag of the wrapped command
            pub fn type_tag(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => <$command as EditorCommand>::TYPE,)*
                }
            }

            fn default_name(&self) -> String {
                match self {
                    $(Self::$variant(command) => command.default_name(),)*
                }
            }

            fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
                match self {
                    $(Self::$variant(command) => command.execute(ctx),)*
                }
            }

            fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
                match self {
                    $(Self::$variant(command) => command.undo(ctx),)*
                }
            }

            fn payload(&self) -> Result<Record> {
                match self {
                    $(Self::$variant(command) => command.to_record(),)*
                }
            }

            fn merge_key(&self) -> Option<MergeKey> {
                match self {
                    $(Self::$variant(command) => command.merge_key(),)*
                }
            }

            fn merge(&mut self, newer: CommandKind) {
                match (self, newer) {
                    $((Self::$variant(current), Self::$variant(newer)) => current.merge(newer),)*
                    _ => {}
                }
            }
        }

        $(
            impl From<$command> for CommandKind {
                fn from(command: $command) -> Self {
                    Self::$variant(command)
                }
            }

            impl From<$command> for Command {
                fn from(command: $command) -> Self {
                    Command::new(CommandKind::$variant(command))
                }
            }
        )*

        const COMMAND_KINDS: &[(&str, DecodeFn)] = &[
            $((<$command as EditorCommand>::TYPE, decode::<$command>),)*
        ];
    };
}

command_kinds! {
    /// Attach a subtree
    AddObject(AddObjectCommand),
    /// Detach a subtree
    RemoveObject(RemoveObjectCommand),
    /// Re-parent or reorder a node
    MoveObject(MoveObjectCommand),
    /// Change a node's position
    SetPosition(SetPositionCommand),
    /// Change a node's rotation
    SetRotation(SetRotationCommand),
    /// Change a node's scale
    SetScale(SetScaleCommand),
    /// Change a node attribute
    SetValue(SetValueCommand),
    /// Change a node colour
    SetColor(SetColorCommand),
    /// Change a node's identifier
    SetUuid(SetUuidCommand),
    /// Swap a mesh's geometry
    SetGeometry(SetGeometryCommand),
    /// Change a geometry parameter
    SetGeometryValue(SetGeometryValueCommand),
    /// Swap a node's material
    SetMaterial(SetMaterialCommand),
    /// Change a material attribute
    SetMaterialValue(SetMaterialValueCommand),
    /// Change a material colour
    SetMaterialColor(SetMaterialColorCommand),
    /// Fill or clear a material map slot
    SetMaterialMap(SetMaterialMapCommand),
    /// Attach a script
    AddScript(AddScriptCommand),
    /// Detach a script
    RemoveScript(RemoveScriptCommand),
    /// Change a script attribute
    SetScriptValue(SetScriptValueCommand),
    /// Run several commands as one
    MultiCmds(MultiCmdsCommand),
    /// Replace the scene contents
    SetScene(SetSceneCommand),
}

/// Type tags of every shipped command
pub fn command_types() -> impl Iterator<Item = &'static str> {
    COMMAND_KINDS.iter().map(|(tag, _)| *tag)
}

/// A command with its history identity and state
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    id: u64,
    name: String,
    state: CommandState,
    kind: CommandKind,
}

impl Command {
    /// Wrap a command kind, labelled with its default name
    pub fn new(kind: CommandKind) -> Self {
        Self {
            id: 0,
            name: kind.default_name(),
            state: CommandState::Created,
            kind,
        }
    }

    /// Override the label
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// History identifier (0 until recorded)
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lifecycle state
    pub fn state(&self) -> CommandState {
        self.state
    }

    /// Wrapped command
    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// Type tag
    pub fn type_tag(&self) -> &'static str {
        self.kind.type_tag()
    }

    pub(crate) fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    /// Force a state, used when rebuilding saved history. Composite
    /// children follow their parent.
    pub(crate) fn set_state(&mut self, state: CommandState) {
        self.state = state;
        match &mut self.kind {
            CommandKind::MultiCmds(multi) => multi.set_state(state),
            CommandKind::SetScene(scene) => scene.set_state(state),
            _ => {}
        }
    }

    fn invalid_state(&self, action: &'static str) -> CommandError {
        CommandError::InvalidState {
            kind: self.type_tag(),
            action,
            state: self.state,
        }
    }

    /// Apply the command
    pub fn execute(&mut self, ctx: &mut EditorContext) -> Result<()> {
        if self.state == CommandState::Executed {
            return Err(self.invalid_state("execute"));
        }
        self.kind.execute(ctx)?;
        self.state = CommandState::Executed;
        tracing::debug!("Executed {} ({})", self.name, self.type_tag());
        Ok(())
    }

    /// Revert the command
    pub fn undo(&mut self, ctx: &mut EditorContext) -> Result<()> {
        if self.state != CommandState::Executed {
            return Err(self.invalid_state("undo"));
        }
        self.kind.undo(ctx)?;
        self.state = CommandState::Undone;
        tracing::debug!("Undid {} ({})", self.name, self.type_tag());
        Ok(())
    }

    /// Serialize as `{type, id, name, ...payload}`
    pub fn to_record(&self) -> Result<Record> {
        let mut record = Record::new();
        record.insert("type".into(), Value::from(self.type_tag()));
        record.insert("id".into(), Value::from(self.id));
        record.insert("name".into(), Value::from(self.name.clone()));
        record.extend(self.kind.payload()?);
        Ok(record)
    }

    /// Rebuild a saved command in the `Created` state
    pub fn from_record(record: &Record) -> Result<Self> {
        let reader = RecordReader::new("command", record);
        let tag = reader.str("type")?;
        let (_, decode) = COMMAND_KINDS
            .iter()
            .find(|(known, _)| *known == tag)
            .ok_or_else(|| CommandError::UnknownKind(tag.to_string()))?;
        let kind = decode(record)?;
        Ok(Self {
            id: reader.u64_or("id", 0)?,
            name: reader.string_or("name", &kind.default_name())?,
            state: CommandState::Created,
            kind,
        })
    }

    pub(crate) fn can_merge(&self, newer: &Command, within_window: bool) -> bool {
        if self.state != CommandState::Executed
            || newer.state != CommandState::Executed
            || self.type_tag() != newer.type_tag()
        {
            return false;
        }
        match (self.kind.merge_key(), newer.kind.merge_key()) {
            (Some(current), Some(incoming)) => {
                current == incoming && (within_window || current.ignore_window)
            }
            _ => false,
        }
    }

    pub(crate) fn merge(&mut self, newer: Command) {
        self.kind.merge(newer.kind);
    }
}

/// Execute `commands` in order, undoing the applied prefix if one fails
pub(crate) fn execute_all(commands: &mut [Command], ctx: &mut EditorContext) -> Result<()> {
    for i in 0..commands.len() {
        if let Err(err) = commands[i].execute(ctx) {
            for applied in commands[..i].iter_mut().rev() {
                if let Err(rollback) = applied.undo(ctx) {
                    tracing::error!("Rollback of {} failed: {}", applied.name(), rollback);
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

/// Undo `commands` in reverse order, re-applying the undone suffix if one fails
pub(crate) fn undo_all(commands: &mut [Command], ctx: &mut EditorContext) -> Result<()> {
    for i in (0..commands.len()).rev() {
        if let Err(err) = commands[i].undo(ctx) {
            for undone in commands[i + 1..].iter_mut() {
                if let Err(rollback) = undone.execute(ctx) {
                    tracing::error!("Rollback of {} failed: {}", undone.name(), rollback);
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

pub(crate) fn records_of(commands: &[Command]) -> Result<Value> {
    commands
        .iter()
        .map(|command| command.to_record().map(Value::Object))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

pub(crate) fn commands_from(reader: &RecordReader<'_>, field: &str) -> Result<Vec<Command>> {
    reader
        .array(field)?
        .iter()
        .map(|value| {
            let record = value
                .as_object()
                .ok_or_else(|| reader.invalid(field, "expected command records"))?;
            Command::from_record(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::NodeKind;
    use crate::scene::{SceneNode, Subtree};
    use serde_json::json;

    fn context_with_node() -> (EditorContext, EntityId) {
        let mut ctx = EditorContext::new();
        let node = SceneNode::new("Box", NodeKind::Group);
        let id = node.uuid.clone();
        Command::from(AddObjectCommand::new(Subtree::new(node)))
            .execute(&mut ctx)
            .unwrap();
        (ctx, id)
    }

    #[test]
    fn test_state_machine_rejects_out_of_order_calls() {
        let (mut ctx, id) = context_with_node();
        let mut command = Command::from(SetPositionCommand::new(&ctx, &id, [1.0, 0.0, 0.0]).unwrap());

        assert!(matches!(
            command.undo(&mut ctx),
            Err(CommandError::InvalidState { action: "undo", state: CommandState::Created, .. })
        ));
        command.execute(&mut ctx).unwrap();
        assert!(matches!(
            command.execute(&mut ctx),
            Err(CommandError::InvalidState { action: "execute", .. })
        ));
        command.undo(&mut ctx).unwrap();
        assert_eq!(command.state(), CommandState::Undone);
        command.execute(&mut ctx).unwrap();
        assert_eq!(ctx.registry().node(&id).unwrap().transform.position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_record_header_and_rebuild() {
        let (ctx, id) = context_with_node();
        let mut command = Command::from(SetValueCommand::new(&ctx, &id, "name", json!("Crate")).unwrap())
            .with_name("Rename");
        command.set_id(7);

        let record = command.to_record().unwrap();
        assert_eq!(record["type"], "SetValueCommand");
        assert_eq!(record["id"], 7);
        assert_eq!(record["name"], "Rename");

        let rebuilt = Command::from_record(&record).unwrap();
        assert_eq!(rebuilt, command);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let record = json!({ "type": "TeleportCommand", "id": 1 });
        assert!(matches!(
            Command::from_record(record.as_object().unwrap()),
            Err(CommandError::UnknownKind(tag)) if tag == "TeleportCommand"
        ));
    }

    #[test]
    fn test_every_kind_has_a_unique_tag() {
        let tags: Vec<_> = command_types().collect();
        assert_eq!(tags.len(), 20);
        let unique: std::collections::HashSet<_> = tags.iter().collect();
        assert_eq!(unique.len(), tags.len());
        assert!(tags.contains(&"MultiCmdsCommand"));
    }

    #[test]
    fn test_merge_requires_same_field() {
        let (mut ctx, id) = context_with_node();
        let mut first = Command::from(SetPositionCommand::new(&ctx, &id, [1.0, 0.0, 0.0]).unwrap());
        first.execute(&mut ctx).unwrap();
        let mut second = Command::from(SetPositionCommand::new(&ctx, &id, [2.0, 0.0, 0.0]).unwrap());
        second.execute(&mut ctx).unwrap();
        let mut other = Command::from(SetScaleCommand::new(&ctx, &id, [2.0; 3]).unwrap());
        other.execute(&mut ctx).unwrap();

        assert!(first.can_merge(&second, true));
        assert!(!first.can_merge(&second, false));
        assert!(!first.can_merge(&other, true));

        first.merge(second);
        first.undo(&mut ctx).unwrap();
        assert_eq!(ctx.registry().node(&id).unwrap().transform.position, [0.0; 3]);
    }
}
