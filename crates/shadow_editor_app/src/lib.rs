// SPDX-License-Identifier: MIT OR Apache-2.0
//! Document kernel of the shadow scene editor.
//!
//! The crate keeps one editable 3D scene document and its undo/redo history:
//!
//! - [`registry`] maps opaque identifiers to scene nodes, geometries,
//!   materials, textures and animations
//! - [`serialization`] converts every entity to and from JSON records and
//!   reads whole documents with recoverable warnings
//! - [`commands`] holds the closed set of undoable edits
//! - [`history`] records executed commands with merging and a depth limit
//! - [`editor`] ties them together behind [`Editor`]
//!
//! ```no_run
//! use shadow_editor_app::commands::{AddObjectCommand, SetPositionCommand};
//! use shadow_editor_app::components::NodeKind;
//! use shadow_editor_app::scene::{SceneNode, Subtree};
//! use shadow_editor_app::Editor;
//!
//! let mut editor = Editor::new();
//! let node = SceneNode::new("Box", NodeKind::Group);
//! let id = node.uuid.clone();
//! editor.execute(AddObjectCommand::new(Subtree::new(node)))?;
//! editor.execute(SetPositionCommand::new(editor.context(), &id, [1.0, 2.0, 3.0])?)?;
//! editor.undo()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod assets;
pub mod catalog;
pub mod commands;
pub mod components;
pub mod editor;
pub mod events;
pub mod history;
pub mod registry;
pub mod resources;
pub mod scene;
pub mod scripts;
pub mod serialization;
pub mod settings;

pub use commands::{Command, CommandError, CommandKind, CommandState, EditorContext};
pub use editor::{Editor, EditorError};
pub use events::EditorEvent;
pub use history::{History, HistoryError};
pub use registry::{Entity, EntityRef, Registry, RegistryError};
pub use scene::{EntityId, SceneNode, Subtree};
pub use serialization::document::{DocumentError, LoadReport};
pub use serialization::LoadWarning;
pub use settings::{EditorOptions, EditorSettings};
