// SPDX-License-Identifier: MIT OR Apache-2.0
//! `shadow_editor` - inspect and replay saved editor documents.

use clap::{Parser, Subcommand};
use shadow_editor_app::{CommandState, DocumentError, Editor, EditorSettings, HistoryError, LoadReport};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "shadow_editor")]
#[command(about = "Inspect and replay shadow editor documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file whose options override the document's
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print scene counts, history labels and load warnings
    Inspect {
        /// Document to load
        file: PathBuf,
    },

    /// Undo the whole history, redo it and compare the result with the file
    Replay {
        /// Document to load
        file: PathBuf,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Settings(#[from] shadow_editor_app::settings::SettingsError),

    #[error("Replayed document differs from the loaded one")]
    ReplayMismatch,
}

fn load(path: &Path, settings: Option<&Path>) -> Result<(Editor, LoadReport), CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let (mut editor, report) = Editor::from_json(&text)?;
    if let Some(settings) = settings {
        editor.set_options(EditorSettings::load(settings)?.options);
    }
    Ok((editor, report))
}

fn print_report(report: &LoadReport) {
    if report.is_clean() {
        return;
    }
    println!("{} warnings:", report.warnings.len());
    for warning in &report.warnings {
        println!("  {warning}");
    }
}

fn inspect(path: &Path, settings: Option<&Path>) -> Result<(), CliError> {
    let (editor, report) = load(path, settings)?;
    let registry = editor.registry();
    println!("{}", path.display());
    println!("  nodes:      {}", registry.node_count());
    println!("  geometries: {}", registry.geometries().count());
    println!("  materials:  {}", registry.materials().count());
    println!("  textures:   {}", registry.textures().count());
    println!("  animations: {}", registry.animations().len());
    println!("  scripts:    {}", editor.scripts().len());

    let history = editor.history();
    let stats = history.stats();
    println!(
        "history ({} undo, {} redo, limit {}):",
        stats.undo_count, stats.redo_count, stats.max_depth
    );
    for command in history.entries() {
        let marker = match command.state() {
            CommandState::Undone => " ",
            _ => "*",
        };
        println!("  {marker} #{} {} [{}]", command.id(), command.name(), command.type_tag());
    }
    print_report(&report);
    Ok(())
}

fn replay(path: &Path, settings: Option<&Path>) -> Result<(), CliError> {
    let (mut editor, report) = load(path, settings)?;
    print_report(&report);
    if !editor.history().is_enabled() {
        println!("History is disabled, nothing to replay");
        return Ok(());
    }
    let before = editor.to_json()?;
    let applied = editor
        .history()
        .entries()
        .iter()
        .take(editor.history().cursor())
        .last()
        .map_or(0, |command| command.id());
    let last = editor.history().entries().last().map_or(0, |command| command.id());

    editor.go_to(0)?;
    tracing::info!("Undid every entry");
    editor.go_to(last)?;
    tracing::info!("Redid every entry");
    editor.go_to(applied)?;

    if editor.to_json()? != before {
        return Err(CliError::ReplayMismatch);
    }
    println!("Replayed {} entries, document unchanged", editor.history().entries().len());
    Ok(())
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("shadow_editor_app=debug"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = cli.settings.as_deref();
    let result = match &cli.command {
        Commands::Inspect { file } => inspect(file, settings),
        Commands::Replay { file } => replay(file, settings),
    };
    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
