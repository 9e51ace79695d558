//! mdnotes Core Library
//!
//! This crate provides the core of mdnotes, a single-user markdown
//! note-taking tool: a persisted note collection, an edit session with
//! debounced auto-save, markdown formatting helpers and an HTML preview.
//!
//! # Architecture
//!
//! - **Storage**: JSON values in a local key-value medium (files, SQLite or
//!   memory). Reads fall back to defaults, writes report failures.
//! - **Note store**: the authoritative note list, written through on every
//!   mutation.
//! - **Edit session**: the draft of the current note, committed after an
//!   idle window or on explicit save.
//!
//! Everything is single-threaded and driven by host events.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut workspace = Workspace::from_config(&config)?;
//!
//! workspace.create_note();
//! let cursor = workspace.apply_format(FormatCommand::Bold, Selection::cursor(0));
//! workspace.tick();
//!
//! let html = workspace.preview();
//! ```
//!
//! # Modules
//!
//! - `workspace`: Event API for a UI (main entry point)
//! - `store`: Note collection with write-through persistence
//! - `session`: Draft and debounced auto-save
//! - `insert`: Markdown formatting of a text selection
//! - `render`: Markdown to HTML preview
//! - `models`: Note data structures
//! - `storage`: Key-value backends and the JSON adapter
//! - `config`: Application configuration
//! - `logging`: Subscriber setup

pub mod config;
pub mod insert;
pub mod logging;
pub mod models;
pub mod render;
pub mod session;
pub mod storage;
pub mod store;
pub mod workspace;

pub use config::{BackendKind, Config};
pub use insert::{prefix_line, wrap_selection, Edit, FormatCommand, Selection};
pub use models::{Note, NoteId};
pub use render::{MarkdownRenderer, MarkupRenderer, RenderError, RenderOptions};
pub use session::{EditSession, SaveState, SwitchPolicy};
pub use storage::{DynStorage, KvBackend, Storage, StorageError};
pub use store::NoteStore;
pub use workspace::{Notice, Stats, Workspace};
