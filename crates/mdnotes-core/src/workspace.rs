//! Workspace facade
//!
//! A [`Workspace`] ties together the note store, the edit session and the
//! preview renderer. A UI feeds every event through it, so changing the
//! current note always goes through the session's switch rule, and reads
//! back the draft, the preview and any queued [`Notice`]s.

use std::time::Instant;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::insert::{FormatCommand, Selection};
use crate::models::{Note, NoteId};
use crate::render::{MarkdownRenderer, MarkupRenderer};
use crate::session::{EditSession, SaveState};
use crate::storage::{KvBackend, Storage};
use crate::store::NoteStore;

/// A short, non-blocking message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Warning(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Info(m) | Notice::Warning(m) => m,
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Notice::Warning(_))
    }
}

/// Word and character counts of a text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub words: usize,
    pub chars: usize,
}

impl Stats {
    pub fn of(text: &str) -> Self {
        Self {
            words: text.split_whitespace().count(),
            chars: text.chars().count(),
        }
    }
}

/// Note store, edit session and renderer behind one event API
pub struct Workspace<B> {
    store: NoteStore<B>,
    session: EditSession,
    renderer: Box<dyn MarkupRenderer>,
    notices: Vec<Notice>,
}

impl Workspace<Box<dyn KvBackend>> {
    /// Open the backend named in `config` and hydrate from it
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = config.open_storage()?;
        Ok(Self::open(storage, config))
    }
}

impl<B: KvBackend> Workspace<B> {
    /// Hydrate from `storage` using the session and render settings in `config`
    pub fn open(storage: Storage<B>, config: &Config) -> Self {
        let store = NoteStore::hydrate(storage);
        let session = EditSession::attach(&store, config.debounce(), config.switch_policy);
        info!(
            notes = store.len(),
            seeded = store.was_seeded(),
            "Workspace opened"
        );

        let mut workspace = Self {
            store,
            session,
            renderer: Box::new(MarkdownRenderer::new(config.render)),
            notices: Vec::new(),
        };
        let load_warning = workspace
            .store
            .load_error()
            .map(|e| format!("Could not load saved notes: {}", e));
        if let Some(message) = load_warning {
            workspace.notify(Notice::Warning(message));
        }
        workspace.collect_write_errors();
        workspace
    }

    /// Replace the preview renderer
    pub fn with_renderer(mut self, renderer: Box<dyn MarkupRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    // ==================== State ====================

    pub fn store(&self) -> &NoteStore<B> {
        &self.store
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn notes(&self) -> &[Note] {
        self.store.notes()
    }

    pub fn current_note(&self) -> Option<&Note> {
        self.store.current_note()
    }

    /// Text currently in the editor
    pub fn draft(&self) -> &str {
        self.session.draft()
    }

    pub fn save_state(&self) -> SaveState {
        self.session.state()
    }

    /// HTML preview of the draft
    pub fn preview(&self) -> String {
        self.renderer.render_or_placeholder(self.session.draft())
    }

    pub fn stats(&self) -> Stats {
        Stats::of(self.session.draft())
    }

    /// Drain the notices queued since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // ==================== Note list ====================

    /// Create a note and make it current
    pub fn create_note(&mut self) -> Note {
        let note = self.session.switch(&mut self.store, |s| s.create_note());
        self.notify(Notice::Info("New note created".to_string()));
        self.collect_write_errors();
        note
    }

    /// Make `id` current. Returns `false` if it does not exist.
    pub fn select_note(&mut self, id: &NoteId) -> bool {
        if self.store.current_id() == Some(id) {
            return true;
        }
        let found = self.session.switch(&mut self.store, |s| s.select_note(id));
        self.collect_write_errors();
        found
    }

    /// Delete `id`
    ///
    /// Deleting the current note switches to the first remaining note.
    /// Deleting another note leaves the draft alone.
    pub fn delete_note(&mut self, id: &NoteId) -> Option<Note> {
        let removed = if self.store.current_id() == Some(id) {
            self.session.switch(&mut self.store, |s| s.delete_note(id))
        } else {
            self.store.delete_note(id)
        };

        if removed.is_some() {
            self.notify(Notice::Info("Note deleted".to_string()));
        }
        self.collect_write_errors();
        removed
    }

    /// Rename `id`; titles are written immediately
    pub fn rename_note(&mut self, id: &NoteId, title: &str) -> bool {
        let renamed = self.store.rename_note(id, title);
        self.collect_write_errors();
        renamed
    }

    // ==================== Editing ====================

    /// Replace the draft text
    pub fn edit(&mut self, text: impl Into<String>) {
        self.edit_at(text, Instant::now());
    }

    pub fn edit_at(&mut self, text: impl Into<String>, now: Instant) {
        self.session.set_draft_at(&self.store, text, now);
    }

    /// Apply a toolbar command to the draft, returning the new selection
    pub fn apply_format(&mut self, command: FormatCommand, selection: Selection) -> Selection {
        self.apply_format_at(command, selection, Instant::now())
    }

    pub fn apply_format_at(
        &mut self,
        command: FormatCommand,
        selection: Selection,
        now: Instant,
    ) -> Selection {
        let edit = command.apply(self.session.draft(), selection);
        let cursor = edit.selection();
        self.session.set_draft_at(&self.store, edit.text, now);
        cursor
    }

    /// Run the auto-save check; call this from the event loop
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> bool {
        let saved = self.session.tick_at(&mut self.store, now);
        self.collect_write_errors();
        saved
    }

    /// Save the draft now
    pub fn save(&mut self) -> bool {
        if !self.session.save(&mut self.store) {
            return false;
        }
        if !self.collect_write_errors() {
            self.notify(Notice::Info("Note saved".to_string()));
        }
        true
    }

    /// Drop unsaved edits, e.g. when the editor is closed
    pub fn close(&mut self) {
        self.session.close();
    }

    // ==================== Internals ====================

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Turn store write failures into warnings. Returns `true` if any.
    fn collect_write_errors(&mut self) -> bool {
        let errors = self.store.take_write_errors();
        let failed = !errors.is_empty();
        for e in errors {
            warn!(error = %e, "Change was not persisted");
            let mut message = format!("Could not save changes: {}", e);
            if let Some(hint) = e.recovery_suggestion() {
                message.push_str(". ");
                message.push_str(hint);
            }
            self.notify(Notice::Warning(message));
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;
    use crate::models::WELCOME_TITLE;
    use crate::render::{RenderError, ERROR_FRAGMENT};
    use crate::session::SwitchPolicy;
    use crate::storage::MemoryBackend;
    use std::time::Duration;
    use tempfile::TempDir;

    fn open(backend: &MemoryBackend) -> Workspace<MemoryBackend> {
        Workspace::open(Storage::new(backend.clone()), &Config::default())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    struct FailingRenderer;

    impl MarkupRenderer for FailingRenderer {
        fn render(&self, _markdown: &str) -> Result<String, RenderError> {
            Err(RenderError::Panicked("boom".to_string()))
        }
    }

    #[test]
    fn test_open_empty_storage_shows_welcome() {
        let workspace = open(&MemoryBackend::new());

        assert_eq!(workspace.notes().len(), 1);
        assert_eq!(workspace.current_note().unwrap().title, WELCOME_TITLE);
        assert_eq!(workspace.draft(), workspace.current_note().unwrap().content);
        assert!(workspace.preview().contains("<h1"));
    }

    #[test]
    fn test_create_note_notifies_and_switches() {
        let mut workspace = open(&MemoryBackend::new());

        let note = workspace.create_note();

        assert_eq!(workspace.current_note().unwrap().id, note.id);
        assert_eq!(workspace.draft(), "# New Note\n\nStart writing here...");
        assert_eq!(
            workspace.take_notices(),
            vec![Notice::Info("New note created".to_string())]
        );
        assert!(workspace.take_notices().is_empty());
    }

    #[test]
    fn test_bold_button_on_empty_note() {
        let mut workspace = open(&MemoryBackend::new());
        workspace.edit("");

        let selection = workspace.apply_format(FormatCommand::Bold, Selection::cursor(0));

        assert_eq!(workspace.draft(), "**bold text**");
        assert_eq!(selection, Selection::cursor(11));
        assert_eq!(workspace.save_state(), SaveState::Dirty);
    }

    #[test]
    fn test_formatting_is_auto_saved() {
        let backend = MemoryBackend::new();
        let mut workspace = open(&backend);
        let t0 = Instant::now();

        workspace.edit_at("Title", t0);
        workspace.apply_format_at(FormatCommand::Heading1, Selection::cursor(0), t0 + ms(100));
        assert!(workspace.tick_at(t0 + ms(600)));

        let reopened = open(&backend);
        assert_eq!(reopened.current_note().unwrap().content, "# Title");
    }

    #[test]
    fn test_switch_discards_unsaved_draft() {
        let backend = MemoryBackend::new();
        let mut workspace = open(&backend);
        let welcome = workspace.current_note().unwrap().clone();

        workspace.edit("never saved");
        workspace.create_note();
        workspace.select_note(&welcome.id);

        assert_eq!(workspace.draft(), welcome.content);
    }

    #[test]
    fn test_commit_policy_keeps_draft_on_switch() {
        let backend = MemoryBackend::new();
        let config = Config {
            switch_policy: SwitchPolicy::Commit,
            ..Config::default()
        };
        let mut workspace = Workspace::open(Storage::new(backend.clone()), &config);
        let welcome = workspace.current_note().unwrap().id.clone();

        workspace.edit("kept");
        workspace.create_note();
        workspace.select_note(&welcome);

        assert_eq!(workspace.draft(), "kept");
    }

    #[test]
    fn test_save_notifies() {
        let mut workspace = open(&MemoryBackend::new());

        workspace.edit("saved");
        assert!(workspace.save());

        assert_eq!(
            workspace.take_notices(),
            vec![Notice::Info("Note saved".to_string())]
        );
        assert_eq!(workspace.current_note().unwrap().content, "saved");
    }

    #[test]
    fn test_delete_other_note_keeps_draft() {
        let mut workspace = open(&MemoryBackend::new());
        let welcome = workspace.current_note().unwrap().id.clone();
        workspace.create_note();
        workspace.take_notices();

        workspace.edit("in progress");
        assert!(workspace.delete_note(&welcome).is_some());

        assert_eq!(workspace.draft(), "in progress");
        assert_eq!(workspace.save_state(), SaveState::Dirty);
        assert_eq!(
            workspace.take_notices(),
            vec![Notice::Info("Note deleted".to_string())]
        );
    }

    #[test]
    fn test_delete_current_moves_to_first() {
        let mut workspace = open(&MemoryBackend::new());
        let first = workspace.current_note().unwrap().id.clone();
        let second = workspace.create_note();

        workspace.delete_note(&second.id);

        assert_eq!(workspace.current_note().unwrap().id, first);
        assert_eq!(workspace.draft(), workspace.current_note().unwrap().content);
    }

    #[test]
    fn test_delete_last_note_clears_editor() {
        let mut workspace = open(&MemoryBackend::new());
        let only = workspace.current_note().unwrap().id.clone();

        workspace.delete_note(&only);

        assert!(workspace.current_note().is_none());
        assert_eq!(workspace.draft(), "");
        assert!(!workspace.save());
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut workspace = open(&MemoryBackend::new());
        let missing = NoteId::from("missing");

        assert!(!workspace.select_note(&missing));
        assert!(!workspace.rename_note(&missing, "x"));
        assert!(workspace.delete_note(&missing).is_none());
        assert!(workspace.take_notices().is_empty());
    }

    #[test]
    fn test_write_failure_becomes_warning() {
        let backend = MemoryBackend::new();
        let mut workspace = open(&backend);
        backend.set_fail_writes(true);

        workspace.edit("doomed");
        workspace.save();

        let notices = workspace.take_notices();
        assert!(!notices.is_empty());
        assert!(notices.iter().all(Notice::is_warning));
        assert!(notices[0].message().starts_with("Could not save changes"));
        // The in-memory state still reflects the edit
        assert_eq!(workspace.current_note().unwrap().content, "doomed");
    }

    #[test]
    fn test_unreadable_storage_warns_on_open() {
        let backend = MemoryBackend::new();
        open(&backend).create_note();
        let stored = backend.raw(crate::store::NOTES_KEY).unwrap();
        backend.set_fail_reads(true);

        let mut workspace = open(&backend);

        let notices = workspace.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].is_warning());
        assert!(notices[0].message().starts_with("Could not load saved notes"));
        assert_eq!(backend.raw(crate::store::NOTES_KEY).unwrap(), stored);
    }

    #[test]
    fn test_preview_uses_placeholder_on_failure() {
        let workspace = open(&MemoryBackend::new()).with_renderer(Box::new(FailingRenderer));
        assert_eq!(workspace.preview(), ERROR_FRAGMENT);
    }

    #[test]
    fn test_stats() {
        let mut workspace = open(&MemoryBackend::new());
        workspace.edit("  hello   wörld\n");

        assert_eq!(workspace.stats(), Stats { words: 2, chars: 16 });
        assert_eq!(Stats::of(""), Stats::default());
    }

    #[test]
    fn test_from_config_persists_across_restarts() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            backend: BackendKind::File,
            ..Config::default()
        };

        let id = {
            let mut workspace = Workspace::from_config(&config).unwrap();
            let note = workspace.create_note();
            workspace.rename_note(&note.id, "Groceries");
            workspace.edit("- milk");
            workspace.save();
            note.id
        };

        let workspace = Workspace::from_config(&config).unwrap();
        let current = workspace.current_note().unwrap();
        assert_eq!(current.id, id);
        assert_eq!(current.title, "Groceries");
        assert_eq!(workspace.draft(), "- milk");
    }
}
