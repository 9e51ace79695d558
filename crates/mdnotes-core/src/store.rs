//! Note store
//!
//! The `NoteStore` owns the canonical, ordered list of notes and the
//! pointer to the current note. Every mutation is written through to the
//! storage adapter before the method returns.
//!
//! ## Persisted layout
//!
//! - `notes`: JSON array of `{id, title, content, updatedAt}`
//! - `current-note-id`: JSON string or `null`
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = NoteStore::hydrate(Storage::new(MemoryBackend::new()));
//!
//! let note = store.create_note();
//! store.update_content(&note.id, "# Hello");
//! store.rename_note(&note.id, "Greeting");
//! ```
//!
//! Operations on ids that are not in the store are no-ops.

use tracing::{debug, info, warn};

use crate::models::{default_title, Note, NoteId, NEW_NOTE_CONTENT};
use crate::storage::{KvBackend, Storage, StorageError};

/// Storage key for the note collection
pub const NOTES_KEY: &str = "notes";

/// Storage key for the current note pointer
pub const CURRENT_NOTE_KEY: &str = "current-note-id";

/// Authoritative in-memory note collection with write-through persistence
pub struct NoteStore<B> {
    notes: Vec<Note>,
    current: Option<NoteId>,
    storage: Storage<B>,
    /// Write failures not yet reported to the user
    write_errors: Vec<StorageError>,
    seeded: bool,
    /// Why the stored collection could not be read, if it could not
    load_error: Option<StorageError>,
}

impl<B: KvBackend> NoteStore<B> {
    /// Load the store from `storage`
    ///
    /// Missing or corrupt data is treated as an empty store. An empty store
    /// is seeded with the welcome note, which becomes current. A current
    /// pointer naming a note that does not exist is moved to the first note.
    ///
    /// If the medium cannot be read at all, the welcome note is only kept in
    /// memory: nothing is written until the first mutation, so the stored
    /// collection survives a transient read failure.
    pub fn hydrate(storage: Storage<B>) -> Self {
        let (notes, load_error) = match storage.try_read::<Vec<Note>>(NOTES_KEY) {
            Ok(notes) => (notes.unwrap_or_default(), None),
            Err(e @ StorageError::CorruptValue { .. }) => {
                warn!(error = %e, "Stored notes are corrupt, starting over");
                (Vec::new(), None)
            }
            Err(e) => {
                warn!(error = %e, "Could not read stored notes, not persisting until changed");
                (Vec::new(), Some(e))
            }
        };
        let current: Option<NoteId> = storage.read(CURRENT_NOTE_KEY, None);

        let mut store = Self {
            notes,
            current,
            storage,
            write_errors: Vec::new(),
            seeded: false,
            load_error,
        };
        let writable = store.load_error.is_none();

        if store.notes.is_empty() {
            let welcome = Note::welcome();
            info!(id = %welcome.id, "Empty store, seeding welcome note");
            store.current = Some(welcome.id.clone());
            store.notes.push(welcome);
            store.seeded = true;
            if writable {
                store.persist();
            }
        } else if !store.current.as_ref().is_some_and(|id| store.position(id).is_some()) {
            let repaired = store.notes.first().map(|n| n.id.clone());
            warn!(missing = ?store.current, repaired = ?repaired, "Current note not found, repairing pointer");
            store.current = repaired;
            store.persist_current();
        }

        debug!(
            count = store.notes.len(),
            current = ?store.current,
            backend = %store.storage.backend().describe(),
            "Note store hydrated"
        );
        store
    }

    // ==================== Queries ====================

    /// All notes in insertion order
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Get a note by ID
    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| &n.id == id)
    }

    /// ID of the current note, if any
    pub fn current_id(&self) -> Option<&NoteId> {
        self.current.as_ref()
    }

    /// The current note, if any
    pub fn current_note(&self) -> Option<&Note> {
        self.current.as_ref().and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Whether hydration seeded the welcome note
    pub fn was_seeded(&self) -> bool {
        self.seeded
    }

    /// Read failure that left the store starting empty, if any
    pub fn load_error(&self) -> Option<&StorageError> {
        self.load_error.as_ref()
    }

    /// Get the storage adapter
    pub fn storage(&self) -> &Storage<B> {
        &self.storage
    }

    /// Drain write failures recorded since the last call
    pub fn take_write_errors(&mut self) -> Vec<StorageError> {
        std::mem::take(&mut self.write_errors)
    }

    // ==================== Mutations ====================

    /// Create a note at the end of the collection and make it current
    pub fn create_note(&mut self) -> Note {
        let note = Note::with_id(
            NoteId::generate(),
            default_title(self.notes.len()),
            NEW_NOTE_CONTENT,
        );
        debug!(id = %note.id, title = %note.title, "Creating note");

        self.current = Some(note.id.clone());
        self.notes.push(note.clone());
        self.persist();
        note
    }

    /// Make `id` the current note. Returns `false` if it does not exist.
    pub fn select_note(&mut self, id: &NoteId) -> bool {
        if self.position(id).is_none() {
            debug!(id = %id, "Ignoring select of unknown note");
            return false;
        }
        self.current = Some(id.clone());
        self.persist_current();
        true
    }

    /// Replace the content of `id`. Returns `false` if it does not exist.
    pub fn update_content(&mut self, id: &NoteId, content: &str) -> bool {
        let Some(note) = self.notes.iter_mut().find(|n| &n.id == id) else {
            debug!(id = %id, "Ignoring content update of unknown note");
            return false;
        };
        note.set_content(content);
        self.persist_notes();
        true
    }

    /// Replace the title of `id`. Returns `false` if it does not exist.
    pub fn rename_note(&mut self, id: &NoteId, title: &str) -> bool {
        let Some(note) = self.notes.iter_mut().find(|n| &n.id == id) else {
            debug!(id = %id, "Ignoring rename of unknown note");
            return false;
        };
        note.set_title(title);
        self.persist_notes();
        true
    }

    /// Remove `id` from the store, returning the removed note
    ///
    /// If it was current, the first remaining note becomes current (or none
    /// when the collection is now empty).
    pub fn delete_note(&mut self, id: &NoteId) -> Option<Note> {
        let Some(index) = self.position(id) else {
            debug!(id = %id, "Ignoring delete of unknown note");
            return None;
        };

        let removed = self.notes.remove(index);

        if self.current.as_ref() == Some(id) {
            self.current = self.notes.first().map(|n| n.id.clone());
        }
        debug!(id = %id, current = ?self.current, "Deleted note");

        self.persist();
        Some(removed)
    }

    // ==================== Internals ====================

    fn position(&self, id: &NoteId) -> Option<usize> {
        self.notes.iter().position(|n| &n.id == id)
    }

    fn persist(&mut self) {
        self.persist_notes();
        self.persist_current();
    }

    fn persist_notes(&mut self) {
        if let Err(e) = self.storage.write(NOTES_KEY, &self.notes) {
            self.write_errors.push(e);
        }
    }

    fn persist_current(&mut self) {
        if let Err(e) = self.storage.write(CURRENT_NOTE_KEY, &self.current) {
            self.write_errors.push(e);
        }
    }
}
