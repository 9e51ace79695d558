//! Edit session
//!
//! Holds the draft text of the current note and decides when it is written
//! back to the [`NoteStore`]. Edits arm a debounce deadline; the deadline is
//! re-armed on every further edit and the draft is committed once it passes
//! without another edit. An explicit save commits immediately.
//!
//! Time never advances on its own here: the host event loop calls
//! [`EditSession::tick`] (or `tick_at` with an explicit instant) and can ask
//! [`EditSession::next_deadline`] how long it may sleep.
//!
//! Switching notes drops a pending save for the previous note unless the
//! session is configured with [`SwitchPolicy::Commit`].

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::NoteId;
use crate::storage::KvBackend;
use crate::store::NoteStore;

/// Idle time after the last edit before the draft is committed
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// What happens to uncommitted edits when the current note changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchPolicy {
    /// Drop edits younger than the debounce window
    #[default]
    Discard,
    /// Commit pending edits to the previous note before switching
    Commit,
}

impl std::str::FromStr for SwitchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "discard" => Ok(SwitchPolicy::Discard),
            "commit" => Ok(SwitchPolicy::Commit),
            other => Err(format!("unknown switch policy '{}'", other)),
        }
    }
}

/// Save state of the draft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Draft matches what was last committed, nothing scheduled
    Idle,
    /// Draft differs from the stored content, a commit is scheduled
    Dirty,
    /// Commit in progress
    Saving,
}

/// A scheduled commit, bound to the note it was armed for
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingSave {
    note_id: NoteId,
    due: Instant,
}

/// Draft state for the current note
#[derive(Debug)]
pub struct EditSession {
    note_id: Option<NoteId>,
    draft: String,
    pending: Option<PendingSave>,
    state: SaveState,
    debounce: Duration,
    switch_policy: SwitchPolicy,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE, SwitchPolicy::default())
    }
}

impl EditSession {
    pub fn new(debounce: Duration, switch_policy: SwitchPolicy) -> Self {
        Self {
            note_id: None,
            draft: String::new(),
            pending: None,
            state: SaveState::Idle,
            debounce,
            switch_policy,
        }
    }

    /// Create a session already showing the store's current note
    pub fn attach<B: KvBackend>(
        store: &NoteStore<B>,
        debounce: Duration,
        policy: SwitchPolicy,
    ) -> Self {
        let mut session = Self::new(debounce, policy);
        session.load_current(store);
        session
    }

    // ==================== State ====================

    /// Note the draft belongs to
    pub fn note_id(&self) -> Option<&NoteId> {
        self.note_id.as_ref()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == SaveState::Dirty
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn switch_policy(&self) -> SwitchPolicy {
        self.switch_policy
    }

    /// When the pending commit is due, if one is scheduled
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    // ==================== Events ====================

    /// Replace the draft text
    pub fn set_draft<B: KvBackend>(&mut self, store: &NoteStore<B>, text: impl Into<String>) {
        self.set_draft_at(store, text, Instant::now());
    }

    /// Replace the draft text as of `now`
    ///
    /// If the draft now differs from the stored content the commit deadline
    /// is (re)armed at `now + debounce`; if it matches again, the pending
    /// commit is cancelled.
    pub fn set_draft_at<B: KvBackend>(
        &mut self,
        store: &NoteStore<B>,
        text: impl Into<String>,
        now: Instant,
    ) {
        self.draft = text.into();

        let Some(note_id) = self.note_id.clone() else {
            return;
        };

        match store.get(&note_id) {
            Some(note) if note.content != self.draft => {
                self.pending = Some(PendingSave {
                    note_id,
                    due: now + self.debounce,
                });
                self.state = SaveState::Dirty;
            }
            _ => self.cancel_pending(),
        }
    }

    /// Commit the draft if the pending deadline has passed
    pub fn tick<B: KvBackend>(&mut self, store: &mut NoteStore<B>) -> bool {
        self.tick_at(store, Instant::now())
    }

    /// Commit the draft if the pending deadline has passed as of `now`.
    /// Returns `true` if a commit happened.
    pub fn tick_at<B: KvBackend>(&mut self, store: &mut NoteStore<B>, now: Instant) -> bool {
        match &self.pending {
            Some(pending) if now >= pending.due => {}
            _ => return false,
        }

        let Some(pending) = self.pending.take() else {
            return false;
        };
        // Every change of note goes through `load_current`, which drops the pending save
        debug_assert_eq!(self.note_id.as_ref(), Some(&pending.note_id));

        debug!(note = %pending.note_id, "Auto-saving draft");
        self.commit(store, &pending.note_id);
        true
    }

    /// Commit the draft now, cancelling any pending deadline.
    /// Returns `false` if there is no current note.
    pub fn save<B: KvBackend>(&mut self, store: &mut NoteStore<B>) -> bool {
        let Some(note_id) = self.note_id.clone() else {
            return false;
        };
        self.pending = None;
        self.commit(store, &note_id);
        true
    }

    /// Run a store operation that may change the current note
    ///
    /// Before `op` runs, any pending commit for the previous note is handled
    /// according to the switch policy. Afterwards the draft is reloaded from
    /// the store's (possibly new) current note.
    pub fn switch<B: KvBackend, R>(
        &mut self,
        store: &mut NoteStore<B>,
        op: impl FnOnce(&mut NoteStore<B>) -> R,
    ) -> R {
        self.leave(store);
        let result = op(store);
        self.load_current(store);
        result
    }

    /// Cancel any pending commit without saving (e.g. when the view closes)
    pub fn close(&mut self) {
        if self.pending.is_some() {
            debug!("Session closed with unsaved edits, discarding");
        }
        self.cancel_pending();
    }

    // ==================== Internals ====================

    fn leave<B: KvBackend>(&mut self, store: &mut NoteStore<B>) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        match self.switch_policy {
            SwitchPolicy::Discard => {
                debug!(note = %pending.note_id, "Switching notes, discarding unsaved edits");
                self.state = SaveState::Idle;
            }
            SwitchPolicy::Commit => {
                debug!(note = %pending.note_id, "Switching notes, committing unsaved edits");
                self.commit(store, &pending.note_id);
            }
        }
    }

    fn load_current<B: KvBackend>(&mut self, store: &NoteStore<B>) {
        self.cancel_pending();
        match store.current_note() {
            Some(note) => {
                self.note_id = Some(note.id.clone());
                self.draft = note.content.clone();
            }
            None => {
                self.note_id = None;
                self.draft.clear();
            }
        }
    }

    fn commit<B: KvBackend>(&mut self, store: &mut NoteStore<B>, note_id: &NoteId) {
        self.state = SaveState::Saving;
        if !store.update_content(note_id, &self.draft) {
            debug!(note = %note_id, "Commit target no longer exists");
        }
        self.state = SaveState::Idle;
    }

    fn cancel_pending(&mut self) {
        self.pending = None;
        self.state = SaveState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBackend, Storage};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup(policy: SwitchPolicy) -> (NoteStore<MemoryBackend>, EditSession, MemoryBackend) {
        let backend = MemoryBackend::new();
        let store = NoteStore::hydrate(Storage::new(backend.clone()));
        let session = EditSession::attach(&store, DEFAULT_DEBOUNCE, policy);
        (store, session, backend)
    }

    fn persisted_content(backend: &MemoryBackend, id: &NoteId) -> String {
        let store = NoteStore::hydrate(Storage::new(backend.clone()));
        store.get(id).unwrap().content.clone()
    }

    #[test]
    fn test_attach_loads_current_note() {
        let (store, session, _) = setup(SwitchPolicy::Discard);

        assert_eq!(session.note_id(), store.current_id());
        assert_eq!(session.draft(), store.current_note().unwrap().content);
        assert_eq!(session.state(), SaveState::Idle);
    }

    #[test]
    fn test_edit_arms_deadline() {
        let (store, mut session, _) = setup(SwitchPolicy::Discard);
        let t0 = Instant::now();

        session.set_draft_at(&store, "draft", t0);

        assert_eq!(session.state(), SaveState::Dirty);
        assert_eq!(session.next_deadline(), Some(t0 + ms(500)));
    }

    #[test]
    fn test_commit_after_idle_window() {
        let (mut store, mut session, _) = setup(SwitchPolicy::Discard);
        let id = session.note_id().unwrap().clone();
        let t0 = Instant::now();

        session.set_draft_at(&store, "draft", t0);

        assert!(!session.tick_at(&mut store, t0 + ms(499)));
        assert_ne!(store.get(&id).unwrap().content, "draft");

        assert!(session.tick_at(&mut store, t0 + ms(500)));
        assert_eq!(store.get(&id).unwrap().content, "draft");
        assert_eq!(session.state(), SaveState::Idle);
        assert!(session.next_deadline().is_none());
    }

    #[test]
    fn test_rapid_edits_produce_one_write() {
        let (mut store, mut session, backend) = setup(SwitchPolicy::Discard);
        let id = session.note_id().unwrap().clone();
        let writes = backend.write_count();
        let t0 = Instant::now();

        for (i, text) in ["a", "ab", "abc", "abcd"].iter().enumerate() {
            let at = t0 + ms(100 * i as u64);
            session.set_draft_at(&store, *text, at);
            session.tick_at(&mut store, at);
        }
        assert_eq!(backend.write_count(), writes);

        // Last edit at 300ms, so the commit fires at 800ms
        assert!(!session.tick_at(&mut store, t0 + ms(799)));
        assert!(session.tick_at(&mut store, t0 + ms(800)));

        assert_eq!(backend.write_count(), writes + 1);
        assert_eq!(persisted_content(&backend, &id), "abcd");
    }

    #[test]
    fn test_edit_back_to_stored_content_cancels() {
        let (mut store, mut session, backend) = setup(SwitchPolicy::Discard);
        let original = session.draft().to_string();
        let writes = backend.write_count();
        let t0 = Instant::now();

        session.set_draft_at(&store, "changed", t0);
        session.set_draft_at(&store, original, t0 + ms(100));

        assert_eq!(session.state(), SaveState::Idle);
        assert!(!session.tick_at(&mut store, t0 + ms(1000)));
        assert_eq!(backend.write_count(), writes);
    }

    #[test]
    fn test_explicit_save_commits_immediately() {
        let (mut store, mut session, _) = setup(SwitchPolicy::Discard);
        let id = session.note_id().unwrap().clone();
        let t0 = Instant::now();

        session.set_draft_at(&store, "saved now", t0);
        assert!(session.save(&mut store));

        assert_eq!(store.get(&id).unwrap().content, "saved now");
        assert_eq!(session.state(), SaveState::Idle);
        assert!(!session.tick_at(&mut store, t0 + ms(1000)));
    }

    #[test]
    fn test_save_without_changes_still_writes() {
        let (mut store, mut session, backend) = setup(SwitchPolicy::Discard);
        let writes = backend.write_count();

        assert!(session.save(&mut store));

        assert_eq!(backend.write_count(), writes + 1);
    }

    #[test]
    fn test_save_without_note_is_noop() {
        let (mut store, mut session, _) = setup(SwitchPolicy::Discard);
        let id = session.note_id().unwrap().clone();
        session.switch(&mut store, |s| s.delete_note(&id));

        assert!(session.note_id().is_none());
        assert_eq!(session.draft(), "");

        session.set_draft(&store, "typing into nothing");
        assert_eq!(session.state(), SaveState::Idle);
        assert!(!session.save(&mut store));
    }

    #[test]
    fn test_switch_discards_unsaved_edits() {
        let (mut store, mut session, backend) = setup(SwitchPolicy::Discard);
        let first = session.note_id().unwrap().clone();
        let original = session.draft().to_string();
        let t0 = Instant::now();

        session.set_draft_at(&store, "lost edit", t0);
        let second = session.switch(&mut store, |s| s.create_note());

        assert_eq!(session.note_id(), Some(&second.id));
        assert_eq!(session.draft(), second.content);
        assert!(!session.tick_at(&mut store, t0 + ms(1000)));
        assert_eq!(persisted_content(&backend, &first), original);
    }

    #[test]
    fn test_save_before_switch_keeps_edits() {
        let (mut store, mut session, backend) = setup(SwitchPolicy::Discard);
        let first = session.note_id().unwrap().clone();

        session.set_draft(&store, "kept edit");
        session.save(&mut store);
        session.switch(&mut store, |s| s.create_note());

        assert_eq!(persisted_content(&backend, &first), "kept edit");
    }

    #[test]
    fn test_switch_after_auto_save_keeps_auto_saved_draft() {
        let (mut store, mut session, backend) = setup(SwitchPolicy::Discard);
        let first = session.note_id().unwrap().clone();
        let t0 = Instant::now();

        session.set_draft_at(&store, "auto", t0);
        session.tick_at(&mut store, t0 + ms(500));
        session.set_draft_at(&store, "auto plus more", t0 + ms(600));
        session.switch(&mut store, |s| s.create_note());

        assert_eq!(persisted_content(&backend, &first), "auto");
    }

    #[test]
    fn test_commit_policy_saves_on_switch() {
        let (mut store, mut session, backend) = setup(SwitchPolicy::Commit);
        let first = session.note_id().unwrap().clone();

        session.set_draft(&store, "committed on switch");
        session.switch(&mut store, |s| s.create_note());

        assert_eq!(persisted_content(&backend, &first), "committed on switch");
    }

    #[test]
    fn test_select_reloads_persisted_content() {
        let (mut store, mut session, _) = setup(SwitchPolicy::Discard);
        let first = session.note_id().unwrap().clone();
        session.switch(&mut store, |s| s.create_note());
        session.set_draft(&store, "second draft");

        let found = session.switch(&mut store, |s| s.select_note(&first));

        assert!(found);
        assert_eq!(session.note_id(), Some(&first));
        assert_eq!(session.draft(), store.get(&first).unwrap().content);
    }

    #[test]
    fn test_late_tick_never_writes_other_note() {
        let (mut store, mut session, _) = setup(SwitchPolicy::Discard);
        let first = session.note_id().unwrap().clone();
        let t0 = Instant::now();

        session.set_draft_at(&store, "for first", t0);
        let second = session.switch(&mut store, |s| s.create_note());
        session.tick_at(&mut store, t0 + ms(2000));

        assert_ne!(store.get(&first).unwrap().content, "for first");
        assert_ne!(store.get(&second.id).unwrap().content, "for first");
    }

    #[test]
    fn test_switch_clears_pending_deadline() {
        let (mut store, mut session, _) = setup(SwitchPolicy::Discard);
        let t0 = Instant::now();

        session.set_draft_at(&store, "pending", t0);
        assert!(session.next_deadline().is_some());

        session.switch(&mut store, |s| s.create_note());

        assert!(session.next_deadline().is_none());
        assert_eq!(session.state(), SaveState::Idle);
    }

    #[test]
    fn test_close_cancels_pending() {
        let (mut store, mut session, backend) = setup(SwitchPolicy::Discard);
        let writes = backend.write_count();
        let t0 = Instant::now();

        session.set_draft_at(&store, "unsaved", t0);
        session.close();

        assert!(!session.tick_at(&mut store, t0 + ms(1000)));
        assert_eq!(backend.write_count(), writes);
    }

    #[test]
    fn test_switch_policy_from_str() {
        assert_eq!("discard".parse::<SwitchPolicy>(), Ok(SwitchPolicy::Discard));
        assert_eq!("COMMIT".parse::<SwitchPolicy>(), Ok(SwitchPolicy::Commit));
        assert!("later".parse::<SwitchPolicy>().is_err());
    }
}
