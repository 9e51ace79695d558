//! Data models for mdnotes
//!
//! Defines the note record and its identifier. The serialized shape matches
//! the persisted layout: `{id, title, content, updatedAt}` with `updatedAt`
//! in milliseconds since the Unix epoch.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title of the note seeded into an empty store
pub const WELCOME_TITLE: &str = "Welcome to Markdown Editor";

/// Body of the note seeded into an empty store
pub const WELCOME_CONTENT: &str = r#"# Welcome to Markdown Editor! 🎉

This is a powerful markdown editor with live preview. Start typing to see your markdown rendered in real-time!

## Features

- **Live Preview**: See your markdown rendered as you type
- **Multiple Notes**: Create and manage multiple markdown documents
- **Auto-Save**: Your work is automatically saved to local storage
- **Formatting Toolbar**: Quick access to common markdown formatting

## Quick Start

### Headings
Use `#` for headings. More `#` symbols = smaller heading.

### Text Formatting
- **Bold text** with `**text**`
- *Italic text* with `*text*`
- ~~Strikethrough~~ with `~~text~~`

### Lists
1. Ordered lists use numbers
2. Like this
3. Simple!

- Unordered lists use dashes
- Or asterisks
- Easy peasy

### Links and Images
[Link text](https://example.com)
![Alt text](https://via.placeholder.com/150)

### Code
Inline `code` uses backticks.

```javascript
// Code blocks use triple backticks
function hello() {
  console.log("Hello, World!");
}
```

### Blockquotes
> This is a blockquote
> It can span multiple lines

### Tables
| Column 1 | Column 2 | Column 3 |
|----------|----------|----------|
| Data 1   | Data 2   | Data 3   |
| Data 4   | Data 5   | Data 6   |

---

**Happy writing!** ✨"#;

/// Body given to a freshly created note
pub const NEW_NOTE_CONTENT: &str = "# New Note\n\nStart writing here...";

/// Placeholder title for the note created when `existing` notes are present
pub fn default_title(existing: usize) -> String {
    format!("Note {}", existing + 1)
}

/// Current time at the millisecond precision that survives persistence
pub(crate) fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Opaque note identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A markdown note
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier
    pub id: NoteId,
    /// Display title
    pub title: String,
    /// Markdown source
    pub content: String,
    /// When this note was last changed
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Create a new note with a fresh identifier
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_id(NoteId::generate(), title, content)
    }

    /// Create a note with a specific ID
    pub fn with_id(id: NoteId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
            updated_at: now_millis(),
        }
    }

    /// The fixed note seeded into an empty store
    pub fn welcome() -> Self {
        Self::new(WELCOME_TITLE, WELCOME_CONTENT)
    }

    /// Update the title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    /// Update the content
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.touch();
    }

    /// Bump `updated_at`, never moving it backwards
    fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at);
    }
}
