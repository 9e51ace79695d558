//! Text insertion engine
//!
//! Pure functions that apply markdown formatting to a text buffer and
//! report where the cursor should go afterwards. They never look at any UI
//! widget: the caller passes the text and selection in and applies the
//! returned cursor to whatever input it uses.
//!
//! Offsets are byte offsets into the UTF-8 text. Offsets past the end are
//! clamped, a reversed selection is normalized, and an offset inside a
//! multi-byte character is moved back to the start of that character.

use serde::{Deserialize, Serialize};

/// A selection within a text buffer; `start == end` is a plain cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A collapsed selection at `pos`
    pub fn cursor(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Ordered, clamped to `text` and aligned to character boundaries
    pub fn normalized(&self, text: &str) -> Self {
        let a = floor_char_boundary(text, self.start);
        let b = floor_char_boundary(text, self.end);
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }
}

/// Result of an insertion: the new text and the collapsed cursor position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub text: String,
    pub cursor: usize,
}

impl Edit {
    pub fn selection(&self) -> Selection {
        Selection::cursor(self.cursor)
    }
}

/// Wrap the selection in `before`/`after`.
///
/// With an empty selection, `before + placeholder + after` is inserted at the
/// cursor instead. The cursor ends up right after the wrapped (or
/// placeholder) text, before `after`.
pub fn wrap_selection(
    text: &str,
    selection: Selection,
    before: &str,
    after: &str,
    placeholder: &str,
) -> Edit {
    let Selection { start, end } = selection.normalized(text);
    let selected = &text[start..end];
    let inserted = if selected.is_empty() {
        placeholder
    } else {
        selected
    };

    let mut out =
        String::with_capacity(text.len() + before.len() + inserted.len() + after.len());
    out.push_str(&text[..start]);
    out.push_str(before);
    out.push_str(inserted);
    out.push_str(after);
    out.push_str(&text[end..]);

    Edit {
        text: out,
        cursor: start + before.len() + inserted.len(),
    }
}

/// Insert `prefix` at the start of the line containing the selection start.
///
/// Only that one line is touched, even when the selection spans several.
/// The prefix is always inserted, so applying it twice stacks it.
pub fn prefix_line(text: &str, selection: Selection, prefix: &str) -> Edit {
    let start = selection.normalized(text).start;
    let line_start = line_start(text, start);

    let mut out = String::with_capacity(text.len() + prefix.len());
    out.push_str(&text[..line_start]);
    out.push_str(prefix);
    out.push_str(&text[line_start..]);

    Edit {
        text: out,
        cursor: start + prefix.len(),
    }
}

/// Offset of the first character of the line containing `pos`
fn line_start(text: &str, pos: usize) -> usize {
    let pos = floor_char_boundary(text, pos);
    text[..pos].rfind('\n').map_or(0, |i| i + 1)
}

fn floor_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Toolbar formatting commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatCommand {
    Bold,
    Italic,
    Heading1,
    Heading2,
    Heading3,
    Link,
    Image,
    CodeBlock,
    UnorderedList,
    OrderedList,
    Blockquote,
}

/// How a command changes the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Wrap {
        before: &'static str,
        after: &'static str,
        placeholder: &'static str,
    },
    Prefix(&'static str),
}

impl FormatCommand {
    pub const ALL: [FormatCommand; 11] = [
        FormatCommand::Bold,
        FormatCommand::Italic,
        FormatCommand::Heading1,
        FormatCommand::Heading2,
        FormatCommand::Heading3,
        FormatCommand::Link,
        FormatCommand::Image,
        FormatCommand::CodeBlock,
        FormatCommand::UnorderedList,
        FormatCommand::OrderedList,
        FormatCommand::Blockquote,
    ];

    /// Label shown on the toolbar
    pub fn label(self) -> &'static str {
        match self {
            FormatCommand::Bold => "Bold",
            FormatCommand::Italic => "Italic",
            FormatCommand::Heading1 => "Heading 1",
            FormatCommand::Heading2 => "Heading 2",
            FormatCommand::Heading3 => "Heading 3",
            FormatCommand::Link => "Link",
            FormatCommand::Image => "Image",
            FormatCommand::CodeBlock => "Code Block",
            FormatCommand::UnorderedList => "Unordered List",
            FormatCommand::OrderedList => "Ordered List",
            FormatCommand::Blockquote => "Blockquote",
        }
    }

    pub fn insertion(self) -> Insertion {
        let wrap = |before, after, placeholder| Insertion::Wrap {
            before,
            after,
            placeholder,
        };
        match self {
            FormatCommand::Bold => wrap("**", "**", "bold text"),
            FormatCommand::Italic => wrap("*", "*", "italic text"),
            FormatCommand::Heading1 => Insertion::Prefix("# "),
            FormatCommand::Heading2 => Insertion::Prefix("## "),
            FormatCommand::Heading3 => Insertion::Prefix("### "),
            FormatCommand::Link => wrap("[", "](url)", "link text"),
            FormatCommand::Image => wrap("![", "](url)", "alt text"),
            FormatCommand::CodeBlock => wrap("```\n", "\n```", "code"),
            FormatCommand::UnorderedList => Insertion::Prefix("- "),
            FormatCommand::OrderedList => Insertion::Prefix("1. "),
            FormatCommand::Blockquote => Insertion::Prefix("> "),
        }
    }

    /// Apply this command to `text` at `selection`
    pub fn apply(self, text: &str, selection: Selection) -> Edit {
        match self.insertion() {
            Insertion::Wrap {
                before,
                after,
                placeholder,
            } => wrap_selection(text, selection, before, after, placeholder),
            Insertion::Prefix(prefix) => prefix_line(text, selection, prefix),
        }
    }
}
