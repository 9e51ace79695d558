//! Markdown preview rendering
//!
//! The preview is produced by a [`MarkupRenderer`]: plain markdown in, an
//! HTML fragment out, no state kept between calls. [`MarkdownRenderer`] is
//! the default implementation on top of pulldown-cmark.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Fragment shown in place of the preview when rendering fails
pub const ERROR_FRAGMENT: &str = "<p>Error rendering markdown</p>";

/// Errors raised while rendering markdown
#[derive(Error, Debug)]
pub enum RenderError {
    /// The markdown parser panicked on this input
    #[error("Markdown renderer failed: {0}")]
    Panicked(String),
}

/// Options recognized by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Render single newlines as `<br />`
    pub breaks: bool,
    /// Enable GitHub-flavored extensions (tables, strikethrough, task lists)
    pub gfm: bool,
    /// Give headings an `id` derived from their text
    pub heading_ids: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            breaks: true,
            gfm: true,
            heading_ids: true,
        }
    }
}

/// Converts markdown text to an HTML fragment
pub trait MarkupRenderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError>;

    /// Render, substituting [`ERROR_FRAGMENT`] on failure
    fn render_or_placeholder(&self, markdown: &str) -> String {
        match self.render(markdown) {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "Error parsing markdown");
                ERROR_FRAGMENT.to_string()
            }
        }
    }
}

/// pulldown-cmark based renderer
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    options: RenderOptions,
}

impl MarkdownRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    fn parser_options(&self) -> Options {
        let mut options = Options::empty();
        if self.options.gfm {
            options.insert(Options::ENABLE_TABLES);
            options.insert(Options::ENABLE_STRIKETHROUGH);
            options.insert(Options::ENABLE_TASKLISTS);
            options.insert(Options::ENABLE_FOOTNOTES);
        }
        options
    }

    fn render_unchecked(&self, markdown: &str) -> String {
        let breaks = self.options.breaks;
        let mut events: Vec<Event> = Parser::new_ext(markdown, self.parser_options())
            .map(|event| match event {
                Event::SoftBreak if breaks => Event::HardBreak,
                other => other,
            })
            .collect();

        if self.options.heading_ids {
            assign_heading_ids(&mut events);
        }

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }
}

impl MarkupRenderer for MarkdownRenderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.render_unchecked(markdown))).map_err(
            |payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                RenderError::Panicked(message)
            },
        )
    }
}

/// Give every heading without an explicit id a unique slug id
fn assign_heading_ids(events: &mut [Event<'_>]) {
    let mut seen: HashMap<String, usize> = HashMap::new();

    for i in 0..events.len() {
        let Event::Start(Tag::Heading { id: None, .. }) = &events[i] else {
            continue;
        };

        let slug = unique_slug(slugify(&heading_text(&events[i + 1..])), &mut seen);
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(CowStr::from(slug));
        }
    }
}

/// Plain text of a heading, read up to its end tag
fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            _ => {}
        }
    }
    text
}

fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !(c.is_ascii_punctuation() && *c != '-' && *c != '_'))
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}

fn unique_slug(slug: String, seen: &mut HashMap<String, usize>) -> String {
    let count = seen.entry(slug.clone()).or_insert(0);
    let result = if *count == 0 {
        slug
    } else {
        format!("{}-{}", slug, count)
    };
    *count += 1;
    result
}
