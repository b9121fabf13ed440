//! Markdown to HTML conversion backed by `pulldown-cmark`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use pulldown_cmark::{html, Event, Options, Parser, Tag};

use crate::error::MarkdownError;

/// Dialect switches for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Enable tables, strikethrough, task lists and footnotes on top of
    /// CommonMark.
    pub gfm: bool,
    /// Give every heading an `id` derived from its text.
    pub heading_ids: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            gfm: true,
            heading_ids: true,
        }
    }
}

/// Stateless renderer; every call re-reads and re-converts its input.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    options: MarkdownOptions,
}

impl MarkdownRenderer {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> MarkdownOptions {
        self.options
    }

    /// Parser options for the configured dialect.
    pub fn parser_options(&self) -> Options {
        if self.options.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_FOOTNOTES
        } else {
            Options::empty()
        }
    }

    /// Convert Markdown text to HTML. Never fails: input the parser cannot
    /// interpret is rendered as text.
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.parser_options());
        let mut output = String::with_capacity(markdown.len() * 3 / 2);

        if !self.options.heading_ids {
            html::push_html(&mut output, parser);
            return output;
        }

        // One writer for the whole document keeps footnote numbering intact.
        let events: Vec<Event<'_>> = parser.collect();
        let anchors = heading_anchors(&events);
        let mut headings = anchors.iter();
        let events = events.into_iter().map(|event| match event {
            Event::Start(Tag::Heading(level, id, classes)) => {
                let anchor = headings.next().and_then(Option::as_deref);
                Event::Start(Tag::Heading(level, anchor.or(id), classes))
            }
            other => other,
        });
        html::push_html(&mut output, events);

        output
    }

    /// Read the file at `path` and convert it. Invalid UTF-8 sequences are
    /// replaced rather than rejected.
    pub fn render_file(&self, path: &Path) -> Result<String, MarkdownError> {
        let bytes = fs::read(path).map_err(|source| MarkdownError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(self.render(&text))
    }
}

/// Convert Markdown text to HTML with the default dialect.
pub fn render_markdown(markdown: &str) -> String {
    MarkdownRenderer::default().render(markdown)
}

/// Read a Markdown file and convert it with the default dialect.
pub fn render_markdown_file(path: impl AsRef<Path>) -> Result<String, MarkdownError> {
    MarkdownRenderer::default().render_file(path.as_ref())
}

/// Convert heading text into an anchor identifier.
pub fn generate_anchor(text: &str) -> String {
    let mut anchor = String::new();
    let mut last_was_dash = false;

    for ch in text.chars().flat_map(|c| c.to_lowercase()) {
        if ch.is_alphanumeric() {
            anchor.push(ch);
            last_was_dash = false;
        } else if (ch.is_whitespace() || ch == '-') && !anchor.is_empty() && !last_was_dash {
            anchor.push('-');
            last_was_dash = true;
        }
    }

    if anchor.ends_with('-') {
        anchor.pop();
    }

    anchor
}

/// Anchor for every heading in `events`, in document order. Headings
/// without usable text get `None`.
fn heading_anchors(events: &[Event<'_>]) -> Vec<Option<String>> {
    let mut anchors = AnchorSet::default();
    let mut ids = Vec::new();
    let mut text: Option<String> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading(..)) => text = Some(String::new()),
            Event::End(Tag::Heading(..)) => {
                if let Some(text) = text.take() {
                    ids.push(anchors.unique(generate_anchor(&text)));
                }
            }
            Event::Text(value) | Event::Code(value) => {
                if let Some(text) = text.as_mut() {
                    text.push_str(value);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(text) = text.as_mut() {
                    text.push(' ');
                }
            }
            _ => {}
        }
    }

    ids
}

/// Anchors handed out on one page. Repeats get `-1`, `-2`, ... suffixes.
#[derive(Default)]
struct AnchorSet {
    seen: HashMap<String, usize>,
}

impl AnchorSet {
    fn unique(&mut self, anchor: String) -> Option<String> {
        if anchor.is_empty() {
            return None;
        }
        let count = self.seen.entry(anchor.clone()).or_insert(0);
        let unique = if *count == 0 {
            anchor
        } else {
            format!("{anchor}-{count}")
        };
        *count += 1;
        Some(unique)
    }
}
