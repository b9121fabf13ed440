//! Minimal static-site building blocks.
//!
//! Three pieces make up a build: [`walk_dir`] enumerates every file under a
//! root, [`render_markdown_file`] turns one Markdown document into HTML, and
//! [`bind_template`] drops that HTML into a template at its `<%=N%>` marker
//! before pretty-printing the page. Persisting the result is left to the
//! caller.

pub mod error;
pub mod format;
pub mod markdown;
pub mod template;
pub mod walk;

pub use error::{Error, MarkdownError, Result, TemplateError, WalkError};
pub use format::{format_html, HtmlFormatter};
pub use markdown::{
    generate_anchor, render_markdown, render_markdown_file, MarkdownOptions, MarkdownRenderer,
};
pub use template::{bind_template, bind_template_str, substitute, TemplateBinder};
pub use walk::{list_files, try_walk_dir, walk_dir, WalkOptions};
