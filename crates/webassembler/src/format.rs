//! HTML pretty-printing.
//!
//! Markup is parsed with `tl` and the resulting tree is re-printed. The
//! formatter is tolerant: it never invents or drops tags. Source text the
//! parser leaves out of its tree (stray closing tags, declarations) is kept
//! as text, and elements left open at the end of input are printed without
//! a closing tag. Block elements that only hold inline content stay on one
//! line; anything containing a block child is broken onto one line per
//! child and indented.

use std::ops::Range;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "button", "cite", "code", "data", "del", "dfn", "em",
    "i", "img", "input", "ins", "kbd", "label", "mark", "q", "s", "samp", "small", "span",
    "strong", "sub", "sup", "time", "u", "var", "wbr",
];

/// Elements whose content is emitted exactly as written.
const VERBATIM_ELEMENTS: &[&str] = &["pre", "script", "style", "textarea"];

/// Re-indents HTML markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlFormatter {
    indent: String,
}

impl Default for HtmlFormatter {
    fn default() -> Self {
        Self::with_indent(2)
    }
}

impl HtmlFormatter {
    /// Indent nested blocks by `width` spaces per level.
    pub fn with_indent(width: usize) -> Self {
        Self {
            indent: " ".repeat(width),
        }
    }

    pub fn format(&self, html: &str) -> String {
        let nodes = parse_nodes(html);
        let mut out = String::with_capacity(html.len() + html.len() / 4);
        self.write_nodes(&nodes, 0, &mut out);
        out
    }

    fn write_nodes(&self, nodes: &[Node<'_>], depth: usize, out: &mut String) {
        let mut line = String::new();
        for node in nodes {
            match node {
                Node::Markup(raw) => {
                    self.flush_line(&mut line, depth, out);
                    self.push_line(raw.trim(), depth, out);
                }
                Node::Verbatim(raw) => {
                    self.flush_line(&mut line, depth, out);
                    self.push_line(raw, depth, out);
                }
                Node::Element(element) if !node.is_inline() => {
                    self.flush_line(&mut line, depth, out);
                    self.write_element(element, depth, out);
                }
                _ => node.write_inline(&mut line),
            }
        }
        self.flush_line(&mut line, depth, out);
    }

    fn write_element(&self, element: &Element<'_>, depth: usize, out: &mut String) {
        if element.children.iter().all(Node::is_inline) {
            let mut line = String::from(element.open);
            let mut inner = String::new();
            for child in &element.children {
                child.write_inline(&mut inner);
            }
            line.push_str(inner.trim());
            if let Some(close) = element.close {
                line.push_str(close);
            }
            self.push_line(&line, depth, out);
            return;
        }

        self.push_line(element.open, depth, out);
        self.write_nodes(&element.children, depth + 1, out);
        if let Some(close) = element.close {
            self.push_line(close, depth, out);
        }
    }

    fn flush_line(&self, line: &mut String, depth: usize, out: &mut String) {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            self.push_line(trimmed, depth, out);
        }
        line.clear();
    }

    fn push_line(&self, text: &str, depth: usize, out: &mut String) {
        for _ in 0..depth {
            out.push_str(&self.indent);
        }
        out.push_str(text);
        out.push('\n');
    }
}

/// Pretty-print `html` with two-space indentation.
pub fn format_html(html: &str) -> String {
    HtmlFormatter::default().format(html)
}


#[derive(Debug)]
enum Node<'a> {
    Element(Element<'a>),
    Text(&'a str),
    Markup(&'a str),
    Verbatim(&'a str),
}

#[derive(Debug)]
struct Element<'a> {
    name: String,
    open: &'a str,
    children: Vec<Node<'a>>,
    close: Option<&'a str>,
}

impl Node<'_> {
    fn is_inline(&self) -> bool {
        match self {
            Node::Text(_) => true,
            Node::Markup(_) | Node::Verbatim(_) => false,
            Node::Element(element) => {
                INLINE_ELEMENTS.contains(&element.name.as_str())
                    && element.children.iter().all(Node::is_inline)
            }
        }
    }

    fn write_inline(&self, line: &mut String) {
        match self {
            Node::Text(text) => push_collapsed(line, text),
            Node::Markup(raw) | Node::Verbatim(raw) => line.push_str(raw),
            Node::Element(element) => {
                line.push_str(element.open);
                for child in &element.children {
                    child.write_inline(line);
                }
                if let Some(close) = element.close {
                    line.push_str(close);
                }
            }
        }
    }
}

/// Append `text` with every whitespace run reduced to one space.
fn push_collapsed(line: &mut String, text: &str) {
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !line.is_empty() && !line.ends_with(' ') {
            line.push(' ');
        }
        pending_space = false;
        line.push(ch);
    }
    if pending_space && !line.is_empty() && !line.ends_with(' ') {
        line.push(' ');
    }
}

fn parse_nodes(html: &str) -> Vec<Node<'_>> {
    // Only inputs longer than u32::MAX are rejected.
    let Ok(dom) = tl::parse(html, tl::ParserOptions::default()) else {
        return vec![Node::Text(html)];
    };
    let tree = TreeBuilder {
        source: html,
        parser: dom.parser(),
    };
    let (nodes, _) = tree.collect(dom.children(), 0, Some(html.len()));
    nodes
}

/// Maps `tl` nodes back onto slices of the source so tags are printed
/// exactly as written.
struct TreeBuilder<'a, 'p> {
    source: &'a str,
    parser: &'p tl::Parser<'a>,
}

impl<'a> TreeBuilder<'a, '_> {
    /// Converts `handles` starting at offset `from`. Source text the parser
    /// skipped between them, and up to `to` when given, becomes loose text.
    /// Returns the nodes and the offset where they end.
    fn collect(
        &self,
        handles: &[tl::NodeHandle],
        from: usize,
        to: Option<usize>,
    ) -> (Vec<Node<'a>>, usize) {
        let mut nodes = Vec::with_capacity(handles.len());
        let mut cursor = from;

        for handle in handles {
            let Some(node) = handle.get(self.parser) else {
                continue;
            };
            let Some(span) = self.locate(node) else {
                continue;
            };
            self.push_skipped(cursor..span.start, &mut nodes);
            let end = match node {
                tl::Node::Tag(tag) => self.push_tag(tag, span, &mut nodes),
                tl::Node::Raw(_) => {
                    nodes.push(Node::Text(&self.source[span.clone()]));
                    span.end
                }
                tl::Node::Comment(_) => {
                    nodes.push(Node::Markup(&self.source[span.clone()]));
                    span.end
                }
            };
            cursor = cursor.max(end);
        }

        if let Some(to) = to {
            self.push_skipped(cursor..to, &mut nodes);
            cursor = cursor.max(to);
        }
        (nodes, cursor)
    }

    fn push_tag(
        &self,
        tag: &tl::HTMLTag<'a>,
        span: Range<usize>,
        out: &mut Vec<Node<'a>>,
    ) -> usize {
        let raw = &self.source[span.clone()];
        let tag_name = tag.name().as_utf8_str();
        let name = tag_name.to_ascii_lowercase();
        let children = tag.children();
        let handles = children.top().as_slice();

        let leaf = VOID_ELEMENTS.contains(&name.as_str()) || raw.ends_with("/>");
        if leaf && handles.is_empty() {
            out.push(Node::Element(Element {
                name,
                open: raw,
                children: Vec::new(),
                close: None,
            }));
            return span.end;
        }

        // A matched closing tag extends the raw text to the whole element.
        let Some(close_at) = closing_tag_start(raw, &tag_name).map(|at| span.start + at) else {
            let (children, end) = self.collect(handles, span.end, None);
            self.push_element(name, raw, children, None, out);
            return end;
        };

        if VERBATIM_ELEMENTS.contains(&name.as_str()) {
            out.push(Node::Verbatim(raw));
            return span.end;
        }

        let open_end = handles
            .iter()
            .filter_map(|handle| handle.get(self.parser))
            .find_map(|node| self.locate(node))
            .map_or(close_at, |child| child.start.min(close_at));
        let (children, _) = self.collect(handles, open_end, Some(close_at));
        self.push_element(
            name,
            &self.source[span.start..open_end],
            children,
            Some(&self.source[close_at..span.end]),
            out,
        );
        span.end
    }

    fn push_element(
        &self,
        name: String,
        open: &'a str,
        children: Vec<Node<'a>>,
        close: Option<&'a str>,
        out: &mut Vec<Node<'a>>,
    ) {
        // Processing instructions come back as nameless elements holding the
        // rest of the document.
        if name.is_empty() {
            out.push(Node::Markup(open));
            out.extend(children);
            out.extend(close.map(Node::Text));
            return;
        }
        out.push(Node::Element(Element {
            name,
            open,
            children,
            close,
        }));
    }

    fn push_skipped(&self, range: Range<usize>, out: &mut Vec<Node<'a>>) {
        let Some(text) = self.source.get(range).filter(|text| !text.is_empty()) else {
            return;
        };
        if text.starts_with("<!") && text.ends_with('>') {
            out.push(Node::Markup(text));
        } else {
            out.push(Node::Text(text));
        }
    }

    /// Byte range of `node` within the source.
    fn locate(&self, node: &tl::Node<'a>) -> Option<Range<usize>> {
        let bytes = match node {
            tl::Node::Tag(tag) => tag.raw(),
            tl::Node::Raw(bytes) | tl::Node::Comment(bytes) => bytes,
        };
        let slice = bytes.as_bytes_borrowed().filter(|slice| !slice.is_empty())?;
        let start = (slice.as_ptr() as usize).checked_sub(self.source.as_ptr() as usize)?;
        let range = start..start.checked_add(slice.len())?;
        self.source.get(range.clone()).map(|_| range)
    }
}

/// Offset of the closing tag at the end of an element's raw text.
fn closing_tag_start(raw: &str, name: &str) -> Option<usize> {
    let at = raw.rfind('<').filter(|&at| at > 0)?;
    let rest = raw[at + 1..].trim_start().strip_prefix('/')?;
    let rest = rest.strip_suffix('>').unwrap_or(rest);
    (rest == name).then_some(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nests_blocks_and_keeps_leaf_blocks_on_one_line() {
        assert_eq!(
            format_html("<h1><p>Hello</p></h1>"),
            "<h1>\n  <p>Hello</p>\n</h1>\n"
        );
    }

    #[test]
    fn reindents_document() {
        let input = "<!DOCTYPE html>\n<html><head><title>Site</title>\n<meta charset=\"utf-8\"></head>\n<body>\n<main><h1 id=\"a\">A   <em>b</em></h1>\n<ul><li>one</li><li>two</li></ul></main></body></html>";
        let expected = "\
<!DOCTYPE html>
<html>
  <head>
    <title>Site</title>
    <meta charset=\"utf-8\">
  </head>
  <body>
    <main>
      <h1 id=\"a\">A <em>b</em></h1>
      <ul>
        <li>one</li>
        <li>two</li>
      </ul>
    </main>
  </body>
</html>
";
        assert_eq!(format_html(input), expected);
    }

    #[test]
    fn verbatim_elements_are_untouched() {
        let input = "<div><pre><code>a\n    b</code></pre></div>";
        assert_eq!(
            format_html(input),
            "<div>\n  <pre><code>a\n    b</code></pre>\n</div>\n"
        );
    }

    #[test]
    fn mixed_content_groups_inline_runs() {
        let input = "<div>Intro <a href=\"x\">link</a><p>Para</p>tail</div>";
        assert_eq!(
            format_html(input),
            "<div>\n  Intro <a href=\"x\">link</a>\n  <p>Para</p>\n  tail\n</div>\n"
        );
    }

    #[test]
    fn tolerates_stray_and_unclosed_tags() {
        assert_eq!(format_html("</span><div><p>x"), "</span>\n<div>\n  <p>x\n");
    }

    #[test]
    fn mismatched_closing_tag_is_kept_as_text() {
        assert_eq!(format_html("<div><p>x</div>"), "<div>\n  <p>x\n</div>\n");
    }

    #[test]
    fn closing_tags_match_whole_names() {
        assert_eq!(
            format_html("<div><pre>x</prefix>y</pre><p>z</p></div>"),
            "<div>\n  <pre>x</prefix>y</pre>\n  <p>z</p>\n</div>\n"
        );
    }

    #[test]
    fn many_code_blocks_stay_verbatim() {
        let block = "<pre><code>let x = 1;\n</code></pre>";
        let formatted = format_html(&format!("<main>{}</main>", block.repeat(3000)));
        assert_eq!(formatted.matches("  <pre><code>let x = 1;\n</code></pre>\n").count(), 3000);
        assert!(formatted.starts_with("<main>\n"));
        assert!(formatted.ends_with("</main>\n"));
    }

    #[test]
    fn comments_sit_on_their_own_line() {
        assert_eq!(
            format_html("<div><!-- note --><p>x</p></div>"),
            "<div>\n  <!-- note -->\n  <p>x</p>\n</div>\n"
        );
    }

    #[test]
    fn tag_case_is_preserved() {
        assert_eq!(
            format_html("<DIV><P>x</P></DIV>"),
            "<DIV>\n  <P>x</P>\n</DIV>\n"
        );
    }

    #[test]
    fn quoted_angle_brackets_do_not_end_tags() {
        assert_eq!(
            format_html("<div title=\"a>b\"><p>x</p></div>"),
            "<div title=\"a>b\">\n  <p>x</p>\n</div>\n"
        );
    }

    #[test]
    fn plain_text_and_lone_angle_bracket() {
        assert_eq!(format_html("a < b"), "a < b\n");
        assert_eq!(format_html("   \n "), "");
    }

    #[test]
    fn custom_indent_width() {
        assert_eq!(
            HtmlFormatter::with_indent(4).format("<div><p>x</p></div>"),
            "<div>\n    <p>x</p>\n</div>\n"
        );
    }
}
