use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use webassembler::{render_markdown_file, MarkdownError};

#[test]
fn plain_paragraphs_round_trip_into_p_tags() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("page.md");
    fs::write(&path, "First paragraph.\n\nSecond paragraph.\n").unwrap();

    let html = render_markdown_file(&path).expect("render");
    assert_eq!(html, "<p>First paragraph.</p>\n<p>Second paragraph.</p>\n");
}

#[test]
fn renders_common_constructs() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("page.md");
    fs::write(
        &path,
        "# Title\n\nSome *emphasis* and a [link](https://example.com).\n\n- one\n- two\n\n~~gone~~\n",
    )
    .unwrap();

    let html = render_markdown_file(&path).expect("render");
    assert!(html.contains("<h1 id=\"title\">Title</h1>"));
    assert!(html.contains("<em>emphasis</em>"));
    assert!(html.contains("<a href=\"https://example.com\">link</a>"));
    assert!(html.contains("<li>one</li>"));
    assert!(html.contains("<del>gone</del>"));
}

#[test]
fn malformed_markdown_still_renders() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("broken.md");
    fs::write(&path, "**unclosed [link](\n```\nno fence end").unwrap();

    assert!(render_markdown_file(&path).is_ok());
}

#[test]
fn missing_file_is_a_read_error() {
    let temp = TempDir::new().expect("tempdir");
    let err = render_markdown_file(temp.path().join("nope.md")).unwrap_err();
    let MarkdownError::Read { path, .. } = err;
    assert!(path.ends_with("nope.md"));
}
