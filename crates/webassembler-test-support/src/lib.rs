//! Shared test harness utilities for webassembler crates.

use std::fs;
use std::path::{Path, PathBuf};

use webassembler_config::{Config, LoadOptions};

/// Template used by [`sample_site`].
pub const SAMPLE_TEMPLATE: &str =
    "<html><head><title>site</title></head><body><main><%=0%></main></body></html>";

/// Write `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(&path, contents).expect("write fixture");
    path
}

/// Loads configuration as if the tool were started in `working_dir`.
pub fn test_config(working_dir: &Path) -> Config {
    let working_dir = fs::canonicalize(working_dir).expect("canonicalize working dir");
    Config::load(LoadOptions::default().with_working_dir(working_dir)).expect("load config")
}

/// Lay out a small site under `root` using the default directory names:
/// `docs/index.md`, `docs/guide/setup.md` and `template.html`.
pub fn sample_site(root: &Path) {
    write_file(root, "template.html", SAMPLE_TEMPLATE);
    write_file(root, "docs/index.md", "# Welcome\n\nHello from the index.\n");
    write_file(
        root,
        "docs/guide/setup.md",
        "## Setup\n\n- install\n- run\n",
    );
}
