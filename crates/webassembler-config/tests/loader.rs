use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use webassembler_config::{Config, ConfigError, ConfigSourceKind, LoadOptions, Pattern};

fn write_file(path: impl AsRef<Path>, contents: &str) {
    let mut file = fs::File::create(path).expect("create config");
    file.write_all(contents.as_bytes()).expect("write config");
}

fn canonical(path: impl AsRef<Path>) -> PathBuf {
    fs::canonicalize(path).expect("canonicalize path")
}

fn pattern_strings<'a, I>(patterns: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Pattern>,
{
    patterns
        .into_iter()
        .map(|p| p.original().to_string())
        .collect()
}

#[test]
fn loads_defaults_when_no_files_present() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());

    let config = Config::load(LoadOptions::default().with_working_dir(working_dir.clone()))
        .expect("load defaults");

    assert_eq!(config.site.source, working_dir.join("docs"));
    assert_eq!(config.site.output, working_dir.join("public"));
    assert_eq!(config.site.template, working_dir.join("template.html"));
    assert_eq!(config.site.extensions, vec!["md", "markdown"]);
    assert!(config.site.exclude.is_empty());
    assert!(config.markdown.gfm);
    assert!(config.markdown.heading_ids);
    assert!(config.format.enabled);
    assert_eq!(config.format.indent, 2);
    assert!(!config.build.parallel);

    assert_eq!(config.sources.layers.len(), 1);
    assert_eq!(config.sources.layers[0].kind, ConfigSourceKind::Default);
}

#[test]
fn applies_precedence_and_resolves_paths_per_layer() {
    let temp = TempDir::new().expect("tempdir");
    let git_root = canonical(temp.path());
    fs::create_dir(git_root.join(".git")).expect("create .git");

    write_file(
        git_root.join("webassembler.toml"),
        r#"
        [site]
        template = "layout/page.html"
        exclude = ["**/drafts/**"]

        [format]
        indent = 4
        "#,
    );

    let working_dir = git_root.join("site");
    fs::create_dir(&working_dir).expect("create site dir");
    write_file(
        working_dir.join("webassembler.toml"),
        r#"
        [site]
        source = "content"
        extensions = [".MD"]

        [build]
        parallel = true
        "#,
    );

    let config = Config::load(LoadOptions::default().with_working_dir(&working_dir))
        .expect("load layered config");

    assert_eq!(config.site.template, git_root.join("layout/page.html"));
    assert_eq!(config.site.source, working_dir.join("content"));
    assert_eq!(config.site.output, working_dir.join("public"));
    assert_eq!(config.site.extensions, vec!["md"]);
    assert_eq!(
        pattern_strings(config.site.exclude.iter()),
        vec!["**/drafts/**".to_string()]
    );
    assert_eq!(config.format.indent, 4);
    assert!(config.build.parallel);

    let kinds: Vec<_> = config.sources.layers.iter().map(|l| l.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ConfigSourceKind::Default,
            ConfigSourceKind::GitRoot,
            ConfigSourceKind::Local
        ]
    );
}

#[test]
fn override_file_wins() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());
    write_file(
        working_dir.join("webassembler.toml"),
        "[markdown]\nheading_ids = true\n",
    );
    write_file(
        working_dir.join("ci.toml"),
        "[markdown]\nheading_ids = false\n\n[format]\nenabled = false\n",
    );

    let config = Config::load(
        LoadOptions::default()
            .with_working_dir(&working_dir)
            .with_override_path("ci.toml"),
    )
    .expect("load override");

    assert!(!config.markdown.heading_ids);
    assert!(!config.format.enabled);
    assert_eq!(
        config.sources.layers.last().map(|l| l.kind),
        Some(ConfigSourceKind::Override)
    );
}

#[test]
fn missing_override_is_reported() {
    let temp = TempDir::new().expect("tempdir");
    let err = Config::load(
        LoadOptions::default()
            .with_working_dir(temp.path())
            .with_override_path("missing.toml"),
    )
    .unwrap_err();

    assert!(matches!(err, ConfigError::OverrideNotFound { .. }));
}

#[test]
fn parse_errors_name_the_file() {
    let temp = TempDir::new().expect("tempdir");
    write_file(temp.path().join("webassembler.toml"), "[site\nsource = 1");

    let err = Config::load(LoadOptions::default().with_working_dir(temp.path())).unwrap_err();
    match err {
        ConfigError::Parse { path, .. } => assert!(path.ends_with("webassembler.toml")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_keys_are_rejected() {
    let temp = TempDir::new().expect("tempdir");
    write_file(temp.path().join("webassembler.toml"), "[site]\nsorce = \"x\"\n");

    let err = Config::load(LoadOptions::default().with_working_dir(temp.path())).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn validation_errors_are_collected() {
    let temp = TempDir::new().expect("tempdir");
    write_file(
        temp.path().join("webassembler.toml"),
        r#"
        [site]
        extensions = [""]
        exclude = ["[unclosed"]

        [format]
        indent = 12
        "#,
    );

    let err = Config::load(LoadOptions::default().with_working_dir(temp.path())).unwrap_err();
    let ConfigError::Validation(errors) = err else {
        panic!("expected validation error, got {err}");
    };

    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    assert_eq!(messages.len(), 3, "{messages:?}");
    assert!(messages[0].contains("site.extensions"));
    assert!(messages[1].starts_with("site.exclude: invalid glob pattern '[unclosed'"));
    assert!(messages[2].contains("format.indent must be between 0 and 8 (received 12)"));
    assert!(messages[2].contains("local config at"));
}
