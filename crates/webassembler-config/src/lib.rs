//! Configuration primitives and loader for webassembler.
//!
//! Settings are resolved from a stack of layers, lowest precedence first:
//! built-in defaults → git root → working directory → override flag.
//! Each layer is a `webassembler.toml`; later layers replace individual keys
//! of earlier ones. Relative paths resolve against the directory of the file
//! that set them, so a shared config at the repository root keeps pointing
//! at the same tree no matter where the tool runs from.

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::Glob;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "webassembler.toml";

const MAX_INDENT: u8 = 8;

/// Complete configuration resolved from defaults and on-disk overrides.
#[derive(Clone, Debug)]
pub struct Config {
    pub site: SiteSettings,
    pub markdown: MarkdownSettings,
    pub format: FormatSettings,
    pub build: BuildSettings,
    pub sources: ConfigSources,
}

/// Where pages come from and where they go.
#[derive(Clone, Debug)]
pub struct SiteSettings {
    pub source: PathBuf,
    pub output: PathBuf,
    pub template: PathBuf,
    /// Lower-cased file extensions (without the dot) that are rendered.
    pub extensions: Vec<String>,
    /// Globs matched against paths relative to `source`.
    pub exclude: PatternList,
}

impl SiteSettings {
    /// Whether `path` carries one of the configured extensions.
    pub fn has_page_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| *allowed == ext))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkdownSettings {
    pub gfm: bool,
    pub heading_ids: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatSettings {
    pub enabled: bool,
    pub indent: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildSettings {
    pub parallel: bool,
}

/// Pattern plus compiled glob.
#[derive(Clone, Debug)]
pub struct Pattern {
    original: String,
    glob: Glob,
}

impl Pattern {
    fn new(source: ConfigSource, value: String) -> Result<Self, ConfigValidationError> {
        match Glob::new(&value) {
            Ok(glob) => Ok(Pattern {
                original: value,
                glob,
            }),
            Err(err) => Err(ConfigValidationError::new(
                Some(source),
                format!("invalid glob pattern '{value}': {err}"),
            )),
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn glob(&self) -> &Glob {
        &self.glob
    }
}

/// Ordered list of glob patterns.
#[derive(Clone, Debug, Default)]
pub struct PatternList {
    patterns: Vec<Pattern>,
}

impl PatternList {
    fn new(patterns: Vec<Pattern>) -> Self {
        PatternList { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }
}

/// Record of the layers that produced a [`Config`].
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
    pub base_dir: PathBuf,
}

impl ConfigSource {
    fn default(base_dir: PathBuf) -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
            base_dir,
        }
    }

    fn for_file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        ConfigSource {
            kind,
            path: Some(path),
            base_dir,
        }
    }

    fn describe(&self) -> String {
        match (&self.kind, &self.path) {
            (ConfigSourceKind::Default, _) => "built-in defaults".to_owned(),
            (kind, Some(path)) => format!("{} at {}", kind, path.display()),
            (kind, None) => kind.to_string(),
        }
    }
}

/// Kinds of configuration sources, ordered from lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    GitRoot,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "defaults",
            ConfigSourceKind::GitRoot => "git-root config",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        };
        f.write_str(label)
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {}: {source}", .attempted.display())]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {} not found", .path.display())]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("configuration validation failed:\n{0}")]
    Validation(ConfigValidationErrors),
}

impl Config {
    /// Loads configuration using the precedence rules and returns typed settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options
            .override_path
            .map(|path| make_absolute(&path, &working_dir));

        if let Some(path) = &override_path {
            if !path.exists() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let default_source = ConfigSource::default(working_dir.clone());
        let mut merged = defaults_layer(default_source.clone());
        let mut source_layers = vec![default_source];

        let git_config_path = find_git_root(&working_dir).map(|root| root.join(CONFIG_FILE_NAME));
        let local_config_path = working_dir.join(CONFIG_FILE_NAME);

        if let Some(path) = git_config_path.as_ref() {
            if path.exists() && Some(path) != override_path.as_ref() && path != &local_config_path {
                let source = ConfigSource::for_file(ConfigSourceKind::GitRoot, path.clone());
                merged.merge(load_layer(path, source.clone())?);
                source_layers.push(source);
            }
        }

        if local_config_path.exists() && Some(&local_config_path) != override_path.as_ref() {
            let source = ConfigSource::for_file(ConfigSourceKind::Local, local_config_path.clone());
            merged.merge(load_layer(&local_config_path, source.clone())?);
            source_layers.push(source);
        }

        if let Some(path) = override_path {
            let source = ConfigSource::for_file(ConfigSourceKind::Override, path.clone());
            merged.merge(load_layer(&path, source.clone())?);
            source_layers.push(source);
        }

        let resolved = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(Config {
            site: resolved.site,
            markdown: resolved.markdown,
            format: resolved.format,
            build: resolved.build,
            sources: ConfigSources {
                working_directory: working_dir,
                layers: source_layers,
            },
        })
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn load_layer(path: &Path, source: ConfigSource) -> Result<PartialConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|err| ConfigError::Io {
        path: path.into(),
        source: err,
    })?;
    let raw: RawConfig = toml::from_str(&contents).map_err(|err| ConfigError::Parse {
        path: path.into(),
        source: err,
    })?;
    Ok(raw.into_partial(source))
}

fn defaults_layer(source: ConfigSource) -> PartialConfig {
    let site = SitePartial {
        source: Some(Located::new(PathBuf::from("docs"), source.clone())),
        output: Some(Located::new(PathBuf::from("public"), source.clone())),
        template: Some(Located::new(PathBuf::from("template.html"), source.clone())),
        extensions: Some(Located::new(
            vec!["md".into(), "markdown".into()],
            source.clone(),
        )),
        exclude: Some(Located::new(Vec::new(), source.clone())),
    };

    PartialConfig {
        site,
        markdown: MarkdownPartial {
            gfm: Some(true),
            heading_ids: Some(true),
        },
        format: FormatPartial {
            enabled: Some(true),
            indent: Some(Located::new(2, source)),
        },
        build: BuildPartial {
            parallel: Some(false),
        },
    }
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

#[derive(Clone, Debug, Default)]
struct PartialConfig {
    site: SitePartial,
    markdown: MarkdownPartial,
    format: FormatPartial,
    build: BuildPartial,
}

impl PartialConfig {
    fn merge(&mut self, other: PartialConfig) {
        self.site.merge(other.site);
        self.markdown.merge(other.markdown);
        self.format.merge(other.format);
        self.build.merge(other.build);
    }

    fn finalize(self) -> Result<ResolvedConfig, ConfigValidationErrors> {
        let mut errors = Vec::new();
        let fallback = || ConfigSource::default(PathBuf::from("."));

        let site = self.site;
        let source = resolve_path(
            &site
                .source
                .unwrap_or_else(|| Located::new(PathBuf::from("docs"), fallback())),
        );
        let output = resolve_path(
            &site
                .output
                .unwrap_or_else(|| Located::new(PathBuf::from("public"), fallback())),
        );
        let template = resolve_path(
            &site
                .template
                .unwrap_or_else(|| Located::new(PathBuf::from("template.html"), fallback())),
        );

        let extensions_loc = site
            .extensions
            .unwrap_or_else(|| Located::new(vec!["md".into()], fallback()));
        let extensions: Vec<String> = extensions_loc
            .value
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        if extensions.is_empty() {
            errors.push(ConfigValidationError::new(
                Some(extensions_loc.source.clone()),
                "site.extensions must name at least one extension".into(),
            ));
        }

        let exclude = compile_patterns(site.exclude.unwrap_or_default(), "site.exclude", &mut errors);

        let indent = self
            .format
            .indent
            .unwrap_or_else(|| Located::new(2, fallback()));
        if indent.value > MAX_INDENT {
            errors.push(ConfigValidationError::new(
                Some(indent.source.clone()),
                format!(
                    "format.indent must be between 0 and {MAX_INDENT} (received {})",
                    indent.value
                ),
            ));
        }

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }

        Ok(ResolvedConfig {
            site: SiteSettings {
                source,
                output,
                template,
                extensions,
                exclude: PatternList::new(exclude),
            },
            markdown: MarkdownSettings {
                gfm: self.markdown.gfm.unwrap_or(true),
                heading_ids: self.markdown.heading_ids.unwrap_or(true),
            },
            format: FormatSettings {
                enabled: self.format.enabled.unwrap_or(true),
                indent: indent.value,
            },
            build: BuildSettings {
                parallel: self.build.parallel.unwrap_or(false),
            },
        })
    }
}

#[derive(Clone, Debug, Default)]
struct SitePartial {
    source: Option<Located<PathBuf>>,
    output: Option<Located<PathBuf>>,
    template: Option<Located<PathBuf>>,
    extensions: Option<Located<Vec<String>>>,
    exclude: Option<Located<Vec<String>>>,
}

impl SitePartial {
    fn merge(&mut self, other: SitePartial) {
        if other.source.is_some() {
            self.source = other.source;
        }
        if other.output.is_some() {
            self.output = other.output;
        }
        if other.template.is_some() {
            self.template = other.template;
        }
        if other.extensions.is_some() {
            self.extensions = other.extensions;
        }
        if other.exclude.is_some() {
            self.exclude = other.exclude;
        }
    }
}

#[derive(Clone, Debug, Default)]
struct MarkdownPartial {
    gfm: Option<bool>,
    heading_ids: Option<bool>,
}

impl MarkdownPartial {
    fn merge(&mut self, other: MarkdownPartial) {
        if other.gfm.is_some() {
            self.gfm = other.gfm;
        }
        if other.heading_ids.is_some() {
            self.heading_ids = other.heading_ids;
        }
    }
}

#[derive(Clone, Debug, Default)]
struct FormatPartial {
    enabled: Option<bool>,
    indent: Option<Located<u8>>,
}

impl FormatPartial {
    fn merge(&mut self, other: FormatPartial) {
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
        if other.indent.is_some() {
            self.indent = other.indent;
        }
    }
}

#[derive(Clone, Debug, Default)]
struct BuildPartial {
    parallel: Option<bool>,
}

impl BuildPartial {
    fn merge(&mut self, other: BuildPartial) {
        if other.parallel.is_some() {
            self.parallel = other.parallel;
        }
    }
}

#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Located { value, source }
    }
}

impl Default for Located<Vec<String>> {
    fn default() -> Self {
        Located::new(Vec::new(), ConfigSource::default(PathBuf::from(".")))
    }
}

fn resolve_path(located: &Located<PathBuf>) -> PathBuf {
    let path = &located.value;
    if path.is_absolute() {
        path.clone()
    } else {
        located.source.base_dir.join(path)
    }
}

fn compile_patterns(
    located: Located<Vec<String>>,
    context: &str,
    errors: &mut Vec<ConfigValidationError>,
) -> Vec<Pattern> {
    let mut patterns = Vec::new();
    for pattern in located.value {
        match Pattern::new(located.source.clone(), pattern) {
            Ok(compiled) => patterns.push(compiled),
            Err(err) => errors.push(err.with_context(context)),
        }
    }
    patterns
}

#[derive(Clone, Debug)]
struct ResolvedConfig {
    site: SiteSettings,
    markdown: MarkdownSettings,
    format: FormatSettings,
    build: BuildSettings,
}

/// Container for validation failures, formatted as a bullet list.
#[derive(Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "- {err}")?;
        }
        Ok(())
    }
}

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

/// Validation failure with optional provenance.
#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    pub source: Option<ConfigSource>,
    pub message: String,
    pub context: Option<String>,
}

impl ConfigValidationError {
    fn new(source: Option<ConfigSource>, message: String) -> Self {
        ConfigValidationError {
            source,
            message,
            context: None,
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: {}", context, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source.describe())?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    site: Option<RawSite>,
    #[serde(default)]
    markdown: Option<RawMarkdown>,
    #[serde(default)]
    format: Option<RawFormat>,
    #[serde(default)]
    build: Option<RawBuild>,
}

impl RawConfig {
    fn into_partial(self, source: ConfigSource) -> PartialConfig {
        PartialConfig {
            site: self
                .site
                .map(|site| site.into_partial(source.clone()))
                .unwrap_or_default(),
            markdown: self
                .markdown
                .map(|markdown| MarkdownPartial {
                    gfm: markdown.gfm,
                    heading_ids: markdown.heading_ids,
                })
                .unwrap_or_default(),
            format: self
                .format
                .map(|format| FormatPartial {
                    enabled: format.enabled,
                    indent: format.indent.map(|value| Located::new(value, source)),
                })
                .unwrap_or_default(),
            build: self
                .build
                .map(|build| BuildPartial {
                    parallel: build.parallel,
                })
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSite {
    #[serde(default)]
    source: Option<PathBuf>,
    #[serde(default)]
    output: Option<PathBuf>,
    #[serde(default)]
    template: Option<PathBuf>,
    #[serde(default)]
    extensions: Option<Vec<String>>,
    #[serde(default)]
    exclude: Option<Vec<String>>,
}

impl RawSite {
    fn into_partial(self, source: ConfigSource) -> SitePartial {
        SitePartial {
            source: self.source.map(|value| Located::new(value, source.clone())),
            output: self.output.map(|value| Located::new(value, source.clone())),
            template: self
                .template
                .map(|value| Located::new(value, source.clone())),
            extensions: self
                .extensions
                .map(|value| Located::new(value, source.clone())),
            exclude: self.exclude.map(|value| Located::new(value, source)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMarkdown {
    #[serde(default)]
    gfm: Option<bool>,
    #[serde(default)]
    heading_ids: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFormat {
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    indent: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuild {
    #[serde(default)]
    parallel: Option<bool>,
}
