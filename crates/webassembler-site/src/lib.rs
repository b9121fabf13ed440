//! Site build driver: walk the source tree, render each page, bind it into
//! the template and write the result under the output directory.

use std::path::{Path, PathBuf};

use globset::{GlobSet, GlobSetBuilder};
use serde::Serialize;
use thiserror::Error;
use webassembler::{
    list_files, try_walk_dir, HtmlFormatter, MarkdownError, MarkdownOptions, MarkdownRenderer,
    TemplateBinder, TemplateError, WalkError,
};
use webassembler_config::{Config, SiteSettings};
use webassembler_utils::{atomic_write, parallel_try_map, WriteError};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error(transparent)]
    Render(#[from] MarkdownError),

    #[error(transparent)]
    Bind(#[from] TemplateError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("invalid exclude pattern: {0}")]
    Pattern(#[from] globset::Error),
}

/// One page produced by a build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BuiltPage {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// Outcome of [`SiteBuilder::build`].
#[derive(Clone, Debug, Default, Serialize)]
pub struct BuildReport {
    /// Pages written, in walk order.
    pub pages: Vec<BuiltPage>,
    /// Walked files that were not pages or matched an exclude pattern.
    pub skipped: Vec<PathBuf>,
}

/// Builds a site from resolved configuration.
#[derive(Debug, Clone)]
pub struct SiteBuilder {
    site: SiteSettings,
    exclude: GlobSet,
    renderer: MarkdownRenderer,
    binder: TemplateBinder,
    parallel: bool,
}

impl SiteBuilder {
    pub fn from_config(config: &Config) -> Result<Self, BuildError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in config.site.exclude.iter() {
            builder.add(pattern.glob().clone());
        }

        let renderer = MarkdownRenderer::new(MarkdownOptions {
            gfm: config.markdown.gfm,
            heading_ids: config.markdown.heading_ids,
        });
        let binder = if config.format.enabled {
            TemplateBinder::new(Some(HtmlFormatter::with_indent(usize::from(
                config.format.indent,
            ))))
        } else {
            TemplateBinder::raw()
        };

        Ok(SiteBuilder {
            site: config.site.clone(),
            exclude: builder.build()?,
            renderer,
            binder,
            parallel: config.build.parallel,
        })
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn settings(&self) -> &SiteSettings {
        &self.site
    }

    /// Run the build. The first failing page aborts it.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        tracing::info!(
            source = %self.site.source.display(),
            output = %self.site.output.display(),
            parallel = self.parallel,
            "starting site build"
        );

        let report = if self.parallel {
            self.build_parallel()?
        } else {
            self.build_sequential()?
        };

        tracing::info!(
            pages = report.pages.len(),
            skipped = report.skipped.len(),
            "site build finished"
        );
        Ok(report)
    }

    fn build_sequential(&self) -> Result<BuildReport, BuildError> {
        let mut report = BuildReport::default();
        try_walk_dir(&self.site.source, |path, _elements| -> Result<(), BuildError> {
            match self.output_path_for(path) {
                Some(output) => report.pages.push(self.build_page(path, output)?),
                None => report.skipped.push(path.to_path_buf()),
            }
            Ok(())
        })?;
        Ok(report)
    }

    fn build_parallel(&self) -> Result<BuildReport, BuildError> {
        let mut jobs = Vec::new();
        let mut skipped = Vec::new();
        for path in list_files(&self.site.source)? {
            match self.output_path_for(&path) {
                Some(output) => jobs.push((path, output)),
                None => skipped.push(path),
            }
        }

        let pages = parallel_try_map(jobs, |(source, output)| self.build_page(&source, output))?;
        Ok(BuildReport { pages, skipped })
    }

    /// Where the page for `path` is written, or `None` when `path` is not a
    /// page (wrong extension or excluded).
    pub fn output_path_for(&self, path: &Path) -> Option<PathBuf> {
        let relative = self.relative_to_source(path);
        if !self.site.has_page_extension(path) {
            tracing::debug!(path = %path.display(), "skipping non-page file");
            return None;
        }
        if self.exclude.is_match(relative) {
            tracing::debug!(path = %path.display(), "skipping excluded file");
            return None;
        }
        Some(self.site.output.join(relative).with_extension("html"))
    }

    fn relative_to_source<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.site.source)
            .unwrap_or_else(|_| path.file_name().map(Path::new).unwrap_or(path))
    }

    fn build_page(&self, source: &Path, output: PathBuf) -> Result<BuiltPage, BuildError> {
        tracing::info!(path = %source.display(), "building page");

        let body = self.renderer.render_file(source)?;
        let html = self.binder.bind_file(&self.site.template, &[body])?;
        atomic_write(&output, &html)?;

        tracing::debug!(output = %output.display(), "page written");
        Ok(BuiltPage {
            source: source.to_path_buf(),
            output,
        })
    }
}
