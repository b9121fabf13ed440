use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use webassembler::{walk_dir, HtmlFormatter, MarkdownOptions, MarkdownRenderer, TemplateBinder};
use webassembler_config::{Config, LoadOptions};
use webassembler_site::{BuildReport, SiteBuilder};

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut options = LoadOptions::default();
    if let Some(path) = cli.config {
        options = options.with_override_path(path);
    }
    let config = Config::load(options)?;
    tracing::debug!(
        working_dir = %config.sources.working_directory.display(),
        layers = config.sources.layers.len(),
        "configuration loaded"
    );

    match cli.command {
        Command::Build(args) => handle_build(config, args),
        Command::Render(args) => handle_render(&config, args),
        Command::Bind(args) => handle_bind(&config, args),
        Command::Walk(args) => handle_walk(args),
    }
}

/// `--verbose` enables INFO, otherwise RUST_LOG decides with WARN as the
/// fallback. Logs go to stderr so page output on stdout stays clean.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn handle_build(mut config: Config, args: BuildArgs) -> Result<i32> {
    let BuildArgs {
        source,
        output,
        template,
        parallel,
        json,
    } = args;

    if let Some(source) = source {
        config.site.source = source;
    }
    if let Some(output) = output {
        config.site.output = output;
    }
    if let Some(template) = template {
        config.site.template = template;
    }
    if parallel {
        config.build.parallel = true;
    }

    let report = SiteBuilder::from_config(&config)?.build()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        emit(&describe_report(&report))?;
    }
    Ok(0)
}

fn describe_report(report: &BuildReport) -> String {
    let mut lines: Vec<String> = report
        .pages
        .iter()
        .map(|page| format!("{} -> {}", page.source.display(), page.output.display()))
        .collect();
    lines.push(format!(
        "built {} page(s), skipped {} file(s)",
        report.pages.len(),
        report.skipped.len()
    ));
    lines.join("\n")
}

fn handle_render(config: &Config, args: RenderArgs) -> Result<i32> {
    let renderer = MarkdownRenderer::new(MarkdownOptions {
        gfm: config.markdown.gfm,
        heading_ids: config.markdown.heading_ids,
    });
    let html = renderer.render_file(&args.file)?;
    emit(&html)?;
    Ok(0)
}

fn handle_bind(config: &Config, args: BindArgs) -> Result<i32> {
    let BindArgs {
        template,
        substitutions,
        raw,
    } = args;

    let values = substitutions
        .iter()
        .map(|path| read_lossy(path))
        .collect::<Result<Vec<_>>>()?;

    let binder = if raw || !config.format.enabled {
        TemplateBinder::raw()
    } else {
        TemplateBinder::new(Some(HtmlFormatter::with_indent(usize::from(
            config.format.indent,
        ))))
    };

    let html = binder.bind_file(&template, &values)?;
    emit(&html)?;
    Ok(0)
}

fn handle_walk(args: WalkArgs) -> Result<i32> {
    walk_dir(&args.dir, |path, _elements| {
        println!("{}", path.display());
    })?;
    Ok(0)
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read substitution {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn emit(content: &str) -> Result<()> {
    print!("{}", content);
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Minimal static-site generator",
    propagate_version = true
)]
struct Cli {
    /// Use this config file on top of the discovered ones
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Log progress at INFO level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render every page of the site into the template
    Build(BuildArgs),
    /// Print the HTML for one Markdown file
    Render(RenderArgs),
    /// Substitute file contents into a template
    Bind(BindArgs),
    /// List every file below a directory
    Walk(WalkArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Directory holding the Markdown pages
    #[arg(long, value_name = "DIR")]
    source: Option<PathBuf>,
    /// Directory receiving the generated HTML
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,
    /// Template with a `<%=0%>` marker
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,
    /// Build pages on a worker pool
    #[arg(long)]
    parallel: bool,
    /// Emit the build report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RenderArgs {
    /// Markdown file to convert
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

#[derive(Args)]
struct BindArgs {
    /// Template file
    #[arg(value_name = "TEMPLATE")]
    template: PathBuf,
    /// Files whose contents become substitutions 0, 1, ...
    #[arg(value_name = "SUBSTITUTION_FILE")]
    substitutions: Vec<PathBuf>,
    /// Skip HTML formatting
    #[arg(long)]
    raw: bool,
}

#[derive(Args)]
struct WalkArgs {
    /// Root directory
    #[arg(value_name = "DIR")]
    dir: PathBuf,
}
