mod test_runner;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use article::{Document, ParseError};
use renderer::{HtmlRenderer, RenderConfig};

const SUBCOMMANDS: &[&str] = &["render", "check", "ast", "outline", "test", "help"];

#[derive(Parser)]
#[command(name = "article", version, about = "Front-matter-aware markdown article renderer")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render an article to HTML
    Render(RenderArgs),

    /// Parse articles and report diagnostics
    Check(CheckArgs),

    /// Dump the parsed document
    Ast(AstArgs),

    /// List the headings of an article with their anchors
    Outline(FileArg),

    /// Run .test.md fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Markdown article to render
    file: PathBuf,

    /// Write HTML here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Site configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wrap the body in an <article> with a title header
    #[arg(long)]
    standalone: bool,

    /// Prefix for relative link targets
    #[arg(long)]
    base_url: Option<String>,

    /// Do not emit id attributes on headings
    #[arg(long)]
    no_anchors: bool,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Articles to parse
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(clap::Args)]
struct AstArgs {
    /// Markdown article to parse
    file: PathBuf,

    /// Emit JSON instead of debug output
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct FileArg {
    /// Markdown article to parse
    file: PathBuf,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

/// Source files and terminal settings shared by one invocation.
struct Session {
    files: SimpleFiles<String, String>,
    color: ColorChoice,
}

impl Session {
    fn new(no_color: bool) -> Self {
        Session {
            files: SimpleFiles::new(),
            color: if no_color {
                ColorChoice::Never
            } else {
                ColorChoice::Auto
            },
        }
    }

    /// Read and parse one article, printing diagnostics on failure.
    fn load(&mut self, path: &Path) -> Result<Document> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("cannot read '{}'", path.display()))?;
        let file_id = self.files.add(path.display().to_string(), source.clone());
        match article::Parser::new(source, file_id).parse() {
            Ok(doc) => Ok(doc),
            Err(err) => {
                self.emit(&err);
                Err(anyhow!("'{}' could not be parsed", path.display()))
            }
        }
    }

    fn emit(&self, err: &ParseError) {
        let writer = StandardStream::stderr(self.color);
        let config = term::Config::default();
        let diagnostic = err.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, &self.files, &diagnostic);
    }
}

fn main() {
    let cli = Cli::parse_from(with_default_command(std::env::args().collect()));
    init_logging(cli.verbose, cli.quiet);

    let mut session = Session::new(cli.no_color);
    let code = match cli.command {
        Command::Render(args) => report(do_render(&mut session, args)),
        Command::Check(args) => do_check(&mut session, args),
        Command::Ast(args) => report(do_ast(&mut session, args)),
        Command::Outline(args) => report(do_outline(&mut session, args)),
        Command::Test(args) => {
            if args.list_categories {
                test_runner::list_categories(&args.path);
                0
            } else {
                test_runner::run_tests(&args.path, cli.no_color, &args.category)
            }
        }
    };
    process::exit(code);
}

/// `article post.md` means `article render post.md`.
fn with_default_command(mut args: Vec<String>) -> Vec<String> {
    let first_pos = args
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, a)| !a.starts_with('-'))
        .map(|(pos, a)| (pos, SUBCOMMANDS.contains(&a.as_str())));
    if let Some((pos, false)) = first_pos {
        args.insert(pos, "render".to_string());
    }
    args
}

/// Install the tracing subscriber. `RUST_LOG` wins over the verbosity flags.
fn init_logging(verbose: bool, quiet: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn report(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {:#}", err);
            1
        }
    }
}

fn load_config(args: &RenderArgs) -> Result<RenderConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("cannot read config '{}'", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("invalid config '{}'", path.display()))?
        }
        None => RenderConfig::default(),
    };
    if args.standalone {
        config.standalone = true;
    }
    if let Some(base_url) = &args.base_url {
        config.base_url = Some(base_url.clone());
    }
    if args.no_anchors {
        config.heading_anchors = false;
    }
    Ok(config)
}

fn do_render(session: &mut Session, args: RenderArgs) -> Result<()> {
    let config = load_config(&args)?;
    let doc = session.load(&args.file)?;
    let renderer = HtmlRenderer::new(config);

    match &args.output {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("cannot create '{}'", path.display()))?;
            renderer
                .render_to(&doc, io::BufWriter::new(file))
                .with_context(|| format!("cannot write '{}'", path.display()))?;
            tracing::info!(slug = doc.slug(), output = %path.display(), "rendered article");
        }
        None => renderer
            .render_to(&doc, io::stdout().lock())
            .context("cannot write to stdout")?,
    }
    Ok(())
}

fn do_check(session: &mut Session, args: CheckArgs) -> i32 {
    let mut failed = 0usize;
    for file in &args.files {
        match session.load(file) {
            Ok(doc) => {
                tracing::info!(
                    file = %file.display(),
                    slug = doc.slug(),
                    blocks = doc.blocks().len(),
                    "ok"
                );
            }
            Err(err) => {
                eprintln!("error: {:#}", err);
                failed += 1;
            }
        }
    }
    if failed == 0 {
        eprintln!("ok: {} article(s) parsed successfully", args.files.len());
        0
    } else {
        eprintln!("{} of {} article(s) failed", failed, args.files.len());
        1
    }
}

fn do_ast(session: &mut Session, args: AstArgs) -> Result<()> {
    let doc = session.load(&args.file)?;
    if args.json {
        let json = serde_json::to_string_pretty(&doc).context("cannot serialize document")?;
        println!("{}", json);
    } else {
        println!("{:#?}", doc);
    }
    Ok(())
}

fn do_outline(session: &mut Session, args: FileArg) -> Result<()> {
    let doc = session.load(&args.file)?;
    let mut stdout = io::stdout().lock();
    for entry in doc.outline() {
        let pad = "  ".repeat(entry.level.saturating_sub(1) as usize);
        writeln!(
            stdout,
            "{}{} {} (#{})",
            pad,
            "#".repeat(entry.level as usize),
            entry.text,
            entry.anchor
        )?;
    }
    Ok(())
}
