//! # CLI Module
//!
//! Command-line interface for the wallpaper rotator.
//!
//! ## Usage
//! ```bash
//! # Pick a wallpaper once
//! clockwork-orange pick
//!
//! # Desktop and lock screen, as JSON
//! clockwork-orange pick --dual --output json
//!
//! # Rotate every ten minutes until Ctrl-C
//! clockwork-orange cycle --wait 600
//!
//! # Walk a source and delete what you never want to see again
//! clockwork-orange review local
//!
//! # Register the folder a downloader plugin fills
//! clockwork-orange config add-source wallhaven --kind download-dir
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use clockwork_orange::config::{self, AppConfig, SourceConfig, TargetMode};
use clockwork_orange::core::cycle::{CancellationToken, Cycler, WallpaperSink};
use clockwork_orange::core::exclusion::{ExclusionEntry, ExclusionStore};
use clockwork_orange::core::fingerprint::FingerprintCache;
use clockwork_orange::core::review::{Direction, ReviewSession, ReviewState};
use clockwork_orange::core::selection::{SelectionEngine, SelectionResult};
use clockwork_orange::core::source::SourceRegistry;
use clockwork_orange::error::{ConfigError, Result, StoreError};
use clockwork_orange::events::{Event, EventChannel, SourceEvent};
use console::{style, Key, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Clockwork Orange - Fair wallpaper rotation with a permanent blacklist
#[derive(Parser, Debug)]
#[command(name = "clockwork-orange")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: the standard config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pick a wallpaper once and print it
    Pick {
        /// Pick two distinct images (desktop and lock screen)
        #[arg(long)]
        dual: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Keep picking wallpapers on an interval until Ctrl-C
    Cycle {
        /// Seconds between changes (default: from config)
        #[arg(short, long)]
        wait: Option<u64>,

        /// Pick two distinct images per cycle
        #[arg(long)]
        dual: bool,
    },

    /// List configured sources and how many images each offers
    Sources,

    /// Interactively browse a source, deleting and banning images
    Review {
        /// Source id from the config file
        source_id: String,
    },

    /// Inspect or edit the blacklist
    Blacklist {
        #[command(subcommand)]
        action: BlacklistAction,
    },

    /// Create or print the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum BlacklistAction {
    /// Show banned images
    List {
        /// Only entries whose fingerprint, source or name match
        #[arg(short, long)]
        filter: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Ban a file without deleting it
    Add {
        file: PathBuf,

        /// Source id to record with the ban
        #[arg(short, long, default_value = "manual")]
        source: String,
    },

    /// Lift a ban by fingerprint (a unique prefix is enough)
    Remove { fingerprint: String },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a commented default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,

    /// Add a source to the config file
    AddSource {
        /// Unique source id
        id: String,

        /// Image folder or file (optional for download folders)
        path: Option<PathBuf>,

        /// Kind of source
        #[arg(short, long, default_value = "local")]
        kind: SourceKindArg,

        /// Include subfolders
        #[arg(short, long)]
        recursive: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceKindArg {
    /// A folder or single image you manage yourself
    Local,
    /// A folder an external downloader fills
    DownloadDir,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Everything a command needs, loaded from the config file
struct App {
    config: AppConfig,
    store: Arc<ExclusionStore>,
    fingerprints: Arc<FingerprintCache>,
    registry: Arc<SourceRegistry>,
}

impl App {
    fn load(config_path: &Path) -> Result<Self> {
        let config = AppConfig::load(config_path)?;
        let store = Arc::new(ExclusionStore::open(&config.blacklist_path()?)?);
        let fingerprints = Arc::new(FingerprintCache::new());
        let registry =
            SourceRegistry::from_config(&config.sources, store.clone(), fingerprints.clone())?;

        Ok(Self {
            config,
            store,
            fingerprints,
            registry: Arc::new(registry),
        })
    }

    fn engine(&self) -> SelectionEngine {
        SelectionEngine::new(self.registry.adapters().to_vec(), self.fingerprints.clone())
            .with_timeout(self.config.enumeration_timeout())
    }

    fn mode(&self, dual: bool) -> TargetMode {
        if dual {
            TargetMode::Dual
        } else {
            self.config.mode
        }
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    clockwork_orange::init_tracing_with_default(if cli.verbose { "debug" } else { "warn" });

    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };

    match cli.command {
        Commands::Pick { dual, output } => run_pick(&config_path, dual, output),
        Commands::Cycle { wait, dual } => run_cycle(&config_path, wait, dual),
        Commands::Sources => run_sources(&config_path),
        Commands::Review { source_id } => run_review(&config_path, &source_id),
        Commands::Blacklist { action } => run_blacklist(&config_path, action),
        Commands::Config { action } => run_config(&config_path, action),
    }
}

fn run_pick(config_path: &Path, dual: bool, output: OutputFormat) -> Result<()> {
    let app = App::load(config_path)?;
    let mode = app.mode(dual);
    let engine = app.engine();
    let term = Term::stderr();

    if app.registry.is_empty() && matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} No sources are enabled. Run {} to create a config.",
            style("!").yellow().bold(),
            style("clockwork-orange config init").cyan()
        ))?;
    }

    let (sender, receiver) = EventChannel::new();
    let progress = matches!(output, OutputFormat::Pretty).then(|| spinner("Enumerating sources"));
    let progress_clone = progress.clone();

    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(pb) = &progress_clone else { continue };
            match event {
                Event::Source(SourceEvent::Enumerated { source_id, count }) => {
                    pb.println(format!(
                        "  {} {} {}",
                        style("✓").green(),
                        source_id,
                        style(format!("({} images)", count)).dim()
                    ));
                }
                Event::Source(SourceEvent::Unavailable { source_id, message }) => {
                    pb.println(format!(
                        "  {} {} {}",
                        style("✗").red(),
                        source_id,
                        style(message).dim()
                    ));
                }
                _ => {}
            }
        }
    });

    let result = engine.select_with_events(mode, &sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let result = result?;
    match output {
        OutputFormat::Pretty => print_selection(&Term::stdout(), &result, mode)?,
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result).map_err(std::io::Error::from)?);
        }
    }
    Ok(())
}

fn print_selection(term: &Term, result: &SelectionResult, mode: TargetMode) -> Result<()> {
    let first_label = match mode {
        TargetMode::Lockscreen => "Lock screen",
        TargetMode::Desktop | TargetMode::Dual => "Desktop",
    };

    term.write_line(&format!(
        "{} {:<12} {} {}",
        style("→").green().bold(),
        first_label,
        display_path(&result.primary.path),
        style(format!("[{}]", result.primary.source_id)).dim()
    ))?;

    if let Some(secondary) = &result.secondary {
        term.write_line(&format!(
            "{} {:<12} {} {}",
            style("→").green().bold(),
            "Lock screen",
            display_path(&secondary.path),
            style(format!("[{}]", secondary.source_id)).dim()
        ))?;
    }
    Ok(())
}

/// Prints each selection; a desktop integration would set it instead
struct PrintSink {
    term: Term,
    mode: TargetMode,
}

impl WallpaperSink for PrintSink {
    fn apply(&mut self, result: &SelectionResult) -> Result<()> {
        self.term.write_line(&format!(
            "{}",
            style(chrono::Local::now().format("%H:%M:%S")).dim()
        ))?;
        print_selection(&self.term, result, self.mode)
    }
}

fn run_cycle(config_path: &Path, wait: Option<u64>, dual: bool) -> Result<()> {
    let app = App::load(config_path)?;
    let mode = app.mode(dual);
    let wait = Duration::from_secs(wait.unwrap_or(app.config.default_wait));
    let term = Term::stderr();

    let token = CancellationToken::new();
    let handler_token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!(error = %e, "Could not install Ctrl-C handler");
    }

    term.write_line(&format!(
        "{} {}",
        style("Clockwork Orange").bold().cyan(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim()
    ))?;
    term.write_line(&format!(
        "  Changing wallpaper every {}s from {} source(s). Press Ctrl-C to stop.",
        style(wait.as_secs()).cyan(),
        style(app.registry.len()).cyan()
    ))?;
    term.write_line("")?;

    let cycler = Cycler::new(Arc::new(app.engine()), mode, wait);
    let mut sink = PrintSink {
        term: Term::stdout(),
        mode,
    };
    let summary = cycler.run(&mut sink, &token);

    term.write_line("")?;
    term.write_line(&format!(
        "{} Stopped after {} cycle(s): {} applied, {} skipped",
        style("✓").green().bold(),
        summary.cycles,
        style(summary.applied).cyan(),
        style(summary.skipped).yellow()
    ))?;
    Ok(())
}

fn run_sources(config_path: &Path) -> Result<()> {
    let app = App::load(config_path)?;
    let term = Term::stdout();

    if app.config.sources.is_empty() {
        term.write_line(&format!(
            "No sources configured in {}",
            style(display_path(config_path)).cyan()
        ))?;
        return Ok(());
    }

    let progress = spinner("Counting images");
    let mut lines = Vec::with_capacity(app.config.sources.len());
    for source in &app.config.sources {
        progress.set_message(format!("Counting images in {}", source.id));

        let status = match app.registry.get(&source.id) {
            None => style("disabled").dim().to_string(),
            Some(adapter) => match adapter.enumerate() {
                Ok(candidates) => style(format!("{} images", candidates.count()))
                    .green()
                    .to_string(),
                Err(e) => style(e.to_string()).red().to_string(),
            },
        };

        let location = source
            .resolved_path()
            .map(|p| display_path(&p))
            .unwrap_or_else(|e| e.to_string());

        lines.push(format!(
            "  {:<16} {:<13} {}  {}",
            style(&source.id).bold(),
            source.kind.to_string(),
            status,
            style(location).dim()
        ));
    }
    progress.finish_and_clear();

    term.write_line(&format!("{}", style("Sources:").bold().underlined()))?;
    for line in lines {
        term.write_line(&line)?;
    }
    Ok(())
}

fn run_review(config_path: &Path, source_id: &str) -> Result<()> {
    let app = App::load(config_path)?;
    let term = Term::stdout();
    let mut session = ReviewSession::new(
        app.store.clone(),
        app.registry.clone(),
        app.fingerprints.clone(),
    );

    let progress = spinner(format!("Scanning {}", source_id));
    let scanned = session.scan(source_id);
    progress.finish_and_clear();

    if scanned? == ReviewState::Empty {
        term.write_line(&format!(
            "No images to review in {}",
            style(source_id).cyan()
        ))?;
        return Ok(());
    }

    term.write_line(&format!(
        "{}  {} browse  {} skip  {} delete & ban  {} quit",
        style("Review").bold().cyan(),
        style("←/→").bold(),
        style("s").bold(),
        style("d").bold(),
        style("q").bold()
    ))?;
    term.write_line(&format!(
        "{}",
        style("Deleted files cannot be recovered.").dim()
    ))?;
    term.write_line("")?;

    let mut rejected = 0usize;
    loop {
        let Some(candidate) = session.current() else {
            term.write_line(&format!("{} Reached the end of {}", style("✓").green(), source_id))?;
            break;
        };
        let (index, total) = session.position().unwrap_or((0, 0));
        term.write_line(&format!(
            "[{}/{}] {}  {}",
            index + 1,
            total,
            style(candidate.file_name()).bold(),
            style(display_path(&candidate.path)).dim()
        ))?;

        match term.read_key()? {
            Key::ArrowLeft | Key::Char('h') => {
                session.advance(Direction::Previous);
            }
            Key::ArrowRight | Key::Char('l') => {
                session.advance(Direction::Next);
            }
            Key::Char('s') => {
                session.skip();
            }
            Key::Char('d') => {
                term.write_str("  Delete permanently and ban? [y/N] ")?;
                let confirmed = matches!(term.read_key()?, Key::Char('y') | Key::Char('Y'));
                term.write_line("")?;
                if !confirmed {
                    continue;
                }

                match session.reject() {
                    Ok(rejection) => {
                        rejected += 1;
                        term.write_line(&format!(
                            "  {} Deleted and banned {} {}",
                            style("✗").red(),
                            rejection.candidate.file_name(),
                            style(rejection.fingerprint.short()).dim()
                        ))?;
                    }
                    Err(e) => {
                        term.write_line(&format!("  {} {}", style("!").yellow().bold(), e))?;
                    }
                }
            }
            Key::Char('q') | Key::Escape => break,
            _ => {}
        }
    }

    term.write_line(&format!(
        "{} image(s) deleted and banned",
        style(rejected).cyan()
    ))?;
    Ok(())
}

fn run_blacklist(config_path: &Path, action: BlacklistAction) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let store = ExclusionStore::open(&config.blacklist_path()?)?;
    let term = Term::stdout();

    match action {
        BlacklistAction::List { filter, output } => {
            let entries = match filter {
                Some(query) => store.search(&query),
                None => store.list_all(),
            };
            match output {
                OutputFormat::Pretty => print_entries(&term, &entries)?,
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&entries)
                        .map_err(|e| StoreError::Serialization(e.to_string()))?
                ),
            }
        }
        BlacklistAction::Add { file, source } => {
            let fingerprint = store.ban_file(&file, &source, &FingerprintCache::new())?;
            term.write_line(&format!(
                "{} Banned {} {}",
                style("✓").green().bold(),
                display_path(&file),
                style(fingerprint.short()).dim()
            ))?;
        }
        BlacklistAction::Remove { fingerprint } => {
            let fingerprint = store.resolve(&fingerprint)?;
            if store.remove(&fingerprint)? {
                term.write_line(&format!(
                    "{} Unbanned {}",
                    style("✓").green().bold(),
                    fingerprint.short()
                ))?;
            } else {
                term.write_line(&format!("{} is not blacklisted", fingerprint.short()))?;
            }
        }
    }
    Ok(())
}

fn print_entries(term: &Term, entries: &[ExclusionEntry]) -> Result<()> {
    if entries.is_empty() {
        term.write_line("No blacklisted images")?;
        return Ok(());
    }

    term.write_line(&format!(
        "{}",
        style(format!(
            "{:<14}{:<18}{:<16}{}",
            "Fingerprint", "Banned", "Source", "Name"
        ))
        .bold()
        .underlined()
    ))?;
    for entry in entries {
        term.write_line(&format!(
            "{:<14}{:<18}{:<16}{}",
            entry.fingerprint.short(),
            entry.display_date(),
            entry.source_id,
            entry.original_name
        ))?;
    }
    term.write_line(&format!("{}", style(format!("{} entries", entries.len())).dim()))?;
    Ok(())
}

fn run_config(config_path: &Path, action: ConfigAction) -> Result<()> {
    let term = Term::stdout();

    match action {
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                term.write_line(&format!(
                    "{} already exists (use --force to overwrite)",
                    display_path(config_path)
                ))?;
                return Ok(());
            }
            AppConfig::write_template(config_path)?;
            term.write_line(&format!(
                "{} Wrote {}",
                style("✓").green().bold(),
                display_path(config_path)
            ))?;
        }
        ConfigAction::Show => {
            let config = AppConfig::load(config_path)?;
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            term.write_line(&format!(
                "{} {}",
                style("# config:").dim(),
                display_path(config_path)
            ))?;
            if let Ok(blacklist) = config.blacklist_path() {
                term.write_line(&format!(
                    "{} {}",
                    style("# blacklist:").dim(),
                    display_path(&blacklist)
                ))?;
            }
            term.write_line(&rendered)?;
        }
        ConfigAction::AddSource {
            id,
            path,
            kind,
            recursive,
        } => {
            let source = match (kind, path) {
                (SourceKindArg::Local, Some(path)) => {
                    let mut source = SourceConfig::local(id, path);
                    source.recursive = recursive;
                    source
                }
                (SourceKindArg::Local, None) => {
                    return Err(ConfigError::Invalid(format!(
                        "local source '{}' needs a path",
                        id
                    ))
                    .into())
                }
                (SourceKindArg::DownloadDir, path) => SourceConfig::download_dir(id, path),
            };

            let mut config = AppConfig::load(config_path)?;
            let resolved = source.resolved_path()?;
            let (id, kind) = (source.id.clone(), source.kind);
            config.add_source(source, config_path)?;
            term.write_line(&format!(
                "{} Added {} source {} at {}",
                style("✓").green().bold(),
                kind,
                style(&id).bold(),
                display_path(&resolved)
            ))?;
        }
    }
    Ok(())
}

fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Shorten paths under the home directory to `~/...`
fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(&home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}
