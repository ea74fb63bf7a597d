use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};

use epub_ingest_core::config::{config_path, destination_root, ingest_options_from_config, load_config, AppConfig};
use epub_ingest_core::document::{ChapterDescriptor, PackageMetadata};
use epub_ingest_core::ingest::{ingest_file, parse_epub, IngestOptions};
use epub_ingest_core::materialize::scan_converted;
use epub_ingest_core::progress::{ProgressEvent, ProgressHandler, Stage};

type CliResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "epub-ingest")]
#[command(about = "Unpack EPUB archives into a browsable directory with a metadata record")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output machine-readable JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract an EPUB and write its metadata record
    Ingest {
        /// EPUB file
        input: String,

        /// Destination root (default: config or EPUB_INGEST_DEST)
        #[arg(long)]
        dest: Option<String>,
    },

    /// Show metadata and chapters without extracting anything
    Info {
        /// EPUB file
        input: String,
    },

    /// List ingested books
    List {
        /// Destination root (default: config or EPUB_INGEST_DEST)
        #[arg(long)]
        dest: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize default config file
    Init,
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Key (dot-separated path)
        key: String,
        /// Value
        value: String,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Ingest { input, dest } => run_ingest(input, dest.as_deref(), cli.json),
        Commands::Info { input } => run_info(input, cli.json),
        Commands::List { dest } => run_list(dest.as_deref(), cli.json),
        Commands::Config { action } => run_config(action, cli.json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Renders pipeline progress on a spinner/bar.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{pos}/{len}]") {
            bar.set_style(style);
        }
        Self { bar }
    }
}

impl ProgressHandler for BarProgress {
    fn on_progress(&self, event: ProgressEvent) {
        if let Some(total) = event.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(event.current);
        let stage = match event.stage {
            Stage::Opening => "Opening",
            Stage::Parsing => "Parsing",
            Stage::Extracting => "Extracting",
            Stage::Finished => "Done",
        };
        match event.message {
            Some(msg) => self.bar.set_message(format!("{stage}: {msg}")),
            None => self.bar.set_message(stage),
        }
        if event.stage == Stage::Finished {
            self.bar.finish_and_clear();
        }
    }
}

fn resolve_dest(dest: Option<&str>, cfg: &AppConfig) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
    match dest {
        Some(d) => Ok(PathBuf::from(d)),
        None => destination_root(cfg).ok_or_else(|| "Could not determine destination directory".into()),
    }
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread().build()
}

fn run_ingest(input: &str, dest: Option<&str>, json: bool) -> CliResult {
    let input_path = Path::new(input);
    if !input_path.is_file() {
        return Err(format!("Input file not found: {}", input_path.display()).into());
    }

    let cfg = load_config();
    let opts = ingest_options_from_config(&cfg);
    let dest_root = resolve_dest(dest, &cfg)?;

    let bar = (!json).then(BarProgress::new);
    let progress = bar.as_ref().map(|b| b as &dyn ProgressHandler);

    let result = runtime()?.block_on(ingest_file(input_path, &dest_root, &opts, progress));
    if let Some(b) = &bar {
        b.bar.finish_and_clear();
    }
    let record = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("Ingested \"{}\" ({} chapters)", record.title, record.chapters.len());
        println!("  -> {}", record.url);
    }
    Ok(())
}

#[derive(Serialize)]
struct InfoOutput<'a> {
    package: &'a str,
    #[serde(flatten)]
    metadata: &'a PackageMetadata,
    chapters: &'a [ChapterDescriptor],
}

fn run_info(input: &str, json: bool) -> CliResult {
    let input_path = Path::new(input);
    let bytes = std::fs::read(input_path)
        .map_err(|e| format!("Cannot read {}: {}", input_path.display(), e))?;

    let cfg = load_config();
    let opts: IngestOptions = ingest_options_from_config(&cfg);
    let parsed = parse_epub(bytes, &opts, None)?;

    if json {
        let out = InfoOutput {
            package: &parsed.package_path,
            metadata: &parsed.metadata,
            chapters: &parsed.chapters,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let m = &parsed.metadata;
    println!("File:     {}", input_path.display());
    println!("Package:  {}", parsed.package_path);
    println!("Title:    {}", m.title);
    if !m.authors.is_empty() {
        println!("Authors:  {}", m.authors);
    }
    println!("Genre:    {}", m.genre);
    if let Some(cover) = &m.cover {
        println!("Cover:    {}", cover);
    }
    println!("Summary:  {}", m.summary);
    println!("Chapters: {}", parsed.chapters.len());
    for (i, chapter) in parsed.chapters.iter().enumerate() {
        println!("  {:>3}. {} ({})", i + 1, chapter.name, chapter.path);
    }
    Ok(())
}

fn run_list(dest: Option<&str>, json: bool) -> CliResult {
    let cfg = load_config();
    let dest_root = resolve_dest(dest, &cfg)?;
    let records = runtime()?.block_on(scan_converted(&dest_root))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No ingested books under {}", dest_root.display());
        return Ok(());
    }
    for record in &records {
        let authors = if record.authors.is_empty() { "unknown" } else { record.authors.as_str() };
        println!("{} by {} ({} chapters)", record.title, authors, record.chapters.len());
        println!("  {}", record.url);
    }
    Ok(())
}

fn run_config(action: &ConfigAction, json: bool) -> CliResult {
    match action {
        ConfigAction::Init => {
            let path = config_path().ok_or("Could not determine config directory")?;
            write_config(&path, &AppConfig::default())?;
            println!("Wrote default config to {}", path.display());
        }
        ConfigAction::Show => {
            let cfg = load_config();
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                println!("{}", toml::to_string_pretty(&cfg)?);
            }
        }
        ConfigAction::Set { key, value } => {
            let path = config_path().ok_or("Could not determine config directory")?;
            let mut cfg: AppConfig = if path.exists() {
                let s = std::fs::read_to_string(&path)?;
                toml::from_str(&s).unwrap_or_else(|_| AppConfig::default())
            } else {
                AppConfig::default()
            };

            set_config_key(&mut cfg, key, value)?;
            write_config(&path, &cfg)?;
            if !json {
                println!("Updated {}", key);
            }
        }
    }
    Ok(())
}

fn write_config(path: &Path, cfg: &AppConfig) -> CliResult {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

fn set_config_key(cfg: &mut AppConfig, key: &str, value: &str) -> CliResult {
    let number = || -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        value
            .parse()
            .map_err(|_| format!("{} expects a number, got '{}'", key, value).into())
    };
    let parts: Vec<&str> = key.splitn(2, '.').collect();
    match parts.as_slice() {
        ["ingest", "destination_root"] => cfg.ingest.destination_root = Some(value.to_string()),
        ["security", sub] => match *sub {
            "max_file_size_mb" => cfg.security.max_file_size_mb = Some(number()?),
            "max_compression_ratio" => cfg.security.max_compression_ratio = Some(number()?),
            "max_file_count" => cfg.security.max_file_count = Some(number()?),
            _ => return Err(format!("Unknown key: {}", key).into()),
        },
        _ => return Err(format!("Unknown key: {}", key).into()),
    }
    Ok(())
}
