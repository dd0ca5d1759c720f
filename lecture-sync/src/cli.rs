///
/// This module implements the CLI interface for lecture-sync: command parsing,
/// turning flags into a [`SyncConfig`], and the user-visible progress and
/// summary output.
///
/// All pipeline logic lives in the [`lecture-sync-core`] crate; this module
/// is glue only.
///
/// ## How To Use
/// - Command line: `lecture-sync sync` from the root of the book.
/// - Programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`lecture-sync-core`]: ../../lecture-sync-core/
use crate::load_config::load_config;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lecture_sync_core::config::SyncConfig;
use lecture_sync_core::download::HttpFetcher;
use lecture_sync_core::error::SyncError;
use lecture_sync_core::progress::{SyncEvent, SyncProgress};
use lecture_sync_core::synchronise::synchronise_with_progress;
use std::path::PathBuf;

const RULE: &str = "============================================================";

/// CLI for lecture-sync: pull upstream lectures and adapt them for WASM.
#[derive(Parser, Debug)]
#[clap(
    name = "lecture-sync",
    version,
    about = "Synchronise lecture content from the upstream repository and rewrite it for in-browser notebooks"
)]
pub struct Cli {
    /// Only log warnings and errors
    #[clap(long, short, global = true)]
    pub quiet: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the lecture archive, copy it into the content directory and rewrite it
    Sync(SyncArgs),
}

#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Path to a YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Directory relative paths are resolved against
    #[clap(long)]
    pub root: Option<PathBuf>,

    /// Archive URL to download
    #[clap(long)]
    pub url: Option<String>,

    /// Where to store the downloaded archive
    #[clap(long)]
    pub archive: Option<PathBuf>,

    /// Local directory receiving the lectures
    #[clap(long)]
    pub content_dir: Option<PathBuf>,

    /// Download again even if the archive already exists
    #[clap(long)]
    pub overwrite: bool,

    /// Do not unpack the archive (expects an already extracted tree)
    #[clap(long)]
    pub no_unzip: bool,

    /// Unpack into a folder named after the archive
    #[clap(long)]
    pub nested: bool,

    /// Download timeout in seconds
    #[clap(long)]
    pub timeout: Option<u64>,
}

impl SyncArgs {
    /// Config file (or defaults) with the command-line flags applied on top.
    pub fn to_config(&self) -> Result<SyncConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => SyncConfig::default(),
        };

        if let Some(root) = &self.root {
            config.root_dir = root.clone();
        }
        if let Some(url) = &self.url {
            config.source_url = url.clone();
        }
        if let Some(archive) = &self.archive {
            config.archive_path = archive.clone();
        }
        if let Some(content_dir) = &self.content_dir {
            config.content_dir = content_dir.clone();
        }
        if let Some(timeout) = self.timeout {
            config.fetch_timeout_secs = timeout;
        }
        config.overwrite |= self.overwrite;
        config.nested |= self.nested;
        if self.no_unzip {
            config.unzip = false;
        }

        config.trace_loaded();
        Ok(config)
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Sync(args) => {
            let config = args.to_config()?;
            tracing::info!(command = "sync", "Starting synchronisation process");
            print_banner(&config);

            let fetcher = HttpFetcher::new(config.fetch_timeout())
                .context("Failed to construct HTTP client")?;
            match synchronise_with_progress(&config, &fetcher, &ConsoleProgress).await {
                Ok(report) => {
                    tracing::info!(command = "sync", ?report, "Synchronisation complete");
                    print_summary();
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", stage = %e.stage(), error = %e, "Synchronisation failed");
                    print_failure(&e);
                    Err(anyhow::Error::new(e).context("Sync failed"))
                }
            }
        }
    }
}

fn print_banner(config: &SyncConfig) {
    println!("{RULE}");
    println!("QuantEcon WASM Lectures - Content Sync");
    println!("{RULE}");
    println!("Source: {}", config.source_url);
    println!();
}

/// Prints each step to stdout as the run reaches it.
struct ConsoleProgress;

impl SyncProgress for ConsoleProgress {
    fn on_event(&self, event: &SyncEvent<'_>) {
        match event {
            SyncEvent::Fetching { .. } => println!("Downloading lectures..."),
            SyncEvent::ArchiveReused { archive } => {
                println!("Reusing existing archive: {}", archive.display())
            }
            SyncEvent::Extracting { .. } => println!("Extracting files..."),
            SyncEvent::Copying { from, to } => {
                println!("Copying files from: {}", from.display());
                println!("              to: {}", to.display());
                println!();
            }
            SyncEvent::Processing { files } => println!("Processing {files} lecture files..."),
            SyncEvent::Processed { file, .. } => {
                let name = file.file_name().unwrap_or_default().to_string_lossy();
                println!("  ✓ Processed: {name}");
            }
            SyncEvent::CleaningUp => {
                println!();
                println!("Cleaning up temporary files...");
            }
        }
    }
}

fn print_summary() {
    println!();
    println!("{RULE}");
    println!("✓ Sync completed successfully!");
    println!("{RULE}");
    println!();
    println!("Next steps:");
    println!("  1. Review changes: git diff");
    println!("  2. Test locally: teachbooks build book && teachbooks serve");
    println!("  3. Commit changes: git add lectures/ && git commit");
    println!();
}

fn print_failure(err: &SyncError) {
    eprintln!();
    eprintln!("{RULE}");
    eprintln!("✗ ERROR: Sync failed!");
    eprintln!("{RULE}");
    eprintln!("Error ({} step): {err}", err.stage());
    eprintln!();
    eprintln!("Please check:");
    eprintln!("  - Internet connection");
    eprintln!("  - Write permissions in the target directory");
    eprintln!();
}
