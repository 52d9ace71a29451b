//! docshelf - A terminal viewer for static markdown documentation sites.
//!
//! # Usage
//!
//! ```bash
//! docshelf https://example.com/docs/
//! docshelf ./site --doc guide/install.md
//! docshelf ./site --route 'doc=guide%2Finstall.md&anchor=linux'
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use docshelf::app::App;
use docshelf::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags,
};
use docshelf::fetch::DEFAULT_CONTENT_ROOT;
use docshelf::session::{SessionStore, default_session_path};

/// A terminal viewer for static markdown documentation sites
#[derive(Parser, Debug)]
#[command(name = "docshelf", version, about, long_about = None)]
struct Cli {
    /// Site to browse: an http(s) base URL or a local directory
    #[arg(value_name = "SITE")]
    site: String,

    /// Document to open first, as listed in the index
    #[arg(long, value_name = "PATH")]
    doc: Option<String>,

    /// Route fragment to open, e.g. 'doc=guide%2Fintro.md&anchor=setup'
    #[arg(long, value_name = "FRAGMENT")]
    route: Option<String>,

    /// Primary directory index location, tried before the defaults
    #[arg(long, value_name = "PATH")]
    index: Option<String>,

    /// Prefix prepended to document paths when fetching
    #[arg(long, value_name = "PREFIX")]
    content_root: Option<String>,

    /// Outline levels expanded when a document opens
    #[arg(long, value_name = "N")]
    outline_levels: Option<usize>,

    /// Start with the sidebar hidden
    #[arg(long)]
    no_sidebar: bool,

    /// Write logs to a file (the terminal is owned by the UI)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
                )
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
                )
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    init_logging(effective.log_file.as_ref())?;
    tracing::debug!(?effective, site = %cli.site, "effective configuration");

    let mut app = App::new(cli.site)
        .with_session(SessionStore::open(default_session_path()))
        .with_route(cli.route)
        .with_doc(cli.doc)
        .with_index_location(effective.index.clone())
        .with_content_root(
            effective
                .content_root
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTENT_ROOT.to_string()),
        )
        .with_outline_levels(effective.outline_levels.unwrap_or(0))
        .with_sidebar_hidden(effective.no_sidebar)
        .with_config_paths(
            Some(global_path.clone()),
            if local_path.exists() {
                Some(local_path.clone())
            } else {
                None
            },
        );

    app.run().context("Application error")
}
