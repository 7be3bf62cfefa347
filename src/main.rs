//! Sisu - a multi-locale static site build engine with incremental rebuilds.

mod build;
mod cli;
mod config;
mod detect;
mod engine;
mod locale;
mod manifest;
mod render;
mod scan;
mod serve;
mod utils;
mod watch;

use anyhow::Result;
use build::{Session, build_site};
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use serve::serve_site;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let full = cli.command.is_full();

    match &cli.command {
        Commands::Build { config, .. } => {
            let session = load_session(config)?;
            build_site(session, full).map(|_| ())
        }
        Commands::Serve { config, .. } => {
            let session = load_session(config)?;
            build_site(session, full)?;

            std::thread::spawn(move || {
                if let Err(err) = watch::watch_blocking(session) {
                    crate::log!("watch"; "{err:#}");
                }
            });

            serve_site(session.config)
        }
    }
}

/// Load the config and build the session state shared by the build pass,
/// the watcher and the dev server. A bad config is fatal before any build
/// work starts.
fn load_session(config_path: &Path) -> Result<&'static Session> {
    let config: &'static SiteConfig = Box::leak(Box::new(SiteConfig::from_path(config_path)?));
    Ok(Box::leak(Box::new(Session::new(config))))
}
