use anyhow::{Context, Result};
use clap::Parser;
use markview_config::{load_settings, SettingsSource};
use markview_core::{FileWatcher, Resolver, Viewer, WatcherConfig};
use markview_server::{PreviewServer, ServerOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug, Clone)]
#[clap(name = "markview", version, about = "Live preview of markup files in the browser")]
pub struct Args {
    /// The file to display, nothing is started unless exactly one is given.
    #[clap(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Enable the logging system.
    #[clap(long)]
    pub log: Option<PathBuf>,

    /// Specify the path of the settings file.
    #[clap(long)]
    pub config_file: Option<PathBuf>,

    /// Port of the preview server, 0 picks a free one.
    #[clap(long)]
    pub port: Option<u16>,

    /// Do not open the browser.
    #[clap(long)]
    pub no_browser: bool,
}

impl Args {
    /// The file to display, `None` unless exactly one was given.
    pub fn target_file(&self) -> Option<&Path> {
        match self.files.as_slice() {
            [file] => Some(file),
            _ => None,
        }
    }
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    // The file may not exist yet, the watcher reports it as missing then.
    match path.canonicalize() {
        Ok(canonical) => Ok(canonical),
        Err(_) => Ok(std::env::current_dir()
            .context("failed to read the current directory")?
            .join(path)),
    }
}

/// Displays `file` until interrupted.
pub async fn run(file: &Path, args: Args) -> Result<()> {
    let loaded = load_settings(args.config_file.clone());

    let _log_guard = crate::logging::init(args.log.clone(), &loaded.settings.log)?;

    if let Some(err) = &loaded.maybe_error {
        tracing::warn!(?err, "Unusable settings file, using the bundled settings");
    }
    match &loaded.source {
        SettingsSource::Explicit(path) | SettingsSource::User(path) => {
            tracing::info!(path = %path.display(), "Loaded settings");
        }
        SettingsSource::Bundled => tracing::info!("Using the bundled settings"),
    }

    let settings = Arc::new(loaded.settings);
    let path = absolute_path(file)?;

    let mut options = ServerOptions::from_settings(&settings);
    if let Some(port) = args.port {
        options.port = port;
    }
    if args.no_browser {
        options.open_browser = false;
    }

    let server = PreviewServer::bind(Viewer::new(path.clone()), &options)
        .await
        .context("failed to start the preview server")?;
    println!("markview: serving {} at {}", path.display(), server.url()?);

    let (delivery_tx, delivery_rx) = tokio::sync::mpsc::unbounded_channel();
    let resolver = Arc::new(Resolver::new(&settings));
    let _watch_handle = FileWatcher::spawn(
        path,
        resolver,
        WatcherConfig::from_settings(&settings),
        delivery_tx,
    )
    .context("failed to start watching the file")?;

    tokio::select! {
        res = server.run(delivery_rx) => res?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, shutting down"),
    }

    Ok(())
}
