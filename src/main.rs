mod app;
mod config;
mod entry_store;
mod gratitude_entry;
mod image_loader;
mod logging;
mod ui;

use app::App;
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use config::Config;
use crossterm::event::{Event, EventStream};
use entry_store::EntryStore;
use futures::StreamExt;
use image_loader::ImageLoader;
use std::path::PathBuf;
use tracing::info;
use ui::Tui;

/// A terminal gratitude journal. Entries live only as long as the session.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Config file (defaults to <config_dir>/gratitude/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter, overrides RUST_LOG and the config file (e.g. `debug`)
    #[arg(long)]
    log_level: Option<String>,

    /// Where to write logs
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(|| config.logging.file.clone());
    let log_level = args.log_level.as_deref().map(level_directive);
    logging::init(&log_file, &config.logging.level, log_level.as_deref())?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting gratitude journal");

    let (loader, mut loaded_rx) = ImageLoader::new(&config.image);
    let mut app = App::new(EntryStore::new(), loader, config.date_format.clone());

    let mut tui = Tui::new()?;
    let mut events = EventStream::new();

    while !app.should_quit() {
        tui.draw(&app)?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) => app.handle_key(key),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).wrap_err("Failed to read terminal event"),
                None => break,
            },
            Some(loaded) = loaded_rx.recv() => app.on_image_loaded(loaded),
        }
    }

    drop(tui);
    info!(entries = app.store().len(), "session ended");
    Ok(())
}

/// A bare level such as `debug` applies to this crate only.
fn level_directive(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("gratitude_journal={}", level)
    }
}
