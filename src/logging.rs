use color_eyre::eyre::{Result, WrapErr};
use std::{fs, path::Path, sync::Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sends tracing output to `file`, since the terminal belongs to the UI.
///
/// `override_level` beats `RUST_LOG`, which beats `default_level`.
pub fn init(file: &Path, default_level: &str, override_level: Option<&str>) -> Result<()> {
    if let Some(parent) = file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Failed to create log directory {}", parent.display())
            })?;
        }
    }
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .wrap_err_with(|| format!("Failed to open log file {}", file.display()))?;

    tracing_subscriber::registry()
        .with(filter(default_level, override_level)?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .try_init()
        .wrap_err("Failed to install tracing subscriber")?;

    Ok(())
}

fn filter(default_level: &str, override_level: Option<&str>) -> Result<EnvFilter> {
    let directives = match override_level {
        Some(level) => level.to_string(),
        None => std::env::var("RUST_LOG")
            .unwrap_or_else(|_| format!("gratitude_journal={}", default_level)),
    };
    EnvFilter::try_new(&directives)
        .wrap_err_with(|| format!("Invalid log filter `{}`", directives))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins() {
        let filter = filter("info", Some("gratitude_journal=trace")).unwrap();
        assert!(filter.to_string().contains("gratitude_journal=trace"));
    }

    #[test]
    fn rejects_garbage_directives() {
        assert!(filter("info", Some("gratitude_journal=[[")).is_err());
    }
}
