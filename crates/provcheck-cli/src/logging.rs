use anyhow::{anyhow, Result};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Log level override (`error|warn|info|debug|trace`); `-v`/`-q` take precedence.
pub const LOG_ENV: &str = "PROVCHECK_LOG";

fn level_from_flags(verbose: u8, quiet: bool) -> Option<Level> {
    if quiet {
        return Some(Level::ERROR);
    }
    match verbose {
        0 => None,
        1 => Some(Level::INFO),
        2 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

fn level_from_env() -> Result<Level> {
    match std::env::var(LOG_ENV) {
        Ok(raw) if !raw.trim().is_empty() => Level::from_str(raw.trim())
            .map_err(|_| anyhow!("{LOG_ENV}={raw:?} is not one of error|warn|info|debug|trace")),
        _ => Ok(Level::WARN),
    }
}

/// Install the stderr fmt subscriber.
pub fn init(verbose: u8, quiet: bool) -> Result<()> {
    let level = match level_from_flags(verbose, quiet) {
        Some(level) => level,
        None => level_from_env()?,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_env() {
        assert_eq!(level_from_flags(0, true), Some(Level::ERROR));
        assert_eq!(level_from_flags(3, true), Some(Level::ERROR));
        assert_eq!(level_from_flags(0, false), None);
        assert_eq!(level_from_flags(2, false), Some(Level::DEBUG));
        assert_eq!(level_from_flags(9, false), Some(Level::TRACE));
    }
}
