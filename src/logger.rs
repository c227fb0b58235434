use anyhow::{Context, Result, anyhow};
use ftail::Ftail;
use log::{LevelFilter, info};
use std::env;
use std::fs;
use std::path::PathBuf;

const LOGS_DIR: &str = ".logs";
const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// `$HOME/.logs/newsdesk/newsdesk.log`
pub fn log_file_path() -> Result<PathBuf> {
    let home_folder = env::home_dir().ok_or_else(|| anyhow!("Could not determine $HOME"))?;
    Ok(home_folder
        .join(LOGS_DIR)
        .join(PKG_NAME)
        .join(format!("{PKG_NAME}.log")))
}

/// The console only gets warnings unless `verbose`, so log lines do not
/// interleave with the interactive feed; everything from info up goes to the file.
pub fn init_logger(verbose: bool) -> Result<()> {
    let logs_file = log_file_path()?;
    if let Some(logs_path) = logs_file.parent() {
        fs::create_dir_all(logs_path)
            .with_context(|| format!("Could not create logs dir at {}", logs_path.display()))?;
    }

    let console_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    Ftail::new()
        .console(console_level)
        .single_file(&logs_file, true, LevelFilter::Info)
        .init()
        .map_err(|e| anyhow!("Could not initialize logger: {}", e))?;

    info!("Logger initialized, writing to {}", logs_file.display());
    Ok(())
}
