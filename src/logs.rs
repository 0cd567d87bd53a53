use clap::Subcommand;
use std::fs::{File, OpenOptions, metadata};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::APP_NAME;
use crate::error::Result;

const LOG_SIZE_WARNING: u64 = 5 * 1024 * 1024;

#[derive(Subcommand)]
pub enum LogsAction {
    /// Show recent log entries
    Show {
        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },

    /// Clear the log file
    Clear,
}

pub fn init_logger() -> Result<()> {
    if let Some(parent) = log_file().parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn log_info(msg: &str) {
    write_log("INFO", msg);
}

pub fn log_warn(msg: &str) {
    write_log("WARN", msg);
}

pub fn log_error(msg: &str) {
    write_log("ERROR", msg);
}

fn write_log(level: &str, msg: &str) {
    let log_file = log_file();
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let entry = format!("[{}] {}: {}\n", timestamp, level, msg);

    let _ = append(&log_file, &entry);

    if let Ok(size) = metadata(&log_file).map(|m| m.len())
        && size > LOG_SIZE_WARNING
    {
        let warning = format!(
            "[{}] WARN: Log file is {:.1} MiB. Consider running '{} logs clear'\n",
            timestamp,
            size as f64 / 1_048_576.0,
            APP_NAME
        );
        let _ = append(&log_file, &warning);
    }
}

fn append(path: &PathBuf, line: &str) -> std::io::Result<()> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(line.as_bytes()))
}

pub fn handle_logs_command(action: Option<LogsAction>) -> Result<()> {
    match action.unwrap_or(LogsAction::Show { lines: 50 }) {
        LogsAction::Show { lines } => show_logs(lines),
        LogsAction::Clear => clear_logs(),
    }
}

fn show_logs(lines: usize) -> Result<()> {
    let log_file = log_file();

    if !log_file.exists() {
        println!("No log file found");
        return Ok(());
    }

    let size = metadata(&log_file)?.len();
    if size > LOG_SIZE_WARNING {
        eprintln!(
            "Warning: Log file is {:.1} MiB. Consider clearing it.",
            size as f64 / 1_048_576.0
        );
    }

    for line in tail(BufReader::new(File::open(&log_file)?), lines)? {
        println!("{}", line);
    }

    Ok(())
}

fn tail(reader: impl BufRead, lines: usize) -> std::io::Result<Vec<String>> {
    let all: Vec<String> = reader.lines().collect::<std::io::Result<_>>()?;
    let start = all.len().saturating_sub(lines);
    Ok(all[start..].to_vec())
}

fn clear_logs() -> Result<()> {
    let log_file = log_file();

    if log_file.exists() {
        std::fs::write(&log_file, "")?;
        println!("Log file cleared");
    } else {
        println!("No log file to clear");
    }

    Ok(())
}

fn log_file() -> PathBuf {
    #[cfg(target_os = "macos")]
    let base = dirs::home_dir().map(|home| home.join("Library").join("Logs"));

    #[cfg(not(target_os = "macos"))]
    let base = dirs::data_local_dir();

    base.unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
        .join(format!("{}.log", APP_NAME))
}
