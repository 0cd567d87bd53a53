//! Runs the platform thumbnail helper (`qlmanage` on macOS) under a deadline.

use image::RgbaImage;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crate::config::MIN_THUMBNAIL_TIMEOUT_MS;
use crate::error::{LaunchpadError, Result};
use crate::logs;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct ThumbnailRenderer {
    program: PathBuf,
    timeout: Duration,
    work_root: PathBuf,
}

impl ThumbnailRenderer {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout: timeout.max(Duration::from_millis(MIN_THUMBNAIL_TIMEOUT_MS)),
            work_root: std::env::temp_dir(),
        }
    }

    /// Directory under which per-input output folders are created.
    pub fn with_work_root(mut self, work_root: impl Into<PathBuf>) -> Self {
        self.work_root = work_root.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_available(&self) -> bool {
        self.program.is_file()
    }

    /// Ask the helper for a `size` thumbnail of `input` and decode what it wrote.
    ///
    /// The helper is killed once the deadline passes. Its stdout is drained on a
    /// separate thread so a chatty helper cannot stall on a full pipe.
    pub fn render(&self, input: &Path, size: u32) -> Result<RgbaImage> {
        if !self.is_available() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("thumbnail helper {} not found", self.program.display()),
            )
            .into());
        }

        let out_dir = self.output_dir(input);
        prepare_output_dir(&out_dir)?;

        let started = SystemTime::now();
        let mut child = Command::new(&self.program)
            .arg("-t")
            .arg("-s")
            .arg(size.to_string())
            .arg("-o")
            .arg(&out_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        if let Some(mut stdout) = child.stdout.take() {
            // Detached: a grandchild may keep the pipe open after the helper exits.
            let _ = thread::Builder::new()
                .name("thumbnail-drain".to_string())
                .spawn(move || io::copy(&mut stdout, &mut io::sink()));
        }

        if wait_with_deadline(&mut child, self.timeout)?.is_none() {
            let _ = child.kill();
            let _ = child.wait();
            let _ = fs::remove_dir_all(&out_dir);
            logs::log_warn(&format!(
                "Thumbnail helper timed out after {:?} on {}",
                self.timeout,
                input.display()
            ));
            return Err(LaunchpadError::ExternalToolTimeout(self.timeout));
        }

        let decoded = newest_png(&out_dir, started)
            .ok_or_else(|| LaunchpadError::decode(input, "thumbnail helper produced no image"))
            .and_then(|png| {
                let bytes = fs::read(&png)?;
                Ok(image::load_from_memory(&bytes)?.to_rgba8())
            });

        let _ = fs::remove_dir_all(&out_dir);
        decoded
    }

    fn output_dir(&self, input: &Path) -> PathBuf {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.work_root
            .join(format!("lp-appicon-{}", safe_file_name(&name)))
    }
}

fn safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Create `dir` and remove any PNGs a previous run left behind.
fn prepare_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if is_png(&path) {
            let _ = fs::remove_file(path);
        }
    }
    Ok(())
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Newest PNG in `dir`, preferring files written after `started`.
fn newest_png(dir: &Path, started: SystemTime) -> Option<PathBuf> {
    fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| is_png(path))
        .filter_map(|path| {
            let modified = fs::metadata(&path).ok()?.modified().ok()?;
            Some((path, modified))
        })
        .max_by_key(|(_, modified)| (*modified >= started, *modified))
        .map(|(path, _)| path)
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false)
}
