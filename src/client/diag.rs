//! Append-only diagnostic log of request/response pairs
//!
//! Enabled with `--debug`. The file is truncated when the log is opened so a
//! run starts from a clean slate, then every request and response is
//! appended in the order they happen.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::Value;

// ============================================================================
// SBIO: Pure formatting (no I/O)
// ============================================================================

/// Format the request half of a log entry
pub fn format_request(timestamp: &str, method: &str, url: &str, body: Option<&Value>) -> String {
    let mut entry = format!("[{}] >>> {} {}\n", timestamp, method, url);
    if let Some(body) = body {
        let rendered = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
        entry.push_str(&rendered);
        entry.push('\n');
    }
    entry
}

/// Format the response half of a log entry
pub fn format_response(timestamp: &str, status: u16, body: &str) -> String {
    let mut entry = format!("[{}] <<< {}\n", timestamp, status);
    if !body.is_empty() {
        entry.push_str(body);
        if !body.ends_with('\n') {
            entry.push('\n');
        }
    }
    entry.push('\n');
    entry
}

// ============================================================================
// I/O: the log file itself
// ============================================================================

pub struct DiagnosticLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl DiagnosticLog {
    /// Open the log, truncating whatever a previous run left behind
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_request(&self, method: &str, url: &str, body: Option<&Value>) -> io::Result<()> {
        self.append(&format_request(&timestamp(), method, url, body))
    }

    pub fn record_response(&self, status: u16, body: &str) -> io::Result<()> {
        self.append(&format_response(&timestamp(), status, body))
    }

    fn append(&self, entry: &str) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "diagnostic log lock poisoned"))?;
        file.write_all(entry.as_bytes())?;
        file.flush()
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}
