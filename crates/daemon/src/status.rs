//! Recorder liveness probe
//!
//! The recorder writes JSON-lines logs named `bilirec<yyyyMMdd>.txt`; every
//! record carries the writer's `ProcessId`. The probe picks the newest log,
//! takes its last record, and checks whether that process still exists.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Recorder log file name prefix
pub const LOG_PREFIX: &str = "bilirec";
/// Recorder log file name suffix
pub const LOG_SUFFIX: &str = ".txt";

static PROCESS_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\{.*"ProcessId":\s*(\d+),.*\}$"#).expect("process id pattern is valid")
});

/// Errors that prevent a status report from being built
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Failed to read log directory {dir}: {source}")]
    ReadDir {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("No recorder log found in {0}")]
    NoLogFile(PathBuf),

    #[error("Failed to read log file {path}: {source}")]
    ReadLog {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No process id in last log line: {0:?}")]
    NoProcessId(String),

    #[error("Process id out of range: {0}")]
    InvalidProcessId(String),
}

/// Snapshot returned by the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub running: bool,
    #[serde(rename = "last_log")]
    pub last_log_line: String,
}

/// Whether a directory entry name looks like a recorder log
pub fn is_recorder_log(name: &str) -> bool {
    name.starts_with(LOG_PREFIX) && name.ends_with(LOG_SUFFIX)
}

/// Pick the newest recorder log among `names`
///
/// Names embed a fixed-width date, so the lexicographically greatest match is the newest.
pub fn select_latest_log<'a, I>(names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().filter(|name| is_recorder_log(name)).max()
}

/// Locate the newest recorder log in `dir`
pub async fn find_latest_log(dir: &Path) -> Result<PathBuf, StatusError> {
    let read_dir_err = |source| StatusError::ReadDir {
        dir: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_dir_err)?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_dir_err)? {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        if is_dir {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }

    select_latest_log(names.iter().map(String::as_str))
        .map(|name| dir.join(name))
        .ok_or_else(|| StatusError::NoLogFile(dir.to_path_buf()))
}

/// Last non-empty line of `content`, or an empty string
pub fn last_line(content: &str) -> &str {
    content
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
}

/// Read `path` to the end and return its last non-empty line
pub async fn read_last_line(path: &Path) -> Result<String, StatusError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| StatusError::ReadLog {
            path: path.to_path_buf(),
            source,
        })?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(last_line(&content).to_string())
}

/// Pull the `ProcessId` field out of a log record
pub fn extract_process_id(line: &str) -> Result<i32, StatusError> {
    let digits = PROCESS_ID_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| StatusError::NoProcessId(line.to_string()))?
        .as_str();

    digits
        .parse()
        .map_err(|_| StatusError::InvalidProcessId(digits.to_string()))
}

/// Whether a process with `pid` exists and may be signalled by us
///
/// Any lookup failure, including lack of permission, counts as not running.
#[cfg(unix)]
pub fn is_process_alive(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // 0 and negatives address process groups, not a single process
    if pid <= 0 {
        return false;
    }
    kill(Pid::from_raw(pid), None).is_ok()
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: i32) -> bool {
    false
}

/// On-demand probe over the recorder's log directory
#[derive(Debug, Clone)]
pub struct StatusProbe {
    log_dir: PathBuf,
}

impl StatusProbe {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Build a fresh report; nothing is cached between calls
    pub async fn probe(&self) -> Result<StatusReport, StatusError> {
        let log_path = find_latest_log(&self.log_dir).await?;
        let last_log_line = read_last_line(&log_path).await?;
        let pid = extract_process_id(&last_log_line)?;

        Ok(StatusReport {
            running: is_process_alive(pid),
            last_log_line,
        })
    }
}
