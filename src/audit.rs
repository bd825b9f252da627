//! Append-only, rotating audit log for tool invocations.
//!
//! Mirrors `original_source`'s audit logger: `RotatingFileHandler`-style
//! rotation (10 MiB per file, 5 backups), a truncated SHA-256 fingerprint of
//! the canonical-JSON input, and serialized writes so lines never interleave.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;
pub const BACKUP_COUNT: u32 = 5;
const SUMMARY_TRUNCATE_LEN: usize = 200;

#[derive(Debug, Serialize)]
struct ToolCallEntry<'a> {
    event: &'static str,
    tool: &'a str,
    tool_use_id: &'a str,
    input_hash: String,
    input_summary: Value,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct ToolResultEntry<'a> {
    event: &'static str,
    tool: &'a str,
    tool_use_id: &'a str,
    is_error: bool,
    timestamp: String,
}

/// Canonical (lexicographically-keyed) JSON serialization of a value: object
/// keys are sorted recursively so `input_hash` depends only on content, not
/// field insertion order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// First 16 hex characters of SHA-256 over the canonical JSON form.
pub fn input_hash(value: &Value) -> String {
    let canonical = canonicalize(value);
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    hex::encode(digest)[..16].to_string()
}

/// Input map with each value left as-is unless its rendered form exceeds
/// 200 chars, in which case it is stringified, truncated, and
/// ellipsis-suffixed.
pub fn summarize_input(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let summarized = map
                .iter()
                .map(|(k, v)| (k.clone(), truncate_value(v)))
                .collect();
            Value::Object(summarized)
        }
        other => truncate_value(other),
    }
}

fn truncate_value(value: &Value) -> Value {
    let rendered = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if rendered.chars().count() > SUMMARY_TRUNCATE_LEN {
        let truncated: String = rendered.chars().take(SUMMARY_TRUNCATE_LEN).collect();
        Value::String(format!("{truncated}..."))
    } else {
        value.clone()
    }
}

/// Rotating, append-only JSONL audit writer.
pub struct AuditLog {
    path: PathBuf,
    inner: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: Mutex::new(()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(crate::config::audit_log_path())
    }

    pub fn log_tool_call(&self, tool: &str, tool_use_id: &str, input: &Value) {
        let entry = ToolCallEntry {
            event: "tool_call",
            tool,
            tool_use_id,
            input_hash: input_hash(input),
            input_summary: summarize_input(input),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        self.append(&entry);
    }

    pub fn log_tool_result(&self, tool: &str, tool_use_id: &str, is_error: bool) {
        let entry = ToolResultEntry {
            event: "tool_result",
            tool,
            tool_use_id,
            is_error,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        self.append(&entry);
    }

    fn append<T: Serialize>(&self, entry: &T) {
        let _guard = self.inner.lock().unwrap();
        if let Err(e) = self.rotate_if_needed() {
            log::warn!("audit log rotation failed: {e}");
        }
        let Ok(line) = serde_json::to_string(entry) else {
            log::warn!("audit entry failed to serialize");
            return;
        };
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{line}") {
                    log::warn!("failed to write audit entry: {e}");
                }
            }
            Err(e) => log::warn!("failed to open audit log {}: {e}", self.path.display()),
        }
    }

    fn rotate_if_needed(&self) -> std::io::Result<()> {
        let Ok(meta) = fs::metadata(&self.path) else {
            return Ok(());
        };
        if meta.len() < MAX_LOG_BYTES {
            return Ok(());
        }

        let oldest = backup_path(&self.path, BACKUP_COUNT);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for i in (1..BACKUP_COUNT).rev() {
            let from = backup_path(&self.path, i);
            let to = backup_path(&self.path, i + 1);
            if from.exists() {
                fs::rename(from, to)?;
            }
        }
        fs::rename(&self.path, backup_path(&self.path, 1))?;
        Ok(())
    }
}

fn backup_path(base: &Path, index: u32) -> PathBuf {
    let mut name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(&format!(".{index}"));
    base.with_file_name(name)
}
