//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The [`VogueConfig`] struct representing one config.kdl file
//! - Conversion to and from KDL documents
//! - Validation and layered merging
//! - File loading for the system and project locations

use crate::{Error, Result};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name used at both the system and project level.
pub const CONFIG_FILE: &str = "config.kdl";

/// Environment variable overriding the system config directory.
pub const CONFIG_DIR_ENV: &str = "VOGUE_CONFIG_DIR";

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Log levels accepted by `log-level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Settings read from one config.kdl.
///
/// Every field is optional; unset fields fall through to the next layer.
///
/// # KDL Schema
///
/// ```kdl
/// backup-count 10
/// commit-retries 3
/// retry-backoff-ms 25
/// version-retries 8
/// hash-workers 4
/// worker-threads 2
/// default-author "jdoe"
/// log-level "info"
/// log-format "text"   // or "json"
/// output-format "json" // or "human"
/// publish-copy #true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VogueConfig {
    /// Number of snapshot backups to keep
    pub backup_count: Option<usize>,

    /// Attempts for a snapshot commit hitting transient I/O errors
    pub commit_retries: Option<u32>,

    /// Initial delay between commit retries, doubled per retry
    pub retry_backoff_ms: Option<u64>,

    /// Attempts for version allocation after a lost race
    pub version_retries: Option<u32>,

    /// Threads used to hash files during a scan
    pub hash_workers: Option<usize>,

    /// Threads in the background worker pool
    pub worker_threads: Option<usize>,

    /// Author recorded on versions when none is given
    pub default_author: Option<String>,

    pub log_level: Option<String>,

    pub log_format: Option<LogFormat>,

    pub output_format: Option<OutputFormat>,

    /// Whether the built-in integrator copies published files
    pub publish_copy: Option<bool>,
}

fn first_value<'a>(doc: &'a KdlDocument, key: &str) -> Option<&'a KdlValue> {
    doc.get(key)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

fn string_value(doc: &KdlDocument, key: &str) -> Option<String> {
    first_value(doc, key)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn integer_value(doc: &KdlDocument, key: &str) -> Option<i128> {
    first_value(doc, key).and_then(|v| v.as_integer())
}

fn push_node(doc: &mut KdlDocument, key: &str, value: KdlValue) {
    let mut node = KdlNode::new(key);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}

impl VogueConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.backup_count == Some(0) {
            return Err("backup-count must be at least 1".to_string());
        }
        if self.commit_retries == Some(0) {
            return Err("commit-retries must be at least 1".to_string());
        }
        if self.version_retries == Some(0) {
            return Err("version-retries must be at least 1".to_string());
        }
        if self.hash_workers == Some(0) {
            return Err("hash-workers must be at least 1".to_string());
        }
        if self.worker_threads == Some(0) {
            return Err("worker-threads must be at least 1".to_string());
        }
        if let Some(level) = &self.log_level {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(format!(
                    "log-level must be one of {}, got {}",
                    LOG_LEVELS.join("/"),
                    level
                ));
            }
        }
        if self.default_author.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err("default-author cannot be empty".to_string());
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes and values of the wrong type are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let count = |key: &str| integer_value(doc, key).and_then(|i| usize::try_from(i).ok());
        let small = |key: &str| integer_value(doc, key).and_then(|i| u32::try_from(i).ok());

        Self {
            backup_count: count("backup-count"),
            commit_retries: small("commit-retries"),
            retry_backoff_ms: integer_value(doc, "retry-backoff-ms")
                .and_then(|i| u64::try_from(i).ok()),
            version_retries: small("version-retries"),
            hash_workers: count("hash-workers"),
            worker_threads: count("worker-threads"),
            default_author: string_value(doc, "default-author"),
            log_level: string_value(doc, "log-level"),
            log_format: string_value(doc, "log-format").and_then(|s| LogFormat::parse(&s)),
            output_format: string_value(doc, "output-format")
                .and_then(|s| OutputFormat::parse(&s)),
            publish_copy: first_value(doc, "publish-copy").and_then(|v| v.as_bool()),
        }
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(n) = self.backup_count {
            push_node(&mut doc, "backup-count", KdlValue::Integer(n as i128));
        }
        if let Some(n) = self.commit_retries {
            push_node(&mut doc, "commit-retries", KdlValue::Integer(n as i128));
        }
        if let Some(n) = self.retry_backoff_ms {
            push_node(&mut doc, "retry-backoff-ms", KdlValue::Integer(n as i128));
        }
        if let Some(n) = self.version_retries {
            push_node(&mut doc, "version-retries", KdlValue::Integer(n as i128));
        }
        if let Some(n) = self.hash_workers {
            push_node(&mut doc, "hash-workers", KdlValue::Integer(n as i128));
        }
        if let Some(n) = self.worker_threads {
            push_node(&mut doc, "worker-threads", KdlValue::Integer(n as i128));
        }
        if let Some(ref author) = self.default_author {
            push_node(&mut doc, "default-author", KdlValue::String(author.clone()));
        }
        if let Some(ref level) = self.log_level {
            push_node(&mut doc, "log-level", KdlValue::String(level.clone()));
        }
        if let Some(format) = self.log_format {
            push_node(&mut doc, "log-format", KdlValue::String(format.as_str().to_string()));
        }
        if let Some(format) = self.output_format {
            push_node(
                &mut doc,
                "output-format",
                KdlValue::String(format.as_str().to_string()),
            );
        }
        if let Some(copy) = self.publish_copy {
            push_node(&mut doc, "publish-copy", KdlValue::Bool(copy));
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &VogueConfig) {
        if other.backup_count.is_some() {
            self.backup_count = other.backup_count;
        }
        if other.commit_retries.is_some() {
            self.commit_retries = other.commit_retries;
        }
        if other.retry_backoff_ms.is_some() {
            self.retry_backoff_ms = other.retry_backoff_ms;
        }
        if other.version_retries.is_some() {
            self.version_retries = other.version_retries;
        }
        if other.hash_workers.is_some() {
            self.hash_workers = other.hash_workers;
        }
        if other.worker_threads.is_some() {
            self.worker_threads = other.worker_threads;
        }
        if other.default_author.is_some() {
            self.default_author = other.default_author.clone();
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level.clone();
        }
        if other.log_format.is_some() {
            self.log_format = other.log_format;
        }
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.publish_copy.is_some() {
            self.publish_copy = other.publish_copy;
        }
    }

    /// Set one key from its string form, as typed on the command line.
    pub fn set_key(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        fn num<T: std::str::FromStr>(key: &str, value: &str) -> std::result::Result<T, String> {
            value
                .trim()
                .parse()
                .map_err(|_| format!("{} expects a non-negative integer, got '{}'", key, value))
        }
        match key {
            "backup-count" => self.backup_count = Some(num(key, value)?),
            "commit-retries" => self.commit_retries = Some(num(key, value)?),
            "retry-backoff-ms" => self.retry_backoff_ms = Some(num(key, value)?),
            "version-retries" => self.version_retries = Some(num(key, value)?),
            "hash-workers" => self.hash_workers = Some(num(key, value)?),
            "worker-threads" => self.worker_threads = Some(num(key, value)?),
            "default-author" => self.default_author = Some(value.to_string()),
            "log-level" => self.log_level = Some(value.to_string()),
            "log-format" => {
                self.log_format = Some(
                    LogFormat::parse(value)
                        .ok_or_else(|| format!("log-format must be text or json, got '{}'", value))?,
                )
            }
            "output-format" => {
                self.output_format = Some(OutputFormat::parse(value).ok_or_else(|| {
                    format!("output-format must be json or human, got '{}'", value)
                })?)
            }
            "publish-copy" => {
                self.publish_copy = Some(match value.trim().to_lowercase().as_str() {
                    "true" | "yes" | "1" => true,
                    "false" | "no" | "0" => false,
                    _ => return Err(format!("publish-copy must be true or false, got '{}'", value)),
                })
            }
            _ => return Err(format!("Unknown config key: {}", key)),
        }
        self.validate()
    }

    /// Load and validate a config file. A missing file yields an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(Error::io_at(path, e)),
        };
        let doc: KdlDocument = content
            .parse()
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_kdl(&doc);
        config
            .validate()
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Write this config as KDL, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate().map_err(Error::Config)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
        }
        std::fs::write(path, self.to_kdl().to_string()).map_err(|e| Error::io_at(path, e))
    }
}

/// Path of the system-level config.kdl.
///
/// `$VOGUE_CONFIG_DIR/config.kdl` when set, otherwise
/// `<platform config dir>/vogue/config.kdl`.
pub fn system_config_path() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir).join(CONFIG_FILE)),
        _ => dirs::config_dir().map(|d| d.join("vogue").join(CONFIG_FILE)),
    }
}

/// Path of the project-level config.kdl.
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root
        .join(crate::storage::PIPELINE_DIR)
        .join(CONFIG_FILE)
}
