//! Configuration for Vogue.
//!
//! Settings live in `config.kdl` files at two levels:
//!
//! - System: `$VOGUE_CONFIG_DIR/config.kdl`, or `~/.config/vogue/config.kdl`
//! - Project: `<project>/00_Pipeline/config.kdl`
//!
//! Keys:
//! - `backup-count` - Snapshot backups to keep (default 10)
//! - `commit-retries` / `retry-backoff-ms` - Transient I/O retry for commits
//! - `version-retries` - Allocation attempts after a lost race
//! - `hash-workers` - Threads used to hash files during a scan
//! - `worker-threads` - Background worker pool size
//! - `default-author` - Author recorded on versions
//! - `log-level` / `log-format` - Logging setup
//! - `output-format` - "json" or "human"
//! - `publish-copy` - Whether publishing copies files into `05_Publish`
//!
//! Precedence: CLI flag > environment (logging only) > project > system > defaults.
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, EnvSettings, LOG_ENV, LOG_FORMAT_ENV, Resolved, ResolvedConfig,
    ValueSource, resolve_config, resolve_layers,
};
pub use schema::{
    CONFIG_DIR_ENV, CONFIG_FILE, LogFormat, OutputFormat, VogueConfig, project_config_path,
    system_config_path,
};
