//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`VOGUE_LOG`, `VOGUE_LOG_FORMAT`; logging keys only)
//! 3. Project config.kdl (`<project>/00_Pipeline/config.kdl`)
//! 4. System config.kdl (`$VOGUE_CONFIG_DIR/config.kdl` or the platform config dir)
//! 5. Built-in defaults

use crate::Result;
use crate::concurrency::RetryPolicy;
use crate::config::schema::{
    LogFormat, OutputFormat, VogueConfig, project_config_path, system_config_path,
};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `log-level`; accepts any tracing filter.
pub const LOG_ENV: &str = "VOGUE_LOG";
/// Environment variable overriding `log-format`.
pub const LOG_FORMAT_ENV: &str = "VOGUE_LOG_FORMAT";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from the project's config.kdl
    Project,
    /// Value from the system config.kdl
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Project => write!(f, "project"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub backup_count: Resolved<usize>,
    pub commit_retries: Resolved<u32>,
    pub retry_backoff_ms: Resolved<u64>,
    pub version_retries: Resolved<u32>,
    pub hash_workers: Resolved<usize>,
    pub worker_threads: Resolved<usize>,
    /// No built-in default; the acting user is used when unset
    pub default_author: Option<Resolved<String>>,
    pub log_level: Resolved<String>,
    pub log_format: Resolved<LogFormat>,
    pub output_format: Resolved<OutputFormat>,
    pub publish_copy: Resolved<bool>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            backup_count: Resolved::new(10, ValueSource::Default),
            commit_retries: Resolved::new(3, ValueSource::Default),
            retry_backoff_ms: Resolved::new(25, ValueSource::Default),
            version_retries: Resolved::new(8, ValueSource::Default),
            hash_workers: Resolved::new(4, ValueSource::Default),
            worker_threads: Resolved::new(2, ValueSource::Default),
            default_author: None,
            log_level: Resolved::new("warn".to_string(), ValueSource::Default),
            log_format: Resolved::new(LogFormat::Text, ValueSource::Default),
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            publish_copy: Resolved::new(true, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    /// Retry policy for snapshot commits.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.commit_retries.value,
            backoff: Duration::from_millis(self.retry_backoff_ms.value),
        }
    }

    /// Author for new versions when the caller gives none.
    pub fn author_or<'a>(&'a self, actor: &'a str) -> &'a str {
        self.default_author
            .as_ref()
            .map(|r| r.value.as_str())
            .unwrap_or(actor)
    }

    /// `(key, value, source)` rows for display.
    pub fn entries(&self) -> Vec<(&'static str, String, String)> {
        fn row<T: ToString>(key: &'static str, r: &Resolved<T>) -> (&'static str, String, String) {
            (key, r.value.to_string(), r.source.to_string())
        }
        let mut rows = vec![
            row("backup-count", &self.backup_count),
            row("commit-retries", &self.commit_retries),
            row("retry-backoff-ms", &self.retry_backoff_ms),
            row("version-retries", &self.version_retries),
            row("hash-workers", &self.hash_workers),
            row("worker-threads", &self.worker_threads),
        ];
        if let Some(author) = &self.default_author {
            rows.push(row("default-author", author));
        }
        rows.extend([
            row("log-level", &self.log_level),
            row("log-format", &self.log_format),
            row("output-format", &self.output_format),
            row("publish-copy", &self.publish_copy),
        ]);
        rows
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub hash_workers: Option<usize>,
    pub default_author: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hash_workers(mut self, workers: usize) -> Self {
        self.hash_workers = Some(workers);
        self
    }

    pub fn with_default_author(mut self, author: impl Into<String>) -> Self {
        self.default_author = Some(author.into());
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Logging settings taken from the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings {
    pub log: Option<String>,
    pub log_format: Option<LogFormat>,
}

impl EnvSettings {
    pub fn from_env() -> Self {
        Self {
            log: std::env::var(LOG_ENV).ok().filter(|s| !s.is_empty()),
            log_format: std::env::var(LOG_FORMAT_ENV)
                .ok()
                .and_then(|s| LogFormat::parse(&s)),
        }
    }
}

fn pick<T: Clone>(
    cli: Option<&T>,
    project: Option<&T>,
    system: Option<&T>,
    default: Resolved<T>,
) -> Resolved<T> {
    if let Some(v) = cli {
        Resolved::new(v.clone(), ValueSource::CliFlag)
    } else if let Some(v) = project {
        Resolved::new(v.clone(), ValueSource::Project)
    } else if let Some(v) = system {
        Resolved::new(v.clone(), ValueSource::System)
    } else {
        default
    }
}

/// Resolve from already loaded layers.
pub fn resolve_layers(
    system: &VogueConfig,
    project: &VogueConfig,
    env: &EnvSettings,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let d = ResolvedConfig::default();

    let mut log_level = pick(
        overrides.log_level.as_ref(),
        project.log_level.as_ref(),
        system.log_level.as_ref(),
        d.log_level,
    );
    if overrides.log_level.is_none() {
        if let Some(filter) = &env.log {
            log_level = Resolved::new(filter.clone(), ValueSource::EnvVar(LOG_ENV.to_string()));
        }
    }

    let mut log_format = pick(
        overrides.log_format.as_ref(),
        project.log_format.as_ref(),
        system.log_format.as_ref(),
        d.log_format,
    );
    if overrides.log_format.is_none() {
        if let Some(format) = env.log_format {
            log_format = Resolved::new(format, ValueSource::EnvVar(LOG_FORMAT_ENV.to_string()));
        }
    }

    let default_author = overrides
        .default_author
        .as_ref()
        .map(|a| Resolved::new(a.clone(), ValueSource::CliFlag))
        .or_else(|| {
            project
                .default_author
                .as_ref()
                .map(|a| Resolved::new(a.clone(), ValueSource::Project))
        })
        .or_else(|| {
            system
                .default_author
                .as_ref()
                .map(|a| Resolved::new(a.clone(), ValueSource::System))
        });

    ResolvedConfig {
        backup_count: pick(
            None,
            project.backup_count.as_ref(),
            system.backup_count.as_ref(),
            d.backup_count,
        ),
        commit_retries: pick(
            None,
            project.commit_retries.as_ref(),
            system.commit_retries.as_ref(),
            d.commit_retries,
        ),
        retry_backoff_ms: pick(
            None,
            project.retry_backoff_ms.as_ref(),
            system.retry_backoff_ms.as_ref(),
            d.retry_backoff_ms,
        ),
        version_retries: pick(
            None,
            project.version_retries.as_ref(),
            system.version_retries.as_ref(),
            d.version_retries,
        ),
        hash_workers: pick(
            overrides.hash_workers.as_ref(),
            project.hash_workers.as_ref(),
            system.hash_workers.as_ref(),
            d.hash_workers,
        ),
        worker_threads: pick(
            None,
            project.worker_threads.as_ref(),
            system.worker_threads.as_ref(),
            d.worker_threads,
        ),
        default_author,
        log_level,
        log_format,
        output_format: pick(
            overrides.output_format.as_ref(),
            project.output_format.as_ref(),
            system.output_format.as_ref(),
            d.output_format,
        ),
        publish_copy: pick(
            None,
            project.publish_copy.as_ref(),
            system.publish_copy.as_ref(),
            d.publish_copy,
        ),
    }
}

/// Resolve configuration with the full precedence chain.
///
/// `project_root` is `None` when no project is selected (e.g. before init).
pub fn resolve_config(
    project_root: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<ResolvedConfig> {
    let system = match system_config_path() {
        Some(path) => VogueConfig::load(&path)?,
        None => VogueConfig::new(),
    };
    let project = match project_root {
        Some(root) => VogueConfig::load(&project_config_path(root))?,
        None => VogueConfig::new(),
    };
    Ok(resolve_layers(
        &system,
        &project,
        &EnvSettings::from_env(),
        overrides,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_value_source_display() {
        assert_eq!(ValueSource::CliFlag.to_string(), "cli");
        assert_eq!(ValueSource::Project.to_string(), "project");
        assert_eq!(ValueSource::EnvVar("X".into()).to_string(), "env:X");
    }

    #[test]
    fn test_resolve_defaults() {
        let resolved = resolve_layers(
            &VogueConfig::new(),
            &VogueConfig::new(),
            &EnvSettings::default(),
            &ConfigOverrides::new(),
        );
        assert_eq!(resolved.backup_count.value, 10);
        assert_eq!(resolved.backup_count.source, ValueSource::Default);
        assert_eq!(resolved.version_retries.value, 8);
        assert!(resolved.default_author.is_none());
        assert!(resolved.publish_copy.value);
        assert_eq!(resolved.retry_policy().attempts, 3);
        assert_eq!(resolved.retry_policy().backoff, Duration::from_millis(25));
    }

    #[test]
    fn test_project_overrides_system() {
        let system = VogueConfig {
            backup_count: Some(20),
            hash_workers: Some(2),
            ..Default::default()
        };
        let project = VogueConfig {
            backup_count: Some(5),
            ..Default::default()
        };
        let resolved = resolve_layers(
            &system,
            &project,
            &EnvSettings::default(),
            &ConfigOverrides::new(),
        );
        assert_eq!(resolved.backup_count.value, 5);
        assert_eq!(resolved.backup_count.source, ValueSource::Project);
        assert_eq!(resolved.hash_workers.value, 2);
        assert_eq!(resolved.hash_workers.source, ValueSource::System);
    }

    #[test]
    fn test_cli_overrides_everything() {
        let project = VogueConfig {
            hash_workers: Some(6),
            default_author: Some("proj".into()),
            log_level: Some("info".into()),
            ..Default::default()
        };
        let env = EnvSettings {
            log: Some("debug".into()),
            log_format: None,
        };
        let overrides = ConfigOverrides::new()
            .with_hash_workers(1)
            .with_default_author("cli")
            .with_log_level("trace");
        let resolved = resolve_layers(&VogueConfig::new(), &project, &env, &overrides);
        assert_eq!(resolved.hash_workers.value, 1);
        assert_eq!(resolved.author_or("actor"), "cli");
        assert_eq!(resolved.log_level.value, "trace");
        assert_eq!(resolved.log_level.source, ValueSource::CliFlag);
    }

    #[test]
    fn test_env_overrides_files_for_logging() {
        let project = VogueConfig {
            log_level: Some("info".into()),
            log_format: Some(LogFormat::Text),
            ..Default::default()
        };
        let env = EnvSettings {
            log: Some("vogue=debug".into()),
            log_format: Some(LogFormat::Json),
        };
        let resolved = resolve_layers(&VogueConfig::new(), &project, &env, &ConfigOverrides::new());
        assert_eq!(resolved.log_level.value, "vogue=debug");
        assert_eq!(resolved.log_level.source, ValueSource::EnvVar(LOG_ENV.into()));
        assert_eq!(resolved.log_format.value, LogFormat::Json);
    }

    #[test]
    fn test_author_falls_back_to_actor() {
        let resolved = ResolvedConfig::default();
        assert_eq!(resolved.author_or("jdoe"), "jdoe");
    }

    #[test]
    fn test_entries_lists_every_key() {
        let resolved = ResolvedConfig::default();
        let keys: Vec<&str> = resolved.entries().iter().map(|(k, _, _)| *k).collect();
        assert!(keys.contains(&"backup-count"));
        assert!(keys.contains(&"publish-copy"));
        assert!(!keys.contains(&"default-author"));
    }

    #[test]
    #[serial]
    fn test_resolve_config_reads_both_files() {
        let system_dir = tempfile::TempDir::new().unwrap();
        let project_dir = tempfile::TempDir::new().unwrap();
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::set_var(crate::config::schema::CONFIG_DIR_ENV, system_dir.path()) };
        unsafe { std::env::remove_var(LOG_ENV) };

        let system = VogueConfig {
            backup_count: Some(30),
            worker_threads: Some(6),
            ..Default::default()
        };
        system.save(&system_config_path().unwrap()).unwrap();
        let project = VogueConfig {
            backup_count: Some(3),
            ..Default::default()
        };
        project.save(&project_config_path(project_dir.path())).unwrap();

        let resolved = resolve_config(Some(project_dir.path()), &ConfigOverrides::new()).unwrap();
        assert_eq!(resolved.backup_count.value, 3);
        assert_eq!(resolved.backup_count.source, ValueSource::Project);
        assert_eq!(resolved.worker_threads.value, 6);
        assert_eq!(resolved.worker_threads.source, ValueSource::System);

        unsafe { std::env::remove_var(crate::config::schema::CONFIG_DIR_ENV) };
    }

    #[test]
    #[serial]
    fn test_log_env_is_read_from_process() {
        unsafe { std::env::set_var(LOG_ENV, "vogue=trace") };
        unsafe { std::env::set_var(LOG_FORMAT_ENV, "json") };
        let env = EnvSettings::from_env();
        assert_eq!(env.log.as_deref(), Some("vogue=trace"));
        assert_eq!(env.log_format, Some(LogFormat::Json));

        unsafe { std::env::set_var(LOG_ENV, "") };
        unsafe { std::env::remove_var(LOG_FORMAT_ENV) };
        let env = EnvSettings::from_env();
        assert!(env.log.is_none());
        assert!(env.log_format.is_none());
        unsafe { std::env::remove_var(LOG_ENV) };
    }
}
