//! CLI argument definitions for Vogue.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Vogue - production entity tracking for creative pipelines.
///
/// Start with `vg project init <name>` in an empty directory, then create
/// assets, shots, tasks and products. `vg scan` picks up working files.
#[derive(Parser, Debug)]
#[command(name = "vg")]
#[command(author, version, about = "Track assets, shots, tasks and versions of a creative project", long_about = None)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VG_GIT_COMMIT"),
    " built ",
    env!("VG_BUILD_TIMESTAMP"),
    ")"
))]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if vg was started in <path> instead of the current directory.
    /// Bypasses project root detection. Can also be set via VOGUE_PROJECT.
    #[arg(short = 'C', long = "project", global = true, env = "VOGUE_PROJECT")]
    pub project_path: Option<PathBuf>,

    /// User recorded as creator/updater of changed entities
    #[arg(long, global = true, env = "VOGUE_USER")]
    pub actor: Option<String>,

    /// Override the configured log level (e.g. debug, vogue=trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Project setup and overview
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Generic folder management (episodes, sequences, shots, assets)
    Folder {
        #[command(subcommand)]
        command: FolderCommands,
    },

    /// Asset shortcuts
    Asset {
        #[command(subcommand)]
        command: AssetCommands,
    },

    /// Shot shortcuts
    Shot {
        #[command(subcommand)]
        command: ShotCommands,
    },

    /// Product management
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },

    /// Version allocation, publishing and rollback
    Version {
        #[command(subcommand)]
        command: VersionCommands,
    },

    /// Task management and dependencies
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Reconcile working files on disk with the project (Ctrl-C cancels)
    Scan {
        /// Number of hashing threads (overrides hash-workers)
        #[arg(short = 'j', long)]
        jobs: Option<usize>,
    },

    /// Re-hash a tracked file and compare it with its record
    Verify {
        /// File ID (e.g., fil-a1b2c3d4)
        file_id: String,
    },

    /// Show any entity by ID (auto-detects type)
    Show {
        /// Entity ID (e.g., fld-a1b2c3d4, ver-0f1e2d3c)
        id: String,
    },

    /// Configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a new project in the target directory
    Init {
        /// Project name
        name: String,

        /// Frame rate
        #[arg(long, default_value = "24")]
        fps: u32,

        /// Resolution as WIDTHxHEIGHT
        #[arg(long, default_value = "1920x1080")]
        resolution: String,

        /// Department names (repeatable; defaults to the standard set)
        #[arg(long = "department")]
        departments: Vec<String>,
    },

    /// Show project settings and entity counts
    Info,

    /// List projects found directly under library roots
    Discover {
        /// Library root directories
        #[arg(required = true)]
        roots: Vec<PathBuf>,
    },
}

/// Folder subcommands
#[derive(Subcommand, Debug)]
pub enum FolderCommands {
    /// Create a folder
    Create {
        /// Folder name
        name: String,

        /// Folder type (asset, shot, sequence, episode)
        #[arg(short = 't', long = "type", default_value = "asset")]
        folder_type: String,

        /// Parent folder ID (omit for a hierarchy root)
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// List folders
    List {
        /// Only direct children of this folder
        #[arg(short, long)]
        parent: Option<String>,

        /// Walk the whole tree depth-first
        #[arg(short, long)]
        recursive: bool,
    },

    /// Soft-delete an empty folder
    Delete {
        /// Folder ID
        id: String,
    },
}

/// Asset subcommands
#[derive(Subcommand, Debug)]
pub enum AssetCommands {
    /// Create an asset folder
    Create {
        /// Asset name
        name: String,

        /// Asset category (e.g. Characters, Props, Environments)
        #[arg(short = 't', long = "type", default_value = "Props")]
        asset_type: String,

        /// Parent folder ID
        #[arg(short, long)]
        parent: Option<String>,
    },
}

/// Shot subcommands
#[derive(Subcommand, Debug)]
pub enum ShotCommands {
    /// Create a shot, creating its sequence if needed
    Create {
        /// Sequence name
        sequence: String,

        /// Shot name
        shot: String,
    },
}

/// Product subcommands
#[derive(Subcommand, Debug)]
pub enum ProductCommands {
    /// Create a product on a folder
    Create {
        /// Folder ID
        folder_id: String,

        /// Product name
        name: String,

        /// Product type (e.g. model, rig, workfile)
        #[arg(short = 't', long = "type", default_value = "workfile")]
        product_type: String,
    },

    /// List products
    List {
        /// Only products of this folder
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Soft-delete a product with no live versions
    Delete {
        /// Product ID
        id: String,
    },
}

/// Version subcommands
#[derive(Subcommand, Debug)]
pub enum VersionCommands {
    /// Allocate the next version of a product
    Create {
        /// Product ID
        product_id: String,

        /// Version comment
        #[arg(short = 'm', long, default_value = "")]
        comment: String,

        /// Author (defaults to default-author, then the acting user)
        #[arg(short, long)]
        author: Option<String>,

        /// Task the version was produced for
        #[arg(long)]
        task: Option<String>,

        /// DCC application id (e.g. maya, blender)
        #[arg(long)]
        dcc: Option<String>,
    },

    /// List live versions of a product
    List {
        /// Product ID
        product_id: String,
    },

    /// Attach a file to a Draft version
    AddFile {
        /// Version ID
        version_id: String,

        /// File path (absolute, or relative to the project root)
        path: PathBuf,

        /// Representation format (defaults to the file extension)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Run the publish pipeline on a Draft version
    Publish {
        /// Version ID
        id: String,
    },

    /// Archive a Published version
    Archive {
        /// Version ID
        id: String,
    },

    /// Point a product's current version at an earlier published version
    Rollback {
        /// Product ID
        product_id: String,

        /// Version number to make current
        version: u32,
    },

    /// Soft-delete a Draft version
    Delete {
        /// Version ID
        id: String,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a new task
    Create {
        /// Folder ID
        folder_id: String,

        /// Task name
        name: String,

        /// Task type or department (e.g. modeling)
        #[arg(short = 't', long = "type", default_value = "generic")]
        task_type: String,

        /// Assignee
        #[arg(short, long)]
        assignee: Option<String>,

        /// Priority (1-5, 1 is most urgent)
        #[arg(short, long)]
        priority: Option<u8>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Task IDs this task depends on (repeatable)
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,
    },

    /// List tasks
    List {
        /// Filter by folder
        #[arg(short, long)]
        folder: Option<String>,

        /// Filter by assignee
        #[arg(short, long)]
        assignee: Option<String>,

        /// Filter by status (not_started, in_progress, blocked, done)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Assign a task (omit the user to unassign)
    Assign {
        /// Task ID
        id: String,

        /// User to assign
        user: Option<String>,
    },

    /// Change a task's status
    Status {
        /// Task ID
        id: String,

        /// New status (not_started, in_progress, blocked, done)
        status: String,
    },

    /// Soft-delete a task; its dependents stop waiting on it
    Delete {
        /// Task ID
        id: String,
    },

    /// Dependency management
    Dep {
        #[command(subcommand)]
        command: DepCommands,
    },

    /// Tasks with no unfinished dependencies
    Ready,

    /// Tasks waiting on unfinished dependencies
    Blocked,
}

/// Task dependency subcommands
#[derive(Subcommand, Debug)]
pub enum DepCommands {
    /// Make a task depend on another
    Add {
        /// Dependent task ID
        task_id: String,

        /// Task it depends on
        depends_on: String,
    },

    /// Remove a dependency
    Rm {
        /// Dependent task ID
        task_id: String,

        /// Task it depends on
        depends_on: String,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration with value sources
    Show,

    /// Set a key in the project config (or the system config with --system)
    Set {
        /// Config key (e.g. hash-workers, publish-copy)
        key: String,

        /// New value
        value: String,

        /// Write the system config instead of the project config
        #[arg(long)]
        system: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_nested_dependency_command() {
        let cli = Cli::try_parse_from(["vg", "-H", "task", "dep", "add", "tsk-a", "tsk-b"]).unwrap();
        assert!(cli.human_readable);
        match cli.command {
            Commands::Task {
                command: TaskCommands::Dep {
                    command: DepCommands::Add { task_id, depends_on },
                },
            } => {
                assert_eq!(task_id, "tsk-a");
                assert_eq!(depends_on, "tsk-b");
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }
}
