//! Vogue CLI - production entity tracking for creative pipelines.

use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use tracing::warn;
use vogue::cli::{
    AssetCommands, Cli, Commands, ConfigCommands, DepCommands, FolderCommands, ProductCommands,
    ProjectCommands, ShotCommands, TaskCommands, VersionCommands,
};
use vogue::commands::{self, CommandResult, TaskCreateArgs};
use vogue::concurrency::CancelToken;
use vogue::config::{
    resolve_config, ConfigOverrides, OutputFormat, Resolved, ResolvedConfig, ValueSource,
};
use vogue::layout::find_project_root;
use vogue::versions::NewVersion;
use vogue::{logging, Error, ProjectSession};

/// Everything a command needs besides its own arguments.
struct Context {
    cwd: PathBuf,
    explicit_root: Option<PathBuf>,
    project_root: Option<PathBuf>,
    config: ResolvedConfig,
    actor: String,
}

impl Context {
    /// Open the selected project.
    fn open(&self) -> Result<ProjectSession, Error> {
        let root = self.project_root.as_deref().ok_or(Error::NotInitialized)?;
        ProjectSession::open(root, self.config.clone(), &self.actor)
    }
}

fn main() {
    let cli = Cli::parse();
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    // Project root: -C/--project flag > VOGUE_PROJECT env > nearest ancestor with a snapshot
    let project_root = match &cli.project_path {
        Some(path) => Some(path.clone()),
        None => find_project_root(&cwd),
    };

    let mut overrides = ConfigOverrides::new();
    if let Some(level) = &cli.log_level {
        overrides = overrides.with_log_level(level);
    }
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    let config = match resolve_config(project_root.as_deref(), &overrides) {
        Ok(config) => config,
        Err(e) => fail(&e, cli.human_readable),
    };
    let human = config.output_format.value == OutputFormat::Human;
    if let Err(e) = logging::init_logging(&config) {
        fail(&e, human);
    }

    let ctx = Context {
        cwd,
        explicit_root: cli.project_path,
        project_root,
        config,
        actor: resolve_actor(cli.actor),
    };

    if let Err(e) = run_command(cli.command, &ctx, human) {
        fail(&e, human);
    }
}

/// Acting user: --actor flag > VOGUE_USER env > login name.
fn resolve_actor(explicit: Option<String>) -> String {
    explicit
        .filter(|a| !a.trim().is_empty())
        .or_else(|| env::var("USER").ok().filter(|u| !u.is_empty()))
        .or_else(|| env::var("USERNAME").ok().filter(|u| !u.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn fail(error: &Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", error);
    } else {
        let err = serde_json::json!({
            "error": error.to_string(),
            "kind": error.kind().to_string(),
        });
        eprintln!("{}", err);
    }
    process::exit(1);
}

fn output<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

fn run_command(command: Commands, ctx: &Context, human: bool) -> Result<(), Error> {
    match command {
        Commands::Project { command } => match command {
            ProjectCommands::Init {
                name,
                fps,
                resolution,
                departments,
            } => {
                let root = ctx.explicit_root.as_deref().unwrap_or(&ctx.cwd);
                std::fs::create_dir_all(root).map_err(|e| Error::IoAt {
                    path: root.to_path_buf(),
                    source: e,
                })?;
                let result = commands::project_init(
                    root,
                    &name,
                    fps,
                    &resolution,
                    departments,
                    ctx.config.clone(),
                    &ctx.actor,
                )?;
                output(&result, human);
            }
            ProjectCommands::Info => {
                let session = ctx.open()?;
                output(&commands::project_info(&session), human);
            }
            ProjectCommands::Discover { roots } => {
                output(&commands::project_discover(&roots), human);
            }
        },

        Commands::Folder { command } => {
            let session = ctx.open()?;
            match command {
                FolderCommands::Create {
                    name,
                    folder_type,
                    parent,
                } => {
                    let result =
                        commands::folder_create(&session, &name, &folder_type, parent.as_deref())?;
                    output(&result, human);
                }
                FolderCommands::List { parent, recursive } => {
                    let result = commands::folder_list(&session, parent.as_deref(), recursive)?;
                    output(&result, human);
                }
                FolderCommands::Delete { id } => {
                    output(&commands::folder_delete(&session, &id)?, human);
                }
            }
        }

        Commands::Asset { command } => {
            let session = ctx.open()?;
            match command {
                AssetCommands::Create {
                    name,
                    asset_type,
                    parent,
                } => {
                    let result =
                        commands::asset_create(&session, &name, &asset_type, parent.as_deref())?;
                    output(&result, human);
                }
            }
        }

        Commands::Shot { command } => {
            let session = ctx.open()?;
            match command {
                ShotCommands::Create { sequence, shot } => {
                    output(&commands::shot_create(&session, &sequence, &shot)?, human);
                }
            }
        }

        Commands::Product { command } => {
            let session = ctx.open()?;
            match command {
                ProductCommands::Create {
                    folder_id,
                    name,
                    product_type,
                } => {
                    let result =
                        commands::product_create(&session, &folder_id, &name, &product_type)?;
                    output(&result, human);
                }
                ProductCommands::List { folder } => {
                    output(&commands::product_list(&session, folder.as_deref())?, human);
                }
                ProductCommands::Delete { id } => {
                    output(&commands::product_delete(&session, &id)?, human);
                }
            }
        }

        Commands::Version { command } => {
            let session = ctx.open()?;
            match command {
                VersionCommands::Create {
                    product_id,
                    comment,
                    author,
                    task,
                    dcc,
                } => {
                    let new = NewVersion {
                        author,
                        comment,
                        task_id: task,
                        dcc_app: dcc,
                    };
                    output(&commands::version_create(&session, &product_id, new)?, human);
                }
                VersionCommands::List { product_id } => {
                    output(&commands::version_list(&session, &product_id)?, human);
                }
                VersionCommands::AddFile {
                    version_id,
                    path,
                    format,
                } => {
                    let path = absolutize(&ctx.cwd, &path);
                    let result = commands::version_add_file(
                        &session,
                        &version_id,
                        &path,
                        format.as_deref(),
                    )?;
                    output(&result, human);
                }
                VersionCommands::Publish { id } => {
                    output(&commands::version_publish(&session, &id)?, human);
                }
                VersionCommands::Archive { id } => {
                    output(&commands::version_archive(&session, &id)?, human);
                }
                VersionCommands::Rollback {
                    product_id,
                    version,
                } => {
                    let result = commands::version_rollback(&session, &product_id, version)?;
                    output(&result, human);
                }
                VersionCommands::Delete { id } => {
                    output(&commands::version_delete(&session, &id)?, human);
                }
            }
        }

        Commands::Task { command } => {
            let session = ctx.open()?;
            match command {
                TaskCommands::Create {
                    folder_id,
                    name,
                    task_type,
                    assignee,
                    priority,
                    due,
                    depends_on,
                } => {
                    let args = TaskCreateArgs {
                        folder_id,
                        name,
                        task_type,
                        assignee,
                        priority,
                        due,
                        depends_on,
                    };
                    output(&commands::task_create(&session, args)?, human);
                }
                TaskCommands::List {
                    folder,
                    assignee,
                    status,
                } => {
                    let result =
                        commands::task_list(&session, folder, assignee, status.as_deref())?;
                    output(&result, human);
                }
                TaskCommands::Assign { id, user } => {
                    output(&commands::task_assign(&session, &id, user.as_deref())?, human);
                }
                TaskCommands::Status { id, status } => {
                    output(&commands::task_status(&session, &id, &status)?, human);
                }
                TaskCommands::Delete { id } => {
                    output(&commands::task_delete(&session, &id)?, human);
                }
                TaskCommands::Dep { command } => match command {
                    DepCommands::Add {
                        task_id,
                        depends_on,
                    } => {
                        output(&commands::dep_add(&session, &task_id, &depends_on)?, human);
                    }
                    DepCommands::Rm {
                        task_id,
                        depends_on,
                    } => {
                        output(&commands::dep_rm(&session, &task_id, &depends_on)?, human);
                    }
                },
                TaskCommands::Ready => {
                    output(&commands::task_ready(&session)?, human);
                }
                TaskCommands::Blocked => {
                    output(&commands::task_blocked(&session)?, human);
                }
            }
        }

        Commands::Scan { jobs } => {
            let mut config = ctx.config.clone();
            if let Some(jobs) = jobs {
                config.hash_workers = Resolved::new(jobs.max(1), ValueSource::CliFlag);
            }
            let root = ctx.project_root.as_deref().ok_or(Error::NotInitialized)?;
            let session = ProjectSession::open(root, config, &ctx.actor)?;

            let token = CancelToken::new();
            let handler_token = token.clone();
            if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
                warn!(error = %e, "Failed to install Ctrl-C handler; scan cannot be interrupted");
            }
            output(&commands::scan(&session, &token)?, human);
        }

        Commands::Verify { file_id } => {
            let session = ctx.open()?;
            output(&commands::verify(&session, &file_id)?, human);
        }

        Commands::Show { id } => {
            let session = ctx.open()?;
            output(&commands::show(&session, &id)?, human);
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                output(&commands::config_show(&ctx.config), human);
            }
            ConfigCommands::Set { key, value, system } => {
                let target = if system {
                    None
                } else {
                    Some(ctx.project_root.as_deref().ok_or(Error::NotInitialized)?)
                };
                output(&commands::config_set(target, &key, &value)?, human);
            }
        },
    }
    Ok(())
}

/// Resolve a user-supplied path against the working directory.
fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
