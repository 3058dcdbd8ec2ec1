//! Task graph management: assignment, status and dependencies.
//!
//! Dependencies form a DAG over tasks. Every edge insertion first checks
//! that the new dependency cannot reach back to the dependent task, so the
//! committed graph is acyclic at all times.

use crate::models::graph::require_live;
use crate::models::{
    validate_name, EntityKind, Task, TaskStatus, DEFAULT_PRIORITY, MAX_PRIORITY, MIN_PRIORITY,
};
use crate::session::ProjectSession;
use crate::{Error, Result};
use chrono::NaiveDate;
use tracing::info;

/// Parameters for a new task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub folder_id: String,
    pub name: String,
    pub task_type: String,
    pub assignee: Option<String>,
    pub priority: Option<u8>,
    pub due_date: Option<NaiveDate>,
    pub dependencies: Vec<String>,
}

impl NewTask {
    pub fn new(
        folder_id: impl Into<String>,
        name: impl Into<String>,
        task_type: impl Into<String>,
    ) -> Self {
        Self {
            folder_id: folder_id.into(),
            name: name.into(),
            task_type: task_type.into(),
            ..Default::default()
        }
    }
}

/// Filter for [`TaskManager::list`].
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub folder_id: Option<String>,
    pub assignee: Option<String>,
    pub status: Option<TaskStatus>,
}

fn check_priority(priority: u8) -> Result<()> {
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(Error::Validation(format!(
            "Priority must be {}-{}, got {}",
            MIN_PRIORITY, MAX_PRIORITY, priority
        )));
    }
    Ok(())
}

/// Operations over the task dependency graph.
#[derive(Debug, Clone)]
pub struct TaskManager {
    session: ProjectSession,
}

impl TaskManager {
    pub fn new(session: ProjectSession) -> Self {
        Self { session }
    }

    pub fn create_task(&self, new: NewTask) -> Result<Task> {
        validate_name(EntityKind::Task, &new.name)?;
        let priority = new.priority.unwrap_or(DEFAULT_PRIORITY);
        check_priority(priority)?;
        let actor = self.session.actor().to_string();

        let task = self.session.mutate("task.create", |g| {
            require_live(g.folder(&new.folder_id)?)?;
            for dep in &new.dependencies {
                require_live(g.task(dep)?)?;
            }

            let mut task = Task::new(new.name.clone(), new.task_type.clone(), new.folder_id.clone(), &actor);
            task.assignee = new.assignee.clone();
            task.priority = priority;
            task.due_date = new.due_date;
            task.dependencies = new.dependencies.iter().cloned().collect();
            g.tasks.insert(task.base.id.clone(), task.clone());
            Ok(task)
        })?;

        info!(task = %task.base.id, name = %task.base.name, "Created task");
        Ok(task)
    }

    /// Set or clear the assignee.
    pub fn assign(&self, task_id: &str, assignee: Option<&str>) -> Result<Task> {
        let actor = self.session.actor().to_string();
        self.session.mutate("task.assign", |g| {
            require_live(g.task(task_id)?)?;
            let task = g.task_mut(task_id)?;
            task.assignee = assignee.map(String::from);
            task.base.touch(&actor);
            Ok(task.clone())
        })
    }

    pub fn set_priority(&self, task_id: &str, priority: u8) -> Result<Task> {
        check_priority(priority)?;
        let actor = self.session.actor().to_string();
        self.session.mutate("task.priority", |g| {
            require_live(g.task(task_id)?)?;
            let task = g.task_mut(task_id)?;
            task.priority = priority;
            task.base.touch(&actor);
            Ok(task.clone())
        })
    }

    /// Change a task's status.
    ///
    /// Any transition is allowed except moving to Done while a transitive
    /// dependency is unfinished.
    pub fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<Task> {
        let actor = self.session.actor().to_string();
        self.session.mutate("task.status", |g| {
            let current = require_live(g.task(task_id)?)?.status;
            if status == TaskStatus::Done {
                let blockers = g.unfinished_dependencies(task_id)?;
                if !blockers.is_empty() {
                    let ids: Vec<&str> = blockers.iter().map(|t| t.base.id.as_str()).collect();
                    return Err(Error::InvalidTransition {
                        entity_id: task_id.to_string(),
                        from: current.to_string(),
                        to: format!("{} (blocked by {})", status, ids.join(", ")),
                    });
                }
            }
            let task = g.task_mut(task_id)?;
            task.status = status;
            task.base.touch(&actor);
            Ok(task.clone())
        })
    }

    /// Make `task_id` depend on `depends_on_id`.
    ///
    /// Fails with `DependencyCycle` if `task_id` is reachable from
    /// `depends_on_id`; the graph is left unchanged on any failure.
    pub fn add_dependency(&self, task_id: &str, depends_on_id: &str) -> Result<()> {
        // A self edge is the shortest cycle
        if task_id == depends_on_id {
            return Err(Error::DependencyCycle {
                task_id: task_id.to_string(),
                depends_on_id: depends_on_id.to_string(),
            });
        }
        let actor = self.session.actor().to_string();

        self.session.mutate("task.dependency.add", |g| {
            require_live(g.task(task_id)?)?;
            require_live(g.task(depends_on_id)?)?;
            if g.task(task_id)?.dependencies.contains(depends_on_id) {
                return Err(Error::Validation(format!(
                    "Dependency already exists: {} -> {}",
                    task_id, depends_on_id
                )));
            }
            if g.would_create_cycle(task_id, depends_on_id) {
                return Err(Error::DependencyCycle {
                    task_id: task_id.to_string(),
                    depends_on_id: depends_on_id.to_string(),
                });
            }
            let task = g.task_mut(task_id)?;
            task.dependencies.insert(depends_on_id.to_string());
            task.base.touch(&actor);
            Ok(())
        })?;

        info!(task = task_id, depends_on = depends_on_id, "Added dependency");
        Ok(())
    }

    pub fn remove_dependency(&self, task_id: &str, depends_on_id: &str) -> Result<()> {
        let actor = self.session.actor().to_string();
        self.session.mutate("task.dependency.remove", |g| {
            let task = g.task_mut(task_id)?;
            if !task.dependencies.remove(depends_on_id) {
                return Err(Error::NotFound(format!(
                    "dependency {} -> {}",
                    task_id, depends_on_id
                )));
            }
            task.base.touch(&actor);
            Ok(())
        })
    }

    /// Soft-delete a task. Dependents stop being blocked by it.
    pub fn delete_task(&self, task_id: &str) -> Result<()> {
        let actor = self.session.actor().to_string();
        self.session.mutate("task.delete", |g| {
            require_live(g.task(task_id)?)?;
            let task = g.task_mut(task_id)?;
            task.base.deleted = true;
            task.base.touch(&actor);
            Ok(())
        })
    }

    /// Whether any transitive dependency is not Done.
    pub fn is_blocked(&self, task_id: &str) -> Result<bool> {
        Ok(!self.session.snapshot().unfinished_dependencies(task_id)?.is_empty())
    }

    /// Unfinished transitive dependencies of a task.
    pub fn blockers(&self, task_id: &str) -> Result<Vec<Task>> {
        let graph = self.session.snapshot();
        Ok(graph
            .unfinished_dependencies(task_id)?
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn get(&self, task_id: &str) -> Result<Task> {
        Ok(self.session.snapshot().task(task_id)?.clone())
    }

    /// Live tasks matching `filter`, by priority then name.
    pub fn list(&self, filter: &TaskFilter) -> Vec<Task> {
        let graph = self.session.snapshot();
        let mut tasks: Vec<Task> = graph
            .tasks
            .values()
            .filter(|t| !t.base.deleted)
            .filter(|t| filter.folder_id.as_ref().is_none_or(|f| &t.folder_id == f))
            .filter(|t| {
                filter
                    .assignee
                    .as_ref()
                    .is_none_or(|a| t.assignee.as_ref() == Some(a))
            })
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.base.name.cmp(&b.base.name))
        });
        tasks
    }

    /// Live, unfinished tasks whose dependencies are all Done.
    pub fn ready_tasks(&self) -> Result<Vec<Task>> {
        let graph = self.session.snapshot();
        let mut ready = Vec::new();
        for task in self.list(&TaskFilter::default()) {
            if matches!(task.status, TaskStatus::Done | TaskStatus::Blocked) {
                continue;
            }
            if graph.unfinished_dependencies(&task.base.id)?.is_empty() {
                ready.push(task);
            }
        }
        Ok(ready)
    }

    /// Live, unfinished tasks waiting on at least one dependency.
    pub fn blocked_tasks(&self) -> Result<Vec<Task>> {
        let graph = self.session.snapshot();
        let mut blocked = Vec::new();
        for task in self.list(&TaskFilter::default()) {
            if task.status == TaskStatus::Done {
                continue;
            }
            if !graph.unfinished_dependencies(&task.base.id)?.is_empty() {
                blocked.push(task);
            }
        }
        Ok(blocked)
    }
}
