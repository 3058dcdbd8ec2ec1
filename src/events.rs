//! Change notification interfaces.
//!
//! Two collaborators are told about committed changes:
//! - [`EventSink`] - entity-changed notifications for a GUI or other observer
//! - [`RemoteBackend`] - a remote CRUD service mirrored from the local graph
//!
//! Both are implemented outside this crate. Notifications are derived after a
//! commit by diffing the previous and new graphs, so observers only ever see
//! changes that are durable.

use crate::models::{Entity, EntityGraph, EntityKind};
use crate::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;

/// How an entity changed in a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    /// Soft-deleted (or removed outright)
    Deleted,
}

/// One entity-changed notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityChanged {
    pub kind: EntityKind,
    pub id: String,
    pub change: ChangeKind,
    /// Logical operation that produced the commit, e.g. "version.publish"
    pub operation: String,
    pub actor: String,
    pub at: DateTime<Utc>,
}

/// Receiver of entity-changed notifications.
pub trait EventSink: Send + Sync {
    fn entity_changed(&self, event: &EntityChanged) -> Result<()>;
}

/// Client for a remote service holding a copy of project entities.
pub trait RemoteBackend: Send + Sync {
    /// Create or replace the remote record for an entity.
    fn upsert(&self, kind: EntityKind, id: &str, record: &serde_json::Value) -> Result<()>;

    /// Remove (or mark deleted) the remote record for an entity.
    fn delete(&self, kind: EntityKind, id: &str) -> Result<()>;

    /// Short description for logs.
    fn name(&self) -> &str;
}

/// Sink that records every event; useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<EntityChanged>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EntityChanged> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn entity_changed(&self, event: &EntityChanged) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

fn diff_arena<T: Entity + PartialEq>(
    before: &BTreeMap<String, T>,
    after: &BTreeMap<String, T>,
    out: &mut Vec<(EntityKind, String, ChangeKind)>,
) {
    for (id, new) in after {
        let change = match before.get(id) {
            None if new.is_deleted() => continue,
            None => ChangeKind::Created,
            Some(old) if old == new => continue,
            Some(old) if !old.is_deleted() && new.is_deleted() => ChangeKind::Deleted,
            Some(_) => ChangeKind::Updated,
        };
        out.push((T::KIND, id.clone(), change));
    }
    for id in before.keys().filter(|id| !after.contains_key(*id)) {
        out.push((T::KIND, id.clone(), ChangeKind::Deleted));
    }
}

/// Entity-level differences between two graphs.
pub fn diff_graphs(
    before: &EntityGraph,
    after: &EntityGraph,
    operation: &str,
    actor: &str,
) -> Vec<EntityChanged> {
    let mut changes = Vec::new();
    diff_arena(&before.folders, &after.folders, &mut changes);
    diff_arena(&before.tasks, &after.tasks, &mut changes);
    diff_arena(&before.products, &after.products, &mut changes);
    diff_arena(&before.versions, &after.versions, &mut changes);
    diff_arena(&before.representations, &after.representations, &mut changes);
    diff_arena(&before.files, &after.files, &mut changes);

    let at = Utc::now();
    changes
        .into_iter()
        .map(|(kind, id, change)| EntityChanged {
            kind,
            id,
            change,
            operation: operation.to_string(),
            actor: actor.to_string(),
            at,
        })
        .collect()
}

/// Serialized record of an entity for a remote backend.
pub fn entity_record(graph: &EntityGraph, kind: EntityKind, id: &str) -> Result<serde_json::Value> {
    let value = match kind {
        EntityKind::Folder => serde_json::to_value(graph.folder(id)?)?,
        EntityKind::Task => serde_json::to_value(graph.task(id)?)?,
        EntityKind::Product => serde_json::to_value(graph.product(id)?)?,
        EntityKind::Version => serde_json::to_value(graph.version(id)?)?,
        EntityKind::Representation => serde_json::to_value(graph.representation(id)?)?,
        EntityKind::File => serde_json::to_value(graph.file(id)?)?,
    };
    Ok(value)
}
