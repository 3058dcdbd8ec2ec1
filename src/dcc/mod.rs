//! DCC (digital content creation) application integration.
//!
//! The core talks to creative applications only through the [`DccBridge`]
//! trait. Concrete adapters live outside this crate and are registered at
//! runtime in a [`DccRegistry`] under an application id such as `maya`.

use crate::models::{EntityGraph, Entity};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Static description of a known application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DccApp {
    pub id: &'static str,
    pub display_name: &'static str,
    /// Scene extensions, preferred first
    pub extensions: &'static [&'static str],
    pub mime_type: &'static str,
}

/// Applications with built-in descriptors.
pub const KNOWN_APPS: &[DccApp] = &[
    DccApp {
        id: "maya",
        display_name: "Autodesk Maya",
        extensions: &["ma", "mb"],
        mime_type: "application/x-maya",
    },
    DccApp {
        id: "blender",
        display_name: "Blender",
        extensions: &["blend"],
        mime_type: "application/x-blender",
    },
    DccApp {
        id: "houdini",
        display_name: "SideFX Houdini",
        extensions: &["hip", "hipnc"],
        mime_type: "application/x-houdini",
    },
    DccApp {
        id: "nuke",
        display_name: "Foundry Nuke",
        extensions: &["nk"],
        mime_type: "application/x-nuke",
    },
    DccApp {
        id: "3dsmax",
        display_name: "Autodesk 3ds Max",
        extensions: &["max"],
        mime_type: "application/x-3dsmax",
    },
    DccApp {
        id: "cinema4d",
        display_name: "Maxon Cinema 4D",
        extensions: &["c4d"],
        mime_type: "application/x-cinema4d",
    },
];

impl DccApp {
    pub fn by_id(id: &str) -> Option<&'static DccApp> {
        let id = id.to_lowercase();
        KNOWN_APPS.iter().find(|app| app.id == id)
    }

    pub fn for_extension(ext: &str) -> Option<&'static DccApp> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        KNOWN_APPS
            .iter()
            .find(|app| app.extensions.contains(&ext.as_str()))
    }

    pub fn default_extension(&self) -> &'static str {
        self.extensions.first().copied().unwrap_or("scene")
    }
}

/// MIME type for a file extension.
pub fn mime_type_for(ext: &str) -> &'static str {
    let ext = ext.trim_start_matches('.').to_lowercase();
    if let Some(app) = DccApp::for_extension(&ext) {
        return app.mime_type;
    }
    match ext.as_str() {
        "exr" => "image/x-exr",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "tif" | "tiff" => "image/tiff",
        "abc" => "application/x-alembic",
        "usd" | "usda" | "usdc" | "usdz" => "model/vnd.usd",
        "fbx" => "application/x-fbx",
        "obj" => "model/obj",
        "mov" => "video/quicktime",
        "mp4" => "video/mp4",
        "json" => "application/json",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// What an application needs to know when launched for a piece of work.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectContext {
    pub project_root: PathBuf,
    pub project_name: String,
    pub fps: u32,
    pub resolution: [u32; 2],
    pub folder_path: Option<String>,
    pub task_name: Option<String>,
}

impl ProjectContext {
    /// Build a context from a graph, optionally focused on a folder and task.
    pub fn from_graph(
        root: &Path,
        graph: &EntityGraph,
        folder_id: Option<&str>,
        task_id: Option<&str>,
    ) -> Result<Self> {
        let folder_path = folder_id.map(|id| graph.folder_path(id)).transpose()?;
        let task_name = task_id
            .map(|id| graph.task(id).map(|t| t.name().to_string()))
            .transpose()?;
        Ok(Self {
            project_root: root.to_path_buf(),
            project_name: graph.project.name.clone(),
            fps: graph.project.fps,
            resolution: graph.project.resolution,
            folder_path,
            task_name,
        })
    }
}

/// Capability contract every application adapter implements.
pub trait DccBridge: Send {
    /// Application id, matching a [`DccApp`] id for known applications.
    fn app_id(&self) -> &str;

    fn connect(&mut self) -> bool;

    fn launch(&mut self, context: &ProjectContext) -> bool;

    /// Path of the open scene, if it has one.
    fn current_scene(&self) -> Option<PathBuf>;

    fn save_scene(&mut self) -> bool;

    fn export_selection(&mut self, path: &Path) -> bool;

    fn import_file(&mut self, path: &Path) -> bool;
}

type BridgeFactory = Box<dyn Fn() -> Box<dyn DccBridge> + Send + Sync>;

/// Runtime registry of adapters keyed by application id.
#[derive(Default)]
pub struct DccRegistry {
    factories: BTreeMap<String, BridgeFactory>,
}

fn bridge_error(app: &str, reason: impl Into<String>) -> Error {
    Error::Dcc {
        app: app.to_string(),
        reason: reason.into(),
    }
}

impl DccRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, app_id: &str, factory: F)
    where
        F: Fn() -> Box<dyn DccBridge> + Send + Sync + 'static,
    {
        self.factories.insert(app_id.to_lowercase(), Box::new(factory));
    }

    /// Registered application ids.
    pub fn apps(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instantiate the adapter for `app_id`.
    pub fn create(&self, app_id: &str) -> Result<Box<dyn DccBridge>> {
        let factory = self
            .factories
            .get(&app_id.to_lowercase())
            .ok_or_else(|| bridge_error(app_id, "no adapter registered"))?;
        Ok(factory())
    }

    /// Instantiate, connect and launch an adapter.
    pub fn launch(&self, app_id: &str, context: &ProjectContext) -> Result<Box<dyn DccBridge>> {
        let mut bridge = self.create(app_id)?;
        if !bridge.connect() {
            return Err(bridge_error(app_id, "connect failed"));
        }
        if !bridge.launch(context) {
            return Err(bridge_error(app_id, "launch failed"));
        }
        Ok(bridge)
    }
}

/// Save the open scene and return its path.
pub(crate) fn save_current_scene(bridge: &mut dyn DccBridge) -> Result<PathBuf> {
    if !bridge.save_scene() {
        return Err(bridge_error(bridge.app_id(), "save failed"));
    }
    bridge
        .current_scene()
        .ok_or_else(|| bridge_error(bridge.app_id(), "no current scene"))
}
