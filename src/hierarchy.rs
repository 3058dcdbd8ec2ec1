//! Folder hierarchy and product management.
//!
//! Folders form a tree (episodes, sequences, shots, assets). Products hang
//! off folders and own the versions managed by [`crate::versions`].

use crate::models::graph::require_live;
use crate::models::{
    validate_name, EntityGraph, EntityKind, Folder, FolderType, Product,
};
use crate::session::ProjectSession;
use crate::{Error, Result};
use serde::Serialize;
use tracing::info;

/// Attribute key recording an asset's category (e.g. "Characters").
pub const ASSET_TYPE_ATTR: &str = "asset_type";

/// Folder plus its derived hierarchy path.
#[derive(Debug, Clone, Serialize)]
pub struct FolderView {
    #[serde(flatten)]
    pub folder: Folder,
    pub path: String,
}

/// Creates, lists and soft-deletes folders and products.
#[derive(Debug, Clone)]
pub struct HierarchyManager {
    session: ProjectSession,
}

fn check_sibling_name(
    graph: &EntityGraph,
    parent_id: Option<&str>,
    name: &str,
) -> Result<()> {
    let taken = graph.folders.values().any(|f| {
        !f.base.deleted && f.parent_id.as_deref() == parent_id && f.base.name == name
    });
    if taken {
        return Err(Error::Validation(format!(
            "A folder named '{}' already exists here",
            name
        )));
    }
    Ok(())
}

fn insert_folder(
    graph: &mut EntityGraph,
    name: &str,
    folder_type: FolderType,
    parent_id: Option<&str>,
    actor: &str,
) -> Result<Folder> {
    validate_name(EntityKind::Folder, name)?;
    if let Some(parent_id) = parent_id {
        require_live(graph.folder(parent_id)?)?;
    }
    check_sibling_name(graph, parent_id, name)?;

    let folder = Folder::new(name, folder_type, parent_id.map(String::from), actor);
    graph.folders.insert(folder.base.id.clone(), folder.clone());
    Ok(folder)
}

impl HierarchyManager {
    pub fn new(session: ProjectSession) -> Self {
        Self { session }
    }

    /// Create a folder under `parent_id`, or a hierarchy root.
    pub fn create_folder(
        &self,
        name: &str,
        folder_type: FolderType,
        parent_id: Option<&str>,
    ) -> Result<Folder> {
        let actor = self.session.actor().to_string();
        let folder = self.session.mutate("folder.create", |g| {
            insert_folder(g, name, folder_type, parent_id, &actor)
        })?;
        info!(folder = %folder.base.id, name, "Created folder");
        Ok(folder)
    }

    /// Create an asset folder, recording its category in the attributes.
    pub fn create_asset(
        &self,
        name: &str,
        asset_type: &str,
        parent_id: Option<&str>,
    ) -> Result<Folder> {
        if asset_type.trim().is_empty() {
            return Err(Error::Validation("Asset type cannot be empty".to_string()));
        }
        let actor = self.session.actor().to_string();
        self.session.mutate("asset.create", |g| {
            let mut folder = insert_folder(g, name, FolderType::Asset, parent_id, &actor)?;
            folder
                .base
                .attributes
                .insert(ASSET_TYPE_ATTR.to_string(), serde_json::json!(asset_type));
            g.folders.insert(folder.base.id.clone(), folder.clone());
            Ok(folder)
        })
    }

    /// Create `shot` under the root sequence `sequence`, creating the sequence if needed.
    pub fn create_shot(&self, sequence: &str, shot: &str) -> Result<Folder> {
        let actor = self.session.actor().to_string();
        self.session.mutate("shot.create", |g| {
            let existing = g
                .root_folders()
                .into_iter()
                .find(|f| f.base.name == sequence)
                .map(|f| (f.base.id.clone(), f.folder_type));
            let sequence_id = match existing {
                Some((id, FolderType::Sequence)) => id,
                Some((_, other)) => {
                    return Err(Error::Validation(format!(
                        "Root folder '{}' is a {}, not a sequence",
                        sequence, other
                    )));
                }
                None => insert_folder(g, sequence, FolderType::Sequence, None, &actor)?
                    .base
                    .id,
            };
            insert_folder(g, shot, FolderType::Shot, Some(&sequence_id), &actor)
        })
    }

    /// Soft-delete a folder that has no live children, tasks or products.
    pub fn delete_folder(&self, folder_id: &str) -> Result<()> {
        let actor = self.session.actor().to_string();
        self.session.mutate("folder.delete", |g| {
            require_live(g.folder(folder_id)?)?;
            let children = g.children_of(folder_id).len();
            let tasks = g.tasks_in(folder_id).len();
            let products = g.products_in(folder_id).len();
            if children + tasks + products > 0 {
                return Err(Error::Validation(format!(
                    "Folder {} still has {} children, {} tasks and {} products",
                    folder_id, children, tasks, products
                )));
            }
            let folder = g.folder_mut(folder_id)?;
            folder.base.deleted = true;
            folder.base.touch(&actor);
            Ok(())
        })
    }

    /// Live folders under `parent_id` (roots when `None`), with their paths.
    pub fn list_folders(&self, parent_id: Option<&str>) -> Result<Vec<FolderView>> {
        let graph = self.session.snapshot();
        let folders = match parent_id {
            Some(id) => {
                graph.folder(id)?;
                graph.children_of(id)
            }
            None => graph.root_folders(),
        };
        folders
            .into_iter()
            .map(|f| -> Result<FolderView> {
                Ok(FolderView {
                    path: graph.folder_path(&f.base.id)?,
                    folder: f.clone(),
                })
            })
            .collect()
    }

    /// Every live folder in depth-first order, with its path.
    pub fn walk(&self) -> Result<Vec<FolderView>> {
        let graph = self.session.snapshot();
        let mut out = Vec::new();
        let mut stack: Vec<&Folder> = graph.root_folders().into_iter().rev().collect();
        while let Some(folder) = stack.pop() {
            out.push(FolderView {
                path: graph.folder_path(&folder.base.id)?,
                folder: folder.clone(),
            });
            stack.extend(graph.children_of(&folder.base.id).into_iter().rev());
        }
        Ok(out)
    }

    /// Create a product on a folder. Names are unique per folder.
    pub fn create_product(
        &self,
        folder_id: &str,
        name: &str,
        product_type: &str,
    ) -> Result<Product> {
        validate_name(EntityKind::Product, name)?;
        if product_type.trim().is_empty() {
            return Err(Error::Validation("Product type cannot be empty".to_string()));
        }
        let actor = self.session.actor().to_string();
        let product = self.session.mutate("product.create", |g| {
            require_live(g.folder(folder_id)?)?;
            if g.product_by_name(folder_id, name).is_some() {
                return Err(Error::Validation(format!(
                    "Product '{}' already exists on folder {}",
                    name, folder_id
                )));
            }
            let product = Product::new(name, product_type, folder_id, &actor);
            g.products.insert(product.base.id.clone(), product.clone());
            Ok(product)
        })?;
        info!(product = %product.base.id, name, "Created product");
        Ok(product)
    }

    /// Soft-delete a product with no live versions.
    pub fn delete_product(&self, product_id: &str) -> Result<()> {
        let actor = self.session.actor().to_string();
        self.session.mutate("product.delete", |g| {
            require_live(g.product(product_id)?)?;
            let live = g
                .versions_of(product_id)
                .iter()
                .filter(|v| !v.base.deleted)
                .count();
            if live > 0 {
                return Err(Error::Validation(format!(
                    "Product {} still has {} live versions",
                    product_id, live
                )));
            }
            let product = g.product_mut(product_id)?;
            product.base.deleted = true;
            product.base.touch(&actor);
            Ok(())
        })
    }

    /// Live products, optionally restricted to one folder.
    pub fn list_products(&self, folder_id: Option<&str>) -> Result<Vec<Product>> {
        let graph = self.session.snapshot();
        let products = match folder_id {
            Some(id) => {
                graph.folder(id)?;
                graph.products_in(id)
            }
            None => graph.products.values().filter(|p| !p.base.deleted).collect(),
        };
        let mut products: Vec<Product> = products.into_iter().cloned().collect();
        products.sort_by(|a, b| a.base.name.cmp(&b.base.name));
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_create_nested_folders() {
        let env = TestEnv::new();
        let h = env.init_session().hierarchy();
        let ep = h.create_folder("EP01", FolderType::Episode, None).unwrap();
        let seq = h
            .create_folder("SQ010", FolderType::Sequence, Some(&ep.base.id))
            .unwrap();
        let listed = h.list_folders(Some(&ep.base.id)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].folder.base.id, seq.base.id);
        assert_eq!(listed[0].path, "EP01/SQ010");
    }

    #[test]
    fn test_duplicate_sibling_rejected() {
        let env = TestEnv::new();
        let h = env.init_session().hierarchy();
        h.create_folder("Hero", FolderType::Asset, None).unwrap();
        let result = h.create_folder("Hero", FolderType::Asset, None);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_create_folder_missing_parent() {
        let env = TestEnv::new();
        let h = env.init_session().hierarchy();
        let result = h.create_folder("Hero", FolderType::Asset, Some("fld-missing"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_create_asset_records_type() {
        let env = TestEnv::new();
        let h = env.init_session().hierarchy();
        let asset = h.create_asset("Hero", "Characters", None).unwrap();
        assert_eq!(asset.folder_type, FolderType::Asset);
        assert_eq!(asset.base.attributes[ASSET_TYPE_ATTR], "Characters");
    }

    #[test]
    fn test_create_shot_reuses_sequence() {
        let env = TestEnv::new();
        let session = env.init_session();
        let h = session.hierarchy();
        let sh010 = h.create_shot("SQ010", "SH010").unwrap();
        let sh020 = h.create_shot("SQ010", "SH020").unwrap();
        assert_eq!(sh010.parent_id, sh020.parent_id);
        assert_eq!(session.snapshot().root_folders().len(), 1);
        assert!(h.create_shot("SQ010", "SH010").is_err());
    }

    #[test]
    fn test_create_shot_under_non_sequence_fails() {
        let env = TestEnv::new();
        let h = env.init_session().hierarchy();
        h.create_asset("Hero", "Characters", None).unwrap();
        assert!(h.create_shot("Hero", "SH010").is_err());
    }

    #[test]
    fn test_delete_folder_requires_empty() {
        let env = TestEnv::new();
        let session = env.init_session();
        let h = session.hierarchy();
        let parent = h.create_folder("SQ010", FolderType::Sequence, None).unwrap();
        let child = h
            .create_folder("SH010", FolderType::Shot, Some(&parent.base.id))
            .unwrap();

        assert!(h.delete_folder(&parent.base.id).is_err());
        h.delete_folder(&child.base.id).unwrap();
        h.delete_folder(&parent.base.id).unwrap();
        assert!(h.list_folders(None).unwrap().is_empty());
        // Deleted entities stay in the graph
        assert!(session.snapshot().folders[&parent.base.id].base.deleted);
        // Name is free again
        h.create_folder("SQ010", FolderType::Sequence, None).unwrap();
    }

    #[test]
    fn test_walk_is_depth_first() {
        let env = TestEnv::new();
        let h = env.init_session().hierarchy();
        h.create_shot("SQ020", "SH010").unwrap();
        h.create_shot("SQ010", "SH010").unwrap();
        let paths: Vec<String> = h.walk().unwrap().into_iter().map(|v| v.path).collect();
        assert_eq!(paths, vec!["SQ010", "SQ010/SH010", "SQ020", "SQ020/SH010"]);
    }

    #[test]
    fn test_products_unique_per_folder() {
        let env = TestEnv::new();
        let h = env.init_session().hierarchy();
        let hero = h.create_asset("Hero", "Characters", None).unwrap();
        h.create_product(&hero.base.id, "modelMain", "model").unwrap();
        assert!(h.create_product(&hero.base.id, "modelMain", "model").is_err());
        h.create_product(&hero.base.id, "rigMain", "rig").unwrap();
        let products = h.list_products(Some(&hero.base.id)).unwrap();
        let names: Vec<&str> = products.iter().map(|p| p.base.name.as_str()).collect();
        assert_eq!(names, vec!["modelMain", "rigMain"]);
    }

    #[test]
    fn test_delete_product_without_versions() {
        let env = TestEnv::new();
        let h = env.init_session().hierarchy();
        let hero = h.create_asset("Hero", "Characters", None).unwrap();
        let product = h.create_product(&hero.base.id, "modelMain", "model").unwrap();
        h.delete_product(&product.base.id).unwrap();
        assert!(h.list_products(None).unwrap().is_empty());
        assert!(h.delete_product(&product.base.id).is_err());
    }
}
