//! Import graph between the documents of an analysis.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};

/// A document and the documents it imports, keyed by import label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepNode {
    pub path: String,
    pub dependencies: BTreeMap<String, String>,
}

impl DepNode {
    pub fn has_dependency(&self, path: &str) -> bool {
        self.dependencies.values().any(|p| p == path)
    }
}

/// Directed graph of import edges. Every edge target has its own node.
#[derive(Debug, Clone, Default)]
pub struct DepGraph {
    nodes: HashMap<String, DepNode>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `path`, merging `deps` (label to path) into its edges.
    pub fn add<I, K, V>(&mut self, path: &str, deps: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let deps: Vec<(String, String)> = deps
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        for (_, dep_path) in &deps {
            self.ensure(dep_path);
        }
        self.ensure(path)
            .dependencies
            .extend(deps);
    }

    fn ensure(&mut self, path: &str) -> &mut DepNode {
        self.nodes
            .entry(path.to_string())
            .or_insert_with(|| DepNode {
                path: path.to_string(),
                dependencies: BTreeMap::new(),
            })
    }

    pub fn has(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&DepNode> {
        self.nodes.get(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Removes `path` unless another node still depends on it.
    pub fn delete(&mut self, path: &str) {
        if self.dependents(path).is_empty() {
            self.nodes.remove(path);
        }
    }

    /// Removes the edges from `path` to `dep_path`, then deletes `dep_path`
    /// if nothing else depends on it.
    pub fn detach(&mut self, path: &str, dep_path: &str) -> Result<()> {
        let node = self
            .nodes
            .get_mut(path)
            .filter(|n| n.has_dependency(dep_path))
            .ok_or_else(|| Error::DependencyNotFound {
                dep: dep_path.to_string(),
                path: path.to_string(),
            })?;
        node.dependencies.retain(|_, p| p != dep_path);
        self.delete(dep_path);
        Ok(())
    }

    /// Nodes that import `path`, sorted by path.
    pub fn dependents(&self, path: &str) -> Vec<&DepNode> {
        let mut out: Vec<&DepNode> = self
            .nodes
            .values()
            .filter(|n| n.has_dependency(path))
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    pub fn dependent_paths(&self, path: &str) -> Vec<String> {
        self.dependents(path)
            .into_iter()
            .map(|n| n.path.clone())
            .collect()
    }

    /// The nodes `path` imports.
    pub fn dependencies(&self, path: &str) -> Vec<&DepNode> {
        self.nodes
            .get(path)
            .map(|n| {
                n.dependencies
                    .values()
                    .filter_map(|p| self.nodes.get(p))
                    .collect()
            })
            .unwrap_or_default()
    }
}
