//! Lookup of workspaces held by the data-processing framework.

use super::{MDWorkspace, WorkspaceHandle};
use std::collections::HashMap;

/// Source of named workspaces.
pub trait WorkspaceProvider: Send + Sync {
    /// Returns true if a workspace called `name` is available.
    fn can_provide(&self, name: &str) -> bool;

    /// Fetches the workspace called `name`.
    fn fetch(&self, name: &str) -> Option<WorkspaceHandle>;
}

/// In-memory name → workspace map.
#[derive(Default, Clone)]
pub struct WorkspaceRegistry {
    workspaces: HashMap<String, WorkspaceHandle>,
}

impl WorkspaceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `workspace` under its own name, replacing any previous entry.
    pub fn insert(&mut self, workspace: WorkspaceHandle) {
        self.workspaces
            .insert(workspace.name().to_string(), workspace);
    }

    /// Removes the workspace called `name`.
    pub fn remove(&mut self, name: &str) -> Option<WorkspaceHandle> {
        self.workspaces.remove(name)
    }

    /// Registered names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.workspaces.keys().map(String::as_str)
    }
}

impl WorkspaceProvider for WorkspaceRegistry {
    fn can_provide(&self, name: &str) -> bool {
        self.workspaces.contains_key(name)
    }

    fn fetch(&self, name: &str) -> Option<WorkspaceHandle> {
        self.workspaces.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dimension, MDHistoWorkspace};
    use std::sync::Arc;

    #[test]
    fn test_registry_lookup() {
        let dims = vec![Dimension::new("x", "x", "m", 0.0, 1.0, 2).unwrap()];
        let mut registry = WorkspaceRegistry::new();
        registry.insert(Arc::new(MDHistoWorkspace::new("histo", dims)));
        assert!(registry.can_provide("histo"));
        assert!(!registry.can_provide("missing"));
        assert_eq!(registry.fetch("histo").unwrap().name(), "histo");
        assert!(registry.remove("histo").is_some());
        assert!(registry.fetch("histo").is_none());
    }
}
