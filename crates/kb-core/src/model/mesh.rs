//! Mesh references handed to the target engine

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque engine-side mesh identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshHandle(pub Uuid);

/// Maps a described mesh filename to an engine mesh
pub trait MeshResolver {
    fn resolve(&mut self, filename: &str) -> Option<MeshHandle>;
}

/// Issues one fresh id per distinct filename
#[derive(Debug, Clone, Default)]
pub struct UuidMeshResolver {
    handles: HashMap<String, MeshHandle>,
}

impl UuidMeshResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filenames resolved so far with their handles
    pub fn handles(&self) -> &HashMap<String, MeshHandle> {
        &self.handles
    }
}

impl MeshResolver for UuidMeshResolver {
    fn resolve(&mut self, filename: &str) -> Option<MeshHandle> {
        let handle = *self
            .handles
            .entry(filename.to_string())
            .or_insert_with(|| MeshHandle(Uuid::new_v4()));
        Some(handle)
    }
}

/// Leaves every mesh unresolved
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMeshResolver;

impl MeshResolver for NoMeshResolver {
    fn resolve(&mut self, _filename: &str) -> Option<MeshHandle> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_resolver_dedupes_filenames() {
        let mut resolver = UuidMeshResolver::new();
        let a = resolver.resolve("package://robot/meshes/arm.stl");
        let b = resolver.resolve("package://robot/meshes/arm.stl");
        let c = resolver.resolve("package://robot/meshes/hand.stl");

        assert!(a.is_some());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(resolver.handles().len(), 2);
    }

    #[test]
    fn test_no_resolver() {
        assert_eq!(NoMeshResolver.resolve("x.stl"), None);
    }
}
