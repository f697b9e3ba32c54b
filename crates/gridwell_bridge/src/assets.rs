//! Read-only asset directory

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::AssetError;

#[derive(Clone, Debug, Default)]
pub struct AssetDir {
    root: Option<PathBuf>,
}

impl AssetDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Directory that serves nothing.
    pub fn none() -> Self {
        Self { root: None }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Resolve a plugin-supplied relative path. Absolute paths and `..`
    /// components are rejected.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, AssetError> {
        let root = self.root.as_ref().ok_or(AssetError::NotConfigured)?;
        let rel = Path::new(path);
        if path.is_empty()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(AssetError::InvalidPath(path.to_owned()));
        }
        Ok(root.join(rel))
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let full = self.resolve(path)?;
        fs::read(&full).map_err(|source| AssetError::Io {
            path: path.to_owned(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_and_reject_traversal() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("icons")).unwrap();
        fs::write(dir.path().join("icons/a.svg"), b"<svg/>").unwrap();

        let assets = AssetDir::new(dir.path());
        assert_eq!(assets.read("icons/a.svg").unwrap(), b"<svg/>");
        assert!(matches!(
            assets.read("../secret"),
            Err(AssetError::InvalidPath(_))
        ));
        assert!(matches!(
            assets.read("/etc/passwd"),
            Err(AssetError::InvalidPath(_))
        ));
        assert!(matches!(assets.read("missing"), Err(AssetError::Io { .. })));
    }

    #[test]
    fn test_unconfigured() {
        assert!(matches!(
            AssetDir::none().read("x"),
            Err(AssetError::NotConfigured)
        ));
    }
}
