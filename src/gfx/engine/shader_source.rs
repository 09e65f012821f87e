//! Shader source acquisition
//!
//! Programs are built from plain strings. Where those strings come from is
//! up to a [`ShaderSourceProvider`]: a fixed in-memory table or a directory
//! on disk ship with the crate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShaderSourceError {
    #[error("shader source \"{0}\" not found")]
    NotFound(String),
    #[error("failed to read shader source \"{id}\"")]
    Io {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

/// Returns shader text for a logical identifier
pub trait ShaderSourceProvider {
    fn load(&self, id: &str) -> Result<String, ShaderSourceError>;
}

/// Shader sources held in memory
#[derive(Debug, Default, Clone)]
pub struct StaticShaders {
    sources: HashMap<String, String>,
}

impl StaticShaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(id, source);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, source: impl Into<String>) {
        self.sources.insert(id.into(), source.into());
    }
}

impl ShaderSourceProvider for StaticShaders {
    fn load(&self, id: &str) -> Result<String, ShaderSourceError> {
        self.sources
            .get(id)
            .cloned()
            .ok_or_else(|| ShaderSourceError::NotFound(id.to_string()))
    }
}

/// Shader files below a root directory; the id is the relative path
#[derive(Debug, Clone)]
pub struct ShaderDirectory {
    root: PathBuf,
}

impl ShaderDirectory {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ShaderSourceProvider for ShaderDirectory {
    fn load(&self, id: &str) -> Result<String, ShaderSourceError> {
        let path = self.root.join(id);
        log::debug!("Loading shader source {}", path.display());
        std::fs::read_to_string(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ShaderSourceError::NotFound(id.to_string()),
            _ => ShaderSourceError::Io {
                id: id.to_string(),
                source,
            },
        })
    }
}
