//! Template text providers

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

/// Template text with its modification time
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTemplate {
    pub text: String,
    pub last_modified: SystemTime,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("template '{0}' not found")]
    NotFound(String),

    #[error("invalid template id '{0}'")]
    InvalidId(String),

    #[error("failed to read template '{id}': {source}")]
    Io {
        id: String,
        #[source]
        source: io::Error,
    },
}

pub trait TemplateSource {
    fn load(&self, template_id: &str) -> Result<LoadedTemplate, SourceError>;
}

/// Templates stored as `<dir>/<id>.html`
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, template_id: &str) -> Result<PathBuf, SourceError> {
        let valid = !template_id.is_empty()
            && !template_id.starts_with('.')
            && template_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(SourceError::InvalidId(template_id.to_string()));
        }
        Ok(self.root.join(format!("{}.html", template_id)))
    }
}

impl TemplateSource for DirectorySource {
    fn load(&self, template_id: &str) -> Result<LoadedTemplate, SourceError> {
        let path = self.path_for(template_id)?;
        let io_error = |source: io::Error| {
            if source.kind() == io::ErrorKind::NotFound {
                SourceError::NotFound(template_id.to_string())
            } else {
                SourceError::Io {
                    id: template_id.to_string(),
                    source,
                }
            }
        };
        let text = fs::read_to_string(&path).map_err(io_error)?;
        let last_modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(io_error)?;
        Ok(LoadedTemplate {
            text,
            last_modified,
        })
    }
}

/// Templates held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    templates: HashMap<String, LoadedTemplate>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(id, text);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.templates.insert(
            id.into(),
            LoadedTemplate {
                text: text.into(),
                last_modified: SystemTime::now(),
            },
        );
    }
}

impl TemplateSource for MemorySource {
    fn load(&self, template_id: &str) -> Result<LoadedTemplate, SourceError> {
        self.templates
            .get(template_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(template_id.to_string()))
    }
}
