//! Persistence of compiled content with optimistic concurrency
//!
//! Content is stored in wire format. Every write names the revision it was
//! based on; a write based on anything but the current revision is rejected
//! with [`StoreError::Conflict`].

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crc32fast::Hasher;
use thiserror::Error;

use crate::block::BlockNode;
use crate::wire::{self, WireError};

/// Opaque optimistic-concurrency token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored blocks of one content item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedBlockTree {
    pub blocks: Vec<BlockNode>,
    /// `None` when the item has never been written
    pub revision: Option<Revision>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("revision conflict for '{content_id}': expected {}, found {}", display_revision(.expected.as_ref()), display_revision(.actual.as_ref()))]
    Conflict {
        content_id: String,
        expected: Option<Revision>,
        actual: Option<Revision>,
    },

    #[error("invalid content id '{0}'")]
    InvalidId(String),

    #[error("stored content for '{content_id}' is not valid block markup: {source}")]
    Wire {
        content_id: String,
        #[source]
        source: WireError,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

fn display_revision(revision: Option<&Revision>) -> String {
    match revision {
        Some(r) => r.to_string(),
        None => "nothing".to_string(),
    }
}

/// Keyed storage of block content
pub trait PersistenceStore {
    /// Current blocks and revision; an empty tree for unknown ids
    fn get(&self, content_id: &str) -> Result<PersistedBlockTree, StoreError>;

    /// Replace the content if its revision still equals `expected`
    fn set(
        &self,
        content_id: &str,
        blocks: &[BlockNode],
        expected: Option<&Revision>,
    ) -> Result<Revision, StoreError>;
}

fn check_revision(
    content_id: &str,
    current: Option<&Revision>,
    expected: Option<&Revision>,
) -> Result<(), StoreError> {
    if current == expected {
        return Ok(());
    }
    tracing::warn!(
        content_id,
        expected = %display_revision(expected),
        actual = %display_revision(current),
        "revision conflict"
    );
    Err(StoreError::Conflict {
        content_id: content_id.to_string(),
        expected: expected.cloned(),
        actual: current.cloned(),
    })
}

fn decode(content_id: &str, content: &str) -> Result<Vec<BlockNode>, StoreError> {
    wire::parse(content).map_err(|source| StoreError::Wire {
        content_id: content_id.to_string(),
        source,
    })
}

/// In-memory store with counter revisions
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    items: HashMap<String, (String, Revision)>,
    counter: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write wire content directly, bypassing the revision check
    pub fn insert_raw(&self, content_id: impl Into<String>, content: impl Into<String>) -> Revision {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.counter += 1;
        let revision = Revision(format!("r{}", state.counter));
        state
            .items
            .insert(content_id.into(), (content.into(), revision.clone()));
        revision
    }

    /// Stored wire content of an item
    pub fn content(&self, content_id: &str) -> Option<String> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.items.get(content_id).map(|(content, _)| content.clone())
    }
}

impl PersistenceStore for MemoryStore {
    fn get(&self, content_id: &str) -> Result<PersistedBlockTree, StoreError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.items.get(content_id) {
            Some((content, revision)) => Ok(PersistedBlockTree {
                blocks: decode(content_id, content)?,
                revision: Some(revision.clone()),
            }),
            None => Ok(PersistedBlockTree::default()),
        }
    }

    fn set(
        &self,
        content_id: &str,
        blocks: &[BlockNode],
        expected: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let current = state.items.get(content_id).map(|(_, r)| r);
        check_revision(content_id, current, expected)?;
        state.counter += 1;
        let revision = Revision(format!("r{}", state.counter));
        state.items.insert(
            content_id.to_string(),
            (wire::serialize(blocks), revision.clone()),
        );
        Ok(revision)
    }
}

/// Directory of `<content-id>.html` files with checksum revisions
///
/// Writes through one store are serialized, so two writers holding the same
/// revision cannot both succeed. Writers in other processes are only caught
/// when their write lands before the revision check.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
    temp_counter: AtomicU64,
}

impl FileStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
            temp_counter: AtomicU64::new(0),
        })
    }

    pub fn path_for(&self, content_id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_id(content_id) {
            return Err(StoreError::InvalidId(content_id.to_string()));
        }
        Ok(self.root.join(format!("{}.html", content_id)))
    }

    fn read(&self, content_id: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(content_id)?) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}

impl PersistenceStore for FileStore {
    fn get(&self, content_id: &str) -> Result<PersistedBlockTree, StoreError> {
        match self.read(content_id)? {
            Some(content) => Ok(PersistedBlockTree {
                blocks: decode(content_id, &content)?,
                revision: Some(checksum_revision(&content)),
            }),
            None => Ok(PersistedBlockTree::default()),
        }
    }

    fn set(
        &self,
        content_id: &str,
        blocks: &[BlockNode],
        expected: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        let path = self.path_for(content_id)?;
        let content = wire::serialize(blocks);

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.read(content_id)?.map(|c| checksum_revision(&c));
        check_revision(content_id, current.as_ref(), expected)?;

        let seq = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let temp_path = self
            .root
            .join(format!(".{}.{}.{}.tmp", content_id, std::process::id(), seq));
        if let Err(err) = fs::write(&temp_path, &content) {
            let _ = fs::remove_file(&temp_path);
            return Err(err.into());
        }
        fs::rename(&temp_path, &path)?;
        Ok(checksum_revision(&content))
    }
}

/// Ids become file names, so only a safe character set is accepted
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn checksum_revision(content: &str) -> Revision {
    let mut hasher = Hasher::new();
    hasher.update(content.as_bytes());
    Revision(format!("crc32:{:08x}", hasher.finalize()))
}
