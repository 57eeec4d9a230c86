//! Keeping stored content in step with its template
//!
//! A sync loads a template, compiles it, reconciles the result with the
//! stored blocks and writes it back under the revision that was read. A write
//! rejected for a stale revision is retried against fresh content.

pub mod reconcile;
pub mod source;
pub mod store;

use thiserror::Error;

pub use reconcile::{reconcile, ReconcileReport, Reconciled};
pub use source::{DirectorySource, LoadedTemplate, MemorySource, SourceError, TemplateSource};
pub use store::{FileStore, MemoryStore, PersistedBlockTree, PersistenceStore, Revision, StoreError};

use crate::config::{ConfigError, ProjectConfig, DEFAULT_MAX_RETRIES};
use crate::diagnostics::Warning;
use crate::{wire, CompileError, Compiler};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("template error: {0}")]
    Source(#[from] SourceError),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("content '{content_id}' kept changing; gave up after {attempts} attempts")]
    Conflict { content_id: String, attempts: usize },
}

/// Result of a completed sync
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub revision: Revision,
    /// Wire content that was stored
    pub content: String,
    pub warnings: Vec<Warning>,
    pub report: ReconcileReport,
    /// Number of write attempts, 1 when there was no conflict
    pub attempts: usize,
}

/// Compiles templates from a source into a store
#[derive(Debug)]
pub struct Synchronizer<S, P> {
    compiler: Compiler,
    source: S,
    store: P,
    max_retries: usize,
}

impl<S: TemplateSource, P: PersistenceStore> Synchronizer<S, P> {
    pub fn new(compiler: Compiler, source: S, store: P) -> Self {
        Self {
            compiler,
            source,
            store,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn from_config(config: &ProjectConfig, source: S, store: P) -> Result<Self, ConfigError> {
        Ok(Self::new(Compiler::from_config(config)?, source, store).with_max_retries(config.sync.max_retries))
    }

    /// Set how many times a conflicting write is retried
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    /// Compile `template_id` and reconcile it into `content_id`
    pub fn sync(&self, template_id: &str, content_id: &str) -> Result<SyncOutcome, SyncError> {
        let span = tracing::info_span!("sync", template_id, content_id);
        let _enter = span.enter();

        let template = self.source.load(template_id)?;
        let compiled = self.compiler.compile(&template.text)?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            let persisted = self.store.get(content_id)?;
            let reconciled = reconcile(
                &compiled.document.blocks,
                &persisted.blocks,
                self.compiler.registry(),
            );
            match self
                .store
                .set(content_id, &reconciled.blocks, persisted.revision.as_ref())
            {
                Ok(revision) => {
                    tracing::info!(
                        revision = %revision,
                        attempts,
                        preserved = reconciled.report.preserved.len(),
                        "synced content"
                    );
                    let warnings = compiled
                        .warnings
                        .iter()
                        .cloned()
                        .chain(reconciled.warnings)
                        .map(|w| w.for_content(content_id))
                        .collect();
                    return Ok(SyncOutcome {
                        revision,
                        content: wire::serialize(&reconciled.blocks),
                        warnings,
                        report: reconciled.report,
                        attempts,
                    });
                }
                Err(StoreError::Conflict { .. }) if attempts <= self.max_retries => {
                    tracing::warn!(attempts, "revision conflict, retrying");
                }
                Err(StoreError::Conflict { .. }) => {
                    return Err(SyncError::Conflict {
                        content_id: content_id.to_string(),
                        attempts,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockNode;
    use std::cell::Cell;

    /// Store whose content changes under the writer a fixed number of times
    struct Contended {
        inner: MemoryStore,
        interruptions: Cell<usize>,
    }

    impl PersistenceStore for Contended {
        fn get(&self, content_id: &str) -> Result<PersistedBlockTree, StoreError> {
            self.inner.get(content_id)
        }

        fn set(
            &self,
            content_id: &str,
            blocks: &[BlockNode],
            expected: Option<&Revision>,
        ) -> Result<Revision, StoreError> {
            if self.interruptions.get() > 0 {
                self.interruptions.set(self.interruptions.get() - 1);
                self.inner
                    .insert_raw(content_id, "<!-- wp:paragraph {\"metadata\":{\"key\":\"intro\"}} --><p>Theirs</p><!-- /wp:paragraph -->");
            }
            self.inner.set(content_id, blocks, expected)
        }
    }

    fn synchronizer(interruptions: usize) -> Synchronizer<MemorySource, Contended> {
        let source = MemorySource::new().with_template("page", r#"<p key="intro">Default</p><hr>"#);
        let store = Contended {
            inner: MemoryStore::new(),
            interruptions: Cell::new(interruptions),
        };
        Synchronizer::new(Compiler::default(), source, store)
    }

    #[test]
    fn test_sync_fresh_content() {
        let sync = synchronizer(0);
        let outcome = sync.sync("page", "home").unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(
            outcome.content,
            "<!-- wp:paragraph {\"metadata\":{\"key\":\"intro\"}} --><p>Default</p><!-- /wp:paragraph --><!-- wp:separator --><hr><!-- /wp:separator -->"
        );
        assert_eq!(outcome.report.inserted, vec!["intro".to_string()]);
        assert_eq!(sync.store().inner.content("home"), Some(outcome.content));
    }

    #[test]
    fn test_sync_retries_conflicts() {
        let sync = synchronizer(2);
        let outcome = sync.sync("page", "home").unwrap();
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.content.contains("<p>Theirs</p>"));
        assert_eq!(outcome.report.preserved, vec!["intro".to_string()]);
    }

    #[test]
    fn test_sync_gives_up() {
        let sync = synchronizer(10).with_max_retries(1);
        let err = sync.sync("page", "home").unwrap_err();
        assert!(matches!(err, SyncError::Conflict { attempts: 2, .. }));
    }

    #[test]
    fn test_compile_failure_writes_nothing() {
        let source = MemorySource::new().with_template("bad", "<p>unclosed");
        let sync = Synchronizer::new(Compiler::default(), source, MemoryStore::new());
        assert!(matches!(sync.sync("bad", "home"), Err(SyncError::Compile(_))));
        assert_eq!(sync.store().content("home"), None);
    }

    #[test]
    fn test_warnings_carry_content_id() {
        let source = MemorySource::new().with_template("t", r#"<block name="acme/unknown"></block>"#);
        let sync = Synchronizer::new(Compiler::default(), source, MemoryStore::new());
        let outcome = sync.sync("t", "home").unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].content_id.as_deref(), Some("home"));
    }
}
