//! The document store, its caches and the edit path.
//!
//! An [`AnalysisContext`] is created once per workspace and passed explicitly to
//! whatever serves requests. Readers get an `Arc<ProgramSnapshot>` that stays
//! valid (and unchanged) for as long as they hold it; edits swap in new document
//! text and drop every cached artifact derived from the old one.

use anyhow::Result;
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

use crate::cache::{CacheStats, ResultCache, SnapshotCache};
use crate::config::Config;
use crate::resolver::csharp::{self, FileIndex};
use crate::resolver::{Health, ProgramSnapshot, Resolver};
use crate::scanner::{read_file_lossy, scan_workspace, ScanOptions};

#[derive(Debug, Clone)]
pub struct Document {
    pub text: Arc<str>,
    pub version: u64,
    pub hash: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "change", content = "version", rename_all = "snake_case")]
pub enum DocumentChange {
    Added(u64),
    Updated(u64),
    Unchanged(u64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
}

pub struct AnalysisContext {
    root: Option<PathBuf>,
    config: Config,
    documents: RwLock<BTreeMap<String, Document>>,
    artifacts: ResultCache<FileIndex>,
    snapshot: SnapshotCache<ProgramSnapshot>,
}

fn normalize_id(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches("./").to_string()
}

impl AnalysisContext {
    pub fn new(config: Config) -> Self {
        Self {
            root: None,
            config,
            documents: RwLock::new(BTreeMap::new()),
            artifacts: ResultCache::new(),
            snapshot: SnapshotCache::new(),
        }
    }

    /// In-memory workspace, no root on disk.
    pub fn from_sources<P, T>(config: Config, sources: impl IntoIterator<Item = (P, T)>) -> Self
    where
        P: AsRef<str>,
        T: AsRef<str>,
    {
        let ctx = Self::new(config);
        for (p, t) in sources {
            ctx.update_document(p.as_ref(), t.as_ref());
        }
        ctx
    }

    /// Scan `root` and load every matching source file.
    pub fn load(root: &Path, config: Config) -> Result<Self> {
        let mut ctx = Self::new(config);
        ctx.root = Some(root.to_path_buf());
        let summary = ctx.refresh_from_disk()?;
        info!(root = %root.display(), files = summary.added, "workspace loaded");
        Ok(ctx)
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace (or add) a document's text.
    ///
    /// The version bump and the invalidation of both caches happen under the
    /// document write lock, so no snapshot build can interleave with them.
    pub fn update_document(&self, path: &str, text: &str) -> DocumentChange {
        let id = normalize_id(path);
        let hash = xxh3_64(text.as_bytes());
        let mut docs = self.documents.write();
        let change = match docs.get_mut(&id) {
            Some(doc) if doc.hash == hash => return DocumentChange::Unchanged(doc.version),
            Some(doc) => {
                doc.version += 1;
                doc.text = Arc::from(text);
                doc.hash = hash;
                DocumentChange::Updated(doc.version)
            }
            None => {
                docs.insert(
                    id.clone(),
                    Document {
                        text: Arc::from(text),
                        version: 1,
                        hash,
                    },
                );
                DocumentChange::Added(1)
            }
        };
        self.artifacts.invalidate(&id);
        self.snapshot.invalidate();
        drop(docs);
        debug!(document = %id, ?change, "document updated");
        change
    }

    pub fn remove_document(&self, path: &str) -> bool {
        let id = normalize_id(path);
        let mut docs = self.documents.write();
        if docs.remove(&id).is_none() {
            return false;
        }
        self.artifacts.invalidate(&id);
        self.snapshot.invalidate();
        drop(docs);
        debug!(document = %id, "document removed");
        true
    }

    pub fn document(&self, path: &str) -> Option<Document> {
        self.documents.read().get(&normalize_id(path)).cloned()
    }

    pub fn document_ids(&self) -> Vec<String> {
        self.documents.read().keys().cloned().collect()
    }

    pub fn document_count(&self) -> usize {
        self.documents.read().len()
    }

    /// The current whole-program resolver, built on first use after any edit.
    pub fn resolver(&self) -> Arc<ProgramSnapshot> {
        let docs = self.documents.read();
        let built = self.snapshot.get_or_build(|| {
            debug!(documents = docs.len(), "rebuilding program snapshot");
            let parsed: Vec<(Arc<FileIndex>, Arc<str>)> = docs
                .par_iter()
                .map(|(id, doc)| (self.artifact(id, doc), Arc::clone(&doc.text)))
                .collect();
            Ok::<_, Infallible>(ProgramSnapshot::build(parsed))
        });
        let snapshot = match built {
            Ok(s) => s,
            Err(never) => match never {},
        };
        drop(docs);
        self.artifacts.cleanup(self.config.cache.max_documents);
        snapshot
    }

    fn artifact(&self, id: &str, doc: &Document) -> Arc<FileIndex> {
        let parsed = self
            .artifacts
            .get_or_compute(id, doc.version, || csharp::parse_file(id, &doc.text));
        parsed.unwrap_or_else(|e| {
            debug!(document = id, error = %e, "parse failed; treating document as unparseable");
            Arc::new(FileIndex {
                path: id.to_string(),
                syntax_errors: 1,
                ..FileIndex::default()
            })
        })
    }

    pub fn health(&self) -> Health {
        self.resolver().health()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.artifacts.stats()
    }

    pub fn snapshot_cached(&self) -> bool {
        self.snapshot.is_cached()
    }

    /// Re-scan the root and apply adds, content changes and deletions.
    /// A context without a root has nothing to refresh.
    pub fn refresh_from_disk(&self) -> Result<RefreshSummary> {
        let Some(root) = self.root.clone() else {
            return Ok(RefreshSummary::default());
        };
        let entries = scan_workspace(&ScanOptions::new(&root, &self.config.scan))?;

        let read: Vec<(String, String)> = entries
            .par_iter()
            .filter_map(|e| match read_file_lossy(&e.abs_path) {
                Ok(text) => Some((e.document_id(), text)),
                Err(err) => {
                    debug!(path = %e.abs_path.display(), error = %err, "skipping unreadable file");
                    None
                }
            })
            .collect();

        let mut summary = RefreshSummary::default();
        let on_disk: HashSet<&str> = read.iter().map(|(id, _)| id.as_str()).collect();
        for id in self.document_ids() {
            if !on_disk.contains(id.as_str()) && self.remove_document(&id) {
                summary.deleted += 1;
            }
        }
        for (id, text) in &read {
            match self.update_document(id, text) {
                DocumentChange::Added(_) => summary.added += 1,
                DocumentChange::Updated(_) => summary.updated += 1,
                DocumentChange::Unchanged(_) => {}
            }
        }
        Ok(summary)
    }
}
