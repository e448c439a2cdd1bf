use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::compile::compile_str;
use crate::error::TemplateError;
use crate::template::Template;

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub template: Template,
}

#[derive(Default)]
struct Entries {
    templates: HashMap<String, Arc<Template>>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
}

impl Entries {
    /// Store `template` unless `hash` is already present, evicting the oldest
    /// entries to stay within `max_entries`. Returns the stored template.
    fn insert(&mut self, hash: String, template: Template, max_entries: Option<usize>) -> Arc<Template> {
        if let Some(existing) = self.templates.get(&hash) {
            return Arc::clone(existing);
        }
        if let Some(max) = max_entries {
            while self.templates.len() >= max {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                debug!(hash = %oldest, "evicting cached template");
                self.templates.remove(&oldest);
            }
        }
        let template = Arc::new(template);
        self.order.push_back(hash.clone());
        self.templates.insert(hash, Arc::clone(&template));
        template
    }
}

/// Compiles each distinct template source once.
///
/// Entries are keyed by the SHA-256 of the source. With a cache directory,
/// compiled templates are also persisted as JSON and reloaded on a later
/// miss in memory. The memory layer is unbounded unless
/// [`TemplateCache::with_max_entries`] sets a limit, past which the oldest
/// entries are evicted first.
#[derive(Default)]
pub struct TemplateCache {
    entries: Mutex<Entries>,
    cache_dir: Option<PathBuf>,
    max_entries: Option<usize>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        if !cache_dir.exists() {
            if let Err(e) = fs::create_dir_all(&cache_dir) {
                warn!(dir = %cache_dir.display(), error = %e, "could not create template cache directory");
            }
        }
        Self {
            cache_dir: Some(cache_dir),
            ..Self::default()
        }
    }

    /// Keep at most `max_entries` templates in memory (at least one).
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries.max(1));
        self
    }

    pub fn compute_hash(source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // Entries are inserted whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn entry_path(dir: &Path, hash: &str) -> PathBuf {
        dir.join(format!("{}.json", hash))
    }

    /// Return the compiled template for `source`, compiling it on first use.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<Template>, TemplateError> {
        let hash = Self::compute_hash(source);

        if let Some(template) = self.lock().templates.get(&hash) {
            debug!(hash = %hash, "template cache hit");
            return Ok(Arc::clone(template));
        }

        let template = match self.load(&hash) {
            Some(template) => template,
            None => {
                debug!(hash = %hash, "template cache miss, compiling");
                let template = compile_str(source)?;
                self.persist(&hash, &template);
                template
            }
        };

        Ok(self.lock().insert(hash, template, self.max_entries))
    }

    fn load(&self, hash: &str) -> Option<Template> {
        let dir = self.cache_dir.as_ref()?;
        let path = Self::entry_path(dir, hash);
        let data = fs::read_to_string(&path).ok()?;

        match serde_json::from_str::<CacheEntry>(&data) {
            Ok(entry) if entry.hash == hash => {
                debug!(hash = %hash, "template loaded from disk cache");
                Some(entry.template)
            }
            Ok(_) => {
                warn!(path = %path.display(), "template cache entry hash mismatch, discarding");
                fs::remove_file(&path).ok();
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "template cache entry corrupt, discarding");
                fs::remove_file(&path).ok();
                None
            }
        }
    }

    fn persist(&self, hash: &str, template: &Template) {
        let Some(dir) = &self.cache_dir else {
            return;
        };
        let entry = CacheEntry {
            hash: hash.to_string(),
            template: template.clone(),
        };
        let path = Self::entry_path(dir, hash);
        match serde_json::to_string(&entry) {
            Ok(data) => {
                if let Err(e) = fs::write(&path, data) {
                    warn!(path = %path.display(), error = %e, "could not persist compiled template");
                }
            }
            Err(e) => warn!(error = %e, "could not serialize compiled template"),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().templates.is_empty()
    }

    /// Drop the in-memory layer. Files on disk are kept.
    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.templates.clear();
        entries.order.clear();
    }
}
