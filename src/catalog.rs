//! Directory catalog: the list of convertible files in one directory and the
//! state of the job running on each of them.
//!
//! At most one job is outstanding per entry. Results come back through a
//! [`JobQueue`] and are folded into the entries by [`Catalog::poll`] or
//! [`Catalog::wait_all`].

use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::jobs::{append_suffix, Job, JobKind, JobOutcome, JobQueue, DECODE_SUFFIX, ENCODE_SUFFIX};
use crate::utils::error::{BarchError, Result};

/// Which files the catalog lists and where converted files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Lowercase extensions, without the dot.
    pub extensions: BTreeSet<String>,
    pub encode_suffix: String,
    pub decode_suffix: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            extensions: ["bmp", "png", "barch"].iter().map(|s| s.to_string()).collect(),
            encode_suffix: ENCODE_SUFFIX.to_string(),
            decode_suffix: DECODE_SUFFIX.to_string(),
        }
    }
}

impl CatalogConfig {
    fn accepts(&self, ext: &str) -> bool {
        self.extensions.contains(ext)
    }

    fn suffix_for(&self, kind: JobKind) -> &str {
        match kind {
            JobKind::Encode => self.encode_suffix.as_str(),
            JobKind::Decode => self.decode_suffix.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    Idle,
    Busy(JobKind),
    Ready,
    Failed(String),
}

impl EntryStatus {
    pub fn text(&self) -> &str {
        match self {
            EntryStatus::Idle => "",
            EntryStatus::Busy(kind) => kind.busy_text(),
            EntryStatus::Ready => "Ready",
            EntryStatus::Failed(_) => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    pub ext: String,
    pub size: u64,
    pub status: EntryStatus,
}

impl Entry {
    fn from_path(path: &Path, size: u64) -> Self {
        Entry {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            ext: lower_extension(path),
            size,
            status: EntryStatus::Idle,
        }
    }

    pub fn pretty_size(&self) -> String {
        pretty_size(self.size)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.status, EntryStatus::Busy(_))
    }

    /// The failure message, if the last job failed.
    pub fn error_text(&self) -> Option<&str> {
        match &self.status {
            EntryStatus::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

fn lower_extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Human-readable size with base-1024 units: `"512 B"`, `"1.5 KB"`.
pub fn pretty_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut v = bytes as f64;
    let mut u = 0;
    while v >= 1024.0 && u < UNITS.len() - 1 {
        v /= 1024.0;
        u += 1;
    }
    if u == 0 {
        format!("{:.0} {}", v, UNITS[u])
    } else {
        format!("{:.1} {}", v, UNITS[u])
    }
}

pub struct Catalog {
    dir: PathBuf,
    config: CatalogConfig,
    entries: Vec<Entry>,
    error: Option<String>,
    queue: JobQueue,
}

impl Catalog {
    /// Opens `dir`, falling back to the current directory if it does not
    /// exist, and lists it.
    pub fn open<P: AsRef<Path>>(dir: P, config: CatalogConfig) -> Result<Self> {
        let requested = dir.as_ref();
        let dir = if requested.is_dir() {
            requested.to_path_buf()
        } else {
            warn!(
                "{} is not a directory, using the current directory",
                requested.display()
            );
            std::env::current_dir()?
        };
        let dir = fs::canonicalize(&dir).map_err(|e| BarchError::io_at(e, &dir))?;
        let mut catalog = Catalog {
            dir,
            config,
            entries: Vec::new(),
            error: None,
            queue: JobQueue::new(),
        };
        catalog.refresh()?;
        Ok(catalog)
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-reads the directory: readable regular files with an accepted
    /// extension, sorted by name. Entry states are reset.
    pub fn refresh(&mut self) -> Result<()> {
        let read_dir = fs::read_dir(&self.dir).map_err(|e| BarchError::io_at(e, &self.dir))?;
        let mut entries = Vec::new();
        for item in read_dir {
            let item = item.map_err(|e| BarchError::io_at(e, &self.dir))?;
            let path = item.path();
            let meta = match item.metadata() {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };
            if !self.config.accepts(&lower_extension(&path)) {
                continue;
            }
            if fs::File::open(&path).is_err() {
                debug!("skipping unreadable {}", path.display());
                continue;
            }
            entries.push(Entry::from_path(&path, meta.len()));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        info!("{}: {} files", self.dir.display(), entries.len());
        self.entries = entries;
        Ok(())
    }

    /// Adds `path` if it exists, has an accepted extension and is not
    /// already listed. Returns whether it was added.
    pub fn insert_if_exists<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let path = path.as_ref();
        let meta = match fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta,
            _ => return false,
        };
        if !self.config.accepts(&lower_extension(path)) {
            return false;
        }
        let abs = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if self.entries.iter().any(|e| e.path == abs) {
            return false;
        }
        self.entries.push(Entry::from_path(&abs, meta.len()));
        true
    }

    /// Starts the conversion for entry `row`.
    ///
    /// Returns `Ok(false)` when `row` is out of range or already busy, and an
    /// error (also recorded as the catalog error) for files of unknown kind.
    pub fn process(&mut self, row: usize) -> Result<bool> {
        let Some(entry) = self.entries.get(row) else {
            return Ok(false);
        };
        if entry.is_busy() {
            return Ok(false);
        }
        let Some(kind) = JobKind::for_extension(&entry.ext) else {
            let msg = format!("Unknown File: {}", entry.name);
            self.set_error("Unknown File");
            return Err(BarchError::invalid_input(msg));
        };

        let output = append_suffix(&entry.path, self.config.suffix_for(kind));
        let job = Job::new(kind, entry.path.clone(), output);
        self.queue.submit(row, job)?;
        self.entries[row].status = EntryStatus::Busy(kind);
        Ok(true)
    }

    /// Folds in every outcome that is ready without blocking.
    pub fn poll(&mut self) -> usize {
        let mut n = 0;
        while let Some(outcome) = self.queue.try_recv() {
            self.finish(outcome);
            n += 1;
        }
        n
    }

    /// Blocks until every outstanding job has reported.
    pub fn wait_all(&mut self) -> usize {
        let mut n = 0;
        while let Some(outcome) = self.queue.recv() {
            self.finish(outcome);
            n += 1;
        }
        n
    }

    pub fn in_flight(&self) -> usize {
        self.queue.in_flight()
    }

    fn finish(&mut self, outcome: JobOutcome) {
        let JobOutcome { id, job, result } = outcome;
        // refresh() may have replaced the list while the job ran
        let Some(entry) = self.entries.get_mut(id).filter(|e| e.path == job.input) else {
            debug!("dropping outcome for stale entry {}", id);
            return;
        };
        match result {
            Ok(out) => {
                entry.status = EntryStatus::Ready;
                self.insert_if_exists(out);
            }
            Err(err) => {
                let msg = err.to_string();
                let name = entry.name.clone();
                entry.status = EntryStatus::Failed(msg.clone());
                if job.kind == JobKind::Encode {
                    self.set_error(format!("Error during encode \"{}\": {}", name, msg));
                }
            }
        }
    }

    fn set_error(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!("{}", text);
        self.error = Some(text);
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_sizes() {
        assert_eq!(pretty_size(0), "0 B");
        assert_eq!(pretty_size(512), "512 B");
        assert_eq!(pretty_size(1536), "1.5 KB");
        assert_eq!(pretty_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(pretty_size(3 * 1024 * 1024 * 1024 * 1024), "3072.0 GB");
    }

    #[test]
    fn status_text() {
        assert_eq!(EntryStatus::Idle.text(), "");
        assert_eq!(EntryStatus::Busy(JobKind::Encode).text(), "Coding");
        assert_eq!(EntryStatus::Busy(JobKind::Decode).text(), "Decoding");
        assert_eq!(EntryStatus::Failed("x".into()).text(), "Error");
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(lower_extension(Path::new("/a/B.BMP")), "bmp");
        assert_eq!(lower_extension(Path::new("/a/noext")), "");
    }
}
