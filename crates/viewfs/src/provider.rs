use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::path::VirtualPath;
use crate::roots::ApplicationRoots;
use crate::route::{classify, classify_for_listing, Route};
use crate::store::{BackingStore, DirectoryEntry, FileMetadata};
use crate::watch::{PollingChangeToken, WatchToken, DEFAULT_POLL_INTERVAL};

/// Outcome of a provider lookup.
///
/// `NotFound` is the normal answer for any path a provider does not serve; it is never an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }

    pub fn as_found(&self) -> Option<&T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }
}

pub type DirectoryResult = Lookup<DirectoryContents>;
pub type FileResult = Lookup<FileInfo>;

/// Lazy handle to a directory served by one or more backing stores.
///
/// Nothing is read until [`DirectoryContents::entries`] is called; store faults surface there.
#[derive(Clone)]
pub struct DirectoryContents {
    sources: Vec<(PathBuf, Arc<dyn BackingStore>)>,
}

impl DirectoryContents {
    pub fn new(path: PathBuf, store: Arc<dyn BackingStore>) -> Self {
        Self {
            sources: vec![(path, store)],
        }
    }

    /// Merges several listings. Earlier sources win when entry names collide.
    pub fn merged(contents: impl IntoIterator<Item = DirectoryContents>) -> Self {
        Self {
            sources: contents
                .into_iter()
                .flat_map(|contents| contents.sources)
                .collect(),
        }
    }

    /// The absolute paths this listing is read from, in priority order.
    pub fn physical_paths(&self) -> impl Iterator<Item = &Path> {
        self.sources.iter().map(|(path, _)| path.as_path())
    }

    pub fn exists(&self) -> bool {
        self.sources.iter().any(|(path, store)| {
            matches!(store.stat_file(path), Ok(Some(metadata)) if metadata.is_dir)
        })
    }

    pub fn entries(&self) -> io::Result<Vec<DirectoryEntry>> {
        if let [(path, store)] = self.sources.as_slice() {
            return store.list_directory(path);
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (path, store) in &self.sources {
            for entry in store.list_directory(path)? {
                if seen.insert(entry.name.clone()) {
                    out.push(entry);
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Debug for DirectoryContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|(path, _)| path))
            .finish()
    }
}

/// Lazy handle to a single file in a backing store.
///
/// A handle may point at a file that does not exist; [`FileInfo::exists`] and the read methods
/// report that when asked.
#[derive(Clone)]
pub struct FileInfo {
    path: PathBuf,
    store: Arc<dyn BackingStore>,
}

impl FileInfo {
    pub fn new(path: PathBuf, store: Arc<dyn BackingStore>) -> Self {
        Self { path, store }
    }

    pub fn physical_path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    pub fn metadata(&self) -> io::Result<Option<FileMetadata>> {
        self.store.stat_file(&self.path)
    }

    pub fn exists(&self) -> bool {
        matches!(self.metadata(), Ok(Some(metadata)) if !metadata.is_dir)
    }

    pub fn read(&self) -> io::Result<Vec<u8>> {
        self.store.read_file(&self.path)
    }

    pub fn read_to_string(&self) -> io::Result<String> {
        String::from_utf8(self.read()?)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

impl fmt::Debug for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileInfo").field("path", &self.path).finish()
    }
}

impl PartialEq for FileInfo {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && Arc::ptr_eq(&self.store, &other.store)
    }
}

/// Resolves virtual paths for a templating engine.
///
/// Every operation is total: unmapped and absent paths produce `NotFound` (or an inert token),
/// never an error.
pub trait FileProvider: Send + Sync {
    fn list_directory(&self, subpath: Option<&str>) -> DirectoryResult;

    fn file_info(&self, subpath: Option<&str>) -> FileResult;

    fn watch(&self, filter: Option<&str>) -> WatchToken;
}

impl<P: ?Sized + FileProvider> FileProvider for Arc<P> {
    fn list_directory(&self, subpath: Option<&str>) -> DirectoryResult {
        self.as_ref().list_directory(subpath)
    }

    fn file_info(&self, subpath: Option<&str>) -> FileResult {
        self.as_ref().file_info(subpath)
    }

    fn watch(&self, filter: Option<&str>) -> WatchToken {
        self.as_ref().watch(filter)
    }
}

/// Serves the application module's own content from its physical root.
///
/// - `{module_path}` lists the physical root.
/// - `{module_root}**/Pages/**` and `{module_root}**/Views/**` list below the physical base.
/// - Any `{module_root}**` file resolves (and is watched) below the physical base.
#[derive(Clone)]
pub struct OverlayFileProvider {
    roots: Arc<ApplicationRoots>,
    store: Arc<dyn BackingStore>,
    poll_interval: Duration,
}

impl OverlayFileProvider {
    pub fn new(roots: Arc<ApplicationRoots>, store: Arc<dyn BackingStore>) -> Self {
        Self {
            roots,
            store,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn roots(&self) -> &ApplicationRoots {
        &self.roots
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl fmt::Debug for OverlayFileProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayFileProvider")
            .field("roots", &self.roots)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl FileProvider for OverlayFileProvider {
    fn list_directory(&self, subpath: Option<&str>) -> DirectoryResult {
        let Some(subpath) = subpath else {
            return Lookup::NotFound;
        };
        let folder = VirtualPath::normalize(subpath);

        let physical = match classify_for_listing(&folder, &self.roots) {
            Route::ExactModuleRoot => self.roots.physical_root().to_path_buf(),
            Route::UnderModuleRoot { remainder } => self.roots.resolve(remainder),
            Route::Unclassified => {
                tracing::trace!(target = "viewfs.provider", path = %folder, "listing not served");
                return Lookup::NotFound;
            }
        };
        tracing::debug!(
            target = "viewfs.provider",
            path = %folder,
            physical = %physical.display(),
            "serving directory listing"
        );
        Lookup::Found(DirectoryContents::new(physical, Arc::clone(&self.store)))
    }

    fn file_info(&self, subpath: Option<&str>) -> FileResult {
        let Some(subpath) = subpath else {
            return Lookup::NotFound;
        };
        let path = VirtualPath::normalize(subpath);

        let Route::UnderModuleRoot { remainder } = classify(&path, &self.roots) else {
            tracing::trace!(target = "viewfs.provider", path = %path, "file not served");
            return Lookup::NotFound;
        };
        let physical = self.roots.resolve(remainder);
        tracing::debug!(
            target = "viewfs.provider",
            path = %path,
            physical = %physical.display(),
            "serving file"
        );
        Lookup::Found(FileInfo::new(physical, Arc::clone(&self.store)))
    }

    fn watch(&self, filter: Option<&str>) -> WatchToken {
        let Some(filter) = filter else {
            return WatchToken::Inert;
        };
        let path = VirtualPath::normalize(filter);

        let Route::UnderModuleRoot { remainder } = classify(&path, &self.roots) else {
            return WatchToken::Inert;
        };
        let physical = self.roots.resolve(remainder);
        tracing::debug!(
            target = "viewfs.provider",
            path = %path,
            physical = %physical.display(),
            "polling file for changes"
        );
        WatchToken::Polling(PollingChangeToken::spawn(
            Arc::clone(&self.store),
            physical,
            self.poll_interval,
        ))
    }
}
