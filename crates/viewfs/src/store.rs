use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;

/// One entry of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileMetadata {
    pub len: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
}

/// Observable state of a file used for change polling.
///
/// Two stamps compare unequal whenever the file appeared, disappeared, or was rewritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileStamp {
    Missing,
    Present {
        modified: Option<SystemTime>,
        len: u64,
    },
}

impl From<Option<FileMetadata>> for FileStamp {
    fn from(metadata: Option<FileMetadata>) -> Self {
        match metadata {
            Some(metadata) => FileStamp::Present {
                modified: metadata.modified,
                len: metadata.len,
            },
            None => FileStamp::Missing,
        }
    }
}

/// Capability set of a backing store.
///
/// Providers only ever pass fully resolved absolute paths; virtual paths never reach a store.
/// Implementations must be safe to call from many threads at once.
pub trait BackingStore: Send + Sync {
    fn list_directory(&self, path: &Path) -> io::Result<Vec<DirectoryEntry>>;

    /// Returns `Ok(None)` when nothing exists at `path`.
    fn stat_file(&self, path: &Path) -> io::Result<Option<FileMetadata>>;

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Polling primitive used by change tokens.
    fn poll_file(&self, path: &Path) -> io::Result<FileStamp> {
        self.stat_file(path).map(FileStamp::from)
    }
}

/// Local disk store.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicalStore;

impl PhysicalStore {
    pub fn new() -> Self {
        Self
    }
}

impl BackingStore for PhysicalStore {
    /// Lists `path`. A missing directory lists as empty.
    fn list_directory(&self, path: &Path) -> io::Result<Vec<DirectoryEntry>> {
        let read_dir = match fs::read_dir(path) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut out = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            let metadata = entry.metadata()?;
            out.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                is_dir: metadata.is_dir(),
                len: if metadata.is_dir() { 0 } else { metadata.len() },
                modified: metadata.modified().ok(),
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn stat_file(&self, path: &Path) -> io::Result<Option<FileMetadata>> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(Some(FileMetadata {
                len: metadata.len(),
                modified: metadata.modified().ok(),
                is_dir: metadata.is_dir(),
            })),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

#[derive(Clone, Debug)]
struct MemoryFile {
    bytes: Vec<u8>,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, MemoryFile>,
    clock: u64,
}

impl MemoryState {
    /// Logical clock; every write gets a distinct, increasing timestamp.
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(self.clock)
    }
}

/// In-memory store for compiled/embedded content and test fakes.
///
/// Only files are stored; a directory exists when some file lives below it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        let mut state = self.state.write();
        let modified = state.tick();
        state.files.insert(
            path.into(),
            MemoryFile {
                bytes: bytes.into(),
                modified,
            },
        );
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.state.write().files.remove(path).is_some()
    }

    /// Bumps the modification stamp of an existing file. Returns `false` if it does not exist.
    pub fn touch(&self, path: &Path) -> bool {
        let mut state = self.state.write();
        let modified = state.tick();
        match state.files.get_mut(path) {
            Some(file) => {
                file.modified = modified;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BackingStore for MemoryStore {
    fn list_directory(&self, path: &Path) -> io::Result<Vec<DirectoryEntry>> {
        let state = self.state.read();
        let mut entries: BTreeMap<String, DirectoryEntry> = BTreeMap::new();
        for (file_path, file) in state.files.range(path.to_path_buf()..) {
            let Ok(rest) = file_path.strip_prefix(path) else {
                break;
            };
            let mut components = rest.components();
            let Some(first) = components.next() else {
                continue;
            };
            let name = first.as_os_str().to_string_lossy().into_owned();
            let is_dir = components.next().is_some();
            entries.entry(name.clone()).or_insert_with(|| DirectoryEntry {
                path: path.join(&name),
                name,
                is_dir,
                len: if is_dir { 0 } else { file.bytes.len() as u64 },
                modified: (!is_dir).then_some(file.modified),
            });
        }
        Ok(entries.into_values().collect())
    }

    fn stat_file(&self, path: &Path) -> io::Result<Option<FileMetadata>> {
        let state = self.state.read();
        if let Some(file) = state.files.get(path) {
            return Ok(Some(FileMetadata {
                len: file.bytes.len() as u64,
                modified: Some(file.modified),
                is_dir: false,
            }));
        }
        let is_dir = state
            .files
            .range(path.to_path_buf()..)
            .next()
            .is_some_and(|(file_path, _)| file_path.starts_with(path));
        Ok(is_dir.then_some(FileMetadata {
            len: 0,
            modified: None,
            is_dir: true,
        }))
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let state = self.state.read();
        state
            .files
            .get(path)
            .map(|file| file.bytes.clone())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such file: {}", path.display()),
                )
            })
    }
}
