use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::path::VirtualPath;
use crate::provider::{DirectoryContents, DirectoryResult, FileInfo, FileProvider, FileResult, Lookup};
use crate::store::BackingStore;
use crate::watch::WatchToken;

/// Serves compiled content: every virtual path maps below `base` in a backing store.
///
/// Compiled content cannot change while the process runs, so watching is inert.
#[derive(Clone)]
pub struct EmbeddedFileProvider {
    store: Arc<dyn BackingStore>,
    base: PathBuf,
}

impl EmbeddedFileProvider {
    pub fn new(store: Arc<dyn BackingStore>, base: impl Into<PathBuf>) -> Self {
        Self {
            store,
            base: base.into(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn locate(&self, path: &VirtualPath) -> PathBuf {
        path.segments()
            .filter(|segment| !segment.is_empty())
            .fold(self.base.clone(), |acc, segment| acc.join(segment))
    }
}

impl fmt::Debug for EmbeddedFileProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedFileProvider")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl FileProvider for EmbeddedFileProvider {
    fn list_directory(&self, subpath: Option<&str>) -> DirectoryResult {
        let Some(subpath) = subpath else {
            return Lookup::NotFound;
        };
        let located = self.locate(&VirtualPath::normalize(subpath));
        match self.store.stat_file(&located) {
            Ok(Some(metadata)) if metadata.is_dir => {
                Lookup::Found(DirectoryContents::new(located, Arc::clone(&self.store)))
            }
            _ => Lookup::NotFound,
        }
    }

    fn file_info(&self, subpath: Option<&str>) -> FileResult {
        let Some(subpath) = subpath else {
            return Lookup::NotFound;
        };
        let info = FileInfo::new(
            self.locate(&VirtualPath::normalize(subpath)),
            Arc::clone(&self.store),
        );
        if info.exists() {
            Lookup::Found(info)
        } else {
            Lookup::NotFound
        }
    }

    fn watch(&self, _filter: Option<&str>) -> WatchToken {
        WatchToken::Inert
    }
}

/// Chains providers in priority order under one virtual namespace.
pub struct CompositeFileProvider {
    providers: Vec<Arc<dyn FileProvider>>,
}

impl CompositeFileProvider {
    pub fn new(providers: Vec<Arc<dyn FileProvider>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<dyn FileProvider>] {
        &self.providers
    }
}

impl fmt::Debug for CompositeFileProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeFileProvider")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl FileProvider for CompositeFileProvider {
    /// Aggregates every provider's listing; on name clashes the earlier provider wins.
    fn list_directory(&self, subpath: Option<&str>) -> DirectoryResult {
        let found: Vec<DirectoryContents> = self
            .providers
            .iter()
            .filter_map(|provider| provider.list_directory(subpath).found())
            .collect();
        if found.is_empty() {
            Lookup::NotFound
        } else {
            Lookup::Found(DirectoryContents::merged(found))
        }
    }

    /// First existing file wins. If no provider has the file, the first handle any provider
    /// produced is returned so the caller still learns where it would live.
    fn file_info(&self, subpath: Option<&str>) -> FileResult {
        let mut fallback = None;
        for provider in &self.providers {
            let Lookup::Found(info) = provider.file_info(subpath) else {
                continue;
            };
            if info.exists() {
                return Lookup::Found(info);
            }
            fallback.get_or_insert(info);
        }
        match fallback {
            Some(info) => Lookup::Found(info),
            None => Lookup::NotFound,
        }
    }

    fn watch(&self, filter: Option<&str>) -> WatchToken {
        let mut tokens: Vec<WatchToken> = self
            .providers
            .iter()
            .map(|provider| provider.watch(filter))
            .filter(WatchToken::is_active)
            .collect();
        match tokens.len() {
            0 => WatchToken::Inert,
            1 => tokens.remove(0),
            _ => WatchToken::composite(tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::provider::OverlayFileProvider;
    use crate::roots::ApplicationRoots;
    use crate::store::MemoryStore;

    struct Fixture {
        physical: Arc<MemoryStore>,
        composite: CompositeFileProvider,
    }

    fn fixture() -> Fixture {
        let embedded = Arc::new(MemoryStore::new());
        embedded.insert("/embedded/Areas/App/Views/_Layout.cshtml", "embedded layout");
        embedded.insert("/embedded/Areas/App/Views/Shared/Menu.cshtml", "embedded menu");
        embedded.insert("/embedded/Areas/Blog/Views/Post.cshtml", "post");

        let physical = Arc::new(MemoryStore::new());
        physical.insert("/srv/app/Views/_Layout.cshtml", "physical layout");
        physical.insert("/srv/app/Views/Home/Index.cshtml", "index");

        let roots = Arc::new(ApplicationRoots::for_application("App", "/srv/app"));
        let overlay = OverlayFileProvider::new(roots, physical.clone())
            .with_poll_interval(Duration::from_millis(5));
        let composite = CompositeFileProvider::new(vec![
            Arc::new(overlay),
            Arc::new(EmbeddedFileProvider::new(embedded, "/embedded")),
        ]);
        Fixture {
            physical,
            composite,
        }
    }

    #[test]
    fn physical_file_shadows_embedded_file() {
        let fixture = fixture();
        let info = fixture
            .composite
            .file_info(Some("Areas/App/Views/_Layout.cshtml"))
            .found()
            .unwrap();
        assert_eq!(info.read_to_string().unwrap(), "physical layout");
    }

    #[test]
    fn falls_through_to_embedded_content() {
        let fixture = fixture();
        let menu = fixture
            .composite
            .file_info(Some("Areas/App/Views/Shared/Menu.cshtml"))
            .found()
            .unwrap();
        assert_eq!(menu.read_to_string().unwrap(), "embedded menu");

        let post = fixture
            .composite
            .file_info(Some("Areas/Blog/Views/Post.cshtml"))
            .found()
            .unwrap();
        assert_eq!(post.read_to_string().unwrap(), "post");
    }

    #[test]
    fn missing_everywhere_keeps_physical_handle() {
        let fixture = fixture();
        let info = fixture
            .composite
            .file_info(Some("Areas/App/Views/Nope.cshtml"))
            .found()
            .unwrap();
        assert!(!info.exists());
        assert_eq!(info.physical_path(), Path::new("/srv/app/Views/Nope.cshtml"));

        assert!(!fixture
            .composite
            .file_info(Some("Areas/Blog/Views/Nope.cshtml"))
            .is_found());
    }

    #[test]
    fn listings_are_aggregated_without_duplicates() {
        let fixture = fixture();
        let listing = fixture
            .composite
            .list_directory(Some("Areas/App/Views"))
            .found()
            .unwrap();
        let entries: Vec<_> = listing
            .entries()
            .unwrap()
            .into_iter()
            .map(|entry| (entry.name, entry.path))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("Home".to_owned(), PathBuf::from("/srv/app/Views/Home")),
                (
                    "_Layout.cshtml".to_owned(),
                    PathBuf::from("/srv/app/Views/_Layout.cshtml")
                ),
                ("Shared".to_owned(), PathBuf::from("/embedded/Areas/App/Views/Shared")),
            ]
        );
    }

    #[test]
    fn watch_uses_only_active_tokens() {
        let fixture = fixture();
        assert!(!fixture.composite.watch(Some("Areas/Blog/Views/Post.cshtml")).is_active());

        let token = fixture.composite.watch(Some("Areas/App/Views/_Layout.cshtml"));
        assert!(matches!(token, WatchToken::Polling(_)));
        fixture
            .physical
            .touch(Path::new("/srv/app/Views/_Layout.cshtml"));
        assert!(token.wait_timeout(Duration::from_secs(10)));
    }
}
