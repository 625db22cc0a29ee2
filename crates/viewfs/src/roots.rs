use std::ffi::OsString;
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

use crate::path::VirtualPath;

/// The virtual and on-disk locations of the hosting application's own module.
///
/// Built once at startup and shared read-only (usually behind an `Arc`) with every provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplicationRoots {
    module_path: String,
    module_root: String,
    physical_root: PathBuf,
    physical_base: PathBuf,
}

impl ApplicationRoots {
    /// Virtual folder that hosts every module area.
    pub const AREAS_FOLDER: &'static str = "Areas";

    /// Creates roots for `module_path` served from `physical_root`.
    ///
    /// `module_path` is normalized so the module root always carries exactly one trailing `/`.
    /// Sub-resources resolve against `physical_root` until [`Self::with_physical_base`] says
    /// otherwise.
    pub fn new(module_path: &str, physical_root: impl Into<PathBuf>) -> Self {
        let module_path = VirtualPath::normalize(module_path).into_string();
        let module_root = format!("{module_path}/");
        let physical_root = physical_root.into();
        Self {
            module_path,
            module_root,
            physical_base: physical_root.clone(),
            physical_root,
        }
    }

    /// Roots for an application named `name`, mounted at `Areas/{name}`.
    pub fn for_application(name: &str, physical_root: impl Into<PathBuf>) -> Self {
        Self::new(&format!("{}/{name}", Self::AREAS_FOLDER), physical_root)
    }

    pub fn with_physical_base(mut self, physical_base: impl Into<PathBuf>) -> Self {
        self.physical_base = physical_base.into();
        self
    }

    /// Exact virtual path of the module boundary (e.g. `Areas/MyApp`).
    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    /// `module_path` plus one trailing `/`. Only ever used for prefix matching.
    pub fn module_root(&self) -> &str {
        &self.module_root
    }

    pub fn physical_root(&self) -> &Path {
        &self.physical_root
    }

    pub fn physical_base(&self) -> &Path {
        &self.physical_base
    }

    /// Maps a module-relative remainder onto disk by suffix substitution.
    ///
    /// The remainder is appended textually after the base and a single separator, so a
    /// remainder starting with `/` still lands below the base instead of replacing it the way
    /// [`Path::join`] would.
    pub fn resolve(&self, remainder: &str) -> PathBuf {
        let mut joined = OsString::from(self.physical_base.as_os_str());
        if !ends_with_separator(&self.physical_base) {
            joined.push(MAIN_SEPARATOR_STR);
        }
        joined.push(remainder);
        PathBuf::from(joined)
    }
}

fn ends_with_separator(path: &Path) -> bool {
    let text = path.as_os_str().to_string_lossy();
    text.ends_with('/') || text.ends_with(MAIN_SEPARATOR_STR)
}
