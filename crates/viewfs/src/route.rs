use crate::path::VirtualPath;
use crate::roots::ApplicationRoots;

/// Folders whose contents may be enumerated below the module root.
pub const CONTENT_FOLDERS: [&str; 2] = ["Pages", "Views"];

/// Which logical root a normalized virtual path falls under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route<'a> {
    /// The path is exactly the module path.
    ExactModuleRoot,
    /// The path starts with the module root; `remainder` is everything after it.
    UnderModuleRoot { remainder: &'a str },
    Unclassified,
}

impl<'a> Route<'a> {
    pub fn remainder(&self) -> Option<&'a str> {
        match self {
            Route::UnderModuleRoot { remainder } => Some(remainder),
            Route::ExactModuleRoot | Route::Unclassified => None,
        }
    }

    /// Rebuilds the normalized virtual path this route was classified from.
    ///
    /// Returns `None` for [`Route::Unclassified`], which does not retain the path.
    pub fn reassemble(&self, roots: &ApplicationRoots) -> Option<String> {
        match self {
            Route::ExactModuleRoot => Some(roots.module_path().to_owned()),
            Route::UnderModuleRoot { remainder } => {
                Some(format!("{}{remainder}", roots.module_root()))
            }
            Route::Unclassified => None,
        }
    }
}

/// Classifies `path` for file-info and watch lookups.
///
/// Matching is ordinal and case-sensitive. The module root is only ever matched as a prefix.
pub fn classify<'a>(path: &'a VirtualPath, roots: &ApplicationRoots) -> Route<'a> {
    if path.as_str() == roots.module_path() {
        return Route::ExactModuleRoot;
    }
    match path.strip_prefix(roots.module_root()) {
        Some(remainder) => Route::UnderModuleRoot { remainder },
        None => Route::Unclassified,
    }
}

/// Classifies `path` for directory enumeration.
///
/// Same as [`classify`], except a path below the module root only qualifies when its remainder
/// has a segment equal to one of [`CONTENT_FOLDERS`].
pub fn classify_for_listing<'a>(path: &'a VirtualPath, roots: &ApplicationRoots) -> Route<'a> {
    match classify(path, roots) {
        Route::UnderModuleRoot { remainder } if !in_content_folder(remainder) => {
            Route::Unclassified
        }
        route => route,
    }
}

fn in_content_folder(remainder: &str) -> bool {
    remainder
        .split('/')
        .any(|segment| CONTENT_FOLDERS.contains(&segment))
}
