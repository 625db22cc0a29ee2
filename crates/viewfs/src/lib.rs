//! Layered virtual file resolution for view and page templates.
//!
//! A templating engine discovers content by virtual path (`Areas/{App}/Views/Home/Index.cshtml`).
//! This crate maps those paths onto backing stores:
//! - [`OverlayFileProvider`] serves the hosting application's module from its physical root.
//! - [`EmbeddedFileProvider`] serves compiled content from an in-memory store.
//! - [`CompositeFileProvider`] layers providers under one namespace and aggregates listings.
//!
//! Lookups never fail for unmapped paths: they return [`Lookup::NotFound`] or an inert
//! [`WatchToken`]. Only genuine backing-store I/O faults surface as `io::Error`, and only when a
//! returned handle is read.

mod composite;
mod path;
mod provider;
mod roots;
mod route;
mod store;
mod watch;

pub use composite::{CompositeFileProvider, EmbeddedFileProvider};
pub use path::{normalize, VirtualPath};
pub use provider::{
    DirectoryContents, DirectoryResult, FileInfo, FileProvider, FileResult, Lookup,
    OverlayFileProvider,
};
pub use roots::ApplicationRoots;
pub use route::{classify, classify_for_listing, Route, CONTENT_FOLDERS};
pub use store::{BackingStore, DirectoryEntry, FileMetadata, FileStamp, MemoryStore, PhysicalStore};
pub use watch::{CompositeChangeToken, PollingChangeToken, WatchToken, DEFAULT_POLL_INTERVAL};
