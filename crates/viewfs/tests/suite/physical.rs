use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use viewfs::{ApplicationRoots, FileProvider, OverlayFileProvider, PhysicalStore};

fn provider(root: &Path) -> OverlayFileProvider {
    let roots = ApplicationRoots::new("areas/app", root);
    OverlayFileProvider::new(Arc::new(roots), Arc::new(PhysicalStore::new()))
        .with_poll_interval(Duration::from_millis(10))
}

#[test]
fn module_root_lists_physical_root() {
    let temp = tempdir().unwrap();
    fs::create_dir(temp.path().join("Pages")).unwrap();
    fs::create_dir(temp.path().join("Scripts")).unwrap();
    fs::write(temp.path().join("Startup.cs"), "").unwrap();

    let provider = provider(temp.path());
    let names: Vec<_> = provider
        .list_directory(Some("areas/app"))
        .found()
        .unwrap()
        .entries()
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(names, vec!["Pages", "Scripts", "Startup.cs"]);

    assert!(provider.list_directory(Some("areas/app/Pages")).is_found());
    assert!(!provider.list_directory(Some("areas/app/Scripts")).is_found());
}

#[test]
fn listing_a_missing_content_folder_is_found_but_empty() {
    let temp = tempdir().unwrap();
    let provider = provider(temp.path());

    let listing = provider
        .list_directory(Some("areas/app/Views/Missing"))
        .found()
        .unwrap();
    assert!(!listing.exists());
    assert!(listing.entries().unwrap().is_empty());
}

#[test]
fn watch_fires_after_physical_write() {
    let temp = tempdir().unwrap();
    fs::create_dir_all(temp.path().join("Views/Home")).unwrap();
    let file = temp.path().join("Views/Home/Index.cshtml");
    fs::write(&file, "v1").unwrap();

    let provider = provider(temp.path());
    let token = provider.watch(Some("areas/app/Views/Home/Index.cshtml"));
    assert!(token.is_active());
    assert!(!token.has_changed());

    // Length change guarantees a distinct stamp even on coarse mtime filesystems.
    fs::write(&file, "version two").unwrap();
    assert!(token.wait_timeout(Duration::from_secs(10)));

    let fresh = provider.watch(Some("areas/app/Views/Home/Index.cshtml"));
    assert!(!fresh.has_changed());
}

#[test]
fn watch_fires_when_file_appears() {
    let temp = tempdir().unwrap();
    let provider = provider(temp.path());
    let token = provider.watch(Some("areas/app/Pages/New.cshtml"));

    fs::create_dir(temp.path().join("Pages")).unwrap();
    fs::write(temp.path().join("Pages/New.cshtml"), "new").unwrap();
    assert!(token.wait_timeout(Duration::from_secs(10)));
}
