use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use viewfs::{ApplicationRoots, FileProvider, MemoryStore, OverlayFileProvider};

#[test]
fn concurrent_file_info_calls_are_isolated() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..64 {
        store.insert(format!("/srv/app/Views/Item{i}.cshtml"), format!("item {i}"));
    }
    let roots = Arc::new(ApplicationRoots::new("areas/app", "/srv/app"));
    let provider = Arc::new(OverlayFileProvider::new(roots, store));

    let handles: Vec<_> = (0..64)
        .map(|i| {
            let provider = Arc::clone(&provider);
            thread::spawn(move || {
                for _ in 0..50 {
                    let info = provider
                        .file_info(Some(&format!("areas/app/Views/Item{i}.cshtml")))
                        .found()
                        .expect("path under module root");
                    assert_eq!(
                        info.physical_path(),
                        PathBuf::from(format!("/srv/app/Views/Item{i}.cshtml"))
                    );
                    assert_eq!(info.read_to_string().unwrap(), format!("item {i}"));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
