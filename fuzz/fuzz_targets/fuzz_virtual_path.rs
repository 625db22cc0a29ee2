#![no_main]

mod utils;

use libfuzzer_sys::fuzz_target;
use viewfs::{classify, classify_for_listing, normalize, ApplicationRoots, Route};

use utils::truncate_utf8;

fuzz_target!(|data: &[u8]| {
    let Some(text) = truncate_utf8(data) else {
        return;
    };

    // First line is the module path, the rest is the requested path.
    let (module_path, raw) = text.split_once('\n').unwrap_or(("Areas/App", text));

    let path = normalize(raw);
    assert_eq!(normalize(path.as_str()), path, "normalize must be idempotent");
    assert!(!path.as_str().starts_with('/') && !path.as_str().ends_with('/'));
    assert!(!path.as_str().contains('\\'));

    let roots = ApplicationRoots::new(module_path, "/srv/app");
    let route = classify(&path, &roots);
    if route != Route::Unclassified {
        assert_eq!(route.reassemble(&roots).as_deref(), Some(path.as_str()));
    }

    // Listing is never more permissive than lookup.
    match classify_for_listing(&path, &roots) {
        Route::Unclassified => {}
        listing => assert_eq!(listing, route),
    }

    if let Some(remainder) = route.remainder() {
        assert!(roots.resolve(remainder).starts_with(roots.physical_base()));
    }
});
