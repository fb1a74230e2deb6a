//! Exposes the workspace `VERSION` file as `HEMOSCAN_VERSION`.

use std::path::Path;

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("cargo sets CARGO_MANIFEST_DIR");
    let version_file = Path::new(&manifest_dir)
        .ancestors()
        .map(|dir| dir.join("VERSION"))
        .find(|candidate| candidate.is_file())
        .expect("a VERSION file above the app crate");

    println!("cargo:rerun-if-changed={}", version_file.display());

    let contents = std::fs::read_to_string(&version_file).expect("VERSION is readable");
    let version = contents.lines().next().unwrap_or_default().trim();
    assert!(
        version.split('.').count() == 3 && version.split('.').all(|part| part.parse::<u32>().is_ok()),
        "VERSION must be MAJOR.MINOR.PATCH, got {version:?}"
    );

    println!("cargo:rustc-env=HEMOSCAN_VERSION={version}");
}
