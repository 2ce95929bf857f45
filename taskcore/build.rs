// Reject lint-suppression attributes ("#[" + "allow" + ...) in taskcore sources and tests.
// Set CHECK_NO_ALLOW=0 to skip the scan.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    println!("cargo:rerun-if-env-changed=CHECK_NO_ALLOW");
    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-changed=tests");

    if env::var("CHECK_NO_ALLOW").is_ok_and(|v| v == "0") {
        return;
    }

    let Some(manifest_dir) = env::var_os("CARGO_MANIFEST_DIR").map(PathBuf::from) else {
        return;
    };

    let mut violations = Vec::new();
    for relative in ["src", "tests"] {
        let path = manifest_dir.join(relative);
        if path.exists() {
            collect_violations(&path, &mut violations);
        }
    }

    if violations.is_empty() {
        return;
    }

    eprintln!("ERROR: lint suppression attributes found in taskcore:");
    for (file, line, content) in &violations {
        eprintln!("  {}:{}: {}", file.display(), line, content.trim());
    }
    panic!("{} lint suppression attribute(s) found", violations.len());
}

fn collect_violations(path: &Path, violations: &mut Vec<(PathBuf, usize, String)>) {
    if path.is_dir() {
        let Ok(entries) = fs::read_dir(path) else {
            return;
        };
        for entry in entries.flatten() {
            collect_violations(&entry.path(), violations);
        }
        return;
    }

    if path.extension().map_or(true, |ext| ext != "rs") {
        return;
    }

    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    let needle = concat!("#[", "allow");
    let inner_needle = concat!("#![", "allow");
    for (idx, line) in content.lines().enumerate() {
        if line.contains(needle) || line.contains(inner_needle) {
            violations.push((path.to_path_buf(), idx + 1, line.to_string()));
        }
    }
}
