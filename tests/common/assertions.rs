//! Assertions over written output

use std::path::Path;

use walkdir::WalkDir;

/// Every file under `root`, as sorted `/`-separated paths relative to it
pub fn written_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|relative| relative.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}

/// Every directory directly under `root`, sorted
pub fn chapter_dirs(root: &Path) -> Vec<String> {
    let mut dirs: Vec<String> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    dirs.sort();
    dirs
}

/// Byte offsets of each needle in `haystack`; panics if one is missing
pub fn positions(haystack: &str, needles: &[&str]) -> Vec<usize> {
    needles
        .iter()
        .map(|needle| {
            haystack
                .find(needle)
                .unwrap_or_else(|| panic!("{needle:?} not found in output"))
        })
        .collect()
}

/// Assert the offsets are strictly increasing
pub fn assert_in_order(haystack: &str, needles: &[&str]) {
    let found = positions(haystack, needles);
    assert!(
        found.windows(2).all(|pair| pair[0] < pair[1]),
        "expected {needles:?} in order, found at {found:?}"
    );
}
