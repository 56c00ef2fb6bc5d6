// Asset path helpers
//
// Assets are looked up relative to the working directory first, then
// relative to the executable, each time also under a `res/` folder and up
// to two parent directories.

use std::path::{Path, PathBuf};

/// Folder that build.rs writes compiled assets into
pub const RESOURCE_DIR: &str = "res";

/// Every location `search_file_path` tries, in order
pub fn candidate_paths(path: &Path, exe_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut bases = vec![PathBuf::new()];
    if let Some(dir) = exe_dir {
        bases.push(dir.to_path_buf());
    }

    let mut candidates = Vec::new();
    for base in bases {
        candidates.push(base.join(path));
        candidates.push(base.join("..").join(path));
        candidates.push(base.join("..").join("..").join(path));
        candidates.push(base.join(RESOURCE_DIR).join(path));
    }
    candidates
}

/// Resolve an asset name to an existing file
pub fn search_file_path(path: impl AsRef<Path>) -> Option<PathBuf> {
    let path = path.as_ref();
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));

    let found = candidate_paths(path, exe_dir.as_deref())
        .into_iter()
        .find(|candidate| candidate.is_file());

    match &found {
        Some(resolved) => log::debug!("Resolved {:?} to {:?}", path, resolved),
        None => log::warn!("File not found: {:?}", path),
    }
    found
}

/// Lower-cased extension without the dot, empty if there is none
pub fn get_ext(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
