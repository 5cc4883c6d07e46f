use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PIPELINE_DIR: &str = ".pipeline";
pub const CONFIG_FILE: &str = ".pipeline/config.yaml";
pub const DEFAULT_DATABASE: &str = ".pipeline/pipeline.db";
pub const DEFAULT_UPLOADS_DIR: &str = ".pipeline/uploads";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn pipeline_dir(root: &Path) -> PathBuf {
    root.join(PIPELINE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a configured path: absolute paths are kept, relative ones are
/// taken relative to the workspace root.
pub fn resolve(root: &Path, configured: &str) -> PathBuf {
    let p = Path::new(configured);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}
