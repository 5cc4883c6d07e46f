use crate::error::{PipelineError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Upload-bytes-returns-URL storage for images attached to products.
pub trait ObjectStore: Send + Sync {
    fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String>;

    /// Remove the object behind `url`. Returns false when the URL does not
    /// belong to this store or the object is already gone.
    fn delete(&self, url: &str) -> Result<bool>;
}

/// A file waiting to be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl Upload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    pub fn send(&self, objects: &dyn ObjectStore) -> Result<String> {
        objects.upload(&self.bytes, &self.content_type)
    }
}

// ---------------------------------------------------------------------------
// LocalObjectStore
// ---------------------------------------------------------------------------

static OBJECT_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn object_name_re() -> &'static Regex {
    OBJECT_NAME_RE.get_or_init(|| {
        Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}(\.[A-Za-z0-9]+)?$")
            .unwrap()
    })
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        other => mime_guess::get_mime_extensions_str(other).and_then(|exts| exts.first().copied()),
    }
}

/// Stores uploads as files in one directory, served from `base_url`.
pub struct LocalObjectStore {
    dir: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            dir: dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn object_name<'a>(&self, url: &'a str) -> Option<&'a str> {
        let name = url.strip_prefix(&self.base_url)?.strip_prefix('/')?;
        object_name_re().is_match(name).then_some(name)
    }
}

impl ObjectStore for LocalObjectStore {
    fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String> {
        if bytes.is_empty() {
            return Err(PipelineError::Validation("upload is empty".to_string()));
        }
        let id = uuid::Uuid::new_v4();
        let name = match extension_for(content_type) {
            Some(ext) => format!("{id}.{ext}"),
            None => id.to_string(),
        };
        crate::io::atomic_write(&self.dir.join(&name), bytes)
            .map_err(|e| PipelineError::storage("objects", "upload", e))?;
        Ok(format!("{}/{name}", self.base_url))
    }

    fn delete(&self, url: &str) -> Result<bool> {
        let Some(name) = self.object_name(url) else {
            return Ok(false);
        };
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path).map_err(|e| PipelineError::storage("objects", "delete", e))?;
        Ok(true)
    }
}
