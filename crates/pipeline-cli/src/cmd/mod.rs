pub mod bottle;
pub mod draft;
pub mod import;
pub mod init;
pub mod product;
pub mod queue;
pub mod serve;
pub mod user;

use anyhow::{anyhow, Context};
use pipeline_core::objects::Upload;
use pipeline_core::user::{User, UserId};
use pipeline_core::workspace::Workspace;
use serde::de::DeserializeOwned;
use std::path::Path;

pub(crate) fn open(root: &Path) -> anyhow::Result<Workspace> {
    Workspace::open(root).with_context(|| format!("failed to open workspace at {}", root.display()))
}

/// Load the acting user named by `--user` / `PIPELINE_USER`.
pub(crate) fn actor(ws: &Workspace, user: Option<UserId>) -> anyhow::Result<User> {
    let id = user.ok_or_else(|| anyhow!("no acting user: pass --user <id> or set PIPELINE_USER"))?;
    User::load(&ws.store, id).with_context(|| format!("failed to load acting user {id}"))
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Read an image file, guessing its content type from the extension.
pub(crate) fn read_upload(path: &Path) -> anyhow::Result<Upload> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let content_type = mime_guess::from_path(path).first_or_octet_stream();
    Ok(Upload::new(bytes, content_type.essence_str()))
}
