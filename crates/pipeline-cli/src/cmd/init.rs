use anyhow::Context;
use pipeline_core::paths;
use pipeline_core::workspace::Workspace;
use std::path::Path;

use crate::output::print_json;

pub fn run(root: &Path, name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let name = name
        .map(str::to_string)
        .or_else(|| root.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "pipeline".to_string());

    let ws = Workspace::init(root, &name)
        .with_context(|| format!("failed to initialize workspace at {}", root.display()))?;

    if json {
        print_json(&serde_json::json!({
            "root": ws.root,
            "project": ws.config.project.name,
            "config": paths::config_path(root),
        }))?;
    } else {
        println!("Initialized pipeline workspace '{}'", ws.config.project.name);
        println!("  config:   {}", paths::config_path(root).display());
        println!("  database: {}", paths::resolve(root, &ws.config.storage.database).display());
        println!("  uploads:  {}", ws.objects.dir().display());
    }
    Ok(())
}
