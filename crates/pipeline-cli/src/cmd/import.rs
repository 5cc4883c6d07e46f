use pipeline_core::create::import_products;
use pipeline_core::product::ProductBrief;
use pipeline_core::user::UserId;
use std::path::Path;

use crate::output::{print_json, print_table};

pub fn run(root: &Path, file: &Path, user: Option<UserId>, json: bool) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    let actor = super::actor(&ws, user)?;
    let rows: Vec<ProductBrief> = super::read_json(file)?;
    let summary = import_products(&ws.store, rows, &actor)?;

    if json {
        return print_json(&summary);
    }
    println!(
        "Imported {} product(s), skipped {}",
        summary.created.len(),
        summary.skipped.len()
    );
    if !summary.skipped.is_empty() {
        let rows = summary
            .skipped
            .iter()
            .map(|s| vec![s.row.to_string(), s.reason.clone()])
            .collect();
        print_table(&["ROW", "REASON"], rows);
    }
    Ok(())
}
