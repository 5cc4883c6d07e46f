use pipeline_core::queue::{list_queue, Queue};
use pipeline_core::user::UserId;
use std::path::Path;

use crate::output::{print_json, print_table};

pub fn run(root: &Path, queue: Queue, user: Option<UserId>, json: bool) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    let actor = super::actor(&ws, user)?;
    let products = list_queue(&ws.store, queue, &actor)?;

    if json {
        return print_json(&products);
    }
    if products.is_empty() {
        println!("Queue '{queue}' is empty.");
        return Ok(());
    }
    print_table(
        &["ID", "STAGE", "STATUS", "CATEGORY", "OWNER"],
        super::product::rows(&products),
    );
    Ok(())
}
