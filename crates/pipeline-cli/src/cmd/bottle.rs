use anyhow::bail;
use clap::Subcommand;
use pipeline_core::bottle::Bottle;
use std::path::{Path, PathBuf};

use crate::output::{print_json, print_table};

#[derive(Subcommand)]
pub enum BottleSubcommand {
    /// Add a bottle to the library
    Create {
        name: String,
        /// Image file to upload
        #[arg(long, conflicts_with = "url")]
        image: Option<PathBuf>,
        /// Existing image URL
        #[arg(long)]
        url: Option<String>,
    },
    /// List the bottle library
    List,
}

pub fn run(root: &Path, subcmd: BottleSubcommand, json: bool) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    match subcmd {
        BottleSubcommand::Create { name, image, url } => {
            let image_url = match (image, url) {
                (Some(path), _) => super::read_upload(&path)?.send(&ws.objects)?,
                (None, Some(url)) => url,
                (None, None) => bail!("a bottle needs --image or --url"),
            };
            let bottle = Bottle::create(&ws.store, &name, &image_url)?;
            if json {
                print_json(&bottle)?;
            } else {
                println!("Created bottle #{} {}", bottle.id, bottle.name);
            }
        }
        BottleSubcommand::List => {
            let bottles = Bottle::list(&ws.store)?;
            if json {
                print_json(&bottles)?;
            } else if bottles.is_empty() {
                println!("No bottles.");
            } else {
                let rows = bottles
                    .iter()
                    .map(|b| vec![b.id.to_string(), b.name.clone(), b.image_url.clone()])
                    .collect();
                print_table(&["ID", "NAME", "IMAGE"], rows);
            }
        }
    }
    Ok(())
}
