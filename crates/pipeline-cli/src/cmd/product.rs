use anyhow::{bail, Context};
use clap::Subcommand;
use pipeline_core::claim::claim;
use pipeline_core::content::{self, ContentWork, Translation};
use pipeline_core::create::{self, Attachments};
use pipeline_core::product::{Product, ProductBrief};
use pipeline_core::queue::current_owner;
use pipeline_core::review;
use pipeline_core::store::{Filter, RecordId};
use pipeline_core::types::{ClaimKind, ReviewDecision};
use pipeline_core::user::UserId;
use pipeline_core::workflow::{self, DevAssets};
use std::path::{Path, PathBuf};

use crate::output::{or_dash, print_json, print_table};

#[derive(Subcommand)]
pub enum ProductSubcommand {
    /// Create a product at stage 1
    Create {
        /// JSON file with brief fields
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        selling_point: Option<String>,
        #[arg(long)]
        market: Option<String>,
        #[arg(long)]
        platform: Option<String>,
        /// Competitor image file (repeat up to 3 times)
        #[arg(long = "competitor-image")]
        competitor_images: Vec<PathBuf>,
        /// Reference design image file
        #[arg(long)]
        ref_design: Option<PathBuf>,
        /// Bottle from the library
        #[arg(long)]
        bottle: Option<RecordId>,
    },

    /// List products
    List {
        /// Only products at this stage (1-6)
        #[arg(long)]
        stage: Option<u8>,
    },

    /// Show one product
    Show { id: RecordId },

    /// Delete a product and its uploaded files
    Delete { id: RecordId },

    /// Patch brief fields from a JSON file (stage 1 only)
    Brief {
        id: RecordId,
        #[arg(long)]
        file: PathBuf,
    },

    /// Attach the bottle and reference packaging images (stage 1)
    Assets {
        id: RecordId,
        /// Bottle from the library
        #[arg(long, conflicts_with = "bottle_image")]
        bottle: Option<RecordId>,
        /// Bottle image file not in the library
        #[arg(long)]
        bottle_image: Option<PathBuf>,
        /// Reference packaging image URL or file (repeat up to 3 times)
        #[arg(long = "ref")]
        refs: Vec<String>,
    },

    /// Hand the product to design (stage 1 to 2)
    Submit { id: RecordId },

    /// Claim design or content work
    Claim {
        id: RecordId,
        /// design or content
        #[arg(long)]
        kind: ClaimKind,
    },

    /// Attach the package design (stage 2)
    Design {
        id: RecordId,
        /// Design image file
        #[arg(long, conflicts_with = "url")]
        file: Option<PathBuf>,
        /// Existing design URL
        #[arg(long)]
        url: Option<String>,
    },

    /// Send the design to review (stage 2 to 3)
    SubmitDesign { id: RecordId },

    /// Approve or reject a design (admin)
    ReviewDesign {
        id: RecordId,
        /// approve or reject
        decision: ReviewDecision,
        /// Required when rejecting
        #[arg(long)]
        note: Option<String>,
    },

    /// Save content work from a JSON file without submitting
    Content {
        id: RecordId,
        #[arg(long)]
        file: PathBuf,
    },

    /// Submit content for review (stage 4 to 5)
    SubmitContent {
        id: RecordId,
        /// JSON file replacing the saved content work
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Approve or reject content (admin)
    ReviewContent {
        id: RecordId,
        /// approve or reject
        decision: ReviewDecision,
        /// Required when rejecting
        #[arg(long)]
        note: Option<String>,
    },

    /// Record translations from a JSON array file (stage 5 to 6)
    Translate {
        id: RecordId,
        #[arg(long)]
        file: PathBuf,
    },
}

pub fn run(
    root: &Path,
    subcmd: ProductSubcommand,
    user: Option<UserId>,
    json: bool,
) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    let store = &ws.store;

    let product = match subcmd {
        ProductSubcommand::List { stage } => {
            let filter = match stage {
                Some(stage) => Filter::all().eq("stage", stage),
                None => Filter::all(),
            };
            return list(Product::list(store, &filter)?, json);
        }
        ProductSubcommand::Show { id } => Product::load(store, id)?,
        ProductSubcommand::Delete { id } => {
            let actor = super::actor(&ws, user)?;
            create::delete_product(store, &ws.objects, id, &actor)
                .with_context(|| format!("failed to delete product {id}"))?;
            if json {
                print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
            } else {
                println!("Deleted product {id}");
            }
            return Ok(());
        }
        ProductSubcommand::Create {
            file,
            category,
            selling_point,
            market,
            platform,
            competitor_images,
            ref_design,
            bottle,
        } => {
            let actor = super::actor(&ws, user)?;
            let mut brief: ProductBrief = match file {
                Some(path) => super::read_json(&path)?,
                None => ProductBrief::default(),
            };
            brief.apply_patch(&ProductBrief {
                category,
                selling_point,
                market,
                platform,
                ..ProductBrief::default()
            })?;

            if competitor_images.len() > 3 {
                bail!("at most 3 competitor images, got {}", competitor_images.len());
            }
            let mut attachments = Attachments {
                bottle_id: bottle,
                ..Attachments::default()
            };
            for (slot, path) in attachments
                .competitor_images
                .iter_mut()
                .zip(&competitor_images)
            {
                *slot = Some(super::read_upload(path)?);
            }
            attachments.ref_design = ref_design.as_deref().map(super::read_upload).transpose()?;

            create::create_product(store, &ws.objects, brief, attachments, &actor)?
        }
        ProductSubcommand::Brief { id, file } => {
            let actor = super::actor(&ws, user)?;
            let patch: ProductBrief = super::read_json(&file)?;
            workflow::update_brief(store, id, &patch, &actor)?
        }
        ProductSubcommand::Assets {
            id,
            bottle,
            bottle_image,
            refs,
        } => {
            let actor = super::actor(&ws, user)?;
            let bottle_img = match bottle_image {
                Some(path) => Some(super::read_upload(&path)?.send(&ws.objects)?),
                None => None,
            };
            let ref_packaging_urls = refs
                .iter()
                .map(|r| url_or_upload(&ws, r))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let assets = DevAssets {
                bottle_id: bottle,
                bottle_img,
                ref_packaging_urls,
            };
            workflow::attach_dev_assets(store, id, &assets, &actor)?
        }
        ProductSubcommand::Submit { id } => {
            let actor = super::actor(&ws, user)?;
            workflow::submit_development(store, id, &actor)?
        }
        ProductSubcommand::Claim { id, kind } => {
            let actor = super::actor(&ws, user)?;
            claim(store, id, kind, &actor)?
        }
        ProductSubcommand::Design { id, file, url } => {
            let actor = super::actor(&ws, user)?;
            let url = match (file, url) {
                (Some(path), _) => super::read_upload(&path)?.send(&ws.objects)?,
                (None, Some(url)) => url,
                (None, None) => bail!("a design needs --file or --url"),
            };
            workflow::attach_design(store, id, &url, &actor)?
        }
        ProductSubcommand::SubmitDesign { id } => {
            let actor = super::actor(&ws, user)?;
            workflow::submit_design(store, id, &actor)?
        }
        ProductSubcommand::ReviewDesign { id, decision, note } => {
            let actor = super::actor(&ws, user)?;
            review::review_design(store, id, decision, note.as_deref(), &actor)?
        }
        ProductSubcommand::Content { id, file } => {
            let actor = super::actor(&ws, user)?;
            let work: ContentWork = super::read_json(&file)?;
            content::save_content_draft(store, id, work, &actor)?
        }
        ProductSubcommand::SubmitContent { id, file } => {
            let actor = super::actor(&ws, user)?;
            let work = file
                .as_deref()
                .map(super::read_json::<ContentWork>)
                .transpose()?;
            content::submit_content(store, id, work, &ws.config.content, &actor)?
        }
        ProductSubcommand::ReviewContent { id, decision, note } => {
            let actor = super::actor(&ws, user)?;
            review::review_content(store, id, decision, note.as_deref(), &actor)?
        }
        ProductSubcommand::Translate { id, file } => {
            let actor = super::actor(&ws, user)?;
            let translations: Vec<Translation> = super::read_json(&file)?;
            content::complete_translation(store, id, translations, &actor)?
        }
    };

    show(&product, json)
}

/// A `--ref` value that names an existing file is uploaded; anything else is
/// taken as a URL.
fn url_or_upload(ws: &pipeline_core::workspace::Workspace, value: &str) -> anyhow::Result<String> {
    let path = Path::new(value);
    if path.is_file() {
        Ok(super::read_upload(path)?.send(&ws.objects)?)
    } else {
        Ok(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn list(products: Vec<Product>, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&products);
    }
    if products.is_empty() {
        println!("No products.");
        return Ok(());
    }
    print_table(&["ID", "STAGE", "STATUS", "CATEGORY", "OWNER"], rows(&products));
    Ok(())
}

pub(crate) fn rows(products: &[Product]) -> Vec<Vec<String>> {
    products
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                p.state.stage().number().to_string(),
                p.state.status().to_string(),
                or_dash(p.brief.category.as_deref()),
                current_owner(p).to_string(),
            ]
        })
        .collect()
}

fn show(p: &Product, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(p);
    }
    println!("Product #{}", p.id);
    println!("  stage:     {}", p.state.stage());
    println!("  status:    {}", p.state.status());
    println!("  owner:     {}", current_owner(p));
    println!("  category:  {}", or_dash(p.brief.category.as_deref()));
    println!("  selling:   {}", or_dash(p.brief.selling_point.as_deref()));
    println!("  title:     {}", or_dash(p.brief.product_title.as_deref()));
    println!("  bottle:    {}", or_dash(p.bottle_img.as_deref()));
    println!("  design:    {}", or_dash(p.package_design_url.as_deref()));
    if p.is_ai_generated {
        println!(
            "  from draft #{}",
            p.created_from_draft_id.map_or_else(|| "-".to_string(), |d| d.to_string())
        );
    }
    for (label, history) in [
        ("design review", &p.review_history),
        ("content review", &p.content_review_history),
    ] {
        if history.is_empty() {
            continue;
        }
        println!("  {label} history:");
        for entry in history {
            println!(
                "    {}  {}: {}",
                entry.time.format("%Y-%m-%d %H:%M"),
                entry.reviewer,
                entry.note
            );
        }
    }
    Ok(())
}
