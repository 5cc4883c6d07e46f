use anyhow::{bail, Context};
use clap::Subcommand;
use pipeline_core::ai::{self, CompetitorInfo, CompetitorSource, ImageInput, PlanRequest};
use pipeline_core::draft::{self, Draft, DraftInput};
use pipeline_core::store::RecordId;
use pipeline_core::types::{DraftStatus, ReviewDecision, Role};
use pipeline_core::user::UserId;
use pipeline_core::workspace::AiPurpose;
use std::path::{Path, PathBuf};

use crate::output::{or_dash, print_json, print_table};

#[derive(Subcommand)]
pub enum DraftSubcommand {
    /// Save a draft from a JSON file
    Create {
        #[arg(long)]
        file: PathBuf,
    },

    /// List drafts, newest first
    List {
        /// 待审核/已通过/已拒绝 or pending/approved/rejected
        #[arg(long)]
        status: Option<DraftStatus>,
        /// Only drafts created by the acting user
        #[arg(long)]
        mine: bool,
    },

    /// Show one draft
    Show { id: RecordId },

    /// Approve or reject a pending draft (admin)
    Review {
        id: RecordId,
        /// approve or reject
        decision: ReviewDecision,
        #[arg(long)]
        comment: String,
    },

    /// Generate a plan with the configured AI provider
    Generate {
        #[arg(long)]
        category: String,
        #[arg(long)]
        market: String,
        #[arg(long)]
        platform: String,
        /// JSON array of extracted competitors
        #[arg(long)]
        competitors: PathBuf,
        /// Save the plan as a pending draft
        #[arg(long)]
        save: bool,
    },

    /// Extract competitor info from a listing URL or screenshots
    Extract {
        #[arg(long, conflicts_with = "image")]
        url: Option<String>,
        /// Screenshot file (repeatable)
        #[arg(long)]
        image: Vec<PathBuf>,
        /// Extra context for the screenshots
        #[arg(long)]
        hint: Option<String>,
    },
}

pub fn run(
    root: &Path,
    subcmd: DraftSubcommand,
    user: Option<UserId>,
    json: bool,
) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    let store = &ws.store;

    match subcmd {
        DraftSubcommand::Create { file } => {
            let actor = super::actor(&ws, user)?;
            let input: DraftInput = super::read_json(&file)?;
            let draft = draft::create_draft(store, input, &actor)?;
            show(&draft, json)?;
        }
        DraftSubcommand::List { status, mine } => {
            let created_by = if mine {
                Some(super::actor(&ws, user)?.id)
            } else {
                None
            };
            let drafts = draft::list_drafts(store, status, created_by)?;
            if json {
                print_json(&drafts)?;
            } else if drafts.is_empty() {
                println!("No drafts.");
            } else {
                let rows = drafts
                    .iter()
                    .map(|d| {
                        vec![
                            d.id.to_string(),
                            d.status.to_string(),
                            or_dash(d.input.category.as_deref()),
                            or_dash(d.input.title.as_deref()),
                            d.created_by.to_string(),
                            d.created_at.format("%Y-%m-%d %H:%M").to_string(),
                        ]
                    })
                    .collect();
                print_table(&["ID", "STATUS", "CATEGORY", "TITLE", "BY", "CREATED"], rows);
            }
        }
        DraftSubcommand::Show { id } => show(&Draft::load(store, id)?, json)?,
        DraftSubcommand::Review {
            id,
            decision,
            comment,
        } => {
            let actor = super::actor(&ws, user)?;
            let outcome = draft::review_draft(store, id, decision, Some(&comment), &actor)
                .with_context(|| format!("failed to review draft {id}"))?;
            if json {
                print_json(&outcome)?;
            } else {
                println!("Draft #{} is now {}", outcome.draft.id, outcome.draft.status);
                if let Some(product) = &outcome.product {
                    println!("Product #{} created at stage 1", product.id);
                }
            }
        }
        DraftSubcommand::Generate {
            category,
            market,
            platform,
            competitors,
            save,
        } => {
            let actor = super::actor(&ws, user)?;
            actor.require(&[Role::Developer, Role::Admin], "generate product plans")?;
            let competitors: Vec<CompetitorInfo> = super::read_json(&competitors)?;
            let request = PlanRequest {
                category,
                market,
                platform,
                competitors,
            };
            let provider = ws.provider(AiPurpose::Generate)?;
            let input = ai::generate_draft(&provider, &request)?;
            if save {
                let draft = draft::create_draft(store, input, &actor)?;
                show(&draft, json)?;
            } else {
                print_json(&input)?;
            }
        }
        DraftSubcommand::Extract { url, image, hint } => {
            let source = match url {
                Some(url) => CompetitorSource::Url(url),
                None if image.is_empty() => bail!("extract needs --url or at least one --image"),
                None => {
                    let images = image
                        .iter()
                        .map(|p| {
                            super::read_upload(p).map(|u| ImageInput {
                                content_type: u.content_type,
                                bytes: u.bytes,
                            })
                        })
                        .collect::<anyhow::Result<Vec<_>>>()?;
                    CompetitorSource::Images { images, hint }
                }
            };
            let provider = ws.provider(AiPurpose::Extract)?;
            let info = ai::extract_competitor(&provider, &source)?;
            if json {
                print_json(&info)?;
            } else {
                println!("{} ({})", info.name, or_dash(Some(info.price.as_str())));
                println!("  ingredients: {}", or_dash(Some(info.ingredients.as_str())));
                println!("  benefits:    {}", info.benefits.join(", "));
                println!("  source:      {}", info.source_url);
            }
        }
    }
    Ok(())
}

fn show(d: &Draft, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(d);
    }
    println!("Draft #{} [{}]", d.id, d.status);
    println!("  category:    {}", or_dash(d.input.category.as_deref()));
    println!("  market:      {}", or_dash(d.input.market.as_deref()));
    println!("  platform:    {}", or_dash(d.input.platform.as_deref()));
    println!("  positioning: {}", or_dash(d.input.positioning.as_deref()));
    println!("  title:       {}", or_dash(d.input.title.as_deref()));
    if let Some(comment) = &d.review_comment {
        println!("  review:      {comment}");
    }
    Ok(())
}
