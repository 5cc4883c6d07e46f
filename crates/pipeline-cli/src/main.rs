mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    bottle::BottleSubcommand, draft::DraftSubcommand, product::ProductSubcommand,
    user::UserSubcommand,
};
use pipeline_core::queue::Queue;
use pipeline_core::user::UserId;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pipeline",
    about = "Product development pipeline: briefs, package design, listing content and AI drafts",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: auto-detect from .pipeline/)
    #[arg(long, global = true, env = "PIPELINE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Id of the acting user
    #[arg(long, short = 'u', global = true, env = "PIPELINE_USER")]
    user: Option<UserId>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a workspace in the current directory
    Init {
        /// Project name (default: directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        subcommand: UserSubcommand,
    },

    /// Manage the bottle library
    Bottle {
        #[command(subcommand)]
        subcommand: BottleSubcommand,
    },

    /// Create products and move them through the stages
    Product {
        #[command(subcommand)]
        subcommand: ProductSubcommand,
    },

    /// Generate, save and review AI product drafts
    Draft {
        #[command(subcommand)]
        subcommand: DraftSubcommand,
    },

    /// Create products from a JSON array of briefs
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// List a work queue: design, designer-work, content, content-work, review
    Queue { queue: Queue },

    /// Serve the JSON HTTP API
    Serve {
        #[arg(long, default_value = "3141")]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref(), cli.json),
        Commands::User { subcommand } => cmd::user::run(&root, subcommand, cli.json),
        Commands::Bottle { subcommand } => cmd::bottle::run(&root, subcommand, cli.json),
        Commands::Product { subcommand } => {
            cmd::product::run(&root, subcommand, cli.user, cli.json)
        }
        Commands::Draft { subcommand } => cmd::draft::run(&root, subcommand, cli.user, cli.json),
        Commands::Import { file } => cmd::import::run(&root, &file, cli.user, cli.json),
        Commands::Queue { queue } => cmd::queue::run(&root, queue, cli.user, cli.json),
        Commands::Serve { port } => cmd::serve::run(&root, port),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
