use clap::Subcommand;
use pipeline_core::types::Role;
use pipeline_core::user::User;
use std::path::Path;

use crate::output::{print_json, print_table};

#[derive(Subcommand)]
pub enum UserSubcommand {
    /// Add a user
    Create {
        name: String,
        /// admin, developer, designer or content (Chinese labels accepted)
        #[arg(long)]
        role: Role,
    },
    /// List users
    List,
}

pub fn run(root: &Path, subcmd: UserSubcommand, json: bool) -> anyhow::Result<()> {
    let ws = super::open(root)?;
    match subcmd {
        UserSubcommand::Create { name, role } => {
            let user = User::create(&ws.store, &name, role)?;
            if json {
                print_json(&user)?;
            } else {
                println!("Created user #{} {} ({})", user.id, user.name, user.role.label());
            }
        }
        UserSubcommand::List => {
            let users = User::list(&ws.store)?;
            if json {
                print_json(&users)?;
            } else if users.is_empty() {
                println!("No users.");
            } else {
                let rows = users
                    .iter()
                    .map(|u| {
                        vec![
                            u.id.to_string(),
                            u.name.clone(),
                            u.role.to_string(),
                            u.role.label().to_string(),
                        ]
                    })
                    .collect();
                print_table(&["ID", "NAME", "ROLE", "LABEL"], rows);
            }
        }
    }
    Ok(())
}
