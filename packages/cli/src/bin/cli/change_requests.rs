// ABOUTME: Change request commands
// ABOUTME: Owners draft and merge amendments; clients approve them on their own link

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use proposekit_cli::input::read_json;
use proposekit_cli::AppContext;
use proposekit_core::{format_currency, ChangeRequestCreateInput};
use proposekit_engine::followup::change_request_link;
use proposekit_engine::Actor;

use super::output::{format_date, print_json, table, truncate};

#[derive(Subcommand)]
pub enum ChangeRequestCommands {
    /// Draft an amendment for a proposal from a JSON file
    Create { proposal_id: String, file: PathBuf },
    /// Approve an amendment as the client
    Approve {
        share_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Merge an approved amendment into the contract
    Merge { share_id: String },
    /// List amendments of a proposal
    List { proposal_id: String },
    /// Base value plus approved amendments
    Value { proposal_id: String },
    /// Show an amendment as the client sees it
    Open { share_id: String },
}

pub async fn handle(ctx: &AppContext, owner: &str, command: ChangeRequestCommands) -> Result<()> {
    let actor = Actor::user(owner);
    let ledger = ctx.engine.change_requests();

    match command {
        ChangeRequestCommands::Create { proposal_id, file } => {
            let input: ChangeRequestCreateInput = read_json(&file)?;
            let cr = ledger.create(&actor, &proposal_id, input).await?;
            println!(
                "{} Change request {} drafted (+ {})",
                "✓".green(),
                cr.id.cyan(),
                format_currency(cr.added_total)
            );
            println!(
                "{} {}",
                "Approval link:".bold(),
                change_request_link(&ctx.settings.public_base_url, &cr.share_id)
            );
        }
        ChangeRequestCommands::Approve {
            share_id,
            name,
            email,
        } => {
            let cr = ledger.approve(&share_id, &name, &email).await?;
            println!("{} '{}' approved", "✓".green(), cr.title);
        }
        ChangeRequestCommands::Merge { share_id } => {
            let cr = ledger.merge(&actor, &share_id).await?;
            println!("{} '{}' merged into the contract", "✓".green(), cr.title);
        }
        ChangeRequestCommands::List { proposal_id } => {
            let requests = ledger.list(&actor, &proposal_id).await?;
            if requests.is_empty() {
                println!("{}", "No change requests".yellow());
                return Ok(());
            }
            let mut t = table(vec!["ID", "Title", "Added", "Status", "Created"]);
            for cr in &requests {
                t.add_row(vec![
                    cr.id.clone(),
                    truncate(&cr.title, 30),
                    format_currency(cr.added_total),
                    cr.status.to_string(),
                    format_date(&cr.created_at),
                ]);
            }
            println!("{}", t);
        }
        ChangeRequestCommands::Value { proposal_id } => {
            let summary = ledger.contract_value(&actor, &proposal_id).await?;
            let mut t = table(vec!["", "Value"]);
            t.add_row(vec!["Base".to_string(), format_currency(summary.base_value)]);
            t.add_row(vec![
                "Approved amendments".to_string(),
                format_currency(summary.approved_additions),
            ]);
            t.add_row(vec![
                "Pending amendments".to_string(),
                format_currency(summary.pending_additions),
            ]);
            t.add_row(vec!["Total".to_string(), format_currency(summary.total)]);
            println!("{}", t);
        }
        ChangeRequestCommands::Open { share_id } => {
            let page = ledger.open(&share_id).await?;
            print_json(&page)?;
        }
    }

    Ok(())
}
