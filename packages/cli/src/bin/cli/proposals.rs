// ABOUTME: Owner-side proposal commands
// ABOUTME: Create, edit, share, render, settle and close proposals

use std::path::PathBuf;

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use colored::*;
use proposekit_cli::input::read_json;
use proposekit_cli::AppContext;
use proposekit_core::{format_currency, ProposalCreateInput, ProposalRecord, ProposalUpdateInput};
use proposekit_engine::followup::proposal_link;
use proposekit_engine::{Actor, DocumentFormat};

use super::output::{format_date, format_optional_date, print_json, table, truncate};

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FormatArg {
    Markdown,
    Html,
}

impl From<FormatArg> for DocumentFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Markdown => DocumentFormat::Markdown,
            FormatArg::Html => DocumentFormat::Html,
        }
    }
}

#[derive(Subcommand)]
pub enum ProposalCommands {
    /// Create a proposal from a JSON file ("-" for stdin)
    Create { file: PathBuf },
    /// Apply a partial JSON update to a proposal
    Update { id: String, file: PathBuf },
    /// List your proposals
    List,
    /// Show proposal details
    Show {
        id: String,
        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render the proposal document
    Render {
        id: String,
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: FormatArg,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Drop cached content and draft it again
    Regenerate { id: String },
    /// Mark a draft as sent to the client
    Share { id: String },
    /// Release a draft for public download
    Release { id: String },
    /// Record the deposit (or full payment) as received
    Pay {
        id: String,
        /// Confirmation comes from the payment provider rather than the owner
        #[arg(long)]
        provider: bool,
    },
    /// Start the project after payment
    Kickoff { id: String },
    /// Cancel the proposal
    Cancel {
        id: String,
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Show the audit timeline, newest first
    Timeline { id: String },
    /// List client signatures, newest first
    Acceptances { id: String },
    /// List deposits
    Deposits { id: String },
    /// Build the follow-up message for the client
    Followup { id: String },
}

pub async fn handle(ctx: &AppContext, owner: &str, command: ProposalCommands) -> Result<()> {
    let actor = Actor::user(owner);
    let lifecycle = ctx.engine.lifecycle();

    match command {
        ProposalCommands::Create { file } => {
            let input: ProposalCreateInput = read_json(&file)?;
            let proposal = lifecycle.create_proposal(owner, input).await?;
            println!("{} Created proposal {}", "✓".green(), proposal.id.cyan());
            print_link(ctx, &proposal);
        }
        ProposalCommands::Update { id, file } => {
            let input: ProposalUpdateInput = read_json(&file)?;
            let proposal = lifecycle.update_proposal(&actor, &id, input).await?;
            println!("{} Updated proposal {}", "✓".green(), proposal.id.cyan());
            if proposal.content.is_none() {
                println!("{}", "Content will be drafted again on next view".dimmed());
            }
        }
        ProposalCommands::List => list(ctx, owner).await?,
        ProposalCommands::Show { id, json } => {
            let proposal = lifecycle.get_proposal(&actor, &id).await?;
            if json {
                print_json(&proposal)?;
            } else {
                show(ctx, &actor, &proposal).await?;
            }
        }
        ProposalCommands::Render { id, format, output } => {
            let document = ctx.engine.render(&actor, &id, format.into()).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &document.body)?;
                    println!(
                        "{} Wrote {} document to {}",
                        "✓".green(),
                        document.format,
                        path.display()
                    );
                }
                None => println!("{}", document.body),
            }
        }
        ProposalCommands::Regenerate { id } => {
            let generated = lifecycle.regenerate(&actor, &id).await?;
            println!(
                "{} Content drafted again ({})",
                "✓".green(),
                generated.source.as_str()
            );
        }
        ProposalCommands::Share { id } => {
            let proposal = lifecycle.share(&actor, &id).await?;
            println!("{} Proposal is {}", "✓".green(), proposal.status_v2);
            print_link(ctx, &proposal);
        }
        ProposalCommands::Release { id } => {
            let proposal = lifecycle.release(&actor, &id).await?;
            println!("{} Proposal release status: {}", "✓".green(), proposal.status);
        }
        ProposalCommands::Pay { id, provider } => {
            let payer = if provider {
                Actor::PaymentProvider
            } else {
                actor.clone()
            };
            let outcome = lifecycle.mark_deposit_paid(&payer, &id).await?;
            if outcome.already_paid {
                println!("{}", "Proposal was already paid".yellow());
            } else {
                let amount = outcome
                    .deposit
                    .as_ref()
                    .map(|d| format_currency(d.amount))
                    .unwrap_or_else(|| "—".to_string());
                println!("{} Payment recorded: {}", "✓".green(), amount);
            }
        }
        ProposalCommands::Kickoff { id } => {
            let proposal = lifecycle.start_kickoff(&actor, &id).await?;
            println!("{} Proposal is {}", "✓".green(), proposal.status_v2);
        }
        ProposalCommands::Cancel { id, reason } => {
            let proposal = lifecycle.cancel(&actor, &id, reason).await?;
            println!("{} Proposal is {}", "✓".green(), proposal.status_v2);
        }
        ProposalCommands::Timeline { id } => {
            let events = lifecycle.timeline(&actor, &id).await?;
            if events.is_empty() {
                println!("{}", "No events recorded".yellow());
                return Ok(());
            }
            let mut t = table(vec!["When", "Event", "Details"]);
            for event in &events {
                t.add_row(vec![
                    format_date(&event.occurred_at),
                    event.event_type.to_string(),
                    truncate(&event.metadata.to_string(), 60),
                ]);
            }
            println!("{}", t);
        }
        ProposalCommands::Acceptances { id } => {
            let acceptances = lifecycle.acceptances(&actor, &id).await?;
            if acceptances.is_empty() {
                println!("{}", "Not accepted yet".yellow());
                return Ok(());
            }
            let mut t = table(vec!["Signer", "Email", "Role", "Accepted"]);
            for acceptance in &acceptances {
                t.add_row(vec![
                    acceptance.signer_name.clone(),
                    acceptance.signer_email.clone(),
                    acceptance.signer_role.clone().unwrap_or_default(),
                    format_date(&acceptance.accepted_at),
                ]);
            }
            println!("{}", t);
        }
        ProposalCommands::Deposits { id } => {
            let deposits = lifecycle.deposits(&actor, &id).await?;
            let mut t = table(vec!["ID", "Amount", "Status", "Method", "Paid"]);
            for deposit in &deposits {
                t.add_row(vec![
                    deposit.id.clone(),
                    format_currency(deposit.amount),
                    deposit.status.to_string(),
                    deposit.method.to_string(),
                    format_optional_date(deposit.paid_at.as_ref()),
                ]);
            }
            println!("{}", t);
        }
        ProposalCommands::Followup { id } => {
            let followup = ctx.engine.followup(&actor, &id).await?;
            println!("{}", followup.message);
            println!();
            println!("{} {}", "WhatsApp:".bold(), followup.whatsapp_link);
        }
    }

    Ok(())
}

fn print_link(ctx: &AppContext, proposal: &ProposalRecord) {
    println!(
        "{} {}",
        "Public link:".bold(),
        proposal_link(&ctx.settings.public_base_url, &proposal.share_id)
    );
}

async fn list(ctx: &AppContext, owner: &str) -> Result<()> {
    let proposals = ctx.engine.lifecycle().list_proposals(owner).await?;
    if proposals.is_empty() {
        println!("{}", "No proposals found".yellow());
        println!(
            "{}",
            "Use 'proposekit proposals create <file>' to create your first proposal".dimmed()
        );
        return Ok(());
    }

    let mut t = table(vec!["ID", "Client", "Title", "Value", "Status", "Created"]);
    for proposal in &proposals {
        t.add_row(vec![
            proposal.id.clone(),
            truncate(&proposal.details.client_name, 25),
            truncate(proposal.display_title(), 30),
            format_currency(proposal.details.project_value),
            proposal.status_v2.to_string(),
            format_date(&proposal.created_at),
        ]);
    }
    println!("{}", t);
    println!("Total: {} proposals", proposals.len().to_string().cyan());
    Ok(())
}

async fn show(ctx: &AppContext, actor: &Actor, proposal: &ProposalRecord) -> Result<()> {
    let details = &proposal.details;
    println!(
        "{}",
        format!("Proposal - {}", proposal.display_title()).blue().bold()
    );

    let mut t = table(vec!["Field", "Value"]);
    t.add_row(vec!["ID".to_string(), proposal.id.clone()]);
    t.add_row(vec!["Client".to_string(), details.client_name.clone()]);
    t.add_row(vec![
        "Value".to_string(),
        format_currency(details.project_value),
    ]);
    t.add_row(vec!["Status".to_string(), proposal.status_v2.to_string()]);
    t.add_row(vec!["Release".to_string(), proposal.status.to_string()]);
    t.add_row(vec!["Mode".to_string(), details.mode.to_string()]);
    if let Some(amount) = details.deposit_amount() {
        t.add_row(vec!["Deposit".to_string(), format_currency(amount)]);
    }
    t.add_row(vec![
        "Content".to_string(),
        if proposal.content.is_some() {
            "cached".to_string()
        } else {
            "not drafted".to_string()
        },
    ]);
    t.add_row(vec!["Created".to_string(), format_date(&proposal.created_at)]);
    t.add_row(vec![
        "Approved".to_string(),
        format_optional_date(proposal.approved_at.as_ref()),
    ]);
    t.add_row(vec![
        "Paid".to_string(),
        format_optional_date(proposal.paid_at.as_ref()),
    ]);
    println!("{}", t);
    print_link(ctx, proposal);

    if let Some(latest) = ctx
        .engine
        .lifecycle()
        .latest_acceptance(actor, &proposal.id)
        .await?
    {
        println!(
            "{} {} <{}> on {}",
            "Accepted by".bold(),
            latest.signer_name,
            latest.signer_email,
            format_date(&latest.accepted_at)
        );
    }

    let contract = ctx
        .engine
        .change_requests()
        .contract_value(actor, &proposal.id)
        .await?;
    if contract.total != contract.base_value {
        println!(
            "{} {}",
            "Contract value with amendments:".bold(),
            format_currency(contract.total)
        );
    }
    Ok(())
}
