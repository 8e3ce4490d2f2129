// ABOUTME: Client-side commands addressed by share id
// ABOUTME: Open the proposal, accept it and see deposit instructions

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use proposekit_cli::AppContext;
use proposekit_core::{format_currency, AcceptanceInput, ProposalContent};
use proposekit_engine::PublicProposal;

use super::output::print_json;

#[derive(Subcommand)]
pub enum PublicCommands {
    /// Open a proposal link; records a view
    Open {
        share_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Accept a proposal as the client
    Accept {
        share_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: Option<String>,
    },
    /// Show deposit payment instructions
    Deposit { share_id: String },
}

pub async fn handle(ctx: &AppContext, command: PublicCommands) -> Result<()> {
    let public = ctx.engine.public();

    match command {
        PublicCommands::Open { share_id, json } => {
            let opened = public.open(&share_id).await?;
            if json {
                return print_json(&opened);
            }
            match opened {
                PublicProposal::Restricted { title, message, .. } => {
                    println!("{}", title.yellow().bold());
                    println!("{}", message);
                }
                PublicProposal::Full(view) => {
                    println!("{}", view.title.blue().bold());
                    println!("Plano de Trabalho para {}", view.client_name);
                    println!(
                        "{} {}  {} {}",
                        "Status:".bold(),
                        view.status,
                        "Investimento:".bold(),
                        format_currency(view.project_value)
                    );
                    println!();
                    print_content(&view.content);
                    for option in &view.upsell_options {
                        println!("  + {} ({})", option.title, format_currency(option.value));
                    }
                }
            }
        }
        PublicCommands::Accept {
            share_id,
            name,
            email,
            role,
        } => {
            let input = AcceptanceInput {
                name,
                email,
                role,
                acceptance_ip: None,
                user_agent: Some(format!("proposekit-cli/{}", env!("CARGO_PKG_VERSION"))),
            };
            let outcome = ctx.engine.lifecycle().accept(&share_id, input).await?;
            println!(
                "{} Accepted by {}; proposal is {}",
                "✓".green(),
                outcome.acceptance.signer_name,
                outcome.status
            );
            if let Some(amount) = outcome.deposit_amount {
                println!("Deposit due: {}", format_currency(amount).cyan());
            }
        }
        PublicCommands::Deposit { share_id } => {
            let view = public.deposit_view(&share_id).await?;
            println!("{}", view.heading.blue().bold());
            println!("{} {}", "Valor:".bold(), view.amount_formatted);
            println!("{} {}", "Chave Pix:".bold(), view.pix_key);
            println!("{} {}", "Beneficiário:".bold(), view.receiver_name);
            if let Some(document) = &view.receiver_document {
                println!("{} {}", "Documento:".bold(), document);
            }
        }
    }

    Ok(())
}

fn print_content(content: &ProposalContent) {
    println!("{}", content.introduction);
    println!();
    println!("{}", "Escopo".bold());
    for item in &content.scope {
        println!("  - {}", item);
    }
    if let Some(out_of_scope) = &content.out_of_scope {
        println!("{} {}", "Fora do escopo:".bold(), out_of_scope);
    }
    println!("{} {}", "Investimento:".bold(), content.investment);
    println!("{} {}", "Prazo:".bold(), content.timeline);
    println!("{} {}", "Próximos passos:".bold(), content.next_steps);
}
