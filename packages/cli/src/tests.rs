use std::collections::HashMap;

use pretty_assertions::assert_eq;
use proposekit_config::Settings;
use proposekit_core::{ProposalCreateInput, ProposalStatusV2};
use proposekit_engine::{Actor, ContentSource, PublicProposal};
use rust_decimal_macros::dec;

use crate::context::AppContext;
use crate::input::parse_json;

const CREATE_JSON: &str = r#"{
    "client_name": "Acme Ltda",
    "title": "Site institucional",
    "scope": "Design, Desenvolvimento",
    "project_value": "R$ 1.500,00",
    "mode": "closing",
    "deposit_required": true,
    "deposit_type": "percent",
    "deposit_value": 50
}"#;

fn settings_for(dir: &tempfile::TempDir) -> Settings {
    let mut vars = HashMap::new();
    vars.insert(
        "PROPOSEKIT_DATABASE_PATH".to_string(),
        dir.path().join("proposals.db").to_string_lossy().to_string(),
    );
    Settings::from_map(&vars).unwrap()
}

#[test]
fn test_create_input_accepts_text_currency() {
    let input: ProposalCreateInput = parse_json(CREATE_JSON).unwrap();
    let details = input.normalize().unwrap();
    assert_eq!(details.project_value, dec!(1500));
    assert_eq!(details.deposit_amount(), Some(dec!(750)));
}

#[test]
fn test_invalid_json_is_reported() {
    assert!(parse_json::<ProposalCreateInput>("{ not json").is_err());
}

#[tokio::test]
async fn test_context_opens_file_database_without_backend() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = AppContext::from_settings(settings_for(&dir)).await.unwrap();
    assert!(!ctx.engine.content().has_backend());

    let owner = Actor::user("local");
    let input: ProposalCreateInput = parse_json(CREATE_JSON).unwrap();
    let proposal = ctx
        .engine
        .lifecycle()
        .create_proposal("local", input)
        .await
        .unwrap();
    ctx.engine.lifecycle().share(&owner, &proposal.id).await.unwrap();

    match ctx.engine.public().open(&proposal.share_id).await.unwrap() {
        PublicProposal::Full(view) => {
            assert_eq!(view.status, ProposalStatusV2::Viewed);
            assert_eq!(view.content_source, ContentSource::Template);
        }
        PublicProposal::Restricted { .. } => panic!("closing proposal should be visible"),
    }

    // Reopening the same file sees the persisted state
    let reopened = AppContext::from_settings(settings_for(&dir)).await.unwrap();
    let listed = reopened.engine.lifecycle().list_proposals("local").await.unwrap();
    assert_eq!(listed.len(), 1);
}
