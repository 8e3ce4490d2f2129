// ABOUTME: Integration tests for the proposal engine against an in-memory SQLite store
// ABOUTME: Uses a scripted generation backend to exercise caching, fallback and the full lifecycle

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;
use proposekit_core::{
    AcceptanceInput, ChangeRequest, ChangeRequestCreateInput, ChangeRequestStatus, Deposit,
    DepositStatus, DepositType, EventType, MoneyInput, PaymentDetails, ProposalAcceptance,
    ProposalContent, ProposalCreateInput, ProposalDetails, ProposalEvent, ProposalMode,
    ProposalRecord, ProposalStatusV2, ProposalUpdateInput,
};
use proposekit_engine::{
    Actor, ContentSource, DocumentFormat, Engine, EngineConfig, EngineError, GenerationBackend,
    GenerationBrief, GenerationError, PublicProposal,
};
use proposekit_storage::{
    DepositSettlement, NewAcceptance, PendingDeposit, ProposalStorage, SqliteStorage,
    StatusChange, StorageConfig, StorageError, StorageResult,
};
use rust_decimal_macros::dec;
use serde_json::json;

const OWNER: &str = "owner-1";

#[derive(Clone, Copy)]
enum Script {
    Complete,
    Malformed,
    Slow,
    /// Completes, but only after a short pause
    Paced,
}

struct ScriptedBackend {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn drafted(brief: &GenerationBrief) -> ProposalContent {
    ProposalContent {
        introduction: format!("Proposta para {}", brief.client_name),
        context: "Contexto gerado".to_string(),
        scope: vec!["Descoberta".to_string(), "Entrega".to_string()],
        out_of_scope: None,
        operation: "Reuniões semanais".to_string(),
        investment: brief.project_value.clone(),
        commercial_conditions: "Conforme combinado".to_string(),
        timeline: "30 dias".to_string(),
        next_steps: "Aprovar a proposta".to_string(),
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, brief: &GenerationBrief) -> Result<ProposalContent, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::Complete => Ok(drafted(brief)),
            Script::Malformed => {
                let mut content = drafted(brief);
                content.introduction = "   ".to_string();
                Ok(content)
            }
            Script::Slow => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(drafted(brief))
            }
            Script::Paced => {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok(drafted(brief))
            }
        }
    }
}

async fn memory_storage() -> SqliteStorage {
    let storage = SqliteStorage::new(StorageConfig::in_memory()).await.unwrap();
    storage.initialize().await.unwrap();
    storage
}

fn build_engine(
    storage: Arc<dyn ProposalStorage>,
    backend: Option<Arc<ScriptedBackend>>,
    generation_timeout: Duration,
) -> Engine {
    let config = EngineConfig {
        generation_timeout,
        public_base_url: "https://proposekit.test".to_string(),
    };
    Engine::new(
        storage,
        backend.map(|b| b as Arc<dyn GenerationBackend>),
        config,
    )
}

async fn engine_with(backend: Option<Arc<ScriptedBackend>>) -> Engine {
    build_engine(
        Arc::new(memory_storage().await),
        backend,
        Duration::from_millis(100),
    )
}

fn closing_input() -> ProposalCreateInput {
    ProposalCreateInput {
        client_name: Some("Acme Ltda".to_string()),
        title: Some("Site institucional".to_string()),
        objective: Some("Gerar leads".to_string()),
        scope: Some("Design, Desenvolvimento; Deploy\nManutenção".to_string()),
        project_value: Some(dec!(1000).into()),
        mode: Some(ProposalMode::Closing),
        closing_enabled: true,
        deposit_required: true,
        deposit_type: Some(DepositType::Percent),
        deposit_value: Some(dec!(30).into()),
        payment: PaymentDetails {
            pix_key: Some("pix@acme.com".to_string()),
            pix_receiver_name: Some("Estúdio".to_string()),
            pix_receiver_document: None,
        },
        ..Default::default()
    }
}

fn signer() -> AcceptanceInput {
    AcceptanceInput {
        name: "Maria Silva".to_string(),
        email: "Maria@Acme.com".to_string(),
        role: Some("CEO".to_string()),
        acceptance_ip: Some("10.0.0.1".to_string()),
        user_agent: None,
    }
}

async fn shared_closing(engine: &Engine) -> ProposalRecord {
    let owner = Actor::user(OWNER);
    let proposal = engine
        .lifecycle()
        .create_proposal(OWNER, closing_input())
        .await
        .unwrap();
    engine.lifecycle().share(&owner, &proposal.id).await.unwrap()
}

fn event_types(events: &[ProposalEvent]) -> Vec<EventType> {
    events.iter().map(|e| e.event_type.clone()).collect()
}

#[tokio::test]
async fn test_generation_is_cached_and_backend_called_once() {
    let backend = ScriptedBackend::new(Script::Complete);
    let engine = engine_with(Some(backend.clone())).await;
    let proposal = engine
        .lifecycle()
        .create_proposal(OWNER, closing_input())
        .await
        .unwrap();

    let first = engine.content().content_for(&proposal).await;
    // Same stale record: the generator must find the stored copy
    let second = engine.content().content_for(&proposal).await;

    assert_eq!(first.source, ContentSource::Generative);
    assert_eq!(second.source, ContentSource::Cached);
    assert_eq!(first.content, second.content);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_unconfigured_backend_falls_back_to_template() {
    let engine = engine_with(None).await;
    let proposal = engine
        .lifecycle()
        .create_proposal(OWNER, closing_input())
        .await
        .unwrap();

    let generated = engine.content().content_for(&proposal).await;
    assert_eq!(generated.source, ContentSource::Template);
    assert!(generated.content.is_complete());
    assert_eq!(generated.content.out_of_scope, None);
    assert_eq!(
        generated.content.scope,
        vec!["Design", "Desenvolvimento", "Deploy", "Manutenção"]
    );

    let stored = engine.storage().get_content(&proposal.id).await.unwrap();
    assert_eq!(stored, None);
}

#[tokio::test]
async fn test_malformed_output_falls_back_and_is_not_cached() {
    let backend = ScriptedBackend::new(Script::Malformed);
    let engine = engine_with(Some(backend.clone())).await;
    let proposal = engine
        .lifecycle()
        .create_proposal(OWNER, closing_input())
        .await
        .unwrap();

    let generated = engine.content().content_for(&proposal).await;
    assert_eq!(generated.source, ContentSource::Template);
    assert!(generated.content.is_complete());
    assert_eq!(backend.calls(), 1);
    assert_eq!(engine.storage().get_content(&proposal.id).await.unwrap(), None);

    let strict = engine.content().generate_strict(&proposal).await;
    assert!(matches!(strict, Err(EngineError::GenerationFailed(_))));
}

#[tokio::test]
async fn test_slow_backend_times_out_to_template() {
    let backend = ScriptedBackend::new(Script::Slow);
    let engine = engine_with(Some(backend.clone())).await;
    let proposal = engine
        .lifecycle()
        .create_proposal(OWNER, closing_input())
        .await
        .unwrap();

    let generated = engine.content().content_for(&proposal).await;
    assert_eq!(generated.source, ContentSource::Template);
    assert!(generated.content.is_complete());
}

#[tokio::test]
async fn test_create_requires_project_value() {
    let engine = engine_with(None).await;
    let input = ProposalCreateInput {
        client_name: Some("Acme".to_string()),
        ..Default::default()
    };
    let err = engine
        .lifecycle()
        .create_proposal(OWNER, input)
        .await
        .unwrap_err();
    match err {
        EngineError::Validation(errors) => assert!(errors.has_field("project_value")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(engine.lifecycle().list_proposals(OWNER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_share_ids_are_unique_and_opaque() {
    let engine = engine_with(None).await;
    let mut share_ids = std::collections::HashSet::new();
    for _ in 0..20 {
        let proposal = engine
            .lifecycle()
            .create_proposal(OWNER, closing_input())
            .await
            .unwrap();
        assert_ne!(proposal.share_id, proposal.id);
        assert!(share_ids.insert(proposal.share_id));
    }
}

#[tokio::test]
async fn test_end_to_end_acceptance_and_payment() {
    let engine = engine_with(None).await;
    let owner = Actor::user(OWNER);
    let proposal = shared_closing(&engine).await;
    assert_eq!(proposal.status_v2, ProposalStatusV2::Sent);
    assert_eq!(proposal.details.deposit_amount(), Some(dec!(300)));

    let opened = engine.public().open(&proposal.share_id).await.unwrap();
    let view = match opened {
        PublicProposal::Full(view) => view,
        PublicProposal::Restricted { .. } => panic!("closing proposal should be visible"),
    };
    assert_eq!(view.status, ProposalStatusV2::Viewed);
    assert_eq!(view.deposit_amount, Some(dec!(300)));
    assert_eq!(view.share_id, proposal.share_id);

    let outcome = engine
        .lifecycle()
        .accept(&proposal.share_id, signer())
        .await
        .unwrap();
    assert_eq!(outcome.status, ProposalStatusV2::AwaitingDeposit);
    assert_eq!(outcome.deposit_amount, Some(dec!(300)));
    assert_eq!(outcome.acceptance.signer_email, "maria@acme.com");

    let latest = engine
        .lifecycle()
        .latest_acceptance(&owner, &proposal.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, outcome.acceptance.id);
    assert_eq!(latest.signer_role.as_deref(), Some("CEO"));

    let deposit_page = engine.public().deposit_view(&proposal.share_id).await.unwrap();
    assert!(!deposit_page.is_paid);
    assert_eq!(deposit_page.amount_formatted, "R$ 300,00");
    assert_eq!(deposit_page.pix_key, "pix@acme.com");

    let payment = engine
        .lifecycle()
        .mark_deposit_paid(&owner, &proposal.id)
        .await
        .unwrap();
    assert!(!payment.already_paid);
    assert_eq!(payment.proposal.status_v2, ProposalStatusV2::Paid);
    assert!(payment.proposal.paid_at.is_some());
    assert!(payment.proposal.approved_at.is_some());
    let deposit = payment.deposit.unwrap();
    assert_eq!(deposit.amount, dec!(300));
    assert_eq!(deposit.status, DepositStatus::Paid);

    let timeline = engine.lifecycle().timeline(&owner, &proposal.id).await.unwrap();
    assert_eq!(
        event_types(&timeline),
        vec![EventType::MarkedPaid, EventType::Approved, EventType::View]
    );

    let deposits = engine.lifecycle().deposits(&owner, &proposal.id).await.unwrap();
    assert_eq!(deposits.len(), 1);

    let kicked_off = engine
        .lifecycle()
        .start_kickoff(&owner, &proposal.id)
        .await
        .unwrap();
    assert_eq!(kicked_off.status_v2, ProposalStatusV2::Kickoff);
    assert!(engine.public().deposit_view(&proposal.share_id).await.unwrap().is_paid);
}

#[tokio::test]
async fn test_paying_before_acceptance_is_rejected() {
    let engine = engine_with(None).await;
    let owner = Actor::user(OWNER);
    let proposal = shared_closing(&engine).await;
    engine.public().open(&proposal.share_id).await.unwrap();

    let err = engine
        .lifecycle()
        .mark_deposit_paid(&owner, &proposal.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PreconditionFailed(_)));

    let current = engine.lifecycle().get_proposal(&owner, &proposal.id).await.unwrap();
    assert_eq!(current.status_v2, ProposalStatusV2::Viewed);
    assert!(engine.lifecycle().deposits(&owner, &proposal.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_non_owner_cannot_mark_paid() {
    let engine = engine_with(None).await;
    let proposal = shared_closing(&engine).await;
    engine
        .lifecycle()
        .accept(&proposal.share_id, signer())
        .await
        .unwrap();

    let err = engine
        .lifecycle()
        .mark_deposit_paid(&Actor::user("intruder"), &proposal.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    let owner = Actor::user(OWNER);
    let current = engine.lifecycle().get_proposal(&owner, &proposal.id).await.unwrap();
    assert_eq!(current.status_v2, ProposalStatusV2::AwaitingDeposit);
    let timeline = engine.lifecycle().timeline(&owner, &proposal.id).await.unwrap();
    assert_eq!(event_types(&timeline), vec![EventType::Approved]);
}

#[tokio::test]
async fn test_payment_provider_settles_with_provider_method() {
    let engine = engine_with(None).await;
    let proposal = shared_closing(&engine).await;
    engine
        .lifecycle()
        .accept(&proposal.share_id, signer())
        .await
        .unwrap();

    let payment = engine
        .lifecycle()
        .mark_deposit_paid(&Actor::PaymentProvider, &proposal.id)
        .await
        .unwrap();
    assert_eq!(payment.proposal.status_v2, ProposalStatusV2::Paid);

    let again = engine
        .lifecycle()
        .mark_deposit_paid(&Actor::PaymentProvider, &proposal.id)
        .await
        .unwrap();
    assert!(again.already_paid);
    assert!(again.deposit.is_none());
}

#[tokio::test]
async fn test_concurrent_mark_paid_has_single_effect() {
    let engine = engine_with(None).await;
    let owner = Actor::user(OWNER);
    let proposal = shared_closing(&engine).await;
    engine
        .lifecycle()
        .accept(&proposal.share_id, signer())
        .await
        .unwrap();

    let lifecycle = engine.lifecycle();
    let (a, b) = tokio::join!(
        lifecycle.mark_deposit_paid(&owner, &proposal.id),
        lifecycle.mark_deposit_paid(&owner, &proposal.id),
    );

    let effective = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Ok(outcome) if !outcome.already_paid))
        .count();
    assert_eq!(effective, 1);
    for result in [&a, &b] {
        match result {
            Ok(_) | Err(EngineError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let deposits = engine.lifecycle().deposits(&owner, &proposal.id).await.unwrap();
    let paid = deposits
        .iter()
        .filter(|d| d.status == DepositStatus::Paid)
        .count();
    assert_eq!(paid, 1);
    assert_eq!(deposits.len(), 1);

    let timeline = engine.lifecycle().timeline(&owner, &proposal.id).await.unwrap();
    let marked = timeline
        .iter()
        .filter(|e| e.event_type == EventType::MarkedPaid)
        .count();
    assert_eq!(marked, 1);
}

#[tokio::test]
async fn test_draft_proposal_link_is_restricted() {
    let engine = engine_with(None).await;
    let proposal = engine
        .lifecycle()
        .create_proposal(OWNER, closing_input())
        .await
        .unwrap();

    let opened = engine.public().open(&proposal.share_id).await.unwrap();
    assert!(opened.is_restricted());

    let err = engine
        .lifecycle()
        .accept(&proposal.share_id, signer())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PreconditionFailed(_)));

    let timeline = engine
        .lifecycle()
        .timeline(&Actor::user(OWNER), &proposal.id)
        .await
        .unwrap();
    assert!(timeline.is_empty());

    let missing = engine.public().open("does-not-exist").await.unwrap_err();
    assert!(matches!(missing, EngineError::NotFound(_)));
}

#[tokio::test]
async fn test_released_proposal_without_deposit_approves_then_pays() {
    let engine = engine_with(None).await;
    let owner = Actor::user(OWNER);
    let input = ProposalCreateInput {
        client_name: Some("Beta".to_string()),
        project_value: Some(dec!(500).into()),
        ..Default::default()
    };
    let proposal = engine.lifecycle().create_proposal(OWNER, input).await.unwrap();
    engine.lifecycle().release(&owner, &proposal.id).await.unwrap();
    engine.lifecycle().share(&owner, &proposal.id).await.unwrap();

    let outcome = engine
        .lifecycle()
        .accept(&proposal.share_id, signer())
        .await
        .unwrap();
    assert_eq!(outcome.status, ProposalStatusV2::Approved);
    assert_eq!(outcome.deposit_amount, None);

    let err = engine.public().deposit_view(&proposal.share_id).await.unwrap_err();
    assert!(matches!(err, EngineError::PreconditionFailed(_)));

    let payment = engine
        .lifecycle()
        .mark_deposit_paid(&owner, &proposal.id)
        .await
        .unwrap();
    assert_eq!(payment.proposal.status_v2, ProposalStatusV2::Paid);
}

#[tokio::test]
async fn test_content_edit_invalidates_cache() {
    let backend = ScriptedBackend::new(Script::Complete);
    let engine = engine_with(Some(backend.clone())).await;
    let owner = Actor::user(OWNER);
    let proposal = engine
        .lifecycle()
        .create_proposal(OWNER, closing_input())
        .await
        .unwrap();
    engine.content().content_for(&proposal).await;
    assert!(engine.storage().get_content(&proposal.id).await.unwrap().is_some());

    let cosmetic = ProposalUpdateInput {
        public_title: Some("Nova vitrine".to_string()),
        ..Default::default()
    };
    engine
        .lifecycle()
        .update_proposal(&owner, &proposal.id, cosmetic)
        .await
        .unwrap();
    assert!(engine.storage().get_content(&proposal.id).await.unwrap().is_some());

    let narrative = ProposalUpdateInput {
        objective: Some("Vender mais".to_string()),
        ..Default::default()
    };
    let updated = engine
        .lifecycle()
        .update_proposal(&owner, &proposal.id, narrative)
        .await
        .unwrap();
    assert_eq!(updated.content, None);
    assert_eq!(engine.storage().get_content(&proposal.id).await.unwrap(), None);

    engine.content().content_for(&updated).await;
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_accepted_proposal_cannot_be_edited() {
    let engine = engine_with(None).await;
    let owner = Actor::user(OWNER);
    let proposal = shared_closing(&engine).await;
    engine
        .lifecycle()
        .accept(&proposal.share_id, signer())
        .await
        .unwrap();

    let err = engine
        .lifecycle()
        .update_proposal(
            &owner,
            &proposal.id,
            ProposalUpdateInput {
                project_value: Some(dec!(2000).into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PreconditionFailed(_)));
}

#[tokio::test]
async fn test_regenerate_records_event() {
    let backend = ScriptedBackend::new(Script::Complete);
    let engine = engine_with(Some(backend.clone())).await;
    let owner = Actor::user(OWNER);
    let proposal = engine
        .lifecycle()
        .create_proposal(OWNER, closing_input())
        .await
        .unwrap();
    engine.content().content_for(&proposal).await;

    let regenerated = engine.lifecycle().regenerate(&owner, &proposal.id).await.unwrap();
    assert_eq!(regenerated.source, ContentSource::Generative);
    assert_eq!(backend.calls(), 2);

    let timeline = engine.lifecycle().timeline(&owner, &proposal.id).await.unwrap();
    assert_eq!(event_types(&timeline), vec![EventType::ContentRegenerated]);
    assert_eq!(timeline[0].metadata["source"], json!("generative"));
}

#[tokio::test]
async fn test_regenerate_refused_after_acceptance() {
    let backend = ScriptedBackend::new(Script::Complete);
    let engine = engine_with(Some(backend.clone())).await;
    let owner = Actor::user(OWNER);
    let proposal = shared_closing(&engine).await;
    engine.public().open(&proposal.share_id).await.unwrap();
    engine
        .lifecycle()
        .accept(&proposal.share_id, signer())
        .await
        .unwrap();

    let err = engine
        .lifecycle()
        .regenerate(&owner, &proposal.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PreconditionFailed(_)));
    assert_eq!(backend.calls(), 1);

    // The signed content is still what the client sees
    let cached = engine.storage().get_content(&proposal.id).await.unwrap().unwrap();
    assert_eq!(cached.introduction, "Proposta para Acme Ltda");
}

#[tokio::test]
async fn test_draft_finishing_after_edit_is_not_cached() {
    let backend = ScriptedBackend::new(Script::Paced);
    let engine = build_engine(
        Arc::new(memory_storage().await),
        Some(backend.clone()),
        Duration::from_secs(5),
    );
    let owner = Actor::user(OWNER);
    let proposal = shared_closing(&engine).await;

    let rename = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        engine
            .lifecycle()
            .update_proposal(
                &owner,
                &proposal.id,
                ProposalUpdateInput {
                    client_name: Some("NewClient".to_string()),
                    ..Default::default()
                },
            )
            .await
    };
    let (first, renamed) = tokio::join!(engine.public().open(&proposal.share_id), rename);
    first.unwrap();
    assert_eq!(renamed.unwrap().details.client_name, "NewClient");
    assert_eq!(engine.storage().get_content(&proposal.id).await.unwrap(), None);

    let view = match engine.public().open(&proposal.share_id).await.unwrap() {
        PublicProposal::Full(view) => view,
        PublicProposal::Restricted { .. } => panic!("closing proposal should be visible"),
    };
    assert_eq!(view.client_name, "NewClient");
    assert_eq!(view.content.introduction, "Proposta para NewClient");
    assert_eq!(view.content_source, ContentSource::Generative);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_cancel_closes_proposal_and_pending_deposit() {
    let engine = engine_with(None).await;
    let owner = Actor::user(OWNER);
    let proposal = shared_closing(&engine).await;
    engine
        .lifecycle()
        .accept(&proposal.share_id, signer())
        .await
        .unwrap();

    let canceled = engine
        .lifecycle()
        .cancel(&owner, &proposal.id, Some("Cliente desistiu".to_string()))
        .await
        .unwrap();
    assert_eq!(canceled.status_v2, ProposalStatusV2::Canceled);
    assert!(canceled.canceled_at.is_some());

    let deposits = engine.lifecycle().deposits(&owner, &proposal.id).await.unwrap();
    assert_eq!(deposits[0].status, DepositStatus::Canceled);

    let timeline = engine.lifecycle().timeline(&owner, &proposal.id).await.unwrap();
    assert_eq!(timeline[0].event_type, EventType::Canceled);
    assert_eq!(timeline[0].metadata["previous_status"], json!("awaiting_deposit"));

    let again = engine.lifecycle().cancel(&owner, &proposal.id, None).await;
    assert!(matches!(again, Err(EngineError::PreconditionFailed(_))));
    let pay = engine.lifecycle().mark_deposit_paid(&owner, &proposal.id).await;
    assert!(matches!(pay, Err(EngineError::PreconditionFailed(_))));
}

#[tokio::test]
async fn test_change_requests_add_to_contract_value() {
    let engine = engine_with(None).await;
    let owner = Actor::user(OWNER);
    let proposal = shared_closing(&engine).await;
    let ledger = engine.change_requests();

    let amendment = |title: &str, total: MoneyInput| ChangeRequestCreateInput {
        title: title.to_string(),
        reason: None,
        added_scope: json!([title]),
        added_pricing: None,
        added_total: total,
    };

    let first = ledger
        .create(&owner, &proposal.id, amendment("Blog", dec!(200).into()))
        .await
        .unwrap();
    let second = ledger
        .create(&owner, &proposal.id, amendment("Loja", dec!(150).into()))
        .await
        .unwrap();
    ledger
        .create(&owner, &proposal.id, amendment("App", dec!(999).into()))
        .await
        .unwrap();
    assert_ne!(first.share_id, second.share_id);
    assert_ne!(first.share_id, first.id);

    let page = ledger.open(&first.share_id).await.unwrap();
    assert_eq!(page.reason, "Expansão de escopo solicitada.");
    assert_eq!(page.client_name, "Acme Ltda");

    ledger
        .approve(&first.share_id, "Maria", "maria@acme.com")
        .await
        .unwrap();
    ledger
        .approve(&second.share_id, "Maria", "maria@acme.com")
        .await
        .unwrap();
    let merged = ledger.merge(&owner, &second.share_id).await.unwrap();
    assert_eq!(merged.approved_by.as_deref(), Some("maria@acme.com"));

    let summary = ledger.contract_value(&owner, &proposal.id).await.unwrap();
    assert_eq!(summary.total, dec!(1350));
    assert_eq!(summary.pending_additions, dec!(999));

    let twice = ledger.approve(&first.share_id, "Maria", "maria@acme.com").await;
    assert!(matches!(twice, Err(EngineError::PreconditionFailed(_))));

    let intruder = ledger
        .create(&Actor::user("intruder"), &proposal.id, amendment("X", dec!(1).into()))
        .await;
    assert!(matches!(intruder, Err(EngineError::Unauthorized(_))));
}

#[tokio::test]
async fn test_render_and_followup_use_public_link() {
    let engine = engine_with(None).await;
    let owner = Actor::user(OWNER);
    let proposal = shared_closing(&engine).await;

    let html = engine
        .render(&owner, &proposal.id, DocumentFormat::Html)
        .await
        .unwrap();
    assert!(html.body.contains("Plano de Trabalho para Acme Ltda"));
    assert!(html.body.contains("<li>Manutenção</li>"));

    let followup = engine.followup(&owner, &proposal.id).await.unwrap();
    assert_eq!(
        followup.message,
        format!(
            "Olá Acme Ltda, segue nossa proposta comercial: https://proposekit.test/p/{}",
            proposal.share_id
        )
    );
    assert!(!followup.message.contains(&proposal.id));
}

/// Store whose event log is unavailable; everything else goes to SQLite
struct EventsUnavailable {
    inner: SqliteStorage,
}

#[async_trait]
impl ProposalStorage for EventsUnavailable {
    async fn initialize(&self) -> StorageResult<()> {
        self.inner.initialize().await
    }

    async fn insert_proposal(&self, proposal: &ProposalRecord) -> StorageResult<()> {
        self.inner.insert_proposal(proposal).await
    }

    async fn get_proposal(&self, id: &str) -> StorageResult<Option<ProposalRecord>> {
        self.inner.get_proposal(id).await
    }

    async fn get_proposal_by_share_id(
        &self,
        share_id: &str,
    ) -> StorageResult<Option<ProposalRecord>> {
        self.inner.get_proposal_by_share_id(share_id).await
    }

    async fn list_proposals_by_owner(&self, owner_id: &str) -> StorageResult<Vec<ProposalRecord>> {
        self.inner.list_proposals_by_owner(owner_id).await
    }

    async fn update_proposal_fields(
        &self,
        id: &str,
        expected: ProposalStatusV2,
        details: &ProposalDetails,
        clear_content: bool,
        at: DateTime<Utc>,
    ) -> StorageResult<ProposalRecord> {
        self.inner
            .update_proposal_fields(id, expected, details, clear_content, at)
            .await
    }

    async fn transition_status(
        &self,
        id: &str,
        change: StatusChange,
        at: DateTime<Utc>,
    ) -> StorageResult<ProposalRecord> {
        self.inner.transition_status(id, change, at).await
    }

    async fn release(&self, id: &str, at: DateTime<Utc>) -> StorageResult<bool> {
        self.inner.release(id, at).await
    }

    async fn accept_proposal(
        &self,
        id: &str,
        change: StatusChange,
        acceptance: &NewAcceptance,
        deposit: Option<&PendingDeposit>,
        at: DateTime<Utc>,
    ) -> StorageResult<ProposalAcceptance> {
        self.inner
            .accept_proposal(id, change, acceptance, deposit, at)
            .await
    }

    async fn settle_deposit(
        &self,
        id: &str,
        change: StatusChange,
        settlement: Option<&DepositSettlement>,
        at: DateTime<Utc>,
    ) -> StorageResult<Option<Deposit>> {
        self.inner.settle_deposit(id, change, settlement, at).await
    }

    async fn cancel_proposal(
        &self,
        id: &str,
        change: StatusChange,
        at: DateTime<Utc>,
    ) -> StorageResult<ProposalRecord> {
        self.inner.cancel_proposal(id, change, at).await
    }

    async fn get_content(&self, id: &str) -> StorageResult<Option<ProposalContent>> {
        self.inner.get_content(id).await
    }

    async fn save_content(
        &self,
        id: &str,
        content: &ProposalContent,
        expected_revision: i64,
        generated_at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        self.inner
            .save_content(id, content, expected_revision, generated_at)
            .await
    }

    async fn clear_content(&self, id: &str) -> StorageResult<i64> {
        self.inner.clear_content(id).await
    }

    async fn append_event(
        &self,
        _proposal_id: &str,
        _event_type: &EventType,
        _metadata: &serde_json::Value,
        _at: DateTime<Utc>,
    ) -> StorageResult<ProposalEvent> {
        Err(StorageError::InvalidData("event log is read-only".to_string()))
    }

    async fn list_events(&self, proposal_id: &str) -> StorageResult<Vec<ProposalEvent>> {
        self.inner.list_events(proposal_id).await
    }

    async fn latest_acceptance(
        &self,
        proposal_id: &str,
    ) -> StorageResult<Option<ProposalAcceptance>> {
        self.inner.latest_acceptance(proposal_id).await
    }

    async fn list_acceptances(&self, proposal_id: &str) -> StorageResult<Vec<ProposalAcceptance>> {
        self.inner.list_acceptances(proposal_id).await
    }

    async fn list_deposits(&self, proposal_id: &str) -> StorageResult<Vec<Deposit>> {
        self.inner.list_deposits(proposal_id).await
    }

    async fn insert_change_request(&self, change_request: &ChangeRequest) -> StorageResult<()> {
        self.inner.insert_change_request(change_request).await
    }

    async fn get_change_request_by_share_id(
        &self,
        share_id: &str,
    ) -> StorageResult<Option<ChangeRequest>> {
        self.inner.get_change_request_by_share_id(share_id).await
    }

    async fn list_change_requests(&self, proposal_id: &str) -> StorageResult<Vec<ChangeRequest>> {
        self.inner.list_change_requests(proposal_id).await
    }

    async fn transition_change_request(
        &self,
        id: &str,
        from: ChangeRequestStatus,
        to: ChangeRequestStatus,
        approved_by: Option<&str>,
        at: DateTime<Utc>,
    ) -> StorageResult<ChangeRequest> {
        self.inner
            .transition_change_request(id, from, to, approved_by, at)
            .await
    }
}

#[tokio::test]
async fn test_failed_event_append_keeps_committed_transition() {
    let storage = EventsUnavailable {
        inner: memory_storage().await,
    };
    let engine = build_engine(Arc::new(storage), None, Duration::from_millis(100));
    let owner = Actor::user(OWNER);
    let proposal = shared_closing(&engine).await;

    let outcome = engine
        .lifecycle()
        .accept(&proposal.share_id, signer())
        .await
        .unwrap();
    assert_eq!(outcome.status, ProposalStatusV2::AwaitingDeposit);

    let payment = engine
        .lifecycle()
        .mark_deposit_paid(&owner, &proposal.id)
        .await
        .unwrap();
    assert_eq!(payment.proposal.status_v2, ProposalStatusV2::Paid);
    assert_eq!(payment.deposit.unwrap().status, DepositStatus::Paid);

    let stored = engine.lifecycle().get_proposal(&owner, &proposal.id).await.unwrap();
    assert_eq!(stored.status_v2, ProposalStatusV2::Paid);
    assert!(engine
        .lifecycle()
        .timeline(&owner, &proposal.id)
        .await
        .unwrap()
        .is_empty());
}
