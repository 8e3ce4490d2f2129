// ABOUTME: Append-only audit trail of proposal events
// ABOUTME: Events are facts; no state-machine validation happens here

use std::sync::Arc;

use chrono::Utc;
use proposekit_core::{EventType, ProposalEvent};
use proposekit_storage::ProposalStorage;
use tracing::error;

use crate::error::EngineResult;

#[derive(Clone)]
pub struct EventLog {
    storage: Arc<dyn ProposalStorage>,
}

impl EventLog {
    pub fn new(storage: Arc<dyn ProposalStorage>) -> Self {
        Self { storage }
    }

    pub async fn record(
        &self,
        proposal_id: &str,
        event_type: EventType,
        metadata: serde_json::Value,
    ) -> EngineResult<ProposalEvent> {
        Ok(self
            .storage
            .append_event(proposal_id, &event_type, &metadata, Utc::now())
            .await?)
    }

    /// Append after a committed transition; a failure is an audit gap, not a rollback
    pub(crate) async fn record_after_transition(
        &self,
        proposal_id: &str,
        event_type: EventType,
        metadata: serde_json::Value,
    ) -> Option<ProposalEvent> {
        let tag = event_type.to_string();
        match self.record(proposal_id, event_type, metadata).await {
            Ok(event) => Some(event),
            Err(e) => {
                error!(
                    "Audit gap: failed to record '{}' event for proposal {}: {}",
                    tag, proposal_id, e
                );
                None
            }
        }
    }

    /// Newest first
    pub async fn list(&self, proposal_id: &str) -> EngineResult<Vec<ProposalEvent>> {
        Ok(self.storage.list_events(proposal_id).await?)
    }
}
