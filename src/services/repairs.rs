//! Repair tickets and their cargo link

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        enums::normalize_repair_status,
        repair::{CreateRepair, RepairTicket, RepairTicketDetails, UpdateRepair},
        repair_metadata::RepairMetadata,
    },
    notes,
    repository::{
        outbox::OutboxRepository,
        repairs::{NewRepair, RepairChanges, RepairsRepository},
        Repository,
    },
};

use super::reconciliation::Reconciler;

/// Notes to store for a ticket write.
///
/// Submitted `details` always become the metadata line. Otherwise the
/// metadata line already on the ticket survives an edit of the body.
fn compose_notes(
    submitted: Option<&str>,
    details: Option<&RepairMetadata>,
    existing: Option<&str>,
) -> Option<String> {
    let body = match submitted {
        Some(text) => notes::decode(text).clean_text,
        None if details.is_some() => existing.map(|t| notes::decode(t).clean_text).unwrap_or_default(),
        None => return None,
    };

    let submitted_details = details.cloned().map(|mut m| {
        m.costs = m.costs.totaled();
        m
    });
    let metadata = submitted_details.or_else(|| {
        submitted
            .and_then(|t| notes::decode(t).metadata)
            .or_else(|| existing.and_then(|t| notes::decode(t).metadata))
    });

    Some(match metadata {
        Some(ref m) => notes::encode(&body, m),
        None => body,
    })
}

/// Cargo ids whose status may change after a ticket moved from `before` to `after`
fn affected_cargo(before: Option<Uuid>, after: Option<Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = before.into_iter().chain(after).collect();
    ids.dedup();
    ids
}

#[derive(Clone)]
pub struct RepairsService {
    repository: Repository,
    reconciler: Reconciler,
}

impl RepairsService {
    pub fn new(repository: Repository, reconciler: Reconciler) -> Self {
        Self {
            repository,
            reconciler,
        }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<RepairTicketDetails> {
        Ok(self.repository.repairs.get_by_id(id).await?.into())
    }

    /// Create a ticket; a cargo tag in its notes queues reconciliation
    pub async fn create(&self, request: &CreateRepair) -> AppResult<RepairTicketDetails> {
        request.validate()?;

        let text = compose_notes(request.notes.as_deref(), request.details.as_ref(), None);
        let cargo_id = text.as_deref().and_then(notes::extract_cargo_link);

        let data = NewRepair {
            device_name: request.device_name.clone(),
            model: request.model.clone(),
            serial_number: request.serial_number.as_deref().map(|s| s.trim().to_string()),
            customer_name: request.customer_name.clone(),
            status: request
                .status
                .as_deref()
                .map(normalize_repair_status)
                .unwrap_or_else(|| "RECEIVED".to_string()),
            notes: text,
            cargo_id,
        };

        let mut tx = self.repository.begin().await?;
        let ticket = RepairsRepository::insert(&mut tx, &data).await?;
        let mut queued = Vec::new();
        for cargo_id in affected_cargo(None, ticket.cargo_id) {
            queued.push((cargo_id, OutboxRepository::enqueue(&mut tx, cargo_id, Some(ticket.id)).await?));
        }
        tx.commit().await?;

        tracing::info!("Created repair ticket {} ({})", ticket.id, ticket.status);
        self.reconcile(queued).await;
        Ok(ticket.into())
    }

    /// Update a ticket and reconcile every cargo it was or is linked to
    pub async fn update(&self, id: Uuid, request: &UpdateRepair) -> AppResult<RepairTicketDetails> {
        request.validate()?;
        let existing = self.repository.repairs.get_by_id(id).await?;

        let text = compose_notes(
            request.notes.as_deref(),
            request.details.as_ref(),
            existing.notes.as_deref(),
        );
        let changes = RepairChanges {
            device_name: request.device_name.clone(),
            model: request.model.clone(),
            serial_number: request.serial_number.as_deref().map(|s| s.trim().to_string()),
            customer_name: request.customer_name.clone(),
            status: request.status.as_deref().map(normalize_repair_status),
            cargo_id: text.as_deref().map(notes::extract_cargo_link),
            notes: text,
        };

        self.write(&existing, &changes).await
    }

    /// Embed a cargo tag in the ticket's notes, replacing any previous one
    pub async fn link(&self, id: Uuid, cargo_id: Uuid) -> AppResult<RepairTicketDetails> {
        self.repository.cargo.get_by_id(cargo_id).await?;
        let existing = self.repository.repairs.get_by_id(id).await?;

        let changes = RepairChanges {
            notes: Some(notes::with_cargo_link(existing.notes.as_deref(), cargo_id)),
            cargo_id: Some(Some(cargo_id)),
            ..Default::default()
        };

        self.write(&existing, &changes).await
    }

    /// Persist ticket changes together with their outbox entries, then reconcile
    async fn write(
        &self,
        existing: &RepairTicket,
        changes: &RepairChanges,
    ) -> AppResult<RepairTicketDetails> {
        let before = existing
            .cargo_id
            .or_else(|| existing.notes.as_deref().and_then(notes::extract_cargo_link));

        let mut tx = self.repository.begin().await?;
        let ticket = RepairsRepository::update(&mut tx, existing.id, changes).await?;
        let mut queued = Vec::new();
        for cargo_id in affected_cargo(before, ticket.cargo_id) {
            queued.push((cargo_id, OutboxRepository::enqueue(&mut tx, cargo_id, Some(ticket.id)).await?));
        }
        tx.commit().await?;

        tracing::info!(
            "Updated repair ticket {} ({}), {} cargo reconciliation(s) queued",
            ticket.id,
            ticket.status,
            queued.len()
        );
        self.reconcile(queued).await;
        Ok(ticket.into())
    }

    async fn reconcile(&self, queued: Vec<(Uuid, Uuid)>) {
        for (cargo_id, outbox_id) in queued {
            self.reconciler.after_ticket_commit(cargo_id, outbox_id).await;
        }
    }
}
