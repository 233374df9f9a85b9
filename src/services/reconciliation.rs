//! Cargo record status reconciliation from linked repair tickets

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{enums::{repair_status_is_closed, RecordStatus}, repair::ReconcileSummary},
    repository::{outbox::OutboxEntry, Repository},
};

/// Pending outbox entries handled per drain pass
const DRAIN_BATCH: i64 = 500;

/// Stored record status implied by the statuses of a cargo's tickets.
///
/// Any open ticket holds the cargo; once every ticket is closed it opens
/// again. No tickets means nothing to reconcile.
pub fn reconcile_verdict<'a, I>(statuses: I) -> Option<RecordStatus>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut any_closed = false;
    for status in statuses {
        if !repair_status_is_closed(status) {
            return Some(RecordStatus::OnHold);
        }
        any_closed = true;
    }
    any_closed.then_some(RecordStatus::Open)
}

#[derive(Clone)]
pub struct Reconciler {
    repository: Repository,
}

impl Reconciler {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Recompute and store the record status of one cargo.
    ///
    /// Returns the verdict written, or None when the cargo has no linked
    /// tickets or no longer exists.
    pub async fn reconcile_cargo(&self, cargo_id: Uuid) -> AppResult<Option<RecordStatus>> {
        let tickets = self.repository.repairs.list_linked(cargo_id).await?;
        let Some(verdict) = reconcile_verdict(tickets.iter().map(|t| t.status.as_str())) else {
            tracing::debug!("Cargo {}: no linked repair tickets", cargo_id);
            return Ok(None);
        };

        let mut tx = self.repository.begin().await?;
        match self.repository.cargo.lock(&mut tx, cargo_id).await {
            Ok(_) => {}
            Err(AppError::NotFound(_)) => {
                tracing::debug!("Cargo {} linked from repair tickets does not exist", cargo_id);
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
        let changed = self
            .repository
            .cargo
            .set_record_status(&mut tx, cargo_id, verdict.stored())
            .await?;
        tx.commit().await?;

        if changed {
            tracing::info!(
                "Cargo {}: record status reconciled to {} from {} repair ticket(s)",
                cargo_id,
                verdict.stored(),
                tickets.len()
            );
        }
        Ok(Some(verdict))
    }

    /// Attempt the reconciliation queued by a committed ticket write.
    ///
    /// Never fails: errors are logged and left on the outbox entry for a
    /// later drain.
    pub async fn after_ticket_commit(&self, cargo_id: Uuid, outbox_id: Uuid) {
        match self.reconcile_cargo(cargo_id).await {
            Ok(_) => {
                if let Err(e) = self.repository.outbox.mark_processed(cargo_id).await {
                    tracing::warn!("Cargo {}: cannot settle outbox entries: {}", cargo_id, e);
                }
            }
            Err(e) => {
                tracing::warn!("Cargo {}: reconciliation failed, left pending: {}", cargo_id, e);
                if let Err(mark_err) = self.repository.outbox.mark_failed(outbox_id, &e.to_string()).await {
                    tracing::warn!("Outbox entry {}: cannot record failure: {}", outbox_id, mark_err);
                }
            }
        }
    }

    /// Retry every pending reconciliation, one attempt per cargo
    pub async fn drain_outbox(&self) -> AppResult<ReconcileSummary> {
        let pending = self.repository.outbox.pending(DRAIN_BATCH).await?;
        let mut by_cargo: HashMap<Uuid, Vec<OutboxEntry>> = HashMap::new();
        for entry in pending {
            by_cargo.entry(entry.cargo_id).or_default().push(entry);
        }

        let mut summary = ReconcileSummary::default();
        for (cargo_id, entries) in by_cargo {
            match self.reconcile_cargo(cargo_id).await {
                Ok(_) => {
                    summary.processed += self.repository.outbox.mark_processed(cargo_id).await?;
                }
                Err(e) => {
                    tracing::warn!("Cargo {}: reconciliation retry failed: {}", cargo_id, e);
                    let message = e.to_string();
                    for entry in &entries {
                        self.repository.outbox.mark_failed(entry.id, &message).await?;
                    }
                    summary.failed += entries.len() as u64;
                }
            }
        }

        if summary.processed > 0 || summary.failed > 0 {
            tracing::info!(
                "Reconciliation outbox drained: {} processed, {} failed",
                summary.processed,
                summary.failed
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_tickets_no_verdict() {
        assert_eq!(reconcile_verdict(Vec::<&str>::new()), None);
    }

    #[test]
    fn test_one_of_two_tickets_closed_holds_cargo() {
        let verdict = reconcile_verdict(["COMPLETED", "REPAIRING"]);
        assert_eq!(verdict, Some(RecordStatus::OnHold));
        assert_eq!(verdict.map(RecordStatus::stored), Some("ON_HOLD"));
    }

    #[test]
    fn test_both_tickets_closed_opens_cargo() {
        let verdict = reconcile_verdict(["COMPLETED", "UNREPAIRABLE"]);
        assert_eq!(verdict, Some(RecordStatus::Open));
        assert_eq!(verdict.map(RecordStatus::stored), Some("OPEN"));
    }

    #[test]
    fn test_unknown_ticket_status_counts_as_open() {
        assert_eq!(
            reconcile_verdict(["COMPLETED", "SHIPPED_TO_VENDOR"]),
            Some(RecordStatus::OnHold)
        );
    }
}
