//! Automatic payment reminder scheduler.
//!
//! Offset N is due at local midnight N days after the invoice's send
//! date. Each send is reserved by a conditional write before the email
//! goes out, and the reservation is handed back if delivery fails.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_shared::EmailTemplate;
use tracing::{debug, info, warn};

use crate::activity::{ActivityEntry, ActivityKind};
use crate::billing::{BillingContext, BillingError};
use crate::document::{Document, ReminderOffset};
use crate::schedule::calendar::BillingCalendar;
use crate::store::{ReminderClaim, ReminderSlot};

/// Counters reported by one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderRunSummary {
    /// Reminders delivered.
    pub sent: u32,
    /// Reminders that failed.
    pub errors: u32,
}

/// Offsets of `invoice` that are due at `now` and have not fired, with
/// their due instants, ascending.
#[must_use]
pub fn due_offsets(
    invoice: &Document,
    calendar: &BillingCalendar,
    now: DateTime<Utc>,
) -> Vec<(ReminderOffset, DateTime<Utc>)> {
    let Some(sent_at) = invoice.sent_at else {
        return Vec::new();
    };
    let mut offsets = invoice.reminders.offsets.clone();
    offsets.sort_unstable();
    offsets.dedup();
    offsets
        .into_iter()
        .filter_map(|offset| {
            calendar
                .midnight_after(sent_at, offset.days())
                .map(|due| (offset, due))
        })
        .filter(|(offset, due)| now >= *due && !invoice.reminders.has_fired(*offset, *due))
        .collect()
}

/// Sends due automatic reminders.
pub struct ReminderScheduler {
    ctx: BillingContext,
}

impl ReminderScheduler {
    /// Creates a scheduler.
    #[must_use]
    pub const fn new(ctx: BillingContext) -> Self {
        Self { ctx }
    }

    /// Processes every eligible invoice once.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ReminderRunSummary, BillingError> {
        let candidates = self.ctx.documents.reminder_candidates().await?;
        let mut summary = ReminderRunSummary::default();

        for invoice in &candidates {
            self.process(invoice.clone(), now, &mut summary).await;
        }

        info!(
            candidates = candidates.len(),
            sent = summary.sent,
            errors = summary.errors,
            "Reminder run finished"
        );
        Ok(summary)
    }

    async fn process(
        &self,
        mut invoice: Document,
        now: DateTime<Utc>,
        summary: &mut ReminderRunSummary,
    ) {
        let Some(email) = invoice.client.email.clone() else {
            return;
        };
        let business_name = match self.ctx.profile(invoice.owner_id).await {
            Ok(profile) => profile.business_name,
            Err(err) => {
                summary.errors += 1;
                warn!(document_id = %invoice.id, error = %err, "Reminder skipped");
                return;
            }
        };

        for (offset, due) in due_offsets(&invoice, &self.ctx.rules.calendar, now) {
            // An earlier send in this loop may already cover this offset.
            if invoice.reminders.has_fired(offset, due) {
                continue;
            }
            let claim = ReminderClaim {
                owner_id: invoice.owner_id,
                document_id: invoice.id,
                slot: ReminderSlot::Auto(offset),
                threshold: due,
                previous_last: invoice.reminders.last_reminder_at,
                claimed_at: now,
            };
            match self
                .send_claimed(&invoice, &claim, &email, &business_name)
                .await
            {
                Ok(true) => {
                    summary.sent += 1;
                    claim.apply_to(&mut invoice);
                }
                Ok(false) => {
                    debug!(
                        document_id = %invoice.id,
                        offset = offset.days(),
                        "Reminder already claimed by a concurrent run"
                    );
                }
                Err(err) => {
                    summary.errors += 1;
                    warn!(
                        document_id = %invoice.id,
                        offset = offset.days(),
                        error = %err,
                        "Reminder failed"
                    );
                }
            }
        }
    }

    /// Claims, sends, and records one reminder. `Ok(false)` means another
    /// run holds the claim.
    async fn send_claimed(
        &self,
        invoice: &Document,
        claim: &ReminderClaim,
        email: &str,
        business_name: &str,
    ) -> Result<bool, BillingError> {
        let ReminderSlot::Auto(offset) = claim.slot else {
            return Ok(false);
        };
        if !self.ctx.documents.claim_reminder(claim).await? {
            return Ok(false);
        }

        let template = EmailTemplate::AutoReminder {
            days: offset.days(),
        };
        if let Err(err) = self
            .ctx
            .mailer
            .send(email, template, &invoice.email_params(business_name))
            .await
        {
            if let Err(release_err) = self.ctx.documents.release_reminder(claim).await {
                warn!(
                    document_id = %invoice.id,
                    error = %release_err,
                    "Could not release reminder claim"
                );
            }
            return Err(err.into());
        }

        let entry =
            ActivityEntry::for_document(invoice, ActivityKind::AutoReminderSent, claim.claimed_at)
                .with_detail(format!("{}d", offset.days()));
        self.ctx.documents.append_activity(&entry).await?;
        Ok(true)
    }
}
