//! Recurring invoice scheduler.
//!
//! Invoked by an external timer. A due cycle is first reserved by moving
//! the template's `last_recurred_at` conditionally from the value read to
//! `now`, so overlapping runs generate it once. The successor is then
//! priced afresh, stored as sent and emailed. A failure after the
//! reservation gives the cycle back so the next run retries it; a
//! successor row already stored is kept.

use chrono::{DateTime, Days, TimeDelta, Utc};
use serde::Serialize;
use tally_shared::EmailTemplate;
use tally_shared::types::{DocumentId, LineItemId};
use tracing::{debug, info, warn};

use crate::activity::{ActivityEntry, ActivityKind};
use crate::billing::{BillingContext, BillingError};
use crate::document::{
    Document, LineItem, RecurrenceUnit, RecurringSchedule, ReminderSettings, new_public_id,
};
use crate::lifecycle::{DocumentKind, DocumentStatus};
use crate::pricing::{MoneyCalculator, PriceBreakdown};
use crate::schedule::calendar::BillingCalendar;

/// Counters reported by one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecurringRunSummary {
    /// Successors generated and delivered.
    pub generated: u32,
    /// Templates that failed.
    pub errors: u32,
}

/// When the next cycle of a template is due.
///
/// Minutes are exact; days land on local midnight of the target day.
#[must_use]
pub fn next_due(
    schedule: &RecurringSchedule,
    anchor: DateTime<Utc>,
    calendar: &BillingCalendar,
) -> Option<DateTime<Utc>> {
    match schedule.unit {
        RecurrenceUnit::Minutes => {
            anchor.checked_add_signed(TimeDelta::minutes(i64::from(schedule.every)))
        }
        RecurrenceUnit::Days => calendar.midnight_after(anchor, schedule.every),
    }
}

/// Builds the successor invoice of `template` for a new billing period.
///
/// The due date keeps the template's send-to-due gap, counted from the
/// generation day.
#[must_use]
pub fn build_successor(
    template: &Document,
    number: String,
    public_id: String,
    breakdown: &PriceBreakdown,
    calendar: &BillingCalendar,
    now: DateTime<Utc>,
) -> Document {
    let due_date = match (template.due_date, template.sent_at) {
        (Some(due), Some(sent)) => {
            let gap = (due - calendar.local_date(sent)).num_days().max(0);
            u64::try_from(gap)
                .ok()
                .and_then(|days| calendar.local_date(now).checked_add_days(Days::new(days)))
        }
        _ => None,
    };

    let line_items = template
        .line_items
        .iter()
        .map(|line| LineItem {
            id: LineItemId::new(),
            ..line.clone()
        })
        .collect();

    Document {
        id: DocumentId::new(),
        owner_id: template.owner_id,
        number,
        public_id,
        status: DocumentStatus::sent(DocumentKind::Invoice),
        currency: template.currency,
        client: template.client.clone(),
        line_items,
        discount: template.discount,
        vat_included: template.vat_included,
        processing_fee_included: template.processing_fee_included,
        processing_fee: breakdown.processing_fee,
        tax_amount: breakdown.tax_amount,
        amount: breakdown.total,
        due_date,
        created_at: now,
        updated_at: now,
        sent_at: Some(now),
        viewed_at: None,
        closed_at: None,
        decline_reason: None,
        invoice_id: None,
        recurring: None,
        recurring_parent_id: Some(template.id),
        reminders: ReminderSettings {
            auto_enabled: template.reminders.auto_enabled,
            offsets: template.reminders.offsets.clone(),
            ..ReminderSettings::default()
        },
    }
}

enum TemplateOutcome {
    NotDue,
    Generated,
}

/// Generates successors for due recurring templates.
pub struct RecurringScheduler {
    ctx: BillingContext,
}

impl RecurringScheduler {
    /// Creates a scheduler.
    #[must_use]
    pub const fn new(ctx: BillingContext) -> Self {
        Self { ctx }
    }

    /// Processes every eligible template once.
    ///
    /// Only loading the candidate list can fail the run; per-template
    /// failures are logged and counted.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RecurringRunSummary, BillingError> {
        let templates = self.ctx.documents.recurring_templates().await?;
        let mut summary = RecurringRunSummary::default();

        for template in &templates {
            match self.process(template, now).await {
                Ok(TemplateOutcome::Generated) => summary.generated += 1,
                Ok(TemplateOutcome::NotDue) => {}
                Err(err) => {
                    summary.errors += 1;
                    warn!(
                        document_id = %template.id,
                        error = %err,
                        "Recurring invoice generation failed"
                    );
                }
            }
        }

        info!(
            candidates = templates.len(),
            generated = summary.generated,
            errors = summary.errors,
            "Recurring run finished"
        );
        Ok(summary)
    }

    async fn process(
        &self,
        template: &Document,
        now: DateTime<Utc>,
    ) -> Result<TemplateOutcome, BillingError> {
        let (Some(schedule), Some(email)) = (template.recurring, template.client.email.as_deref())
        else {
            return Ok(TemplateOutcome::NotDue);
        };
        let Some(anchor) = schedule.last_recurred_at.or(template.sent_at) else {
            return Ok(TemplateOutcome::NotDue);
        };
        let calendar = &self.ctx.rules.calendar;
        let due = next_due(&schedule, anchor, calendar).ok_or_else(|| {
            BillingError::validation("INVALID_INTERVAL", "Recurring interval overflows")
        })?;
        if now < due {
            return Ok(TemplateOutcome::NotDue);
        }

        if !self
            .ctx
            .documents
            .claim_recurrence(template.id, schedule.last_recurred_at, now)
            .await?
        {
            debug!(
                document_id = %template.id,
                "Recurring cycle already claimed by a concurrent run"
            );
            return Ok(TemplateOutcome::NotDue);
        }

        if let Err(err) = self.generate(template, email, now).await {
            let released = self
                .ctx
                .documents
                .release_recurrence(template.id, now, schedule.last_recurred_at)
                .await?;
            debug!(document_id = %template.id, released, "Recurring cycle released");
            return Err(err);
        }
        Ok(TemplateOutcome::Generated)
    }

    async fn generate(
        &self,
        template: &Document,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<(), BillingError> {
        let calendar = &self.ctx.rules.calendar;
        let profile = self.ctx.profile(template.owner_id).await?;
        let breakdown =
            MoneyCalculator::calculate(&template.pricing_input(), &self.ctx.rules.pricing)?;
        let number = self
            .ctx
            .documents
            .next_number(template.owner_id, DocumentKind::Invoice)
            .await?;
        let successor =
            build_successor(template, number, new_public_id(), &breakdown, calendar, now);

        let entry = ActivityEntry::for_document(&successor, ActivityKind::RecurringGenerated, now)
            .with_related(template.id);
        self.ctx.documents.insert(&successor, &entry).await?;

        self.ctx
            .mailer
            .send(
                email,
                EmailTemplate::RecurringInvoice,
                &successor.email_params(&profile.business_name),
            )
            .await?;

        debug!(
            template_id = %template.id,
            successor_id = %successor.id,
            number = %successor.number,
            amount = successor.amount,
            "Recurring invoice generated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::InvoiceStatus;
    use chrono::{NaiveDate, TimeZone};

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, d, h, m, 0).unwrap()
    }

    #[test]
    fn test_next_due_minutes_is_exact() {
        let schedule = RecurringSchedule {
            unit: RecurrenceUnit::Minutes,
            every: 90,
            last_recurred_at: None,
        };
        assert_eq!(
            next_due(&schedule, utc(1, 10, 15), &BillingCalendar::default()),
            Some(utc(1, 11, 45))
        );
    }

    #[test]
    fn test_next_due_days_is_local_midnight() {
        let schedule = RecurringSchedule {
            unit: RecurrenceUnit::Days,
            every: 7,
            last_recurred_at: None,
        };
        assert_eq!(
            next_due(&schedule, utc(1, 16, 40), &BillingCalendar::default()),
            Some(utc(8, 0, 0))
        );
    }

    #[test]
    fn test_successor_due_date_keeps_gap() {
        let mut template = crate::test_fixtures::invoice(InvoiceStatus::Sent);
        template.sent_at = Some(utc(1, 9, 0));
        template.due_date = NaiveDate::from_ymd_opt(2026, 5, 15);
        let breakdown = PriceBreakdown {
            line_totals: vec![10_000],
            line_subtotal: 10_000,
            discount_amount: 0,
            subtotal: 10_000,
            tax_amount: 2_000,
            vat_included: false,
            amount_before_fee: 12_000,
            processing_fee: None,
            total: 12_000,
        };
        let successor = build_successor(
            &template,
            "INV-0009".into(),
            "p".into(),
            &breakdown,
            &BillingCalendar::default(),
            utc(8, 0, 5),
        );
        assert_eq!(successor.due_date, NaiveDate::from_ymd_opt(2026, 5, 22));
        assert_eq!(successor.amount, 12_000);
        assert_eq!(successor.recurring_parent_id, Some(template.id));
        assert_eq!(successor.recurring, None);
        assert_eq!(successor.status, DocumentStatus::sent(DocumentKind::Invoice));
    }
}
