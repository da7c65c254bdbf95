//! Billing service.
//!
//! Binds the lifecycle rules to the stores and the mailer. Every
//! operation reads the document, validates the request against the
//! status it read, and writes conditionally on that status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::EmailTemplate;
use tally_shared::types::{DocumentId, OwnerId, PageRequest, PageResponse};
use tracing::{debug, info};

use crate::activity::{ActivityEntry, ActivityKind};
use crate::billing::context::BillingContext;
use crate::billing::error::BillingError;
use crate::derivation::{DerivationError, OfferDeriver};
use crate::document::{
    ClientRef, ClientSnapshot, Document, DocumentDraft, LineItem, OwnerProfile, Plan,
    PublicDocumentView, RecurrenceUnit, RecurringSchedule, ReminderOffset, new_public_id,
    validate_contact,
};
use crate::lifecycle::{
    DocumentKind, DocumentStatus, InvoiceStatus, LifecycleAction, LifecycleError,
    LifecycleService,
};
use crate::pricing::{Discount, MoneyCalculator, PriceBreakdown, PricingInput};
use crate::schedule::{RecurringRunSummary, RecurringScheduler, ReminderRunSummary, ReminderScheduler};
use crate::store::{ReminderClaim, ReminderSlot, SettlementWrite, StatusChange};

/// A verified settlement notification from the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SettlementEvent {
    /// Processor event id; settlement is idempotent on it.
    pub event_id: String,
    /// Checkout session the payment belongs to.
    pub session_id: String,
    /// Invoice the checkout session was opened for.
    pub invoice_id: DocumentId,
}

/// What applying a settlement event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// Invoice marked paid.
    Applied,
    /// Event seen before; nothing changed.
    Duplicate,
    /// Invoice was already paid by other means; nothing changed.
    AlreadyPaid,
}

/// Requested recurring interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RecurrenceRequest {
    /// Interval unit.
    pub unit: RecurrenceUnit,
    /// Interval length, at least 1.
    pub every: u32,
}

/// Requested reminder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReminderRequest {
    /// Turn automatic reminders on or off.
    pub enabled: bool,
    /// Offsets in days; each must be one of 1, 2, 3, 5, 7, 10, 14.
    #[serde(default)]
    pub offsets: Vec<u32>,
}

/// An accepted offer and the invoice derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedOffer {
    /// The offer, now accepted and linked.
    pub offer: Document,
    /// The new invoice.
    pub invoice: Document,
}

struct PricedContent {
    currency: tally_shared::types::Currency,
    vat_included: bool,
    line_items: Vec<LineItem>,
    discount: Discount,
    breakdown: PriceBreakdown,
}

/// Owner, client and scheduler operations on invoices and offers.
#[derive(Clone)]
pub struct BillingService {
    ctx: BillingContext,
}

impl BillingService {
    /// Creates a service over the given collaborators.
    #[must_use]
    pub const fn new(ctx: BillingContext) -> Self {
        Self { ctx }
    }

    /// The shared collaborators.
    #[must_use]
    pub const fn context(&self) -> &BillingContext {
        &self.ctx
    }

    // ------------------------------------------------------------------
    // Owner content operations
    // ------------------------------------------------------------------

    /// Creates a draft, or a sent document when `draft.send_now` is set.
    ///
    /// With `send_now`, a delivery failure leaves the document as a draft
    /// and returns the delivery error.
    pub async fn create_document(
        &self,
        owner: OwnerId,
        kind: DocumentKind,
        draft: &DocumentDraft,
        now: DateTime<Utc>,
    ) -> Result<Document, BillingError> {
        draft.validate()?;
        let profile = self.ctx.profile(owner).await?;
        self.check_plan(&profile, kind, now).await?;
        let client = self.resolve_client(owner, &draft.client).await?;
        let priced = self.price(draft, &profile)?;
        let number = self.ctx.documents.next_number(owner, kind).await?;

        let document = Document {
            id: DocumentId::new(),
            owner_id: owner,
            number,
            public_id: new_public_id(),
            status: DocumentStatus::draft(kind),
            currency: priced.currency,
            client,
            line_items: priced.line_items,
            discount: priced.discount,
            vat_included: priced.vat_included,
            processing_fee_included: draft.processing_fee,
            processing_fee: priced.breakdown.processing_fee,
            tax_amount: priced.breakdown.tax_amount,
            amount: priced.breakdown.total,
            due_date: draft.due_date,
            created_at: now,
            updated_at: now,
            sent_at: None,
            viewed_at: None,
            closed_at: None,
            decline_reason: None,
            invoice_id: None,
            recurring: None,
            recurring_parent_id: None,
            reminders: crate::document::ReminderSettings::default(),
        };

        let entry = ActivityEntry::for_document(&document, ActivityKind::Created, now);
        self.ctx.documents.insert(&document, &entry).await?;
        info!(
            document_id = %document.id,
            number = %document.number,
            kind = %kind,
            amount = document.amount,
            "Document created"
        );

        if draft.send_now {
            return self.send_loaded(document, &profile, now).await;
        }
        Ok(document)
    }

    /// Replaces the content of an editable document and reprices it.
    pub async fn update_document(
        &self,
        owner: OwnerId,
        kind: DocumentKind,
        id: DocumentId,
        draft: &DocumentDraft,
        now: DateTime<Utc>,
    ) -> Result<Document, BillingError> {
        draft.validate()?;
        let existing = self.load(owner, kind, id).await?;
        let today = self.ctx.rules.calendar.local_date(now);
        LifecycleService::ensure_editable(existing.status, existing.due_date, today)?;
        let profile = self.ctx.profile(owner).await?;
        let client = self.resolve_client(owner, &draft.client).await?;
        let priced = self.price(draft, &profile)?;

        let updated = Document {
            client,
            currency: priced.currency,
            line_items: priced.line_items,
            discount: priced.discount,
            vat_included: priced.vat_included,
            processing_fee_included: draft.processing_fee,
            processing_fee: priced.breakdown.processing_fee,
            tax_amount: priced.breakdown.tax_amount,
            amount: priced.breakdown.total,
            due_date: draft.due_date,
            updated_at: now,
            ..existing.clone()
        };

        let entry = ActivityEntry::for_document(&updated, ActivityKind::Updated, now)
            .with_prior(existing.status);
        if !self
            .ctx
            .documents
            .update_content(&updated, existing.status, &entry)
            .await?
        {
            return Err(self.lost_race(&existing).await);
        }
        debug!(document_id = %id, amount = updated.amount, "Document updated");
        Ok(updated)
    }

    /// Draft → sent, emailing the client when an address is on file.
    pub async fn send_document(
        &self,
        owner: OwnerId,
        kind: DocumentKind,
        id: DocumentId,
        now: DateTime<Utc>,
    ) -> Result<Document, BillingError> {
        let document = self.load(owner, kind, id).await?;
        let profile = self.ctx.profile(owner).await?;
        self.send_loaded(document, &profile, now).await
    }

    /// Loads one of the owner's documents.
    pub async fn get_document(
        &self,
        owner: OwnerId,
        kind: DocumentKind,
        id: DocumentId,
    ) -> Result<Document, BillingError> {
        self.load(owner, kind, id).await
    }

    // ------------------------------------------------------------------
    // Invoice status operations
    // ------------------------------------------------------------------

    /// Cancels an invoice. Voiding twice is reported, not ignored.
    pub async fn void_invoice(
        &self,
        owner: OwnerId,
        id: DocumentId,
        now: DateTime<Utc>,
    ) -> Result<Document, BillingError> {
        let invoice = self.load(owner, DocumentKind::Invoice, id).await?;
        let action = LifecycleService::void(invoice.status, now)?;
        self.apply(invoice, action, ActivityKind::Voided, None).await
    }

    /// Marks an invoice paid by hand.
    pub async fn mark_invoice_paid(
        &self,
        owner: OwnerId,
        id: DocumentId,
        now: DateTime<Utc>,
    ) -> Result<Document, BillingError> {
        let invoice = self.load(owner, DocumentKind::Invoice, id).await?;
        let action = LifecycleService::mark_paid(invoice.status, now)?;
        self.apply(invoice, action, ActivityKind::Paid, Some("manual".to_string()))
            .await
    }

    /// Applies a verified settlement event, idempotent on its event id.
    pub async fn apply_settlement(
        &self,
        event: &SettlementEvent,
        now: DateTime<Utc>,
    ) -> Result<SettlementOutcome, BillingError> {
        let invoice = self
            .ctx
            .documents
            .find_invoice(event.invoice_id)
            .await?
            .ok_or(BillingError::NotFound { what: "Invoice" })?;

        let action = match LifecycleService::mark_paid(invoice.status, now) {
            Ok(action) => action,
            Err(LifecycleError::AlreadyInState { .. }) => {
                info!(
                    invoice_id = %invoice.id,
                    event_id = %event.event_id,
                    "Settlement for an invoice that is already paid"
                );
                return Ok(SettlementOutcome::AlreadyPaid);
            }
            Err(err) => return Err(err.into()),
        };

        let entry = ActivityEntry::for_document(&invoice, ActivityKind::Paid, now)
            .with_prior(invoice.status)
            .with_detail(format!(
                "settlement event {} (session {})",
                event.event_id, event.session_id
            ));
        let change = StatusChange::for_document(&invoice, action);
        match self
            .ctx
            .documents
            .settle_invoice(&event.event_id, &change, &entry)
            .await?
        {
            SettlementWrite::Applied => {
                info!(invoice_id = %invoice.id, event_id = %event.event_id, "Invoice settled");
                Ok(SettlementOutcome::Applied)
            }
            SettlementWrite::Duplicate => {
                debug!(event_id = %event.event_id, "Duplicate settlement event ignored");
                Ok(SettlementOutcome::Duplicate)
            }
            SettlementWrite::Conflict => self.settlement_conflict(&invoice, event).await,
        }
    }

    // ------------------------------------------------------------------
    // Offer decisions
    // ------------------------------------------------------------------

    /// Accepts one of the owner's offers and derives its invoice.
    pub async fn accept_offer(
        &self,
        owner: OwnerId,
        id: DocumentId,
        now: DateTime<Utc>,
    ) -> Result<AcceptedOffer, BillingError> {
        let offer = self.load(owner, DocumentKind::Offer, id).await?;
        self.accept_loaded(offer, now).await
    }

    /// Accepts an offer through its share link.
    pub async fn accept_offer_public(
        &self,
        public_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AcceptedOffer, BillingError> {
        let offer = self.load_public(DocumentKind::Offer, public_id).await?;
        self.accept_loaded(offer, now).await
    }

    /// Declines one of the owner's offers.
    pub async fn decline_offer(
        &self,
        owner: OwnerId,
        id: DocumentId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Document, BillingError> {
        let offer = self.load(owner, DocumentKind::Offer, id).await?;
        self.decline_loaded(offer, reason, now).await
    }

    /// Declines an offer through its share link.
    pub async fn decline_offer_public(
        &self,
        public_id: &str,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Document, BillingError> {
        let offer = self.load_public(DocumentKind::Offer, public_id).await?;
        self.decline_loaded(offer, reason, now).await
    }

    // ------------------------------------------------------------------
    // Share link
    // ------------------------------------------------------------------

    /// Client read of a share link. The first read records the view.
    pub async fn view_public(
        &self,
        kind: DocumentKind,
        public_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PublicDocumentView, BillingError> {
        let document = self.load_public(kind, public_id).await?;
        let profile = self.ctx.profile(document.owner_id).await?;
        let document = self.record_view(document, now).await?;
        let today = self.ctx.rules.calendar.local_date(now);
        Ok(PublicDocumentView::build(
            &document,
            &profile.business_name,
            today,
        ))
    }

    // ------------------------------------------------------------------
    // Recurring and reminders
    // ------------------------------------------------------------------

    /// Turns recurrence on (with an interval) or off for an invoice.
    pub async fn configure_recurring(
        &self,
        owner: OwnerId,
        id: DocumentId,
        request: Option<RecurrenceRequest>,
        now: DateTime<Utc>,
    ) -> Result<Document, BillingError> {
        let invoice = self.load(owner, DocumentKind::Invoice, id).await?;
        if invoice.recurring_parent_id.is_some() {
            return Err(BillingError::validation(
                "GENERATED_INVOICE",
                "Invoices generated from a recurring template cannot recur themselves",
            ));
        }

        let schedule = match request {
            Some(request) => {
                ensure_delivered(&invoice, "make recurring")?;
                if request.every == 0 {
                    return Err(BillingError::validation(
                        "INVALID_INTERVAL",
                        "Recurring interval must be at least 1",
                    ));
                }
                if invoice.client.email.is_none() {
                    return Err(BillingError::validation(
                        "MISSING_CLIENT_EMAIL",
                        "Recurring invoices need a client email",
                    ));
                }
                Some(RecurringSchedule {
                    unit: request.unit,
                    every: request.every,
                    last_recurred_at: invoice.recurring.and_then(|r| r.last_recurred_at),
                })
            }
            None => None,
        };

        let detail = schedule.map_or_else(
            || "disabled".to_string(),
            |s| format!("every {} {}", s.every, s.unit.as_str()),
        );
        let entry = ActivityEntry::for_document(&invoice, ActivityKind::RecurringConfigured, now)
            .with_detail(detail);
        if !self
            .ctx
            .documents
            .set_recurring(owner, id, invoice.status, schedule, &entry)
            .await?
        {
            return Err(self.lost_race(&invoice).await);
        }

        Ok(Document {
            recurring: schedule,
            updated_at: now,
            ..invoice
        })
    }

    /// Sets the automatic reminder configuration of an invoice.
    pub async fn configure_reminders(
        &self,
        owner: OwnerId,
        id: DocumentId,
        request: &ReminderRequest,
        now: DateTime<Utc>,
    ) -> Result<Document, BillingError> {
        let invoice = self.load(owner, DocumentKind::Invoice, id).await?;

        let mut offsets = request
            .offsets
            .iter()
            .map(|days| {
                ReminderOffset::from_days(*days).ok_or_else(|| {
                    BillingError::validation(
                        "INVALID_REMINDER_OFFSET",
                        format!("{days} is not a supported reminder offset"),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        offsets.sort_unstable();
        offsets.dedup();

        if request.enabled {
            ensure_delivered(&invoice, "schedule reminders for")?;
            if offsets.is_empty() {
                return Err(BillingError::validation(
                    "NO_REMINDER_OFFSETS",
                    "Choose at least one reminder offset",
                ));
            }
            if invoice.client.email.is_none() {
                return Err(BillingError::validation(
                    "MISSING_CLIENT_EMAIL",
                    "Reminders need a client email",
                ));
            }
        }

        let detail = if request.enabled {
            let days: Vec<String> = offsets.iter().map(|o| o.days().to_string()).collect();
            format!("enabled at {} days", days.join(","))
        } else {
            "disabled".to_string()
        };
        let entry = ActivityEntry::for_document(&invoice, ActivityKind::RemindersConfigured, now)
            .with_detail(detail);
        if !self
            .ctx
            .documents
            .set_reminders(owner, id, invoice.status, request.enabled, &offsets, &entry)
            .await?
        {
            return Err(self.lost_race(&invoice).await);
        }

        let mut updated = invoice;
        updated.reminders.auto_enabled = request.enabled;
        updated.reminders.offsets = offsets;
        updated.updated_at = now;
        Ok(updated)
    }

    /// Sends a reminder now, at most once per rolling cooldown window.
    pub async fn send_manual_reminder(
        &self,
        owner: OwnerId,
        id: DocumentId,
        now: DateTime<Utc>,
    ) -> Result<Document, BillingError> {
        let invoice = self.load(owner, DocumentKind::Invoice, id).await?;
        ensure_delivered(&invoice, "send a reminder for")?;
        let Some(email) = invoice.client.email.clone() else {
            return Err(BillingError::validation(
                "MISSING_CLIENT_EMAIL",
                "This invoice has no client email",
            ));
        };

        let cooldown = self.ctx.rules.policy.manual_reminder_cooldown;
        let window_start = now - cooldown;
        if let Some(last) = invoice.reminders.last_reminder_at
            && last >= window_start
        {
            return Err(BillingError::RateLimited {
                retry_after: last + cooldown,
            });
        }

        let profile = self.ctx.profile(owner).await?;
        let claim = ReminderClaim {
            owner_id: owner,
            document_id: id,
            slot: ReminderSlot::Manual,
            threshold: window_start,
            previous_last: invoice.reminders.last_reminder_at,
            claimed_at: now,
        };
        if !self.ctx.documents.claim_reminder(&claim).await? {
            return Err(BillingError::RateLimited {
                retry_after: now + cooldown,
            });
        }

        if let Err(err) = self
            .ctx
            .mailer
            .send(
                &email,
                EmailTemplate::ManualReminder,
                &invoice.email_params(&profile.business_name),
            )
            .await
        {
            self.ctx.documents.release_reminder(&claim).await?;
            return Err(err.into());
        }

        let entry = ActivityEntry::for_document(&invoice, ActivityKind::ManualReminderSent, now);
        self.ctx.documents.append_activity(&entry).await?;
        info!(document_id = %id, "Manual reminder sent");

        let mut updated = invoice;
        claim.apply_to(&mut updated);
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Feed and scheduler triggers
    // ------------------------------------------------------------------

    /// The owner's audit entries, newest first.
    pub async fn recent_activity(
        &self,
        owner: OwnerId,
        page: PageRequest,
    ) -> Result<PageResponse<ActivityEntry>, BillingError> {
        let (entries, total) = self.ctx.documents.recent_activity(owner, &page).await?;
        Ok(PageResponse::new(entries, page, total))
    }

    /// Runs the recurring scheduler once.
    pub async fn run_recurring(
        &self,
        now: DateTime<Utc>,
    ) -> Result<RecurringRunSummary, BillingError> {
        RecurringScheduler::new(self.ctx.clone()).run(now).await
    }

    /// Runs the reminder scheduler once.
    pub async fn run_reminders(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ReminderRunSummary, BillingError> {
        ReminderScheduler::new(self.ctx.clone()).run(now).await
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn load(
        &self,
        owner: OwnerId,
        kind: DocumentKind,
        id: DocumentId,
    ) -> Result<Document, BillingError> {
        self.ctx
            .documents
            .find(owner, kind, id)
            .await?
            .ok_or_else(|| not_found(kind))
    }

    async fn load_public(
        &self,
        kind: DocumentKind,
        public_id: &str,
    ) -> Result<Document, BillingError> {
        self.ctx
            .documents
            .find_by_public_id(kind, public_id)
            .await?
            .ok_or_else(|| not_found(kind))
    }

    /// Error for a conditional write that lost: the state the caller saw
    /// is gone.
    async fn lost_race(&self, document: &Document) -> BillingError {
        match self
            .ctx
            .documents
            .find(document.owner_id, document.kind(), document.id)
            .await
        {
            Ok(Some(current)) if current.status != document.status => {
                debug!(
                    document_id = %document.id,
                    expected = %document.status,
                    found = %current.status,
                    "Conditional write lost to a concurrent change"
                );
                BillingError::Conflict
            }
            Ok(Some(_)) => BillingError::Conflict,
            Ok(None) => not_found(document.kind()),
            Err(err) => err.into(),
        }
    }

    /// A settlement lost its conditional write. Another delivery of the
    /// same payment, or a manual mark, may have paid the invoice meanwhile.
    async fn settlement_conflict(
        &self,
        invoice: &Document,
        event: &SettlementEvent,
    ) -> Result<SettlementOutcome, BillingError> {
        match self.ctx.documents.find_invoice(invoice.id).await? {
            Some(current) if current.status == DocumentStatus::Invoice(InvoiceStatus::Paid) => {
                info!(
                    invoice_id = %invoice.id,
                    event_id = %event.event_id,
                    "Invoice was paid concurrently"
                );
                Ok(SettlementOutcome::AlreadyPaid)
            }
            _ => Err(self.lost_race(invoice).await),
        }
    }

    async fn apply(
        &self,
        document: Document,
        action: LifecycleAction,
        kind: ActivityKind,
        detail: Option<String>,
    ) -> Result<Document, BillingError> {
        let mut entry = ActivityEntry::for_document(&document, kind, action.occurred_at())
            .with_prior(document.status);
        entry.detail = detail;
        let change = StatusChange::for_document(&document, action);
        if !self.ctx.documents.transition(&change, &entry).await? {
            return Err(self.lost_race(&document).await);
        }
        debug!(
            document_id = %document.id,
            from = %document.status,
            to = %change.action.new_status(),
            "Document transitioned"
        );
        let mut updated = document;
        change.apply_to(&mut updated);
        Ok(updated)
    }

    /// Claims the send before delivery so a lost race emails nobody. A
    /// failed delivery gives the claim back.
    async fn send_loaded(
        &self,
        document: Document,
        profile: &OwnerProfile,
        now: DateTime<Utc>,
    ) -> Result<Document, BillingError> {
        let action = LifecycleService::send(document.status, document.sent_at, now)?;
        let change = StatusChange::for_document(&document, action);
        if !self.ctx.documents.claim_send(&change).await? {
            return Err(self.lost_race(&document).await);
        }

        if let Some(email) = document.client.email.as_deref() {
            let template = match document.kind() {
                DocumentKind::Invoice => EmailTemplate::InvoiceSent,
                DocumentKind::Offer => EmailTemplate::OfferSent,
            };
            if let Err(err) = self
                .ctx
                .mailer
                .send(email, template, &document.email_params(&profile.business_name))
                .await
            {
                let released = self.ctx.documents.release_send(&change).await?;
                debug!(
                    document_id = %document.id,
                    released,
                    "Send released after failed delivery"
                );
                return Err(err.into());
            }
        }

        let entry = ActivityEntry::for_document(&document, ActivityKind::Sent, now)
            .with_prior(document.status);
        self.ctx.documents.append_activity(&entry).await?;
        debug!(document_id = %document.id, from = %document.status, "Document sent");

        let mut sent = document;
        change.apply_to(&mut sent);
        Ok(sent)
    }

    async fn record_view(
        &self,
        document: Document,
        now: DateTime<Utc>,
    ) -> Result<Document, BillingError> {
        let Some(action) = LifecycleService::view(document.status, now) else {
            return Ok(document);
        };
        let entry = ActivityEntry::for_document(&document, ActivityKind::Viewed, now)
            .with_prior(document.status);
        let change = StatusChange::for_document(&document, action);
        if self.ctx.documents.transition(&change, &entry).await? {
            let mut viewed = document;
            change.apply_to(&mut viewed);
            return Ok(viewed);
        }
        debug!(document_id = %document.id, "View already recorded by a concurrent read");
        Ok(self
            .ctx
            .documents
            .find(document.owner_id, document.kind(), document.id)
            .await?
            .unwrap_or(document))
    }

    async fn accept_loaded(
        &self,
        offer: Document,
        now: DateTime<Utc>,
    ) -> Result<AcceptedOffer, BillingError> {
        let action = LifecycleService::accept(offer.status, now)?;
        let today = self.ctx.rules.calendar.local_date(now);
        LifecycleService::ensure_not_expired(offer.status, offer.due_date, today, "accept")?;
        // Numbered by the store inside the acceptance unit of work.
        let mut invoice =
            OfferDeriver::derive_invoice(&offer, String::new(), new_public_id(), now)?;

        let entries = [
            ActivityEntry::for_document(&offer, ActivityKind::Accepted, now)
                .with_prior(offer.status)
                .with_related(invoice.id),
            ActivityEntry::for_document(&invoice, ActivityKind::DerivedFromOffer, now)
                .with_related(offer.id),
        ];
        let change = StatusChange::for_document(&offer, action);
        match self
            .ctx
            .documents
            .accept_offer(&change, &mut invoice, &entries)
            .await
        {
            Ok(true) => {}
            Ok(false) => return Err(self.lost_race(&offer).await),
            Err(err) => return Err(DerivationError::Incomplete(err.to_string()).into()),
        }

        info!(
            offer_id = %offer.id,
            invoice_id = %invoice.id,
            number = %invoice.number,
            "Offer accepted and invoiced"
        );
        let mut accepted = offer;
        change.apply_to(&mut accepted);
        accepted.invoice_id = Some(invoice.id);
        Ok(AcceptedOffer {
            offer: accepted,
            invoice,
        })
    }

    async fn decline_loaded(
        &self,
        offer: Document,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Document, BillingError> {
        let action = LifecycleService::decline(offer.status, reason.clone(), now)?;
        let today = self.ctx.rules.calendar.local_date(now);
        LifecycleService::ensure_not_expired(offer.status, offer.due_date, today, "decline")?;
        self.apply(offer, action, ActivityKind::Declined, reason).await
    }

    async fn check_plan(
        &self,
        profile: &OwnerProfile,
        kind: DocumentKind,
        now: DateTime<Utc>,
    ) -> Result<(), BillingError> {
        if profile.plan != Plan::Free {
            return Ok(());
        }
        let limit = self.ctx.rules.policy.free_plan_monthly_limit;
        let since = self.ctx.rules.calendar.month_start(now);
        let created = self
            .ctx
            .documents
            .count_created_since(profile.owner_id, kind, since)
            .await?;
        if created >= u64::from(limit) {
            return Err(BillingError::PlanLimitReached { limit });
        }
        Ok(())
    }

    async fn resolve_client(
        &self,
        owner: OwnerId,
        client: &ClientRef,
    ) -> Result<ClientSnapshot, BillingError> {
        let snapshot = match client {
            ClientRef::Existing(id) => {
                let record = self
                    .ctx
                    .profiles
                    .client(owner, *id)
                    .await?
                    .ok_or(BillingError::NotFound { what: "Client" })?;
                ClientSnapshot {
                    client_id: Some(record.id),
                    name: record.name,
                    email: record.email,
                }
            }
            ClientRef::Inline { name, email } => ClientSnapshot {
                client_id: None,
                name: name.trim().to_string(),
                email: email
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string),
            },
        };
        validate_contact(&snapshot.name, snapshot.email.as_deref())?;
        Ok(snapshot)
    }

    fn price(
        &self,
        draft: &DocumentDraft,
        profile: &OwnerProfile,
    ) -> Result<PricedContent, BillingError> {
        let currency = draft.currency.unwrap_or(profile.default_currency);
        let vat_included = draft.vat_included.unwrap_or(profile.vat_included_default);
        let line_items = draft.to_line_items();
        let discount = draft.normalized_discount();
        let input = PricingInput {
            lines: line_items.iter().map(LineItem::charge).collect(),
            discount,
            vat_included,
            processing_fee: draft.processing_fee,
            currency,
        };
        let breakdown = MoneyCalculator::calculate(&input, &self.ctx.rules.pricing)?;
        Ok(PricedContent {
            currency,
            vat_included,
            line_items,
            discount,
            breakdown,
        })
    }
}

/// Reminders and recurrence need an outstanding invoice that was actually
/// sent; a draft opened through its link is viewed but not sent.
fn ensure_delivered(invoice: &Document, action: &'static str) -> Result<(), BillingError> {
    if invoice.status.is_outstanding() && invoice.sent_at.is_some() {
        return Ok(());
    }
    Err(LifecycleError::Incompatible {
        from: invoice.status,
        action,
    }
    .into())
}

fn not_found(kind: DocumentKind) -> BillingError {
    BillingError::NotFound {
        what: match kind {
            DocumentKind::Invoice => "Invoice",
            DocumentKind::Offer => "Offer",
        },
    }
}
