//! Conversions between stored rows and core records.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{ActiveValue::NotSet, DbErr, Set};
use tally_core::activity::{ActivityEntry, ActivityKind};
use tally_core::document::{
    ClientRecord, ClientSnapshot, Document, LineItem, OwnerProfile, Plan, RecurrenceUnit,
    RecurringSchedule, ReminderOffset, ReminderSettings,
};
use tally_core::lifecycle::{DocumentKind, DocumentStatus, Milestone};
use tally_core::pricing::Discount;
use tally_core::store::{StatusChange, StoreError};
use tally_shared::types::{
    ActivityId, ClientId, Currency, DocumentId, LineItemId, OwnerId,
};

use crate::entities::{activity_log, clients, documents, line_items, owner_profiles};

pub(crate) fn db_err(err: DbErr) -> StoreError {
    StoreError::Database(err.to_string())
}

fn corrupt(what: &str, value: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("unrecognised {what} '{value}'"))
}

fn utc(at: DateTime<FixedOffset>) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

fn utc_opt(at: Option<DateTime<FixedOffset>>) -> Option<DateTime<Utc>> {
    at.map(utc)
}

fn fixed(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    at.into()
}

fn fixed_opt(at: Option<DateTime<Utc>>) -> Option<DateTime<FixedOffset>> {
    at.map(fixed)
}

pub(crate) fn parse_kind(value: &str) -> Result<DocumentKind, StoreError> {
    DocumentKind::parse(value).ok_or_else(|| corrupt("document kind", value))
}

fn parse_currency(value: &str) -> Result<Currency, StoreError> {
    value
        .trim()
        .parse::<Currency>()
        .map_err(|_| corrupt("currency", value))
}

/// Assembles a document from its row and its line rows.
pub(crate) fn document_from_rows(
    row: documents::Model,
    mut lines: Vec<line_items::Model>,
) -> Result<Document, StoreError> {
    let kind = parse_kind(&row.kind)?;
    let status =
        DocumentStatus::parse(kind, &row.status).ok_or_else(|| corrupt("status", &row.status))?;
    let discount = Discount::from_parts(&row.discount_type, row.discount_value)
        .ok_or_else(|| corrupt("discount", &row.discount_type))?;

    let recurring = match (row.recurring_unit.as_deref(), row.recurring_every) {
        (Some(unit), Some(every)) => Some(RecurringSchedule {
            unit: RecurrenceUnit::parse(unit).ok_or_else(|| corrupt("recurring unit", unit))?,
            every: u32::try_from(every).map_err(|_| corrupt("recurring interval", every))?,
            last_recurred_at: utc_opt(row.last_recurred_at),
        }),
        _ => None,
    };

    let offsets: Vec<ReminderOffset> = serde_json::from_value(row.reminder_offsets.clone())
        .map_err(|_| corrupt("reminder offsets", &row.reminder_offsets))?;

    lines.sort_by_key(|line| line.position);
    let line_items = lines
        .into_iter()
        .map(|line| LineItem {
            id: LineItemId::from_uuid(line.id),
            description: line.description,
            unit_amount: line.unit_amount,
            discount_percent: line.discount_percent,
            position: line.position,
        })
        .collect();

    Ok(Document {
        id: DocumentId::from_uuid(row.id),
        owner_id: OwnerId::from_uuid(row.owner_id),
        number: row.number,
        public_id: row.public_id,
        status,
        currency: parse_currency(&row.currency)?,
        client: ClientSnapshot {
            client_id: row.client_id.map(ClientId::from_uuid),
            name: row.client_name,
            email: row.client_email,
        },
        line_items,
        discount,
        vat_included: row.vat_included,
        processing_fee_included: row.processing_fee_included,
        processing_fee: row.processing_fee,
        tax_amount: row.tax_amount,
        amount: row.amount,
        due_date: row.due_date,
        created_at: utc(row.created_at),
        updated_at: utc(row.updated_at),
        sent_at: utc_opt(row.sent_at),
        viewed_at: utc_opt(row.viewed_at),
        closed_at: utc_opt(row.closed_at),
        decline_reason: row.decline_reason,
        invoice_id: row.invoice_id.map(DocumentId::from_uuid),
        recurring,
        recurring_parent_id: row.recurring_parent_id.map(DocumentId::from_uuid),
        reminders: ReminderSettings {
            auto_enabled: row.reminders_enabled,
            offsets,
            day1_sent_at: utc_opt(row.day1_sent_at),
            day3_sent_at: utc_opt(row.day3_sent_at),
            day7_sent_at: utc_opt(row.day7_sent_at),
            last_reminder_at: utc_opt(row.last_reminder_at),
        },
    })
}

pub(crate) fn offsets_json(offsets: &[ReminderOffset]) -> serde_json::Value {
    serde_json::Value::Array(
        offsets
            .iter()
            .map(|offset| serde_json::Value::from(offset.days()))
            .collect(),
    )
}

/// Full row for a new document.
pub(crate) fn document_active(doc: &Document) -> documents::ActiveModel {
    documents::ActiveModel {
        id: Set(doc.id.into_inner()),
        owner_id: Set(doc.owner_id.into_inner()),
        kind: Set(doc.kind().as_str().to_string()),
        number: Set(doc.number.clone()),
        public_id: Set(doc.public_id.clone()),
        status: Set(doc.status.as_str().to_string()),
        recurring_unit: Set(doc.recurring.map(|r| r.unit.as_str().to_string())),
        recurring_every: Set(doc
            .recurring
            .and_then(|r| i32::try_from(r.every).ok())),
        last_recurred_at: Set(fixed_opt(doc.recurring.and_then(|r| r.last_recurred_at))),
        recurring_parent_id: Set(doc.recurring_parent_id.map(DocumentId::into_inner)),
        created_at: Set(fixed(doc.created_at)),
        sent_at: Set(fixed_opt(doc.sent_at)),
        viewed_at: Set(fixed_opt(doc.viewed_at)),
        closed_at: Set(fixed_opt(doc.closed_at)),
        decline_reason: Set(doc.decline_reason.clone()),
        invoice_id: Set(doc.invoice_id.map(DocumentId::into_inner)),
        reminders_enabled: Set(doc.reminders.auto_enabled),
        reminder_offsets: Set(offsets_json(&doc.reminders.offsets)),
        day1_sent_at: Set(fixed_opt(doc.reminders.day1_sent_at)),
        day3_sent_at: Set(fixed_opt(doc.reminders.day3_sent_at)),
        day7_sent_at: Set(fixed_opt(doc.reminders.day7_sent_at)),
        last_reminder_at: Set(fixed_opt(doc.reminders.last_reminder_at)),
        ..content_active(doc)
    }
}

/// Only the editable content columns; everything else is left unset.
pub(crate) fn content_active(doc: &Document) -> documents::ActiveModel {
    documents::ActiveModel {
        currency: Set(doc.currency.code().to_string()),
        client_id: Set(doc.client.client_id.map(ClientId::into_inner)),
        client_name: Set(doc.client.name.clone()),
        client_email: Set(doc.client.email.clone()),
        discount_type: Set(doc.discount.kind_str().to_string()),
        discount_value: Set(doc.discount.value()),
        vat_included: Set(doc.vat_included),
        processing_fee_included: Set(doc.processing_fee_included),
        processing_fee: Set(doc.processing_fee),
        tax_amount: Set(doc.tax_amount),
        amount: Set(doc.amount),
        due_date: Set(doc.due_date),
        updated_at: Set(fixed(doc.updated_at)),
        ..Default::default()
    }
}

/// Columns written by a status transition.
pub(crate) fn transition_active(change: &StatusChange) -> documents::ActiveModel {
    let at = fixed(change.action.occurred_at());
    let mut model = documents::ActiveModel {
        status: Set(change.action.new_status().as_str().to_string()),
        updated_at: Set(at),
        ..Default::default()
    };
    match change.action.milestone() {
        Milestone::Sent => model.sent_at = Set(Some(at)),
        Milestone::Viewed => model.viewed_at = Set(Some(at)),
        Milestone::Closed => model.closed_at = Set(Some(at)),
    }
    model.decline_reason = change
        .action
        .reason()
        .map_or(NotSet, |reason| Set(Some(reason.to_string())));
    model
}

pub(crate) fn line_active(document_id: DocumentId, line: &LineItem) -> line_items::ActiveModel {
    line_items::ActiveModel {
        id: Set(line.id.into_inner()),
        document_id: Set(document_id.into_inner()),
        description: Set(line.description.clone()),
        unit_amount: Set(line.unit_amount),
        discount_percent: Set(line.discount_percent),
        position: Set(line.position),
    }
}

pub(crate) fn activity_active(entry: &ActivityEntry) -> activity_log::ActiveModel {
    activity_log::ActiveModel {
        id: Set(entry.id.into_inner()),
        owner_id: Set(entry.owner_id.into_inner()),
        document_kind: Set(entry.document_kind.as_str().to_string()),
        document_id: Set(entry.document_id.into_inner()),
        kind: Set(entry.kind.as_str().to_string()),
        related_document_id: Set(entry.related_document_id.map(DocumentId::into_inner)),
        prior_status: Set(entry.prior_status.map(|s| s.as_str().to_string())),
        amount: Set(entry.amount),
        detail: Set(entry.detail.clone()),
        occurred_at: Set(fixed(entry.occurred_at)),
    }
}

pub(crate) fn activity_from_row(row: activity_log::Model) -> Result<ActivityEntry, StoreError> {
    let document_kind = parse_kind(&row.document_kind)?;
    let prior_status = row
        .prior_status
        .as_deref()
        .map(|s| DocumentStatus::parse(document_kind, s).ok_or_else(|| corrupt("status", s)))
        .transpose()?;
    Ok(ActivityEntry {
        id: ActivityId::from_uuid(row.id),
        owner_id: OwnerId::from_uuid(row.owner_id),
        document_kind,
        document_id: DocumentId::from_uuid(row.document_id),
        kind: ActivityKind::parse(&row.kind).ok_or_else(|| corrupt("activity kind", &row.kind))?,
        related_document_id: row.related_document_id.map(DocumentId::from_uuid),
        prior_status,
        amount: row.amount,
        detail: row.detail,
        occurred_at: utc(row.occurred_at),
    })
}

pub(crate) fn profile_from_row(row: owner_profiles::Model) -> Result<OwnerProfile, StoreError> {
    Ok(OwnerProfile {
        owner_id: OwnerId::from_uuid(row.owner_id),
        business_name: row.business_name,
        default_currency: parse_currency(&row.default_currency)?,
        vat_included_default: row.vat_included_default,
        plan: Plan::parse(&row.plan).ok_or_else(|| corrupt("plan", &row.plan))?,
    })
}

pub(crate) fn client_from_row(row: clients::Model) -> ClientRecord {
    ClientRecord {
        id: ClientId::from_uuid(row.id),
        owner_id: OwnerId::from_uuid(row.owner_id),
        name: row.name,
        email: row.email,
    }
}
