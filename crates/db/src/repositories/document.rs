//! Document repository: the relational `DocumentStore`.
//!
//! Every status-dependent write is an `UPDATE ... WHERE status = expected`
//! and reports a lost race as `false` through `rows_affected`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use tally_core::activity::ActivityEntry;
use tally_core::document::{Document, RecurringSchedule, ReminderOffset};
use tally_core::lifecycle::{DocumentKind, DocumentStatus, Milestone};
use tally_core::store::{
    DocumentStore, ReminderClaim, ReminderSlot, SettlementWrite, StatusChange, StoreError,
};
use tally_shared::types::{DocumentId, OwnerId, PageRequest};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{activity_log, documents, line_items, settlement_events};
use crate::mapping::{
    activity_active, activity_from_row, content_active, db_err, document_active,
    document_from_rows, line_active, offsets_json, transition_active,
};

const OUTSTANDING: [&str; 2] = ["sent", "viewed"];

const NEXT_NUMBER_SQL: &str = r"
INSERT INTO document_counters (owner_id, kind, last_value)
VALUES ($1, $2, 1)
ON CONFLICT (owner_id, kind)
DO UPDATE SET last_value = document_counters.last_value + 1
RETURNING last_value
";

/// Relational document store.
#[derive(Debug)]
pub struct DocumentRepository {
    db: DatabaseConnection,
}

impl DocumentRepository {
    /// Creates a new document repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads line items for `rows` and assembles the documents.
    async fn hydrate(&self, rows: Vec<documents::Model>) -> Result<Vec<Document>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut lines: HashMap<Uuid, Vec<line_items::Model>> = HashMap::new();
        for line in line_items::Entity::find()
            .filter(line_items::Column::DocumentId.is_in(ids))
            .order_by_asc(line_items::Column::Position)
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            lines.entry(line.document_id).or_default().push(line);
        }
        rows.into_iter()
            .map(|row| {
                let own = lines.remove(&row.id).unwrap_or_default();
                document_from_rows(row, own)
            })
            .collect()
    }

    async fn hydrate_one(
        &self,
        row: Option<documents::Model>,
    ) -> Result<Option<Document>, StoreError> {
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

async fn insert_document<C: ConnectionTrait>(conn: &C, document: &Document) -> Result<(), DbErr> {
    documents::Entity::insert(document_active(document))
        .exec_without_returning(conn)
        .await?;
    insert_lines(conn, document).await
}

async fn insert_lines<C: ConnectionTrait>(conn: &C, document: &Document) -> Result<(), DbErr> {
    if document.line_items.is_empty() {
        return Ok(());
    }
    line_items::Entity::insert_many(
        document
            .line_items
            .iter()
            .map(|line| line_active(document.id, line)),
    )
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

async fn insert_activity<C: ConnectionTrait>(
    conn: &C,
    entries: &[ActivityEntry],
) -> Result<(), DbErr> {
    if entries.is_empty() {
        return Ok(());
    }
    activity_log::Entity::insert_many(entries.iter().map(activity_active))
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

fn owned(owner: OwnerId, id: DocumentId, expected: DocumentStatus) -> Condition {
    Condition::all()
        .add(documents::Column::Id.eq(id.into_inner()))
        .add(documents::Column::OwnerId.eq(owner.into_inner()))
        .add(documents::Column::Status.eq(expected.as_str()))
}

fn change_condition(change: &StatusChange) -> Condition {
    let condition = owned(change.owner_id, change.document_id, change.expected)
        .add(documents::Column::Kind.eq(change.expected.kind().as_str()));
    if change.action.milestone() == Milestone::Sent {
        condition.add(documents::Column::SentAt.is_null())
    } else {
        condition
    }
}

async fn apply_change<C: ConnectionTrait>(conn: &C, change: &StatusChange) -> Result<bool, DbErr> {
    let result = documents::Entity::update_many()
        .set(transition_active(change))
        .filter(change_condition(change))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

async fn allocate_number<C: ConnectionTrait>(
    conn: &C,
    owner: OwnerId,
    kind: DocumentKind,
) -> Result<String, StoreError> {
    let row = conn
        .query_one(Statement::from_sql_and_values(
            DbBackend::Postgres,
            NEXT_NUMBER_SQL,
            [owner.into_inner().into(), kind.as_str().into()],
        ))
        .await
        .map_err(db_err)?
        .ok_or_else(|| StoreError::Corrupt("number counter returned no row".to_string()))?;
    let value: i64 = row.try_get("", "last_value").map_err(db_err)?;
    Ok(kind.format_number(value))
}

fn durable_column(offset: ReminderOffset) -> Option<documents::Column> {
    match offset {
        ReminderOffset::D1 => Some(documents::Column::Day1SentAt),
        ReminderOffset::D3 => Some(documents::Column::Day3SentAt),
        ReminderOffset::D7 => Some(documents::Column::Day7SentAt),
        _ => None,
    }
}

fn fixed(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    at.into()
}

#[async_trait]
impl DocumentStore for DocumentRepository {
    async fn find(
        &self,
        owner: OwnerId,
        kind: DocumentKind,
        id: DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        let row = documents::Entity::find_by_id(id.into_inner())
            .filter(documents::Column::OwnerId.eq(owner.into_inner()))
            .filter(documents::Column::Kind.eq(kind.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        self.hydrate_one(row).await
    }

    async fn find_by_public_id(
        &self,
        kind: DocumentKind,
        public_id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let row = documents::Entity::find()
            .filter(documents::Column::PublicId.eq(public_id))
            .filter(documents::Column::Kind.eq(kind.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        self.hydrate_one(row).await
    }

    async fn find_invoice(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        let row = documents::Entity::find_by_id(id.into_inner())
            .filter(documents::Column::Kind.eq(DocumentKind::Invoice.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        self.hydrate_one(row).await
    }

    async fn next_number(
        &self,
        owner: OwnerId,
        kind: DocumentKind,
    ) -> Result<String, StoreError> {
        allocate_number(&self.db, owner, kind).await
    }

    async fn count_created_since(
        &self,
        owner: OwnerId,
        kind: DocumentKind,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        documents::Entity::find()
            .filter(documents::Column::OwnerId.eq(owner.into_inner()))
            .filter(documents::Column::Kind.eq(kind.as_str()))
            .filter(documents::Column::CreatedAt.gte(fixed(since)))
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn insert(&self, document: &Document, entry: &ActivityEntry) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        insert_document(&txn, document).await.map_err(db_err)?;
        insert_activity(&txn, std::slice::from_ref(entry))
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)
    }

    async fn update_content(
        &self,
        document: &Document,
        expected: DocumentStatus,
        entry: &ActivityEntry,
    ) -> Result<bool, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let result = documents::Entity::update_many()
            .set(content_active(document))
            .filter(owned(document.owner_id, document.id, expected))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            debug!(document_id = %document.id, "Content update lost to a status change");
            return Ok(false);
        }

        line_items::Entity::delete_many()
            .filter(line_items::Column::DocumentId.eq(document.id.into_inner()))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        insert_lines(&txn, document).await.map_err(db_err)?;
        insert_activity(&txn, std::slice::from_ref(entry))
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn transition(
        &self,
        change: &StatusChange,
        entry: &ActivityEntry,
    ) -> Result<bool, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        if !apply_change(&txn, change).await.map_err(db_err)? {
            return Ok(false);
        }
        insert_activity(&txn, std::slice::from_ref(entry))
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn claim_send(&self, change: &StatusChange) -> Result<bool, StoreError> {
        apply_change(&self.db, change).await.map_err(db_err)
    }

    async fn release_send(&self, change: &StatusChange) -> Result<bool, StoreError> {
        let at = fixed(change.action.occurred_at());
        let result = documents::Entity::update_many()
            .col_expr(
                documents::Column::Status,
                Expr::value(change.expected.as_str()),
            )
            .col_expr(
                documents::Column::SentAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .filter(owned(
                change.owner_id,
                change.document_id,
                change.action.new_status(),
            ))
            .filter(documents::Column::SentAt.eq(at))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn accept_offer(
        &self,
        change: &StatusChange,
        invoice: &mut Document,
        entries: &[ActivityEntry],
    ) -> Result<bool, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let mut model = transition_active(change);
        model.invoice_id = Set(Some(invoice.id.into_inner()));
        let result = documents::Entity::update_many()
            .set(model)
            .filter(change_condition(change))
            .filter(documents::Column::InvoiceId.is_null())
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Ok(false);
        }

        invoice.number = allocate_number(&txn, invoice.owner_id, DocumentKind::Invoice).await?;
        insert_document(&txn, invoice).await.map_err(db_err)?;
        insert_activity(&txn, entries).await.map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn settle_invoice(
        &self,
        event_id: &str,
        change: &StatusChange,
        entry: &ActivityEntry,
    ) -> Result<SettlementWrite, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // A concurrent delivery of the same event blocks on the key until
        // the first commits, then inserts nothing.
        let recorded = settlement_events::Entity::insert(settlement_events::ActiveModel {
            event_id: Set(event_id.to_string()),
            invoice_id: Set(change.document_id.into_inner()),
            processed_at: Set(fixed(change.action.occurred_at())),
        })
        .on_conflict(
            OnConflict::column(settlement_events::Column::EventId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await
        .map_err(db_err)?;
        if recorded == 0 {
            return Ok(SettlementWrite::Duplicate);
        }
        if !apply_change(&txn, change).await.map_err(db_err)? {
            return Ok(SettlementWrite::Conflict);
        }

        insert_activity(&txn, std::slice::from_ref(entry))
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(SettlementWrite::Applied)
    }

    async fn set_recurring(
        &self,
        owner: OwnerId,
        id: DocumentId,
        expected: DocumentStatus,
        recurring: Option<RecurringSchedule>,
        entry: &ActivityEntry,
    ) -> Result<bool, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let model = documents::ActiveModel {
            recurring_unit: Set(recurring.map(|r| r.unit.as_str().to_string())),
            recurring_every: Set(recurring.and_then(|r| i32::try_from(r.every).ok())),
            last_recurred_at: Set(recurring.and_then(|r| r.last_recurred_at).map(fixed)),
            updated_at: Set(fixed(entry.occurred_at)),
            ..Default::default()
        };
        let result = documents::Entity::update_many()
            .set(model)
            .filter(owned(owner, id, expected))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Ok(false);
        }
        insert_activity(&txn, std::slice::from_ref(entry))
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn set_reminders(
        &self,
        owner: OwnerId,
        id: DocumentId,
        expected: DocumentStatus,
        auto_enabled: bool,
        offsets: &[ReminderOffset],
        entry: &ActivityEntry,
    ) -> Result<bool, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let model = documents::ActiveModel {
            reminders_enabled: Set(auto_enabled),
            reminder_offsets: Set(offsets_json(offsets)),
            updated_at: Set(fixed(entry.occurred_at)),
            ..Default::default()
        };
        let result = documents::Entity::update_many()
            .set(model)
            .filter(owned(owner, id, expected))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Ok(false);
        }
        insert_activity(&txn, std::slice::from_ref(entry))
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn recurring_templates(&self) -> Result<Vec<Document>, StoreError> {
        let rows = documents::Entity::find()
            .filter(documents::Column::Kind.eq(DocumentKind::Invoice.as_str()))
            .filter(documents::Column::Status.is_in(OUTSTANDING))
            .filter(documents::Column::RecurringUnit.is_not_null())
            .filter(documents::Column::RecurringParentId.is_null())
            .filter(documents::Column::ClientEmail.is_not_null())
            .order_by_asc(documents::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        self.hydrate(rows).await
    }

    async fn reminder_candidates(&self) -> Result<Vec<Document>, StoreError> {
        let rows = documents::Entity::find()
            .filter(documents::Column::Kind.eq(DocumentKind::Invoice.as_str()))
            .filter(documents::Column::Status.is_in(OUTSTANDING))
            .filter(documents::Column::RemindersEnabled.eq(true))
            .filter(documents::Column::SentAt.is_not_null())
            .filter(documents::Column::ClientEmail.is_not_null())
            .order_by_asc(documents::Column::SentAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        self.hydrate(rows).await
    }

    async fn claim_recurrence(
        &self,
        id: DocumentId,
        expected_last: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let last_matches = match expected_last {
            Some(last) => documents::Column::LastRecurredAt.eq(fixed(last)),
            None => documents::Column::LastRecurredAt.is_null(),
        };
        let result = documents::Entity::update_many()
            .col_expr(documents::Column::LastRecurredAt, Expr::value(fixed(at)))
            .filter(documents::Column::Id.eq(id.into_inner()))
            .filter(documents::Column::RecurringUnit.is_not_null())
            .filter(last_matches)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn release_recurrence(
        &self,
        id: DocumentId,
        claimed_at: DateTime<Utc>,
        previous: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let result = documents::Entity::update_many()
            .col_expr(
                documents::Column::LastRecurredAt,
                Expr::value(previous.map(fixed)),
            )
            .filter(documents::Column::Id.eq(id.into_inner()))
            .filter(documents::Column::LastRecurredAt.eq(fixed(claimed_at)))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn claim_reminder(&self, claim: &ReminderClaim) -> Result<bool, StoreError> {
        let at = fixed(claim.claimed_at);
        let mut model = documents::ActiveModel {
            last_reminder_at: Set(Some(at)),
            ..Default::default()
        };
        let mut condition = Condition::all()
            .add(documents::Column::Id.eq(claim.document_id.into_inner()))
            .add(documents::Column::OwnerId.eq(claim.owner_id.into_inner()))
            .add(documents::Column::Kind.eq(DocumentKind::Invoice.as_str()))
            .add(documents::Column::Status.is_in(OUTSTANDING));
        let before_threshold = Condition::any()
            .add(documents::Column::LastReminderAt.is_null())
            .add(documents::Column::LastReminderAt.lt(fixed(claim.threshold)));

        match claim.slot {
            ReminderSlot::Auto(offset) => {
                condition = condition.add(documents::Column::RemindersEnabled.eq(true));
                match durable_column(offset) {
                    Some(column) => {
                        condition = condition.add(column.is_null());
                        match column {
                            documents::Column::Day1SentAt => model.day1_sent_at = Set(Some(at)),
                            documents::Column::Day3SentAt => model.day3_sent_at = Set(Some(at)),
                            _ => model.day7_sent_at = Set(Some(at)),
                        }
                    }
                    None => condition = condition.add(before_threshold),
                }
            }
            ReminderSlot::Manual => condition = condition.add(before_threshold),
        }

        let result = documents::Entity::update_many()
            .set(model)
            .filter(condition)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn release_reminder(&self, claim: &ReminderClaim) -> Result<bool, StoreError> {
        let at = fixed(claim.claimed_at);
        let id = claim.document_id.into_inner();
        let mut released = 0;

        if let ReminderSlot::Auto(offset) = claim.slot
            && let Some(column) = durable_column(offset)
        {
            released += documents::Entity::update_many()
                .col_expr(column, Expr::value(Option::<DateTime<FixedOffset>>::None))
                .filter(documents::Column::Id.eq(id))
                .filter(column.eq(at))
                .exec(&self.db)
                .await
                .map_err(db_err)?
                .rows_affected;
        }

        let restore = documents::ActiveModel {
            last_reminder_at: Set(claim.previous_last.map(fixed)),
            ..Default::default()
        };
        released += documents::Entity::update_many()
            .set(restore)
            .filter(documents::Column::Id.eq(id))
            .filter(documents::Column::LastReminderAt.eq(at))
            .exec(&self.db)
            .await
            .map_err(db_err)?
            .rows_affected;

        Ok(released > 0)
    }

    async fn append_activity(&self, entry: &ActivityEntry) -> Result<(), StoreError> {
        insert_activity(&self.db, std::slice::from_ref(entry))
            .await
            .map_err(db_err)
    }

    async fn recent_activity(
        &self,
        owner: OwnerId,
        page: &PageRequest,
    ) -> Result<(Vec<ActivityEntry>, u64), StoreError> {
        let query = activity_log::Entity::find()
            .filter(activity_log::Column::OwnerId.eq(owner.into_inner()));
        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let rows = query
            .order_by_desc(activity_log::Column::OccurredAt)
            .order_by_desc(activity_log::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let entries = rows
            .into_iter()
            .map(activity_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((entries, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use tally_core::activity::ActivityKind;
    use tally_core::document::{ClientSnapshot, ReminderSettings};
    use tally_core::lifecycle::{InvoiceStatus, LifecycleService};
    use tally_core::pricing::Discount;
    use tally_shared::types::Currency;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, 0, 0).unwrap()
    }

    fn invoice() -> Document {
        Document {
            id: DocumentId::new(),
            owner_id: OwnerId::new(),
            number: "INV-0001".to_string(),
            public_id: "abc".to_string(),
            status: DocumentStatus::Invoice(InvoiceStatus::Sent),
            currency: Currency::Gbp,
            client: ClientSnapshot {
                client_id: None,
                name: "Jo".to_string(),
                email: Some("jo@example.com".to_string()),
            },
            line_items: vec![],
            discount: Discount::None,
            vat_included: false,
            processing_fee_included: false,
            processing_fee: None,
            tax_amount: 0,
            amount: 1_000,
            due_date: None,
            created_at: at(1),
            updated_at: at(1),
            sent_at: Some(at(1)),
            viewed_at: None,
            closed_at: None,
            decline_reason: None,
            invoice_id: None,
            recurring: None,
            recurring_parent_id: None,
            reminders: ReminderSettings::default(),
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_lost_transition_writes_no_activity() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(0)])
            .into_connection();
        let repo = DocumentRepository::new(db);
        let doc = invoice();
        let action = LifecycleService::void(doc.status, at(2)).unwrap();
        let change = StatusChange::for_document(&doc, action);
        let entry = ActivityEntry::for_document(&doc, ActivityKind::Voided, at(2));

        assert!(!repo.transition(&change, &entry).await.unwrap());
    }

    #[tokio::test]
    async fn test_won_transition_commits() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let repo = DocumentRepository::new(db);
        let doc = invoice();
        let action = LifecycleService::mark_paid(doc.status, at(3)).unwrap();
        let change = StatusChange::for_document(&doc, action);
        let entry = ActivityEntry::for_document(&doc, ActivityKind::Paid, at(3));

        assert!(repo.transition(&change, &entry).await.unwrap());
    }

    #[tokio::test]
    async fn test_durable_claim_is_single_row_update() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1), exec(0)])
            .into_connection();
        let repo = DocumentRepository::new(db);
        let doc = invoice();
        let claim = ReminderClaim {
            owner_id: doc.owner_id,
            document_id: doc.id,
            slot: ReminderSlot::Auto(ReminderOffset::D3),
            threshold: at(4),
            previous_last: None,
            claimed_at: at(4),
        };

        assert!(repo.claim_reminder(&claim).await.unwrap());
        assert!(!repo.claim_reminder(&claim).await.unwrap());
    }

    #[tokio::test]
    async fn test_recorded_event_is_duplicate_before_any_update() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(0)])
            .into_connection();
        let repo = DocumentRepository::new(db);
        let doc = invoice();
        let action = LifecycleService::mark_paid(doc.status, at(5)).unwrap();
        let change = StatusChange::for_document(&doc, action);
        let entry = ActivityEntry::for_document(&doc, ActivityKind::Paid, at(5));

        assert_eq!(
            repo.settle_invoice("evt_1", &change, &entry).await.unwrap(),
            SettlementWrite::Duplicate
        );
    }

    #[tokio::test]
    async fn test_new_event_on_changed_invoice_is_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1), exec(0)])
            .into_connection();
        let repo = DocumentRepository::new(db);
        let doc = invoice();
        let action = LifecycleService::mark_paid(doc.status, at(5)).unwrap();
        let change = StatusChange::for_document(&doc, action);
        let entry = ActivityEntry::for_document(&doc, ActivityKind::Paid, at(5));

        assert_eq!(
            repo.settle_invoice("evt_2", &change, &entry).await.unwrap(),
            SettlementWrite::Conflict
        );
    }

    #[tokio::test]
    async fn test_recurrence_release_is_conditional() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1), exec(0)])
            .into_connection();
        let repo = DocumentRepository::new(db);
        let id = DocumentId::new();

        assert!(repo.claim_recurrence(id, None, at(6)).await.unwrap());
        assert!(!repo.release_recurrence(id, at(7), None).await.unwrap());
    }

    #[test]
    fn test_outstanding_matches_core() {
        for status in OUTSTANDING {
            let parsed = DocumentStatus::parse(DocumentKind::Invoice, status).unwrap();
            assert!(parsed.is_outstanding());
        }
    }
}
