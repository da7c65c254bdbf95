//! `SeaORM` Entity for documents table.
//!
//! Invoices and offers share one table, told apart by `kind`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: String,
    pub number: String,
    #[sea_orm(unique)]
    pub public_id: String,
    pub status: String,
    pub currency: String,
    pub client_id: Option<Uuid>,
    pub client_name: String,
    pub client_email: Option<String>,
    pub discount_type: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub discount_value: Decimal,
    pub vat_included: bool,
    pub processing_fee_included: bool,
    pub processing_fee: Option<i64>,
    pub tax_amount: i64,
    pub amount: i64,
    pub due_date: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub sent_at: Option<DateTimeWithTimeZone>,
    pub viewed_at: Option<DateTimeWithTimeZone>,
    pub closed_at: Option<DateTimeWithTimeZone>,
    pub decline_reason: Option<String>,
    pub invoice_id: Option<Uuid>,
    pub recurring_unit: Option<String>,
    pub recurring_every: Option<i32>,
    pub last_recurred_at: Option<DateTimeWithTimeZone>,
    pub recurring_parent_id: Option<Uuid>,
    pub reminders_enabled: bool,
    pub reminder_offsets: Json,
    pub day1_sent_at: Option<DateTimeWithTimeZone>,
    pub day3_sent_at: Option<DateTimeWithTimeZone>,
    pub day7_sent_at: Option<DateTimeWithTimeZone>,
    pub last_reminder_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::line_items::Entity")]
    LineItems,
}

impl Related<super::line_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
