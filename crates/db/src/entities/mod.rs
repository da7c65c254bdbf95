//! `SeaORM` entity definitions.

pub mod activity_log;
pub mod clients;
pub mod document_counters;
pub mod documents;
pub mod line_items;
pub mod owner_profiles;
pub mod settlement_events;
