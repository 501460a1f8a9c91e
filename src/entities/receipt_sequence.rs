//! Receipt sequence entity - one counter row per transaction type.
//!
//! `next_number` is the number the allocator will hand out next. Rows are seeded
//! at startup, advanced only by the allocator, and never deleted.

use super::TransactionType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Receipt sequence database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "receipt_sequences")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Transaction type this counter numbers
    #[sea_orm(primary_key, auto_increment = false)]
    pub transaction_type: TransactionType,
    /// Next receipt number to issue, starting at 1
    pub next_number: i64,
    /// When the counter last moved
    pub updated_at: DateTimeUtc,
}

/// Receipt sequences stand alone; records reference them only by type
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
