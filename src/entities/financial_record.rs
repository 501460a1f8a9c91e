//! Financial record entity - donations, expenses, utilities, salaries and rent income.
//!
//! Every record carries a receipt number allocated from its type's sequence.
//! `(receipt_number, transaction_type)` is unique through a composite index created
//! alongside the table, and `idempotency_key` is unique whenever it is present.

use super::TransactionType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Financial record database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "financial_records")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Opaque record identifier (UUID v4 string)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Business date of the record
    pub date: Date,
    /// Which sequence numbered this record
    pub transaction_type: TransactionType,
    /// Free-form category (e.g. "Annadanam", "Electricity")
    pub category: String,
    /// Amount with at most two decimal places
    pub amount: f64,
    /// Zero-padded receipt number, unique per transaction type
    pub receipt_number: String,
    /// Client-generated token deduplicating retried submissions
    #[sea_orm(unique)]
    pub idempotency_key: Option<String>,
    /// Optional note
    pub description: Option<String>,
    /// Donor name, for donations
    pub donor_name: Option<String>,
    /// Donor phone or email, for donations
    pub donor_contact: Option<String>,
    /// Payee, for expenses, utilities and salaries
    pub payee_name: Option<String>,
    /// Tenant reference, for rent income
    pub tenant_id: Option<String>,
    /// Rental agreement reference, for rent income
    pub agreement_id: Option<String>,
    /// When the record was created
    pub created_at: DateTimeUtc,
    /// When the record was last corrected
    pub updated_at: DateTimeUtc,
}

/// Financial records have no foreign keys inside this service
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
