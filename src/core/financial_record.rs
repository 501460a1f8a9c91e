//! Financial record business logic - idempotent creation, corrections, lookups and deletes.
//!
//! Creation validates the request before touching the sequence, then allocates a receipt
//! number and inserts the record inside one database transaction, so a failed insert also
//! rolls back the allocation. A caller-supplied idempotency key makes retried submissions
//! return the record created by the first attempt instead of numbering a second one. The
//! unique indexes on `idempotency_key` and `(receipt_number, transaction_type)` catch the
//! races the lookup cannot; their violations are reported as distinct conflict errors.

use crate::{
    core::receipt_sequence,
    entities::{FinancialRecord, TransactionType, financial_record},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Longest accepted idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;
/// Longest accepted category.
pub const MAX_CATEGORY_LEN: usize = 100;
/// Longest accepted value for the optional free-text fields.
pub const MAX_TEXT_LEN: usize = 500;

/// Fields a client submits to create a record. The type comes from the collection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    /// Business date; today (UTC) when omitted
    pub date: Option<NaiveDate>,
    /// Free-form category
    pub category: String,
    /// Positive amount with at most two decimals
    pub amount: f64,
    /// Client-generated deduplication token
    pub idempotency_key: Option<String>,
    /// Optional note
    pub description: Option<String>,
    /// Donor name
    pub donor_name: Option<String>,
    /// Donor phone or email
    pub donor_contact: Option<String>,
    /// Payee name
    pub payee_name: Option<String>,
    /// Tenant reference
    pub tenant_id: Option<String>,
    /// Rental agreement reference
    pub agreement_id: Option<String>,
}

/// Corrections to an existing record. Absent fields keep their stored value and a blank
/// optional text field clears it; the type, receipt number and idempotency key can never
/// change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordChanges {
    /// New business date
    pub date: Option<NaiveDate>,
    /// New category
    pub category: Option<String>,
    /// New amount
    pub amount: Option<f64>,
    /// New note
    pub description: Option<String>,
    /// New donor name
    pub donor_name: Option<String>,
    /// New donor contact
    pub donor_contact: Option<String>,
    /// New payee
    pub payee_name: Option<String>,
    /// New tenant reference
    pub tenant_id: Option<String>,
    /// New agreement reference
    pub agreement_id: Option<String>,
}

/// Result of a create request.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// A new record was inserted with a freshly allocated receipt number
    Created(financial_record::Model),
    /// The idempotency key matched a record from an earlier submission
    Existing(financial_record::Model),
}

impl CreateOutcome {
    /// Whether this call inserted the record.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    /// The created or previously stored record.
    #[must_use]
    pub fn into_record(self) -> financial_record::Model {
        match self {
            Self::Created(record) | Self::Existing(record) => record,
        }
    }
}

/// Checks that an amount is positive, finite and has at most two decimal places.
///
/// # Errors
/// Returns `Error::InvalidAmount` otherwise.
pub fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }

    let cents = amount * 100.0;
    if (cents - cents.round()).abs() > 1e-6 {
        return Err(Error::InvalidAmount { amount });
    }

    Ok(cents.round() / 100.0)
}

/// Trims an optional text field, dropping it when blank and rejecting it when too long.
fn normalize_optional(field: &str, value: Option<String>) -> Result<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(Error::Validation {
            message: format!("{field} must be at most {MAX_TEXT_LEN} characters"),
        });
    }
    Ok(Some(trimmed.to_string()))
}

/// Like `normalize_optional`, but keeps a blank value as `Some("")` to mean "clear".
fn normalize_change(field: &str, value: Option<String>) -> Result<Option<String>> {
    match value {
        Some(value) if value.trim().is_empty() => Ok(Some(String::new())),
        other => normalize_optional(field, other),
    }
}

/// Maps a validated change onto the column value: blank clears.
fn cleared_if_blank(value: String) -> Option<String> {
    Some(value).filter(|value| !value.is_empty())
}

fn normalize_category(category: &str) -> Result<String> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            message: "category cannot be empty".to_string(),
        });
    }
    if trimmed.chars().count() > MAX_CATEGORY_LEN {
        return Err(Error::Validation {
            message: format!("category must be at most {MAX_CATEGORY_LEN} characters"),
        });
    }
    Ok(trimmed.to_string())
}

fn normalize_idempotency_key(key: Option<String>) -> Result<Option<String>> {
    let Some(key) = key else {
        return Ok(None);
    };
    let trimmed = key.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(Error::Validation {
            message: format!(
                "idempotencyKey must be between 1 and {MAX_IDEMPOTENCY_KEY_LEN} bytes"
            ),
        });
    }
    Ok(Some(trimmed.to_string()))
}

impl NewRecord {
    /// Returns the record with every field checked and normalized.
    ///
    /// # Errors
    /// Returns `Error::InvalidAmount` or `Error::Validation` for the first bad field.
    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            date: self.date,
            category: normalize_category(&self.category)?,
            amount: validate_amount(self.amount)?,
            idempotency_key: normalize_idempotency_key(self.idempotency_key)?,
            description: normalize_optional("description", self.description)?,
            donor_name: normalize_optional("donorName", self.donor_name)?,
            donor_contact: normalize_optional("donorContact", self.donor_contact)?,
            payee_name: normalize_optional("payeeName", self.payee_name)?,
            tenant_id: normalize_optional("tenantId", self.tenant_id)?,
            agreement_id: normalize_optional("agreementId", self.agreement_id)?,
        })
    }
}

impl RecordChanges {
    /// Returns the changes with every present field checked and normalized.
    ///
    /// # Errors
    /// Returns `Error::InvalidAmount` or `Error::Validation` for the first bad field.
    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            date: self.date,
            category: self
                .category
                .as_deref()
                .map(normalize_category)
                .transpose()?,
            amount: self.amount.map(validate_amount).transpose()?,
            description: normalize_change("description", self.description)?,
            donor_name: normalize_change("donorName", self.donor_name)?,
            donor_contact: normalize_change("donorContact", self.donor_contact)?,
            payee_name: normalize_change("payeeName", self.payee_name)?,
            tenant_id: normalize_change("tenantId", self.tenant_id)?,
            agreement_id: normalize_change("agreementId", self.agreement_id)?,
        })
    }
}

/// Creates a record of `transaction_type`, or returns the one an earlier submission with
/// the same idempotency key created.
///
/// # Errors
/// * `Error::InvalidAmount` / `Error::Validation` - rejected before any allocation
/// * `Error::UnknownSequence` - the type's sequence row is missing
/// * `Error::DuplicateSubmission` - a concurrent request inserted the same key first
/// * `Error::ReceiptNumberCollision` - the allocated number is already stored for the type
/// * `Error::Database` - any other store failure; nothing is committed
#[instrument(skip(db, new_record))]
pub async fn create_record(
    db: &DatabaseConnection,
    transaction_type: TransactionType,
    new_record: NewRecord,
) -> Result<CreateOutcome> {
    let new_record = new_record.validated()?;

    if let Some(key) = new_record.idempotency_key.as_deref() {
        let existing = find_by_idempotency_key(db, transaction_type, key).await?;
        if let Some(record) = existing {
            info!(
                record_id = %record.id,
                receipt_number = %record.receipt_number,
                "Idempotent replay, returning existing record"
            );
            return Ok(CreateOutcome::Existing(record));
        }
    }

    let txn = db.begin().await?;

    let receipt_number = receipt_sequence::allocate_within(&txn, transaction_type).await?;

    let now = Utc::now();
    let record = financial_record::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        date: Set(new_record.date.unwrap_or_else(|| now.date_naive())),
        transaction_type: Set(transaction_type),
        category: Set(new_record.category),
        amount: Set(new_record.amount),
        receipt_number: Set(receipt_number.clone()),
        idempotency_key: Set(new_record.idempotency_key.clone()),
        description: Set(new_record.description),
        donor_name: Set(new_record.donor_name),
        donor_contact: Set(new_record.donor_contact),
        payee_name: Set(new_record.payee_name),
        tenant_id: Set(new_record.tenant_id),
        agreement_id: Set(new_record.agreement_id),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let inserted = record.insert(&txn).await.map_err(|err| {
        classify_insert_error(
            err,
            transaction_type,
            &receipt_number,
            new_record.idempotency_key.as_deref(),
        )
    })?;

    txn.commit().await?;

    info!(
        record_id = %inserted.id,
        receipt_number = %inserted.receipt_number,
        "Created financial record"
    );
    Ok(CreateOutcome::Created(inserted))
}

/// Maps unique-constraint violations from the insert onto the conflict they represent.
fn classify_insert_error(
    err: DbErr,
    transaction_type: TransactionType,
    receipt_number: &str,
    idempotency_key: Option<&str>,
) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => {
            if message.contains("idempotency_key") {
                warn!(%message, "Lost idempotency race");
                Error::DuplicateSubmission {
                    idempotency_key: idempotency_key.unwrap_or_default().to_string(),
                }
            } else {
                warn!(%message, "Receipt number already stored");
                Error::ReceiptNumberCollision {
                    receipt_number: receipt_number.to_string(),
                    transaction_type,
                }
            }
        }
        _ => Error::Database(err),
    }
}

/// Finds the record created with `idempotency_key` for this type, if any.
pub async fn find_by_idempotency_key(
    db: &DatabaseConnection,
    transaction_type: TransactionType,
    idempotency_key: &str,
) -> Result<Option<financial_record::Model>> {
    FinancialRecord::find()
        .filter(financial_record::Column::IdempotencyKey.eq(idempotency_key))
        .filter(financial_record::Column::TransactionType.eq(transaction_type))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a record by id, returning None if it does not exist or belongs to another type.
pub async fn get_record(
    db: &DatabaseConnection,
    transaction_type: TransactionType,
    record_id: &str,
) -> Result<Option<financial_record::Model>> {
    FinancialRecord::find_by_id(record_id)
        .filter(financial_record::Column::TransactionType.eq(transaction_type))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all records of a type, newest business date first, then most recently created.
pub async fn list_records(
    db: &DatabaseConnection,
    transaction_type: TransactionType,
) -> Result<Vec<financial_record::Model>> {
    FinancialRecord::find()
        .filter(financial_record::Column::TransactionType.eq(transaction_type))
        .order_by_desc(financial_record::Column::Date)
        .order_by_desc(financial_record::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies corrections to a record in place.
///
/// # Errors
/// * `Error::InvalidAmount` / `Error::Validation` - a changed field is invalid
/// * `Error::RecordNotFound` - no such record for this type
#[instrument(skip(db, changes))]
pub async fn update_record(
    db: &DatabaseConnection,
    transaction_type: TransactionType,
    record_id: &str,
    changes: RecordChanges,
) -> Result<financial_record::Model> {
    let changes = changes.validated()?;

    let existing = get_record(db, transaction_type, record_id)
        .await?
        .ok_or_else(|| Error::RecordNotFound {
            id: record_id.to_string(),
        })?;

    let mut record: financial_record::ActiveModel = existing.into();
    if let Some(date) = changes.date {
        record.date = Set(date);
    }
    if let Some(category) = changes.category {
        record.category = Set(category);
    }
    if let Some(amount) = changes.amount {
        record.amount = Set(amount);
    }
    if let Some(description) = changes.description {
        record.description = Set(cleared_if_blank(description));
    }
    if let Some(donor_name) = changes.donor_name {
        record.donor_name = Set(cleared_if_blank(donor_name));
    }
    if let Some(donor_contact) = changes.donor_contact {
        record.donor_contact = Set(cleared_if_blank(donor_contact));
    }
    if let Some(payee_name) = changes.payee_name {
        record.payee_name = Set(cleared_if_blank(payee_name));
    }
    if let Some(tenant_id) = changes.tenant_id {
        record.tenant_id = Set(cleared_if_blank(tenant_id));
    }
    if let Some(agreement_id) = changes.agreement_id {
        record.agreement_id = Set(cleared_if_blank(agreement_id));
    }
    record.updated_at = Set(Utc::now());

    let updated = record.update(db).await?;
    info!(record_id = %updated.id, "Corrected financial record");
    Ok(updated)
}

/// Deletes a record. The sequence is never rewound, so its receipt number stays retired.
///
/// # Errors
/// Returns `Error::RecordNotFound` if no such record exists for this type.
#[instrument(skip(db))]
pub async fn delete_record(
    db: &DatabaseConnection,
    transaction_type: TransactionType,
    record_id: &str,
) -> Result<()> {
    let deleted = FinancialRecord::delete_many()
        .filter(financial_record::Column::Id.eq(record_id))
        .filter(financial_record::Column::TransactionType.eq(transaction_type))
        .exec(db)
        .await?;

    if deleted.rows_affected == 0 {
        return Err(Error::RecordNotFound {
            id: record_id.to_string(),
        });
    }

    info!(record_id, "Deleted financial record");
    Ok(())
}
