//! Shared test utilities for the ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test records with sensible defaults.

use crate::{
    core::{
        financial_record::{self, CreateOutcome, NewRecord},
        receipt_sequence,
    },
    entities::{self, ReceiptSequence, TransactionType},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use tracing_subscriber::EnvFilter;

/// Routes tracing output to the test harness; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized but no sequences.
///
/// The pool is capped at one connection: every pooled connection to `sqlite::memory:`
/// would otherwise open its own empty database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates an in-memory database with every sequence seeded at 1.
pub async fn setup_seeded_db() -> Result<DatabaseConnection> {
    let db = setup_test_db().await?;
    receipt_sequence::seed_sequences(&db).await?;
    Ok(db)
}

/// Inserts a sequence row directly, bypassing history-based seeding.
pub async fn insert_sequence(
    db: &DatabaseConnection,
    transaction_type: TransactionType,
    next_number: i64,
) -> Result<entities::receipt_sequence::Model> {
    entities::receipt_sequence::ActiveModel {
        transaction_type: Set(transaction_type),
        next_number: Set(next_number),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Moves an existing sequence row to `next_number`.
pub async fn set_next_number(
    db: &DatabaseConnection,
    transaction_type: TransactionType,
    next_number: i64,
) -> Result<()> {
    let updated = ReceiptSequence::update_many()
        .col_expr(
            entities::receipt_sequence::Column::NextNumber,
            sea_orm::sea_query::Expr::value(next_number),
        )
        .filter(entities::receipt_sequence::Column::TransactionType.eq(transaction_type))
        .exec(db)
        .await?;
    if updated.rows_affected == 0 {
        return Err(Error::UnknownSequence { transaction_type });
    }
    Ok(())
}

/// Inserts a record with a fixed receipt number, as imported history would have.
pub async fn insert_historical_record(
    db: &DatabaseConnection,
    transaction_type: TransactionType,
    receipt_number: &str,
) -> Result<entities::financial_record::Model> {
    let now = Utc::now();
    entities::financial_record::ActiveModel {
        id: Set(format!("hist-{}-{receipt_number}", transaction_type.name())),
        date: Set(NaiveDate::from_ymd_opt(2023, 4, 1).unwrap_or_default()),
        transaction_type: Set(transaction_type),
        category: Set("Imported".to_string()),
        amount: Set(100.0),
        receipt_number: Set(receipt_number.to_string()),
        idempotency_key: Set(None),
        description: Set(None),
        donor_name: Set(None),
        donor_contact: Set(None),
        payee_name: Set(None),
        tenant_id: Set(None),
        agreement_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Builds a valid create request with sensible defaults.
///
/// # Defaults
/// * `category`: "General"
/// * `amount`: 101.0
/// * `date`: today
pub fn test_new_record(idempotency_key: Option<String>) -> NewRecord {
    NewRecord {
        category: "General".to_string(),
        amount: 101.0,
        idempotency_key,
        ..NewRecord::default()
    }
}

/// Creates a test record of `transaction_type` through the allocator-backed path.
pub async fn create_test_record(
    db: &DatabaseConnection,
    transaction_type: TransactionType,
    idempotency_key: Option<String>,
) -> Result<CreateOutcome> {
    financial_record::create_record(db, transaction_type, test_new_record(idempotency_key)).await
}
