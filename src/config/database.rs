//! Database configuration module for the ledger.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables come from `Schema::create_table_from_entity`, so the schema always matches the
//! entity definitions. The one constraint the entity macros cannot express, the composite
//! `(receipt_number, transaction_type)` unique index, is built with `sea_query` here.

use crate::entities::{FinancialRecord, ReceiptSequence, financial_record};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default location of the `SQLite` file when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://temple_ledger.sqlite?mode=rwc";

/// Name of the composite unique index guarding receipt numbers.
pub const RECEIPT_UNIQUE_INDEX: &str = "idx_financial_records_receipt_number_type";

/// Gets the database URL from environment variable or returns the configured fallback.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// `fallback` if not found.
#[must_use]
pub fn get_database_url(fallback: &str) -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| fallback.to_string())
}

/// Establishes a connection pool to the database at `database_url`.
///
/// `acquire_timeout` bounds how long a request waits for a pooled connection; it is
/// the query timeout so an exhausted pool fails the same way a slow query does.
#[instrument(skip(database_url))]
pub async fn create_connection(
    database_url: &str,
    acquire_timeout: Duration,
) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url);
    options
        .acquire_timeout(acquire_timeout)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!("Connected to database");
    Ok(db)
}

/// Creates all necessary database tables and indexes if they do not exist yet.
///
/// Tables are generated from the entity definitions; the composite receipt-number
/// index is created separately because it spans two columns.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut sequence_table = schema.create_table_from_entity(ReceiptSequence);
    let mut record_table = schema.create_table_from_entity(FinancialRecord);

    db.execute(builder.build(sequence_table.if_not_exists()))
        .await?;
    db.execute(builder.build(record_table.if_not_exists()))
        .await?;

    let receipt_index = Index::create()
        .if_not_exists()
        .name(RECEIPT_UNIQUE_INDEX)
        .table(FinancialRecord)
        .col(financial_record::Column::ReceiptNumber)
        .col(financial_record::Column::TransactionType)
        .unique()
        .to_owned();
    db.execute(builder.build(&receipt_index)).await?;

    debug!("Ledger tables and indexes ensured");
    Ok(())
}
