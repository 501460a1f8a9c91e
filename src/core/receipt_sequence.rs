//! Receipt sequence business logic - allocation, preview and seeding of receipt numbers.
//!
//! Receipt numbers are issued from one counter row per transaction type. Allocation is a
//! single `UPDATE receipt_sequences SET next_number = next_number + 1` followed by a read
//! of the new value inside the same database transaction. The write comes first, so the
//! transaction holds the write lock before it reads and concurrent allocations for the
//! same type serialize in the database. Nothing is cached in memory.

use crate::{
    entities::{FinancialRecord, ReceiptSequence, TransactionType, financial_record, receipt_sequence},
    errors::{Error, Result},
};
use sea_orm::{Iterable, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info, instrument};

/// Minimum number of digits in a formatted receipt number.
pub const RECEIPT_NUMBER_WIDTH: usize = 4;

/// Formats a sequence value as a receipt number: zero-padded to four digits, wider
/// once the value needs more digits ("0007", "0420", "12345").
#[must_use]
pub fn format_receipt_number(number: i64) -> String {
    format!("{number:0width$}", width = RECEIPT_NUMBER_WIDTH)
}

/// Parses a stored receipt number back into its sequence value.
///
/// Returns `None` for anything that is not a positive integer, such as receipts
/// imported from paper books with prefixes.
#[must_use]
pub fn parse_receipt_number(receipt_number: &str) -> Option<i64> {
    receipt_number
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|number| *number > 0)
}

/// Allocates the next receipt number for `transaction_type` in its own transaction.
///
/// The counter increment is committed before this returns. If anything fails the
/// transaction is rolled back and the counter is unchanged, so callers may retry.
///
/// # Errors
/// * `Error::UnknownSequence` - no sequence row exists for the type
/// * `Error::Database` - the transaction could not complete
#[instrument(skip(db))]
pub async fn allocate_next(
    db: &DatabaseConnection,
    transaction_type: TransactionType,
) -> Result<String> {
    let txn = db.begin().await?;
    let receipt_number = allocate_within(&txn, transaction_type).await?;
    txn.commit().await?;
    Ok(receipt_number)
}

/// Allocates the next receipt number on a caller-owned connection or transaction.
///
/// Use this with an open transaction so the allocation commits or rolls back together
/// with the record that carries the number.
///
/// # Errors
/// * `Error::UnknownSequence` - no sequence row exists for the type
/// * `Error::Database` - the update or read failed
pub async fn allocate_within<C>(db: &C, transaction_type: TransactionType) -> Result<String>
where
    C: ConnectionTrait,
{
    let updated = ReceiptSequence::update_many()
        .col_expr(
            receipt_sequence::Column::NextNumber,
            Expr::col(receipt_sequence::Column::NextNumber).add(1),
        )
        .col_expr(
            receipt_sequence::Column::UpdatedAt,
            Expr::value(chrono::Utc::now()),
        )
        .filter(receipt_sequence::Column::TransactionType.eq(transaction_type))
        .exec(db)
        .await?;

    if updated.rows_affected == 0 {
        return Err(Error::UnknownSequence { transaction_type });
    }

    let sequence = ReceiptSequence::find_by_id(transaction_type)
        .one(db)
        .await?
        .ok_or(Error::UnknownSequence { transaction_type })?;

    let allocated = sequence.next_number - 1;
    debug!(?transaction_type, allocated, "Allocated receipt number");
    Ok(format_receipt_number(allocated))
}

/// Previews the receipt number the next allocation would return, without claiming it.
///
/// The preview may be stale as soon as it is read; another request can take that number
/// first. It is meant for display only.
///
/// # Errors
/// * `Error::UnknownSequence` - no sequence row exists for the type
pub async fn peek_next<C>(db: &C, transaction_type: TransactionType) -> Result<String>
where
    C: ConnectionTrait,
{
    ReceiptSequence::find_by_id(transaction_type)
        .one(db)
        .await?
        .map(|sequence| format_receipt_number(sequence.next_number))
        .ok_or(Error::UnknownSequence { transaction_type })
}

/// Ensures every transaction type has a sequence row.
///
/// Missing rows start one past the highest numeric receipt number already stored for
/// that type, or at 1 when there are none. Existing rows are left untouched, so this is
/// safe to run on every startup. Returns all sequence rows after seeding.
///
/// # Errors
/// Returns `Error::Database` if reading history or inserting rows fails; nothing is
/// seeded in that case.
#[instrument(skip(db))]
pub async fn seed_sequences(db: &DatabaseConnection) -> Result<Vec<receipt_sequence::Model>> {
    let txn = db.begin().await?;

    for transaction_type in TransactionType::iter() {
        if ReceiptSequence::find_by_id(transaction_type)
            .one(&txn)
            .await?
            .is_some()
        {
            continue;
        }

        let next_number = highest_issued_number(&txn, transaction_type).await? + 1;
        receipt_sequence::ActiveModel {
            transaction_type: Set(transaction_type),
            next_number: Set(next_number),
            updated_at: Set(chrono::Utc::now()),
        }
        .insert(&txn)
        .await?;

        info!(
            ?transaction_type,
            next_number, "Seeded receipt sequence from historical records"
        );
    }

    txn.commit().await?;

    ReceiptSequence::find().all(db).await.map_err(Into::into)
}

/// Highest numeric receipt number stored for the type, or 0 when none exist.
async fn highest_issued_number<C>(db: &C, transaction_type: TransactionType) -> Result<i64>
where
    C: ConnectionTrait,
{
    let receipt_numbers: Vec<String> = FinancialRecord::find()
        .select_only()
        .column(financial_record::Column::ReceiptNumber)
        .filter(financial_record::Column::TransactionType.eq(transaction_type))
        .into_tuple()
        .all(db)
        .await?;

    Ok(receipt_numbers
        .iter()
        .filter_map(|receipt_number| parse_receipt_number(receipt_number))
        .max()
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use std::collections::HashSet;
    use tokio::task::JoinSet;

    #[test]
    fn test_format_receipt_number() {
        assert_eq!(format_receipt_number(1), "0001");
        assert_eq!(format_receipt_number(42), "0042");
        assert_eq!(format_receipt_number(9999), "9999");
        assert_eq!(format_receipt_number(10_000), "10000");
    }

    #[test]
    fn test_parse_receipt_number() {
        assert_eq!(parse_receipt_number("0001"), Some(1));
        assert_eq!(parse_receipt_number(" 0420 "), Some(420));
        assert_eq!(parse_receipt_number("10000"), Some(10_000));
        assert_eq!(parse_receipt_number("0000"), None);
        assert_eq!(parse_receipt_number("R-12"), None);
        assert_eq!(parse_receipt_number(""), None);
    }

    #[tokio::test]
    async fn test_allocate_sequential_numbers() -> Result<()> {
        let db = setup_seeded_db().await?;

        assert_eq!(allocate_next(&db, TransactionType::Donation).await?, "0001");
        assert_eq!(allocate_next(&db, TransactionType::Donation).await?, "0002");
        Ok(())
    }

    #[tokio::test]
    async fn test_types_are_numbered_independently() -> Result<()> {
        let db = setup_seeded_db().await?;

        assert_eq!(allocate_next(&db, TransactionType::Donation).await?, "0001");
        assert_eq!(allocate_next(&db, TransactionType::Donation).await?, "0002");
        assert_eq!(allocate_next(&db, TransactionType::Expense).await?, "0001");
        assert_eq!(peek_next(&db, TransactionType::Salary).await?, "0001");
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_allocations_from_five() -> Result<()> {
        let db = setup_seeded_db().await?;
        set_next_number(&db, TransactionType::Donation, 5).await?;

        let first = allocate_next(&db, TransactionType::Donation);
        let second = allocate_next(&db, TransactionType::Donation);
        let (first, second) = tokio::join!(first, second);

        let allocated: HashSet<String> = [first?, second?].into_iter().collect();
        let expected: HashSet<String> = ["0005".to_string(), "0006".to_string()].into();
        assert_eq!(allocated, expected);
        assert_eq!(peek_next(&db, TransactionType::Donation).await?, "0007");
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_allocations_are_contiguous() -> Result<()> {
        const CALLERS: i64 = 20;
        let db = setup_seeded_db().await?;
        set_next_number(&db, TransactionType::Expense, 11).await?;

        let mut tasks = JoinSet::new();
        for _ in 0..CALLERS {
            let db = db.clone();
            tasks.spawn(async move { allocate_next(&db, TransactionType::Expense).await });
        }

        let mut numbers = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let receipt_number = joined.unwrap()?;
            numbers.push(parse_receipt_number(&receipt_number).unwrap());
        }
        numbers.sort_unstable();

        let expected: Vec<i64> = (11..11 + CALLERS).collect();
        assert_eq!(numbers, expected);
        Ok(())
    }

    #[tokio::test]
    async fn test_peek_after_allocate_is_greater() -> Result<()> {
        let db = setup_seeded_db().await?;

        let allocated = allocate_next(&db, TransactionType::Utilities).await?;
        let peeked = peek_next(&db, TransactionType::Utilities).await?;
        assert!(parse_receipt_number(&peeked) > parse_receipt_number(&allocated));
        Ok(())
    }

    #[tokio::test]
    async fn test_peek_does_not_allocate() -> Result<()> {
        let db = setup_seeded_db().await?;

        assert_eq!(peek_next(&db, TransactionType::Salary).await?, "0001");
        assert_eq!(peek_next(&db, TransactionType::Salary).await?, "0001");
        assert_eq!(allocate_next(&db, TransactionType::Salary).await?, "0001");
        Ok(())
    }

    #[tokio::test]
    async fn test_rolled_back_allocation_leaves_counter() -> Result<()> {
        let db = setup_seeded_db().await?;
        set_next_number(&db, TransactionType::RentIncome, 3).await?;

        let txn = db.begin().await?;
        let allocated = allocate_within(&txn, TransactionType::RentIncome).await?;
        assert_eq!(allocated, "0003");
        txn.rollback().await?;

        assert_eq!(peek_next(&db, TransactionType::RentIncome).await?, "0003");
        Ok(())
    }

    #[tokio::test]
    async fn test_dropped_transaction_leaves_counter() -> Result<()> {
        let db = setup_seeded_db().await?;

        {
            let txn = db.begin().await?;
            allocate_within(&txn, TransactionType::Donation).await?;
            // Dropped without commit, as when a timeout cancels the request
        }

        assert_eq!(peek_next(&db, TransactionType::Donation).await?, "0001");
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_sequence_before_seeding() -> Result<()> {
        let db = setup_test_db().await?;

        let result = allocate_next(&db, TransactionType::Donation).await;
        assert!(matches!(
            result,
            Err(Error::UnknownSequence {
                transaction_type: TransactionType::Donation
            })
        ));

        let result = peek_next(&db, TransactionType::Expense).await;
        assert!(matches!(result, Err(Error::UnknownSequence { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_starts_at_one_without_history() -> Result<()> {
        let db = setup_test_db().await?;

        let sequences = seed_sequences(&db).await?;
        assert_eq!(sequences.len(), TransactionType::iter().count());
        assert!(sequences.iter().all(|sequence| sequence.next_number == 1));
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_continues_after_historical_maximum() -> Result<()> {
        let db = setup_test_db().await?;
        insert_historical_record(&db, TransactionType::Donation, "0009").await?;
        insert_historical_record(&db, TransactionType::Donation, "0041").await?;
        insert_historical_record(&db, TransactionType::Donation, "0100").await?;
        insert_historical_record(&db, TransactionType::Donation, "BOOK-7").await?;
        insert_historical_record(&db, TransactionType::Expense, "0003").await?;

        seed_sequences(&db).await?;

        assert_eq!(peek_next(&db, TransactionType::Donation).await?, "0101");
        assert_eq!(peek_next(&db, TransactionType::Expense).await?, "0004");
        assert_eq!(peek_next(&db, TransactionType::Salary).await?, "0001");
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_keeps_existing_counters() -> Result<()> {
        let db = setup_seeded_db().await?;
        allocate_next(&db, TransactionType::Donation).await?;
        allocate_next(&db, TransactionType::Donation).await?;

        seed_sequences(&db).await?;

        assert_eq!(peek_next(&db, TransactionType::Donation).await?, "0003");
        Ok(())
    }
}
