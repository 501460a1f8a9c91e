//! Route handlers. Each resolves the collection slug to a transaction type, runs one core
//! operation under the query timeout, and serializes the result.

use super::AppState;
use crate::{
    core::financial_record::{self, NewRecord, RecordChanges},
    core::receipt_sequence,
    entities::{FinancialRecordModel, TransactionType},
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{FromRequest, Path, State},
    http::StatusCode,
};
use serde::Serialize;

/// Body of the receipt-number preview.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextReceiptNumber {
    /// Number the next allocation would return; not reserved
    pub receipt_number: String,
}

/// JSON body extractor whose rejections become 422 `validation_failed` error bodies.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

fn resolve_collection(collection: &str) -> Result<TransactionType> {
    TransactionType::from_collection(collection).ok_or_else(|| Error::UnknownCollection {
        name: collection.to_string(),
    })
}

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "ok"
}

/// `POST /{collection}`: 201 for a new record, 200 when the idempotency key was seen.
pub async fn create_record(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    JsonBody(new_record): JsonBody<NewRecord>,
) -> Result<(StatusCode, Json<FinancialRecordModel>)> {
    let transaction_type = resolve_collection(&collection)?;
    let outcome = state
        .run(financial_record::create_record(
            &state.database,
            transaction_type,
            new_record,
        ))
        .await?;

    let status = if outcome.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.into_record())))
}

/// `GET /{collection}`
pub async fn list_records(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<Vec<FinancialRecordModel>>> {
    let transaction_type = resolve_collection(&collection)?;
    let records = state
        .run(financial_record::list_records(
            &state.database,
            transaction_type,
        ))
        .await?;
    Ok(Json(records))
}

/// `GET /{collection}/next-receipt-number`
pub async fn next_receipt_number(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<NextReceiptNumber>> {
    let transaction_type = resolve_collection(&collection)?;
    let receipt_number = state
        .run(receipt_sequence::peek_next(&state.database, transaction_type))
        .await?;
    Ok(Json(NextReceiptNumber { receipt_number }))
}

/// `GET /{collection}/{id}`
pub async fn get_record(
    State(state): State<AppState>,
    Path((collection, record_id)): Path<(String, String)>,
) -> Result<Json<FinancialRecordModel>> {
    let transaction_type = resolve_collection(&collection)?;
    let record = state
        .run(financial_record::get_record(
            &state.database,
            transaction_type,
            &record_id,
        ))
        .await?;
    record
        .map(Json)
        .ok_or(Error::RecordNotFound { id: record_id })
}

/// `PUT /{collection}/{id}`
pub async fn update_record(
    State(state): State<AppState>,
    Path((collection, record_id)): Path<(String, String)>,
    JsonBody(changes): JsonBody<RecordChanges>,
) -> Result<Json<FinancialRecordModel>> {
    let transaction_type = resolve_collection(&collection)?;
    let updated = state
        .run(financial_record::update_record(
            &state.database,
            transaction_type,
            &record_id,
            changes,
        ))
        .await?;
    Ok(Json(updated))
}

/// `DELETE /{collection}/{id}`
pub async fn delete_record(
    State(state): State<AppState>,
    Path((collection, record_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let transaction_type = resolve_collection(&collection)?;
    state
        .run(financial_record::delete_record(
            &state.database,
            transaction_type,
            &record_id,
        ))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
