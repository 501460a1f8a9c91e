//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod financial_record;
pub mod receipt_sequence;
pub mod transaction_type;

// Re-export specific types to avoid conflicts
pub use financial_record::{
    Column as FinancialRecordColumn, Entity as FinancialRecord, Model as FinancialRecordModel,
};
pub use receipt_sequence::{
    Column as ReceiptSequenceColumn, Entity as ReceiptSequence, Model as ReceiptSequenceModel,
};
pub use transaction_type::TransactionType;
