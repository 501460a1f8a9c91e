/// Financial record creation, correction, lookup and deletion
pub mod financial_record;
/// Receipt-number allocation, preview and seeding
pub mod receipt_sequence;
/// Per-operation timeouts for store calls
pub mod timeout;

pub use timeout::with_query_timeout;
