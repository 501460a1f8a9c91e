//! Transaction type - the partitioning key for receipt-number sequences.
//!
//! Stored as its string name so the database stays readable. Each type also owns
//! the HTTP collection slug its records are served under.

use sea_orm::{Iterable, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Kind of financial record; each kind numbers its receipts independently.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum TransactionType {
    /// Devotee donations
    #[sea_orm(string_value = "Donation")]
    Donation,
    /// General expenses
    #[sea_orm(string_value = "Expense")]
    Expense,
    /// Electricity, water and similar bills
    #[sea_orm(string_value = "Utilities")]
    Utilities,
    /// Staff salary payments
    #[sea_orm(string_value = "Salary")]
    Salary,
    /// Rent collected from tenants
    #[sea_orm(string_value = "RentIncome")]
    RentIncome,
}

impl TransactionType {
    /// Name stored in the database and used in JSON bodies.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Donation => "Donation",
            Self::Expense => "Expense",
            Self::Utilities => "Utilities",
            Self::Salary => "Salary",
            Self::RentIncome => "RentIncome",
        }
    }

    /// URL path segment for this type's records.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Donation => "donations",
            Self::Expense => "expenses",
            Self::Utilities => "utilities",
            Self::Salary => "salaries",
            Self::RentIncome => "rent-income",
        }
    }

    /// Resolves a URL path segment back to its type.
    #[must_use]
    pub fn from_collection(slug: &str) -> Option<Self> {
        Self::iter().find(|ty| ty.collection() == slug)
    }
}
