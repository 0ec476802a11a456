//! Shared primitive types used across the engine.

/// A stable customer identifier as it appears in the ledger.
pub type CustomerId = String;

/// A product name as it appears in the ledger.
pub type ProductName = String;

/// Ledger month number. Month 1 is the first month of the observed period.
pub type Month = u32;

/// The canonical run identifier used by the store.
pub type RunId = String;
