//! # Error Types
//!
//! Domain-specific error types for ventas-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  ventas-core errors (this file)                                     │
//! │  ├── ValidationError  - Field-level input validation failures       │
//! │  └── SaleError        - Sale registration rejections                │
//! │                                                                     │
//! │  ventas-db errors (separate crate)                                  │
//! │  ├── DbError          - Storage operation failures                  │
//! │  └── RegisterSaleError - SaleError | DbError for register_sale      │
//! │                                                                     │
//! │  Every SaleError is a user-addressable rejection: the caller        │
//! │  fixes the input and re-submits. None is a system fault.            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (line index, product code, etc.)
//! 3. Errors are enum variants, never String

use std::fmt;

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a single field doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., bad RUT, bad product code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Sale Rejection Taxonomy
// =============================================================================

/// One line of a sale request that asked for more than the shelf holds.
///
/// `line` is the zero-based index into the *filtered* line sequence, so it
/// matches the order of the lines the caller actually submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockShortage {
    /// Zero-based index of the offending line.
    pub line: usize,
    /// Product code, for the error message shown to the operator.
    pub code: String,
    /// Quantity the line requested.
    pub requested: i64,
    /// Stock actually available.
    pub available: i64,
}

impl fmt::Display for StockShortage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {} ({}): requested {}, available {}",
            self.line, self.code, self.requested, self.available
        )
    }
}

/// Why a sale registration was rejected.
///
/// All variants are detected before any mutation is committed: a rejected
/// registration leaves products, customers, and sales untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaleError {
    /// The supplied tax identifier failed shape or checksum validation.
    #[error("invalid RUT: {rut}")]
    InvalidRut { rut: String },

    /// Registering a habitual customer requires a display name.
    #[error("customer name is required to register a habitual customer")]
    MissingCustomerName,

    /// No usable line items remain after discarding incomplete rows.
    #[error("sale must contain at least one product with a quantity")]
    NoLineItems,

    /// A line carried a non-positive quantity.
    #[error("line {line}: quantity must be a positive integer, got {quantity}")]
    InvalidQuantity { line: usize, quantity: i64 },

    /// A line referenced a product that does not exist.
    #[error("line {line}: product not found: {product_id}")]
    ProductNotFound { line: usize, product_id: String },

    /// One or more lines requested more than the available stock.
    ///
    /// Every offending line is reported, not just the first, so the
    /// operator can correct the whole form in one pass.
    #[error("insufficient stock on {} line(s)", .shortages.len())]
    InsufficientStock { shortages: Vec<StockShortage> },
}

// =============================================================================
// Unit Tests
// =============================================================================
